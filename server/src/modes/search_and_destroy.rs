//! Search and Destroy: round-based, one life per round.
//!
//! Each round runs `PreRound -> RoundActive -> PostRound`, detouring through
//! `BombPlanted` when the bomb goes down. Rounds do not chain on their own;
//! the caller starts every round and checks [`SearchAndDestroy::is_match_over`]
//! after each one ends.

use super::MatchMode;
use log::{debug, info};
use shared::{
    BombState, PlayerId, SndPhase, Team, TeamScores, SND_BOMB_EXPLODE_SEC, SND_DEFUSE_TIME_SEC,
    SND_PRE_ROUND_SEC, SND_ROUNDS_TO_WIN, SND_ROUND_DURATION_SEC,
};
use std::collections::{BTreeMap, HashMap};

/// Invoked with `(round, None)` when a round starts and `(round, Some(winner))`
/// when it ends.
pub type RoundListener = Box<dyn FnMut(u32, Option<Team>) + Send>;

/// Team awarded the round when the clock runs out before a plant.
const TIMEOUT_WINNER: Team = Team::Bravo;

#[derive(Default)]
pub struct SearchAndDestroy {
    pub players: HashMap<PlayerId, Team>,
    pub alive: BTreeMap<PlayerId, bool>,
    pub rounds_won: TeamScores,
    pub round_number: u32,
    pub phase: SndPhase,
    pub phase_timer_sec: f32,
    pub bomb_state: BombState,
    pub bomb_carrier: Option<PlayerId>,
    pub planting_team: Team,
    pub plant_defuse_timer_sec: f32,
    pub round_winner: Team,
    listener: Option<RoundListener>,
}

impl SearchAndDestroy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_listener(&mut self, listener: RoundListener) {
        self.listener = Some(listener);
    }

    /// Begins the next round. Refused while a round is still running or once
    /// a team has won the match.
    pub fn start_round(&mut self) -> bool {
        if self.is_match_over() {
            return false;
        }
        if self.round_number > 0 && self.phase != SndPhase::PostRound {
            return false;
        }

        self.round_number += 1;
        self.phase = SndPhase::PreRound;
        self.phase_timer_sec = SND_PRE_ROUND_SEC;
        self.bomb_state = BombState::Carried;
        self.bomb_carrier = None;
        self.planting_team = Team::None;
        self.plant_defuse_timer_sec = 0.0;
        self.round_winner = Team::None;
        for alive in self.alive.values_mut() {
            *alive = true;
        }
        info!("Search and destroy round {} starting", self.round_number);

        let round = self.round_number;
        if let Some(listener) = self.listener.as_mut() {
            listener(round, None);
        }
        true
    }

    pub fn is_match_over(&self) -> bool {
        self.rounds_won.first_to(SND_ROUNDS_TO_WIN).is_some()
    }

    pub fn is_alive(&self, player_id: PlayerId) -> bool {
        self.alive.get(&player_id).copied().unwrap_or(false)
    }

    pub fn on_player_killed(&mut self, victim_id: PlayerId) {
        let Some(alive) = self.alive.get_mut(&victim_id) else {
            return;
        };
        *alive = false;
        if self.bomb_carrier == Some(victim_id) {
            self.bomb_carrier = None;
            self.bomb_state = BombState::Dropped;
        }
        self.check_alive_condition();
    }

    pub fn on_bomb_picked_up(&mut self, player_id: PlayerId) -> bool {
        if !matches!(self.phase, SndPhase::PreRound | SndPhase::RoundActive) {
            return false;
        }
        if !self.players.contains_key(&player_id) || self.round_number == 0 {
            return false;
        }
        self.bomb_carrier = Some(player_id);
        self.bomb_state = BombState::Carried;
        true
    }

    pub fn on_bomb_dropped(&mut self, carrier_id: PlayerId) {
        if self.bomb_carrier == Some(carrier_id) {
            self.bomb_carrier = None;
            self.bomb_state = BombState::Dropped;
        }
    }

    /// Plants the bomb and starts the explode countdown. Only valid while the
    /// round is live.
    pub fn on_bomb_planted(&mut self, planter_id: PlayerId) -> bool {
        if self.phase != SndPhase::RoundActive {
            return false;
        }
        let Some(team) = self.players.get(&planter_id).copied() else {
            return false;
        };

        self.phase = SndPhase::BombPlanted;
        self.bomb_state = BombState::Planted;
        self.bomb_carrier = None;
        self.planting_team = team;
        self.phase_timer_sec = SND_BOMB_EXPLODE_SEC;
        self.plant_defuse_timer_sec = SND_DEFUSE_TIME_SEC;
        info!("Bomb planted by player {} ({:?})", planter_id, team);
        true
    }

    /// Defuses a planted bomb; the defuser's team takes the round.
    pub fn on_bomb_defused(&mut self, defuser_id: PlayerId) -> bool {
        if self.phase != SndPhase::BombPlanted {
            return false;
        }
        let Some(team) = self.players.get(&defuser_id).copied() else {
            return false;
        };
        self.bomb_state = BombState::Defused;
        self.end_round(team);
        true
    }

    fn end_round(&mut self, winner: Team) {
        if self.phase == SndPhase::PostRound {
            return;
        }
        self.phase = SndPhase::PostRound;
        self.round_winner = winner;
        self.rounds_won.add(winner, 1);
        info!(
            "Round {} won by {:?} ({} - {})",
            self.round_number, winner, self.rounds_won.alpha, self.rounds_won.bravo
        );

        let round = self.round_number;
        if let Some(listener) = self.listener.as_mut() {
            listener(round, Some(winner));
        }
    }

    fn check_alive_condition(&mut self) {
        if !matches!(self.phase, SndPhase::RoundActive | SndPhase::BombPlanted) {
            return;
        }

        let (mut alpha_alive, mut bravo_alive) = (0, 0);
        for (player_id, _) in self.alive.iter().filter(|(_, alive)| **alive) {
            match self.players.get(player_id) {
                Some(Team::Alpha) => alpha_alive += 1,
                Some(Team::Bravo) => bravo_alive += 1,
                _ => {}
            }
        }

        if alpha_alive == 0 {
            self.end_round(Team::Bravo);
        } else if bravo_alive == 0 {
            self.end_round(Team::Alpha);
        }
    }
}

impl MatchMode for SearchAndDestroy {
    /// Clears the match. The round listener stays attached.
    fn reset(&mut self) {
        let listener = self.listener.take();
        *self = Self::default();
        self.listener = listener;
    }

    fn add_player(&mut self, player_id: PlayerId, team: Team) {
        if !team.is_combatant() {
            return;
        }
        self.players.insert(player_id, team);
        // joins dead and spawns with the next round
        self.alive.insert(player_id, false);
    }

    fn remove_player(&mut self, player_id: PlayerId) {
        self.players.remove(&player_id);
        self.alive.remove(&player_id);
        if self.bomb_carrier == Some(player_id) {
            self.bomb_carrier = None;
        }
    }

    fn tick(&mut self, delta_sec: f32) {
        if self.round_number == 0 || self.phase == SndPhase::PostRound {
            return;
        }
        self.phase_timer_sec -= delta_sec;

        match self.phase {
            SndPhase::PreRound => {
                if self.phase_timer_sec <= 0.0 {
                    debug!("Round {} is live", self.round_number);
                    self.phase = SndPhase::RoundActive;
                    self.phase_timer_sec = SND_ROUND_DURATION_SEC;
                }
            }
            SndPhase::RoundActive => {
                if self.phase_timer_sec <= 0.0 {
                    self.end_round(TIMEOUT_WINNER);
                }
            }
            SndPhase::BombPlanted => {
                self.plant_defuse_timer_sec = (self.plant_defuse_timer_sec - delta_sec).max(0.0);
                if self.phase_timer_sec <= 0.0 {
                    self.bomb_state = BombState::Exploded;
                    self.end_round(self.planting_team);
                }
            }
            SndPhase::PostRound => {}
        }
    }

    fn has_player(&self, player_id: PlayerId) -> bool {
        self.players.contains_key(&player_id)
    }

    fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    fn scores(&self) -> TeamScores {
        self.rounds_won
    }

    fn winner(&self) -> Option<Team> {
        self.rounds_won.first_to(SND_ROUNDS_TO_WIN)
    }
}
