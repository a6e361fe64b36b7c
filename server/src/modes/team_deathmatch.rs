use super::MatchMode;
use log::info;
use shared::{PlayerId, Team, TeamScores, TDM_SCORE_LIMIT};
use std::collections::HashMap;

/// First team to the kill limit wins.
#[derive(Debug, Clone, Default)]
pub struct TeamDeathmatch {
    pub scores: TeamScores,
    pub players: HashMap<PlayerId, Team>,
    pub game_over: bool,
    pub winning_team: Team,
}

impl TeamDeathmatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits the killer's team with one point.
    ///
    /// Ignored once the game is over or when the killer is not on a team in
    /// this match. The victim does not affect scoring.
    pub fn on_kill(&mut self, killer_id: PlayerId, _victim_id: PlayerId) {
        if self.game_over {
            return;
        }
        let Some(team) = self.players.get(&killer_id).copied() else {
            return;
        };
        if team == Team::None {
            return;
        }
        self.scores.add(team, 1);
        self.check_win_condition();
    }

    fn check_win_condition(&mut self) {
        if let Some(team) = self.scores.first_to(TDM_SCORE_LIMIT) {
            self.game_over = true;
            self.winning_team = team;
            info!(
                "Team deathmatch won by {:?} ({} - {})",
                team, self.scores.alpha, self.scores.bravo
            );
        }
    }
}

impl MatchMode for TeamDeathmatch {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn add_player(&mut self, player_id: PlayerId, team: Team) {
        if !team.is_combatant() {
            return;
        }
        self.players.insert(player_id, team);
    }

    fn remove_player(&mut self, player_id: PlayerId) {
        self.players.remove(&player_id);
    }

    fn tick(&mut self, _delta_sec: f32) {}

    fn has_player(&self, player_id: PlayerId) -> bool {
        self.players.contains_key(&player_id)
    }

    fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    fn scores(&self) -> TeamScores {
        self.scores
    }

    fn winner(&self) -> Option<Team> {
        self.game_over.then_some(self.winning_team)
    }
}
