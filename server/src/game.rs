//! Session orchestrator: one active mode, one global roster, progression
//! always running.

use crate::modes::{
    CaptureTheFlag, Domination, MatchMode, SearchAndDestroy, TeamDeathmatch, ZombiesMode,
};
use crate::progression::{MissionSystem, QuestSystem};
use log::{debug, info};
use shared::{GameEvent, GameMode, MatchSummary, PlayerId, Team};
use std::collections::BTreeMap;

/// Kill objectives credited for killing another player.
pub const ENEMY_TARGET: &str = "enemy";
/// Kill objectives credited for killing a zombie.
pub const ZOMBIE_TARGET: &str = "zombie";
/// Collect objectives credited for a flag capture.
pub const FLAG_CAPTURE_ITEM: &str = "flag_capture";
/// Interact objectives credited for taking a control point.
pub const CONTROL_POINT_OBJECT: &str = "control_point";
/// Interact objectives credited for a bomb defuse.
pub const BOMB_DEFUSE_OBJECT: &str = "bomb_defuse";

#[derive(Default)]
pub struct GameServer {
    mode: GameMode,
    players: BTreeMap<PlayerId, Team>,
    tdm: TeamDeathmatch,
    domination: Domination,
    ctf: CaptureTheFlag,
    snd: SearchAndDestroy,
    zombies: ZombiesMode,
    quests: QuestSystem,
    missions: MissionSystem,
    result_reported: bool,
}

impl GameServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_control_points(count: usize) -> Self {
        Self {
            domination: Domination::new(count),
            ..Self::default()
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Switches the active mode. Every mode is reset, not just the outgoing
    /// one, and the incoming mode is filled from the global roster.
    pub fn set_mode(&mut self, mode: GameMode) {
        if self.mode == mode {
            return;
        }
        info!("Switching mode {:?} -> {:?}", self.mode, mode);

        self.reset_modes();
        self.mode = mode;
        let roster: Vec<(PlayerId, Team)> =
            self.players.iter().map(|(id, team)| (*id, *team)).collect();
        if let Some(active) = self.active_mode_mut() {
            for (player_id, team) in roster {
                if mode.admits(team) {
                    active.add_player(player_id, team);
                }
            }
        }
    }

    fn reset_modes(&mut self) {
        self.tdm.reset();
        self.domination.reset();
        self.ctf.reset();
        self.snd.reset();
        self.zombies.reset();
        self.result_reported = false;
    }

    /// Changes the Domination point count. Takes effect immediately and
    /// wipes point ownership.
    pub fn set_control_points(&mut self, count: usize) {
        self.domination.set_control_points(count);
    }

    pub fn add_player(&mut self, player_id: PlayerId, team: Team) {
        self.players.insert(player_id, team);
        let mode = self.mode;
        if let Some(active) = self.active_mode_mut() {
            if mode.admits(team) {
                active.add_player(player_id, team);
            }
        }
        info!("Player {} joined as {:?}", player_id, team);
    }

    /// Removes the player everywhere, including stale entries in inactive modes.
    pub fn remove_player(&mut self, player_id: PlayerId) {
        self.players.remove(&player_id);
        self.tdm.remove_player(player_id);
        self.domination.remove_player(player_id);
        self.ctf.remove_player(player_id);
        self.snd.remove_player(player_id);
        self.zombies.remove_player(player_id);
        info!("Player {} left", player_id);
    }

    pub fn set_player_team(&mut self, player_id: PlayerId, team: Team) {
        let Some(current) = self.players.get_mut(&player_id) else {
            return;
        };
        *current = team;

        // zombies keeps its players whatever their team
        if self.mode == GameMode::Zombies {
            return;
        }
        let mode = self.mode;
        if let Some(active) = self.active_mode_mut() {
            active.remove_player(player_id);
            if mode.admits(team) {
                active.add_player(player_id, team);
            }
        }
    }

    pub fn player_team(&self, player_id: PlayerId) -> Option<Team> {
        self.players.get(&player_id).copied()
    }

    /// The global roster in id order.
    pub fn players(&self) -> impl Iterator<Item = (PlayerId, Team)> + '_ {
        self.players.iter().map(|(id, team)| (*id, *team))
    }

    pub fn active_mode(&self) -> Option<&dyn MatchMode> {
        match self.mode {
            GameMode::None => None,
            GameMode::TeamDeathmatch => Some(&self.tdm),
            GameMode::Domination => Some(&self.domination),
            GameMode::CaptureTheFlag => Some(&self.ctf),
            GameMode::SearchAndDestroy => Some(&self.snd),
            GameMode::Zombies => Some(&self.zombies),
        }
    }

    fn active_mode_mut(&mut self) -> Option<&mut dyn MatchMode> {
        match self.mode {
            GameMode::None => None,
            GameMode::TeamDeathmatch => Some(&mut self.tdm),
            GameMode::Domination => Some(&mut self.domination),
            GameMode::CaptureTheFlag => Some(&mut self.ctf),
            GameMode::SearchAndDestroy => Some(&mut self.snd),
            GameMode::Zombies => Some(&mut self.zombies),
        }
    }

    /// Advances mission timers and the active mode's clock.
    pub fn tick(&mut self, delta_sec: f32) {
        self.missions.tick(delta_sec);

        match self.mode {
            GameMode::Domination => self.tick_domination(delta_sec),
            GameMode::SearchAndDestroy => self.snd.tick(delta_sec),
            GameMode::Zombies => {
                let was_active = self.zombies.round_active;
                self.zombies.tick(delta_sec);
                self.after_zombie_update(was_active);
            }
            _ => {}
        }
        self.report_result();
    }

    fn tick_domination(&mut self, delta_sec: f32) {
        let owners_before: Vec<Team> = self.domination.points.iter().map(|p| p.owner).collect();
        self.domination.tick(delta_sec);

        let flipped: Vec<(usize, Team)> = self
            .domination
            .points
            .iter()
            .zip(owners_before)
            .filter(|(point, before)| point.owner != *before && point.owner.is_combatant())
            .map(|(point, _)| (point.id, point.owner))
            .collect();
        for (point_id, team) in flipped {
            for player_id in self.domination.players_on_point(point_id, team) {
                self.quests.notify_interact(player_id, CONTROL_POINT_OBJECT);
                self.missions.notify_interact(player_id, CONTROL_POINT_OBJECT);
            }
        }
    }

    fn after_zombie_update(&mut self, was_active: bool) {
        if !was_active || !self.zombies.round_complete {
            return;
        }
        let round = self.zombies.current_round as i32;
        for player_id in self.zombies.surviving_players() {
            self.quests.notify_survive_rounds(player_id, round);
        }
    }

    /// Credits the winning side's win objectives once per match.
    fn report_result(&mut self) {
        if self.result_reported {
            return;
        }
        let Some(winner) = self.active_mode().and_then(|mode| mode.winner()) else {
            return;
        };
        self.result_reported = true;

        let winners: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|(_, team)| **team == winner)
            .map(|(id, _)| *id)
            .collect();
        info!("{:?} match decided for {:?}", self.mode, winner);
        for player_id in winners {
            self.quests.notify_win_match(player_id, self.mode);
        }
    }

    /// Starts the next round in round-based modes.
    pub fn start_round(&mut self) -> bool {
        match self.mode {
            GameMode::SearchAndDestroy => self.snd.start_round(),
            GameMode::Zombies => self.zombies.start_round(),
            _ => false,
        }
    }

    /// Feeds one gameplay fact to the active mode and to progression.
    pub fn handle_event(&mut self, event: &GameEvent) {
        debug!("Gameplay event {:?}", event);
        let mode = self.mode;

        match event {
            GameEvent::Kill { killer, victim } => {
                match mode {
                    GameMode::TeamDeathmatch => self.tdm.on_kill(*killer, *victim),
                    GameMode::SearchAndDestroy => self.snd.on_player_killed(*victim),
                    _ => {}
                }
                self.quests.notify_kill(*killer, ENEMY_TARGET);
                self.missions.notify_kill(*killer, ENEMY_TARGET);
            }
            GameEvent::ZombieKilled { zombie_id, killer } => {
                if mode == GameMode::Zombies {
                    let was_active = self.zombies.round_active;
                    if self.zombies.zombie(*zombie_id).is_some() {
                        self.zombies.on_zombie_killed(*zombie_id, *killer);
                        self.credit_zombie_kill(*killer);
                    }
                    self.after_zombie_update(was_active);
                }
            }
            GameEvent::ZombieDamaged {
                zombie_id,
                attacker,
                amount,
            } => {
                if mode == GameMode::Zombies {
                    let was_active = self.zombies.round_active;
                    if self.zombies.damage_zombie(*zombie_id, *attacker, *amount) {
                        self.credit_zombie_kill(*attacker);
                    }
                    self.after_zombie_update(was_active);
                }
            }
            GameEvent::PlayerDowned { player } if mode == GameMode::Zombies => {
                self.zombies.on_player_downed(*player)
            }
            GameEvent::PlayerRevived { player } if mode == GameMode::Zombies => {
                self.zombies.on_player_revived(*player)
            }
            GameEvent::PlayerDied { player } if mode == GameMode::Zombies => {
                self.zombies.on_player_died(*player)
            }
            GameEvent::FlagPickup { player, flag_team } if mode == GameMode::CaptureTheFlag => {
                self.ctf.pickup_flag(*player, *flag_team);
            }
            GameEvent::FlagCapture { player } if mode == GameMode::CaptureTheFlag => {
                if self.ctf.capture_flag(*player) {
                    self.quests.notify_collect(*player, FLAG_CAPTURE_ITEM);
                }
            }
            GameEvent::FlagDrop { player } if mode == GameMode::CaptureTheFlag => {
                self.ctf.drop_flag(*player)
            }
            GameEvent::FlagReturn { team } if mode == GameMode::CaptureTheFlag => {
                self.ctf.return_flag(*team)
            }
            GameEvent::EnterPoint { player, point } if mode == GameMode::Domination => {
                self.domination
                    .set_player_on_point(*player, point.map(|p| p as usize));
            }
            GameEvent::BombPickedUp { player } if mode == GameMode::SearchAndDestroy => {
                self.snd.on_bomb_picked_up(*player);
            }
            GameEvent::BombDropped { player } if mode == GameMode::SearchAndDestroy => {
                self.snd.on_bomb_dropped(*player)
            }
            GameEvent::BombPlanted { player } if mode == GameMode::SearchAndDestroy => {
                self.snd.on_bomb_planted(*player);
            }
            GameEvent::BombDefused { player } if mode == GameMode::SearchAndDestroy => {
                if self.snd.on_bomb_defused(*player) {
                    self.quests.notify_interact(*player, BOMB_DEFUSE_OBJECT);
                    self.missions.notify_interact(*player, BOMB_DEFUSE_OBJECT);
                }
            }
            GameEvent::Collect { player, item } => self.quests.notify_collect(*player, item),
            GameEvent::Deliver { player, item } => self.quests.notify_deliver(*player, item),
            GameEvent::ReachLocation { player, location } => {
                self.quests.notify_reach_location(*player, location);
                self.missions.notify_reach_zone(*player, location);
            }
            GameEvent::Interact { player, object } => {
                self.quests.notify_interact(*player, object);
                self.missions.notify_interact(*player, object);
            }
            GameEvent::DefendProgress { player, progress } => {
                self.missions.notify_defend_progress(*player, *progress)
            }
            other => debug!("Ignoring {:?} outside its mode ({:?})", other, mode),
        }

        self.report_result();
    }

    fn credit_zombie_kill(&mut self, killer: PlayerId) {
        self.quests.notify_kill(killer, ZOMBIE_TARGET);
        self.missions.notify_kill(killer, ZOMBIE_TARGET);
    }

    /// Snapshot of the active match for clients.
    pub fn match_summary(&self) -> MatchSummary {
        let round = match self.mode {
            GameMode::SearchAndDestroy => self.snd.round_number,
            GameMode::Zombies => self.zombies.current_round,
            _ => 0,
        };
        match self.active_mode() {
            Some(active) => MatchSummary {
                mode: self.mode,
                scores: active.scores(),
                game_over: active.is_game_over(),
                winner: active.winner().unwrap_or_default(),
                round,
            },
            None => MatchSummary::default(),
        }
    }

    pub fn quests(&self) -> &QuestSystem {
        &self.quests
    }

    pub fn quests_mut(&mut self) -> &mut QuestSystem {
        &mut self.quests
    }

    pub fn missions(&self) -> &MissionSystem {
        &self.missions
    }

    pub fn missions_mut(&mut self) -> &mut MissionSystem {
        &mut self.missions
    }

    pub fn tdm(&self) -> &TeamDeathmatch {
        &self.tdm
    }

    pub fn domination(&self) -> &Domination {
        &self.domination
    }

    pub fn ctf(&self) -> &CaptureTheFlag {
        &self.ctf
    }

    pub fn snd(&self) -> &SearchAndDestroy {
        &self.snd
    }

    pub fn snd_mut(&mut self) -> &mut SearchAndDestroy {
        &mut self.snd
    }

    pub fn zombies(&self) -> &ZombiesMode {
        &self.zombies
    }

    pub fn zombies_mut(&mut self) -> &mut ZombiesMode {
        &mut self.zombies
    }
}
