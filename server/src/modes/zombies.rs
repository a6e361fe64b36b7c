//! Wave-based co-op survival against zombies.
//!
//! Not team-based: every player is admitted regardless of team. A round
//! spawns its whole wave at once and completes when the last zombie dies.
//! The next round only starts when the caller asks for it.

use super::MatchMode;
use log::{debug, info};
use shared::{PlayerId, Team, TeamScores, ZombieId, ZombieType, ZOMBIES_STARTING_LIVES};
use std::collections::{BTreeMap, HashMap};

/// Invoked with `(round, started)` when a round starts or completes.
pub type RoundListener = Box<dyn FnMut(u32, bool) + Send>;
/// Invoked with `(killer, zombie, type, points awarded)`.
pub type KillListener = Box<dyn FnMut(PlayerId, ZombieId, ZombieType, i32) + Send>;

const HEALTH_PER_ROUND: f32 = 1.1;

fn base_health(kind: ZombieType) -> f32 {
    match kind {
        ZombieType::Walker => 100.0,
        ZombieType::Runner => 75.0,
        ZombieType::Brute => 400.0,
        ZombieType::Boss => 2000.0,
    }
}

fn base_points(kind: ZombieType) -> i32 {
    match kind {
        ZombieType::Walker => 60,
        ZombieType::Runner => 90,
        ZombieType::Brute => 250,
        ZombieType::Boss => 1500,
    }
}

/// What a round spawns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveConfig {
    pub round: u32,
    pub walkers: u32,
    pub runners: u32,
    pub brutes: u32,
    pub boss: bool,
    pub health_multiplier: f32,
}

impl WaveConfig {
    pub fn for_round(round: u32) -> Self {
        let r = round as i64;
        let total = (6 + 2 * r).min(50 + 2 * (r - 10)).max(6) as f32;
        let brutes = if round >= 3 { (round / 2).min(5) } else { 0 };

        Self {
            round,
            walkers: (total * 0.7) as u32,
            runners: (total * 0.25) as u32,
            brutes,
            boss: round >= 5 && round % 5 == 0,
            health_multiplier: HEALTH_PER_ROUND.powi(round.saturating_sub(1) as i32),
        }
    }

    pub fn total(&self) -> u32 {
        self.walkers + self.runners + self.brutes + u32::from(self.boss)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZombieInstance {
    pub id: ZombieId,
    pub kind: ZombieType,
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZombiePlayerState {
    pub player_id: PlayerId,
    pub points: i32,
    pub lives: i32,
    pub alive: bool,
    pub downed: bool,
}

impl ZombiePlayerState {
    fn fresh(player_id: PlayerId) -> Self {
        Self {
            player_id,
            points: 0,
            lives: ZOMBIES_STARTING_LIVES,
            alive: true,
            downed: false,
        }
    }
}

pub struct ZombiesMode {
    pub current_round: u32,
    pub spawned_this_round: u32,
    pub killed_this_round: u32,
    pub remaining: u32,
    pub round_active: bool,
    pub round_complete: bool,
    players: BTreeMap<PlayerId, ZombiePlayerState>,
    zombies: HashMap<ZombieId, ZombieInstance>,
    next_zombie_id: ZombieId,
    round_listener: Option<RoundListener>,
    kill_listener: Option<KillListener>,
}

impl Default for ZombiesMode {
    fn default() -> Self {
        Self {
            current_round: 0,
            spawned_this_round: 0,
            killed_this_round: 0,
            remaining: 0,
            round_active: false,
            round_complete: false,
            players: BTreeMap::new(),
            zombies: HashMap::new(),
            next_zombie_id: 1,
            round_listener: None,
            kill_listener: None,
        }
    }
}

impl ZombiesMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_round_listener(&mut self, listener: RoundListener) {
        self.round_listener = Some(listener);
    }

    pub fn set_kill_listener(&mut self, listener: KillListener) {
        self.kill_listener = Some(listener);
    }

    pub fn wave_config(&self, round: u32) -> WaveConfig {
        WaveConfig::for_round(round)
    }

    /// Advances to the next round and spawns its full wave. Refused while a
    /// round is still being fought.
    pub fn start_round(&mut self) -> bool {
        if self.round_active {
            return false;
        }

        self.current_round += 1;
        self.spawned_this_round = 0;
        self.killed_this_round = 0;
        self.remaining = 0;
        self.round_active = true;
        self.round_complete = false;
        self.spawn_wave();

        info!(
            "Zombies round {} started with {} zombies",
            self.current_round, self.spawned_this_round
        );
        let round = self.current_round;
        if let Some(listener) = self.round_listener.as_mut() {
            listener(round, true);
        }
        true
    }

    fn spawn_wave(&mut self) {
        let wave = WaveConfig::for_round(self.current_round);
        let counts = [
            (ZombieType::Walker, wave.walkers),
            (ZombieType::Runner, wave.runners),
            (ZombieType::Brute, wave.brutes),
            (ZombieType::Boss, u32::from(wave.boss)),
        ];
        for (kind, count) in counts {
            for _ in 0..count {
                self.spawn_zombie(kind, wave.health_multiplier);
            }
        }
    }

    fn spawn_zombie(&mut self, kind: ZombieType, health_multiplier: f32) {
        let id = self.next_zombie_id;
        self.next_zombie_id += 1;
        let max_health = base_health(kind) * health_multiplier;
        self.zombies.insert(
            id,
            ZombieInstance {
                id,
                kind,
                health: max_health,
                max_health,
                alive: true,
            },
        );
        self.spawned_this_round += 1;
        self.remaining += 1;
    }

    pub fn points_for(&self, kind: ZombieType) -> i32 {
        base_points(kind) + self.current_round as i32 * 10
    }

    /// Kills a zombie and pays the killer. Unknown ids are ignored.
    pub fn on_zombie_killed(&mut self, zombie_id: ZombieId, killer_id: PlayerId) {
        let Some(zombie) = self.zombies.remove(&zombie_id) else {
            return;
        };
        let points = self.points_for(zombie.kind);
        self.add_points(killer_id, points);
        self.killed_this_round += 1;
        self.remaining = self.remaining.saturating_sub(1);
        debug!(
            "Player {} killed zombie {} ({:?}) for {} points",
            killer_id, zombie_id, zombie.kind, points
        );

        if let Some(listener) = self.kill_listener.as_mut() {
            listener(killer_id, zombie_id, zombie.kind, points);
        }
        self.check_round_complete();
    }

    /// Applies damage and kills the zombie once its health is gone.
    /// Returns `true` if this hit was the kill.
    pub fn damage_zombie(&mut self, zombie_id: ZombieId, attacker_id: PlayerId, amount: f32) -> bool {
        let Some(zombie) = self.zombies.get_mut(&zombie_id) else {
            return false;
        };
        zombie.health = (zombie.health - amount.max(0.0)).max(0.0);
        if zombie.health > 0.0 {
            return false;
        }
        zombie.alive = false;
        self.on_zombie_killed(zombie_id, attacker_id);
        true
    }

    fn check_round_complete(&mut self) {
        if !self.round_active || self.remaining > 0 {
            return;
        }
        self.round_active = false;
        self.round_complete = true;
        info!("Zombies round {} cleared", self.current_round);

        let round = self.current_round;
        if let Some(listener) = self.round_listener.as_mut() {
            listener(round, false);
        }
    }

    pub fn on_player_downed(&mut self, player_id: PlayerId) {
        if let Some(state) = self.players.get_mut(&player_id) {
            if state.alive {
                state.downed = true;
            }
        }
    }

    pub fn on_player_revived(&mut self, player_id: PlayerId) {
        if let Some(state) = self.players.get_mut(&player_id) {
            state.downed = false;
        }
    }

    /// Costs a life. Out of lives means out for good, until a full reset.
    pub fn on_player_died(&mut self, player_id: PlayerId) {
        let Some(state) = self.players.get_mut(&player_id) else {
            return;
        };
        state.lives -= 1;
        state.alive = state.lives > 0;
        state.downed = false;
        if !state.alive {
            info!("Player {} is out of lives", player_id);
        }
    }

    pub fn add_points(&mut self, player_id: PlayerId, points: i32) {
        if let Some(state) = self.players.get_mut(&player_id) {
            state.points += points;
        }
    }

    pub fn spend_points(&mut self, player_id: PlayerId, cost: i32) -> bool {
        match self.players.get_mut(&player_id) {
            Some(state) if state.points >= cost => {
                state.points -= cost;
                true
            }
            _ => false,
        }
    }

    pub fn zombie(&self, zombie_id: ZombieId) -> Option<&ZombieInstance> {
        self.zombies.get(&zombie_id)
    }

    /// Live zombies in spawn order.
    pub fn alive_zombies(&self) -> Vec<&ZombieInstance> {
        let mut alive: Vec<_> = self.zombies.values().filter(|z| z.alive).collect();
        alive.sort_by_key(|z| z.id);
        alive
    }

    pub fn player_state(&self, player_id: PlayerId) -> Option<&ZombiePlayerState> {
        self.players.get(&player_id)
    }

    /// Players still in the fight, in id order.
    pub fn surviving_players(&self) -> Vec<PlayerId> {
        self.players
            .values()
            .filter(|state| state.alive)
            .map(|state| state.player_id)
            .collect()
    }
}

impl MatchMode for ZombiesMode {
    /// Back to round zero with every zombie cleared. Players stay enrolled
    /// with fresh points and lives.
    fn reset(&mut self) {
        let players = std::mem::take(&mut self.players);
        let round_listener = self.round_listener.take();
        let kill_listener = self.kill_listener.take();

        *self = Self::default();
        self.players = players
            .into_keys()
            .map(|player_id| (player_id, ZombiePlayerState::fresh(player_id)))
            .collect();
        self.round_listener = round_listener;
        self.kill_listener = kill_listener;
    }

    fn add_player(&mut self, player_id: PlayerId, _team: Team) {
        self.players
            .insert(player_id, ZombiePlayerState::fresh(player_id));
    }

    fn remove_player(&mut self, player_id: PlayerId) {
        self.players.remove(&player_id);
    }

    fn tick(&mut self, _delta_sec: f32) {
        self.check_round_complete();
    }

    fn has_player(&self, player_id: PlayerId) -> bool {
        self.players.contains_key(&player_id)
    }

    fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    /// Not team-based; no team score is kept.
    fn scores(&self) -> TeamScores {
        TeamScores::default()
    }

    fn winner(&self) -> Option<Team> {
        None
    }

    /// Over once every enrolled player has run out of lives.
    fn is_game_over(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|state| !state.alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_first_wave() {
        let wave = WaveConfig::for_round(1);
        assert_eq!(wave.walkers, 5);
        assert_eq!(wave.runners, 2);
        assert_eq!(wave.brutes, 0);
        assert!(!wave.boss);
        assert_eq!(wave.total(), 7);
        assert_approx_eq!(wave.health_multiplier, 1.0);
    }

    #[test]
    fn test_boss_every_fifth_round() {
        let wave = WaveConfig::for_round(5);
        assert!(wave.boss);
        assert_eq!(wave.brutes, 2);
        assert_eq!(wave.walkers, 11);
        assert_eq!(wave.runners, 4);
        assert_approx_eq!(wave.health_multiplier, 1.4641, 1e-4);

        assert!(!WaveConfig::for_round(6).boss);
        assert!(WaveConfig::for_round(10).boss);
    }

    #[test]
    fn test_brutes_capped() {
        assert_eq!(WaveConfig::for_round(2).brutes, 0);
        assert_eq!(WaveConfig::for_round(3).brutes, 1);
        assert_eq!(WaveConfig::for_round(20).brutes, 5);
    }

    #[test]
    fn test_start_round_spawns_whole_wave() {
        let mut zombies = ZombiesMode::new();
        zombies.add_player(1, Team::None);
        assert!(zombies.start_round());

        assert_eq!(zombies.current_round, 1);
        assert_eq!(zombies.spawned_this_round, 7);
        assert_eq!(zombies.remaining, 7);
        assert_eq!(zombies.alive_zombies().len(), 7);
        assert!(!zombies.start_round());
    }

    #[test]
    fn test_kill_pays_scaled_points() {
        let mut zombies = ZombiesMode::new();
        zombies.add_player(1, Team::Alpha);
        zombies.start_round();

        let walker = zombies.alive_zombies()[0].id;
        zombies.on_zombie_killed(walker, 1);
        assert_eq!(zombies.player_state(1).map(|p| p.points), Some(70));
        assert_eq!(zombies.remaining, 6);
        assert!(zombies.zombie(walker).is_none());

        // killing it twice pays nothing
        zombies.on_zombie_killed(walker, 1);
        assert_eq!(zombies.player_state(1).map(|p| p.points), Some(70));
    }

    #[test]
    fn test_last_kill_completes_round_once() {
        let rounds = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&rounds);

        let mut zombies = ZombiesMode::new();
        zombies.set_round_listener(Box::new(move |round, started| {
            sink.lock().unwrap().push((round, started));
        }));
        zombies.add_player(1, Team::None);
        zombies.start_round();

        let ids: Vec<_> = zombies.alive_zombies().iter().map(|z| z.id).collect();
        for id in ids {
            assert!(zombies.round_active);
            zombies.on_zombie_killed(id, 1);
        }
        assert!(!zombies.round_active);
        assert!(zombies.round_complete);

        zombies.tick(1.0);
        assert_eq!(*rounds.lock().unwrap(), vec![(1, true), (1, false)]);
        assert_eq!(zombies.current_round, 1);
    }

    #[test]
    fn test_damage_kills_at_zero_health() {
        let mut zombies = ZombiesMode::new();
        zombies.add_player(1, Team::None);
        zombies.start_round();
        let id = zombies.alive_zombies()[0].id;

        assert!(!zombies.damage_zombie(id, 1, 60.0));
        assert_approx_eq!(zombies.zombie(id).map_or(0.0, |z| z.health), 40.0);
        assert!(zombies.damage_zombie(id, 1, 60.0));
        assert!(zombies.zombie(id).is_none());
        assert!(!zombies.damage_zombie(id, 1, 60.0));
    }

    #[test]
    fn test_lives_run_out_permanently() {
        let mut zombies = ZombiesMode::new();
        zombies.add_player(1, Team::None);
        zombies.add_player(2, Team::None);

        zombies.on_player_downed(1);
        assert!(zombies.player_state(1).is_some_and(|p| p.downed));
        zombies.on_player_revived(1);

        for _ in 0..ZOMBIES_STARTING_LIVES {
            zombies.on_player_died(1);
        }
        let state = zombies.player_state(1).cloned();
        assert_eq!(state.as_ref().map(|p| p.alive), Some(false));
        assert_eq!(state.map(|p| p.lives), Some(0));

        // a dead player cannot be downed
        zombies.on_player_downed(1);
        assert!(zombies.player_state(1).is_some_and(|p| !p.downed));
        assert_eq!(zombies.surviving_players(), vec![2]);
        assert!(!zombies.is_game_over());

        for _ in 0..ZOMBIES_STARTING_LIVES {
            zombies.on_player_died(2);
        }
        assert!(zombies.is_game_over());
    }

    #[test]
    fn test_spend_points() {
        let mut zombies = ZombiesMode::new();
        zombies.add_player(1, Team::None);
        zombies.add_points(1, 500);

        assert!(!zombies.spend_points(1, 950));
        assert!(zombies.spend_points(1, 500));
        assert_eq!(zombies.player_state(1).map(|p| p.points), Some(0));
        assert!(!zombies.spend_points(7, 0));
    }

    #[test]
    fn test_reset_keeps_players_with_fresh_stats() {
        let mut zombies = ZombiesMode::new();
        zombies.add_player(1, Team::None);
        zombies.start_round();
        zombies.add_points(1, 1000);
        zombies.on_player_died(1);
        zombies.reset();

        assert_eq!(zombies.current_round, 0);
        assert!(zombies.alive_zombies().is_empty());
        assert_eq!(
            zombies.player_state(1),
            Some(&ZombiePlayerState::fresh(1))
        );
    }
}
