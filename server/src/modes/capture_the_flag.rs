use super::MatchMode;
use log::{debug, info};
use shared::{PlayerId, Team, TeamScores, CTF_SCORE_LIMIT, FLAG_RETURN_SEC};
use std::collections::HashMap;

/// Where a team's flag is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlagState {
    pub team: Team,
    pub at_base: bool,
    pub carrier: Option<PlayerId>,
    /// Set when the flag is dropped. Nothing counts it down; a dropped flag
    /// stays in the field until [`CaptureTheFlag::return_flag`] is called.
    pub return_timer_sec: f32,
}

impl FlagState {
    fn at_base(team: Team) -> Self {
        Self {
            team,
            at_base: true,
            carrier: None,
            return_timer_sec: 0.0,
        }
    }

    fn drop_in_field(&mut self) {
        self.carrier = None;
        self.at_base = false;
        self.return_timer_sec = FLAG_RETURN_SEC;
    }
}

#[derive(Debug, Clone)]
pub struct CaptureTheFlag {
    pub scores: TeamScores,
    pub players: HashMap<PlayerId, Team>,
    pub alpha_flag: FlagState,
    pub bravo_flag: FlagState,
    pub game_over: bool,
    pub winning_team: Team,
}

impl Default for CaptureTheFlag {
    fn default() -> Self {
        Self {
            scores: TeamScores::default(),
            players: HashMap::new(),
            alpha_flag: FlagState::at_base(Team::Alpha),
            bravo_flag: FlagState::at_base(Team::Bravo),
            game_over: false,
            winning_team: Team::None,
        }
    }
}

impl CaptureTheFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self, team: Team) -> Option<&FlagState> {
        match team {
            Team::Alpha => Some(&self.alpha_flag),
            Team::Bravo => Some(&self.bravo_flag),
            _ => None,
        }
    }

    fn flag_mut(&mut self, team: Team) -> Option<&mut FlagState> {
        match team {
            Team::Alpha => Some(&mut self.alpha_flag),
            Team::Bravo => Some(&mut self.bravo_flag),
            _ => None,
        }
    }

    /// Picks up an enemy flag from its base. Returns `false` if the flag is
    /// not at base, belongs to the player's own team, or the player is unknown.
    pub fn pickup_flag(&mut self, player_id: PlayerId, flag_team: Team) -> bool {
        if self.game_over {
            return false;
        }
        let Some(player_team) = self.players.get(&player_id).copied() else {
            return false;
        };
        if player_team == flag_team {
            return false;
        }
        let Some(flag) = self.flag_mut(flag_team) else {
            return false;
        };
        if !flag.at_base {
            return false;
        }

        flag.at_base = false;
        flag.carrier = Some(player_id);
        debug!("Player {} picked up the {:?} flag", player_id, flag_team);
        true
    }

    /// Scores a capture. Needs the player's own flag at base and the enemy
    /// flag in the player's hands; otherwise nothing changes.
    pub fn capture_flag(&mut self, player_id: PlayerId) -> bool {
        if self.game_over {
            return false;
        }
        let Some(team) = self.players.get(&player_id).copied() else {
            return false;
        };
        if !self.flag(team).is_some_and(|flag| flag.at_base) {
            return false;
        }
        let enemy = team.opponent();
        if self.flag(enemy).and_then(|flag| flag.carrier) != Some(player_id) {
            return false;
        }

        if let Some(flag) = self.flag_mut(enemy) {
            *flag = FlagState::at_base(enemy);
        }
        self.scores.add(team, 1);
        info!("Player {} captured the {:?} flag", player_id, enemy);
        self.check_win_condition();
        true
    }

    /// Drops whatever flag the player carries where they stand.
    pub fn drop_flag(&mut self, player_id: PlayerId) {
        for flag in [&mut self.alpha_flag, &mut self.bravo_flag] {
            if flag.carrier == Some(player_id) {
                flag.drop_in_field();
                debug!("Player {} dropped the {:?} flag", player_id, flag.team);
            }
        }
    }

    pub fn return_flag(&mut self, team: Team) {
        if let Some(flag) = self.flag_mut(team) {
            *flag = FlagState::at_base(team);
        }
    }

    fn check_win_condition(&mut self) {
        if let Some(team) = self.scores.first_to(CTF_SCORE_LIMIT) {
            self.game_over = true;
            self.winning_team = team;
            info!(
                "Capture the flag won by {:?} ({} - {})",
                team, self.scores.alpha, self.scores.bravo
            );
        }
    }
}

impl MatchMode for CaptureTheFlag {
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
        self.drop_flag(player_id);
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

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn setup() -> CaptureTheFlag {
        let mut ctf = CaptureTheFlag::new();
        ctf.add_player(1, Team::Alpha);
        ctf.add_player(2, Team::Bravo);
        ctf
    }

    #[test]
    fn test_cannot_pick_up_own_flag() {
        let mut ctf = setup();
        assert!(!ctf.pickup_flag(1, Team::Alpha));
        assert!(ctf.alpha_flag.at_base);
    }

    #[test]
    fn test_unknown_player_cannot_pick_up() {
        let mut ctf = setup();
        assert!(!ctf.pickup_flag(9, Team::Bravo));
        assert!(!ctf.pickup_flag(1, Team::Spectator));
    }

    #[test]
    fn test_capture_requires_carrying_enemy_flag() {
        let mut ctf = setup();
        assert!(!ctf.capture_flag(1));
        assert_eq!(ctf.scores, TeamScores::default());
    }

    #[test]
    fn test_capture_requires_own_flag_home() {
        let mut ctf = setup();
        assert!(ctf.pickup_flag(1, Team::Bravo));
        assert!(ctf.pickup_flag(2, Team::Alpha));

        assert!(!ctf.capture_flag(1));
        assert_eq!(ctf.scores.alpha, 0);
        assert_eq!(ctf.bravo_flag.carrier, Some(1));
    }

    #[test]
    fn test_capture_scores_and_returns_flag() {
        let mut ctf = setup();
        assert!(ctf.pickup_flag(1, Team::Bravo));
        assert!(ctf.capture_flag(1));

        assert_eq!(ctf.scores.alpha, 1);
        assert_eq!(ctf.scores.bravo, 0);
        assert!(ctf.bravo_flag.at_base);
        assert_eq!(ctf.bravo_flag.carrier, None);
    }

    #[test]
    fn test_third_capture_wins() {
        let mut ctf = setup();
        for _ in 0..CTF_SCORE_LIMIT {
            assert!(ctf.pickup_flag(2, Team::Alpha));
            assert!(ctf.capture_flag(2));
        }

        assert!(ctf.game_over);
        assert_eq!(ctf.winner(), Some(Team::Bravo));
        assert!(!ctf.pickup_flag(2, Team::Alpha));
    }

    #[test]
    fn test_drop_leaves_flag_in_field() {
        let mut ctf = setup();
        ctf.pickup_flag(1, Team::Bravo);
        ctf.drop_flag(1);

        assert!(!ctf.bravo_flag.at_base);
        assert_eq!(ctf.bravo_flag.carrier, None);
        assert_approx_eq!(ctf.bravo_flag.return_timer_sec, FLAG_RETURN_SEC);

        // a dropped flag cannot be picked up again until it is returned
        assert!(!ctf.pickup_flag(1, Team::Bravo));
        ctf.return_flag(Team::Bravo);
        assert!(ctf.bravo_flag.at_base);
        assert!(ctf.pickup_flag(1, Team::Bravo));
    }

    #[test]
    fn test_removed_carrier_drops_flag() {
        let mut ctf = setup();
        ctf.pickup_flag(2, Team::Alpha);
        ctf.remove_player(2);

        assert!(!ctf.has_player(2));
        assert!(!ctf.alpha_flag.at_base);
        assert_eq!(ctf.alpha_flag.carrier, None);
    }

    #[test]
    fn test_reset_restores_flags() {
        let mut ctf = setup();
        ctf.pickup_flag(1, Team::Bravo);
        ctf.capture_flag(1);
        ctf.pickup_flag(2, Team::Alpha);
        ctf.reset();

        assert_eq!(ctf.scores, TeamScores::default());
        assert!(ctf.alpha_flag.at_base && ctf.bravo_flag.at_base);
        assert!(ctf.players.is_empty());
    }
}
