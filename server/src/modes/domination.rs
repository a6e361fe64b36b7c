//! Domination: hold control points to accumulate score.
//!
//! Score is awarded in fixed intervals: every [`DOMINATION_TICK_INTERVAL_SEC`]
//! of accumulated time each owned point grants its owner
//! [`DOMINATION_POINTS_PER_TICK`]. Capture progress runs every tick for every
//! player standing on a point. An owning team reinforces its point at
//! [`DOMINATION_REINFORCE_RATE`] per second; any other team contests it at
//! [`DOMINATION_CONTEST_RATE`] per second and takes ownership at full
//! progress.

use super::MatchMode;
use log::{debug, info};
use shared::{
    PlayerId, Team, TeamScores, DEFAULT_CONTROL_POINTS, DOMINATION_CONTEST_RATE,
    DOMINATION_POINTS_PER_TICK, DOMINATION_REINFORCE_RATE, DOMINATION_SCORE_LIMIT,
    DOMINATION_TICK_INTERVAL_SEC, MAX_CONTROL_POINTS,
};
use std::collections::{BTreeMap, HashMap};

/// Slack for frame deltas that sum to exactly one scoring interval.
const INTERVAL_EPSILON_SEC: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct ControlPoint {
    pub id: usize,
    pub owner: Team,
    /// 0 is neutral, 1 is fully held by `owner` or fully taken by `contesting_team`.
    pub capture_progress: f32,
    pub contesting_team: Team,
}

impl ControlPoint {
    fn new(id: usize) -> Self {
        Self {
            id,
            owner: Team::None,
            capture_progress: 0.0,
            contesting_team: Team::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Domination {
    pub points: Vec<ControlPoint>,
    pub scores: TeamScores,
    pub players: HashMap<PlayerId, Team>,
    /// Which point each player stands on. Ordered so capture updates replay identically.
    pub player_on_point: BTreeMap<PlayerId, Option<usize>>,
    /// Seconds since the last scoring interval.
    pub tick_accumulator: f64,
    pub game_over: bool,
    pub winning_team: Team,
    point_count: usize,
}

impl Default for Domination {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROL_POINTS)
    }
}

impl Domination {
    pub fn new(point_count: usize) -> Self {
        let mut domination = Self {
            points: Vec::new(),
            scores: TeamScores::default(),
            players: HashMap::new(),
            player_on_point: BTreeMap::new(),
            tick_accumulator: 0.0,
            game_over: false,
            winning_team: Team::None,
            point_count: DEFAULT_CONTROL_POINTS,
        };
        domination.set_control_points(point_count);
        domination
    }

    /// Rebuilds the control points as neutral. The count is clamped to
    /// `1..=MAX_CONTROL_POINTS` and kept across resets.
    pub fn set_control_points(&mut self, count: usize) {
        self.point_count = count.clamp(1, MAX_CONTROL_POINTS);
        self.points = (0..self.point_count).map(ControlPoint::new).collect();
    }

    /// Puts a player on a point, or takes them off with `None`.
    pub fn set_player_on_point(&mut self, player_id: PlayerId, point_id: Option<usize>) {
        self.player_on_point.insert(player_id, point_id);
    }

    pub fn point(&self, point_id: usize) -> Option<&ControlPoint> {
        self.points.get(point_id)
    }

    /// Players of `team` currently standing on `point_id`.
    pub fn players_on_point(&self, point_id: usize, team: Team) -> Vec<PlayerId> {
        self.player_on_point
            .iter()
            .filter(|(_, point)| **point == Some(point_id))
            .filter(|(player_id, _)| self.players.get(player_id) == Some(&team))
            .map(|(player_id, _)| *player_id)
            .collect()
    }

    /// Moves one team's capture progress on a point. A new contesting team
    /// starts from zero rather than inheriting the previous contester's progress.
    fn update_capture(&mut self, point_id: usize, team: Team, delta_sec: f32) {
        let Some(point) = self.points.get_mut(point_id) else {
            return;
        };

        if point.owner == team {
            point.capture_progress =
                (point.capture_progress + delta_sec * DOMINATION_REINFORCE_RATE).min(1.0);
            return;
        }

        if point.contesting_team != team {
            point.contesting_team = team;
            point.capture_progress = 0.0;
        }
        point.capture_progress += delta_sec * DOMINATION_CONTEST_RATE;
        if point.capture_progress >= 1.0 {
            debug!("Control point {} captured by {:?}", point.id, team);
            point.owner = team;
            point.capture_progress = 0.0;
            point.contesting_team = Team::None;
        }
    }

    fn award_interval(&mut self) {
        for point in &self.points {
            if point.owner.is_combatant() {
                self.scores.add(point.owner, DOMINATION_POINTS_PER_TICK);
            }
        }
    }

    fn check_win_condition(&mut self) {
        if let Some(team) = self.scores.first_to(DOMINATION_SCORE_LIMIT) {
            self.game_over = true;
            self.winning_team = team;
            info!(
                "Domination won by {:?} ({} - {})",
                team, self.scores.alpha, self.scores.bravo
            );
        }
    }
}

impl MatchMode for Domination {
    fn reset(&mut self) {
        *self = Self::new(self.point_count);
    }

    fn add_player(&mut self, player_id: PlayerId, team: Team) {
        if !team.is_combatant() {
            return;
        }
        self.players.insert(player_id, team);
        self.player_on_point.insert(player_id, None);
    }

    fn remove_player(&mut self, player_id: PlayerId) {
        self.players.remove(&player_id);
        self.player_on_point.remove(&player_id);
    }

    fn tick(&mut self, delta_sec: f32) {
        if self.game_over {
            return;
        }

        let interval = f64::from(DOMINATION_TICK_INTERVAL_SEC);
        self.tick_accumulator += f64::from(delta_sec);
        while self.tick_accumulator + INTERVAL_EPSILON_SEC >= interval {
            self.tick_accumulator -= interval;
            self.award_interval();
            self.check_win_condition();
            if self.game_over {
                return;
            }
        }

        let standing: Vec<(usize, Team)> = self
            .player_on_point
            .iter()
            .filter_map(|(player_id, point)| {
                let team = self.players.get(player_id).copied()?;
                Some(((*point)?, team))
            })
            .filter(|(_, team)| *team != Team::None)
            .collect();
        for (point_id, team) in standing {
            self.update_capture(point_id, team, delta_sec);
        }
    }

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
