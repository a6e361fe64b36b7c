//! The five competitive match modes.
//!
//! Every mode keeps its own player roster, separate from the orchestrator's
//! global roster, and exposes the same lifecycle surface through
//! [`MatchMode`]. Mode-specific gameplay (kills, flags, bombs, zombies) lives
//! on the concrete types.

pub mod capture_the_flag;
pub mod domination;
pub mod search_and_destroy;
pub mod team_deathmatch;
pub mod zombies;

pub use capture_the_flag::{CaptureTheFlag, FlagState};
pub use domination::{ControlPoint, Domination};
pub use search_and_destroy::{RoundListener as SndRoundListener, SearchAndDestroy};
pub use team_deathmatch::TeamDeathmatch;
pub use zombies::{WaveConfig, ZombieInstance, ZombiePlayerState, ZombiesMode};

use shared::{PlayerId, Team, TeamScores};

/// Lifecycle surface shared by every mode.
pub trait MatchMode {
    /// Returns the mode to its initial state. Rosters survive only where the
    /// mode says so (Zombies keeps its players with fresh stats).
    fn reset(&mut self);

    /// Adds a player. Modes ignore teams they do not admit.
    fn add_player(&mut self, player_id: PlayerId, team: Team);

    fn remove_player(&mut self, player_id: PlayerId);

    /// Advances time-based logic. Modes without timers ignore it.
    fn tick(&mut self, delta_sec: f32);

    fn has_player(&self, player_id: PlayerId) -> bool;

    fn player_ids(&self) -> Vec<PlayerId>;

    fn scores(&self) -> TeamScores;

    /// The decided winner, if the match is over.
    fn winner(&self) -> Option<Team>;

    fn is_game_over(&self) -> bool {
        self.winner().is_some()
    }
}
