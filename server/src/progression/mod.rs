//! Long-lived per-player progression: quests and missions.
//!
//! Both engines follow the same shape. Static definitions are registered once,
//! a player starts a task which deep-copies the definition's objectives into a
//! per-player instance, and gameplay notifications advance every in-progress
//! instance whose objectives match. Each engine owns one optional listener that
//! is invoked synchronously on every state transition.
//!
//! Progression is independent of the active match mode and survives mode
//! switches untouched.

pub mod mission;
pub mod quest;

pub use mission::{
    MissionDefinition, MissionInstance, MissionListener, MissionObjective, MissionObjectiveType,
    MissionSystem,
};
pub use quest::{
    QuestCategory, QuestDefinition, QuestListener, QuestObjective, QuestObjectiveType,
    QuestProgress, QuestSystem,
};

/// Clamps an objective counter into `[0, target]`.
pub(crate) fn clamp_progress(value: i32, target: i32) -> i32 {
    value.clamp(0, target.max(0))
}

/// How a notification changes a matching objective.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Advance {
    By(i32),
    To(i32),
}

impl Advance {
    pub(crate) fn apply(self, current: i32, target: i32) -> i32 {
        match self {
            Advance::By(delta) => clamp_progress(current.saturating_add(delta), target),
            Advance::To(value) => clamp_progress(value, target),
        }
    }
}
