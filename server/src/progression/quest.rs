//! Quest tracking: prerequisite-gated tasks with counted objectives.

use super::Advance;
use crate::utils::unix_timestamp;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use shared::{GameMode, ObjectiveId, PlayerId, QuestId, QuestState};
use std::collections::{BTreeMap, HashMap};

/// Listener invoked on every quest state transition.
pub type QuestListener = Box<dyn FnMut(PlayerId, QuestId, QuestState) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestObjectiveType {
    Kill,
    Collect,
    ReachLocation,
    Interact,
    Deliver,
    SurviveRounds,
    WinMatches,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestObjective {
    pub id: ObjectiveId,
    #[serde(rename = "type")]
    pub kind: QuestObjectiveType,
    #[serde(default)]
    pub current: i32,
    pub target: i32,
    /// Matched against notification payloads, e.g. `"zombie"` or `"flag_capture"`.
    #[serde(default)]
    pub target_id: String,
    #[serde(default)]
    pub optional: bool,
}

impl QuestObjective {
    pub fn new(
        id: ObjectiveId,
        kind: QuestObjectiveType,
        target: i32,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind,
            current: 0,
            target,
            target_id: target_id.into(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn is_met(&self) -> bool {
        self.current >= self.target
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestCategory {
    #[default]
    Land,
    OuterSpace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestDefinition {
    pub id: QuestId,
    #[serde(default)]
    pub category: QuestCategory,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub objectives: Vec<QuestObjective>,
    #[serde(default)]
    pub reward_points: i32,
    #[serde(default)]
    pub prerequisite: Option<QuestId>,
}

/// A player's copy of a quest.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestProgress {
    pub quest_id: QuestId,
    pub state: QuestState,
    pub objectives: Vec<QuestObjective>,
    pub started_at: i64,
    pub completed_at: Option<i64>,
}

impl QuestProgress {
    /// All required objectives are at their target.
    pub fn requirements_met(&self) -> bool {
        self.objectives
            .iter()
            .filter(|objective| !objective.optional)
            .all(QuestObjective::is_met)
    }
}

/// Registry of quest definitions plus every player's quest instances.
#[derive(Default)]
pub struct QuestSystem {
    quests: HashMap<QuestId, QuestDefinition>,
    progress: HashMap<PlayerId, BTreeMap<QuestId, QuestProgress>>,
    listener: Option<QuestListener>,
}

impl QuestSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition, replacing any previous one with the same id.
    ///
    /// Returns false for the reserved id 0.
    pub fn register_quest(&mut self, definition: QuestDefinition) -> bool {
        if definition.id == 0 {
            return false;
        }
        self.quests.insert(definition.id, definition);
        true
    }

    pub fn register_quests(&mut self, definitions: impl IntoIterator<Item = QuestDefinition>) {
        for definition in definitions {
            self.register_quest(definition);
        }
    }

    pub fn set_listener(&mut self, listener: impl FnMut(PlayerId, QuestId, QuestState) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn quest(&self, quest_id: QuestId) -> Option<&QuestDefinition> {
        self.quests.get(&quest_id)
    }

    pub fn quest_count(&self) -> usize {
        self.quests.len()
    }

    pub fn progress(&self, player_id: PlayerId, quest_id: QuestId) -> Option<&QuestProgress> {
        self.progress.get(&player_id)?.get(&quest_id)
    }

    fn progress_mut(&mut self, player_id: PlayerId, quest_id: QuestId) -> Option<&mut QuestProgress> {
        self.progress.get_mut(&player_id)?.get_mut(&quest_id)
    }

    /// True when the quest has no prerequisite or the player completed it.
    pub fn meets_prerequisite(&self, player_id: PlayerId, quest_id: QuestId) -> bool {
        let Some(prerequisite) = self.quest(quest_id).and_then(|quest| quest.prerequisite) else {
            return true;
        };
        if prerequisite == 0 {
            return true;
        }
        self.progress(player_id, prerequisite)
            .map_or(false, |progress| progress.state == QuestState::Completed)
    }

    /// Starts a quest for the player.
    ///
    /// Fails for unknown quests, unmet prerequisites, and quests the player
    /// already has in progress or abandoned.
    pub fn start_quest(&mut self, player_id: PlayerId, quest_id: QuestId) -> bool {
        let Some(definition) = self.quests.get(&quest_id) else {
            return false;
        };
        if !self.meets_prerequisite(player_id, quest_id) {
            return false;
        }
        if let Some(existing) = self.progress(player_id, quest_id) {
            if matches!(existing.state, QuestState::InProgress | QuestState::Available) {
                return false;
            }
        }

        let progress = QuestProgress {
            quest_id,
            state: QuestState::InProgress,
            objectives: definition.objectives.clone(),
            started_at: unix_timestamp(),
            completed_at: None,
        };
        self.progress
            .entry(player_id)
            .or_default()
            .insert(quest_id, progress);

        debug!("Player {} started quest {}", player_id, quest_id);
        self.emit(player_id, quest_id, QuestState::InProgress);
        true
    }

    /// Moves an in-progress quest back to `Available`.
    pub fn abandon_quest(&mut self, player_id: PlayerId, quest_id: QuestId) {
        let Some(progress) = self.progress_mut(player_id, quest_id) else {
            return;
        };
        if progress.state != QuestState::InProgress {
            return;
        }
        progress.state = QuestState::Available;
        debug!("Player {} abandoned quest {}", player_id, quest_id);
        self.emit(player_id, quest_id, QuestState::Available);
    }

    pub fn update_objective(
        &mut self,
        player_id: PlayerId,
        quest_id: QuestId,
        objective_id: ObjectiveId,
        delta: i32,
    ) {
        self.advance_objective(player_id, quest_id, objective_id, Advance::By(delta));
    }

    pub fn set_objective_progress(
        &mut self,
        player_id: PlayerId,
        quest_id: QuestId,
        objective_id: ObjectiveId,
        value: i32,
    ) {
        self.advance_objective(player_id, quest_id, objective_id, Advance::To(value));
    }

    fn advance_objective(
        &mut self,
        player_id: PlayerId,
        quest_id: QuestId,
        objective_id: ObjectiveId,
        advance: Advance,
    ) {
        let Some(progress) = self.progress_mut(player_id, quest_id) else {
            return;
        };
        if progress.state != QuestState::InProgress {
            return;
        }
        let Some(objective) = progress
            .objectives
            .iter_mut()
            .find(|objective| objective.id == objective_id)
        else {
            return;
        };
        objective.current = advance.apply(objective.current, objective.target);
        self.check_completion(player_id, quest_id);
    }

    fn check_completion(&mut self, player_id: PlayerId, quest_id: QuestId) {
        let Some(progress) = self.progress_mut(player_id, quest_id) else {
            return;
        };
        if progress.state != QuestState::InProgress || !progress.requirements_met() {
            return;
        }
        progress.state = QuestState::Completed;
        progress.completed_at = Some(unix_timestamp());

        info!("Player {} completed quest {}", player_id, quest_id);
        self.emit(player_id, quest_id, QuestState::Completed);
    }

    /// Applies `advance` to every objective of every in-progress quest of the
    /// player that satisfies `matches`.
    fn notify(
        &mut self,
        player_id: PlayerId,
        matches: impl Fn(&QuestObjective) -> bool,
        advance: Advance,
    ) {
        let Some(quests) = self.progress.get(&player_id) else {
            return;
        };
        let mut targets: Vec<(QuestId, ObjectiveId)> = Vec::new();
        for (quest_id, progress) in quests {
            if progress.state != QuestState::InProgress {
                continue;
            }
            for objective in &progress.objectives {
                if matches(objective) {
                    targets.push((*quest_id, objective.id));
                }
            }
        }

        for (quest_id, objective_id) in targets {
            self.advance_objective(player_id, quest_id, objective_id, advance);
        }
    }

    pub fn notify_kill(&mut self, player_id: PlayerId, target_type: &str) {
        self.notify(
            player_id,
            |o| o.kind == QuestObjectiveType::Kill && o.target_id == target_type,
            Advance::By(1),
        );
    }

    pub fn notify_collect(&mut self, player_id: PlayerId, item_id: &str) {
        self.notify(
            player_id,
            |o| o.kind == QuestObjectiveType::Collect && o.target_id == item_id,
            Advance::By(1),
        );
    }

    pub fn notify_deliver(&mut self, player_id: PlayerId, item_id: &str) {
        self.notify(
            player_id,
            |o| o.kind == QuestObjectiveType::Deliver && o.target_id == item_id,
            Advance::By(1),
        );
    }

    /// Reaching a location counts once; it sets the objective to 1 instead of incrementing.
    pub fn notify_reach_location(&mut self, player_id: PlayerId, location_id: &str) {
        self.notify(
            player_id,
            |o| o.kind == QuestObjectiveType::ReachLocation && o.target_id == location_id,
            Advance::To(1),
        );
    }

    pub fn notify_interact(&mut self, player_id: PlayerId, object_id: &str) {
        self.notify(
            player_id,
            |o| o.kind == QuestObjectiveType::Interact && o.target_id == object_id,
            Advance::By(1),
        );
    }

    /// Sets every survive objective to the number of rounds survived so far.
    pub fn notify_survive_rounds(&mut self, player_id: PlayerId, rounds: i32) {
        self.notify(
            player_id,
            |o| o.kind == QuestObjectiveType::SurviveRounds,
            Advance::To(rounds),
        );
    }

    /// Win objectives with an empty or `"any"` target count wins in every mode.
    pub fn notify_win_match(&mut self, player_id: PlayerId, mode: GameMode) {
        let tag = mode.tag();
        self.notify(
            player_id,
            |o| {
                o.kind == QuestObjectiveType::WinMatches
                    && (o.target_id.is_empty() || o.target_id == "any" || o.target_id == tag)
            },
            Advance::By(1),
        );
    }

    /// Quests the player could start right now, sorted by id.
    pub fn available_quests(&self, player_id: PlayerId) -> Vec<QuestId> {
        let mut available: Vec<QuestId> = self
            .quests
            .keys()
            .copied()
            .filter(|quest_id| {
                let blocked = self.progress(player_id, *quest_id).map_or(false, |progress| {
                    matches!(progress.state, QuestState::Completed | QuestState::InProgress)
                });
                !blocked && self.meets_prerequisite(player_id, *quest_id)
            })
            .collect();
        available.sort_unstable();
        available
    }

    pub fn active_quests(&self, player_id: PlayerId) -> Vec<&QuestProgress> {
        self.progress
            .get(&player_id)
            .map(|quests| {
                quests
                    .values()
                    .filter(|progress| progress.state == QuestState::InProgress)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn emit(&mut self, player_id: PlayerId, quest_id: QuestId, state: QuestState) {
        if let Some(listener) = self.listener.as_mut() {
            listener(player_id, quest_id, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn kill_quest(id: QuestId, target: i32, target_id: &str, prerequisite: Option<QuestId>) -> QuestDefinition {
        QuestDefinition {
            id,
            category: QuestCategory::Land,
            title: format!("Quest {}", id),
            description: String::new(),
            objectives: vec![QuestObjective::new(1, QuestObjectiveType::Kill, target, target_id)],
            reward_points: 100,
            prerequisite,
        }
    }

    #[test]
    fn test_register_rejects_zero_id() {
        let mut quests = QuestSystem::new();
        assert!(!quests.register_quest(kill_quest(0, 1, "enemy", None)));
        assert!(quests.register_quest(kill_quest(1, 1, "enemy", None)));
        assert_eq!(quests.quest_count(), 1);
    }

    #[test]
    fn test_start_unknown_quest_fails() {
        let mut quests = QuestSystem::new();
        assert!(!quests.start_quest(1, 42));
        assert!(quests.progress(1, 42).is_none());
    }

    #[test]
    fn test_start_copies_objectives() {
        let mut quests = QuestSystem::new();
        quests.register_quest(kill_quest(1, 3, "enemy", None));

        assert!(quests.start_quest(7, 1));
        let progress = quests.progress(7, 1).unwrap();
        assert_eq!(progress.state, QuestState::InProgress);
        assert_eq!(progress.objectives.len(), 1);
        assert_eq!(progress.objectives[0].current, 0);
        assert!(progress.started_at > 0);
        assert!(progress.completed_at.is_none());
    }

    #[test]
    fn test_cannot_start_twice() {
        let mut quests = QuestSystem::new();
        quests.register_quest(kill_quest(1, 3, "enemy", None));

        assert!(quests.start_quest(7, 1));
        assert!(!quests.start_quest(7, 1));
    }

    #[test]
    fn test_prerequisite_gating() {
        let mut quests = QuestSystem::new();
        quests.register_quest(kill_quest(1, 2, "enemy", None));
        quests.register_quest(kill_quest(2, 1, "vehicle", Some(1)));

        assert!(!quests.start_quest(7, 2));
        assert!(quests.start_quest(7, 1));
        assert!(!quests.start_quest(7, 2));

        quests.notify_kill(7, "enemy");
        assert!(!quests.start_quest(7, 2));
        quests.notify_kill(7, "enemy");
        assert_eq!(quests.progress(7, 1).unwrap().state, QuestState::Completed);

        assert!(quests.start_quest(7, 2));
    }

    #[test]
    fn test_objective_clamped_to_target() {
        let mut quests = QuestSystem::new();
        let mut definition = kill_quest(1, 5, "enemy", None);
        definition
            .objectives
            .push(QuestObjective::new(2, QuestObjectiveType::Collect, 10, "scrap"));
        quests.register_quest(definition);
        quests.start_quest(7, 1);

        quests.update_objective(7, 1, 2, 25);
        assert_eq!(quests.progress(7, 1).unwrap().objectives[1].current, 10);

        quests.update_objective(7, 1, 2, -40);
        assert_eq!(quests.progress(7, 1).unwrap().objectives[1].current, 0);

        quests.set_objective_progress(7, 1, 2, 99);
        assert_eq!(quests.progress(7, 1).unwrap().objectives[1].current, 10);
        assert_eq!(quests.progress(7, 1).unwrap().state, QuestState::InProgress);
    }

    #[test]
    fn test_optional_objectives_do_not_block_completion() {
        let mut quests = QuestSystem::new();
        let mut definition = kill_quest(1, 1, "enemy", None);
        definition
            .objectives
            .push(QuestObjective::new(2, QuestObjectiveType::Collect, 5, "medkit").optional());
        quests.register_quest(definition);
        quests.start_quest(7, 1);

        quests.notify_kill(7, "enemy");

        let progress = quests.progress(7, 1).unwrap();
        assert_eq!(progress.state, QuestState::Completed);
        assert_eq!(progress.objectives[1].current, 0);
        assert!(progress.completed_at.is_some());
    }

    #[test]
    fn test_one_kill_advances_every_matching_quest() {
        let mut quests = QuestSystem::new();
        quests.register_quest(kill_quest(1, 2, "enemy", None));
        quests.register_quest(kill_quest(2, 3, "enemy", None));
        quests.register_quest(kill_quest(3, 1, "hostile", None));
        quests.start_quest(7, 1);
        quests.start_quest(7, 2);
        quests.start_quest(7, 3);

        quests.notify_kill(7, "enemy");
        quests.notify_kill(7, "enemy");

        assert_eq!(quests.progress(7, 1).unwrap().state, QuestState::Completed);
        assert_eq!(quests.progress(7, 2).unwrap().objectives[0].current, 2);
        assert_eq!(quests.progress(7, 2).unwrap().state, QuestState::InProgress);
        assert_eq!(quests.progress(7, 3).unwrap().objectives[0].current, 0);

        quests.notify_kill(7, "enemy");
        assert_eq!(quests.progress(7, 2).unwrap().state, QuestState::Completed);
        assert_eq!(quests.progress(7, 1).unwrap().objectives[0].current, 2);
    }

    #[test]
    fn test_notifications_are_per_player() {
        let mut quests = QuestSystem::new();
        quests.register_quest(kill_quest(1, 1, "enemy", None));
        quests.start_quest(1, 1);
        quests.start_quest(2, 1);

        quests.notify_kill(1, "enemy");

        assert_eq!(quests.progress(1, 1).unwrap().state, QuestState::Completed);
        assert_eq!(quests.progress(2, 1).unwrap().state, QuestState::InProgress);
    }

    #[test]
    fn test_reach_location_sets_single_step() {
        let mut quests = QuestSystem::new();
        quests.register_quest(QuestDefinition {
            objectives: vec![QuestObjective::new(1, QuestObjectiveType::ReachLocation, 3, "waypoint")],
            ..kill_quest(1, 1, "", None)
        });
        quests.start_quest(7, 1);

        quests.notify_reach_location(7, "waypoint");
        quests.notify_reach_location(7, "waypoint");

        assert_eq!(quests.progress(7, 1).unwrap().objectives[0].current, 1);
    }

    #[test]
    fn test_survive_rounds_tracks_latest_round() {
        let mut quests = QuestSystem::new();
        quests.register_quest(QuestDefinition {
            objectives: vec![QuestObjective::new(1, QuestObjectiveType::SurviveRounds, 5, "")],
            ..kill_quest(1, 1, "", None)
        });
        quests.start_quest(7, 1);

        quests.notify_survive_rounds(7, 3);
        assert_eq!(quests.progress(7, 1).unwrap().objectives[0].current, 3);

        quests.notify_survive_rounds(7, 6);
        assert_eq!(quests.progress(7, 1).unwrap().state, QuestState::Completed);
    }

    #[test]
    fn test_win_match_respects_mode_tag() {
        let mut quests = QuestSystem::new();
        let win_quest = |id, target_id: &str| QuestDefinition {
            objectives: vec![QuestObjective::new(1, QuestObjectiveType::WinMatches, 3, target_id)],
            ..kill_quest(id, 1, "", None)
        };
        quests.register_quest(win_quest(1, "tdm"));
        quests.register_quest(win_quest(2, "any"));
        quests.register_quest(win_quest(3, "domination"));
        for id in 1..=3 {
            quests.start_quest(7, id);
        }

        quests.notify_win_match(7, GameMode::TeamDeathmatch);

        assert_eq!(quests.progress(7, 1).unwrap().objectives[0].current, 1);
        assert_eq!(quests.progress(7, 2).unwrap().objectives[0].current, 1);
        assert_eq!(quests.progress(7, 3).unwrap().objectives[0].current, 0);
    }

    #[test]
    fn test_abandon_blocks_restart() {
        let mut quests = QuestSystem::new();
        quests.register_quest(kill_quest(1, 3, "enemy", None));
        quests.start_quest(7, 1);

        quests.abandon_quest(7, 1);
        assert_eq!(quests.progress(7, 1).unwrap().state, QuestState::Available);
        assert!(!quests.start_quest(7, 1));

        quests.notify_kill(7, "enemy");
        assert_eq!(quests.progress(7, 1).unwrap().objectives[0].current, 0);
    }

    #[test]
    fn test_available_quests() {
        let mut quests = QuestSystem::new();
        quests.register_quest(kill_quest(1, 1, "enemy", None));
        quests.register_quest(kill_quest(2, 1, "enemy", Some(1)));
        quests.register_quest(kill_quest(3, 1, "drone", None));

        assert_eq!(quests.available_quests(7), vec![1, 3]);

        quests.start_quest(7, 3);
        assert_eq!(quests.available_quests(7), vec![1]);

        quests.start_quest(7, 1);
        quests.notify_kill(7, "enemy");
        assert_eq!(quests.available_quests(7), vec![2]);
        assert!(quests.active_quests(7).iter().all(|p| p.quest_id == 3));
    }

    #[test]
    fn test_listener_sees_transitions_in_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let mut quests = QuestSystem::new();
        quests.set_listener(move |player, quest, state| {
            sink.lock().unwrap().push((player, quest, state));
        });
        quests.register_quest(kill_quest(1, 1, "enemy", None));
        quests.register_quest(kill_quest(2, 2, "enemy", None));

        quests.start_quest(7, 1);
        quests.start_quest(7, 2);
        quests.notify_kill(7, "enemy");
        quests.abandon_quest(7, 2);

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                (7, 1, QuestState::InProgress),
                (7, 2, QuestState::InProgress),
                (7, 1, QuestState::Completed),
                (7, 2, QuestState::Available),
            ]
        );
    }
}
