//! Mission tracking: chained tasks with timed objectives.
//!
//! Unlike quests, missions have no prerequisites. A mission may name a
//! successor that starts automatically on success, and any objective may
//! carry a countdown that fails the whole mission when it runs out.

use super::Advance;
use crate::utils::unix_timestamp;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use shared::{MissionId, MissionState, ObjectiveId, PlayerId};
use std::collections::{BTreeMap, HashMap};

/// Listener invoked on every mission state transition.
pub type MissionListener = Box<dyn FnMut(PlayerId, MissionId, MissionState) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionObjectiveType {
    EliminateAll,
    ReachZone,
    InteractWith,
    Defend,
    Escort,
    Timed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionObjective {
    pub id: ObjectiveId,
    #[serde(rename = "type")]
    pub kind: MissionObjectiveType,
    #[serde(default)]
    pub progress: i32,
    pub target: i32,
    #[serde(default)]
    pub target_tag: String,
    /// Remaining seconds; zero or less means untimed.
    #[serde(default)]
    pub time_limit_sec: f32,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub completed: bool,
}

impl MissionObjective {
    pub fn new(
        id: ObjectiveId,
        kind: MissionObjectiveType,
        target: i32,
        target_tag: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind,
            progress: 0,
            target,
            target_tag: target_tag.into(),
            time_limit_sec: 0.0,
            optional: false,
            completed: false,
        }
    }

    pub fn timed(mut self, seconds: f32) -> Self {
        self.time_limit_sec = seconds;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionDefinition {
    pub id: MissionId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub objectives: Vec<MissionObjective>,
    /// Started automatically when this mission succeeds.
    #[serde(default)]
    pub next_mission: Option<MissionId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissionInstance {
    pub mission_id: MissionId,
    pub state: MissionState,
    /// Index of the first objective not yet completed.
    pub current_objective: usize,
    pub objectives: Vec<MissionObjective>,
    pub started_at: i64,
    pub completed_at: Option<i64>,
}

impl MissionInstance {
    pub fn requirements_met(&self) -> bool {
        self.objectives
            .iter()
            .filter(|objective| !objective.optional)
            .all(|objective| objective.completed)
    }
}

#[derive(Default)]
pub struct MissionSystem {
    missions: HashMap<MissionId, MissionDefinition>,
    instances: HashMap<PlayerId, BTreeMap<MissionId, MissionInstance>>,
    /// Most recently started mission per player that is still active.
    latest: HashMap<PlayerId, MissionId>,
    listener: Option<MissionListener>,
}

impl MissionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_mission(&mut self, definition: MissionDefinition) -> bool {
        if definition.id == 0 {
            return false;
        }
        self.missions.insert(definition.id, definition);
        true
    }

    pub fn register_missions(&mut self, definitions: impl IntoIterator<Item = MissionDefinition>) {
        for definition in definitions {
            self.register_mission(definition);
        }
    }

    pub fn set_listener(
        &mut self,
        listener: impl FnMut(PlayerId, MissionId, MissionState) + Send + 'static,
    ) {
        self.listener = Some(Box::new(listener));
    }

    pub fn mission(&self, mission_id: MissionId) -> Option<&MissionDefinition> {
        self.missions.get(&mission_id)
    }

    pub fn mission_count(&self) -> usize {
        self.missions.len()
    }

    pub fn instance(&self, player_id: PlayerId, mission_id: MissionId) -> Option<&MissionInstance> {
        self.instances.get(&player_id)?.get(&mission_id)
    }

    fn instance_mut(
        &mut self,
        player_id: PlayerId,
        mission_id: MissionId,
    ) -> Option<&mut MissionInstance> {
        self.instances.get_mut(&player_id)?.get_mut(&mission_id)
    }

    /// Starts (or restarts after failure) a mission for the player.
    ///
    /// Fails for unknown missions and for missions the player has active or
    /// has already completed.
    pub fn start_mission(&mut self, player_id: PlayerId, mission_id: MissionId) -> bool {
        let Some(definition) = self.missions.get(&mission_id) else {
            return false;
        };
        if let Some(existing) = self.instance(player_id, mission_id) {
            if matches!(existing.state, MissionState::Active | MissionState::Success) {
                return false;
            }
        }

        let instance = MissionInstance {
            mission_id,
            state: MissionState::Active,
            current_objective: 0,
            objectives: definition.objectives.clone(),
            started_at: unix_timestamp(),
            completed_at: None,
        };
        self.instances
            .entry(player_id)
            .or_default()
            .insert(mission_id, instance);
        self.latest.insert(player_id, mission_id);

        debug!("Player {} started mission {}", player_id, mission_id);
        self.emit(player_id, mission_id, MissionState::Active);
        true
    }

    pub fn fail_mission(&mut self, player_id: PlayerId, mission_id: MissionId) {
        let Some(instance) = self.instance_mut(player_id, mission_id) else {
            return;
        };
        if instance.state != MissionState::Active {
            return;
        }
        instance.state = MissionState::Failed;
        instance.completed_at = Some(unix_timestamp());
        self.clear_latest(player_id, mission_id);

        info!("Player {} failed mission {}", player_id, mission_id);
        self.emit(player_id, mission_id, MissionState::Failed);
    }

    pub fn update_objective_progress(
        &mut self,
        player_id: PlayerId,
        mission_id: MissionId,
        objective_id: ObjectiveId,
        delta: i32,
    ) {
        self.advance_objective(player_id, mission_id, objective_id, Advance::By(delta));
    }

    /// Marks an objective complete regardless of its counter.
    pub fn complete_objective(
        &mut self,
        player_id: PlayerId,
        mission_id: MissionId,
        objective_id: ObjectiveId,
    ) {
        let Some(objective) = self.active_objective_mut(player_id, mission_id, objective_id) else {
            return;
        };
        objective.completed = true;
        objective.progress = objective.target.max(0);
        self.advance_mission(player_id, mission_id);
    }

    fn advance_objective(
        &mut self,
        player_id: PlayerId,
        mission_id: MissionId,
        objective_id: ObjectiveId,
        advance: Advance,
    ) {
        let Some(objective) = self.active_objective_mut(player_id, mission_id, objective_id) else {
            return;
        };
        objective.progress = advance.apply(objective.progress, objective.target);
        if objective.progress >= objective.target {
            objective.completed = true;
            self.advance_mission(player_id, mission_id);
        }
    }

    /// An incomplete objective of an active mission.
    fn active_objective_mut(
        &mut self,
        player_id: PlayerId,
        mission_id: MissionId,
        objective_id: ObjectiveId,
    ) -> Option<&mut MissionObjective> {
        let instance = self.instance_mut(player_id, mission_id)?;
        if instance.state != MissionState::Active {
            return None;
        }
        instance
            .objectives
            .iter_mut()
            .find(|objective| objective.id == objective_id && !objective.completed)
    }

    fn advance_mission(&mut self, player_id: PlayerId, mission_id: MissionId) {
        let Some(instance) = self.instance_mut(player_id, mission_id) else {
            return;
        };
        while instance
            .objectives
            .get(instance.current_objective)
            .map_or(false, |objective| objective.completed)
        {
            instance.current_objective += 1;
        }
        self.check_success(player_id, mission_id);
    }

    fn check_success(&mut self, player_id: PlayerId, mission_id: MissionId) {
        let Some(instance) = self.instance_mut(player_id, mission_id) else {
            return;
        };
        if instance.state != MissionState::Active || !instance.requirements_met() {
            return;
        }
        instance.state = MissionState::Success;
        instance.completed_at = Some(unix_timestamp());
        self.clear_latest(player_id, mission_id);

        info!("Player {} completed mission {}", player_id, mission_id);
        self.emit(player_id, mission_id, MissionState::Success);

        let next = self.mission(mission_id).and_then(|mission| mission.next_mission);
        if let Some(next) = next.filter(|next| *next != 0) {
            if !self.start_mission(player_id, next) {
                debug!(
                    "Mission {} could not chain into mission {} for player {}",
                    mission_id, next, player_id
                );
            }
        }
    }

    fn notify(
        &mut self,
        player_id: PlayerId,
        matches: impl Fn(&MissionObjective) -> bool,
        apply: impl Fn(&mut Self, MissionId, &MissionObjective),
    ) {
        let Some(missions) = self.instances.get(&player_id) else {
            return;
        };
        let mut targets: Vec<(MissionId, MissionObjective)> = Vec::new();
        for (mission_id, instance) in missions {
            if instance.state != MissionState::Active {
                continue;
            }
            for objective in &instance.objectives {
                if !objective.completed && matches(objective) {
                    targets.push((*mission_id, objective.clone()));
                }
            }
        }

        for (mission_id, objective) in targets {
            apply(self, mission_id, &objective);
        }
    }

    pub fn notify_kill(&mut self, player_id: PlayerId, target_tag: &str) {
        self.notify(
            player_id,
            |o| o.kind == MissionObjectiveType::EliminateAll && o.target_tag == target_tag,
            |missions, mission_id, o| {
                missions.update_objective_progress(player_id, mission_id, o.id, 1)
            },
        );
    }

    pub fn notify_reach_zone(&mut self, player_id: PlayerId, zone_tag: &str) {
        self.notify(
            player_id,
            |o| o.kind == MissionObjectiveType::ReachZone && o.target_tag == zone_tag,
            |missions, mission_id, o| missions.complete_objective(player_id, mission_id, o.id),
        );
    }

    pub fn notify_interact(&mut self, player_id: PlayerId, object_tag: &str) {
        self.notify(
            player_id,
            |o| o.kind == MissionObjectiveType::InteractWith && o.target_tag == object_tag,
            |missions, mission_id, o| missions.complete_objective(player_id, mission_id, o.id),
        );
    }

    /// Sets every defend objective to the absolute `progress` value.
    pub fn notify_defend_progress(&mut self, player_id: PlayerId, progress: i32) {
        self.notify(
            player_id,
            |o| o.kind == MissionObjectiveType::Defend,
            |missions, mission_id, o| {
                missions.advance_objective(player_id, mission_id, o.id, Advance::To(progress))
            },
        );
    }

    /// Counts down timed objectives; an expired objective fails its mission.
    pub fn tick(&mut self, delta_sec: f32) {
        let mut expired: Vec<(PlayerId, MissionId)> = Vec::new();
        for (player_id, missions) in self.instances.iter_mut() {
            for (mission_id, instance) in missions.iter_mut() {
                if instance.state != MissionState::Active {
                    continue;
                }
                for objective in instance.objectives.iter_mut() {
                    if objective.completed || objective.time_limit_sec <= 0.0 {
                        continue;
                    }
                    objective.time_limit_sec -= delta_sec;
                    if objective.time_limit_sec <= 0.0 {
                        expired.push((*player_id, *mission_id));
                    }
                }
            }
        }

        expired.sort_unstable();
        expired.dedup();
        for (player_id, mission_id) in expired {
            self.fail_mission(player_id, mission_id);
        }
    }

    /// Missions the player could start right now, sorted by id.
    pub fn available_missions(&self, player_id: PlayerId) -> Vec<MissionId> {
        let mut available: Vec<MissionId> = self
            .missions
            .keys()
            .copied()
            .filter(|mission_id| {
                !self.instance(player_id, *mission_id).map_or(false, |instance| {
                    matches!(instance.state, MissionState::Active | MissionState::Success)
                })
            })
            .collect();
        available.sort_unstable();
        available
    }

    pub fn active_missions(&self, player_id: PlayerId) -> Vec<&MissionInstance> {
        self.instances
            .get(&player_id)
            .map(|missions| {
                missions
                    .values()
                    .filter(|instance| instance.state == MissionState::Active)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The most recently started mission that is still active.
    pub fn active_mission(&self, player_id: PlayerId) -> Option<&MissionInstance> {
        let mission_id = self.latest.get(&player_id)?;
        self.instance(player_id, *mission_id)
    }

    fn clear_latest(&mut self, player_id: PlayerId, mission_id: MissionId) {
        if self.latest.get(&player_id) == Some(&mission_id) {
            self.latest.remove(&player_id);
        }
    }

    fn emit(&mut self, player_id: PlayerId, mission_id: MissionId, state: MissionState) {
        if let Some(listener) = self.listener.as_mut() {
            listener(player_id, mission_id, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::sync::{Arc, Mutex};

    fn mission(id: MissionId, objectives: Vec<MissionObjective>, next: Option<MissionId>) -> MissionDefinition {
        MissionDefinition {
            id,
            title: format!("Mission {}", id),
            description: String::new(),
            objectives,
            next_mission: next,
        }
    }

    fn eliminate(id: ObjectiveId, target: i32, tag: &str) -> MissionObjective {
        MissionObjective::new(id, MissionObjectiveType::EliminateAll, target, tag)
    }

    #[test]
    fn test_start_mission() {
        let mut missions = MissionSystem::new();
        missions.register_mission(mission(1, vec![eliminate(1, 2, "drone")], None));

        assert!(!missions.start_mission(3, 99));
        assert!(missions.start_mission(3, 1));
        assert!(!missions.start_mission(3, 1));

        let instance = missions.instance(3, 1).unwrap();
        assert_eq!(instance.state, MissionState::Active);
        assert_eq!(instance.current_objective, 0);
        assert_eq!(missions.active_mission(3).unwrap().mission_id, 1);
    }

    #[test]
    fn test_objectives_complete_in_any_order() {
        let mut missions = MissionSystem::new();
        missions.register_mission(mission(
            1,
            vec![
                eliminate(1, 2, "drone"),
                MissionObjective::new(2, MissionObjectiveType::ReachZone, 1, "bridge"),
            ],
            None,
        ));
        missions.start_mission(3, 1);

        missions.notify_reach_zone(3, "bridge");
        let instance = missions.instance(3, 1).unwrap();
        assert!(instance.objectives[1].completed);
        assert_eq!(instance.current_objective, 0);

        missions.notify_kill(3, "drone");
        missions.notify_kill(3, "drone");
        let instance = missions.instance(3, 1).unwrap();
        assert_eq!(instance.state, MissionState::Success);
        assert_eq!(instance.current_objective, 2);
        assert!(instance.completed_at.is_some());
        assert!(missions.active_mission(3).is_none());
    }

    #[test]
    fn test_progress_clamped() {
        let mut missions = MissionSystem::new();
        missions.register_mission(mission(1, vec![eliminate(1, 5, "drone")], None));
        missions.start_mission(3, 1);

        missions.update_objective_progress(3, 1, 1, -4);
        assert_eq!(missions.instance(3, 1).unwrap().objectives[0].progress, 0);

        missions.update_objective_progress(3, 1, 1, 50);
        let instance = missions.instance(3, 1).unwrap();
        assert_eq!(instance.objectives[0].progress, 5);
        assert_eq!(instance.state, MissionState::Success);
    }

    #[test]
    fn test_success_chains_next_mission() {
        let mut missions = MissionSystem::new();
        missions.register_mission(mission(1, vec![eliminate(1, 1, "drone")], Some(2)));
        missions.register_mission(mission(2, vec![eliminate(1, 1, "hostile")], None));
        missions.start_mission(3, 1);

        missions.notify_kill(3, "drone");

        assert_eq!(missions.instance(3, 1).unwrap().state, MissionState::Success);
        assert_eq!(missions.instance(3, 2).unwrap().state, MissionState::Active);
        assert_eq!(missions.active_mission(3).unwrap().mission_id, 2);
    }

    #[test]
    fn test_chain_cycle_stops_at_completed_mission() {
        let mut missions = MissionSystem::new();
        missions.register_mission(mission(1, vec![eliminate(1, 1, "drone")], Some(2)));
        missions.register_mission(mission(2, vec![eliminate(1, 1, "drone")], Some(1)));
        missions.start_mission(3, 1);

        missions.notify_kill(3, "drone");
        assert_eq!(missions.instance(3, 2).unwrap().state, MissionState::Active);

        missions.notify_kill(3, "drone");
        assert_eq!(missions.instance(3, 1).unwrap().state, MissionState::Success);
        assert_eq!(missions.instance(3, 2).unwrap().state, MissionState::Success);
        assert!(missions.active_missions(3).is_empty());
    }

    #[test]
    fn test_timer_expiry_fails_mission() {
        let mut missions = MissionSystem::new();
        missions.register_mission(mission(
            1,
            vec![eliminate(1, 3, "drone").timed(2.0), eliminate(2, 1, "hostile")],
            None,
        ));
        missions.start_mission(3, 1);

        missions.tick(1.5);
        let instance = missions.instance(3, 1).unwrap();
        assert_eq!(instance.state, MissionState::Active);
        assert_approx_eq!(instance.objectives[0].time_limit_sec, 0.5, 1e-5);

        missions.tick(0.5);
        assert_eq!(missions.instance(3, 1).unwrap().state, MissionState::Failed);

        missions.notify_kill(3, "hostile");
        assert!(!missions.instance(3, 1).unwrap().objectives[1].completed);
    }

    #[test]
    fn test_completed_objective_timer_stops() {
        let mut missions = MissionSystem::new();
        missions.register_mission(mission(
            1,
            vec![eliminate(1, 1, "drone").timed(1.0), eliminate(2, 1, "hostile")],
            None,
        ));
        missions.start_mission(3, 1);

        missions.notify_kill(3, "drone");
        missions.tick(5.0);

        assert_eq!(missions.instance(3, 1).unwrap().state, MissionState::Active);
    }

    #[test]
    fn test_failed_mission_can_restart() {
        let mut missions = MissionSystem::new();
        missions.register_mission(mission(1, vec![eliminate(1, 1, "drone")], None));
        missions.start_mission(3, 1);
        missions.fail_mission(3, 1);

        assert_eq!(missions.available_missions(3), vec![1]);
        assert!(missions.start_mission(3, 1));
        assert_eq!(missions.instance(3, 1).unwrap().objectives[0].progress, 0);
    }

    #[test]
    fn test_defend_progress_is_absolute() {
        let mut missions = MissionSystem::new();
        missions.register_mission(mission(
            1,
            vec![MissionObjective::new(1, MissionObjectiveType::Defend, 100, "")],
            None,
        ));
        missions.start_mission(3, 1);

        missions.notify_defend_progress(3, 40);
        missions.notify_defend_progress(3, 60);
        assert_eq!(missions.instance(3, 1).unwrap().objectives[0].progress, 60);

        missions.notify_defend_progress(3, 100);
        assert_eq!(missions.instance(3, 1).unwrap().state, MissionState::Success);
    }

    #[test]
    fn test_notifications_reach_every_active_mission() {
        let mut missions = MissionSystem::new();
        missions.register_mission(mission(1, vec![eliminate(1, 2, "drone")], None));
        missions.register_mission(mission(2, vec![eliminate(1, 1, "drone")], None));
        missions.start_mission(3, 1);
        missions.start_mission(3, 2);

        missions.notify_kill(3, "drone");

        assert_eq!(missions.instance(3, 1).unwrap().objectives[0].progress, 1);
        assert_eq!(missions.instance(3, 2).unwrap().state, MissionState::Success);
    }

    #[test]
    fn test_optional_objective_not_required() {
        let mut missions = MissionSystem::new();
        missions.register_mission(mission(
            1,
            vec![
                eliminate(1, 1, "drone"),
                MissionObjective::new(2, MissionObjectiveType::Escort, 1, "vip").optional(),
            ],
            None,
        ));
        missions.start_mission(3, 1);

        missions.notify_kill(3, "drone");

        assert_eq!(missions.instance(3, 1).unwrap().state, MissionState::Success);
    }

    #[test]
    fn test_listener_records_chain() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let mut missions = MissionSystem::new();
        missions.set_listener(move |player, mission, state| {
            sink.lock().unwrap().push((player, mission, state));
        });
        missions.register_mission(mission(1, vec![eliminate(1, 1, "drone")], Some(2)));
        missions.register_mission(mission(2, vec![eliminate(1, 1, "drone").timed(1.0)], None));

        missions.start_mission(3, 1);
        missions.notify_kill(3, "drone");
        missions.tick(1.0);

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                (3, 1, MissionState::Active),
                (3, 1, MissionState::Success),
                (3, 2, MissionState::Active),
                (3, 2, MissionState::Failed),
            ]
        );
    }
}
