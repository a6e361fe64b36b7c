//! Static quest and mission definitions loaded from JSON.

use crate::game::GameServer;
use crate::progression::{MissionDefinition, QuestDefinition};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const BUNDLED_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed catalog: {0}")]
    Json(#[from] serde_json::Error),

    /// Id 0 is reserved for "no task".
    #[error("{0} definition uses reserved id 0")]
    ZeroId(&'static str),

    #[error("Duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: u32 },

    #[error("Quest {quest} requires unknown quest {prerequisite}")]
    UnknownPrerequisite { quest: u32, prerequisite: u32 },

    #[error("Mission {mission} chains into unknown mission {next}")]
    UnknownNextMission { mission: u32, next: u32 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub quests: Vec<QuestDefinition>,
    #[serde(default)]
    pub missions: Vec<MissionDefinition>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The demo catalog compiled into the binary.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    /// Checks ids are non-zero and unique, and that every prerequisite and
    /// chained mission exists.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let quest_ids = unique_ids("quest", self.quests.iter().map(|q| q.id))?;
        let mission_ids = unique_ids("mission", self.missions.iter().map(|m| m.id))?;

        for quest in &self.quests {
            if let Some(prerequisite) = quest.prerequisite {
                if !quest_ids.contains(&prerequisite) {
                    return Err(CatalogError::UnknownPrerequisite {
                        quest: quest.id,
                        prerequisite,
                    });
                }
            }
        }
        for mission in &self.missions {
            if let Some(next) = mission.next_mission {
                if !mission_ids.contains(&next) {
                    return Err(CatalogError::UnknownNextMission {
                        mission: mission.id,
                        next,
                    });
                }
            }
        }
        Ok(())
    }

    /// Registers every definition with the server's progression engines.
    pub fn install(self, server: &mut GameServer) {
        info!(
            "Installing {} quests and {} missions",
            self.quests.len(),
            self.missions.len()
        );
        server.quests_mut().register_quests(self.quests);
        server.missions_mut().register_missions(self.missions);
    }
}

fn unique_ids(
    kind: &'static str,
    ids: impl Iterator<Item = u32>,
) -> Result<HashSet<u32>, CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id == 0 {
            return Err(CatalogError::ZeroId(kind));
        }
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId { kind, id });
        }
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::QuestState;

    #[test]
    fn test_bundled_catalog_is_valid() {
        let catalog = Catalog::bundled().unwrap();
        assert!(!catalog.quests.is_empty());
        assert!(!catalog.missions.is_empty());
    }

    #[test]
    fn test_install_registers_everything() {
        let catalog = Catalog::bundled().unwrap();
        let (quests, missions) = (catalog.quests.len(), catalog.missions.len());

        let mut server = GameServer::new();
        catalog.install(&mut server);
        assert_eq!(server.quests().quest_count(), quests);
        assert_eq!(server.missions().mission_count(), missions);
        assert!(server.quests_mut().start_quest(1, 1));
        assert_eq!(
            server.quests().progress(1, 1).map(|p| p.state),
            Some(QuestState::InProgress)
        );
    }

    #[test]
    fn test_missing_sections_default_empty() {
        let catalog = Catalog::from_json("{}").unwrap();
        assert!(catalog.quests.is_empty());
        assert!(catalog.missions.is_empty());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            Catalog::from_json("{\"quests\": [{]}"),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn test_rejects_zero_and_duplicate_ids() {
        let zero = r#"{"quests": [{"id": 0, "title": "x", "objectives": []}]}"#;
        assert!(matches!(
            Catalog::from_json(zero),
            Err(CatalogError::ZeroId("quest"))
        ));

        let duplicate = r#"{"missions": [
            {"id": 4, "title": "a", "objectives": []},
            {"id": 4, "title": "b", "objectives": []}
        ]}"#;
        assert!(matches!(
            Catalog::from_json(duplicate),
            Err(CatalogError::DuplicateId { kind: "mission", id: 4 })
        ));
    }

    #[test]
    fn test_rejects_dangling_references() {
        let quest = r#"{"quests": [{"id": 2, "title": "x", "objectives": [], "prerequisite": 9}]}"#;
        assert!(matches!(
            Catalog::from_json(quest),
            Err(CatalogError::UnknownPrerequisite { quest: 2, prerequisite: 9 })
        ));

        let mission = r#"{"missions": [{"id": 1, "title": "x", "objectives": [], "next_mission": 3}]}"#;
        assert!(matches!(
            Catalog::from_json(mission),
            Err(CatalogError::UnknownNextMission { mission: 1, next: 3 })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Catalog::load("/nonexistent/catalog.json");
        assert!(matches!(result, Err(CatalogError::Io(_))));
    }
}
