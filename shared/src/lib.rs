use serde::{Deserialize, Serialize};

pub type PlayerId = u32;
pub type QuestId = u32;
pub type MissionId = u32;
pub type ObjectiveId = u32;
pub type ZombieId = u32;

pub const PROTOCOL_VERSION: u32 = 1;

pub const TDM_SCORE_LIMIT: u32 = 75;
pub const DOMINATION_SCORE_LIMIT: u32 = 200;
pub const CTF_SCORE_LIMIT: u32 = 3;
pub const SND_ROUNDS_TO_WIN: u32 = 4;

pub const DOMINATION_TICK_INTERVAL_SEC: f32 = 1.0;
pub const DOMINATION_POINTS_PER_TICK: u32 = 1;
pub const DOMINATION_REINFORCE_RATE: f32 = 0.3;
pub const DOMINATION_CONTEST_RATE: f32 = 0.2;
pub const DEFAULT_CONTROL_POINTS: usize = 3;
pub const MAX_CONTROL_POINTS: usize = 5;

pub const FLAG_RETURN_SEC: f32 = 30.0;

pub const SND_PRE_ROUND_SEC: f32 = 5.0;
pub const SND_ROUND_DURATION_SEC: f32 = 120.0;
pub const SND_DEFUSE_TIME_SEC: f32 = 7.0;
pub const SND_BOMB_EXPLODE_SEC: f32 = 45.0;

pub const ZOMBIES_STARTING_LIVES: i32 = 3;

/// Team assignment. `Alpha` and `Bravo` are the two playing sides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    #[default]
    None,
    Alpha,
    Bravo,
    Spectator,
}

impl Team {
    /// True for the two sides that can score.
    pub fn is_combatant(self) -> bool {
        matches!(self, Team::Alpha | Team::Bravo)
    }

    pub fn opponent(self) -> Team {
        match self {
            Team::Alpha => Team::Bravo,
            Team::Bravo => Team::Alpha,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    None,
    TeamDeathmatch,
    Domination,
    CaptureTheFlag,
    SearchAndDestroy,
    Zombies,
}

impl GameMode {
    /// Short identifier used by quest objectives that target a mode.
    pub fn tag(self) -> &'static str {
        match self {
            GameMode::None => "none",
            GameMode::TeamDeathmatch => "tdm",
            GameMode::Domination => "domination",
            GameMode::CaptureTheFlag => "ctf",
            GameMode::SearchAndDestroy => "snd",
            GameMode::Zombies => "zombies",
        }
    }

    pub fn from_tag(tag: &str) -> Option<GameMode> {
        match tag {
            "none" => Some(GameMode::None),
            "tdm" => Some(GameMode::TeamDeathmatch),
            "domination" => Some(GameMode::Domination),
            "ctf" => Some(GameMode::CaptureTheFlag),
            "snd" => Some(GameMode::SearchAndDestroy),
            "zombies" => Some(GameMode::Zombies),
            _ => None,
        }
    }

    /// Whether the mode admits a player on the given team.
    pub fn admits(self, team: Team) -> bool {
        match self {
            GameMode::None => false,
            GameMode::Zombies => true,
            _ => team.is_combatant(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestState {
    Locked,
    Available,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionState {
    NotStarted,
    Active,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZombieType {
    Walker,
    Runner,
    Brute,
    Boss,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SndPhase {
    #[default]
    PreRound,
    RoundActive,
    BombPlanted,
    PostRound,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BombState {
    #[default]
    Carried,
    Dropped,
    Planted,
    Defused,
    Exploded,
}

/// Per-team counters. Only `Alpha` and `Bravo` carry a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScores {
    pub alpha: u32,
    pub bravo: u32,
}

impl TeamScores {
    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::Alpha => self.alpha,
            Team::Bravo => self.bravo,
            _ => 0,
        }
    }

    pub fn add(&mut self, team: Team, amount: u32) {
        match team {
            Team::Alpha => self.alpha = self.alpha.saturating_add(amount),
            Team::Bravo => self.bravo = self.bravo.saturating_add(amount),
            _ => {}
        }
    }

    /// The team that reached `limit`, Alpha first if both did.
    pub fn first_to(&self, limit: u32) -> Option<Team> {
        if self.alpha >= limit {
            Some(Team::Alpha)
        } else if self.bravo >= limit {
            Some(Team::Bravo)
        } else {
            None
        }
    }
}

/// Gameplay facts reported by the transport. The server trusts these as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Kill { killer: PlayerId, victim: PlayerId },
    ZombieKilled { zombie_id: ZombieId, killer: PlayerId },
    ZombieDamaged { zombie_id: ZombieId, attacker: PlayerId, amount: f32 },
    PlayerDowned { player: PlayerId },
    PlayerRevived { player: PlayerId },
    PlayerDied { player: PlayerId },
    FlagPickup { player: PlayerId, flag_team: Team },
    FlagCapture { player: PlayerId },
    FlagDrop { player: PlayerId },
    FlagReturn { team: Team },
    EnterPoint { player: PlayerId, point: Option<u32> },
    BombPickedUp { player: PlayerId },
    BombDropped { player: PlayerId },
    BombPlanted { player: PlayerId },
    BombDefused { player: PlayerId },
    Collect { player: PlayerId, item: String },
    ReachLocation { player: PlayerId, location: String },
    Interact { player: PlayerId, object: String },
    Deliver { player: PlayerId, item: String },
    DefendProgress { player: PlayerId, progress: i32 },
}

/// Snapshot of the active match broadcast to every client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub mode: GameMode,
    pub scores: TeamScores,
    pub game_over: bool,
    pub winner: Team,
    pub round: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Join {
        client_version: u32,
        team: Team,
    },
    Leave,
    SetTeam {
        team: Team,
    },
    SelectMode {
        mode: GameMode,
    },
    StartRound,
    StartQuest {
        quest_id: QuestId,
    },
    AbandonQuest {
        quest_id: QuestId,
    },
    StartMission {
        mission_id: MissionId,
    },
    Gameplay(GameEvent),
    Heartbeat,

    Joined {
        player_id: PlayerId,
    },
    Rejected {
        reason: String,
    },
    QuestUpdate {
        quest_id: QuestId,
        state: QuestState,
    },
    MissionUpdate {
        mission_id: MissionId,
        state: MissionState,
    },
    RoundUpdate {
        round: u32,
        started: bool,
    },
    ZombieKilled {
        zombie_id: ZombieId,
        kind: ZombieType,
        points: i32,
    },
    Match(MatchSummary),
    Disconnected {
        reason: String,
    },
}
