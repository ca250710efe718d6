//! v1 cross-boundary contracts for the round engine, API adapter, persistence, and UI.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod views;

pub use config::{ConfigError, GameConfig};
pub use views::{PlayerView, RoundView, ScenarioView, VotingView};

pub const SCHEMA_VERSION_V1: &str = "1.0";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Auditor,
    Saboteur,
    Supervisor,
}

/// Presentation metadata attached to each role.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RoleMeta {
    pub name: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

const AUDITOR_META: RoleMeta = RoleMeta {
    name: "Auditor",
    color: "#00ff88",
    icon: "\u{1F50D}",
    description: "Find vulnerabilities in transaction logs",
};

const SABOTEUR_META: RoleMeta = RoleMeta {
    name: "Saboteur",
    color: "#ff4444",
    icon: "\u{1F480}",
    description: "Hide vulnerabilities and mislead other players",
};

const SUPERVISOR_META: RoleMeta = RoleMeta {
    name: "Supervisor",
    color: "#4488ff",
    icon: "\u{1F441}",
    description: "Identify the saboteur and protect audit results",
};

impl Role {
    pub const ALL: [Role; 3] = [Role::Auditor, Role::Saboteur, Role::Supervisor];

    pub fn meta(self) -> &'static RoleMeta {
        match self {
            Role::Auditor => &AUDITOR_META,
            Role::Saboteur => &SABOTEUR_META,
            Role::Supervisor => &SUPERVISOR_META,
        }
    }

    /// Tokens credited at the end of a round.
    pub fn reward(self, saboteur_caught: bool) -> u64 {
        match (self, saboteur_caught) {
            (Role::Saboteur, true) => 5,
            (Role::Saboteur, false) => 50,
            (Role::Supervisor, true) => 40,
            (Role::Supervisor, false) => 15,
            (Role::Auditor, true) => 25,
            (Role::Auditor, false) => 10,
        }
    }

    pub fn wins(self, saboteur_caught: bool) -> bool {
        match self {
            Role::Saboteur => !saboteur_caught,
            Role::Supervisor | Role::Auditor => saboteur_caught,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.meta().name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Lobby,
    Matching,
    Discussion,
    Voting,
    Results,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Lobby => "lobby",
            Phase::Matching => "matching",
            Phase::Discussion => "discussion",
            Phase::Voting => "voting",
            Phase::Results => "results",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub wallet_address: String,
    pub token_balance: u64,
    pub is_simulated: bool,
    pub role: Option<Role>,
}

impl Player {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            wallet_address: profile.wallet_address.clone(),
            token_balance: profile.token_balance,
            is_simulated: false,
            role: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Difficulty {
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scenario {
    pub id: u32,
    pub title: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub log_text: String,
    pub vulnerability_type: String,
    pub hidden_anomaly: String,
    pub audit_clue: String,
    pub answer_key: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    System,
    Player,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub kind: ChatKind,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub content: String,
    pub tick: u64,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>, tick: u64) -> Self {
        Self {
            kind: ChatKind::System,
            sender_id: None,
            sender_name: None,
            content: content.into(),
            tick,
        }
    }

    pub fn from_player(player: &Player, content: impl Into<String>, tick: u64) -> Self {
        Self {
            kind: ChatKind::Player,
            sender_id: Some(player.id.clone()),
            sender_name: Some(player.name.clone()),
            content: content.into(),
            tick,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RoundTimers {
    pub matching: u32,
    pub discussion: u32,
    pub voting: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteResult {
    pub ejected_player_id: Option<String>,
    pub saboteur_id: Option<String>,
    pub vote_counts: BTreeMap<String, u32>,
    pub saboteur_caught: bool,
    pub per_player_reward: BTreeMap<String, u64>,
    pub is_winner: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    AuditSuccess,
    SaboteurVictory,
}

impl RoundOutcome {
    pub fn from_caught(saboteur_caught: bool) -> Self {
        if saboteur_caught {
            Self::AuditSuccess
        } else {
            Self::SaboteurVictory
        }
    }
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuditSuccess => f.write_str("Audit Success"),
            Self::SaboteurVictory => f.write_str("Saboteur Victory"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerOutcome {
    pub id: String,
    pub name: String,
    pub wallet_address: String,
    pub is_simulated: bool,
    pub role: Role,
    pub votes_received: u32,
    pub reward: u64,
    pub is_winner: bool,
}

/// Append-only record of one completed round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub entry_id: String,
    pub recorded_at_ms: u64,
    pub round_number: u32,
    pub scenario_id: u32,
    pub scenario_title: String,
    pub scenario_category: String,
    pub vulnerability_type: String,
    pub hidden_anomaly: String,
    pub outcome: RoundOutcome,
    pub ejected_player_id: Option<String>,
    pub human_id: String,
    pub human_role: Role,
    pub human_reward: u64,
    pub players: Vec<PlayerOutcome>,
    /// voter id -> target id
    #[serde(default)]
    pub votes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub wallet_address: String,
    pub token_balance: u64,
    #[serde(default)]
    pub rounds_played: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub player_id: String,
    pub name: String,
    pub wallet_address: String,
    pub is_simulated: bool,
    pub total_rewards: u64,
    pub rounds_played: u32,
    pub wins: u32,
}

/// Delayed one-shot work queued by the round state machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduledAction {
    SimulatedJoin,
    AiVote {
        voter_id: String,
    },
    AiChatReply {
        responder_id: String,
        phrase_index: usize,
    },
}

impl ScheduledAction {
    /// The only phase in which this action may take effect.
    pub fn active_phase(&self) -> Phase {
        match self {
            ScheduledAction::SimulatedJoin => Phase::Matching,
            ScheduledAction::AiVote { .. } => Phase::Voting,
            ScheduledAction::AiChatReply { .. } => Phase::Discussion,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    StartMatch,
    StartWithAi,
    SendChat { text: String },
    CastVote { target_id: String },
    NextRound,
    Exit,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::StartMatch => "start_match",
            Action::StartWithAi => "start_with_ai",
            Action::SendChat { .. } => "send_chat",
            Action::CastVote { .. } => "cast_vote",
            Action::NextRound => "next_round",
            Action::Exit => "exit",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRequest {
    pub schema_version: String,
    pub action_id: String,
    pub action: Action,
}

impl ActionRequest {
    pub fn new(action_id: impl Into<String>, action: Action) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            action_id: action_id.into(),
            action,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InsufficientBalance,
    InvalidVote,
    InvalidAction,
    PhaseConflict,
    ContractVersionUnsupported,
    PersistenceFailure,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.error_code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionResult {
    pub schema_version: String,
    pub action_id: String,
    pub accepted: bool,
    pub phase: Phase,
    pub error: Option<ApiError>,
}

impl ActionResult {
    pub fn accepted(request: &ActionRequest, phase: Phase) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            action_id: request.action_id.clone(),
            accepted: true,
            phase,
            error: None,
        }
    }

    pub fn rejected(request: &ActionRequest, phase: Phase, error: ApiError) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            action_id: request.action_id.clone(),
            accepted: false,
            phase,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEventKind {
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    PlayerJoined {
        player_id: String,
        name: String,
        is_simulated: bool,
    },
    RolesAssigned {
        roster_size: usize,
    },
    VoteCast {
        voter_id: String,
        target_id: String,
    },
    ChatPosted {
        sender_id: Option<String>,
    },
    RoundResolved {
        ejected_player_id: Option<String>,
        saboteur_caught: bool,
        human_reward: u64,
    },
    ScheduledActionDropped {
        action: ScheduledAction,
        reason: String,
    },
    ActionRejected {
        action: String,
        error_code: ErrorCode,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEvent {
    pub sequence: u64,
    pub tick: u64,
    pub round_number: u32,
    pub generation: u64,
    pub kind: GameEventKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_table_matches_outcomes() {
        assert_eq!(Role::Saboteur.reward(true), 5);
        assert_eq!(Role::Saboteur.reward(false), 50);
        assert_eq!(Role::Supervisor.reward(true), 40);
        assert_eq!(Role::Supervisor.reward(false), 15);
        assert_eq!(Role::Auditor.reward(true), 25);
        assert_eq!(Role::Auditor.reward(false), 10);
    }

    #[test]
    fn only_saboteur_wins_when_it_survives() {
        for role in Role::ALL {
            assert_eq!(role.wins(true), role != Role::Saboteur);
            assert_eq!(role.wins(false), role == Role::Saboteur);
        }
    }

    #[test]
    fn action_uses_tagged_json() {
        let parsed: Action =
            serde_json::from_str(r#"{"type":"cast_vote","target_id":"0xabc"}"#).expect("vote");
        assert_eq!(
            parsed,
            Action::CastVote {
                target_id: "0xabc".to_string()
            }
        );
        let encoded = serde_json::to_string(&Action::StartWithAi).expect("encode");
        assert_eq!(encoded, r#"{"type":"start_with_ai"}"#);
    }

    #[test]
    fn role_serializes_in_upper_case() {
        let encoded = serde_json::to_string(&Role::Supervisor).expect("encode");
        assert_eq!(encoded, "\"SUPERVISOR\"");
    }
}
