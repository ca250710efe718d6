//! Render-ready projections of round state for a single viewer.

use serde::{Deserialize, Serialize};

use crate::{ChatMessage, Difficulty, Phase, Role, RoundTimers, VoteResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub wallet_address: String,
    pub token_balance: u64,
    pub is_simulated: bool,
    pub is_viewer: bool,
    /// Hidden (`None`) for other players until the round reaches results.
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioView {
    pub id: u32,
    pub title: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub log_text: String,
    pub audit_clue: String,
    pub vulnerability_type: Option<String>,
    pub hidden_anomaly: Option<String>,
    pub answer_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VotingView {
    pub votes_cast: usize,
    pub voters: Vec<String>,
    pub own_vote: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundView {
    pub schema_version: String,
    pub phase: Phase,
    pub round_number: u32,
    pub tick: u64,
    pub timers: RoundTimers,
    pub viewer_id: String,
    pub viewer_balance: u64,
    pub viewer_role: Option<Role>,
    pub roster: Vec<PlayerView>,
    pub scenario: Option<ScenarioView>,
    pub messages: Vec<ChatMessage>,
    pub voting: Option<VotingView>,
    pub result: Option<VoteResult>,
}
