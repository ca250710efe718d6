use std::fmt;

use contracts::{ApiError, ErrorCode, Phase};

use crate::identity::StoreError;
use crate::voting::VoteRejection;

/// Rejection of an action by the round state machine. The state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundError {
    InsufficientBalance { balance: u64, fee: u64 },
    InvalidVote(VoteRejection),
    WrongPhase { action: &'static str, phase: Phase },
    EmptyMessage,
}

impl RoundError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            Self::InvalidVote(_) => ErrorCode::InvalidVote,
            Self::WrongPhase { .. } => ErrorCode::PhaseConflict,
            Self::EmptyMessage => ErrorCode::InvalidAction,
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        let details = match self {
            Self::InsufficientBalance { balance, fee } => {
                Some(format!("balance={balance} fee={fee}"))
            }
            Self::InvalidVote(rejection) => Some(format!("{rejection:?}")),
            Self::WrongPhase { action, phase } => Some(format!("action={action} phase={phase}")),
            Self::EmptyMessage => None,
        };
        ApiError::new(self.error_code(), self.to_string(), details)
    }
}

impl fmt::Display for RoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientBalance { balance, fee } => {
                write!(f, "insufficient balance: {balance} tokens, entry fee is {fee}")
            }
            Self::InvalidVote(rejection) => write!(f, "invalid vote: {rejection}"),
            Self::WrongPhase { action, phase } => {
                write!(f, "{action} is not allowed during {phase}")
            }
            Self::EmptyMessage => f.write_str("chat message is empty"),
        }
    }
}

impl std::error::Error for RoundError {}

impl From<VoteRejection> for RoundError {
    fn from(value: VoteRejection) -> Self {
        Self::InvalidVote(value)
    }
}

/// Failure to construct a [`crate::GameEngine`].
#[derive(Debug)]
pub enum EngineError {
    Config(contracts::ConfigError),
    Store(StoreError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid config: {err}"),
            Self::Store(err) => write!(f, "identity store: {err}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<contracts::ConfigError> for EngineError {
    fn from(value: contracts::ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
