use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{RoundTimers, SCHEMA_VERSION_V1};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub schema_version: String,
    pub seed: u64,
    pub roster_size: usize,
    pub entry_fee: u64,
    pub starting_balance: u64,
    pub matching_secs: u32,
    pub discussion_secs: u32,
    pub voting_secs: u32,
    /// Ticks after matching starts at which a simulated player may join.
    pub join_offsets: Vec<u32>,
    pub join_probability: f64,
    pub chat_reply_probability: f64,
    /// Inclusive `[min, max]` delay in ticks before an AI chat reply.
    pub chat_reply_delay: [u32; 2],
    pub ai_vote_spacing: u32,
    pub ai_vote_jitter: u32,
    pub history_limit: usize,
    pub tick_interval_ms: u64,
}

impl GameConfig {
    pub fn timers(&self) -> RoundTimers {
        RoundTimers {
            matching: self.matching_secs,
            discussion: self.discussion_secs,
            voting: self.voting_secs,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_version != SCHEMA_VERSION_V1 {
            return Err(ConfigError::new(
                "schema_version",
                format!("got={} expected={}", self.schema_version, SCHEMA_VERSION_V1),
            ));
        }
        if self.roster_size < 3 {
            return Err(ConfigError::new(
                "roster_size",
                "a round needs a saboteur, a supervisor and at least one auditor",
            ));
        }
        for (field, value) in [
            ("matching_secs", self.matching_secs),
            ("discussion_secs", self.discussion_secs),
            ("voting_secs", self.voting_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::new(field, "phase timers must be >= 1"));
            }
        }
        for (field, value) in [
            ("join_probability", self.join_probability),
            ("chat_reply_probability", self.chat_reply_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::new(field, "probability must be in [0, 1]"));
            }
        }
        if self.chat_reply_delay[0] > self.chat_reply_delay[1] {
            return Err(ConfigError::new(
                "chat_reply_delay",
                "min delay must not exceed max delay",
            ));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::new("history_limit", "must keep at least one entry"));
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            seed: 1337,
            roster_size: 5,
            entry_fee: 5,
            starting_balance: 100,
            matching_secs: 30,
            discussion_secs: 180,
            voting_secs: 60,
            join_offsets: vec![5, 12, 18, 25],
            join_probability: 0.4,
            chat_reply_probability: 0.5,
            chat_reply_delay: [2, 5],
            ai_vote_spacing: 2,
            ai_vote_jitter: 3,
            history_limit: 100,
            tick_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

impl ConfigError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid config field {}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"seed":42,"voting_secs":20}"#).expect("partial config");
        assert_eq!(config.seed, 42);
        assert_eq!(config.voting_secs, 20);
        assert_eq!(config.entry_fee, 5);
        assert_eq!(config.roster_size, 5);
    }

    #[test]
    fn rejects_small_roster_and_bad_probability() {
        let mut config = GameConfig::default();
        config.roster_size = 2;
        assert_eq!(config.validate().unwrap_err().field, "roster_size");

        let mut config = GameConfig::default();
        config.join_probability = 1.5;
        assert_eq!(config.validate().unwrap_err().field, "join_probability");
    }
}
