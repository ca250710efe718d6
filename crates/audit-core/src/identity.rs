//! Local user profile and round history over a pluggable key-value store.
//!
//! Ids and wallet addresses come from the engine's random source. They are
//! display handles only and carry no cryptographic meaning.

use std::collections::BTreeMap;
use std::fmt;

use contracts::{HistoryEntry, UserProfile};
use rand::{Rng, RngCore};

pub const PROFILE_KEY: &str = "chainAuditUser";
pub const HISTORY_KEY: &str = "chainAuditHistory";

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub fn generate_player_id(rng: &mut dyn RngCore) -> String {
    format!("0x{:08x}", rng.gen::<u32>())
}

pub fn generate_wallet_address(rng: &mut dyn RngCore) -> String {
    let mut bytes = [0_u8; 20];
    rng.fill_bytes(&mut bytes);
    let hex = bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>();
    format!("0x{hex}")
}

pub fn generate_joiner_name(rng: &mut dyn RngCore) -> String {
    let suffix = (0..4)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect::<String>();
    format!("Player_{suffix}")
}

#[derive(Debug)]
pub enum StoreError {
    Backend(String),
    Serde(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(message) => write!(f, "store backend error: {message}"),
            Self::Serde(err) => write!(f, "serde error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// String key-value persistence, shaped like browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

pub struct IdentityStore {
    store: Box<dyn KeyValueStore + Send>,
}

impl fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityStore").finish_non_exhaustive()
    }
}

impl IdentityStore {
    pub fn new(store: Box<dyn KeyValueStore + Send>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    pub fn load_profile(&self) -> Result<Option<UserProfile>, StoreError> {
        match self.store.get(PROFILE_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn save_profile(&mut self, profile: &UserProfile) -> Result<(), StoreError> {
        let raw = serde_json::to_string(profile)?;
        self.store.set(PROFILE_KEY, &raw)
    }

    pub fn register(
        &mut self,
        name: &str,
        starting_balance: u64,
        rng: &mut dyn RngCore,
    ) -> Result<UserProfile, StoreError> {
        let profile = UserProfile {
            id: generate_player_id(rng),
            name: name.trim().to_string(),
            wallet_address: generate_wallet_address(rng),
            token_balance: starting_balance,
            rounds_played: 0,
        };
        self.save_profile(&profile)?;
        Ok(profile)
    }

    pub fn load_or_register(
        &mut self,
        name: &str,
        starting_balance: u64,
        rng: &mut dyn RngCore,
    ) -> Result<UserProfile, StoreError> {
        match self.load_profile()? {
            Some(profile) => Ok(profile),
            None => self.register(name, starting_balance, rng),
        }
    }

    /// Stored history, most recent first.
    pub fn load_history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        match self.store.get(HISTORY_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Prepends `entry` and keeps at most `limit` entries. Returns the stored list.
    pub fn append_history(
        &mut self,
        entry: HistoryEntry,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut history = self.load_history()?;
        history.insert(0, entry);
        history.truncate(limit);
        let raw = serde_json::to_string(&history)?;
        self.store.set(HISTORY_KEY, &raw)?;
        Ok(history)
    }

    pub fn clear_history(&mut self) -> Result<(), StoreError> {
        self.store.remove(HISTORY_KEY)
    }
}

#[cfg(test)]
mod tests {
    use contracts::{Role, RoundOutcome};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn entry(id: usize) -> HistoryEntry {
        HistoryEntry {
            entry_id: format!("round-{id}"),
            recorded_at_ms: id as u64,
            round_number: 1,
            scenario_id: 1,
            scenario_title: "Flash Loan Arbitrage Exploit".to_string(),
            scenario_category: "DeFi".to_string(),
            vulnerability_type: "Price Manipulation Attack".to_string(),
            hidden_anomaly: "pool".to_string(),
            outcome: RoundOutcome::SaboteurVictory,
            ejected_player_id: None,
            human_id: "0xhuman".to_string(),
            human_role: Role::Auditor,
            human_reward: 10,
            players: Vec::new(),
            votes: Default::default(),
        }
    }

    #[test]
    fn generated_handles_have_expected_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        let id = generate_player_id(&mut rng);
        let wallet = generate_wallet_address(&mut rng);
        let name = generate_joiner_name(&mut rng);

        assert_eq!(id.len(), 10);
        assert!(id.starts_with("0x"));
        assert_eq!(wallet.len(), 42);
        assert!(wallet[2..].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(name.starts_with("Player_"));
        assert_eq!(name.len(), "Player_".len() + 4);
    }

    #[test]
    fn load_or_register_reuses_saved_profile() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut identity = IdentityStore::in_memory();
        let first = identity
            .load_or_register("alice", 100, &mut rng)
            .expect("register");
        assert_eq!(first.token_balance, 100);
        assert_eq!(first.rounds_played, 0);

        let second = identity
            .load_or_register("someone else", 100, &mut rng)
            .expect("reload");
        assert_eq!(first, second);
    }

    #[test]
    fn history_is_most_recent_first_and_capped() {
        let mut identity = IdentityStore::in_memory();
        for id in 0..7 {
            identity.append_history(entry(id), 5).expect("append");
        }
        let history = identity.load_history().expect("load");
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].entry_id, "round-6");
        assert_eq!(history[4].entry_id, "round-2");

        identity.clear_history().expect("clear");
        assert!(identity.load_history().expect("load").is_empty());
    }
}
