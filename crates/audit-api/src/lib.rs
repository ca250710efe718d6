//! In-process API facade with action validation, an action audit trail, SQLite-backed identity
//! storage, the optional ledger seam, and the HTTP/WebSocket adapter.

pub mod ledger;
mod persistence;
mod server;

use std::path::Path;

use audit_core::{EngineError, GameEngine, IdentityStore};
use contracts::{
    ActionRequest, ActionResult, ApiError, ErrorCode, GameConfig, GameEvent, HistoryEntry,
    LeaderboardEntry, Phase, RoundView, ScenarioView, UserProfile, SCHEMA_VERSION_V1,
};
use rand::RngCore;

pub use ledger::{mirror_round, InMemoryLedger, LedgerClient, OfflineLedger};
pub use persistence::{PersistenceError, SqliteKvStore};
pub use server::{serve, ServeOptions, ServerError};

const ACTION_AUDIT_LIMIT: usize = 1_024;
const MAX_CHAT_CHARS: usize = 500;

#[derive(Debug)]
pub struct GameApi {
    engine: GameEngine,
    action_audit: Vec<ActionResult>,
}

impl GameApi {
    pub fn new(engine: GameEngine) -> Self {
        Self {
            engine,
            action_audit: Vec::new(),
        }
    }

    pub fn in_memory(config: GameConfig, name: &str) -> Result<Self, EngineError> {
        GameEngine::in_memory(config, name).map(Self::new)
    }

    /// Opens (or creates) the SQLite identity store at `path` and loads the profile in it,
    /// registering `name` if the store is empty.
    pub fn open_sqlite(
        config: GameConfig,
        path: impl AsRef<Path>,
        name: &str,
    ) -> Result<Self, PersistenceError> {
        let store = SqliteKvStore::open(path)?;
        let engine = GameEngine::open(config, IdentityStore::new(Box::new(store)), name)?;
        Ok(Self::new(engine))
    }

    pub fn with_rng(
        config: GameConfig,
        store: IdentityStore,
        name: &str,
        rng: Box<dyn RngCore + Send>,
    ) -> Result<Self, EngineError> {
        GameEngine::with_rng(config, store, name, rng).map(Self::new)
    }

    pub fn submit_action(&mut self, request: ActionRequest) -> ActionResult {
        let result = match validate_request(&request) {
            Some(error) => ActionResult::rejected(&request, self.engine.phase(), error),
            None => match self.engine.apply_action(request.action.clone()) {
                Ok(()) => ActionResult::accepted(&request, self.engine.phase()),
                Err(err) => {
                    ActionResult::rejected(&request, self.engine.phase(), err.to_api_error())
                }
            },
        };

        self.action_audit.push(result.clone());
        if self.action_audit.len() > ACTION_AUDIT_LIMIT {
            let excess = self.action_audit.len() - ACTION_AUDIT_LIMIT;
            self.action_audit.drain(..excess);
        }
        result
    }

    /// Advances the clock `steps` units and returns the resulting tick.
    pub fn tick(&mut self, steps: u64) -> u64 {
        self.engine.tick_n(steps);
        self.engine.state().tick
    }

    pub fn current_tick(&self) -> u64 {
        self.engine.state().tick
    }

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    pub fn profile(&self) -> &UserProfile {
        self.engine.profile()
    }

    pub fn config(&self) -> &GameConfig {
        self.engine.config()
    }

    pub fn view(&self) -> RoundView {
        self.engine.view()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        self.engine.history()
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.engine.leaderboard()
    }

    pub fn events(&self) -> &[GameEvent] {
        self.engine.events()
    }

    pub fn events_since(&self, sequence: u64) -> &[GameEvent] {
        self.engine.events_since(sequence)
    }

    pub fn action_audit(&self) -> &[ActionResult] {
        &self.action_audit
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut GameEngine {
        &mut self.engine
    }

    pub fn last_persistence_error(&self) -> Option<&str> {
        self.engine.last_persistence_error()
    }
}

/// The scenario library with answer fields withheld.
pub fn scenario_catalog() -> Vec<ScenarioView> {
    audit_core::scenario::all()
        .into_iter()
        .map(|scenario| ScenarioView {
            id: scenario.id,
            title: scenario.title,
            category: scenario.category,
            difficulty: scenario.difficulty,
            log_text: scenario.log_text,
            audit_clue: scenario.audit_clue,
            vulnerability_type: None,
            hidden_anomaly: None,
            answer_key: None,
        })
        .collect()
}

fn validate_request(request: &ActionRequest) -> Option<ApiError> {
    if request.schema_version != SCHEMA_VERSION_V1 {
        return Some(ApiError::new(
            ErrorCode::ContractVersionUnsupported,
            "Unsupported schema_version",
            Some(format!(
                "got={} expected={}",
                request.schema_version, SCHEMA_VERSION_V1
            )),
        ));
    }

    if request.action_id.trim().is_empty() {
        return Some(ApiError::new(
            ErrorCode::InvalidAction,
            "action_id must not be empty",
            None,
        ));
    }

    if let contracts::Action::SendChat { text } = &request.action {
        let chars = text.chars().count();
        if chars > MAX_CHAT_CHARS {
            return Some(ApiError::new(
                ErrorCode::InvalidAction,
                "chat message is too long",
                Some(format!("chars={chars} max={MAX_CHAT_CHARS}")),
            ));
        }
    }

    None
}
