//! Owns one human's round state, drives it with actions and ticks, and
//! persists profile and history changes through the identity store.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use contracts::{
    Action, GameConfig, GameEvent, GameEventKind, HistoryEntry, LeaderboardEntry, Phase,
    RoundView, UserProfile,
};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, warn};

use crate::error::{EngineError, RoundError};
use crate::identity::{IdentityStore, StoreError};
use crate::round::{Effect, RoundEvent, RoundState, Transition, TransitionContext};
use crate::{leaderboard, view};

const EVENT_LOG_LIMIT: usize = 4_096;

pub struct GameEngine {
    config: GameConfig,
    state: RoundState,
    rng: Box<dyn RngCore + Send>,
    store: IdentityStore,
    history: Vec<HistoryEntry>,
    events: Vec<GameEvent>,
    next_event_sequence: u64,
    last_persistence_error: Option<String>,
}

impl fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameEngine")
            .field("phase", &self.state.phase)
            .field("round_number", &self.state.round_number)
            .field("tick", &self.state.tick)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl GameEngine {
    /// Engine seeded from `config.seed`.
    pub fn open(config: GameConfig, store: IdentityStore, name: &str) -> Result<Self, EngineError> {
        let rng = Box::new(StdRng::seed_from_u64(config.seed));
        Self::with_rng(config, store, name, rng)
    }

    pub fn in_memory(config: GameConfig, name: &str) -> Result<Self, EngineError> {
        Self::open(config, IdentityStore::in_memory(), name)
    }

    /// Loads the stored profile (registering `name` if none exists) and history.
    pub fn with_rng(
        config: GameConfig,
        mut store: IdentityStore,
        name: &str,
        mut rng: Box<dyn RngCore + Send>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let profile = store.load_or_register(name, config.starting_balance, rng.as_mut())?;
        let mut history = store.load_history()?;
        history.truncate(config.history_limit);
        info!(
            player_id = %profile.id,
            balance = profile.token_balance,
            stored_rounds = history.len(),
            "game engine opened"
        );

        Ok(Self {
            state: RoundState::new(profile, &config),
            config,
            rng,
            store,
            history,
            events: Vec::new(),
            next_event_sequence: 0,
            last_persistence_error: None,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn profile(&self) -> &UserProfile {
        &self.state.profile
    }

    pub fn human_id(&self) -> &str {
        self.state.human_id()
    }

    /// Completed rounds, most recent first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        leaderboard::aggregate(&self.history)
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn events_since(&self, sequence: u64) -> &[GameEvent] {
        let start = self.events.partition_point(|event| event.sequence < sequence);
        &self.events[start..]
    }

    pub fn view(&self) -> RoundView {
        view::render(&self.state, self.state.human_id())
    }

    pub fn view_for(&self, viewer_id: &str) -> RoundView {
        view::render(&self.state, viewer_id)
    }

    pub fn last_persistence_error(&self) -> Option<&str> {
        self.last_persistence_error.as_deref()
    }

    pub fn apply_action(&mut self, action: Action) -> Result<(), RoundError> {
        let label = action.label();
        match self.step(&RoundEvent::Action(action)) {
            Ok(transition) => {
                debug!(action = label, "action accepted");
                self.commit(transition);
                Ok(())
            }
            Err(err) => {
                warn!(action = label, error = %err, "action rejected");
                self.record(GameEventKind::ActionRejected {
                    action: label.to_string(),
                    error_code: err.error_code(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub fn start_match(&mut self) -> Result<(), RoundError> {
        self.apply_action(Action::StartMatch)
    }

    pub fn start_with_ai(&mut self) -> Result<(), RoundError> {
        self.apply_action(Action::StartWithAi)
    }

    pub fn send_chat(&mut self, text: impl Into<String>) -> Result<(), RoundError> {
        self.apply_action(Action::SendChat { text: text.into() })
    }

    pub fn cast_vote(&mut self, target_id: impl Into<String>) -> Result<(), RoundError> {
        self.apply_action(Action::CastVote {
            target_id: target_id.into(),
        })
    }

    pub fn next_round(&mut self) -> Result<(), RoundError> {
        self.apply_action(Action::NextRound)
    }

    pub fn exit(&mut self) -> Result<(), RoundError> {
        self.apply_action(Action::Exit)
    }

    /// Advances the clock one time unit.
    pub fn tick(&mut self) {
        match self.step(&RoundEvent::Tick) {
            Ok(transition) => self.commit(transition),
            Err(err) => warn!(error = %err, "tick rejected"),
        }
    }

    pub fn tick_n(&mut self, steps: u64) {
        for _ in 0..steps {
            self.tick();
        }
    }

    /// Ticks until `phase` is reached, giving up after `max_ticks`.
    /// Returns whether the phase was reached.
    pub fn run_until_phase(&mut self, phase: Phase, max_ticks: u64) -> bool {
        for _ in 0..max_ticks {
            if self.state.phase == phase {
                return true;
            }
            self.tick();
        }
        self.state.phase == phase
    }

    pub fn clear_history(&mut self) -> Result<(), StoreError> {
        self.store.clear_history()?;
        self.history.clear();
        Ok(())
    }

    fn step(&mut self, event: &RoundEvent) -> Result<Transition, RoundError> {
        let mut ctx = TransitionContext {
            config: &self.config,
            rng: self.rng.as_mut(),
            now_ms: unix_millis(),
        };
        self.state.apply(event, &mut ctx)
    }

    fn commit(&mut self, transition: Transition) {
        self.state = transition.state;
        for effect in transition.effects {
            match effect {
                Effect::ProfileChanged(profile) => {
                    let outcome = self.store.save_profile(&profile);
                    self.note_persistence(outcome);
                }
                Effect::RoundCompleted(entry) => {
                    info!(
                        round = entry.round_number,
                        outcome = %entry.outcome,
                        reward = entry.human_reward,
                        "round completed"
                    );
                    match self
                        .store
                        .append_history(entry.clone(), self.config.history_limit)
                    {
                        Ok(history) => {
                            self.history = history;
                            self.last_persistence_error = None;
                        }
                        Err(err) => {
                            self.history.insert(0, entry);
                            self.history.truncate(self.config.history_limit);
                            self.note_persistence(Err(err));
                        }
                    }
                }
                Effect::Log(kind) => self.record(kind),
            }
        }
    }

    fn note_persistence(&mut self, outcome: Result<(), StoreError>) {
        match outcome {
            Ok(()) => self.last_persistence_error = None,
            Err(err) => {
                warn!(error = %err, "identity store write failed");
                self.last_persistence_error = Some(err.to_string());
            }
        }
    }

    fn record(&mut self, kind: GameEventKind) {
        match &kind {
            GameEventKind::PhaseChanged { from, to } => {
                info!(%from, %to, round = self.state.round_number, tick = self.state.tick, "phase changed");
            }
            GameEventKind::ScheduledActionDropped { action, reason } => {
                debug!(?action, reason = reason.as_str(), "scheduled action dropped");
            }
            GameEventKind::RoundResolved {
                ejected_player_id,
                saboteur_caught,
                ..
            } => {
                info!(ejected = ?ejected_player_id, saboteur_caught, "votes resolved");
            }
            _ => debug!(?kind, "game event"),
        }

        self.events.push(GameEvent {
            sequence: self.next_event_sequence,
            tick: self.state.tick,
            round_number: self.state.round_number,
            generation: self.state.generation,
            kind,
        });
        self.next_event_sequence += 1;
        if self.events.len() > EVENT_LOG_LIMIT {
            let excess = self.events.len() - EVENT_LOG_LIMIT;
            self.events.drain(..excess);
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> GameEngine {
        GameEngine::in_memory(GameConfig::default(), "alice").expect("engine")
    }

    #[test]
    fn opening_registers_profile_with_starting_balance() {
        let engine = engine();
        assert_eq!(engine.profile().name, "alice");
        assert_eq!(engine.profile().token_balance, 100);
        assert_eq!(engine.phase(), Phase::Lobby);
        assert!(engine.history().is_empty());
    }

    #[test]
    fn full_round_lands_in_history_and_profile() {
        let mut engine = engine();
        engine.start_match().expect("start");
        engine.start_with_ai().expect("fill");
        assert!(engine.run_until_phase(Phase::Results, 1_000));

        assert_eq!(engine.history().len(), 1);
        let entry = &engine.history()[0];
        assert_eq!(entry.human_id, engine.human_id());
        assert_eq!(engine.profile().token_balance, 95 + entry.human_reward);
        assert_eq!(engine.profile().rounds_played, 1);
        assert_eq!(engine.leaderboard().len(), 5);
        assert!(engine.last_persistence_error().is_none());
    }

    #[test]
    fn rejected_action_is_logged_as_event() {
        let mut engine = engine();
        let err = engine.cast_vote("nobody").expect_err("lobby vote");
        assert_eq!(err.error_code(), contracts::ErrorCode::InvalidVote);
        assert!(matches!(
            engine.events().last().map(|event| &event.kind),
            Some(GameEventKind::ActionRejected { .. })
        ));
    }

    #[test]
    fn events_since_skips_older_sequences() {
        let mut engine = engine();
        engine.start_match().expect("start");
        let total = engine.events().len() as u64;
        assert!(total >= 2);
        assert_eq!(engine.events_since(1).len() as u64, total - 1);
        assert!(engine.events_since(total).is_empty());
    }

    #[test]
    fn same_seed_same_rounds() {
        let play = || {
            let mut engine = engine();
            engine.start_match().expect("start");
            engine.run_until_phase(Phase::Results, 1_000);
            engine.state().result.clone()
        };
        assert_eq!(play(), play());
    }
}
