//! Round state as a single value, advanced by pure `(state, event) -> state'` transitions.
//!
//! [`RoundState::apply`] never mutates its receiver. It returns the next state
//! together with the side effects (profile writes, completed rounds, log lines)
//! that the caller is expected to persist or publish.

use std::collections::BTreeMap;

use contracts::{
    Action, ChatMessage, GameConfig, GameEventKind, HistoryEntry, Phase, Player, RoundTimers,
    Scenario, UserProfile, VoteResult,
};
use rand::RngCore;

use crate::schedule::Schedule;

mod transitions;


#[derive(Debug, Clone)]
pub struct RoundState {
    pub phase: Phase,
    pub round_number: u32,
    /// Bumped on every phase change and on exit; scheduled actions queued
    /// under an older generation are stale.
    pub generation: u64,
    pub tick: u64,
    pub profile: UserProfile,
    pub roster: Vec<Player>,
    pub scenario: Option<Scenario>,
    pub timers: RoundTimers,
    /// voter id -> target id
    pub votes: BTreeMap<String, String>,
    pub messages: Vec<ChatMessage>,
    pub result: Option<VoteResult>,
    pub schedule: Schedule,
}

impl RoundState {
    pub fn new(profile: UserProfile, config: &GameConfig) -> Self {
        Self {
            phase: Phase::Lobby,
            round_number: 1,
            generation: 0,
            tick: 0,
            profile,
            roster: Vec::new(),
            scenario: None,
            timers: config.timers(),
            votes: BTreeMap::new(),
            messages: Vec::new(),
            result: None,
            schedule: Schedule::new(),
        }
    }

    pub fn human_id(&self) -> &str {
        &self.profile.id
    }

    pub fn human(&self) -> Option<&Player> {
        crate::roster::find(&self.roster, &self.profile.id)
    }

    pub fn vote_of(&self, voter_id: &str) -> Option<&str> {
        self.votes.get(voter_id).map(String::as_str)
    }

    pub fn simulated_without_vote(&self) -> Vec<&Player> {
        self.roster
            .iter()
            .filter(|player| player.is_simulated && !self.votes.contains_key(&player.id))
            .collect()
    }

    /// Remaining time units of the timer driving the current phase.
    pub fn active_timer(&self) -> Option<u32> {
        match self.phase {
            Phase::Matching => Some(self.timers.matching),
            Phase::Discussion => Some(self.timers.discussion),
            Phase::Voting => Some(self.timers.voting),
            Phase::Lobby | Phase::Results => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    Action(Action),
    /// One time unit elapses.
    Tick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ProfileChanged(UserProfile),
    RoundCompleted(HistoryEntry),
    Log(GameEventKind),
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: RoundState,
    pub effects: Vec<Effect>,
}

pub struct TransitionContext<'a> {
    pub config: &'a GameConfig,
    pub rng: &'a mut dyn RngCore,
    /// Wall-clock stamp recorded on history entries.
    pub now_ms: u64,
}
