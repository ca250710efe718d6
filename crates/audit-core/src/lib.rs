//! Round state machine, simulated players, rewards and local identity for ChainAudit.

pub mod chat;
pub mod engine;
pub mod error;
pub mod identity;
pub mod leaderboard;
pub mod roster;
pub mod round;
pub mod scenario;
pub mod schedule;
pub mod view;
pub mod voting;

pub use engine::GameEngine;
pub use error::{EngineError, RoundError};
pub use identity::{IdentityStore, KeyValueStore, MemoryStore, StoreError};
pub use round::{Effect, RoundEvent, RoundState, Transition, TransitionContext};
pub use schedule::{Schedule, ScheduledEntry};
pub use voting::VoteRejection;
