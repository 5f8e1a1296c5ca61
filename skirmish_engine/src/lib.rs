#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const SKIRMISH_VERSION: &str = env!("CARGO_PKG_VERSION");

// Core modules
pub mod combat;
pub mod config;
pub mod geometry;
pub mod interpreter;
pub mod lcg;
pub mod repl;
pub mod scheduler;
pub mod style;
pub mod suggest;
pub mod sync;
pub mod world;

// Re-exports for convenience
pub use combat::{Attack, CombatState, CombatToken, ReachRange};
pub use config::EngineConfig;
pub use interpreter::{ApplyError, Interpreter};
pub use repl::{Session, run_repl};
pub use scheduler::{Scheduler, TickReport};
pub use skirmish_data::TokenId;
pub use suggest::{Intent, Suggestion, SuggestionReport};
pub use sync::{Follower, InstructionLog, InstructionSource, PollOutcome, SyncBatch, SyncError};
pub use world::{ActiveEffect, ActiveMove, Map, TokenDefinition, TokenInstance, WorldState};
