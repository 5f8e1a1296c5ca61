//! Replication of instruction batches to followers.
//!
//! The DM's session keeps an [`InstructionLog`]: every committed batch with a
//! monotonically increasing version, plus a refresh token that changes whenever a
//! batch wipes the world. A [`Follower`] polls an [`InstructionSource`] for the
//! batches after its version and replays them through its own interpreter. When
//! the refresh token it sees no longer matches, it drops its state and replays
//! from the start.

use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use skirmish_data::{EventSink, Instruction, TraceEvent};
use thiserror::Error;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::interpreter::Interpreter;
use crate::world::WorldState;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed sync payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Everything a follower needs to catch up from some version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncBatch {
    pub refresh_token: Uuid,
    /// Version of the newest batch included.
    pub version: u64,
    pub instructions: Vec<Instruction>,
}

impl SyncBatch {
    pub fn from_json(text: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Somewhere a follower can fetch batches from.
pub trait InstructionSource {
    /// Instructions committed after `version`.
    fn fetch_since(&mut self, version: u64) -> Result<SyncBatch, SyncError>;
}

/// Append-only record of committed batches kept by the session owner.
#[derive(Debug, Clone)]
pub struct InstructionLog {
    refresh_token: Uuid,
    version: u64,
    entries: Vec<(u64, Vec<Instruction>)>,
}

impl Default for InstructionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionLog {
    pub fn new() -> Self {
        Self {
            refresh_token: Uuid::new_v4(),
            version: 0,
            entries: Vec::new(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn refresh_token(&self) -> Uuid {
        self.refresh_token
    }

    /// Record a committed batch and return its version. A batch that wipes the
    /// world rotates the refresh token and discards history before it.
    pub fn append(&mut self, batch: &[Instruction]) -> u64 {
        if batch.is_empty() {
            return self.version;
        }
        self.version += 1;
        if let Some(pos) = batch.iter().rposition(Instruction::wipes_world) {
            self.refresh_token = Uuid::new_v4();
            self.entries.clear();
            info!("world wiped at version {}; new refresh token {}", self.version, self.refresh_token);
            self.entries.push((self.version, batch[pos..].to_vec()));
        } else {
            self.entries.push((self.version, batch.to_vec()));
        }
        self.version
    }

    /// Every instruction committed after `version`, flattened in order.
    pub fn since(&self, version: u64) -> SyncBatch {
        let instructions = self
            .entries
            .iter()
            .filter(|(v, _)| *v > version)
            .flat_map(|(_, batch)| batch.iter().cloned())
            .collect();
        SyncBatch {
            refresh_token: self.refresh_token,
            version: self.version,
            instructions,
        }
    }
}

impl InstructionSource for InstructionLog {
    fn fetch_since(&mut self, version: u64) -> Result<SyncBatch, SyncError> {
        Ok(self.since(version))
    }
}

/// Result of one [`Follower::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Applied this many new instructions.
    Updated(usize),
    /// Refresh token changed; state was rebuilt from this many instructions.
    Reloaded(usize),
    Idle,
    /// The source failed; state is unchanged.
    Failed,
}

/// A read-only replica of someone else's world.
#[derive(Debug)]
pub struct Follower {
    interpreter: Interpreter,
    state: WorldState,
    version: u64,
    refresh_token: Option<Uuid>,
    poll_interval: Duration,
}

impl Follower {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            interpreter: Interpreter::new(config),
            state: WorldState::default(),
            version: 0,
            refresh_token: None,
            poll_interval: config.sync.poll_interval(),
        }
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// Mutable access for the animation clock.
    pub fn state_mut(&mut self) -> &mut WorldState {
        &mut self.state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// How long to wait between polls.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn poll(&mut self, source: &mut dyn InstructionSource, sink: &mut dyn EventSink) -> PollOutcome {
        let batch = match source.fetch_since(self.version) {
            Ok(batch) => batch,
            Err(err) => {
                warn!("sync poll failed: {err}");
                return PollOutcome::Failed;
            },
        };

        if self.refresh_token.is_some_and(|token| token != batch.refresh_token) {
            sink.record(TraceEvent::Note(format!(
                "refresh token changed to {}; reloading",
                batch.refresh_token
            )));
            let full = match source.fetch_since(0) {
                Ok(full) => full,
                Err(err) => {
                    warn!("sync reload failed: {err}");
                    return PollOutcome::Failed;
                },
            };
            self.state = self.interpreter.apply(&WorldState::default(), &full.instructions, sink);
            self.version = full.version;
            self.refresh_token = Some(full.refresh_token);
            return PollOutcome::Reloaded(full.instructions.len());
        }

        self.refresh_token = Some(batch.refresh_token);
        self.version = batch.version;
        if batch.instructions.is_empty() {
            return PollOutcome::Idle;
        }
        self.state = self.interpreter.apply(&self.state, &batch.instructions, sink);
        PollOutcome::Updated(batch.instructions.len())
    }
}
