//! Structured trace events.
//!
//! The parser and the interpreter never log on their own; callers hand them an
//! [`EventSink`]. [`LogSink`] forwards to the `log` facade, [`MemorySink`] keeps
//! events for inspection.

use log::{debug, info, warn};

/// Something worth reporting while parsing or applying a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A script line matched no directive and was dropped.
    ParseMiss { line: usize, text: String },
    /// One entry of a list (usually a coordinate) was malformed and dropped.
    EntryDropped { line: usize, entry: String },
    /// An instruction was folded into the working state.
    Applied { instruction: &'static str },
    /// An instruction could not be resolved and was skipped.
    Skipped { instruction: &'static str, reason: String },
    /// Free-form note (batch commits, replication events).
    Note(String),
}

/// Receiver for [`TraceEvent`]s.
pub trait EventSink {
    fn record(&mut self, event: TraceEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn record(&mut self, event: TraceEvent) {
        (**self).record(event);
    }
}

/// Sink that writes events through the `log` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::ParseMiss { line, text } => debug!("line {line}: no directive matched \"{text}\""),
            TraceEvent::EntryDropped { line, entry } => warn!("line {line}: dropped malformed entry \"{entry}\""),
            TraceEvent::Applied { instruction } => debug!("applied '{instruction}'"),
            TraceEvent::Skipped { instruction, reason } => warn!("skipped '{instruction}': {reason}"),
            TraceEvent::Note(message) => info!("{message}"),
        }
    }
}

/// Sink that stores every event in order.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub events: Vec<TraceEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reasons for every skipped instruction.
    pub fn skipped(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Skipped { reason, .. } => Some(reason.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Script lines that were dropped as unrecognized.
    pub fn misses(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::ParseMiss { line, .. } => Some(*line),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&mut self, _event: TraceEvent) {}
}
