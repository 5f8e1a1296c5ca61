//! Shared data model for Skirmish battle scripts.

pub mod coord;
pub mod ids;
pub mod instruction;
pub mod templates;
pub mod trace;
pub mod validate;

pub use coord::{Cell, RowBase, index_to_ref, point_to_cell, point_to_ref, ref_to_index};
pub use ids::TokenId;
pub use instruction::*;
pub use templates::{TEMPLATES, TokenTemplate, find_template};
pub use trace::{EventSink, LogSink, MemorySink, NullSink, TraceEvent};
pub use validate::{ValidationError, validate_instructions};
