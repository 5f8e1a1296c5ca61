#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! Skirmish battle-script parser.
//!
//! Turns DM-authored script text into the [`Instruction`] stream consumed by the
//! engine, and serializes instruction lists for transport or inspection.

pub mod parser;

pub use parser::{ParseError, ParseOptions, parse, parse_with};

use skirmish_data::Instruction;
use thiserror::Error;

/// Output format for compiled scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Ron,
    Json,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("RON serialization failed: {0}")]
    Ron(#[from] ron::Error),
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize an instruction list in the requested format.
///
/// # Errors
/// Returns an error if the serializer rejects a value (e.g. a non-finite number).
pub fn compile_instructions(instructions: &[Instruction], format: OutputFormat) -> Result<String, CompileError> {
    match format {
        OutputFormat::Ron => Ok(ron::ser::to_string_pretty(
            instructions,
            ron::ser::PrettyConfig::default(),
        )?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(instructions)?),
    }
}

/// Read back a JSON instruction list, the form replicated between sessions.
///
/// # Errors
/// Returns an error if the text is not a JSON array of instructions.
pub fn load_instructions_json(text: &str) -> Result<Vec<Instruction>, serde_json::Error> {
    serde_json::from_str(text)
}
