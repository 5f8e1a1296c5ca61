//! Parser for Skirmish battle scripts.
//!
//! Scripts are read one logical line at a time. The Pest grammar recognizes a
//! single directive; the scanner around it owns comments, `\` continuation lines,
//! `HEIGHT_START` blocks and multi-line `HEIGHT` directives. A line that matches
//! nothing is dropped, and so is a malformed entry inside a coordinate list.

use pest_derive::Parser as PestParser;

use skirmish_data::{EventSink, Instruction, LogSink, RowBase};

mod directives;
mod helpers;
mod scanner;

use scanner::Scanner;

#[derive(PestParser)]
#[grammar = "src/grammar.pest"]
struct ScriptParser;

/// Errors raised while turning one line into an instruction.
///
/// These never escape [`parse`]; a failing line is reported to the sink and
/// skipped.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("parse error: {0}")]
    Pest(String),
    #[error("unexpected grammar shape: {0}")]
    Shape(&'static str),
    #[error("number out of range: '{0}'")]
    Number(String),
}

/// Settings that change how script text is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub row_base: RowBase,
}

/// Parse a script with default options, reporting through the `log` crate.
pub fn parse(source: &str) -> Vec<Instruction> {
    parse_with(source, &ParseOptions::default(), &mut LogSink)
}

/// Parse a script, reporting dropped lines and entries to `sink`.
pub fn parse_with(source: &str, options: &ParseOptions, sink: &mut dyn EventSink) -> Vec<Instruction> {
    Scanner::new(options, sink).run(source)
}
