//! Terminal input for the table REPL.
//!
//! Completes table commands, script directives and live token ids, hints
//! command usage, and keeps reading while a `HEIGHT_START` block or a `\`
//! continuation is open so the whole entry lands as one batch. Falls back to
//! plain stdin when there is no terminal.

use std::borrow::Cow;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Context, Helper};

use super::COMMANDS;
use crate::style::TableStyle;

/// Outcome of reading a line from the REPL input.
pub enum InputEvent {
    Line(String),
    Eof,
    Interrupted,
}

/// Script directive keywords offered at the start of a line.
const DIRECTIVES: &[&str] = &[
    "ATTACK",
    "BACKGROUND",
    "BOARD",
    "CLEAR ALL",
    "CLEAR TOKENS",
    "CREATE",
    "EFFECT",
    "GRID",
    "HEIGHT",
    "HEIGHT_END",
    "HEIGHT_RANDOM",
    "HEIGHT_START",
    "INITIATIVE",
    "MAP",
    "MOVE",
    "PLACE",
    "REMOVE",
    "REMOVE HEIGHTMAP",
    "RESET",
    "ROADS",
    "SPRITE DEF",
    "STATE",
];

/// Directives whose operands are token ids.
const TOKEN_DIRECTIVES: &[&str] = &["ATTACK", "INITIATIVE", "MOVE", "REMOVE"];

type ReplEditor = rustyline::Editor<TableHelper, DefaultHistory>;

#[derive(Default)]
struct TableHelper {
    token_ids: Vec<String>,
}

impl Helper for TableHelper {}

impl Completer for TableHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        Ok(self.completions(line, pos))
    }
}

impl Hinter for TableHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        usage_hint(line)
    }
}

impl Highlighter for TableHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.info_style().to_string())
    }
}

impl Validator for TableHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        if needs_more(ctx.input()) {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

impl TableHelper {
    /// Replacement start and candidates for the word under the cursor: token
    /// ids in the operands of [`TOKEN_DIRECTIVES`], else commands and directives.
    fn completions(&self, line: &str, pos: usize) -> (usize, Vec<Pair>) {
        let (start, prefix) = current_prefix(line, pos);
        if prefix.is_empty() {
            return (start, Vec::new());
        }
        let upper = prefix.to_uppercase();
        let keyword = upper.split_whitespace().next().unwrap_or_default();
        if TOKEN_DIRECTIVES.contains(&keyword) && prefix.contains(char::is_whitespace) {
            let word_start = prefix
                .rfind(|c: char| c.is_whitespace() || c == ',' || c == '>')
                .map_or(0, |idx| idx + 1);
            let word = prefix[word_start..].to_lowercase();
            let ids = self
                .token_ids
                .iter()
                .filter(|id| id.to_lowercase().starts_with(&word))
                .map(String::as_str)
                .map(pair);
            return (start + word_start, ids.collect());
        }
        let terms = COMMANDS
            .iter()
            .map(|(name, _, _)| *name)
            .chain(DIRECTIVES.iter().copied())
            .filter(|term| term.to_uppercase().starts_with(&upper))
            .map(pair);
        (start, terms.collect())
    }
}

fn pair(term: &str) -> Pair {
    Pair {
        display: term.to_string(),
        replacement: term.to_string(),
    }
}

fn current_prefix(line: &str, pos: usize) -> (usize, String) {
    let slice = &line[..pos];
    let trimmed = slice.trim_start_matches(char::is_whitespace);
    let start = pos - trimmed.len();
    (start, trimmed.to_string())
}

/// Argument usage for a fully typed command that takes arguments.
fn usage_hint(line: &str) -> Option<String> {
    let typed = line.trim_start();
    let name = typed.trim_end();
    let (_, args, _) = COMMANDS
        .iter()
        .find(|(command, args, _)| !args.is_empty() && command.eq_ignore_ascii_case(name))?;
    let gap = if typed.len() > name.len() { "" } else { " " };
    Some(format!("{gap}{args}"))
}

/// Whether `input` is an unfinished entry: an open `HEIGHT_START` block or a
/// trailing `\` continuation.
fn needs_more(input: &str) -> bool {
    if input.trim_end().ends_with('\\') {
        return true;
    }
    let mut open = false;
    for line in input.lines() {
        let word = line.split_whitespace().next().unwrap_or_default().to_uppercase();
        match word.as_str() {
            "HEIGHT_START" => open = true,
            "HEIGHT_END" | "END_HEIGHT" => open = false,
            _ => {},
        }
    }
    open
}

/// Manages the interactive input backend.
///
/// Prefers `rustyline` on an interactive terminal, a basic stdin reader otherwise.
pub struct InputManager {
    backend: Backend,
}

impl InputManager {
    pub fn new() -> Self {
        let backend = if io::stdin().is_terminal() {
            match RustylineInput::new() {
                Ok(editor) => {
                    info!("using rustyline-backed REPL input");
                    Backend::Rustyline(editor)
                },
                Err(err) => {
                    warn!("failed to initialize rustyline ({err}), falling back to basic stdin");
                    Backend::plain()
                },
            }
        } else {
            info!("stdin is not a TTY; using basic input mode");
            Backend::plain()
        };

        Self { backend }
    }

    /// Ids offered when completing token operands.
    pub fn set_token_ids(&mut self, ids: impl IntoIterator<Item = String>) {
        if let Backend::Rustyline(input) = &mut self.backend
            && let Some(helper) = input.editor.helper_mut()
        {
            helper.token_ids.clear();
            helper.token_ids.extend(ids);
        }
    }

    /// Read a line from the current backend. If the interactive backend fails,
    /// switch to plain stdin and retry once.
    pub fn read_line(&mut self, prompt: &str) -> io::Result<InputEvent> {
        match self.backend.read_line(prompt) {
            Ok(event) => Ok(event),
            Err(err) if self.backend.is_rustyline() => {
                warn!("rustyline input failed: {err} -- switching to basic stdin");
                self.backend = Backend::plain();
                self.backend.read_line(prompt)
            },
            Err(err) => Err(err),
        }
    }
}

enum Backend {
    Rustyline(RustylineInput),
    Plain(StdinInput),
}

impl Backend {
    fn plain() -> Self {
        Backend::Plain(StdinInput::default())
    }

    fn is_rustyline(&self) -> bool {
        matches!(self, Backend::Rustyline(_))
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<InputEvent> {
        match self {
            Backend::Rustyline(editor) => editor.read_line(prompt),
            Backend::Plain(stdin) => stdin.read_line(prompt),
        }
    }
}

struct RustylineInput {
    editor: ReplEditor,
    history_path: Option<PathBuf>,
}

impl RustylineInput {
    fn new() -> io::Result<Self> {
        let mut editor = rustyline::Editor::<TableHelper, _>::new().map_err(map_io_err)?;
        editor.set_helper(Some(TableHelper::default()));
        let history_path = history_file_path();

        if let Some(path) = history_path.as_ref() {
            if let Some(dir) = path.parent()
                && let Err(err) = fs::create_dir_all(dir)
            {
                warn!("failed to create history directory {}: {err}", dir.display());
            }
            match editor.load_history(path) {
                Ok(()) => {},
                Err(ReadlineError::Io(ref io_err)) if io_err.kind() == io::ErrorKind::NotFound => {
                    info!("no prior history found at {}, starting fresh", path.display());
                },
                Err(other) => warn!("failed to load history from {}: {other}", path.display()),
            }
        }

        Ok(Self { editor, history_path })
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<InputEvent> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(err) = self.editor.add_history_entry(line.as_str()) {
                        warn!("failed to append to history: {err}");
                    }
                    if let Some(path) = self.history_path.as_ref()
                        && let Err(err) = self.editor.save_history(path)
                    {
                        warn!("failed to persist history to {}: {err}", path.display());
                    }
                }
                Ok(InputEvent::Line(line))
            },
            Err(err) => convert_readline_error(err),
        }
    }
}

#[derive(Default)]
struct StdinInput {
    buffer: String,
}

impl StdinInput {
    /// Reads one entry, continuing over extra lines while it is unfinished.
    fn read_line(&mut self, prompt: &str) -> io::Result<InputEvent> {
        print!("{prompt}");
        io::stdout().flush()?;

        self.buffer.clear();
        loop {
            let bytes = io::stdin().read_line(&mut self.buffer)?;
            if bytes == 0 && self.buffer.is_empty() {
                return Ok(InputEvent::Eof);
            }
            if bytes == 0 || !needs_more(&self.buffer) {
                break;
            }
        }
        let entry = self.buffer.trim_end_matches(['\n', '\r']);
        Ok(InputEvent::Line(entry.to_string()))
    }
}

fn convert_readline_error(err: ReadlineError) -> io::Result<InputEvent> {
    match err {
        ReadlineError::Interrupted => Ok(InputEvent::Interrupted),
        ReadlineError::Eof => Ok(InputEvent::Eof),
        ReadlineError::Io(io_err) => Err(io_err),
        other => Err(io::Error::other(other)),
    }
}

fn map_io_err(err: ReadlineError) -> io::Error {
    match err {
        ReadlineError::Io(io_err) => io_err,
        other => io::Error::other(other),
    }
}

fn history_file_path() -> Option<PathBuf> {
    dirs::data_dir()
        .or_else(dirs::data_local_dir)
        .map(|base| build_history_path(&base))
}

fn build_history_path(base: &Path) -> PathBuf {
    base.join("skirmish").join("history.txt")
}
