//! Read-eval-print loop for running a table.
//!
//! Lines starting with `:` are table commands; everything else is script text.
//! Every committed batch goes to the world interpreter, the combat mirror and
//! the instruction log, in that order.

mod input;

use std::fs;

use anyhow::Result;
use log::info;
use skirmish_data::{EventSink, Instruction, LogSink, MemorySink, TraceEvent};
use skirmish_script::{ParseOptions, parse_with};

use crate::combat::CombatState;
use crate::config::EngineConfig;
use crate::interpreter::Interpreter;
use crate::scheduler::Scheduler;
use crate::style::TableStyle;
use crate::suggest::{Intent, SuggestionReport};
use crate::sync::InstructionLog;
use crate::world::WorldState;

use input::{InputEvent, InputManager};

/// Seconds advanced by a bare `:tick`.
const DEFAULT_TICK_SECONDS: f64 = 0.5;

/// Table commands as `(name, arguments, summary)`. Drives `:help`, completion
/// and the usage hints shown while typing.
pub(crate) const COMMANDS: &[(&str, &str, &str)] = &[
    (":tick", "[seconds]", "advance animations"),
    (":state", "", "show the board, tokens and turn"),
    (":suggest", "", "list suggestions for the active combatant"),
    (":pick", "<n>", "carry out suggestion n"),
    (":next", "", "end the current turn"),
    (":load", "<file>", "run a script file"),
    (":dump", "", "print the world state as JSON"),
    (":help", "", "this text"),
    (":quit", "", "leave"),
];

fn help_text() -> String {
    let mut lines = vec!["Script lines (PLACE, MOVE, ATTACK, ...) are applied as one batch.".to_string()];
    lines.extend(COMMANDS.iter().map(|(name, args, summary)| {
        let usage = format!("{name} {args}");
        format!("  {usage:<17}{summary}")
    }));
    lines.join("\n")
}

/// Control flow signal for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplControl {
    Continue,
    Quit,
}

/// One DM's table: the authoritative world plus everything derived from it.
#[derive(Debug)]
pub struct Session {
    options: ParseOptions,
    interpreter: Interpreter,
    scheduler: Scheduler,
    world: WorldState,
    combat: CombatState,
    log: InstructionLog,
    last_report: Option<SuggestionReport>,
}

impl Session {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            options: ParseOptions {
                row_base: config.coords.row_base,
            },
            interpreter: Interpreter::new(config),
            scheduler: Scheduler::new(&config.animation),
            world: WorldState::default(),
            combat: CombatState::new(config),
            log: InstructionLog::new(),
            last_report: None,
        }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn combat(&self) -> &CombatState {
        &self.combat
    }

    pub fn log(&self) -> &InstructionLog {
        &self.log
    }

    /// Parse `source` and commit it as one batch. Returns the number of
    /// instructions parsed.
    pub fn run_script(&mut self, source: &str, sink: &mut dyn EventSink) -> usize {
        let instructions = parse_with(source, &self.options, sink);
        let count = instructions.len();
        self.commit(&instructions, sink);
        count
    }

    /// Feed a batch to the world, the combat mirror and the log.
    pub fn commit(&mut self, instructions: &[Instruction], sink: &mut dyn EventSink) {
        if instructions.is_empty() {
            return;
        }
        self.world = self.interpreter.apply(&self.world, instructions, sink);
        self.combat.apply(instructions, sink);
        self.log.append(instructions);
        self.last_report = None;
    }

    /// Handle one input line, appending anything to show to `out`.
    pub fn handle_line(&mut self, line: &str, out: &mut Vec<String>) -> ReplControl {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ReplControl::Continue;
        }
        let Some(command) = trimmed.strip_prefix(':') else {
            self.with_sink(out, |session, sink| {
                session.run_script(line, sink);
            });
            return ReplControl::Continue;
        };

        let (name, arg) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
        let arg = arg.trim();
        match name.to_ascii_lowercase().as_str() {
            "quit" | "q" | "exit" => return ReplControl::Quit,
            "help" | "h" => out.push(help_text()),
            "tick" => self.tick(arg, out),
            "state" => self.describe(out),
            "suggest" => self.suggest(out),
            "pick" => self.pick(arg, out),
            "next" => self.next_turn(out),
            "load" => self.load(arg, out),
            "dump" => match serde_json::to_string_pretty(&self.world) {
                Ok(json) => out.push(json),
                Err(err) => out.push(format!("could not serialize world: {err}").error_style().to_string()),
            },
            other => out.push(format!("unknown command ':{other}' (try :help)").error_style().to_string()),
        }
        ReplControl::Continue
    }

    /// Run `f` with a sink, then report skipped instructions and dropped lines.
    fn with_sink(&mut self, out: &mut Vec<String>, f: impl FnOnce(&mut Self, &mut MemorySink)) {
        let mut sink = MemorySink::new();
        f(self, &mut sink);
        for event in sink.events {
            match &event {
                TraceEvent::Skipped { instruction, reason } => {
                    out.push(format!("skipped {instruction}: {reason}").warning_style().to_string());
                },
                TraceEvent::ParseMiss { line, text } => {
                    out.push(format!("line {line}: not understood: {text}").warning_style().to_string());
                },
                TraceEvent::EntryDropped { line, entry } => {
                    out.push(format!("line {line}: dropped '{entry}'").warning_style().to_string());
                },
                TraceEvent::Applied { .. } | TraceEvent::Note(_) => {},
            }
            LogSink.record(event);
        }
    }

    fn tick(&mut self, arg: &str, out: &mut Vec<String>) {
        let dt = if arg.is_empty() {
            DEFAULT_TICK_SECONDS
        } else {
            match arg.parse::<f64>() {
                Ok(dt) => dt,
                Err(_) => {
                    out.push(format!("not a number of seconds: '{arg}'").error_style().to_string());
                    return;
                },
            }
        };
        let report = self.scheduler.tick(&mut self.world, dt);
        for id in &report.arrived {
            out.push(format!("{} arrived", id.to_string().token_style()));
        }
        for id in &report.expired_effects {
            out.push(format!("effect #{id} finished").info_style().to_string());
        }
        if report.is_quiet() {
            out.push(format!(
                "{} move(s), {} effect(s) in flight",
                self.world.active_moves.len(),
                self.world.active_effects.len()
            ));
        }
    }

    fn describe(&self, out: &mut Vec<String>) {
        let map = &self.world.map;
        out.push(
            format!(
                "{} {}x{} {:?} grid, {}px cells",
                map.id, map.cols, map.rows, map.grid_type, map.cell_size_px
            )
            .heading_style()
            .to_string(),
        );
        if let Some(background) = &map.background {
            out.push(format!("background: {background}"));
        }
        out.push(format!("{} {}", "tokens".section_style(), self.world.token_instances.len()));
        for token in &self.world.token_instances {
            let at = token
                .cell()
                .and_then(|cell| cell.to_ref(self.combat.row_base))
                .unwrap_or_else(|| format!("({:.1}, {:.1})", token.col, token.row));
            let moving = if self.world.active_move(&token.id).is_some() {
                " (moving)"
            } else {
                ""
            };
            out.push(format!(
                "  {} {} at {}{moving}",
                token.id.to_string().faction_style(&token.faction),
                token.name,
                at.coord_style()
            ));
        }
        let turn = format!(
            "round {}, {}",
            self.combat.round,
            self.combat
                .active_token()
                .map_or_else(|| "-".to_string(), |t| format!("{} ({})", t.name, t.id))
        );
        out.push(format!("{} {}", "turn".section_style(), turn.info_style()));
    }

    fn suggest(&mut self, out: &mut Vec<String>) {
        let report = self.combat.suggestions();
        out.push(
            format!(
                "Round {} | {}",
                report.round,
                report.active_name.as_deref().unwrap_or("no one")
            )
            .heading_style()
            .to_string(),
        );
        out.push(report.info.info_style().to_string());
        for (n, suggestion) in report.suggestions.iter().enumerate() {
            out.push(format!("  {}. {}", n + 1, suggestion.label.suggestion_style()));
        }
        self.last_report = Some(report);
    }

    fn pick(&mut self, arg: &str, out: &mut Vec<String>) {
        let Some(report) = &self.last_report else {
            out.push("no suggestions yet (try :suggest)".warning_style().to_string());
            return;
        };
        let chosen = arg
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| report.suggestions.get(idx));
        let Some(suggestion) = chosen else {
            out.push(format!("no suggestion '{arg}'").error_style().to_string());
            return;
        };
        let intent = suggestion.intent.clone();
        out.push(format!("> {}", suggestion.label).suggestion_style().to_string());

        let instructions = self.combat.translate_intent(&intent);
        if !instructions.is_empty() {
            self.with_sink(out, |session, sink| session.commit(&instructions, sink));
        }
        match intent {
            Intent::EndTurn { .. } => self.next_turn(out),
            Intent::Defend { .. } => out.push("defending".info_style().to_string()),
            _ => {},
        }
        self.last_report = None;
    }

    fn next_turn(&mut self, out: &mut Vec<String>) {
        self.combat.advance_turn();
        self.last_report = None;
        let who = self
            .combat
            .active_token()
            .map_or_else(|| "no one".to_string(), |t| t.name.clone());
        out.push(format!("Round {}: {who}'s turn", self.combat.round).heading_style().to_string());
    }

    fn load(&mut self, path: &str, out: &mut Vec<String>) {
        if path.is_empty() {
            out.push("usage: :load <file>".warning_style().to_string());
            return;
        }
        match fs::read_to_string(path) {
            Ok(source) => {
                let mut count = 0;
                self.with_sink(out, |session, sink| count = session.run_script(&source, sink));
                out.push(format!("loaded {count} instruction(s) from {path}"));
            },
            Err(err) => out.push(format!("could not read {path}: {err}").error_style().to_string()),
        }
    }

    fn prompt(&self) -> String {
        let turn = self
            .combat
            .active_token()
            .map_or_else(|| "-".to_string(), |t| t.name.clone());
        format!("\n[Round: {}|Turn: {turn}]>> ", self.combat.round)
    }
}

/// Run the table loop until the user quits or input ends.
///
/// # Errors
/// - Propagates terminal write failures.
pub fn run_repl(session: &mut Session) -> Result<()> {
    let mut input = InputManager::new();
    let mut out = Vec::new();
    info!("table session started");
    loop {
        input.set_token_ids(session.world.token_instances.iter().map(|t| t.id.to_string()));
        let line = match input.read_line(&session.prompt()) {
            Ok(InputEvent::Line(line)) => line,
            Ok(InputEvent::Eof) => break,
            Ok(InputEvent::Interrupted) => {
                println!("(canceled)");
                continue;
            },
            Err(err) => {
                println!("{}", format!("failed to read input: {err}").error_style());
                continue;
            },
        };
        let control = session.handle_line(&line, &mut out);
        for text in out.drain(..) {
            println!("{text}");
        }
        if control == ReplControl::Quit {
            break;
        }
    }
    info!("table session ended at log version {}", session.log.version());
    Ok(())
}
