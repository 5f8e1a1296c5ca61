//! CLI entry point for skirmish_script.
//! Usage: cargo run -p skirmish_script -- compile battles/ambush.skirmish [--out ambush.ron] [--json]

use std::{env, fs, process};

use skirmish_data::{MemorySink, RowBase, TraceEvent, validate_instructions};
use skirmish_script::{OutputFormat, ParseOptions, compile_instructions, parse_with};

const USAGE: &str = "Usage:\n  skirmish_script compile <file> [--out <file>] [--json] [--zero-rows]\n  skirmish_script lint <file> [--zero-rows]";

fn main() {
    let args: Vec<String> = env::args().collect();

    // Accept either `<bin> -- <cmd> ...` (cargo run) or `<bin> <cmd> ...`.
    let rest: &[String] = match args.as_slice() {
        [_, flag, tail @ ..] if flag == "--" => tail,
        [_, tail @ ..] => tail,
        [] => &[],
    };
    match rest {
        [cmd, tail @ ..] if cmd == "compile" => run_compile(tail),
        [cmd, tail @ ..] if cmd == "lint" => run_lint(tail),
        [cmd, ..] => {
            eprintln!("unknown command: {cmd}\n{USAGE}");
            process::exit(2);
        },
        [] => {
            eprintln!("{USAGE}");
            process::exit(2);
        },
    }
}

/// Flags shared by both subcommands.
#[derive(Default)]
struct CliArgs {
    path: Option<String>,
    out_path: Option<String>,
    format: OutputFormat,
    options: ParseOptions,
}

fn parse_args(args: &[String]) -> CliArgs {
    let mut cli = CliArgs::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--out" => {
                let Some(out) = args.get(i + 1) else {
                    eprintln!("--out requires a filepath");
                    process::exit(2);
                };
                cli.out_path = Some(out.clone());
                i += 2;
                continue;
            },
            "--json" => cli.format = OutputFormat::Json,
            "--zero-rows" => cli.options.row_base = RowBase::Zero,
            s => {
                if cli.path.is_none() {
                    cli.path = Some(s.to_string());
                }
            },
        }
        i += 1;
    }
    cli
}

fn read_script(cli: &CliArgs) -> (String, String) {
    let Some(path) = cli.path.clone() else {
        eprintln!("{USAGE}");
        process::exit(2);
    };
    let src = fs::read_to_string(&path).unwrap_or_else(|e| {
        eprintln!("error: unable to read '{path}': {e}");
        process::exit(1);
    });
    (path, src)
}

fn report_trace(path: &str, sink: &MemorySink) -> usize {
    let mut count = 0;
    for event in &sink.events {
        match event {
            TraceEvent::ParseMiss { line, text } => {
                eprintln!("warning: {path}:{line}: unrecognized line \"{text}\"");
                count += 1;
            },
            TraceEvent::EntryDropped { line, entry } => {
                eprintln!("warning: {path}:{line}: dropped malformed entry \"{entry}\"");
                count += 1;
            },
            _ => {},
        }
    }
    count
}

fn run_compile(args: &[String]) {
    let cli = parse_args(args);
    let (path, src) = read_script(&cli);
    let mut sink = MemorySink::new();
    let instructions = parse_with(&src, &cli.options, &mut sink);
    report_trace(&path, &sink);

    match compile_instructions(&instructions, cli.format) {
        Ok(text) => {
            if let Some(out) = cli.out_path {
                fs::write(&out, text).unwrap_or_else(|e| {
                    eprintln!("error: writing '{out}': {e}");
                    process::exit(1);
                });
                println!("wrote {} instruction(s) to {out}", instructions.len());
            } else {
                println!("{text}");
            }
        },
        Err(e) => {
            eprintln!("compile error: {e}");
            process::exit(1);
        },
    }
}

fn run_lint(args: &[String]) {
    let cli = parse_args(args);
    let (path, src) = read_script(&cli);
    let mut sink = MemorySink::new();
    let instructions = parse_with(&src, &cli.options, &mut sink);
    let warnings = report_trace(&path, &sink);

    let errors = validate_instructions(&instructions);
    for err in &errors {
        eprintln!("error: {path}: {err}");
    }
    println!(
        "{path}: {} instruction(s), {warnings} warning(s), {} error(s)",
        instructions.len(),
        errors.len()
    );
    if !errors.is_empty() {
        process::exit(1);
    }
}
