#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** Skirmish **
//! DM console: type script lines, watch the board, take turn suggestions.
//! Usage: skirmish_engine [script]

use skirmish_engine::style::TableStyle;
use skirmish_engine::{EngineConfig, SKIRMISH_VERSION, Session, run_repl};

use anyhow::{Context, Result};
use log::info;
use skirmish_data::LogSink;

use std::{env, fs};

fn main() -> Result<()> {
    env_logger::init();
    let config = EngineConfig::load_default();
    info!("configuration loaded: row base {:?}", config.coords.row_base);

    let mut session = Session::new(&config);
    if let Some(path) = env::args().nth(1) {
        let source = fs::read_to_string(&path).with_context(|| format!("while reading script {path}"))?;
        let count = session.run_script(&source, &mut LogSink);
        info!("preloaded {count} instruction(s) from {path}");
    }

    println!("{}", format!("SKIRMISH {SKIRMISH_VERSION}").heading_style());
    println!("{}", "type :help for commands".info_style());
    run_repl(&mut session)
}
