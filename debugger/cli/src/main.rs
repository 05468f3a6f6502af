#![warn(clippy::nursery, clippy::pedantic, unused_crate_dependencies)]
#![allow(
    clippy::cognitive_complexity,
    clippy::match_same_arms,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines
)]

use clap::Parser;
use tracing::{Level, Metadata};
use tracing_subscriber::{
    filter,
    fmt::{format::FmtSpan, writer::BoxMakeWriter},
    prelude::*,
};

mod debug;
mod locations;
mod output;
mod run;
mod script;

#[derive(Parser, Debug)]
#[command(name = "scriptdbg", about = "A command-line debugger for scripts.")]
enum ScriptDbgOptions {
    Debug(debug::Options),

    Run(run::Options),

    Locations(locations::Options),
}
impl ScriptDbgOptions {
    const fn script(&self) -> &script::ScriptOptions {
        match self {
            Self::Debug(options) => &options.script,
            Self::Run(options) => &options.script,
            Self::Locations(options) => &options.script,
        }
    }
}

#[tokio::main]
async fn main() -> ProgramResult {
    let options = ScriptDbgOptions::parse();
    init_logger(options.script().verbose);

    match options {
        ScriptDbgOptions::Debug(options) => debug::debug(options).await,
        ScriptDbgOptions::Run(options) => run::run(options),
        ScriptDbgOptions::Locations(options) => locations::locations(options),
    }
}

pub type ProgramResult = Result<(), Exit>;
#[derive(Debug)]
pub enum Exit {
    FileNotFound,
    InvalidSyntaxTree,
    ScriptFailed,
    LineOutOfRange,
    DebuggerFailed,
}

/// Logs go to stderr so they don't mix with the debugger's own output.
fn init_logger(verbose: bool) {
    let own_level = if verbose { Level::TRACE } else { Level::WARN };
    let console_log = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(BoxMakeWriter::new(std::io::stderr))
        .with_span_events(FmtSpan::ENTER)
        .with_filter(filter::filter_fn(|metadata| {
            // For external packages, show only the error logs.
            metadata.level() <= &Level::ERROR
                || metadata
                    .module_path()
                    .unwrap_or_default()
                    .starts_with("scriptdbg")
        }))
        .with_filter(filter::filter_fn(level_for(
            "scriptdbg_syntax",
            own_level.min(Level::DEBUG),
        )))
        .with_filter(filter::filter_fn(level_for("scriptdbg_engine", own_level)))
        .with_filter(filter::filter_fn(level_for(
            "scriptdbg_engine::machine",
            own_level.min(Level::DEBUG),
        )))
        .with_filter(filter::filter_fn(level_for("scriptdbg_core", own_level)));
    tracing_subscriber::registry().with(console_log).init();
}
fn level_for(module: &'static str, level: Level) -> impl Fn(&Metadata) -> bool {
    move |metadata| {
        if metadata
            .module_path()
            .unwrap_or_default()
            .starts_with(module)
        {
            metadata.level() <= &level
        } else {
            true
        }
    }
}
