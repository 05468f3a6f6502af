use crate::{
    script::{report, ScriptOptions},
    ProgramResult,
};
use clap::Parser;
use itertools::Itertools;
use scriptdbg_core::{ProgramError, SourceRecord};
use tracing::info;

/// List the positions at which breakpoints can stop.
///
/// Breakpoints set anywhere else move to the next of these positions.
#[derive(Parser, Debug)]
pub(crate) struct Options {
    #[command(flatten)]
    pub script: ScriptOptions,

    /// Only list the positions in this (one-based) line.
    #[arg(long)]
    line: Option<usize>,
}

pub(crate) fn locations(options: Options) -> ProgramResult {
    let script = options.script.load()?;
    let record = SourceRecord::new(script.source_id, script.text, &script.program);
    info!(
        "{} has {} breakpoint positions.",
        record.id(),
        record.breakpoint_candidates().len(),
    );

    if let Some(line) = options.line {
        record
            .line(line)
            .map_err(|error| report(&ProgramError::from(error)))?;
    }
    let positions_by_line = record
        .breakpoint_candidates()
        .iter()
        .filter(|position| options.line.map_or(true, |line| position.line == line))
        .group_by(|position| position.line);
    let mut has_positions = false;
    for (line, positions) in &positions_by_line {
        has_positions = true;
        let columns = positions.map(|position| position.column).join(", ");
        println!(
            "{line:>4} {:<12} {}",
            format!("[{columns}]"),
            record.line(line).unwrap_or_default(),
        );
    }
    if !has_positions {
        println!("No breakpoint positions.");
    }
    Ok(())
}
