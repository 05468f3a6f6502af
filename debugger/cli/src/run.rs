use crate::{
    output::{print_lines, print_outcome},
    script::{report, ScriptOptions},
    Exit, ProgramResult,
};
use clap::Parser;
use scriptdbg_core::{run_to_completion, CropText};
use scriptdbg_engine::ExecutionOutcome;
use std::time::Instant;
use tracing::debug;

/// Run a script without stopping.
///
/// Once the script finishes, its global bindings are listed.
#[derive(Parser, Debug)]
pub(crate) struct Options {
    #[command(flatten)]
    pub script: ScriptOptions,
}

pub(crate) fn run(options: Options) -> ProgramResult {
    let script = options.script.load()?;

    debug!("Running {}.", script.source_id);
    let start = Instant::now();
    let run = run_to_completion(&script).map_err(|error| report(&error))?;
    debug!("The execution took {:?}.", start.elapsed());

    print_lines(
        &run.globals
            .iter()
            .map(|(name, value)| format!("{:<20} : {}", name.crop_end(20), value.render()))
            .collect::<Vec<_>>(),
    );
    print_outcome(&run.outcome);
    match run.outcome {
        ExecutionOutcome::Failed(_) => Err(Exit::ScriptFailed),
        ExecutionOutcome::Completed | ExecutionOutcome::Cancelled => Ok(()),
    }
}
