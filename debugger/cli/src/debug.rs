use crate::{
    output::{print_banner, print_error, print_lines, print_outcome, print_pause, print_prompt},
    script::{report, ScriptOptions},
    ProgramResult,
};
use clap::Parser;
use scriptdbg_core::{CommandError, DebugSession, Flow, Notice};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{debug, error};

/// Debug a script interactively.
///
/// The script pauses at its first statement. Type `help` at the prompt for
/// the available commands.
#[derive(Parser, Debug)]
pub(crate) struct Options {
    #[command(flatten)]
    pub script: ScriptOptions,

    /// Start running right away instead of pausing at the first statement.
    #[arg(long)]
    run: bool,
}

pub(crate) async fn debug(options: Options) -> ProgramResult {
    let script = options.script.load()?;
    print_banner();
    let mut session = DebugSession::launch(script, options.run).map_err(|error| report(&error))?;
    if options.run {
        print_prompt();
    }

    let mut input = BufReader::new(io::stdin()).lines();
    loop {
        tokio::select! {
            notice = session.next_notice() => {
                match notice.map_err(|error| report(&error))? {
                    Some(Notice::Paused(notice)) => {
                        print_pause(&notice);
                        print_prompt();
                    }
                    Some(Notice::Finished(outcome)) => {
                        print_outcome(&outcome);
                        break;
                    }
                    None => break,
                }
            }
            line = input.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        debug!("The input ended.");
                        break;
                    }
                    Err(io_error) => {
                        error!("Reading the input failed: {io_error}");
                        break;
                    }
                };
                match session.execute(&line).await {
                    Ok(reply) => {
                        print_lines(&reply.lines);
                        match reply.flow {
                            Flow::Stay => print_prompt(),
                            Flow::Resumed => {}
                            Flow::Exit => break,
                        }
                    }
                    Err(CommandError::Fatal(program_error)) => {
                        return Err(report(&program_error));
                    }
                    Err(command_error) => {
                        print_error(&command_error);
                        print_prompt();
                    }
                }
            }
        }
    }

    session.shut_down().map_err(|error| report(&error))
}
