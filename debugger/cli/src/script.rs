use crate::Exit;
use clap::{Args, ValueHint};
use scriptdbg_core::{LoadedScript, ProgramError};
use std::path::PathBuf;
use tracing::error;

#[derive(Args, Debug)]
pub(crate) struct ScriptOptions {
    /// The script to load.
    #[arg(value_hint = ValueHint::FilePath)]
    pub path: PathBuf,

    /// The ESTree JSON syntax tree of the script (with locations). Defaults
    /// to a `.json` file next to the script.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub ast: Option<PathBuf>,

    /// Log what the debugger does internally.
    #[arg(long, short)]
    pub verbose: bool,
}
impl ScriptOptions {
    pub fn load(&self) -> Result<LoadedScript, Exit> {
        LoadedScript::load_with_estree_json(&self.path, self.ast.as_deref())
            .map_err(|error| report(&error))
    }
}

/// Logs `error` and picks the matching exit.
pub fn report(error: &ProgramError) -> Exit {
    error!("{error}");
    match error {
        ProgramError::ScriptNotReadable { .. } => Exit::FileNotFound,
        ProgramError::Syntax(_) => Exit::InvalidSyntaxTree,
        ProgramError::Source(_) => Exit::LineOutOfRange,
        ProgramError::UnknownSource(_)
        | ProgramError::LocationWithoutSource
        | ProgramError::ExecutionThread(_) => Exit::DebuggerFailed,
    }
}
