use scriptdbg_syntax::{SourceId, SyntaxError};
use std::{io, path::PathBuf};
use thiserror::Error;

/// Problems with a loaded script's source or its breakpoint positions.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SourceError {
    #[error("Line {line} is out of range (the script has {line_count} lines).")]
    LineOutOfRange { line: usize, line_count: usize },

    #[error("{source_id} contains no positions to break at.")]
    NoBreakpointPositions { source_id: SourceId },
}

/// An operator command failed. Apart from [`CommandError::Fatal`], the
/// session stays usable.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("{0}")]
    MissingArgument(&'static str),

    #[error("{0}")]
    InvalidNumber(&'static str),

    #[error("Index {index} out of range ({range})")]
    IndexOutOfRange { index: i64, range: String },

    #[error("The script is not paused.")]
    NotPaused,

    #[error("{0}")]
    Evaluation(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    /// The debugger's own state is broken, so the session has to end.
    #[error(transparent)]
    Fatal(#[from] ProgramError),
}
impl CommandError {
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }


    /// The range text lists valid indexes for a list of `count` entries.
    #[must_use]
    pub fn index_out_of_range(index: i64, count: usize) -> Self {
        let range = match count {
            0 => "no entries in list".to_string(),
            1 => "0".to_string(),
            count => format!("0 - {count}"),
        };
        Self::IndexOutOfRange { index, range }
    }
}

/// The debugger can't continue.
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("Script could not be read: {path}: {error}")]
    ScriptNotReadable {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("Script with source ID '{0}' was not found.")]
    UnknownSource(SourceId),

    #[error("Location included no source ID")]
    LocationWithoutSource,

    #[error("The execution thread could not be started.")]
    ExecutionThread(#[source] io::Error),

    #[error(transparent)]
    Source(#[from] SourceError),
}
