#![warn(clippy::nursery, clippy::pedantic, unused_crate_dependencies)]
#![allow(
    clippy::match_same_arms,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines
)]

pub use self::{
    breakpoint_collector::BreakPointCollector,
    breakpoints::{lock, Breakpoint, BreakpointStore, SharedBreakpointStore},
    commands::{
        parse_break_point, parse_index, parse_invocation, BreakPointRequest, Command, CropText,
        Invocation,
    },
    error::{CommandError, ProgramError, SourceError},
    resolver::find_nearest_break_point_position,
    script::LoadedScript,
    session::{
        render_location, run_to_completion, DebugSession, FinishedRun, Flow, Notice, PauseNotice,
        Reply,
    },
    source_index::SourceRecord,
    source_manager::SourceManager,
    step_controller::{ResumeAction, SessionEvent, StepController, StepState, Suspension},
};

mod breakpoint_collector;
mod breakpoints;
mod commands;
mod error;
mod resolver;
mod script;
mod session;
mod source_index;
mod source_manager;
mod step_controller;
