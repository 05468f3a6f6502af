#![warn(clippy::nursery, clippy::pedantic, unused_crate_dependencies)]
#![allow(
    clippy::match_same_arms,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines
)]

pub use self::{
    debug::{
        BreakLocation, BreakPointSet, CallFrame, Cancelled, DebugEvent, DebugHandler, DebugScope,
        Evaluate, EvaluationError, ExecutionControls, ExecutionOutcome, PauseReason, ScopeKind,
        StepMode,
    },
    environment::{AssignResult, Binding, Environment, EnvironmentKind},
    error::RuntimeError,
    machine::{Machine, MAX_ARRAY_LENGTH, MAX_CALL_DEPTH},
    value::{format_number, Closure, Value},
};

pub mod debug;
mod environment;
mod error;
mod machine;
mod value;
