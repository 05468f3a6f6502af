//! The hooks a debugger uses to observe and steer a [`Machine`].
//!
//! [`Machine`]: crate::Machine

use crate::{environment::Environment, error::RuntimeError, value::read, value::write, Value};
use rustc_hash::FxHashMap;
use scriptdbg_syntax::{ExpressionSyntaxError, Position, SourceId, SourceLocation};
use std::{
    fmt::{self, Display, Formatter},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
};
use strum::{Display, EnumIs};
use thiserror::Error;

/// Which check points the machine reports to the handler, relative to the
/// call depth at which the mode was chosen.
#[derive(Clone, Copy, Debug, Default, Display, EnumIs, Eq, Hash, PartialEq)]
pub enum StepMode {
    /// Only breakpoints and `debugger` statements.
    #[default]
    None,
    /// Every check point.
    Into,
    /// Check points in the same or an outer frame.
    Over,
    /// Check points in an outer frame, plus the return point of the current
    /// one.
    Out,
}

/// Returned by a handler to abort the execution.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[error("The execution was cancelled.")]
pub struct Cancelled;

pub trait DebugHandler {
    fn on_step(
        &mut self,
        event: DebugEvent,
        evaluator: &mut dyn Evaluate,
    ) -> Result<StepMode, Cancelled>;
    fn on_break(
        &mut self,
        event: DebugEvent,
        evaluator: &mut dyn Evaluate,
    ) -> Result<StepMode, Cancelled>;
    fn on_finished(&mut self, _outcome: &ExecutionOutcome) {}

    /// While this is true, the machine skips steps without taking a
    /// snapshot. Breakpoints, `debugger` statements and pause requests still
    /// notify.
    fn is_running(&self) -> bool {
        false
    }
}

/// Evaluates expressions in the paused execution context.
pub trait Evaluate {
    fn evaluate(&mut self, expression: &str) -> Result<Value, EvaluationError>;
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("The expression is invalid.")]
    Syntax(#[source] ExpressionSyntaxError),
    #[error("The expression failed to evaluate.")]
    Runtime(#[source] RuntimeError),
    #[error("The evaluation was cancelled.")]
    Cancelled,
}

#[derive(Clone, Debug)]
pub enum ExecutionOutcome {
    Completed,
    Failed(RuntimeError),
    Cancelled,
}
impl Display for ExecutionOutcome {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed(error) => write!(f, "failed: {error}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Clone, Copy, Debug, Display, EnumIs, Eq, PartialEq)]
pub enum PauseReason {
    Step,
    #[strum(serialize = "Breakpoint")]
    BreakPoint,
    #[strum(serialize = "Debugger statement")]
    DebuggerStatement,
}

/// A snapshot of the machine at a check point.
#[derive(Debug)]
pub struct DebugEvent {
    pub reason: PauseReason,
    pub location: SourceLocation,
    /// Innermost first.
    pub call_stack: Vec<CallFrame>,
    /// Innermost first.
    pub scope_chain: Vec<DebugScope>,
    pub break_point: Option<BreakLocation>,
    /// Set at the return point of a function.
    pub return_value: Option<Value>,
}
impl DebugEvent {
    #[must_use]
    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.call_stack.first()
    }
}

#[derive(Clone, Debug)]
pub struct CallFrame {
    pub function_name: String,
    pub location: SourceLocation,
    pub this: Value,
}

#[derive(Clone, Copy, Debug, Display, EnumIs, Eq, Hash, PartialEq)]
pub enum ScopeKind {
    /// The scope of the paused function (or of the global code).
    Local,
    Block,
    /// The scope of an enclosing function.
    Closure,
    Global,
}

#[derive(Clone, Debug)]
pub struct DebugScope {
    pub kind: ScopeKind,
    environment: Arc<Environment>,
}
impl DebugScope {
    #[must_use]
    pub(crate) const fn new(kind: ScopeKind, environment: Arc<Environment>) -> Self {
        Self { kind, environment }
    }

    #[must_use]
    pub fn binding_names(&self) -> Vec<String> {
        self.environment.binding_names()
    }
    #[must_use]
    pub fn binding_value(&self, name: &str) -> Option<Value> {
        self.environment.own_binding(name)
    }
}

/// The engine-side identity of a breakpoint.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BreakLocation {
    pub source_id: SourceId,
    pub position: Position,
}
impl BreakLocation {
    #[must_use]
    pub const fn new(source_id: SourceId, position: Position) -> Self {
        Self {
            source_id,
            position,
        }
    }
}
impl Display for BreakLocation {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} {}", self.source_id, self.position)
    }
}

/// The breakpoints the machine checks at every check point, each with an
/// optional condition.
///
/// Clones share the same set.
#[derive(Clone, Debug, Default)]
pub struct BreakPointSet(Arc<RwLock<FxHashMap<BreakLocation, Option<String>>>>);
impl BreakPointSet {
    pub fn insert(&self, location: BreakLocation, condition: Option<String>) {
        write(&self.0).insert(location, condition);
    }
    pub fn remove(&self, location: &BreakLocation) -> bool {
        write(&self.0).remove(location).is_some()
    }
    pub fn clear(&self) {
        write(&self.0).clear();
    }

    #[must_use]
    pub fn contains(&self, location: &BreakLocation) -> bool {
        read(&self.0).contains_key(location)
    }
    /// `None` if there's no breakpoint, `Some(None)` for an unconditional
    /// one.
    #[must_use]
    pub fn condition(&self, location: &BreakLocation) -> Option<Option<String>> {
        read(&self.0).get(location).cloned()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.0).len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        read(&self.0).is_empty()
    }
}

/// Flags the control side sets while the machine runs. The machine reads
/// them at every check point.
///
/// A pause request makes the next check point a step; the handler clears it.
#[derive(Clone, Debug, Default)]
pub struct ExecutionControls {
    cancelled: Arc<AtomicBool>,
    pause_requested: Arc<AtomicBool>,
}
impl ExecutionControls {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn request_pause(&self) {
        self.pause_requested.store(true, Ordering::SeqCst);
    }
    #[must_use]
    pub fn is_pause_requested(&self) -> bool {
        self.pause_requested.load(Ordering::SeqCst)
    }
    /// Clears the request and returns whether there was one.
    pub fn take_pause_request(&self) -> bool {
        self.pause_requested.swap(false, Ordering::SeqCst)
    }
}
