//! The execution side of the debugger: decides at every check point whether
//! to keep running or to hand a [`Suspension`] to the control side and wait.

use crate::breakpoints::{lock, SharedBreakpointStore};
use scriptdbg_engine::{
    Cancelled, DebugEvent, DebugHandler, Evaluate, EvaluationError, ExecutionControls,
    ExecutionOutcome, StepMode, Value,
};
use strum::{Display, EnumIs};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Display, EnumIs, Eq, PartialEq)]
pub enum StepState {
    Running,
    SteppingInto,
    SteppingOver,
    SteppingOut,
    Suspended,
    Cancelled,
    Done,
}

/// What the operator chose to do at a suspension.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ResumeAction {
    Continue,
    Into,
    Over,
    Out,
}
impl ResumeAction {
    #[must_use]
    pub const fn state(self) -> StepState {
        match self {
            Self::Continue => StepState::Running,
            Self::Into => StepState::SteppingInto,
            Self::Over => StepState::SteppingOver,
            Self::Out => StepState::SteppingOut,
        }
    }
    /// Running still steps into everything so that pause requests are
    /// noticed at the next check point.
    #[must_use]
    pub const fn step_mode(self) -> StepMode {
        match self {
            Self::Continue | Self::Into => StepMode::Into,
            Self::Over => StepMode::Over,
            Self::Out => StepMode::Out,
        }
    }
}

#[derive(Debug)]
pub enum SessionEvent {
    Suspended(Suspension),
    Finished(ExecutionOutcome),
}

/// The paused execution, owned by the control side.
///
/// Resuming consumes it. Dropping it cancels the execution.
#[derive(Debug)]
pub struct Suspension {
    event: DebugEvent,
    requests: mpsc::UnboundedSender<SuspensionRequest>,
}
#[derive(Debug)]
enum SuspensionRequest {
    Evaluate {
        expression: String,
        response: oneshot::Sender<Result<Value, EvaluationError>>,
    },
    Resume(ResumeAction),
}
impl Suspension {
    #[must_use]
    pub const fn event(&self) -> &DebugEvent {
        &self.event
    }

    /// Evaluates `expression` on the execution thread in the paused context.
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<Value, EvaluationError> {
        let (response, receiver) = oneshot::channel();
        let request = SuspensionRequest::Evaluate {
            expression: expression.into(),
            response,
        };
        if self.requests.send(request).is_err() {
            return Err(EvaluationError::Cancelled);
        }
        receiver.await.unwrap_or(Err(EvaluationError::Cancelled))
    }

    pub fn resume(self, action: ResumeAction) {
        debug!("Resuming with {action}.");
        let _ = self.requests.send(SuspensionRequest::Resume(action));
    }
}

/// Receives the engine's notifications on the execution thread.
pub struct StepController {
    state: StepState,
    breakpoints: SharedBreakpointStore,
    controls: ExecutionControls,
    events: mpsc::UnboundedSender<SessionEvent>,
}
impl StepController {
    #[must_use]
    pub const fn new(
        initial_state: StepState,
        breakpoints: SharedBreakpointStore,
        controls: ExecutionControls,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            state: initial_state,
            breakpoints,
            controls,
            events,
        }
    }

    #[must_use]
    pub const fn state(&self) -> StepState {
        self.state
    }

    fn check_cancellation(&mut self) -> Result<(), Cancelled> {
        if self.controls.is_cancelled() {
            self.state = StepState::Cancelled;
            return Err(Cancelled);
        }
        Ok(())
    }

    /// Blocks the execution thread until the control side resumes.
    fn suspend(
        &mut self,
        event: DebugEvent,
        evaluator: &mut dyn Evaluate,
    ) -> Result<StepMode, Cancelled> {
        self.controls.take_pause_request();
        let previous_state = self.state;
        self.state = StepState::Suspended;
        debug!(
            "Suspending at {} ({}) after {previous_state}.",
            event.location, event.reason,
        );

        let (requests, mut receiver) = mpsc::unbounded_channel();
        let suspension = Suspension { event, requests };
        if self
            .events
            .send(SessionEvent::Suspended(suspension))
            .is_err()
        {
            warn!("Nobody controls the execution anymore.");
            self.state = StepState::Cancelled;
            return Err(Cancelled);
        }

        while let Some(request) = receiver.blocking_recv() {
            match request {
                SuspensionRequest::Evaluate {
                    expression,
                    response,
                } => {
                    let result = evaluator.evaluate(&expression);
                    let _ = response.send(result);
                }
                SuspensionRequest::Resume(action) => {
                    self.state = action.state();
                    self.check_cancellation()?;
                    return Ok(action.step_mode());
                }
            }
        }

        debug!("The suspension was dropped.");
        self.state = StepState::Cancelled;
        Err(Cancelled)
    }
}
impl DebugHandler for StepController {
    fn on_step(
        &mut self,
        event: DebugEvent,
        evaluator: &mut dyn Evaluate,
    ) -> Result<StepMode, Cancelled> {
        self.check_cancellation()?;
        if self.state.is_running() && !self.controls.is_pause_requested() {
            return Ok(StepMode::Into);
        }
        self.suspend(event, evaluator)
    }

    fn on_break(
        &mut self,
        event: DebugEvent,
        evaluator: &mut dyn Evaluate,
    ) -> Result<StepMode, Cancelled> {
        self.check_cancellation()?;
        if let Some(location) = &event.break_point {
            let mut breakpoints = lock(&self.breakpoints);
            if breakpoints.get(location).is_some_and(|it| it.temporary) {
                breakpoints.remove_at(&location.source_id, location.position);
            }
        }
        self.suspend(event, evaluator)
    }

    fn is_running(&self) -> bool {
        self.state.is_running()
    }

    fn on_finished(&mut self, outcome: &ExecutionOutcome) {
        info!("The execution {outcome}.");
        self.state = if matches!(outcome, ExecutionOutcome::Cancelled) {
            StepState::Cancelled
        } else {
            StepState::Done
        };
        let _ = self.events.send(SessionEvent::Finished(outcome.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoints::{Breakpoint, BreakpointStore};
    use scriptdbg_engine::{BreakLocation, BreakPointSet, CallFrame, PauseReason};
    use scriptdbg_syntax::{Location, Position, SourceLocation};
    use std::thread;

    struct Echo;
    impl Evaluate for Echo {
        fn evaluate(&mut self, expression: &str) -> Result<Value, EvaluationError> {
            Ok(Value::from(expression))
        }
    }

    fn event(reason: PauseReason, break_point: Option<BreakLocation>) -> DebugEvent {
        let location = SourceLocation::new("main.js".into(), Location::at(Position::new(3, 2)));
        DebugEvent {
            reason,
            location: location.clone(),
            call_stack: vec![CallFrame {
                function_name: "(anonymous)".to_string(),
                location,
                this: Value::Undefined,
            }],
            scope_chain: vec![],
            break_point,
            return_value: None,
        }
    }

    fn controller(
        state: StepState,
    ) -> (
        StepController,
        SharedBreakpointStore,
        ExecutionControls,
        mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        let breakpoints = BreakpointStore::shared(BreakPointSet::default());
        let controls = ExecutionControls::default();
        let (sender, receiver) = mpsc::unbounded_channel();
        let controller = StepController::new(state, breakpoints.clone(), controls.clone(), sender);
        (controller, breakpoints, controls, receiver)
    }

    #[test]
    fn running_does_not_suspend() {
        let (mut controller, _, _, mut events) = controller(StepState::Running);
        assert!(controller.is_running());
        let mode = controller.on_step(event(PauseReason::Step, None), &mut Echo);
        assert_eq!(mode, Ok(StepMode::Into));
        assert!(events.try_recv().is_err());
        assert!(controller.state().is_running());
    }

    #[test]
    fn cancellation_is_checked_first() {
        let (mut controller, _, controls, mut events) = controller(StepState::SteppingInto);
        controls.cancel();
        assert_eq!(
            controller.on_break(event(PauseReason::DebuggerStatement, None), &mut Echo),
            Err(Cancelled),
        );
        assert!(events.try_recv().is_err());
        assert!(controller.state().is_cancelled());
    }

    #[test]
    fn dropped_control_side_cancels() {
        let (mut controller, _, _, events) = controller(StepState::SteppingInto);
        drop(events);
        assert_eq!(
            controller.on_step(event(PauseReason::Step, None), &mut Echo),
            Err(Cancelled),
        );
    }

    #[tokio::test]
    async fn suspension_serves_evaluations_until_resumed() {
        let (mut controller, breakpoints, _, mut events) = controller(StepState::Running);
        let location = BreakLocation::new("main.js".into(), Position::new(3, 2));
        lock(&breakpoints).set(Breakpoint {
            source_id: location.source_id.clone(),
            position: location.position,
            condition: None,
            temporary: true,
        });

        let execution = thread::spawn(move || {
            let mode = controller.on_break(event(PauseReason::BreakPoint, Some(location)), &mut Echo);
            (mode, controller.state())
        });

        let Some(SessionEvent::Suspended(suspension)) = events.recv().await else {
            panic!("Expected a suspension.");
        };
        assert_eq!(suspension.event().reason, PauseReason::BreakPoint);
        assert!(lock(&breakpoints).is_empty());
        assert_eq!(
            suspension.evaluate("1 + 1").await.unwrap().to_js_string(),
            "1 + 1",
        );
        suspension.resume(ResumeAction::Over);

        let (mode, state) = execution.join().unwrap();
        assert_eq!(mode, Ok(StepMode::Over));
        assert_eq!(state, StepState::SteppingOver);
    }

    #[tokio::test]
    async fn dropping_the_suspension_cancels() {
        let (mut controller, _, _, mut events) = controller(StepState::SteppingInto);
        let execution = thread::spawn(move || {
            controller.on_step(event(PauseReason::Step, None), &mut Echo)
        });
        let Some(SessionEvent::Suspended(suspension)) = events.recv().await else {
            panic!("Expected a suspension.");
        };
        drop(suspension);
        assert_eq!(execution.join().unwrap(), Err(Cancelled));
    }

    #[test]
    fn resume_actions() {
        assert_eq!(ResumeAction::Continue.step_mode(), StepMode::Into);
        assert!(ResumeAction::Continue.state().is_running());
        assert_eq!(ResumeAction::Out.step_mode(), StepMode::Out);
        assert_eq!(ResumeAction::Over.state(), StepState::SteppingOver);
    }
}
