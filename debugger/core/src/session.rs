//! The control side of the debugger. A [`DebugSession`] owns the execution
//! thread, turns its suspensions into [`Notice`]s and executes operator
//! commands against the paused state.

use crate::{
    breakpoints::{lock, Breakpoint, BreakpointStore, SharedBreakpointStore},
    commands::{parse_break_point, parse_index, parse_invocation, Command, CropText, Invocation},
    error::{CommandError, ProgramError},
    script::LoadedScript,
    source_manager::SourceManager,
    step_controller::{ResumeAction, SessionEvent, StepController, StepState, Suspension},
};
use scriptdbg_engine::{
    BreakPointSet, ExecutionControls, ExecutionOutcome, Machine, PauseReason, ScopeKind, StepMode,
    Value,
};
use scriptdbg_syntax::{Position, SourceId, SourceLocation};
use std::{
    error::Error as _,
    io,
    thread::{self, JoinHandle},
};
use strum::IntoEnumIterator;
use tokio::sync::mpsc;
use tracing::{debug, info};

const EXECUTION_THREAD_NAME: &str = "scriptdbg-execution";
/// Calls nest deeply on the execution thread.
const EXECUTION_STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug)]
pub enum Notice {
    Paused(PauseNotice),
    Finished(ExecutionOutcome),
}
#[derive(Clone, Debug)]
pub struct PauseNotice {
    pub reason: PauseReason,
    pub location: SourceLocation,
    /// The source line containing the location.
    pub line: String,
}

/// What a command printed and what the front end should do next.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub flow: Flow,
}
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Flow {
    #[default]
    Stay,
    /// The execution continues; the next notice will tell where it stops.
    Resumed,
    Exit,
}
impl Reply {
    fn message(line: impl Into<String>) -> Self {
        Self::lines(vec![line.into()])
    }
    const fn lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            flow: Flow::Stay,
        }
    }
    const fn flow(flow: Flow) -> Self {
        Self {
            lines: vec![],
            flow,
        }
    }
}

pub struct DebugSession {
    main_source: SourceId,
    sources: SourceManager,
    breakpoints: SharedBreakpointStore,
    controls: ExecutionControls,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    suspension: Option<Suspension>,
    outcome: Option<ExecutionOutcome>,
    execution: Option<JoinHandle<()>>,
}
impl DebugSession {
    /// Starts executing `script` on its own thread. Unless `start_running`
    /// is set, it pauses at the first check point.
    pub fn launch(script: LoadedScript, start_running: bool) -> Result<Self, ProgramError> {
        let mut sources = SourceManager::default();
        sources.load(script.source_id.clone(), script.text, &script.program);

        let engine_break_points = BreakPointSet::default();
        let breakpoints = BreakpointStore::shared(engine_break_points.clone());
        let controls = ExecutionControls::default();
        let (sender, events) = mpsc::unbounded_channel();

        let initial_state = if start_running {
            StepState::Running
        } else {
            StepState::SteppingInto
        };
        let mut controller =
            StepController::new(initial_state, breakpoints.clone(), controls.clone(), sender);
        let source_id = script.source_id.clone();
        let program = script.program;
        let machine_controls = controls.clone();
        let execution = spawn_execution(move || {
            Machine::new(source_id, program)
                .with_debugger(
                    &mut controller,
                    engine_break_points,
                    machine_controls,
                    StepMode::Into,
                )
                .run();
        })?;
        info!("Launched {} ({initial_state}).", script.source_id);

        Ok(Self {
            main_source: script.source_id,
            sources,
            breakpoints,
            controls,
            events,
            suspension: None,
            outcome: None,
            execution: Some(execution),
        })
    }

    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.suspension.is_some()
    }
    #[must_use]
    pub const fn outcome(&self) -> Option<&ExecutionOutcome> {
        self.outcome.as_ref()
    }

    /// Waits for the execution to pause or finish. `None` once the execution
    /// thread is gone.
    pub async fn next_notice(&mut self) -> Result<Option<Notice>, ProgramError> {
        let Some(event) = self.events.recv().await else {
            return Ok(None);
        };
        match event {
            SessionEvent::Suspended(suspension) => {
                let event = suspension.event();
                let notice = PauseNotice {
                    reason: event.reason,
                    location: event.location.clone(),
                    line: self.sources.line(&event.location)?.to_string(),
                };
                self.suspension = Some(suspension);
                Ok(Some(Notice::Paused(notice)))
            }
            SessionEvent::Finished(outcome) => {
                self.suspension = None;
                self.outcome = Some(outcome.clone());
                Ok(Some(Notice::Finished(outcome)))
            }
        }
    }

    pub async fn execute(&mut self, line: &str) -> Result<Reply, CommandError> {
        let Some(Invocation { command, arguments }) = parse_invocation(line)? else {
            return Ok(Reply::default());
        };
        debug!("Executing `{}` with arguments `{arguments}`.", command.name());
        match command {
            Command::Continue => self.resume(ResumeAction::Continue),
            Command::Into => self.resume(ResumeAction::Into),
            Command::Over => self.resume(ResumeAction::Over),
            Command::Out => self.resume(ResumeAction::Out),
            Command::Pause => Ok(self.pause()),
            Command::Break => self.set_break_point(arguments, false),
            Command::TemporaryBreak => self.set_break_point(arguments, true),
            Command::Delete => {
                let mut breakpoints = lock(&self.breakpoints);
                let index = parse_index(arguments, breakpoints.len())?;
                breakpoints.remove_by_index(index)?;
                Ok(Reply::message("Removed breakpoint"))
            }
            Command::Clear => {
                lock(&self.breakpoints).clear();
                Ok(Reply::message("All breakpoints cleared."))
            }
            Command::Breaks => Ok(self.list_break_points()),
            Command::Stack => self.stack(),
            Command::Scopes => self.scopes(),
            Command::Scope => self.scope(arguments),
            Command::Eval => self.evaluate(arguments).await,
            Command::Help => Ok(Reply::lines(
                Command::iter().map(Command::help_line).collect(),
            )),
            Command::Exit => Ok(self.exit()),
        }
    }

    fn paused(&self) -> Result<&Suspension, CommandError> {
        self.suspension.as_ref().ok_or(CommandError::NotPaused)
    }

    fn resume(&mut self, action: ResumeAction) -> Result<Reply, CommandError> {
        let suspension = self.suspension.take().ok_or(CommandError::NotPaused)?;
        suspension.resume(action);
        Ok(Reply::flow(Flow::Resumed))
    }

    fn pause(&self) -> Reply {
        if self.outcome.is_some() {
            return Reply::message("Execution reached end of script.");
        }
        if self.is_paused() {
            return Reply::message("The script is already paused.");
        }
        self.controls.request_pause();
        Reply::message("Pausing at the next statement.")
    }

    /// Breakpoints go into the paused script, or into the main one while the
    /// execution runs.
    fn set_break_point(&self, arguments: &str, temporary: bool) -> Result<Reply, CommandError> {
        let request = parse_break_point(arguments)?;
        let source_id = self.suspension.as_ref().map_or_else(
            || self.main_source.clone(),
            |it| it.event().location.source_id.clone(),
        );
        let position = self
            .sources
            .get(&source_id)?
            .find_nearest_break_point_position(request.position)?;
        lock(&self.breakpoints).set(Breakpoint {
            source_id,
            position,
            condition: request.condition,
            temporary,
        });
        Ok(Reply::message(if temporary {
            format!("Added temporary breakpoint at {position}")
        } else {
            format!("Added breakpoint at {position}")
        }))
    }

    fn list_break_points(&self) -> Reply {
        let breakpoints = lock(&self.breakpoints);
        if breakpoints.is_empty() {
            return Reply::message("No breakpoints set.");
        }
        Reply::lines(
            breakpoints
                .iter()
                .enumerate()
                .map(|(index, breakpoint)| {
                    let flags = if breakpoint.temporary { "T" } else { " " };
                    format!(
                        "{index:<4} {flags}  {}  {}",
                        render_location(&breakpoint.source_id, breakpoint.position),
                        breakpoint.condition.as_deref().unwrap_or_default(),
                    )
                    .trim_end()
                    .to_string()
                })
                .collect(),
        )
    }

    fn stack(&self) -> Result<Reply, CommandError> {
        let event = self.paused()?.event();
        Ok(Reply::lines(
            event
                .call_stack
                .iter()
                .enumerate()
                .map(|(index, frame)| {
                    format!(
                        "{index:<4} {:<40}  {}",
                        frame.function_name,
                        render_location(&frame.location.source_id, frame.location.start()),
                    )
                })
                .collect(),
        ))
    }

    fn scopes(&self) -> Result<Reply, CommandError> {
        let event = self.paused()?.event();
        Ok(Reply::lines(
            event
                .scope_chain
                .iter()
                .enumerate()
                .map(|(index, scope)| format!("{index:<4} {}", scope.kind))
                .collect(),
        ))
    }

    fn scope(&self, arguments: &str) -> Result<Reply, CommandError> {
        let event = self.paused()?.event();
        let index = parse_index(arguments, event.scope_chain.len())?;
        let scope = &event.scope_chain[index];

        let mut lines = vec![format!("{} scope:", scope.kind)];
        if scope.kind == ScopeKind::Local {
            if let Some(value) = &event.return_value {
                lines.push(render_binding("return value", value));
            }
            if let Some(frame) = event.current_frame() {
                if !matches!(frame.this, Value::Undefined) {
                    lines.push(render_binding("this", &frame.this));
                }
            }
        }
        for name in scope.binding_names() {
            let value = scope.binding_value(&name).unwrap_or_default();
            lines.push(render_binding(&name, &value));
        }
        Ok(Reply::lines(lines))
    }

    async fn evaluate(&self, expression: &str) -> Result<Reply, CommandError> {
        if expression.is_empty() {
            return Err(CommandError::MissingArgument("No expression to evaluate."));
        }
        let suspension = self.paused()?;
        match suspension.evaluate(expression).await {
            Ok(value) => Ok(Reply::lines(render_value(&value))),
            Err(error) => Err(CommandError::Evaluation(
                error
                    .source()
                    .map_or_else(|| error.to_string(), ToString::to_string),
            )),
        }
    }

    fn exit(&mut self) -> Reply {
        info!("Exiting the debugger.");
        self.controls.cancel();
        self.suspension = None;
        Reply::flow(Flow::Exit)
    }

    /// Cancels the execution if it's still going and waits for its thread.
    pub fn shut_down(mut self) -> Result<(), ProgramError> {
        self.controls.cancel();
        self.suspension = None;
        let Some(execution) = self.execution.take() else {
            return Ok(());
        };
        execution.join().map_err(|_| execution_panicked())
    }
}
impl Drop for DebugSession {
    fn drop(&mut self) {
        self.controls.cancel();
        self.suspension = None;
    }
}

#[derive(Debug)]
pub struct FinishedRun {
    pub outcome: ExecutionOutcome,
    /// The global bindings at the end, in declaration order.
    pub globals: Vec<(String, Value)>,
}

/// Executes `script` without a debugger attached.
pub fn run_to_completion(script: &LoadedScript) -> Result<FinishedRun, ProgramError> {
    let source_id = script.source_id.clone();
    let program = script.program.clone();
    let execution = spawn_execution(move || {
        let mut machine = Machine::new(source_id, program);
        let outcome = machine.run();
        FinishedRun {
            outcome,
            globals: machine.globals(),
        }
    })?;
    execution.join().map_err(|_| execution_panicked())
}

fn spawn_execution<T: Send + 'static>(
    body: impl FnOnce() -> T + Send + 'static,
) -> Result<JoinHandle<T>, ProgramError> {
    thread::Builder::new()
        .name(EXECUTION_THREAD_NAME.to_string())
        .stack_size(EXECUTION_STACK_SIZE)
        .spawn(body)
        .map_err(ProgramError::ExecutionThread)
}
fn execution_panicked() -> ProgramError {
    ProgramError::ExecutionThread(io::Error::other("The execution thread panicked."))
}

/// `<source> <line>:<column>` with the source cropped to a fixed width.
#[must_use]
pub fn render_location(source_id: &SourceId, position: Position) -> String {
    format!(
        "{:<20} {:>4}:{:>4}",
        source_id.as_str().crop_start(20),
        position.line,
        position.column,
    )
}

fn render_binding(name: &str, value: &Value) -> String {
    format!("{:<20} : {}", name.crop_end(20), value.render().crop_end(55))
}

/// Objects are listed property by property.
fn render_value(value: &Value) -> Vec<String> {
    match value.properties() {
        Some(properties) if !properties.is_empty() => properties
            .iter()
            .map(|(name, value)| render_binding(name, value))
            .collect(),
        _ => vec![value.render()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptdbg_syntax::fixtures;

    fn function_calls() -> LoadedScript {
        LoadedScript::new(
            "main.js".into(),
            fixtures::FUNCTION_CALLS,
            fixtures::function_calls(),
        )
    }
    fn accumulate() -> LoadedScript {
        LoadedScript::new("main.js".into(), fixtures::ACCUMULATE, fixtures::accumulate())
    }

    async fn expect_pause(session: &mut DebugSession) -> PauseNotice {
        match session.next_notice().await.unwrap() {
            Some(Notice::Paused(notice)) => notice,
            other => panic!("Expected a pause, got {other:?}."),
        }
    }
    async fn expect_finish(session: &mut DebugSession) -> ExecutionOutcome {
        match session.next_notice().await.unwrap() {
            Some(Notice::Finished(outcome)) => outcome,
            other => panic!("Expected the execution to finish, got {other:?}."),
        }
    }
    async fn lines(session: &mut DebugSession, command: &str) -> Vec<String> {
        session.execute(command).await.unwrap().lines
    }

    #[tokio::test]
    async fn pauses_at_the_first_statement() {
        let mut session = DebugSession::launch(function_calls(), false).unwrap();
        let notice = expect_pause(&mut session).await;
        assert_eq!(notice.reason, PauseReason::Step);
        assert_eq!(notice.location.start(), Position::new(1, 0));
        assert_eq!(notice.line, "function add(a, b) {");
        session.shut_down().unwrap();
    }

    #[tokio::test]
    async fn break_points_are_moved_and_hit_once() {
        let mut session = DebugSession::launch(function_calls(), false).unwrap();
        expect_pause(&mut session).await;

        assert_eq!(
            lines(&mut session, "break 100").await,
            vec!["Added breakpoint at 5:0"],
        );
        let breaks = lines(&mut session, "breaks").await;
        assert_eq!(breaks.len(), 1);
        assert!(breaks[0].starts_with("0       main.js"));
        assert!(breaks[0].ends_with("5:   0"));

        assert_eq!(
            session.execute("continue").await.unwrap().flow,
            Flow::Resumed,
        );
        let notice = expect_pause(&mut session).await;
        assert_eq!(notice.reason, PauseReason::BreakPoint);
        assert_eq!(notice.location.start(), Position::new(5, 0));

        session.execute("c").await.unwrap();
        assert!(matches!(
            expect_finish(&mut session).await,
            ExecutionOutcome::Completed,
        ));
        assert!(session.next_notice().await.unwrap().is_none());
        session.shut_down().unwrap();
    }

    #[tokio::test]
    async fn temporary_break_points_vanish_after_a_hit() {
        let mut session = DebugSession::launch(accumulate(), false).unwrap();
        expect_pause(&mut session).await;
        assert_eq!(
            lines(&mut session, "tbreak 3").await,
            vec!["Added temporary breakpoint at 3:2"],
        );
        assert!(lines(&mut session, "breaks").await[0].contains(" T  "));

        session.execute("continue").await.unwrap();
        assert_eq!(
            expect_pause(&mut session).await.location.start(),
            Position::new(3, 2),
        );
        assert_eq!(lines(&mut session, "breaks").await, vec!["No breakpoints set."]);
        session.execute("continue").await.unwrap();
        assert!(matches!(
            expect_finish(&mut session).await,
            ExecutionOutcome::Completed,
        ));
    }

    #[tokio::test]
    async fn permanent_break_points_stop_every_iteration() {
        let mut session = DebugSession::launch(accumulate(), false).unwrap();
        expect_pause(&mut session).await;
        session.execute("break 3").await.unwrap();
        for expected_total in ["0", "0", "1"] {
            session.execute("continue").await.unwrap();
            expect_pause(&mut session).await;
            assert_eq!(lines(&mut session, "eval total").await, vec![expected_total]);
        }
        session.execute("continue").await.unwrap();
        assert!(matches!(
            expect_finish(&mut session).await,
            ExecutionOutcome::Completed,
        ));
    }

    #[tokio::test]
    async fn conditional_break_points() {
        let mut session = DebugSession::launch(accumulate(), false).unwrap();
        expect_pause(&mut session).await;
        session.execute("break 3 if i == 2").await.unwrap();
        assert!(lines(&mut session, "breaks").await[0].ends_with("i == 2"));

        session.execute("continue").await.unwrap();
        expect_pause(&mut session).await;
        assert_eq!(lines(&mut session, "! i").await, vec!["2"]);
        assert_eq!(lines(&mut session, "! total").await, vec!["1"]);
        session.execute("continue").await.unwrap();
        expect_finish(&mut session).await;
    }

    #[tokio::test]
    async fn stepping_over_and_into() {
        let mut session = DebugSession::launch(function_calls(), false).unwrap();
        expect_pause(&mut session).await;

        session.execute("over").await.unwrap();
        assert_eq!(
            expect_pause(&mut session).await.location.start(),
            Position::new(4, 0),
        );
        session.execute("into").await.unwrap();
        let notice = expect_pause(&mut session).await;
        assert_eq!(notice.location.start(), Position::new(2, 2));
        assert_eq!(notice.line, "  return a + b;");

        let stack = lines(&mut session, "stack").await;
        assert_eq!(stack.len(), 2);
        assert!(stack[0].starts_with("0    add "));
        assert!(stack[0].ends_with("2:   2"));
        assert!(stack[1].starts_with("1    (anonymous) "));
        assert!(stack[1].ends_with("4:   8"));

        session.execute("out").await.unwrap();
        assert_eq!(
            expect_pause(&mut session).await.location.start(),
            Position::new(3, 1),
        );
        session.execute("over").await.unwrap();
        assert_eq!(
            expect_pause(&mut session).await.location.start(),
            Position::new(5, 0),
        );
        session.execute("over").await.unwrap();
        expect_finish(&mut session).await;
    }

    #[tokio::test]
    async fn scopes_and_evaluation() {
        let mut session = DebugSession::launch(function_calls(), false).unwrap();
        expect_pause(&mut session).await;
        session.execute("over").await.unwrap();
        expect_pause(&mut session).await;
        session.execute("into").await.unwrap();
        expect_pause(&mut session).await;

        assert_eq!(
            lines(&mut session, "scopes").await,
            vec!["0    Local", "1    Global"],
        );
        let local = lines(&mut session, "scope 0").await;
        assert_eq!(local[0], "Local scope:");
        assert!(local[1].starts_with("a "));
        assert!(local[1].ends_with(" : 1"));
        assert!(local[2].starts_with("b "));
        assert!(local[2].ends_with(" : 2"));

        assert_eq!(lines(&mut session, "eval a + b").await, vec!["3"]);
        assert_eq!(
            session
                .execute("eval missing")
                .await
                .unwrap_err()
                .to_string(),
            "ReferenceError: missing is not defined",
        );
        assert_eq!(
            session.execute("eval").await.unwrap_err().to_string(),
            "No expression to evaluate.",
        );
        assert_eq!(
            session.execute("scope 2").await.unwrap_err().to_string(),
            "Index 2 out of range (0 - 2)",
        );

        session.execute("out").await.unwrap();
        expect_pause(&mut session).await;
        let local = lines(&mut session, "scope 0").await;
        assert!(local[1].starts_with("return value "));
        assert!(local[1].ends_with(" : 3"));
        session.shut_down().unwrap();
    }

    #[tokio::test]
    async fn method_calls_show_their_receiver() {
        let script = LoadedScript::new(
            "main.js".into(),
            fixtures::METHOD_CALL,
            fixtures::method_call(),
        );
        let mut session = DebugSession::launch(script, false).unwrap();
        expect_pause(&mut session).await;
        session.execute("into").await.unwrap();
        assert_eq!(
            expect_pause(&mut session).await.location.start(),
            Position::new(4, 0),
        );
        session.execute("into").await.unwrap();
        assert_eq!(
            expect_pause(&mut session).await.location.start(),
            Position::new(2, 2),
        );

        let stack = lines(&mut session, "stack").await;
        assert!(stack[0].starts_with("0    read "));
        let local = lines(&mut session, "scope 0").await;
        assert_eq!(local[0], "Local scope:");
        assert!(local[1].starts_with("this "));
        assert!(local[1].ends_with(" : { count: 1, read: function read() }"));
        assert_eq!(lines(&mut session, "eval this.count").await, vec!["1"]);

        let global = lines(&mut session, "scope 1").await;
        assert!(global.iter().all(|line| !line.starts_with("this ")));
        session.shut_down().unwrap();
    }

    #[tokio::test]
    async fn commands_that_need_a_pause() {
        let mut session = DebugSession::launch(function_calls(), true).unwrap();
        assert!(matches!(
            expect_finish(&mut session).await,
            ExecutionOutcome::Completed,
        ));
        for command in ["stack", "scopes", "scope 0", "eval 1", "continue", "over"] {
            assert!(matches!(
                session.execute(command).await,
                Err(CommandError::NotPaused),
            ));
        }
        assert_eq!(
            lines(&mut session, "pause").await,
            vec!["Execution reached end of script."],
        );
    }

    #[tokio::test]
    async fn break_point_list_maintenance() {
        let mut session = DebugSession::launch(function_calls(), false).unwrap();
        expect_pause(&mut session).await;
        assert_eq!(
            session.execute("delete 0").await.unwrap_err().to_string(),
            "Index 0 out of range (no entries in list)",
        );
        session.execute("b 2").await.unwrap();
        session.execute("b 4").await.unwrap();
        assert_eq!(lines(&mut session, "delete 0").await, vec!["Removed breakpoint"]);
        let breaks = lines(&mut session, "breaks").await;
        assert_eq!(breaks.len(), 1);
        assert!(breaks[0].ends_with("4:   0"));
        assert_eq!(lines(&mut session, "clear").await, vec!["All breakpoints cleared."]);
        assert_eq!(lines(&mut session, "breaks").await, vec!["No breakpoints set."]);

        assert!(matches!(
            session.execute("jump").await,
            Err(CommandError::UnknownCommand(_)),
        ));
        assert_eq!(session.execute("  ").await.unwrap(), Reply::default());
        assert_eq!(
            lines(&mut session, "help").await.len(),
            Command::iter().count(),
        );
        session.shut_down().unwrap();
    }

    #[tokio::test]
    async fn pausing_and_exiting_an_endless_loop() {
        let script = LoadedScript::new(
            "main.js".into(),
            fixtures::INFINITE_LOOP,
            fixtures::infinite_loop(),
        );
        let mut session = DebugSession::launch(script, true).unwrap();
        assert!(matches!(
            session.execute("stack").await,
            Err(CommandError::NotPaused),
        ));
        assert_eq!(
            lines(&mut session, "pause").await,
            vec!["Pausing at the next statement."],
        );
        let notice = expect_pause(&mut session).await;
        assert_eq!(notice.reason, PauseReason::Step);
        assert_eq!(
            lines(&mut session, "pause").await,
            vec!["The script is already paused."],
        );

        assert_eq!(session.execute("exit").await.unwrap().flow, Flow::Exit);
        assert!(matches!(
            expect_finish(&mut session).await,
            ExecutionOutcome::Cancelled,
        ));
        session.shut_down().unwrap();
    }

    #[test]
    fn running_without_a_debugger() {
        let run = run_to_completion(&function_calls()).unwrap();
        assert!(matches!(run.outcome, ExecutionOutcome::Completed));
        let globals = run
            .globals
            .iter()
            .map(|(name, value)| format!("{name} = {}", value.render()))
            .collect::<Vec<_>>();
        assert_eq!(globals, vec!["add = function add(a, b)", "x = 3", "y = 6"]);
    }

    #[test]
    fn locations_are_aligned() {
        assert_eq!(
            render_location(&"main.js".into(), Position::new(12, 4)),
            "main.js                12:   4",
        );
        assert_eq!(
            render_location(
                &"/home/someone/projects/scripts/main.js".into(),
                Position::new(1, 0),
            ),
            "…cts/scripts/main.js    1:   0",
        );
    }
}
