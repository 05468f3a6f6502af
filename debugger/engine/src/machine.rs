use crate::{
    debug::{
        BreakLocation, BreakPointSet, CallFrame, Cancelled, DebugEvent, DebugHandler, DebugScope,
        Evaluate, EvaluationError, ExecutionControls, ExecutionOutcome, PauseReason, ScopeKind,
        StepMode,
    },
    environment::{AssignResult, Environment, EnvironmentKind},
    error::RuntimeError,
    value::{read, write, Closure, Value},
};
use derive_more::From;
use linked_hash_map::LinkedHashMap;
use scriptdbg_syntax::{
    ast::{
        BinaryOperator, Expression, ExpressionKind, ForEach, ForEachLeft,
        ForInit, Function, FunctionBody, LogicalOperator, Program, Statement, StatementKind,
        UnaryOperator, UpdateOperator, VariableDeclarator, VariableKind,
    },
    read_expression, Location, SourceId, SourceLocation,
};
use std::{cmp::Ordering, sync::Arc};
use tracing::{debug, trace, warn};

/// Deeper calls fail with a `RangeError`. The interpreter recurses on the
/// native stack, so whoever runs a machine should give it a generous one.
pub const MAX_CALL_DEPTH: usize = 400;

/// Arrays are stored densely, so their length is capped far below
/// JavaScript's `2^32 - 1`.
pub const MAX_ARRAY_LENGTH: usize = 1 << 20;

const ANONYMOUS: &str = "(anonymous)";

/// A tree-walking interpreter for one script.
pub struct Machine<'h> {
    source_id: SourceId,
    program: Arc<Program>,
    globals: Arc<Environment>,
    frames: Vec<Frame>,

    handler: Option<&'h mut dyn DebugHandler>,
    break_points: BreakPointSet,
    controls: ExecutionControls,
    stepping: Stepping,
}

struct Frame {
    function_name: String,
    this: Value,
    /// The innermost environment of the code currently running in this
    /// frame.
    environment: Arc<Environment>,
    location: Location,
}

#[derive(Clone, Copy, Debug)]
struct Stepping {
    mode: StepMode,
    /// The call depth at which `mode` was chosen.
    depth: usize,
}

#[derive(Debug, From)]
enum Interrupt {
    Error(RuntimeError),
    Cancelled(Cancelled),
}
type Execution<T> = Result<T, Interrupt>;

enum Completion {
    Normal,
    Return(Value),
    Break,
    Continue,
}

enum CheckPoint {
    Statement,
    DebuggerStatement,
    /// The end of a function body.
    Return(Value),
}

impl<'h> Machine<'h> {
    #[must_use]
    pub fn new(source_id: SourceId, program: Arc<Program>) -> Self {
        Self {
            source_id,
            program,
            globals: Environment::global(),
            frames: vec![],
            handler: None,
            break_points: BreakPointSet::default(),
            controls: ExecutionControls::default(),
            stepping: Stepping {
                mode: StepMode::None,
                depth: 1,
            },
        }
    }

    #[must_use]
    pub fn with_debugger(
        mut self,
        handler: &'h mut dyn DebugHandler,
        break_points: BreakPointSet,
        controls: ExecutionControls,
        initial_mode: StepMode,
    ) -> Self {
        self.handler = Some(handler);
        self.break_points = break_points;
        self.controls = controls;
        self.stepping = Stepping {
            mode: initial_mode,
            depth: 1,
        };
        self
    }

    #[must_use]
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.own_binding(name)
    }
    /// The global bindings in declaration order.
    #[must_use]
    pub fn globals(&self) -> Vec<(String, Value)> {
        self.globals
            .binding_names()
            .into_iter()
            .filter_map(|name| {
                let value = self.globals.own_binding(&name)?;
                Some((name, value))
            })
            .collect()
    }

    pub fn run(&mut self) -> ExecutionOutcome {
        debug!("Running {}.", self.source_id);
        self.frames = vec![Frame {
            function_name: ANONYMOUS.to_string(),
            this: Value::Undefined,
            environment: self.globals.clone(),
            location: self.program.loc,
        }];

        let program = self.program.clone();
        self.hoist(&program.body);
        let outcome = match self.execute_statements(&program.body) {
            Ok(_) => ExecutionOutcome::Completed,
            Err(Interrupt::Error(error)) => ExecutionOutcome::Failed(error),
            Err(Interrupt::Cancelled(Cancelled)) => ExecutionOutcome::Cancelled,
        };
        self.frames.clear();
        debug!("The execution of {} {outcome}.", self.source_id);

        if let Some(handler) = self.handler.as_mut() {
            handler.on_finished(&outcome);
        }
        outcome
    }

    // Debugging

    fn check_cancellation(&self) -> Result<(), Cancelled> {
        if self.controls.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    fn check_point(&mut self, location: Location, check: CheckPoint) -> Execution<()> {
        if let Some(frame) = self.frames.last_mut() {
            frame.location = location;
        }
        self.check_cancellation()?;

        // Without a handler (also while evaluating for the handler), check
        // points are inert.
        let Some(handler) = self.handler.take() else {
            return Ok(());
        };
        let result = self.notify(&mut *handler, location, check);
        self.handler = Some(handler);
        Ok(result?)
    }

    fn notify(
        &mut self,
        handler: &mut dyn DebugHandler,
        location: Location,
        check: CheckPoint,
    ) -> Result<(), Cancelled> {
        let depth = self.frames.len();
        let break_location = BreakLocation::new(self.source_id.clone(), location.start);
        let is_break_point_hit = match self.break_points.condition(&break_location) {
            None => false,
            Some(None) => true,
            Some(Some(condition)) => self.condition_holds(&condition, &break_location)?,
        };

        let reason = if is_break_point_hit {
            PauseReason::BreakPoint
        } else if matches!(check, CheckPoint::DebuggerStatement) {
            PauseReason::DebuggerStatement
        } else if self.should_step(depth, &check) {
            PauseReason::Step
        } else {
            return Ok(());
        };
        if reason.is_step() && handler.is_running() && !self.controls.is_pause_requested() {
            self.stepping = Stepping {
                mode: StepMode::Into,
                depth,
            };
            return Ok(());
        }
        trace!("{reason} at {} (depth {depth}).", location.start);

        let is_return_point = matches!(check, CheckPoint::Return(_));
        let return_value = match check {
            CheckPoint::Return(value) => Some(value),
            _ => None,
        };
        let event = self.snapshot(
            reason,
            location,
            is_break_point_hit.then_some(break_location),
            return_value,
        );
        let mut evaluator = Evaluator { machine: self };
        let mode = if reason.is_step() {
            handler.on_step(event, &mut evaluator)?
        } else {
            handler.on_break(event, &mut evaluator)?
        };
        // Leaving a frame from its return point continues in the caller.
        let stepping = if mode == StepMode::Out && is_return_point {
            Stepping {
                mode: StepMode::Over,
                depth: depth.saturating_sub(1),
            }
        } else {
            Stepping { mode, depth }
        };
        if stepping.mode != self.stepping.mode || stepping.depth != self.stepping.depth {
            debug!(
                "Stepping with mode {} from depth {}.",
                stepping.mode, stepping.depth,
            );
        }
        self.stepping = stepping;
        Ok(())
    }

    fn should_step(&self, depth: usize, check: &CheckPoint) -> bool {
        if self.controls.is_pause_requested() {
            return true;
        }
        let Stepping {
            mode,
            depth: initial_depth,
        } = self.stepping;
        match mode {
            StepMode::None => false,
            StepMode::Into => true,
            StepMode::Over => depth <= initial_depth,
            StepMode::Out => {
                depth < initial_depth
                    || (depth == initial_depth && matches!(check, CheckPoint::Return(_)))
            }
        }
    }

    /// A condition that fails to evaluate counts as satisfied so the operator
    /// gets to see the problem.
    fn condition_holds(
        &mut self,
        condition: &str,
        break_location: &BreakLocation,
    ) -> Result<bool, Cancelled> {
        match self.evaluate_in_context(condition) {
            Ok(value) => Ok(value.is_truthy()),
            Err(EvaluationError::Cancelled) => Err(Cancelled),
            Err(EvaluationError::Syntax(error)) => {
                warn!("The condition `{condition}` of the breakpoint at {break_location} is invalid: {error}");
                Ok(true)
            }
            Err(EvaluationError::Runtime(error)) => {
                warn!("The condition `{condition}` of the breakpoint at {break_location} failed: {error}");
                Ok(true)
            }
        }
    }

    fn evaluate_in_context(&mut self, source: &str) -> Result<Value, EvaluationError> {
        let expression = read_expression(source).map_err(EvaluationError::Syntax)?;
        let paused_location = self.frames.last().map(|frame| frame.location);
        let result = self.evaluate(&expression);
        if let (Some(frame), Some(location)) = (self.frames.last_mut(), paused_location) {
            frame.location = location;
        }
        result.map_err(|interrupt| match interrupt {
            Interrupt::Error(error) => EvaluationError::Runtime(error),
            Interrupt::Cancelled(Cancelled) => EvaluationError::Cancelled,
        })
    }

    fn snapshot(
        &self,
        reason: PauseReason,
        location: Location,
        break_point: Option<BreakLocation>,
        return_value: Option<Value>,
    ) -> DebugEvent {
        let call_stack = self
            .frames
            .iter()
            .rev()
            .map(|frame| CallFrame {
                function_name: frame.function_name.clone(),
                location: SourceLocation::new(self.source_id.clone(), frame.location),
                this: frame.this.clone(),
            })
            .collect();

        let mut scope_chain = vec![];
        let mut environment = Some(self.environment());
        let mut is_inside_function = false;
        while let Some(current) = environment {
            let kind = match current.kind() {
                EnvironmentKind::Global => ScopeKind::Global,
                EnvironmentKind::Block => ScopeKind::Block,
                EnvironmentKind::Function if is_inside_function => ScopeKind::Closure,
                EnvironmentKind::Function => {
                    is_inside_function = true;
                    ScopeKind::Local
                }
            };
            environment = current.parent().cloned();
            scope_chain.push(DebugScope::new(kind, current));
        }

        DebugEvent {
            reason,
            location: SourceLocation::new(self.source_id.clone(), location),
            call_stack,
            scope_chain,
            break_point,
            return_value,
        }
    }

    // Environments

    fn environment(&self) -> Arc<Environment> {
        self.frames
            .last()
            .map_or_else(|| self.globals.clone(), |frame| frame.environment.clone())
    }
    fn this(&self) -> Value {
        self.frames
            .last()
            .map(|frame| frame.this.clone())
            .unwrap_or_default()
    }

    fn with_environment<T>(
        &mut self,
        environment: Arc<Environment>,
        body: impl FnOnce(&mut Self) -> Execution<T>,
    ) -> Execution<T> {
        let Some(frame) = self.frames.last_mut() else {
            return body(self);
        };
        let outer = std::mem::replace(&mut frame.environment, environment);
        let result = body(self);
        if let Some(frame) = self.frames.last_mut() {
            frame.environment = outer;
        }
        result
    }

    /// Function declarations are visible in their whole scope.
    fn hoist(&mut self, statements: &[Statement]) {
        let environment = self.environment();
        for statement in statements {
            if let StatementKind::FunctionDeclaration(function) = &statement.kind {
                let name = function.name().unwrap_or(ANONYMOUS).to_string();
                let closure = self.create_closure(function, name.clone(), false);
                environment.declare(name, closure, true);
            }
        }
    }

    fn create_closure(&self, function: &Arc<Function>, name: String, is_arrow: bool) -> Value {
        Value::Function(Arc::new(Closure {
            name,
            function: function.clone(),
            environment: self.environment(),
            captured_this: is_arrow.then(|| self.this()),
        }))
    }

    fn declare_variables(
        &mut self,
        declarations: &[VariableDeclarator],
        kind: VariableKind,
    ) -> Execution<()> {
        for declarator in declarations {
            let name = &declarator.id.name;
            let value = match &declarator.init {
                Some(init) => self.evaluate_named(init, name)?,
                None => Value::Undefined,
            };
            self.declare_variable(name, value, kind);
        }
        Ok(())
    }
    fn declare_variable(&self, name: &str, value: Value, kind: VariableKind) {
        let environment = self.environment();
        match kind {
            VariableKind::Var => environment.variable_environment().declare(name, value, true),
            VariableKind::Let => environment.declare(name, value, true),
            VariableKind::Const => environment.declare(name, value, false),
        }
    }

    fn assign_variable(&self, name: &str, value: Value, location: Location) -> Execution<()> {
        match self.environment().assign(name, value.clone()) {
            AssignResult::Assigned => Ok(()),
            AssignResult::Immutable => Err(RuntimeError::ConstAssignment {
                name: name.to_string(),
                location,
            }
            .into()),
            AssignResult::NotFound => {
                // Sloppy mode creates a global.
                self.globals.declare(name, value, true);
                Ok(())
            }
        }
    }

    // Statements

    fn execute_statements(&mut self, statements: &[Statement]) -> Execution<Completion> {
        for statement in statements {
            match self.execute(statement)? {
                Completion::Normal => {}
                completion => return Ok(completion),
            }
        }
        Ok(Completion::Normal)
    }

    fn execute(&mut self, statement: &Statement) -> Execution<Completion> {
        match &statement.kind {
            StatementKind::BlockStatement { body } => return self.execute_block(body),
            StatementKind::DebuggerStatement => {
                self.check_point(statement.loc, CheckPoint::DebuggerStatement)?;
            }
            _ => self.check_point(statement.loc, CheckPoint::Statement)?,
        }

        let completion = match &statement.kind {
            StatementKind::VariableDeclaration { declarations, kind } => {
                self.declare_variables(declarations, *kind)?;
                Completion::Normal
            }
            StatementKind::ExpressionStatement { expression } => {
                self.evaluate(expression)?;
                Completion::Normal
            }
            StatementKind::BlockStatement { body } => self.execute_block(body)?,
            StatementKind::EmptyStatement
            | StatementKind::DebuggerStatement
            | StatementKind::FunctionDeclaration(_) => Completion::Normal,
            StatementKind::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                if self.evaluate(test)?.is_truthy() {
                    self.execute(consequent)?
                } else if let Some(alternate) = alternate {
                    self.execute(alternate)?
                } else {
                    Completion::Normal
                }
            }
            StatementKind::WhileStatement { test, body } => loop {
                self.check_cancellation()?;
                if !self.evaluate(test)?.is_truthy() {
                    break Completion::Normal;
                }
                match self.execute(body)? {
                    Completion::Break => break Completion::Normal,
                    Completion::Return(value) => break Completion::Return(value),
                    Completion::Normal | Completion::Continue => {}
                }
            },
            StatementKind::DoWhileStatement { body, test } => loop {
                self.check_cancellation()?;
                match self.execute(body)? {
                    Completion::Break => break Completion::Normal,
                    Completion::Return(value) => break Completion::Return(value),
                    Completion::Normal | Completion::Continue => {}
                }
                self.check_point(test.loc, CheckPoint::Statement)?;
                if !self.evaluate(test)?.is_truthy() {
                    break Completion::Normal;
                }
            },
            StatementKind::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                let is_lexical = matches!(
                    init.as_deref(),
                    Some(ForInit::Declaration(Statement {
                        kind: StatementKind::VariableDeclaration {
                            kind: VariableKind::Let | VariableKind::Const,
                            ..
                        },
                        ..
                    })),
                );
                let environment = if is_lexical {
                    Environment::new(EnvironmentKind::Block, self.environment())
                } else {
                    self.environment()
                };
                self.with_environment(environment, |machine| {
                    machine.execute_for(init.as_deref(), test.as_ref(), update.as_ref(), body)
                })?
            }
            StatementKind::ForInStatement(for_each) => self.execute_for_each(for_each, false)?,
            StatementKind::ForOfStatement(for_each) => self.execute_for_each(for_each, true)?,
            StatementKind::ReturnStatement { argument } => Completion::Return(match argument {
                Some(argument) => self.evaluate(argument)?,
                None => Value::Undefined,
            }),
            StatementKind::BreakStatement => Completion::Break,
            StatementKind::ContinueStatement => Completion::Continue,
            StatementKind::ThrowStatement { argument } => {
                let value = self.evaluate(argument)?;
                return Err(RuntimeError::Thrown {
                    value,
                    location: statement.loc,
                }
                .into());
            }
        };
        Ok(completion)
    }

    fn execute_block(&mut self, body: &[Statement]) -> Execution<Completion> {
        let has_lexical_declarations = body.iter().any(|statement| {
            matches!(
                statement.kind,
                StatementKind::VariableDeclaration {
                    kind: VariableKind::Let | VariableKind::Const,
                    ..
                } | StatementKind::FunctionDeclaration(_),
            )
        });
        if !has_lexical_declarations {
            return self.execute_statements(body);
        }

        let environment = Environment::new(EnvironmentKind::Block, self.environment());
        self.with_environment(environment, |machine| {
            machine.hoist(body);
            machine.execute_statements(body)
        })
    }

    fn execute_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expression>,
        update: Option<&Expression>,
        body: &Statement,
    ) -> Execution<Completion> {
        match init {
            Some(ForInit::Declaration(Statement {
                kind: StatementKind::VariableDeclaration { declarations, kind },
                ..
            })) => self.declare_variables(declarations, *kind)?,
            Some(ForInit::Declaration(declaration)) => {
                return Err(RuntimeError::Unsupported {
                    feature: "This loop initializer",
                    location: declaration.loc,
                }
                .into());
            }
            Some(ForInit::Expression(expression)) => {
                self.evaluate(expression)?;
            }
            None => {}
        }

        loop {
            self.check_cancellation()?;
            if let Some(test) = test {
                self.check_point(test.loc, CheckPoint::Statement)?;
                if !self.evaluate(test)?.is_truthy() {
                    return Ok(Completion::Normal);
                }
            }
            match self.execute(body)? {
                Completion::Break => return Ok(Completion::Normal),
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal | Completion::Continue => {}
            }
            if let Some(update) = update {
                self.check_point(update.loc, CheckPoint::Statement)?;
                self.evaluate(update)?;
            }
        }
    }

    fn execute_for_each(&mut self, for_each: &ForEach, is_of: bool) -> Execution<Completion> {
        let iterable = self.evaluate(&for_each.right)?;
        let items = if is_of {
            match &iterable {
                Value::Array(items) => read(items).clone(),
                Value::String(string) => string.chars().map(|it| it.to_string().into()).collect(),
                _ => {
                    return Err(RuntimeError::type_error(
                        format!("{} is not iterable", iterable.render()),
                        for_each.right.loc,
                    )
                    .into())
                }
            }
        } else {
            match &iterable {
                Value::Array(items) => (0..read(items).len())
                    .map(|index| index.to_string().into())
                    .collect(),
                Value::String(string) => (0..string.chars().count())
                    .map(|index| index.to_string().into())
                    .collect(),
                Value::Object(properties) => read(properties)
                    .keys()
                    .map(|key| key.as_str().into())
                    .collect(),
                _ => vec![],
            }
        };

        for item in items {
            self.check_cancellation()?;
            self.check_point(for_each.left.loc(), CheckPoint::Statement)?;
            let completion = match &*for_each.left {
                ForEachLeft::Declaration(Statement {
                    kind: StatementKind::VariableDeclaration { declarations, kind },
                    loc,
                }) => {
                    let [declarator] = declarations.as_slice() else {
                        return Err(RuntimeError::Unsupported {
                            feature: "Multiple loop variables",
                            location: *loc,
                        }
                        .into());
                    };
                    let environment = if *kind == VariableKind::Var {
                        self.environment()
                    } else {
                        Environment::new(EnvironmentKind::Block, self.environment())
                    };
                    self.with_environment(environment, |machine| {
                        machine.declare_variable(&declarator.id.name, item, *kind);
                        machine.execute(&for_each.body)
                    })?
                }
                ForEachLeft::Declaration(declaration) => {
                    return Err(RuntimeError::Unsupported {
                        feature: "This loop variable",
                        location: declaration.loc,
                    }
                    .into());
                }
                ForEachLeft::Pattern(pattern) => {
                    self.assign_to(pattern, item)?;
                    self.execute(&for_each.body)?
                }
            };
            match completion {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal | Completion::Continue => {}
            }
        }
        Ok(Completion::Normal)
    }

    // Functions

    fn call(
        &mut self,
        closure: &Arc<Closure>,
        this: Value,
        arguments: Vec<Value>,
        call_site: Location,
    ) -> Execution<Value> {
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow {
                location: call_site,
            }
            .into());
        }
        if let Some(caller) = self.frames.last_mut() {
            caller.location = call_site;
        }

        let environment = Environment::new(EnvironmentKind::Function, closure.environment.clone());
        let mut arguments = arguments.into_iter();
        for parameter in &closure.function.params {
            environment.declare(
                parameter.name.as_str(),
                arguments.next().unwrap_or_default(),
                true,
            );
        }
        let function_name = if closure.name.is_empty() {
            ANONYMOUS.to_string()
        } else {
            closure.name.clone()
        };
        trace!("Calling {function_name}.");
        self.frames.push(Frame {
            function_name,
            this: closure.captured_this.clone().unwrap_or(this),
            environment,
            location: closure.function.body.loc(),
        });

        let function = closure.function.clone();
        let result = self.execute_function_body(&function);
        self.frames.pop();
        result
    }

    fn execute_function_body(&mut self, function: &Function) -> Execution<Value> {
        let value = match &function.body {
            FunctionBody::Block(block) => {
                let statements = match &block.kind {
                    StatementKind::BlockStatement { body } => body.as_slice(),
                    _ => std::slice::from_ref(block),
                };
                self.hoist(statements);
                match self.execute_statements(statements)? {
                    Completion::Return(value) => value,
                    Completion::Normal | Completion::Break | Completion::Continue => {
                        Value::Undefined
                    }
                }
            }
            FunctionBody::Expression(expression) => self.evaluate(expression)?,
        };
        self.check_point(
            Location::at(function.body.loc().end),
            CheckPoint::Return(value.clone()),
        )?;
        Ok(value)
    }

    // Expressions

    /// Anonymous functions take the name of what they are assigned to.
    fn evaluate_named(&mut self, expression: &Expression, name: &str) -> Execution<Value> {
        match &expression.kind {
            ExpressionKind::FunctionExpression(function) if function.id.is_none() => {
                Ok(self.create_closure(function, name.to_string(), false))
            }
            ExpressionKind::ArrowFunctionExpression(function) => {
                Ok(self.create_closure(function, name.to_string(), true))
            }
            _ => self.evaluate(expression),
        }
    }

    fn evaluate(&mut self, expression: &Expression) -> Execution<Value> {
        let location = expression.loc;
        let value = match &expression.kind {
            ExpressionKind::Identifier { name } => self.lookup(name, location)?,
            ExpressionKind::Literal { value } => {
                Value::from_json(value).ok_or(RuntimeError::Unsupported {
                    feature: "This kind of literal",
                    location,
                })?
            }
            ExpressionKind::ThisExpression => self.this(),
            ExpressionKind::ArrayExpression { elements } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(match element {
                        Some(element) => self.evaluate(element)?,
                        None => Value::Undefined,
                    });
                }
                Value::array(items)
            }
            ExpressionKind::ObjectExpression { properties } => {
                let mut object = LinkedHashMap::new();
                for property in properties {
                    let key = match property.static_name() {
                        Some(key) => key,
                        None if property.computed => self.evaluate(&property.key)?.to_js_string(),
                        None => {
                            return Err(RuntimeError::Unsupported {
                                feature: "This property key",
                                location: property.key.loc,
                            }
                            .into())
                        }
                    };
                    let value = self.evaluate_named(&property.value, &key)?;
                    object.insert(key, value);
                }
                Value::object(object)
            }
            ExpressionKind::FunctionExpression(function) => {
                let name = function.name().unwrap_or_default().to_string();
                self.create_closure(function, name, false)
            }
            ExpressionKind::ArrowFunctionExpression(function) => {
                self.create_closure(function, String::new(), true)
            }
            ExpressionKind::UnaryExpression { operator, argument } => {
                if *operator == UnaryOperator::TypeOf {
                    if let ExpressionKind::Identifier { name } = &argument.kind {
                        // `typeof undeclared` doesn't throw.
                        if self.environment().lookup(name).is_none() {
                            return Ok("undefined".into());
                        }
                    }
                }
                let argument = self.evaluate(argument)?;
                match operator {
                    UnaryOperator::Minus => Value::Number(-argument.to_number()),
                    UnaryOperator::Plus => Value::Number(argument.to_number()),
                    UnaryOperator::Not => Value::Bool(!argument.is_truthy()),
                    UnaryOperator::TypeOf => argument.type_of().into(),
                    UnaryOperator::Void => Value::Undefined,
                }
            }
            ExpressionKind::UpdateExpression {
                operator,
                prefix,
                argument,
            } => {
                let old = self.evaluate(argument)?.to_number();
                let new = match operator {
                    UpdateOperator::Increment => old + 1.0,
                    UpdateOperator::Decrement => old - 1.0,
                };
                self.assign_to(argument, Value::Number(new))?;
                Value::Number(if *prefix { new } else { old })
            }
            ExpressionKind::BinaryExpression {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary_operation(*operator, &left, &right, location)?
            }
            ExpressionKind::LogicalExpression {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(left)?;
                let is_short_circuit = match operator {
                    LogicalOperator::And => !left.is_truthy(),
                    LogicalOperator::Or => left.is_truthy(),
                    LogicalOperator::NullishCoalescing => !left.is_nullish(),
                };
                if is_short_circuit {
                    left
                } else {
                    self.evaluate(right)?
                }
            }
            ExpressionKind::AssignmentExpression {
                operator,
                left,
                right,
            } => {
                let value = match operator.binary_operator() {
                    None => match &left.kind {
                        ExpressionKind::Identifier { name } => self.evaluate_named(right, name)?,
                        _ => self.evaluate(right)?,
                    },
                    Some(binary_operator) => {
                        let current = self.evaluate(left)?;
                        let right = self.evaluate(right)?;
                        binary_operation(binary_operator, &current, &right, location)?
                    }
                };
                self.assign_to(left, value.clone())?;
                value
            }
            ExpressionKind::MemberExpression {
                object,
                property,
                computed,
            } => {
                let object = self.evaluate(object)?;
                let key = self.property_key(property, *computed)?;
                get_property(&object, &key, location)?
            }
            ExpressionKind::CallExpression { callee, arguments } => {
                return self.evaluate_call(callee, arguments, location);
            }
            ExpressionKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                if self.evaluate(test)?.is_truthy() {
                    self.evaluate(consequent)?
                } else {
                    self.evaluate(alternate)?
                }
            }
        };
        Ok(value)
    }

    fn lookup(&self, name: &str, location: Location) -> Execution<Value> {
        if let Some(value) = self.environment().lookup(name) {
            return Ok(value);
        }
        match name {
            "undefined" => Ok(Value::Undefined),
            "NaN" => Ok(Value::Number(f64::NAN)),
            "Infinity" => Ok(Value::Number(f64::INFINITY)),
            _ => Err(RuntimeError::Reference {
                name: name.to_string(),
                location,
            }
            .into()),
        }
    }

    fn property_key(&mut self, property: &Expression, computed: bool) -> Execution<String> {
        if computed {
            return Ok(self.evaluate(property)?.to_js_string());
        }
        match &property.kind {
            ExpressionKind::Identifier { name } => Ok(name.clone()),
            _ => Err(RuntimeError::Unsupported {
                feature: "This property access",
                location: property.loc,
            }
            .into()),
        }
    }

    fn assign_to(&mut self, target: &Expression, value: Value) -> Execution<()> {
        match &target.kind {
            ExpressionKind::Identifier { name } => self.assign_variable(name, value, target.loc),
            ExpressionKind::MemberExpression {
                object,
                property,
                computed,
            } => {
                let object = self.evaluate(object)?;
                let key = self.property_key(property, *computed)?;
                Ok(set_property(&object, &key, value, target.loc)?)
            }
            _ => Err(RuntimeError::Unsupported {
                feature: "Assigning to this target",
                location: target.loc,
            }
            .into()),
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &Expression,
        arguments: &[Expression],
        location: Location,
    ) -> Execution<Value> {
        let (function, this) = match &callee.kind {
            ExpressionKind::MemberExpression {
                object,
                property,
                computed,
            } => {
                let object = self.evaluate(object)?;
                let key = self.property_key(property, *computed)?;
                if let Value::Array(items) = &object {
                    match key.as_str() {
                        "push" => {
                            let values = self.evaluate_arguments(arguments)?;
                            let mut items = write(items);
                            items.extend(values);
                            #[allow(clippy::cast_precision_loss)]
                            return Ok(Value::Number(items.len() as f64));
                        }
                        "pop" => {
                            self.evaluate_arguments(arguments)?;
                            return Ok(write(items).pop().unwrap_or_default());
                        }
                        _ => {}
                    }
                }
                (get_property(&object, &key, callee.loc)?, object)
            }
            _ => (self.evaluate(callee)?, Value::Undefined),
        };
        let arguments = self.evaluate_arguments(arguments)?;
        let Value::Function(closure) = function else {
            return Err(RuntimeError::type_error(
                format!("{} is not a function", describe_callee(callee)),
                location,
            )
            .into());
        };
        self.call(&closure, this, arguments, location)
    }
    fn evaluate_arguments(&mut self, arguments: &[Expression]) -> Execution<Vec<Value>> {
        arguments
            .iter()
            .map(|argument| self.evaluate(argument))
            .collect()
    }
}

struct Evaluator<'m, 'h> {
    machine: &'m mut Machine<'h>,
}
impl Evaluate for Evaluator<'_, '_> {
    fn evaluate(&mut self, expression: &str) -> Result<Value, EvaluationError> {
        debug!("Evaluating `{expression}`.");
        self.machine.evaluate_in_context(expression)
    }
}

fn describe_callee(callee: &Expression) -> String {
    match &callee.kind {
        ExpressionKind::Identifier { name } => name.clone(),
        ExpressionKind::MemberExpression {
            object,
            property,
            computed: false,
        } => format!("{}.{}", describe_callee(object), describe_callee(property)),
        _ => "expression".to_string(),
    }
}

fn get_property(object: &Value, key: &str, location: Location) -> Result<Value, RuntimeError> {
    #[allow(clippy::cast_precision_loss)]
    let value = match object {
        Value::Undefined | Value::Null => {
            return Err(RuntimeError::type_error(
                format!(
                    "Cannot read properties of {} (reading '{key}')",
                    object.to_js_string(),
                ),
                location,
            ));
        }
        Value::Array(items) => {
            let items = read(items);
            if key == "length" {
                Value::Number(items.len() as f64)
            } else {
                key.parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index).cloned())
                    .unwrap_or_default()
            }
        }
        Value::String(string) => {
            if key == "length" {
                Value::Number(string.chars().count() as f64)
            } else {
                key.parse::<usize>()
                    .ok()
                    .and_then(|index| string.chars().nth(index))
                    .map(|character| character.to_string().into())
                    .unwrap_or_default()
            }
        }
        Value::Object(properties) => read(properties).get(key).cloned().unwrap_or_default(),
        Value::Function(closure) => match key {
            "name" => closure.name.as_str().into(),
            "length" => Value::Number(closure.function.params.len() as f64),
            _ => Value::Undefined,
        },
        Value::Bool(_) | Value::Number(_) => Value::Undefined,
    };
    Ok(value)
}

fn set_property(
    object: &Value,
    key: &str,
    value: Value,
    location: Location,
) -> Result<(), RuntimeError> {
    match object {
        Value::Undefined | Value::Null => {
            return Err(RuntimeError::type_error(
                format!(
                    "Cannot set properties of {} (setting '{key}')",
                    object.to_js_string(),
                ),
                location,
            ));
        }
        Value::Object(properties) => {
            write(properties).insert(key.to_string(), value);
        }
        Value::Array(items) => {
            let mut items = write(items);
            if key == "length" {
                let length = value.to_number();
                #[allow(clippy::cast_precision_loss)]
                let max_length = MAX_ARRAY_LENGTH as f64;
                if length < 0.0 || length.fract() != 0.0 || length > max_length {
                    return Err(RuntimeError::Range {
                        message: "Invalid array length".to_string(),
                        location,
                    });
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                items.resize(length as usize, Value::Undefined);
            } else if let Ok(index) = key.parse::<usize>() {
                if index >= MAX_ARRAY_LENGTH {
                    return Err(RuntimeError::Range {
                        message: format!("Array index {index} is out of range"),
                        location,
                    });
                }
                if index >= items.len() {
                    items.resize(index + 1, Value::Undefined);
                }
                items[index] = value;
            }
        }
        // Primitives silently ignore property writes.
        Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Function(_) => {}
    }
    Ok(())
}

fn binary_operation(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
    location: Location,
) -> Result<Value, RuntimeError> {
    let value = match operator {
        BinaryOperator::Add => {
            let is_textual =
                |value: &Value| matches!(value, Value::String(_) | Value::Array(_) | Value::Object(_));
            if is_textual(left) || is_textual(right) {
                Value::String(left.to_js_string() + &right.to_js_string())
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOperator::Subtract => Value::Number(left.to_number() - right.to_number()),
        BinaryOperator::Multiply => Value::Number(left.to_number() * right.to_number()),
        BinaryOperator::Divide => Value::Number(left.to_number() / right.to_number()),
        BinaryOperator::Remainder => Value::Number(left.to_number() % right.to_number()),
        BinaryOperator::Exponent => Value::Number(left.to_number().powf(right.to_number())),
        BinaryOperator::Equal => Value::Bool(left.loose_equals(right)),
        BinaryOperator::NotEqual => Value::Bool(!left.loose_equals(right)),
        BinaryOperator::StrictEqual => Value::Bool(left.strict_equals(right)),
        BinaryOperator::StrictNotEqual => Value::Bool(!left.strict_equals(right)),
        BinaryOperator::Less
        | BinaryOperator::LessOrEqual
        | BinaryOperator::Greater
        | BinaryOperator::GreaterOrEqual => {
            let ordering = match (left, right) {
                (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            Value::Bool(ordering.is_some_and(|ordering| match operator {
                BinaryOperator::Less => ordering == Ordering::Less,
                BinaryOperator::LessOrEqual => ordering != Ordering::Greater,
                BinaryOperator::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOperator::In => {
            let key = left.to_js_string();
            match right {
                Value::Object(properties) => Value::Bool(read(properties).contains_key(&key)),
                Value::Array(items) => Value::Bool(
                    key == "length"
                        || key
                            .parse::<usize>()
                            .is_ok_and(|index| index < read(items).len()),
                ),
                _ => {
                    return Err(RuntimeError::type_error(
                        format!(
                            "Cannot use 'in' operator to search for '{key}' in {}",
                            right.render(),
                        ),
                        location,
                    ))
                }
            }
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptdbg_syntax::{fixtures, Position};

    type Respond = Box<dyn FnMut(&DebugEvent, &mut dyn Evaluate) -> Result<StepMode, Cancelled>>;

    /// Records every notification and answers with `respond`.
    struct Recorder {
        events: Vec<(PauseReason, Position, usize)>,
        respond: Respond,
        finished: Option<ExecutionOutcome>,
    }
    impl Recorder {
        fn new(
            respond: impl FnMut(&DebugEvent, &mut dyn Evaluate) -> Result<StepMode, Cancelled>
                + 'static,
        ) -> Self {
            Self {
                events: vec![],
                respond: Box::new(respond),
                finished: None,
            }
        }
        fn positions(&self) -> Vec<String> {
            self.events
                .iter()
                .map(|(_, position, _)| position.to_string())
                .collect()
        }
        fn record(
            &mut self,
            event: &DebugEvent,
            evaluator: &mut dyn Evaluate,
        ) -> Result<StepMode, Cancelled> {
            self.events.push((
                event.reason,
                event.location.start(),
                event.call_stack.len(),
            ));
            (self.respond)(event, evaluator)
        }
    }
    impl DebugHandler for Recorder {
        fn on_step(
            &mut self,
            event: DebugEvent,
            evaluator: &mut dyn Evaluate,
        ) -> Result<StepMode, Cancelled> {
            assert!(event.reason.is_step());
            self.record(&event, evaluator)
        }
        fn on_break(
            &mut self,
            event: DebugEvent,
            evaluator: &mut dyn Evaluate,
        ) -> Result<StepMode, Cancelled> {
            assert!(!event.reason.is_step());
            self.record(&event, evaluator)
        }
        fn on_finished(&mut self, outcome: &ExecutionOutcome) {
            self.finished = Some(outcome.clone());
        }
    }

    fn run(
        program: Program,
        recorder: &mut Recorder,
        break_points: &[(usize, usize, Option<&str>)],
        initial_mode: StepMode,
    ) -> ExecutionOutcome {
        let source_id = SourceId::from("main.js");
        let set = BreakPointSet::default();
        for (line, column, condition) in break_points {
            set.insert(
                BreakLocation::new(source_id.clone(), Position::new(*line, *column)),
                condition.map(ToString::to_string),
            );
        }
        Machine::new(source_id, Arc::new(program))
            .with_debugger(recorder, set, ExecutionControls::default(), initial_mode)
            .run()
    }

    #[test]
    fn runs_without_debugger() {
        let mut machine = Machine::new("main.js".into(), Arc::new(fixtures::accumulate()));
        assert!(matches!(machine.run(), ExecutionOutcome::Completed));
        assert_eq!(machine.global("total").unwrap().to_number(), 3.0);

        let mut machine = Machine::new("main.js".into(), Arc::new(fixtures::loops()));
        assert!(matches!(machine.run(), ExecutionOutcome::Completed));
        assert_eq!(machine.global("items").unwrap().render(), "[]");
        assert_eq!(
            machine.global("twice").unwrap().render(),
            "(n) => …",
        );
    }

    #[test]
    fn stepping_into_visits_every_check_point() {
        let mut recorder = Recorder::new(|_, _| Ok(StepMode::Into));
        let outcome = run(fixtures::for_loop(), &mut recorder, &[], StepMode::Into);
        assert!(matches!(outcome, ExecutionOutcome::Completed));
        assert_eq!(
            recorder.positions(),
            vec![
                "1:0", "1:16", "2:2", "1:23", "1:16", "2:2", "1:23", "1:16", "2:2", "1:23",
                "1:16",
            ],
        );
        assert!(matches!(
            recorder.finished,
            Some(ExecutionOutcome::Completed)
        ));
    }

    #[test]
    fn stepping_into_enters_functions() {
        let mut recorder = Recorder::new(|_, _| Ok(StepMode::Into));
        run(fixtures::function_calls(), &mut recorder, &[], StepMode::Into);
        assert_eq!(
            recorder.events,
            vec![
                (PauseReason::Step, Position::new(1, 0), 1),
                (PauseReason::Step, Position::new(4, 0), 1),
                (PauseReason::Step, Position::new(2, 2), 2),
                (PauseReason::Step, Position::new(3, 1), 2),
                (PauseReason::Step, Position::new(5, 0), 1),
                (PauseReason::Step, Position::new(2, 2), 2),
                (PauseReason::Step, Position::new(3, 1), 2),
            ],
        );
    }

    #[test]
    fn stepping_over_skips_nested_calls() {
        let mut recorder = Recorder::new(|_, _| Ok(StepMode::Over));
        run(fixtures::function_calls(), &mut recorder, &[], StepMode::Into);
        assert_eq!(recorder.positions(), vec!["1:0", "4:0", "5:0"]);
    }

    #[test]
    fn stepping_over_inside_a_function_stays_in_it() {
        let mut recorder = Recorder::new(|event, _| {
            Ok(if event.call_stack.len() == 2 {
                StepMode::Over
            } else {
                StepMode::Into
            })
        });
        run(fixtures::function_calls(), &mut recorder, &[], StepMode::Into);
        assert_eq!(
            recorder.positions(),
            vec!["1:0", "4:0", "2:2", "3:1", "5:0", "2:2", "3:1"],
        );
    }

    #[test]
    fn stepping_out_stops_at_the_return_point_first() {
        let mut recorder = Recorder::new(|event, _| {
            if let Some(value) = &event.return_value {
                assert_eq!(value.to_number(), 3.0);
                return Ok(StepMode::Out);
            }
            if event.location.start() == Position::new(5, 0) {
                return Ok(StepMode::None);
            }
            Ok(if event.call_stack.len() == 2 {
                StepMode::Out
            } else {
                StepMode::Into
            })
        });
        run(fixtures::function_calls(), &mut recorder, &[], StepMode::Into);
        assert_eq!(recorder.positions(), vec!["1:0", "4:0", "2:2", "3:1", "5:0"]);
        assert_eq!(recorder.events[3].2, 2);
        assert_eq!(recorder.events[4].2, 1);
    }

    #[test]
    fn stepping_out_of_a_return_point_skips_sibling_calls() {
        let mut recorder = Recorder::new(|event, _| {
            Ok(if event.return_value.is_some() {
                StepMode::Out
            } else {
                StepMode::Into
            })
        });
        let outcome = run(fixtures::sibling_calls(), &mut recorder, &[], StepMode::Into);
        assert!(matches!(outcome, ExecutionOutcome::Completed));
        assert_eq!(recorder.positions(), vec!["1:0", "4:0", "2:2", "3:1"]);
        assert_eq!(recorder.events[3].2, 2);
    }

    #[test]
    fn running_handlers_only_see_breaks() {
        #[derive(Default)]
        struct Running {
            steps: usize,
            breaks: Vec<Position>,
        }
        impl DebugHandler for Running {
            fn on_step(&mut self, _: DebugEvent, _: &mut dyn Evaluate) -> Result<StepMode, Cancelled> {
                self.steps += 1;
                Ok(StepMode::Into)
            }
            fn on_break(
                &mut self,
                event: DebugEvent,
                _: &mut dyn Evaluate,
            ) -> Result<StepMode, Cancelled> {
                self.breaks.push(event.location.start());
                Ok(StepMode::Into)
            }
            fn is_running(&self) -> bool {
                true
            }
        }

        let mut running = Running::default();
        let break_points = BreakPointSet::default();
        break_points.insert(BreakLocation::new("main.js".into(), Position::new(3, 2)), None);
        let outcome = Machine::new("main.js".into(), Arc::new(fixtures::accumulate()))
            .with_debugger(
                &mut running,
                break_points,
                ExecutionControls::default(),
                StepMode::Into,
            )
            .run();
        assert!(matches!(outcome, ExecutionOutcome::Completed));
        assert_eq!(running.steps, 0);
        assert_eq!(running.breaks, vec![Position::new(3, 2); 3]);

        let mut running = Running::default();
        let controls = ExecutionControls::default();
        controls.request_pause();
        Machine::new("main.js".into(), Arc::new(fixtures::accumulate()))
            .with_debugger(&mut running, BreakPointSet::default(), controls, StepMode::Into)
            .run();
        assert!(running.steps > 0);
    }

    #[test]
    fn break_points_stop_every_time() {
        let mut recorder = Recorder::new(|_, _| Ok(StepMode::None));
        run(fixtures::accumulate(), &mut recorder, &[(3, 2, None)], StepMode::None);
        assert_eq!(
            recorder.events,
            vec![(PauseReason::BreakPoint, Position::new(3, 2), 1); 3],
        );
    }

    #[test]
    fn break_point_wins_over_step() {
        let mut recorder = Recorder::new(|_, _| Ok(StepMode::Into));
        run(fixtures::accumulate(), &mut recorder, &[(3, 2, None)], StepMode::Into);
        let at_break_point = recorder
            .events
            .iter()
            .filter(|(_, position, _)| *position == Position::new(3, 2))
            .collect::<Vec<_>>();
        assert_eq!(at_break_point.len(), 3);
        assert!(at_break_point
            .iter()
            .all(|(reason, _, _)| *reason == PauseReason::BreakPoint));
    }

    #[test]
    fn conditional_break_point_evaluates_in_context() {
        let mut totals = vec![];
        let mut recorder = Recorder::new(move |_, evaluator| {
            totals.push(evaluator.evaluate("total").unwrap().to_number());
            assert_eq!(totals, vec![1.0]);
            Ok(StepMode::None)
        });
        run(
            fixtures::accumulate(),
            &mut recorder,
            &[(3, 2, Some("i == 2"))],
            StepMode::None,
        );
        assert_eq!(recorder.events.len(), 1);
    }

    #[test]
    fn failing_condition_breaks() {
        let mut recorder = Recorder::new(|_, _| Ok(StepMode::None));
        run(
            fixtures::accumulate(),
            &mut recorder,
            &[(3, 2, Some("missing > 1"))],
            StepMode::None,
        );
        assert_eq!(recorder.events.len(), 3);
    }

    #[test]
    fn debugger_statements_break() {
        let mut recorder = Recorder::new(|event, evaluator| {
            let item = evaluator.evaluate("item").unwrap();
            assert!(event.break_point.is_none());
            assert!(matches!(event.scope_chain[0].kind, ScopeKind::Block));
            assert_eq!(event.scope_chain[0].binding_names(), vec!["item"]);
            assert!(item.to_number() == 3.0 || item.to_number() == 4.0);
            Ok(StepMode::None)
        });
        run(fixtures::loops(), &mut recorder, &[], StepMode::None);
        assert_eq!(
            recorder.events,
            vec![(PauseReason::DebuggerStatement, Position::new(6, 2), 1); 2],
        );
    }

    #[test]
    fn loop_control_check_points() {
        let mut recorder = Recorder::new(|_, _| Ok(StepMode::Into));
        run(fixtures::loops(), &mut recorder, &[], StepMode::Into);
        assert_eq!(
            recorder.positions(),
            vec![
                "1:0", "2:0", "3:2", "4:9", "3:2", "4:9", "5:0", "5:5", "6:2", "5:5", "6:2",
                "8:0",
            ],
        );
    }

    #[test]
    fn paused_context_exposes_scopes_and_evaluation() {
        let mut recorder = Recorder::new(|event, evaluator| {
            if event.location.start() == Position::new(2, 2) && event.call_stack.len() == 2 {
                let kinds = event
                    .scope_chain
                    .iter()
                    .map(|scope| scope.kind)
                    .collect::<Vec<_>>();
                assert_eq!(kinds, vec![ScopeKind::Local, ScopeKind::Global]);
                assert_eq!(event.scope_chain[0].binding_names(), vec!["a", "b"]);
                assert_eq!(event.call_stack[0].function_name, "add");
                assert_eq!(event.call_stack[1].function_name, "(anonymous)");
                assert_eq!(event.call_stack[1].location.start(), Position::new(4, 8));

                assert_eq!(evaluator.evaluate("a + b").unwrap().to_number(), 3.0);
                assert!(matches!(
                    evaluator.evaluate("missing"),
                    Err(EvaluationError::Runtime(RuntimeError::Reference { .. })),
                ));
                assert!(matches!(
                    evaluator.evaluate("a +"),
                    Err(EvaluationError::Syntax(_)),
                ));
                // Evaluation can change the paused state.
                evaluator.evaluate("a = 10").unwrap();
                return Ok(StepMode::None);
            }
            Ok(StepMode::Into)
        });
        let source_id = SourceId::from("main.js");
        let mut machine = Machine::new(source_id, Arc::new(fixtures::function_calls()))
            .with_debugger(
                &mut recorder,
                BreakPointSet::default(),
                ExecutionControls::default(),
                StepMode::Into,
            );
        assert!(matches!(machine.run(), ExecutionOutcome::Completed));
        assert_eq!(machine.global("x").unwrap().to_number(), 12.0);
    }

    #[test]
    fn cancelling_from_a_handler_stops_immediately() {
        let mut recorder = Recorder::new(|event, _| {
            if event.location.start() == Position::new(3, 2) {
                Err(Cancelled)
            } else {
                Ok(StepMode::Into)
            }
        });
        let outcome = run(fixtures::infinite_loop(), &mut recorder, &[], StepMode::Into);
        assert!(matches!(outcome, ExecutionOutcome::Cancelled));
        assert_eq!(recorder.positions(), vec!["1:0", "2:0", "3:2"]);
        assert!(matches!(
            recorder.finished,
            Some(ExecutionOutcome::Cancelled)
        ));
    }

    #[test]
    fn cancellation_token_stops_loops_without_handler_traffic() {
        let controls = ExecutionControls::default();
        let mut recorder = Recorder::new(|_, _| Ok(StepMode::None));
        controls.cancel();
        let outcome = Machine::new("main.js".into(), Arc::new(fixtures::infinite_loop()))
            .with_debugger(
                &mut recorder,
                BreakPointSet::default(),
                controls,
                StepMode::None,
            )
            .run();
        assert!(matches!(outcome, ExecutionOutcome::Cancelled));
        assert!(recorder.events.is_empty());
    }

    #[test]
    fn pause_requests_turn_the_next_check_point_into_a_step() {
        let controls = ExecutionControls::default();
        controls.request_pause();
        let pause = controls.clone();
        let mut recorder = Recorder::new(move |_, _| {
            assert!(pause.take_pause_request());
            Ok(StepMode::None)
        });
        run_with_controls(&mut recorder, controls);
        assert_eq!(recorder.positions(), vec!["1:0"]);
    }
    fn run_with_controls(recorder: &mut Recorder, controls: ExecutionControls) {
        Machine::new("main.js".into(), Arc::new(fixtures::accumulate()))
            .with_debugger(recorder, BreakPointSet::default(), controls, StepMode::None)
            .run();
    }

    #[test]
    fn runtime_errors_fail_the_execution() {
        let program: Program = serde_json::from_value(serde_json::json!({
            "type": "Program",
            "body": [{
                "type": "ThrowStatement",
                "argument": {
                    "type": "Literal",
                    "value": "boom",
                    "loc": { "start": { "line": 1, "column": 6 }, "end": { "line": 1, "column": 12 } },
                },
                "loc": { "start": { "line": 1, "column": 0 }, "end": { "line": 1, "column": 13 } },
            }],
            "loc": { "start": { "line": 1, "column": 0 }, "end": { "line": 2, "column": 0 } },
        }))
        .unwrap();
        let outcome = Machine::new("main.js".into(), Arc::new(program)).run();
        let ExecutionOutcome::Failed(error) = outcome else {
            panic!("Expected the execution to fail.");
        };
        assert_eq!(error.to_string(), "Uncaught \"boom\"");
        assert_eq!(error.location().start, Position::new(1, 0));
    }

    #[test]
    fn array_lengths_are_bounded() {
        let location = Location::default();
        let array = Value::array(vec![]);
        assert_eq!(
            set_property(&array, "length", 1e20.into(), location)
                .unwrap_err()
                .to_string(),
            "RangeError: Invalid array length",
        );
        assert!(set_property(&array, "length", (-1.0).into(), location).is_err());
        assert!(set_property(&array, "1000000000000", 1.0.into(), location).is_err());
        set_property(&array, "2", 1.0.into(), location).unwrap();
        assert_eq!(array.render(), "[undefined, undefined, 1]");
    }

    #[test]
    fn oversized_arrays_fail_the_evaluation_only() {
        let mut recorder = Recorder::new(|event, evaluator| {
            if event.location.start() != Position::new(1, 0) {
                return Ok(StepMode::None);
            }
            assert_eq!(evaluator.evaluate("a = []").unwrap().render(), "[]");
            for expression in ["a.length = 1e20", "a[1e12] = 1"] {
                let Err(EvaluationError::Runtime(error)) = evaluator.evaluate(expression) else {
                    panic!("Expected `{expression}` to fail.");
                };
                assert!(error.to_string().starts_with("RangeError: "));
            }
            Ok(StepMode::None)
        });
        let outcome = run(fixtures::accumulate(), &mut recorder, &[], StepMode::Into);
        assert!(matches!(outcome, ExecutionOutcome::Completed));
        assert_eq!(recorder.positions(), vec!["1:0"]);
    }

    #[test]
    fn binary_operations() {
        let location = Location::default();
        let add = |left: Value, right: Value| {
            binary_operation(BinaryOperator::Add, &left, &right, location).unwrap()
        };
        assert_eq!(add(1.0.into(), 2.0.into()).to_number(), 3.0);
        assert_eq!(add("a".into(), 1.0.into()).to_js_string(), "a1");
        assert!(
            binary_operation(BinaryOperator::Less, &"a".into(), &"b".into(), location)
                .unwrap()
                .is_truthy()
        );
        assert!(
            !binary_operation(BinaryOperator::Less, &f64::NAN.into(), &1.0.into(), location)
                .unwrap()
                .is_truthy()
        );
        assert!(binary_operation(BinaryOperator::In, &"x".into(), &1.0.into(), location).is_err());
    }
}
