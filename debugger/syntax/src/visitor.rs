//! Depth-first traversal of a [`Program`].
//!
//! Implementors override the `visit_*` methods they care about and call the
//! matching `walk_*` function to keep descending.

use crate::ast::{
    Expression, ExpressionKind, ForEach, ForEachLeft, ForInit, Function, FunctionBody, Program,
    Statement, StatementKind,
};

pub trait Visitor {
    fn visit_program(&mut self, program: &Program) {
        walk_program(self, program);
    }
    fn visit_statement(&mut self, statement: &Statement) {
        walk_statement(self, statement);
    }
    fn visit_expression(&mut self, expression: &Expression) {
        walk_expression(self, expression);
    }
    /// Called for function declarations, function expressions and arrow
    /// functions.
    fn visit_function(&mut self, function: &Function) {
        walk_function(self, function);
    }
    /// The `init` of a classic `for` loop. Declarations are not visited as
    /// statements by default.
    fn visit_for_init(&mut self, init: &ForInit) {
        walk_for_init(self, init);
    }
    fn visit_for_each_left(&mut self, left: &ForEachLeft) {
        walk_for_each_left(self, left);
    }
}

pub fn walk_program<V: Visitor + ?Sized>(visitor: &mut V, program: &Program) {
    for statement in &program.body {
        visitor.visit_statement(statement);
    }
}

pub fn walk_statement<V: Visitor + ?Sized>(visitor: &mut V, statement: &Statement) {
    match &statement.kind {
        StatementKind::VariableDeclaration { .. } => walk_declarations(visitor, statement),
        StatementKind::ExpressionStatement { expression } => visitor.visit_expression(expression),
        StatementKind::BlockStatement { body } => {
            for statement in body {
                visitor.visit_statement(statement);
            }
        }
        StatementKind::EmptyStatement
        | StatementKind::BreakStatement
        | StatementKind::ContinueStatement
        | StatementKind::DebuggerStatement => {}
        StatementKind::IfStatement {
            test,
            consequent,
            alternate,
        } => {
            visitor.visit_expression(test);
            visitor.visit_statement(consequent);
            if let Some(alternate) = alternate {
                visitor.visit_statement(alternate);
            }
        }
        StatementKind::WhileStatement { test, body } => {
            visitor.visit_expression(test);
            visitor.visit_statement(body);
        }
        StatementKind::DoWhileStatement { body, test } => {
            visitor.visit_statement(body);
            visitor.visit_expression(test);
        }
        StatementKind::ForStatement {
            init,
            test,
            update,
            body,
        } => {
            if let Some(init) = init {
                visitor.visit_for_init(init);
            }
            if let Some(test) = test {
                visitor.visit_expression(test);
            }
            if let Some(update) = update {
                visitor.visit_expression(update);
            }
            visitor.visit_statement(body);
        }
        StatementKind::ForInStatement(for_each) | StatementKind::ForOfStatement(for_each) => {
            walk_for_each(visitor, for_each);
        }
        StatementKind::FunctionDeclaration(function) => visitor.visit_function(function),
        StatementKind::ReturnStatement { argument } => {
            if let Some(argument) = argument {
                visitor.visit_expression(argument);
            }
        }
        StatementKind::ThrowStatement { argument } => visitor.visit_expression(argument),
    }
}

/// Visits the initializers of a variable declaration without treating the
/// declaration itself as a statement.
pub fn walk_declarations<V: Visitor + ?Sized>(visitor: &mut V, declaration: &Statement) {
    if let StatementKind::VariableDeclaration { declarations, .. } = &declaration.kind {
        for init in declarations.iter().filter_map(|it| it.init.as_ref()) {
            visitor.visit_expression(init);
        }
    }
}

pub fn walk_for_each<V: Visitor + ?Sized>(visitor: &mut V, for_each: &ForEach) {
    visitor.visit_for_each_left(&for_each.left);
    visitor.visit_expression(&for_each.right);
    visitor.visit_statement(&for_each.body);
}

pub fn walk_for_init<V: Visitor + ?Sized>(visitor: &mut V, init: &ForInit) {
    match init {
        ForInit::Declaration(declaration) => walk_declarations(visitor, declaration),
        ForInit::Expression(expression) => visitor.visit_expression(expression),
    }
}

pub fn walk_for_each_left<V: Visitor + ?Sized>(visitor: &mut V, left: &ForEachLeft) {
    match left {
        ForEachLeft::Declaration(declaration) => walk_declarations(visitor, declaration),
        ForEachLeft::Pattern(pattern) => visitor.visit_expression(pattern),
    }
}

pub fn walk_function<V: Visitor + ?Sized>(visitor: &mut V, function: &Function) {
    match &function.body {
        FunctionBody::Block(body) => visitor.visit_statement(body),
        FunctionBody::Expression(body) => visitor.visit_expression(body),
    }
}

pub fn walk_expression<V: Visitor + ?Sized>(visitor: &mut V, expression: &Expression) {
    match &expression.kind {
        ExpressionKind::Identifier { .. }
        | ExpressionKind::Literal { .. }
        | ExpressionKind::ThisExpression => {}
        ExpressionKind::ArrayExpression { elements } => {
            for element in elements.iter().flatten() {
                visitor.visit_expression(element);
            }
        }
        ExpressionKind::ObjectExpression { properties } => {
            for property in properties {
                if property.computed {
                    visitor.visit_expression(&property.key);
                }
                visitor.visit_expression(&property.value);
            }
        }
        ExpressionKind::FunctionExpression(function)
        | ExpressionKind::ArrowFunctionExpression(function) => visitor.visit_function(function),
        ExpressionKind::UnaryExpression { argument, .. }
        | ExpressionKind::UpdateExpression { argument, .. } => visitor.visit_expression(argument),
        ExpressionKind::BinaryExpression { left, right, .. }
        | ExpressionKind::LogicalExpression { left, right, .. }
        | ExpressionKind::AssignmentExpression { left, right, .. } => {
            visitor.visit_expression(left);
            visitor.visit_expression(right);
        }
        ExpressionKind::MemberExpression {
            object,
            property,
            computed,
        } => {
            visitor.visit_expression(object);
            if *computed {
                visitor.visit_expression(property);
            }
        }
        ExpressionKind::CallExpression { callee, arguments } => {
            visitor.visit_expression(callee);
            for argument in arguments {
                visitor.visit_expression(argument);
            }
        }
        ExpressionKind::ConditionalExpression {
            test,
            consequent,
            alternate,
        } => {
            visitor.visit_expression(test);
            visitor.visit_expression(consequent);
            visitor.visit_expression(alternate);
        }
    }
}
