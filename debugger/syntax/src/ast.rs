//! The subset of the ESTree syntax tree that scripts may use.
//!
//! Trees are deserialized from the JSON that ESTree-compatible parsers emit
//! when asked for locations (`loc`). Node types outside this subset fail to
//! deserialize.

use crate::position::{Location, Position};
use derive_more::Deref;
use serde::Deserialize;
use std::sync::Arc;
use strum::{Display, EnumIs};

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Program {
    pub body: Vec<Statement>,
    pub loc: Location,
}

#[derive(Clone, Debug, Deref, Deserialize, PartialEq)]
pub struct Statement {
    #[deref]
    #[serde(flatten)]
    pub kind: StatementKind,
    pub loc: Location,
}
impl Statement {
    #[must_use]
    pub const fn start(&self) -> Position {
        self.loc.start
    }
}

#[derive(Clone, Debug, Deserialize, EnumIs, PartialEq)]
#[serde(tag = "type")]
pub enum StatementKind {
    VariableDeclaration {
        declarations: Vec<VariableDeclarator>,
        kind: VariableKind,
    },
    ExpressionStatement {
        expression: Expression,
    },
    BlockStatement {
        body: Vec<Statement>,
    },
    EmptyStatement,
    IfStatement {
        test: Expression,
        consequent: Box<Statement>,
        alternate: Option<Box<Statement>>,
    },
    WhileStatement {
        test: Expression,
        body: Box<Statement>,
    },
    DoWhileStatement {
        body: Box<Statement>,
        test: Expression,
    },
    ForStatement {
        init: Option<Box<ForInit>>,
        test: Option<Expression>,
        update: Option<Expression>,
        body: Box<Statement>,
    },
    ForInStatement(ForEach),
    ForOfStatement(ForEach),
    FunctionDeclaration(Arc<Function>),
    ReturnStatement {
        argument: Option<Expression>,
    },
    BreakStatement,
    ContinueStatement,
    ThrowStatement {
        argument: Expression,
    },
    DebuggerStatement,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct VariableDeclarator {
    pub id: Identifier,
    pub init: Option<Expression>,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VariableKind {
    Var,
    Let,
    Const,
}

/// The `init` part of a classic `for` loop.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ForInit {
    Declaration(Statement),
    Expression(Expression),
}
impl ForInit {
    #[must_use]
    pub const fn loc(&self) -> Location {
        match self {
            Self::Declaration(statement) => statement.loc,
            Self::Expression(expression) => expression.loc,
        }
    }
}

/// `for (left in right) body` and `for (left of right) body`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ForEach {
    pub left: Box<ForEachLeft>,
    pub right: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ForEachLeft {
    Declaration(Statement),
    Pattern(Expression),
}
impl ForEachLeft {
    #[must_use]
    pub const fn loc(&self) -> Location {
        match self {
            Self::Declaration(statement) => statement.loc,
            Self::Pattern(expression) => expression.loc,
        }
    }
}

#[derive(Clone, Debug, Deref, Deserialize, PartialEq)]
pub struct Expression {
    #[deref]
    #[serde(flatten)]
    pub kind: ExpressionKind,
    pub loc: Location,
}
impl Expression {
    #[must_use]
    pub const fn new(kind: ExpressionKind, loc: Location) -> Self {
        Self { kind, loc }
    }
}

#[derive(Clone, Debug, Deserialize, EnumIs, PartialEq)]
#[serde(tag = "type")]
pub enum ExpressionKind {
    Identifier {
        name: String,
    },
    Literal {
        value: serde_json::Value,
    },
    ThisExpression,
    ArrayExpression {
        elements: Vec<Option<Expression>>,
    },
    ObjectExpression {
        properties: Vec<Property>,
    },
    FunctionExpression(Arc<Function>),
    ArrowFunctionExpression(Arc<Function>),
    UnaryExpression {
        operator: UnaryOperator,
        argument: Box<Expression>,
    },
    UpdateExpression {
        operator: UpdateOperator,
        prefix: bool,
        argument: Box<Expression>,
    },
    BinaryExpression {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    LogicalExpression {
        operator: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    AssignmentExpression {
        operator: AssignmentOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    MemberExpression {
        object: Box<Expression>,
        property: Box<Expression>,
        computed: bool,
    },
    CallExpression {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    ConditionalExpression {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Property {
    pub key: Expression,
    pub value: Expression,
    #[serde(default)]
    pub computed: bool,
}
impl Property {
    /// The static name of this property, if it has one.
    #[must_use]
    pub fn static_name(&self) -> Option<String> {
        if self.computed {
            return None;
        }
        match &self.key.kind {
            ExpressionKind::Identifier { name } => Some(name.clone()),
            ExpressionKind::Literal {
                value: serde_json::Value::String(name),
            } => Some(name.clone()),
            ExpressionKind::Literal { value } => Some(value.to_string()),
            _ => None,
        }
    }
}

/// Shared by function declarations, function expressions and arrow
/// functions.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Function {
    pub id: Option<Identifier>,
    pub params: Vec<Identifier>,
    pub body: FunctionBody,
}
impl Function {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.id.as_ref().map(|id| id.name.as_str())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FunctionBody {
    Block(Statement),
    /// The concise body of an arrow function.
    Expression(Expression),
}
impl FunctionBody {
    #[must_use]
    pub const fn loc(&self) -> Location {
        match self {
            Self::Block(statement) => statement.loc,
            Self::Expression(expression) => expression.loc,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub loc: Location,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq)]
pub enum UnaryOperator {
    #[serde(rename = "-")]
    #[strum(serialize = "-")]
    Minus,
    #[serde(rename = "+")]
    #[strum(serialize = "+")]
    Plus,
    #[serde(rename = "!")]
    #[strum(serialize = "!")]
    Not,
    #[serde(rename = "typeof")]
    #[strum(serialize = "typeof")]
    TypeOf,
    #[serde(rename = "void")]
    #[strum(serialize = "void")]
    Void,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq)]
pub enum UpdateOperator {
    #[serde(rename = "++")]
    #[strum(serialize = "++")]
    Increment,
    #[serde(rename = "--")]
    #[strum(serialize = "--")]
    Decrement,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq)]
pub enum BinaryOperator {
    #[serde(rename = "==")]
    #[strum(serialize = "==")]
    Equal,
    #[serde(rename = "!=")]
    #[strum(serialize = "!=")]
    NotEqual,
    #[serde(rename = "===")]
    #[strum(serialize = "===")]
    StrictEqual,
    #[serde(rename = "!==")]
    #[strum(serialize = "!==")]
    StrictNotEqual,
    #[serde(rename = "<")]
    #[strum(serialize = "<")]
    Less,
    #[serde(rename = "<=")]
    #[strum(serialize = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    #[strum(serialize = ">")]
    Greater,
    #[serde(rename = ">=")]
    #[strum(serialize = ">=")]
    GreaterOrEqual,
    #[serde(rename = "+")]
    #[strum(serialize = "+")]
    Add,
    #[serde(rename = "-")]
    #[strum(serialize = "-")]
    Subtract,
    #[serde(rename = "*")]
    #[strum(serialize = "*")]
    Multiply,
    #[serde(rename = "/")]
    #[strum(serialize = "/")]
    Divide,
    #[serde(rename = "%")]
    #[strum(serialize = "%")]
    Remainder,
    #[serde(rename = "**")]
    #[strum(serialize = "**")]
    Exponent,
    #[serde(rename = "in")]
    #[strum(serialize = "in")]
    In,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq)]
pub enum LogicalOperator {
    #[serde(rename = "&&")]
    #[strum(serialize = "&&")]
    And,
    #[serde(rename = "||")]
    #[strum(serialize = "||")]
    Or,
    #[serde(rename = "??")]
    #[strum(serialize = "??")]
    NullishCoalescing,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq)]
pub enum AssignmentOperator {
    #[serde(rename = "=")]
    #[strum(serialize = "=")]
    Assign,
    #[serde(rename = "+=")]
    #[strum(serialize = "+=")]
    Add,
    #[serde(rename = "-=")]
    #[strum(serialize = "-=")]
    Subtract,
    #[serde(rename = "*=")]
    #[strum(serialize = "*=")]
    Multiply,
    #[serde(rename = "/=")]
    #[strum(serialize = "/=")]
    Divide,
    #[serde(rename = "%=")]
    #[strum(serialize = "%=")]
    Remainder,
}
impl AssignmentOperator {
    /// The binary operator a compound assignment applies before storing.
    #[must_use]
    pub const fn binary_operator(self) -> Option<BinaryOperator> {
        match self {
            Self::Assign => None,
            Self::Add => Some(BinaryOperator::Add),
            Self::Subtract => Some(BinaryOperator::Subtract),
            Self::Multiply => Some(BinaryOperator::Multiply),
            Self::Divide => Some(BinaryOperator::Divide),
            Self::Remainder => Some(BinaryOperator::Remainder),
        }
    }
}
