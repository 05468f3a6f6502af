//! Reads the single-line expressions typed at the debugger prompt (`eval`
//! and breakpoint conditions) into the same tree the engine executes.
//!
//! Locations refer to line 1 of the expression text.

use crate::{
    ast::{
        AssignmentOperator, BinaryOperator, Expression, ExpressionKind, LogicalOperator,
        UnaryOperator,
    },
    position::{Location, Position},
};
use thiserror::Error;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message} (at column {column})")]
pub struct ExpressionSyntaxError {
    pub message: String,
    pub column: usize,
}
impl ExpressionSyntaxError {
    fn new(message: impl Into<String>, column: usize) -> Self {
        Self {
            message: message.into(),
            column,
        }
    }
}

pub fn read_expression(source: &str) -> Result<Expression, ExpressionSyntaxError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, index: 0 };
    let expression = parser.assignment()?;
    let rest = parser.peek();
    if rest.kind != TokenKind::End {
        return Err(ExpressionSyntaxError::new(
            format!("Unexpected {}", rest.kind),
            rest.start,
        ));
    }
    Ok(expression)
}

#[derive(Clone, Debug, PartialEq)]
enum TokenKind {
    Number(f64),
    String(String),
    Identifier(String),
    Punctuator(&'static str),
    End,
}
impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Number(number) => write!(f, "number {number}"),
            Self::String(string) => write!(f, "string {string:?}"),
            Self::Identifier(name) => write!(f, "identifier `{name}`"),
            Self::Punctuator(punctuator) => write!(f, "`{punctuator}`"),
            Self::End => write!(f, "end of expression"),
        }
    }
}

#[derive(Clone, Debug)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

/// Longest first.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "**", "==", "!=", "<=", ">=", "&&", "||", "??", "+=", "-=", "*=", "/=", "%=",
    "(", ")", "[", "]", ",", ".", "?", ":", "+", "-", "*", "/", "%", "<", ">", "!", "=",
];

fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionSyntaxError> {
    let chars = source.chars().collect::<Vec<_>>();
    let mut tokens = vec![];
    let mut index = 0;
    while index < chars.len() {
        let char = chars[index];
        let start = index;
        if char.is_whitespace() {
            index += 1;
            continue;
        }

        let kind = if char.is_ascii_digit() {
            while index < chars.len() && (chars[index].is_ascii_digit() || chars[index] == '.') {
                index += 1;
            }
            if index < chars.len() && matches!(chars[index], 'e' | 'E') {
                index += 1;
                if index < chars.len() && matches!(chars[index], '+' | '-') {
                    index += 1;
                }
                while index < chars.len() && chars[index].is_ascii_digit() {
                    index += 1;
                }
            }
            let text = chars[start..index].iter().collect::<String>();
            let number = text
                .parse::<f64>()
                .map_err(|_| ExpressionSyntaxError::new(format!("Invalid number `{text}`"), start))?;
            TokenKind::Number(number)
        } else if char == '"' || char == '\'' {
            index += 1;
            let mut string = String::new();
            loop {
                let Some(&next) = chars.get(index) else {
                    return Err(ExpressionSyntaxError::new("Unterminated string", start));
                };
                index += 1;
                match next {
                    _ if next == char => break,
                    '\\' => {
                        let Some(&escaped) = chars.get(index) else {
                            return Err(ExpressionSyntaxError::new("Unterminated string", start));
                        };
                        index += 1;
                        string.push(match escaped {
                            'n' => '\n',
                            'r' => '\r',
                            't' => '\t',
                            '0' => '\0',
                            other => other,
                        });
                    }
                    other => string.push(other),
                }
            }
            TokenKind::String(string)
        } else if char.is_alphabetic() || char == '_' || char == '$' {
            while index < chars.len()
                && (chars[index].is_alphanumeric() || chars[index] == '_' || chars[index] == '$')
            {
                index += 1;
            }
            TokenKind::Identifier(chars[start..index].iter().collect())
        } else {
            let punctuator = PUNCTUATORS
                .iter()
                .copied()
                .find(|punctuator| {
                    punctuator
                        .chars()
                        .enumerate()
                        .all(|(offset, it)| chars.get(index + offset) == Some(&it))
                })
                .ok_or_else(|| {
                    ExpressionSyntaxError::new(format!("Unexpected character `{char}`"), start)
                })?;
            index += punctuator.chars().count();
            TokenKind::Punctuator(punctuator)
        };
        tokens.push(Token {
            kind,
            start,
            end: index,
        });
    }
    tokens.push(Token {
        kind: TokenKind::End,
        start: chars.len(),
        end: chars.len(),
    });
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
}
impl Parser {
    fn peek(&self) -> &Token {
        // `tokenize` always ends with `End`, which is never consumed.
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }
    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::End {
            self.index += 1;
        }
        token
    }
    fn is_punctuator(&self, punctuator: &str) -> bool {
        matches!(self.peek().kind, TokenKind::Punctuator(it) if it == punctuator)
    }
    fn expect(&mut self, punctuator: &str) -> Result<Token, ExpressionSyntaxError> {
        if self.is_punctuator(punctuator) {
            Ok(self.next())
        } else {
            let token = self.peek();
            Err(ExpressionSyntaxError::new(
                format!("Expected `{punctuator}`, found {}", token.kind),
                token.start,
            ))
        }
    }

    fn assignment(&mut self) -> Result<Expression, ExpressionSyntaxError> {
        let left = self.conditional()?;
        let operator = match self.peek().kind {
            TokenKind::Punctuator("=") => AssignmentOperator::Assign,
            TokenKind::Punctuator("+=") => AssignmentOperator::Add,
            TokenKind::Punctuator("-=") => AssignmentOperator::Subtract,
            TokenKind::Punctuator("*=") => AssignmentOperator::Multiply,
            TokenKind::Punctuator("/=") => AssignmentOperator::Divide,
            TokenKind::Punctuator("%=") => AssignmentOperator::Remainder,
            _ => return Ok(left),
        };
        if !left.is_identifier() && !left.is_member_expression() {
            return Err(ExpressionSyntaxError::new(
                "Invalid assignment target",
                left.loc.start.column,
            ));
        }
        self.next();
        let right = self.assignment()?;
        let loc = span(&left, &right);
        Ok(Expression::new(
            ExpressionKind::AssignmentExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
            loc,
        ))
    }

    fn conditional(&mut self) -> Result<Expression, ExpressionSyntaxError> {
        let test = self.binary(1)?;
        if !self.is_punctuator("?") {
            return Ok(test);
        }
        self.next();
        let consequent = self.assignment()?;
        self.expect(":")?;
        let alternate = self.assignment()?;
        let loc = span(&test, &alternate);
        Ok(Expression::new(
            ExpressionKind::ConditionalExpression {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            loc,
        ))
    }

    fn infix_operator(&self) -> Option<InfixOperator> {
        match &self.peek().kind {
            TokenKind::Punctuator(punctuator) => InfixOperator::from_punctuator(punctuator),
            TokenKind::Identifier(name) if name == "in" => {
                Some(InfixOperator::Binary(BinaryOperator::In))
            }
            _ => None,
        }
    }

    fn binary(&mut self, min_precedence: u8) -> Result<Expression, ExpressionSyntaxError> {
        let mut left = self.unary()?;
        while let Some(operator) = self.infix_operator() {
            let precedence = operator.precedence();
            if precedence < min_precedence {
                break;
            }
            self.next();
            let right = if operator.is_right_associative() {
                self.binary(precedence)?
            } else {
                self.binary(precedence + 1)?
            };
            let loc = span(&left, &right);
            let (left_box, right_box) = (Box::new(left), Box::new(right));
            let kind = match operator {
                InfixOperator::Binary(operator) => ExpressionKind::BinaryExpression {
                    operator,
                    left: left_box,
                    right: right_box,
                },
                InfixOperator::Logical(operator) => ExpressionKind::LogicalExpression {
                    operator,
                    left: left_box,
                    right: right_box,
                },
            };
            left = Expression::new(kind, loc);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expression, ExpressionSyntaxError> {
        let token = self.peek().clone();
        let operator = match &token.kind {
            TokenKind::Punctuator("-") => UnaryOperator::Minus,
            TokenKind::Punctuator("+") => UnaryOperator::Plus,
            TokenKind::Punctuator("!") => UnaryOperator::Not,
            TokenKind::Identifier(name) if name == "typeof" => UnaryOperator::TypeOf,
            TokenKind::Identifier(name) if name == "void" => UnaryOperator::Void,
            _ => return self.postfix(),
        };
        self.next();
        let argument = self.unary()?;
        let loc = location(token.start, argument.loc.end.column);
        Ok(Expression::new(
            ExpressionKind::UnaryExpression {
                operator,
                argument: Box::new(argument),
            },
            loc,
        ))
    }

    fn postfix(&mut self) -> Result<Expression, ExpressionSyntaxError> {
        let mut expression = self.primary()?;
        loop {
            if self.is_punctuator(".") {
                self.next();
                let token = self.next();
                let TokenKind::Identifier(name) = token.kind else {
                    return Err(ExpressionSyntaxError::new(
                        format!("Expected a property name, found {}", token.kind),
                        token.start,
                    ));
                };
                let property = Expression::new(
                    ExpressionKind::Identifier { name },
                    location(token.start, token.end),
                );
                let loc = span(&expression, &property);
                expression = Expression::new(
                    ExpressionKind::MemberExpression {
                        object: Box::new(expression),
                        property: Box::new(property),
                        computed: false,
                    },
                    loc,
                );
            } else if self.is_punctuator("[") {
                self.next();
                let property = self.assignment()?;
                let close = self.expect("]")?;
                let loc = location(expression.loc.start.column, close.end);
                expression = Expression::new(
                    ExpressionKind::MemberExpression {
                        object: Box::new(expression),
                        property: Box::new(property),
                        computed: true,
                    },
                    loc,
                );
            } else if self.is_punctuator("(") {
                self.next();
                let (arguments, close) = self.list(")")?;
                let loc = location(expression.loc.start.column, close.end);
                expression = Expression::new(
                    ExpressionKind::CallExpression {
                        callee: Box::new(expression),
                        arguments,
                    },
                    loc,
                );
            } else {
                break;
            }
        }
        Ok(expression)
    }

    fn primary(&mut self) -> Result<Expression, ExpressionSyntaxError> {
        let token = self.next();
        let loc = location(token.start, token.end);
        let kind = match token.kind {
            TokenKind::Number(number) => {
                let value = serde_json::Number::from_f64(number).ok_or_else(|| {
                    ExpressionSyntaxError::new("Number is out of range", token.start)
                })?;
                ExpressionKind::Literal {
                    value: serde_json::Value::Number(value),
                }
            }
            TokenKind::String(string) => ExpressionKind::Literal {
                value: serde_json::Value::String(string),
            },
            TokenKind::Identifier(name) => match name.as_str() {
                "true" => ExpressionKind::Literal {
                    value: serde_json::Value::Bool(true),
                },
                "false" => ExpressionKind::Literal {
                    value: serde_json::Value::Bool(false),
                },
                "null" => ExpressionKind::Literal {
                    value: serde_json::Value::Null,
                },
                "this" => ExpressionKind::ThisExpression,
                _ => ExpressionKind::Identifier { name },
            },
            TokenKind::Punctuator("(") => {
                let inner = self.assignment()?;
                self.expect(")")?;
                return Ok(inner);
            }
            TokenKind::Punctuator("[") => {
                let (elements, close) = self.list("]")?;
                return Ok(Expression::new(
                    ExpressionKind::ArrayExpression {
                        elements: elements.into_iter().map(Some).collect(),
                    },
                    location(token.start, close.end),
                ));
            }
            kind => {
                return Err(ExpressionSyntaxError::new(
                    format!("Unexpected {kind}"),
                    token.start,
                ))
            }
        };
        Ok(Expression::new(kind, loc))
    }

    /// Comma-separated expressions up to and including `close`.
    fn list(&mut self, close: &str) -> Result<(Vec<Expression>, Token), ExpressionSyntaxError> {
        let mut items = vec![];
        while !self.is_punctuator(close) {
            items.push(self.assignment()?);
            if !self.is_punctuator(close) {
                self.expect(",")?;
            }
        }
        let close = self.expect(close)?;
        Ok((items, close))
    }
}

#[derive(Clone, Copy)]
enum InfixOperator {
    Binary(BinaryOperator),
    Logical(LogicalOperator),
}
impl InfixOperator {
    fn from_punctuator(punctuator: &str) -> Option<Self> {
        let operator = match punctuator {
            "??" => Self::Logical(LogicalOperator::NullishCoalescing),
            "||" => Self::Logical(LogicalOperator::Or),
            "&&" => Self::Logical(LogicalOperator::And),
            "==" => Self::Binary(BinaryOperator::Equal),
            "!=" => Self::Binary(BinaryOperator::NotEqual),
            "===" => Self::Binary(BinaryOperator::StrictEqual),
            "!==" => Self::Binary(BinaryOperator::StrictNotEqual),
            "<" => Self::Binary(BinaryOperator::Less),
            "<=" => Self::Binary(BinaryOperator::LessOrEqual),
            ">" => Self::Binary(BinaryOperator::Greater),
            ">=" => Self::Binary(BinaryOperator::GreaterOrEqual),
            "+" => Self::Binary(BinaryOperator::Add),
            "-" => Self::Binary(BinaryOperator::Subtract),
            "*" => Self::Binary(BinaryOperator::Multiply),
            "/" => Self::Binary(BinaryOperator::Divide),
            "%" => Self::Binary(BinaryOperator::Remainder),
            "**" => Self::Binary(BinaryOperator::Exponent),
            _ => return None,
        };
        Some(operator)
    }
    const fn precedence(self) -> u8 {
        match self {
            Self::Logical(LogicalOperator::NullishCoalescing) => 1,
            Self::Logical(LogicalOperator::Or) => 2,
            Self::Logical(LogicalOperator::And) => 3,
            Self::Binary(
                BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::StrictEqual
                | BinaryOperator::StrictNotEqual,
            ) => 4,
            Self::Binary(
                BinaryOperator::Less
                | BinaryOperator::LessOrEqual
                | BinaryOperator::Greater
                | BinaryOperator::GreaterOrEqual
                | BinaryOperator::In,
            ) => 5,
            Self::Binary(BinaryOperator::Add | BinaryOperator::Subtract) => 6,
            Self::Binary(
                BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Remainder,
            ) => 7,
            Self::Binary(BinaryOperator::Exponent) => 8,
        }
    }
    const fn is_right_associative(self) -> bool {
        matches!(self, Self::Binary(BinaryOperator::Exponent))
    }
}

const fn span(first: &Expression, last: &Expression) -> Location {
    Location::new(first.loc.start, last.loc.end)
}
const fn location(start: usize, end: usize) -> Location {
    Location::new(Position::new(1, start), Position::new(1, end))
}
