#![warn(clippy::nursery, clippy::pedantic, unused_crate_dependencies)]
#![allow(
    clippy::match_same_arms,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines
)]

pub use self::{
    expression::{read_expression, ExpressionSyntaxError},
    position::{Location, Offset, Position, RangeOfPosition, SourceId, SourceLocation},
    provider::{EstreeJsonProvider, SyntaxError, SyntaxTreeProvider},
};

pub mod ast;
mod expression;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
mod position;
mod provider;
pub mod visitor;
