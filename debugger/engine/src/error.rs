use crate::value::Value;
use scriptdbg_syntax::Location;
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum RuntimeError {
    #[error("ReferenceError: {name} is not defined")]
    Reference { name: String, location: Location },

    #[error("TypeError: {message}")]
    Type { message: String, location: Location },

    #[error("TypeError: Assignment to constant variable `{name}`.")]
    ConstAssignment { name: String, location: Location },

    #[error("Uncaught {}", .value.render())]
    Thrown { value: Value, location: Location },

    #[error("RangeError: {message}")]
    Range { message: String, location: Location },

    #[error("RangeError: Maximum call stack size exceeded")]
    StackOverflow { location: Location },

    #[error("{feature} is not supported")]
    Unsupported {
        feature: &'static str,
        location: Location,
    },
}
impl RuntimeError {
    #[must_use]
    pub const fn location(&self) -> Location {
        match self {
            Self::Reference { location, .. }
            | Self::Type { location, .. }
            | Self::Range { location, .. }
            | Self::ConstAssignment { location, .. }
            | Self::Thrown { location, .. }
            | Self::StackOverflow { location }
            | Self::Unsupported { location, .. } => *location,
        }
    }

    pub(crate) fn type_error(message: impl Into<String>, location: Location) -> Self {
        Self::Type {
            message: message.into(),
            location,
        }
    }
}
