use derive_more::{Deref, DerefMut, Display, From};
use extension_trait::extension_trait;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    ops::Range,
};

/// The offset of a character in a source text as the number of bytes
/// preceding it in UTF-8 encoding.
#[derive(
    Clone, Copy, Debug, Default, Deref, DerefMut, Eq, From, Hash, Ord, PartialEq, PartialOrd,
)]
#[from(forward)]
pub struct Offset(pub usize);

/// A position in a script, as reported by ESTree `loc` information.
///
/// Ordering is lexicographic by `(line, column)`, which is what the derived
/// [`Ord`] gives us because of the field order.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct Position {
    /// One-based line number.
    pub line: usize,
    /// Zero-based column (counting characters).
    pub column: usize,
}
impl Position {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}
impl Display for Position {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
#[extension_trait]
pub impl RangeOfPosition for Range<Position> {
    fn format(&self) -> String {
        format!("{} – {}", self.start, self.end)
    }
}

/// The `loc` of a syntax tree node.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}
impl Location {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
    /// An empty location at `position`, used for check points that are not
    /// the start of a node (e.g., the end of a function body).
    #[must_use]
    pub const fn at(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }
}
impl Display for Location {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", (self.start..self.end).format())
    }
}

/// Identifies a loaded script.
#[derive(
    Clone, Debug, Deserialize, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct SourceId(String);
impl SourceId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A location inside a specific script.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SourceLocation {
    pub source_id: SourceId,
    pub location: Location,
}
impl SourceLocation {
    #[must_use]
    pub const fn new(source_id: SourceId, location: Location) -> Self {
        Self {
            source_id,
            location,
        }
    }
    #[must_use]
    pub const fn start(&self) -> Position {
        self.location.start
    }
}
impl Display for SourceLocation {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} {}", self.source_id, self.location.start)
    }
}
