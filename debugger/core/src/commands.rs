use crate::error::CommandError;
use extension_trait::extension_trait;
use scriptdbg_syntax::Position;
use strum::{EnumIter, IntoEnumIterator};

#[derive(Clone, Copy, Debug, EnumIter, Eq, Hash, PartialEq)]
pub enum Command {
    Continue,
    Into,
    Over,
    Out,
    Pause,
    Break,
    TemporaryBreak,
    Delete,
    Clear,
    Breaks,
    Stack,
    Scopes,
    Scope,
    Eval,
    Help,
    Exit,
}
impl Command {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Into => "into",
            Self::Over => "over",
            Self::Out => "out",
            Self::Pause => "pause",
            Self::Break => "break",
            Self::TemporaryBreak => "tbreak",
            Self::Delete => "delete",
            Self::Clear => "clear",
            Self::Breaks => "breaks",
            Self::Stack => "stack",
            Self::Scopes => "scopes",
            Self::Scope => "scope",
            Self::Eval => "eval",
            Self::Help => "help",
            Self::Exit => "exit",
        }
    }
    #[must_use]
    pub const fn short_name(self) -> Option<&'static str> {
        match self {
            Self::Continue => Some("c"),
            Self::Into => Some("i"),
            Self::Over => Some("o"),
            Self::Out => Some("u"),
            Self::Pause => Some("p"),
            Self::Break => Some("b"),
            Self::TemporaryBreak => Some("tb"),
            Self::Eval => Some("!"),
            Self::Help => Some("h"),
            Self::Exit => Some("x"),
            Self::Delete
            | Self::Clear
            | Self::Breaks
            | Self::Stack
            | Self::Scopes
            | Self::Scope => None,
        }
    }
    #[must_use]
    pub const fn parameters(self) -> Option<&'static str> {
        match self {
            Self::Break | Self::TemporaryBreak => Some("<line>[:column] [if <condition>]"),
            Self::Delete | Self::Scope => Some("<index>"),
            Self::Eval => Some("<expression>"),
            _ => None,
        }
    }
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Continue => "Continue running",
            Self::Into => "Step into",
            Self::Over => "Step over",
            Self::Out => "Step out",
            Self::Pause => "Pause the running script",
            Self::Break => "Set breakpoint",
            Self::TemporaryBreak => "Set temporary breakpoint (removed after hit)",
            Self::Delete => "Delete breakpoint",
            Self::Clear => "Clear breakpoints",
            Self::Breaks => "List breakpoints",
            Self::Stack => "List current call stack",
            Self::Scopes => "List current scope chain",
            Self::Scope => "List bindings in scope",
            Self::Eval => "Evaluate expression",
            Self::Help => "Help",
            Self::Exit => "Exit debugger",
        }
    }

    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        Self::iter().find(|command| command.name() == name || command.short_name() == Some(name))
    }

    #[must_use]
    pub fn help_line(self) -> String {
        format!(
            "{:<10} {:<5} {:<36} {}",
            self.name(),
            self.short_name().unwrap_or_default(),
            self.parameters().unwrap_or_default(),
            self.description(),
        )
    }
}

/// A command line split into the command and its (trimmed) arguments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Invocation<'a> {
    pub command: Command,
    pub arguments: &'a str,
}

/// `None` for blank lines.
pub fn parse_invocation(line: &str) -> Result<Option<Invocation>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (name, arguments) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line, ""));
    let command =
        Command::lookup(name).ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
    Ok(Some(Invocation {
        command,
        arguments: arguments.trim(),
    }))
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BreakPointRequest {
    pub position: Position,
    pub condition: Option<String>,
}

/// `<line>[:column] [if <condition>]`
pub fn parse_break_point(arguments: &str) -> Result<BreakPointRequest, CommandError> {
    if arguments.is_empty() {
        return Err(CommandError::MissingArgument(
            "You need to specify a breakpoint position, e.g. 'break 5' or 'break 5:4'",
        ));
    }
    let (position, condition) = match arguments.split_once(" if ") {
        Some((position, condition)) => (position.trim(), Some(condition.trim())),
        None => (arguments, None),
    };
    if condition.is_some_and(str::is_empty) {
        return Err(CommandError::MissingArgument(
            "You need to specify a condition after 'if'",
        ));
    }

    let (line, column) = position.split_once(':').unwrap_or((position, "0"));
    let line = line
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidNumber("Breakpoint line should be an integer"))?;
    let column = column
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidNumber("Breakpoint column should be an integer"))?;
    Ok(BreakPointRequest {
        position: Position::new(line, column),
        condition: condition.map(ToString::to_string),
    })
}

/// An index into a list of `count` entries.
pub fn parse_index(arguments: &str, count: usize) -> Result<usize, CommandError> {
    if arguments.is_empty() {
        return Err(CommandError::MissingArgument("You need to specify an index"));
    }
    let index: i64 = arguments
        .parse()
        .map_err(|_| CommandError::InvalidNumber("Index must be an integer"))?;
    usize::try_from(index)
        .ok()
        .filter(|it| *it < count)
        .ok_or_else(|| CommandError::index_out_of_range(index, count))
}

#[extension_trait]
pub impl CropText for str {
    /// Keeps the end, e.g., of a long path.
    fn crop_start(&self, max_length: usize) -> String {
        let length = self.chars().count();
        if length <= max_length {
            return self.to_string();
        }
        let kept = self.chars().skip((length + 1).saturating_sub(max_length));
        format!("…{}", kept.collect::<String>())
    }
    fn crop_end(&self, max_length: usize) -> String {
        if self.chars().count() <= max_length {
            return self.to_string();
        }
        let kept = self.chars().take(max_length.saturating_sub(1));
        format!("{}…", kept.collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_by_name_and_short_name() {
        assert_eq!(Command::lookup("continue"), Some(Command::Continue));
        assert_eq!(Command::lookup("tb"), Some(Command::TemporaryBreak));
        assert_eq!(Command::lookup("!"), Some(Command::Eval));
        assert_eq!(Command::lookup("delete"), Some(Command::Delete));
        assert_eq!(Command::lookup("d"), None);
    }

    #[test]
    fn names_are_unique() {
        let mut names = Command::iter()
            .flat_map(|it| [Some(it.name()), it.short_name()])
            .flatten()
            .collect::<Vec<_>>();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
    }

    #[test]
    fn invocations() {
        assert_eq!(parse_invocation("   ").unwrap(), None);
        assert_eq!(
            parse_invocation("! a +  b ").unwrap(),
            Some(Invocation {
                command: Command::Eval,
                arguments: "a +  b",
            }),
        );
        assert_eq!(
            parse_invocation("jump 3").unwrap_err().to_string(),
            "Unknown command: jump",
        );
    }

    #[test]
    fn break_point_arguments() {
        assert_eq!(
            parse_break_point("5").unwrap(),
            BreakPointRequest {
                position: Position::new(5, 0),
                condition: None,
            },
        );
        assert_eq!(
            parse_break_point("5:4 if i == 2").unwrap(),
            BreakPointRequest {
                position: Position::new(5, 4),
                condition: Some("i == 2".to_string()),
            },
        );
        assert!(matches!(
            parse_break_point(""),
            Err(CommandError::MissingArgument(_)),
        ));
        assert_eq!(
            parse_break_point("five").unwrap_err().to_string(),
            "Breakpoint line should be an integer",
        );
        assert_eq!(
            parse_break_point("5:x").unwrap_err().to_string(),
            "Breakpoint column should be an integer",
        );
    }

    #[test]
    fn indexes() {
        assert_eq!(parse_index("1", 3).unwrap(), 1);
        assert_eq!(
            parse_index("0", 0).unwrap_err().to_string(),
            "Index 0 out of range (no entries in list)",
        );
        assert_eq!(
            parse_index("-1", 1).unwrap_err().to_string(),
            "Index -1 out of range (0)",
        );
        assert_eq!(
            parse_index("x", 1).unwrap_err().to_string(),
            "Index must be an integer",
        );
    }

    #[test]
    fn cropping() {
        assert_eq!("short".crop_start(20), "short");
        assert_eq!("/a/very/long/path/to/main.js".crop_start(10), "…o/main.js");
        assert_eq!("abcdef".crop_end(4), "abc…");
    }
}
