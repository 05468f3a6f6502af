use colored::{Color, Colorize};
use scriptdbg_core::{render_location, PauseNotice};
use scriptdbg_engine::ExecutionOutcome;
use scriptdbg_syntax::Position;
use std::{
    fmt::Display,
    io::{self, Write},
};

const BANNER: Color = Color::TrueColor {
    r: 0xff,
    g: 0xcc,
    b: 0x00,
};
const PROMPT: Color = Color::TrueColor {
    r: 0x88,
    g: 0xbb,
    b: 0xff,
};
const ERROR: Color = Color::TrueColor {
    r: 0xdd,
    g: 0x66,
    b: 0x66,
};
const LOCATION: Color = Color::TrueColor {
    r: 0x90,
    g: 0x90,
    b: 0x90,
};
const MARKER: Color = Color::TrueColor {
    r: 0x88,
    g: 0xcc,
    b: 0x55,
};

pub fn print_banner() {
    println!(
        "{}",
        format!("Simple Script Debugger v{}", env!("CARGO_PKG_VERSION")).color(BANNER),
    );
    println!("Type 'help' for a list of commands.");
}

pub fn print_prompt() {
    print!("{}", "> ".color(PROMPT));
    let _ = io::stdout().flush();
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

pub fn print_error(error: &impl Display) {
    println!("{}", error.to_string().color(ERROR));
}

/// The paused location followed by its source line with a marker at the
/// paused column.
pub fn print_pause(notice: &PauseNotice) {
    let start = notice.location.start();
    let (before, after) = split_at_column(&notice.line, start);
    println!(
        "{}  {before}{}{after}",
        render_location(&notice.location.source_id, start).color(LOCATION),
        "»".color(MARKER),
    );
}

pub fn print_outcome(outcome: &ExecutionOutcome) {
    match outcome {
        ExecutionOutcome::Completed => println!("Execution reached end of script."),
        ExecutionOutcome::Failed(error) => print_error(&format!("The script failed: {error}")),
        ExecutionOutcome::Cancelled => println!("Execution cancelled."),
    }
}

/// Columns past the end of the line put the marker at the end.
fn split_at_column(line: &str, position: Position) -> (&str, &str) {
    let index = line
        .char_indices()
        .nth(position.column)
        .map_or(line.len(), |(index, _)| index);
    line.split_at(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_positions() {
        assert_eq!(
            split_at_column("  return a + b;", Position::new(2, 2)),
            ("  ", "return a + b;"),
        );
        assert_eq!(
            split_at_column("x = \"ä\"; y", Position::new(1, 9)),
            ("x = \"ä\"; ", "y"),
        );
        assert_eq!(split_at_column("}", Position::new(3, 1)), ("}", ""));
        assert_eq!(split_at_column("", Position::new(3, 4)), ("", ""));
    }
}
