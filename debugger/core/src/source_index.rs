use crate::{
    breakpoint_collector::BreakPointCollector, error::SourceError,
    resolver::find_nearest_break_point_position,
};
use scriptdbg_syntax::{ast::Program, Offset, Position, SourceId};

/// What the debugger knows about a loaded script: its text, where its lines
/// start and where it can break.
#[derive(Clone, Debug)]
pub struct SourceRecord {
    id: SourceId,
    text: String,
    /// The start of each line plus the text length as a sentinel.
    line_offsets: Vec<Offset>,
    breakpoint_candidates: Vec<Position>,
}
impl SourceRecord {
    #[must_use]
    pub fn new(id: SourceId, text: String, program: &Program) -> Self {
        let line_offsets = line_start_offsets(&text);
        let breakpoint_candidates = BreakPointCollector::collect(program);
        Self {
            id,
            text,
            line_offsets,
            breakpoint_candidates,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &SourceId {
        &self.id
    }
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_offsets.len() - 1
    }
    #[must_use]
    pub fn breakpoint_candidates(&self) -> &[Position] {
        &self.breakpoint_candidates
    }

    /// The one-based `line` without its line break.
    pub fn line(&self, line: usize) -> Result<&str, SourceError> {
        if line == 0 || line > self.line_count() {
            return Err(SourceError::LineOutOfRange {
                line,
                line_count: self.line_count(),
            });
        }
        let line = &self.text[*self.line_offsets[line - 1]..*self.line_offsets[line]];
        let line = line
            .strip_suffix("\r\n")
            .or_else(|| line.strip_suffix('\n'))
            .or_else(|| line.strip_suffix('\r'))
            .unwrap_or(line);
        Ok(line)
    }
    pub fn line_at(&self, position: Position) -> Result<&str, SourceError> {
        self.line(position.line)
    }

    pub fn find_nearest_break_point_position(
        &self,
        position: Position,
    ) -> Result<Position, SourceError> {
        find_nearest_break_point_position(&self.id, &self.breakpoint_candidates, position)
    }
}

/// `\n`, `\r` and `\r\n` each end one line.
fn line_start_offsets(text: &str) -> Vec<Offset> {
    let bytes = text.as_bytes();
    let mut offsets = vec![Offset(0)];
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'\n' => offsets.push(Offset(index + 1)),
            b'\r' => {
                if bytes.get(index + 1) == Some(&b'\n') {
                    index += 1;
                }
                offsets.push(Offset(index + 1));
            }
            _ => {}
        }
        index += 1;
    }
    offsets.push(Offset(text.len()));
    offsets
}
