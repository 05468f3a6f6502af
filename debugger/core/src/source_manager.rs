use crate::{error::ProgramError, source_index::SourceRecord};
use rustc_hash::FxHashMap;
use scriptdbg_syntax::{ast::Program, Position, SourceId, SourceLocation};
use tracing::debug;

/// The loaded scripts, by source ID.
#[derive(Debug, Default)]
pub struct SourceManager {
    records: FxHashMap<SourceId, SourceRecord>,
}
impl SourceManager {
    pub fn load(&mut self, source_id: SourceId, text: String, program: &Program) -> &SourceRecord {
        let record = SourceRecord::new(source_id.clone(), text, program);
        debug!(
            "Loaded {source_id}: {} lines, {} breakpoint positions.",
            record.line_count(),
            record.breakpoint_candidates().len(),
        );
        self.records.insert(source_id.clone(), record);
        &self.records[&source_id]
    }

    pub fn get(&self, source_id: &SourceId) -> Result<&SourceRecord, ProgramError> {
        self.records
            .get(source_id)
            .ok_or_else(|| ProgramError::UnknownSource(source_id.clone()))
    }

    pub fn find_nearest_break_point_position(
        &self,
        source_id: &SourceId,
        position: Position,
    ) -> Result<Position, ProgramError> {
        Ok(self
            .get(source_id)?
            .find_nearest_break_point_position(position)?)
    }

    /// The source line containing the start of `location`.
    pub fn line(&self, location: &SourceLocation) -> Result<&str, ProgramError> {
        if location.source_id.as_str().is_empty() {
            return Err(ProgramError::LocationWithoutSource);
        }
        self.get(&location.source_id)?
            .line_at(location.start())
            .map_err(ProgramError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptdbg_syntax::{fixtures, Location};

    fn manager() -> SourceManager {
        let mut manager = SourceManager::default();
        manager.load(
            "main.js".into(),
            fixtures::FUNCTION_CALLS.to_string(),
            &fixtures::function_calls(),
        );
        manager
    }

    #[test]
    fn lines_by_location() {
        let manager = manager();
        let location = SourceLocation::new(
            "main.js".into(),
            Location::at(Position::new(2, 2)),
        );
        assert_eq!(manager.line(&location).unwrap(), "  return a + b;");

        let without_source = SourceLocation::new("".into(), Location::default());
        assert!(matches!(
            manager.line(&without_source),
            Err(ProgramError::LocationWithoutSource),
        ));
        let unknown = SourceLocation::new("other.js".into(), Location::default());
        assert!(matches!(
            manager.line(&unknown),
            Err(ProgramError::UnknownSource(_)),
        ));
    }

    #[test]
    fn break_far_past_the_end_resolves_to_the_last_candidate() {
        let manager = manager();
        assert_eq!(
            manager
                .find_nearest_break_point_position(&"main.js".into(), Position::new(100, 0))
                .unwrap(),
            Position::new(5, 0),
        );
    }
}
