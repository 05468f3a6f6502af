use crate::error::SourceError;
use scriptdbg_syntax::{Position, SourceId};

/// Finds the candidate the engine can actually stop at for a requested
/// position.
///
/// `candidates` must be sorted and free of duplicates. An exact match is
/// returned as is. Otherwise, the first candidate after the position wins.
/// Positions after the last candidate clamp back to it.
pub fn find_nearest_break_point_position(
    source_id: &SourceId,
    candidates: &[Position],
    position: Position,
) -> Result<Position, SourceError> {
    let Some(last) = candidates.last() else {
        return Err(SourceError::NoBreakpointPositions {
            source_id: source_id.clone(),
        });
    };
    let index = candidates
        .binary_search(&position)
        .unwrap_or_else(|insertion_point| insertion_point);
    Ok(candidates.get(index).copied().unwrap_or(*last))
}
