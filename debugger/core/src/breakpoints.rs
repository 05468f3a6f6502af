use crate::error::CommandError;
use linked_hash_map::LinkedHashMap;
use scriptdbg_engine::{BreakLocation, BreakPointSet};
use scriptdbg_syntax::{Position, SourceId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Breakpoint {
    pub source_id: SourceId,
    pub position: Position,
    pub condition: Option<String>,
    /// Removed when hit.
    pub temporary: bool,
}
impl Breakpoint {
    #[must_use]
    pub fn location(&self) -> BreakLocation {
        BreakLocation::new(self.source_id.clone(), self.position)
    }
}

/// The active breakpoints in the order they were added.
///
/// Every change is mirrored into the engine's [`BreakPointSet`].
#[derive(Debug, Default)]
pub struct BreakpointStore {
    breakpoints: LinkedHashMap<BreakLocation, Breakpoint>,
    engine: BreakPointSet,
}
pub type SharedBreakpointStore = Arc<Mutex<BreakpointStore>>;

impl BreakpointStore {
    #[must_use]
    pub fn new(engine: BreakPointSet) -> Self {
        Self {
            breakpoints: LinkedHashMap::new(),
            engine,
        }
    }
    #[must_use]
    pub fn shared(engine: BreakPointSet) -> SharedBreakpointStore {
        Arc::new(Mutex::new(Self::new(engine)))
    }

    /// Adds `breakpoint` or updates the one at the same location in place.
    pub fn set(&mut self, breakpoint: Breakpoint) {
        let location = breakpoint.location();
        debug!("Setting breakpoint at {location}.");
        self.engine
            .insert(location.clone(), breakpoint.condition.clone());
        if let Some(existing) = self.breakpoints.get_mut(&location) {
            *existing = breakpoint;
        } else {
            self.breakpoints.insert(location, breakpoint);
        }
    }

    pub fn remove_at(&mut self, source_id: &SourceId, position: Position) -> bool {
        let location = BreakLocation::new(source_id.clone(), position);
        self.engine.remove(&location);
        let was_removed = self.breakpoints.remove(&location).is_some();
        if was_removed {
            debug!("Removed breakpoint at {location}.");
        }
        was_removed
    }

    pub fn remove_by_index(&mut self, index: usize) -> Result<Breakpoint, CommandError> {
        let count = self.len();
        let out_of_range =
            || CommandError::index_out_of_range(i64::try_from(index).unwrap_or(i64::MAX), count);
        let location = self
            .breakpoints
            .keys()
            .nth(index)
            .cloned()
            .ok_or_else(out_of_range)?;
        self.engine.remove(&location);
        self.breakpoints.remove(&location).ok_or_else(out_of_range)
    }

    pub fn clear(&mut self) {
        self.breakpoints.clear();
        self.engine.clear();
    }

    #[must_use]
    pub fn get(&self, location: &BreakLocation) -> Option<&Breakpoint> {
        self.breakpoints.get(location)
    }
    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }
}

/// Breakpoints stay usable even if a thread panicked while holding the lock.
pub fn lock(store: &SharedBreakpointStore) -> MutexGuard<BreakpointStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}
