//! Cycle and depth detection for recursive wiring.

use std::any::TypeId;

use smallvec::SmallVec;

use crate::error::{DiError, DiResult};
use crate::key::Key;

/// Types currently being wired, outermost first.
///
/// One path lives on each [`Injector`](crate::Injector) run, so concurrent
/// units of work never observe each other's state.
pub(crate) struct ResolutionPath {
    ids: SmallVec<[TypeId; 8]>,
    names: SmallVec<[&'static str; 8]>,
    max_depth: usize,
    detect_cycles: bool,
}

impl ResolutionPath {
    pub(crate) fn new(max_depth: usize, detect_cycles: bool) -> Self {
        Self {
            ids: SmallVec::new(),
            names: SmallVec::new(),
            max_depth,
            detect_cycles,
        }
    }

    /// Pushes `key`, failing if it is already on the path or the path is too deep.
    pub(crate) fn enter(&mut self, key: &Key) -> DiResult<()> {
        // Circular detection BEFORE pushing the new name
        if self.detect_cycles && self.ids.contains(&key.type_id()) {
            let mut path: Vec<&'static str> = self.names.to_vec();
            path.push(key.display_name());
            return Err(DiError::Circular(path));
        }
        if self.ids.len() >= self.max_depth {
            return Err(DiError::DepthExceeded(self.ids.len()));
        }
        self.ids.push(key.type_id());
        self.names.push(key.display_name());
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.ids.pop();
        self.names.pop();
    }

    pub(crate) fn depth(&self) -> usize {
        self.ids.len()
    }
}
