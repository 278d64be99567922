//! Depth-counting reentrancy guard.
//!
//! Fills may nest (a settlement callback can fill another order), so the guard
//! counts how many fills are on the call stack instead of holding a binary lock.
//! Every other mutating entry point refuses to run while the depth is non-zero.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::{GridError, Result};

#[derive(Clone, Debug, Default)]
pub struct CallDepth(Rc<Cell<usize>>);

impl CallDepth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }

    /// Marks a fill as entered. The depth drops again when the guard is dropped,
    /// whichever way the fill exits.
    pub fn enter_fill(&self) -> FillGuard {
        self.0.set(self.0.get() + 1);
        FillGuard(Rc::clone(&self.0))
    }

    /// Rejects non-fill mutators while any fill is in progress.
    pub fn ensure_idle(&self) -> Result<()> {
        if self.get() > 0 {
            return Err(GridError::Reentrancy);
        }
        Ok(())
    }
}

#[must_use]
pub struct FillGuard(Rc<Cell<usize>>);

impl Drop for FillGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}
