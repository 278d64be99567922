//! Undo journal behind engine and ledger checkpoints.
//!
//! Every mutation made while a checkpoint is open records the value it
//! overwrites. Reverting pops entries newest first, so undoing a call costs
//! what the call touched rather than the size of the state it lives in.

/// Position in a [`Journal`] that a revert rewinds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JournalCheckpoint(usize);

#[derive(Clone, Debug)]
pub struct Journal<E> {
    entries: Vec<E>,
    open: usize,
}

impl<E> Default for Journal<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            open: 0,
        }
    }
}

impl<E> Journal<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkpoint(&mut self) -> JournalCheckpoint {
        self.open += 1;
        JournalCheckpoint(self.entries.len())
    }

    /// Records an undo entry. Changes made with no checkpoint open are final.
    pub fn record(&mut self, entry: E) {
        if self.open > 0 {
            self.entries.push(entry);
        }
    }

    /// Keeps everything recorded since `checkpoint`. An enclosing checkpoint can
    /// still undo it.
    pub fn commit(&mut self, _checkpoint: JournalCheckpoint) {
        self.close();
    }

    /// Takes the entries recorded since `checkpoint`, newest first, for the
    /// owner to undo.
    pub fn revert(&mut self, checkpoint: JournalCheckpoint) -> Vec<E> {
        let at = checkpoint.0.min(self.entries.len());
        let mut undone = self.entries.split_off(at);
        undone.reverse();
        self.close();
        undone
    }

    /// Number of checkpoints currently open.
    pub fn depth(&self) -> usize {
        self.open
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn close(&mut self) {
        self.open = self.open.saturating_sub(1);
        if self.open == 0 {
            self.entries.clear();
        }
    }
}
