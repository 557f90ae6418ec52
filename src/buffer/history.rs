//! Bounded undo/redo history.
//!
//! Two stacks of immutable snapshots. Committing a new snapshot discards the
//! redo branch; overflowing the cap evicts the oldest undo entry.

/// Maximum number of snapshots kept on each stack.
pub const MAX_HISTORY_SIZE: usize = 50;

/// Cursor position as (row, col). Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
}

impl Cursor {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Immutable capture of the full line sequence plus the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    lines: Vec<String>,
    cursor: Cursor,
}

impl Snapshot {
    pub fn new(lines: Vec<String>, cursor: Cursor) -> Self {
        Self { lines, cursor }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Cursor) {
        (self.lines, self.cursor)
    }
}

#[derive(Clone, Debug)]
pub struct History {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    cap: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY_SIZE)
    }

    /// A cap of zero is raised to one so the most recent edit stays undoable.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            cap: cap.max(1),
        }
    }

    /// Commit a pre-edit snapshot. Clears the redo branch.
    pub fn commit(&mut self, snapshot: Snapshot) {
        self.redo.clear();
        Self::push_bounded(&mut self.undo, snapshot, self.cap);
    }

    /// Pop the newest undo entry, parking `current` on the redo stack.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.undo.pop()?;
        Self::push_bounded(&mut self.redo, current, self.cap);
        Some(restored)
    }

    /// Pop the newest redo entry, parking `current` on the undo stack.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.redo.pop()?;
        Self::push_bounded(&mut self.undo, current, self.cap);
        Some(restored)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    fn push_bounded(stack: &mut Vec<Snapshot>, snapshot: Snapshot, cap: usize) {
        stack.push(snapshot);
        if stack.len() > cap {
            let overflow = stack.len() - cap;
            stack.drain(..overflow);
        }
    }
}
