//! Line-oriented text buffer with bounded undo/redo.
//!
//! Row and column arguments are never rejected: rows outside the document
//! make a mutator a no-op and columns are clamped to `[0, line_len]`.
//! Columns count `char`s, so multi-byte text is never split mid-codepoint.
//!
//! # Undo model
//!
//! Callers snapshot the *pre-edit* state with [`TextBuffer::save_state`] and
//! then mutate. `undo` parks the current state on the redo stack and restores
//! the newest undo snapshot; `redo` does the reverse. A new `save_state`
//! discards the redo branch.

pub mod history;
pub mod persist;

#[cfg(test)]
mod tests;

use std::path::Path;

use tracing::info;

pub use history::{Cursor, History, Snapshot, MAX_HISTORY_SIZE};

#[derive(Debug, Clone)]
pub struct TextBuffer {
    lines: Vec<String>,
    modified: bool,
    history: History,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBuffer {
    /// An empty document: one empty line.
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            modified: false,
            history: History::new(),
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            lines: persist::split_lines(text),
            modified: false,
            history: History::new(),
        }
    }

    // =========================================================================
    // Edit primitives
    // =========================================================================

    /// Splice `ch` into `row` at `col`. A line break is routed to
    /// [`insert_newline`](Self::insert_newline) so lines never contain one.
    pub fn insert_char(&mut self, row: usize, col: usize, ch: char) {
        if ch == '\n' {
            self.insert_newline(row, col);
            return;
        }
        let Some(line) = self.lines.get_mut(row) else { return };
        let at = byte_offset(line, col);
        line.insert(at, ch);
        self.modified = true;
    }

    /// Backspace. Removes the char before `col`, or at column 0 joins the row
    /// onto the previous one.
    pub fn delete_char_back(&mut self, row: usize, col: usize) {
        if row >= self.lines.len() {
            return;
        }
        let col = col.min(char_len(&self.lines[row]));
        if col > 0 {
            let line = &mut self.lines[row];
            let start = byte_offset(line, col - 1);
            let end = byte_offset(line, col);
            line.replace_range(start..end, "");
            self.modified = true;
        } else if row > 0 {
            let tail = self.lines.remove(row);
            self.lines[row - 1].push_str(&tail);
            self.modified = true;
        }
    }

    /// Delete key. Removes the char at `col` if any; never joins lines.
    pub fn delete_char_forward(&mut self, row: usize, col: usize) {
        let Some(line) = self.lines.get_mut(row) else { return };
        if col >= char_len(line) {
            return;
        }
        let start = byte_offset(line, col);
        let end = byte_offset(line, col + 1);
        line.replace_range(start..end, "");
        self.modified = true;
    }

    /// Split `row` at `col`, moving the suffix to a new row below.
    pub fn insert_newline(&mut self, row: usize, col: usize) {
        let Some(line) = self.lines.get_mut(row) else { return };
        let at = byte_offset(line, col);
        let suffix = line.split_off(at);
        self.lines.insert(row + 1, suffix);
        self.modified = true;
    }

    /// Insert a possibly multi-line payload at (`row`, `col`).
    ///
    /// The prefix before `col` joins the first payload line and the suffix
    /// after `col` joins the last; interior payload lines become new rows.
    pub fn insert_text(&mut self, row: usize, col: usize, text: &str) {
        if text.is_empty() || row >= self.lines.len() {
            return;
        }
        let mut parts = persist::split_lines(text);
        let line = &mut self.lines[row];
        let at = byte_offset(line, col);
        let suffix = line.split_off(at);

        if parts.len() == 1 {
            line.push_str(&parts[0]);
            line.push_str(&suffix);
        } else {
            let first = parts.remove(0);
            line.push_str(&first);
            if let Some(last) = parts.last_mut() {
                last.push_str(&suffix);
            }
            let tail = self.lines.split_off(row + 1);
            self.lines.extend(parts);
            self.lines.extend(tail);
        }
        self.modified = true;
    }

    /// Remove `row`. Deleting the only row leaves a single empty line.
    pub fn delete_line(&mut self, row: usize) {
        if row >= self.lines.len() {
            return;
        }
        self.lines.remove(row);
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.modified = true;
    }

    pub fn append_to_line(&mut self, row: usize, text: &str) {
        let Some(line) = self.lines.get_mut(row) else { return };
        line.push_str(text);
        self.modified = true;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The line at `row`, or `""` when out of range.
    pub fn get_line(&self, row: usize) -> &str {
        self.lines.get(row).map(String::as_str).unwrap_or("")
    }

    /// Length of `row` in chars (0 when out of range).
    pub fn line_len(&self, row: usize) -> usize {
        char_len(self.get_line(row))
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn get_text(&self) -> String {
        persist::join_lines(&self.lines)
    }

    pub fn set_text(&mut self, text: &str) {
        self.lines = persist::split_lines(text);
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Clamp `cursor` into the document.
    pub fn clamp_cursor(&self, cursor: Cursor) -> Cursor {
        let row = cursor.row.min(self.lines.len().saturating_sub(1));
        Cursor::new(row, cursor.col.min(self.line_len(row)))
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Replace the content with the file at `path`.
    ///
    /// A missing file yields the empty document. Clears the modified flag and
    /// the undo history.
    pub fn load(&mut self, path: &Path) -> anyhow::Result<()> {
        let lines = persist::read_document(path)?.unwrap_or_else(|| vec![String::new()]);
        info!("Loaded {} ({} lines)", path.display(), lines.len());
        self.lines = lines;
        self.modified = false;
        self.history.clear();
        Ok(())
    }

    /// Atomically write the content to `path` and clear the modified flag.
    pub fn save(&mut self, path: &Path) -> anyhow::Result<()> {
        persist::write_document(path, &self.lines)?;
        info!("Saved {} ({} lines)", path.display(), self.lines.len());
        self.modified = false;
        Ok(())
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Snapshot the current content with `cursor` onto the undo stack.
    /// Discards any redo branch.
    pub fn save_state(&mut self, cursor: Cursor) {
        self.history.commit(Snapshot::new(self.lines.clone(), cursor));
    }

    /// Restore the newest undo snapshot. `cursor` is recorded with the state
    /// being left so a later redo can return to it. Returns `None` when there
    /// is nothing to undo.
    pub fn undo(&mut self, cursor: Cursor) -> Option<Cursor> {
        let current = Snapshot::new(self.lines.clone(), cursor);
        let restored = self.history.undo(current)?;
        Some(self.restore(restored))
    }

    /// Re-apply the newest undone state. Returns `None` when there is nothing
    /// to redo.
    pub fn redo(&mut self, cursor: Cursor) -> Option<Cursor> {
        let current = Snapshot::new(self.lines.clone(), cursor);
        let restored = self.history.redo(current)?;
        Some(self.restore(restored))
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    fn restore(&mut self, snapshot: Snapshot) -> Cursor {
        let (lines, cursor) = snapshot.into_parts();
        self.lines = if lines.is_empty() { vec![String::new()] } else { lines };
        self.modified = true;
        cursor
    }
}

fn char_len(line: &str) -> usize {
    line.chars().count()
}

/// Byte index of char column `col`, clamped to the end of the line.
fn byte_offset(line: &str, col: usize) -> usize {
    line.char_indices()
        .nth(col)
        .map(|(idx, _)| idx)
        .unwrap_or(line.len())
}
