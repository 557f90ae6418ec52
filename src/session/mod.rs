//! Editing sessions (tabs) and the ordered collection that owns them.
//!
//! Each [`Session`] pairs a [`TextBuffer`] with a cursor, a viewport offset and
//! an optional filename. [`TabCollection`] keeps them in order with an active
//! index that always points at a valid element while the collection is
//! non-empty.

mod tabs;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::info;

use crate::buffer::{Cursor, TextBuffer};

pub use tabs::{CloseOutcome, TabCollection};

/// Display name for a session without a filename.
pub const UNNAMED: &str = "[No Name]";
/// Suffix appended to the display name of a modified session.
pub const MODIFIED_MARK: &str = " [+]";

/// One open document: buffer, history, cursor and viewport.
#[derive(Debug, Clone, Default)]
pub struct Session {
    buffer: TextBuffer,
    cursor: Cursor,
    /// First visible row.
    scroll_row: usize,
    filename: Option<PathBuf>,
}

impl Session {
    /// An unsaved, empty session.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Open `path`. A missing file yields an empty session bound to `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let mut buffer = TextBuffer::new();
        buffer.load(path)?;
        Ok(Self {
            buffer,
            filename: Some(path.to_path_buf()),
            ..Self::default()
        })
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Direct access for callers that drive the edit primitives themselves.
    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = self.buffer.clamp_cursor(cursor);
    }

    pub fn scroll_row(&self) -> usize {
        self.scroll_row
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn is_modified(&self) -> bool {
        self.buffer.is_modified()
    }

    /// Base name of the file (or a placeholder), plus a marker when modified.
    pub fn display_name(&self) -> String {
        let mut name = self
            .filename
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| UNNAMED.to_string());
        if self.is_modified() {
            name.push_str(MODIFIED_MARK);
        }
        name
    }

    // =========================================================================
    // Editing (snapshot before every mutation)
    // =========================================================================

    pub fn type_char(&mut self, ch: char) {
        self.checkpoint();
        let Cursor { row, col } = self.cursor;
        self.buffer.insert_char(row, col, ch);
        self.cursor = if ch == '\n' {
            Cursor::new(row + 1, 0)
        } else {
            Cursor::new(row, col + 1)
        };
        self.ensure_cursor_valid();
    }

    pub fn newline(&mut self) {
        self.type_char('\n');
    }

    pub fn backspace(&mut self) {
        let Cursor { row, col } = self.cursor;
        if col == 0 && row == 0 {
            return;
        }
        self.checkpoint();
        if col == 0 {
            let join_col = self.buffer.line_len(row - 1);
            self.buffer.delete_char_back(row, col);
            self.cursor = Cursor::new(row - 1, join_col);
        } else {
            self.buffer.delete_char_back(row, col);
            self.cursor = Cursor::new(row, col - 1);
        }
        self.ensure_cursor_valid();
    }

    /// Delete key. At end of line the next line is merged in.
    pub fn delete_forward(&mut self) {
        let Cursor { row, col } = self.cursor;
        let at_eol = col >= self.buffer.line_len(row);
        let is_last = row + 1 >= self.buffer.line_count();
        if at_eol && is_last {
            return;
        }
        self.checkpoint();
        if at_eol {
            let next = self.buffer.get_line(row + 1).to_string();
            self.buffer.append_to_line(row, &next);
            self.buffer.delete_line(row + 1);
        } else {
            self.buffer.delete_char_forward(row, col);
        }
        self.ensure_cursor_valid();
    }

    /// Insert `text` at the cursor and leave the cursor after it.
    pub fn insert_text_at_cursor(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.checkpoint();
        let Cursor { row, col } = self.cursor;
        self.buffer.insert_text(row, col, text);

        let inserted = crate::buffer::persist::split_lines(text);
        let last_len = inserted.last().map(|l| l.chars().count()).unwrap_or(0);
        self.cursor = if inserted.len() > 1 {
            Cursor::new(row + inserted.len() - 1, last_len)
        } else {
            Cursor::new(row, col + last_len)
        };
        self.ensure_cursor_valid();
    }

    pub fn copy_line(&self) -> String {
        self.buffer.get_line(self.cursor.row).to_string()
    }

    /// Remove the cursor line and return its text.
    pub fn cut_line(&mut self) -> String {
        if self.buffer.line_count() == 1 && self.buffer.get_line(0).is_empty() {
            return String::new();
        }
        self.checkpoint();
        let row = self.cursor.row;
        let text = self.buffer.get_line(row).to_string();
        self.buffer.delete_line(row);
        self.cursor = Cursor::new(row, 0);
        self.ensure_cursor_valid();
        text
    }

    pub fn undo(&mut self) -> bool {
        match self.buffer.undo(self.cursor) {
            Some(cursor) => {
                self.set_cursor(cursor);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.buffer.redo(self.cursor) {
            Some(cursor) => {
                self.set_cursor(cursor);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Search forward from just after the cursor, wrapping once around the
    /// document. Moves the cursor to the match.
    pub fn find_next(&mut self, query: &str) -> Option<Cursor> {
        if query.is_empty() {
            return None;
        }
        let start = self.cursor;
        let count = self.buffer.line_count();
        for step in 0..=count {
            let row = (start.row + step) % count;
            let line = self.buffer.get_line(row);
            let from_col = if step == 0 { start.col + 1 } else { 0 };
            let hit = line
                .char_indices()
                .enumerate()
                .skip(from_col)
                .find(|(_, (byte, _))| line[*byte..].starts_with(query))
                .map(|(col, _)| col);
            if let Some(col) = hit {
                // The wrapped pass over the start row may only match before the cursor.
                if step == count && col > start.col {
                    break;
                }
                let found = Cursor::new(row, col);
                self.cursor = found;
                return Some(found);
            }
        }
        None
    }

    /// Jump to 1-based `line`. Returns false when out of range.
    pub fn goto_line(&mut self, line: usize) -> bool {
        if line == 0 || line > self.buffer.line_count() {
            return false;
        }
        self.cursor = Cursor::new(line - 1, 0);
        true
    }

    pub fn ensure_cursor_valid(&mut self) {
        self.cursor = self.buffer.clamp_cursor(self.cursor);
    }

    /// Adjust the viewport so the cursor row is within `height` visible rows.
    pub fn scroll_into_view(&mut self, height: usize) {
        let height = height.max(1);
        if self.cursor.row < self.scroll_row {
            self.scroll_row = self.cursor.row;
        } else if self.cursor.row >= self.scroll_row + height {
            self.scroll_row = self.cursor.row + 1 - height;
        }
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn save(&mut self) -> Result<PathBuf> {
        let Some(path) = self.filename.clone() else {
            bail!("No filename specified");
        };
        self.buffer.save(&path)?;
        Ok(path)
    }

    /// Save under `path` and adopt it as the session's filename.
    pub fn save_as(&mut self, path: &Path) -> Result<PathBuf> {
        self.buffer.save(path)?;
        info!("Session now bound to {}", path.display());
        self.filename = Some(path.to_path_buf());
        Ok(path.to_path_buf())
    }

    fn checkpoint(&mut self) {
        self.buffer.save_state(self.cursor);
    }
}
