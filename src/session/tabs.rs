//! Ordered tab collection with an active-index pointer.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use super::Session;

/// Result of asking to close the active tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The tab was removed; carries the new active index.
    Closed { active: usize },
    /// Refused: at least one session must stay open.
    LastSession,
    /// Nothing to close.
    Empty,
}

#[derive(Debug, Default)]
pub struct TabCollection {
    sessions: Vec<Session>,
    active: usize,
}

impl TabCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` (or an empty session), append it and make it active.
    ///
    /// A missing file is not an error; any other load failure is returned and
    /// the collection is left unchanged.
    pub fn add_session(&mut self, path: Option<&Path>) -> Result<usize> {
        let session = match path {
            Some(path) => Session::open(path)?,
            None => Session::empty(),
        };
        Ok(self.push(session))
    }

    /// Append an already built session and make it active.
    pub fn push(&mut self, session: Session) -> usize {
        self.sessions.push(session);
        self.active = self.sessions.len() - 1;
        info!("Opened tab {} ({})", self.active + 1, self.sessions[self.active].display_name());
        self.active
    }

    pub fn close_active_session(&mut self) -> CloseOutcome {
        match self.sessions.len() {
            0 => CloseOutcome::Empty,
            1 => CloseOutcome::LastSession,
            _ => {
                let closed = self.sessions.remove(self.active);
                if self.active >= self.sessions.len() {
                    self.active = self.sessions.len() - 1;
                }
                debug!("Closed tab {}", closed.display_name());
                CloseOutcome::Closed { active: self.active }
            }
        }
    }

    pub fn next_session(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        self.active = (self.active + 1) % self.sessions.len();
    }

    pub fn prev_session(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        self.active = self.active.checked_sub(1).unwrap_or(self.sessions.len() - 1);
    }

    /// Make `index` active. Out-of-range indices are ignored.
    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.sessions.len() {
            return false;
        }
        self.active = index;
        true
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.sessions.get(self.active)
    }

    pub fn active_session_mut(&mut self) -> Option<&mut Session> {
        self.sessions.get_mut(self.active)
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn is_active(&self, index: usize) -> bool {
        !self.sessions.is_empty() && index == self.active
    }

    pub fn session(&self, index: usize) -> Option<&Session> {
        self.sessions.get(index)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn tab_names(&self) -> Vec<String> {
        self.sessions.iter().map(Session::display_name).collect()
    }

    /// Index of the first session with unsaved changes.
    pub fn has_unsaved_changes(&self) -> Option<usize> {
        self.sessions.iter().position(Session::is_modified)
    }
}
