//! Application state and the line-mode event loop.
//!
//! `App` ties the tab collection, the assist controller and the clipboard to
//! one input stream. Every input line is handled to completion before the
//! next one is read; assist progress arrives in between as updates.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info};

use crate::assist::{AssistController, AssistUpdate};
use crate::clipboard::ClipboardBridge;
use crate::config::Config;
use crate::event::{Command, UserEvent, init_user_event};
use crate::session::{CloseOutcome, Session, TabCollection};

/// Rows assumed visible when keeping the cursor in view.
pub const DEFAULT_VIEW_HEIGHT: usize = 24;

pub struct App<W: Write = io::Stdout> {
    // backend
    tabs: TabCollection,
    assist: AssistController,
    clipboard: ClipboardBridge,

    // App State
    status: String,
    quit_armed: bool, // Was the last command a refused :q?
    exit: bool,
    view_height: usize,

    out: W,
}

impl App<io::Stdout> {
    /// Open every path in its own tab (or one empty tab) and bind the
    /// platform clipboard and stdout.
    pub fn new(config: &Config, paths: &[PathBuf]) -> Result<Self> {
        let mut tabs = TabCollection::new();
        for path in paths {
            tabs.add_session(Some(path.as_path()))
                .with_context(|| format!("Failed to open {}", path.display()))?;
        }
        if tabs.is_empty() {
            tabs.push(Session::empty());
        }
        // The first file given is the one shown.
        tabs.set_active(0);

        let assist = AssistController::new(config).context("Failed to create assist client")?;
        Ok(Self::with_parts(tabs, assist, ClipboardBridge::new(), io::stdout()))
    }
}

impl<W: Write> App<W> {
    pub fn with_parts(
        tabs: TabCollection,
        assist: AssistController,
        clipboard: ClipboardBridge,
        out: W,
    ) -> Self {
        Self {
            tabs,
            assist,
            clipboard,
            status: "Type text to insert it; :q quits".to_string(),
            quit_armed: false,
            exit: false,
            view_height: DEFAULT_VIEW_HEIGHT,
            out,
        }
    }

    pub fn tabs(&self) -> &TabCollection {
        &self.tabs
    }

    pub fn assist(&self) -> &AssistController {
        &self.assist
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn should_exit(&self) -> bool {
        self.exit
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Run until `:q` or end of input, reading lines from stdin.
    pub async fn run(&mut self) -> Result<()> {
        self.run_with(init_user_event()).await
    }

    pub async fn run_with(&mut self, mut user_events: Receiver<UserEvent>) -> Result<()> {
        self.draw()?;
        loop {
            if self.exit {
                break;
            }
            tokio::select! {
                line = user_events.recv() => {
                    let Some(line) = line else {
                        info!("Input closed; leaving");
                        break;
                    };
                    let line = line.context("Failed to read input")?;
                    self.handle_line(&line).await;
                }
                update = self.assist.next_update() => {
                    if let Some(update) = update {
                        self.handle_assist_update(update);
                    }
                }
            }
            self.draw()?;
        }
        if self.assist.cancel() {
            info!("Cancelled in-flight assist request on exit");
        }
        Ok(())
    }

    /// Parse and execute one input line.
    pub async fn handle_line(&mut self, line: &str) {
        match Command::parse(line) {
            Ok(command) => self.handle_command(command).await,
            Err(e) => {
                self.quit_armed = false;
                self.status = e.to_string();
            }
        }
    }

    pub fn handle_assist_update(&mut self, update: AssistUpdate) {
        match update.status() {
            Some(status) => self.status = status.to_string(),
            None => debug!("Late assist update {:?}", update),
        }
    }

    async fn handle_command(&mut self, command: Command) {
        if command != Command::Quit {
            self.quit_armed = false;
        }

        match command {
            Command::Quit => self.quit(),
            Command::Write(path) => self.save(path.as_deref()),
            Command::TabNew(path) => match self.tabs.add_session(path.as_deref()) {
                Ok(_) => self.status = format!("New tab created (Tab {})", self.tabs.len()),
                Err(e) => self.status = format!("Failed to create new tab: {e:#}"),
            },
            Command::TabClose => {
                self.status = match self.tabs.close_active_session() {
                    CloseOutcome::Closed { active } => format!("Tab closed (now at Tab {})", active + 1),
                    CloseOutcome::LastSession | CloseOutcome::Empty => "Cannot close last tab".to_string(),
                };
            }
            Command::TabNext => {
                self.tabs.next_session();
                self.announce_tab();
            }
            Command::TabPrev => {
                self.tabs.prev_session();
                self.announce_tab();
            }
            Command::Ask(prompt) => {
                // The controller has already set a status for every outcome.
                if let Err(e) = self.assist.submit(&prompt).await {
                    debug!("Assist submit refused: {}", e);
                }
                self.status = self.assist.status().to_string();
            }
            Command::Cancel => {
                if !self.assist.cancel() {
                    self.status = "No AI request in progress".to_string();
                } else {
                    self.status = self.assist.status().to_string();
                }
            }
            Command::InsertAi => match self.assist.result().map(str::to_string) {
                Some(text) => {
                    self.edit(|s| s.insert_text_at_cursor(&text));
                    self.status = "AI response inserted at cursor".to_string();
                }
                None => self.status = "No AI response available. Use :ai <prompt> first".to_string(),
            },
            Command::Undo => {
                let done = self.edit(Session::undo);
                self.status = if done { "Undo successful" } else { "Nothing to undo" }.to_string();
            }
            Command::Redo => {
                let done = self.edit(Session::redo);
                self.status = if done { "Redo successful" } else { "Nothing to redo" }.to_string();
            }
            Command::Find(query) => {
                self.status = match self.edit(|s| s.find_next(&query)) {
                    Some(at) => format!("Found '{query}' at line {}, column {}", at.row + 1, at.col + 1),
                    None => format!("'{query}' not found in document"),
                };
            }
            Command::Goto(line) => {
                self.status = if self.edit(|s| s.goto_line(line)) {
                    format!("Jumped to line {line}")
                } else {
                    "Invalid line number".to_string()
                };
            }
            Command::Copy => {
                let line = self.edit(|s| s.copy_line());
                self.clipboard.copy(&line);
                self.status = "Current line copied to clipboard".to_string();
            }
            Command::Cut => {
                let line = self.edit(Session::cut_line);
                self.clipboard.copy(&line);
                self.status = "Current line cut to clipboard".to_string();
            }
            Command::Paste => {
                let text = self.clipboard.paste();
                if text.is_empty() {
                    self.status = "Clipboard is empty or unavailable".to_string();
                } else {
                    self.edit(|s| s.insert_text_at_cursor(&text));
                    self.status = "Clipboard content pasted".to_string();
                }
            }
            Command::Print => {
                if let Err(e) = self.print_buffer() {
                    error!("Failed to print buffer: {}", e);
                }
            }
            Command::Text(text) => {
                self.edit(|s| s.insert_text_at_cursor(&format!("{text}\n")));
            }
        }
    }

    /// Apply `f` to the active session, then keep its cursor valid and in view.
    fn edit<T: Default>(&mut self, f: impl FnOnce(&mut Session) -> T) -> T {
        let height = self.view_height;
        let Some(session) = self.tabs.active_session_mut() else {
            return T::default();
        };
        let out = f(session);
        session.ensure_cursor_valid();
        session.scroll_into_view(height);
        out
    }

    fn announce_tab(&mut self) {
        if let Some(session) = self.tabs.active_session() {
            self.status = format!(
                "Switched to: {} (Tab {}/{})",
                session.display_name(),
                self.tabs.active_index() + 1,
                self.tabs.len()
            );
        }
    }

    fn quit(&mut self) {
        if !self.quit_armed {
            let warning = if self.assist.is_in_flight() {
                Some("AI in progress. Use :cancel, or :q again to quit".to_string())
            } else {
                self.tabs.has_unsaved_changes().map(|i| {
                    format!("Tab {} has unsaved changes! :w to save or :q again to quit", i + 1)
                })
            };
            if let Some(warning) = warning {
                self.status = warning;
                self.quit_armed = true;
                return;
            }
        }
        info!("Quit requested");
        self.exit = true;
    }

    fn save(&mut self, path: Option<&Path>) {
        let Some(session) = self.tabs.active_session_mut() else {
            return;
        };
        let saved = match path {
            Some(path) => session.save_as(path),
            None => session.save(),
        };
        self.status = match saved {
            Ok(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                format!("Saved '{}' ({} lines)", name, session.buffer().line_count())
            }
            Err(e) => format!("Save failed: {e:#}"),
        };
    }

    fn print_buffer(&mut self) -> io::Result<()> {
        let Some(session) = self.tabs.active_session() else {
            return Ok(());
        };
        let cursor = session.cursor();
        let width = session.buffer().line_count().to_string().len();
        for (row, line) in session.buffer().lines().iter().enumerate() {
            let mark = if row == cursor.row { '>' } else { ' ' };
            writeln!(self.out, "{mark}{:>width$} | {line}", row + 1)?;
        }
        Ok(())
    }

    /// Tab bar, cursor position and status line.
    pub fn draw(&mut self) -> io::Result<()> {
        let bar: Vec<String> = self
            .tabs
            .tab_names()
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                if self.tabs.is_active(i) {
                    format!("[{}:{}]", i + 1, name)
                } else {
                    format!(" {}:{} ", i + 1, name)
                }
            })
            .collect();
        let position = self
            .tabs
            .active_session()
            .map(|s| format!("Ln {}, Col {}", s.cursor().row + 1, s.cursor().col + 1))
            .unwrap_or_default();

        writeln!(self.out, "{}  {}", bar.join(""), position)?;
        writeln!(self.out, "-- {}", self.status)?;
        self.out.flush()
    }
}
