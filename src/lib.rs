//! RustyEdit - a multi-tab line editor with local-LLM text assistance
//!
//! This library provides the core of the editor:
//! - `buffer`: line-oriented documents with bounded undo/redo and atomic save
//! - `session`: per-tab editing state and the tab collection
//! - `assist`: requests to an Ollama-compatible backend, with cancellation
//!   and a deadline
//! - `clipboard`: platform clipboard with an in-process fallback
//!
//! # Example
//!
//! ```no_run
//! use rusty_edit::assist::AssistController;
//! use rusty_edit::config::Config;
//! use rusty_edit::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let mut assist = AssistController::new(&config)?;
//!     let mut session = Session::empty();
//!
//!     assist.submit("Write a haiku about borrow checking").await?;
//!     while let Some(update) = assist.next_update().await {
//!         if let Some(status) = update.status() {
//!             println!("{status}");
//!         }
//!         if !assist.is_in_flight() {
//!             break;
//!         }
//!     }
//!     if let Some(text) = assist.take_result() {
//!         session.insert_text_at_cursor(&text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod assist;
pub mod buffer;
pub mod clipboard;
pub mod config;
pub mod event;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use app::App;
pub use assist::{AssistController, AssistError, AssistUpdate, FailureKind, RequestMode};
pub use buffer::{Cursor, TextBuffer};
pub use clipboard::ClipboardBridge;
pub use config::Config;
pub use session::{Session, TabCollection};
