//! System clipboard access with an in-process fallback.
//!
//! Platform calls can hang (no display server, a stuck clipboard owner), so
//! each one runs on a short-lived helper thread and is abandoned after
//! [`CLIPBOARD_TIMEOUT`]. Failures are logged and never surfaced: the
//! bridge silently keeps working off its fallback string.

use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use arboard::Clipboard;
use tracing::{debug, warn};

pub const CLIPBOARD_TIMEOUT: Duration = Duration::from_secs(3);

/// A platform clipboard.
pub trait ClipboardBackend: Send + Sync + 'static {
    fn set_text(&self, text: &str) -> Result<()>;
    fn get_text(&self) -> Result<String>;
}

/// Backend over the `arboard` crate. A fresh handle is opened per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArboardBackend;

impl ClipboardBackend for ArboardBackend {
    fn set_text(&self, text: &str) -> Result<()> {
        let mut clipboard = Clipboard::new().map_err(|e| anyhow!("failed to access clipboard: {e}"))?;
        clipboard
            .set_text(text)
            .map_err(|e| anyhow!("failed to copy to clipboard: {e}"))
    }

    fn get_text(&self) -> Result<String> {
        let mut clipboard = Clipboard::new().map_err(|e| anyhow!("failed to access clipboard: {e}"))?;
        clipboard
            .get_text()
            .map_err(|e| anyhow!("failed to read clipboard: {e}"))
    }
}

pub struct ClipboardBridge {
    backend: Option<Arc<dyn ClipboardBackend>>,
    fallback: String,
    timeout: Duration,
}

impl Default for ClipboardBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardBridge {
    /// Bridge over the platform clipboard.
    pub fn new() -> Self {
        Self::with_backend(Arc::new(ArboardBackend))
    }

    pub fn with_backend(backend: Arc<dyn ClipboardBackend>) -> Self {
        Self {
            backend: Some(backend),
            fallback: String::new(),
            timeout: CLIPBOARD_TIMEOUT,
        }
    }

    /// Bridge that never touches the platform.
    pub fn fallback_only() -> Self {
        Self {
            backend: None,
            fallback: String::new(),
            timeout: CLIPBOARD_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Last text known to the bridge.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn copy(&mut self, text: &str) {
        self.fallback = text.to_string();
        if text.is_empty() {
            return;
        }
        let Some(backend) = self.backend.clone() else {
            return;
        };
        let owned = text.to_string();
        match call_with_timeout(self.timeout, move || backend.set_text(&owned)) {
            Ok(()) => debug!("Copied {} bytes to clipboard", text.len()),
            Err(e) => warn!("Clipboard copy fell back to local buffer: {:#}", e),
        }
    }

    /// Platform text with trailing line breaks trimmed, or the fallback when
    /// the platform is unavailable or empty.
    pub fn paste(&mut self) -> String {
        let Some(backend) = self.backend.clone() else {
            return self.fallback.clone();
        };
        match call_with_timeout(self.timeout, move || backend.get_text()) {
            Ok(text) => {
                let text = text.trim_end_matches(['\r', '\n']);
                if !text.is_empty() {
                    self.fallback = text.to_string();
                }
            }
            Err(e) => warn!("Clipboard paste fell back to local buffer: {:#}", e),
        }
        self.fallback.clone()
    }
}

/// Run `f` on a helper thread, giving up after `timeout`. A timed-out
/// thread is left to finish on its own.
fn call_with_timeout<T, F>(timeout: Duration, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("clipboard".to_string())
        .spawn(move || {
            if tx.send(f()).is_err() {
                debug!("Clipboard result arrived after the caller gave up");
            }
        })?;
    match rx.recv_timeout(timeout) {
        Ok(res) => res,
        Err(mpsc::RecvTimeoutError::Timeout) => bail!("clipboard call timed out after {timeout:?}"),
        Err(mpsc::RecvTimeoutError::Disconnected) => bail!("clipboard thread exited without a result"),
    }
}
