//! Tagged failures of the assist subsystem.
//!
//! Every failure is classified where it happens; status text is rendered from
//! the variant, never recovered by inspecting message strings.

use std::time::Duration;

use thiserror::Error;

use super::status::{MAX_ERROR_DETAIL, truncate_display};

/// The six ways an issued request can end without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ConnectionRefused,
    ModelNotFound,
    Timeout,
    Cancelled,
    EmptyResponse,
    Other,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssistError {
    // Rejections before anything is issued
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("an assist request is already in progress")]
    Busy,

    #[error("backend at {url} is not reachable")]
    Unavailable { url: String },
    #[error("cannot connect to backend at {url}")]
    ConnectionRefused { url: String },
    #[error("model '{model}' not found. Available: {}", available.join(", "))]
    ModelNotFound { model: String, available: Vec<String> },
    #[error("request timeout ({}s)", after.as_secs())]
    Timeout { after: Duration },
    #[error("cancelled")]
    Cancelled,
    #[error("received empty response from model")]
    EmptyResponse,
    #[error("backend error: {message}")]
    Backend { status: Option<u16>, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("failed to parse response: {0}")]
    Decode(String),
}

impl AssistError {
    /// Classification of an issued request's failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Unavailable { .. } | Self::ConnectionRefused { .. } => {
                FailureKind::ConnectionRefused
            }
            Self::ModelNotFound { .. } => FailureKind::ModelNotFound,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Cancelled => FailureKind::Cancelled,
            Self::EmptyResponse => FailureKind::EmptyResponse,
            Self::EmptyPrompt
            | Self::Busy
            | Self::Backend { .. }
            | Self::Transport(_)
            | Self::Decode(_) => FailureKind::Other,
        }
    }

    /// Map a transport error, keeping refused connections and timeouts apart.
    /// `limit` is the timeout that was in force for the failed call.
    pub(crate) fn from_reqwest(err: reqwest::Error, url: &str, limit: Duration) -> Self {
        if err.is_connect() {
            Self::ConnectionRefused { url: url.to_string() }
        } else if err.is_timeout() {
            Self::Timeout { after: limit }
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }

    /// One-line message for the status bar.
    pub fn status_message(&self, streaming: bool) -> String {
        match self {
            Self::EmptyPrompt => "No prompt entered".to_string(),
            Self::Busy => {
                "AI request already in progress. Use :cancel to abort it first".to_string()
            }
            Self::Unavailable { .. } => {
                "Cannot connect to Ollama. Is it running? Try: ollama serve".to_string()
            }
            Self::ConnectionRefused { .. } => "Cannot connect to Ollama. Run: ollama serve".to_string(),
            Self::ModelNotFound { model, .. } => {
                format!("Model '{model}' not found. Run: ollama pull {model}")
            }
            Self::Timeout { .. } => {
                "AI request timeout. Try a simpler prompt or check Ollama".to_string()
            }
            Self::Cancelled if streaming => "AI stream cancelled by user".to_string(),
            Self::Cancelled => "AI request cancelled by user".to_string(),
            Self::EmptyResponse => {
                "AI returned empty response. Try rephrasing your prompt".to_string()
            }
            other => {
                let prefix = if streaming { "Stream error" } else { "AI error" };
                format!("{prefix}: {}", truncate_display(&other.to_string(), MAX_ERROR_DETAIL))
            }
        }
    }
}
