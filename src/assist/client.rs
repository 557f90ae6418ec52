//! HTTP client for an Ollama-compatible text-generation backend.
//!
//! Two endpoints are used: `GET /api/tags` (availability and model listing)
//! and `POST /api/generate` (batch or newline-delimited JSON streaming).

use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;

use super::{AssistError, CancelToken};

/// Longest error body kept from a failed response.
const MAX_ERROR_BODY_CHARS: usize = 200;
/// Largest single NDJSON line accepted from a stream.
const MAX_STREAM_LINE_BYTES: usize = 1024 * 1024;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// One generate response object; also one line of a streamed response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    response: String,
    done: bool,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TagsResponse {
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    request_timeout: Duration,
    probe_timeout: Duration,
    model_check_timeout: Duration,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Result<Self, AssistError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AssistError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            request_timeout: config.request_timeout(),
            probe_timeout: config.probe_timeout(),
            model_check_timeout: config.model_check_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    fn transport_error(&self, err: reqwest::Error, limit: Duration) -> AssistError {
        AssistError::from_reqwest(err, &self.base_url, limit)
    }

    /// True when the tag listing answers with a success status in time.
    pub async fn is_available(&self) -> bool {
        let request = self
            .http
            .get(self.url("/api/tags"))
            .timeout(self.probe_timeout);
        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Backend probe failed: {}", e);
                false
            }
        }
    }

    /// Verify the configured model is installed. A listed name matches when
    /// it starts with the configured identifier, so `llama2` accepts
    /// `llama2:latest`.
    pub async fn check_model(&self) -> Result<(), AssistError> {
        let limit = self.model_check_timeout;
        let response = self
            .http
            .get(self.url("/api/tags"))
            .timeout(limit)
            .send()
            .await
            .map_err(|e| self.transport_error(e, limit))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistError::Backend {
                status: Some(status.as_u16()),
                message: format!("backend returned status {}", status.as_u16()),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e, limit))?;
        let tags: TagsResponse =
            serde_json::from_slice(&body).map_err(|e| AssistError::Decode(e.to_string()))?;

        if tags.models.iter().any(|m| m.name.starts_with(&self.model)) {
            return Ok(());
        }
        Err(AssistError::ModelNotFound {
            model: self.model.clone(),
            available: tags.models.into_iter().map(|m| m.name).collect(),
        })
    }

    /// Reachability, then model presence.
    pub async fn preflight(&self) -> Result<(), AssistError> {
        if !self.is_available().await {
            return Err(AssistError::Unavailable { url: self.base_url.clone() });
        }
        self.check_model().await
    }

    /// Single-response generation. The reply is trimmed; a blank reply is an
    /// [`AssistError::EmptyResponse`].
    pub async fn generate(&self, prompt: &str, cancel: &CancelToken) -> Result<String, AssistError> {
        if prompt.trim().is_empty() {
            return Err(AssistError::EmptyPrompt);
        }
        cancel.run(self.generate_batch(prompt)).await
    }

    async fn generate_batch(&self, prompt: &str) -> Result<String, AssistError> {
        let response = self.post_generate(prompt, false).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;
        if body.is_empty() {
            return Err(AssistError::EmptyResponse);
        }

        let reply: GenerateResponse =
            serde_json::from_slice(&body).map_err(|e| AssistError::Decode(e.to_string()))?;
        if let Some(message) = reply.error.filter(|m| !m.is_empty()) {
            return Err(AssistError::Backend { status: None, message });
        }

        let text = reply.response.trim();
        if text.is_empty() {
            return Err(AssistError::EmptyResponse);
        }
        info!("Generated {} bytes with {}", text.len(), self.model);
        Ok(text.to_string())
    }

    /// Streaming generation. `on_chunk` sees every non-empty fragment in
    /// arrival order; the concatenated text is returned once the backend
    /// reports `done`.
    pub async fn generate_stream<F>(
        &self,
        prompt: &str,
        cancel: &CancelToken,
        on_chunk: F,
    ) -> Result<String, AssistError>
    where
        F: FnMut(&str),
    {
        if prompt.trim().is_empty() {
            return Err(AssistError::EmptyPrompt);
        }
        cancel.run(self.stream_generate(prompt, on_chunk)).await
    }

    async fn stream_generate<F>(&self, prompt: &str, mut on_chunk: F) -> Result<String, AssistError>
    where
        F: FnMut(&str),
    {
        let response = self.post_generate(prompt, true).await?;
        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut full = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.transport_error(e, self.request_timeout))?;
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if apply_stream_line(&line, &mut full, &mut on_chunk)? {
                    return finish_stream(full);
                }
            }

            if buffer.len() > MAX_STREAM_LINE_BYTES {
                return Err(AssistError::Backend {
                    status: None,
                    message: "stream line exceeded maximum size (1 MiB)".to_string(),
                });
            }
        }

        // The final object may arrive without a trailing newline.
        if !buffer.is_empty() && apply_stream_line(&buffer, &mut full, &mut on_chunk)? {
            return finish_stream(full);
        }

        warn!("Stream closed after {} bytes without a done marker", full.len());
        Err(AssistError::Backend {
            status: None,
            message: "connection closed before stream completed".to_string(),
        })
    }

    async fn post_generate(&self, prompt: &str, stream: bool) -> Result<reqwest::Response, AssistError> {
        let body = GenerateRequest { model: &self.model, prompt, stream };
        debug!("POST /api/generate model={} stream={}", self.model, stream);
        let response = self
            .http
            .post(self.url("/api/generate"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = read_capped_error_body(response).await;
        match backend_error(status.as_u16(), &text) {
            AssistError::Backend { status: Some(404), message } if names_missing_model(&message) => {
                warn!("Backend does not know model {}: {}", self.model, message);
                Err(AssistError::ModelNotFound { model: self.model.clone(), available: Vec::new() })
            }
            other => Err(other),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Parse one NDJSON line into `full`. Returns true once the backend says done.
fn apply_stream_line<F>(line: &[u8], full: &mut String, on_chunk: &mut F) -> Result<bool, AssistError>
where
    F: FnMut(&str),
{
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return Ok(false);
    }

    let part: GenerateResponse =
        serde_json::from_str(line).map_err(|e| AssistError::Decode(e.to_string()))?;
    if let Some(message) = part.error.filter(|m| !m.is_empty()) {
        return Err(AssistError::Backend { status: None, message });
    }
    if !part.response.is_empty() {
        full.push_str(&part.response);
        on_chunk(&part.response);
    }
    Ok(part.done)
}

fn finish_stream(full: String) -> Result<String, AssistError> {
    if full.trim().is_empty() {
        return Err(AssistError::EmptyResponse);
    }
    info!("Stream finished with {} bytes", full.len());
    Ok(full)
}

/// Prefer the backend's own `error` field; fall back to a truncated body.
fn backend_error(status: u16, body: &str) -> AssistError {
    let parsed = serde_json::from_str::<GenerateResponse>(body).ok();
    if let Some(message) = parsed.and_then(|r| r.error).filter(|m| !m.is_empty()) {
        return AssistError::Backend { status: Some(status), message };
    }
    let mut shown: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        shown.push_str("...");
    }
    AssistError::Backend {
        status: Some(status),
        message: format!("status {status}: {shown}"),
    }
}

/// Ollama answers an unknown model with 404 and `model "<m>" not found`.
fn names_missing_model(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("model") && message.contains("not found")
}

async fn read_capped_error_body(response: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_STREAM_LINE_BYTES {
            body.truncate(MAX_STREAM_LINE_BYTES);
            break;
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
