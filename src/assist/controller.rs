//! Assist request controller.
//!
//! Owns the request lifecycle (`Idle` / `InFlight`), the last status line and
//! the stored result. Work runs on a spawned task that only *sends* events;
//! every state change happens here, on the caller's task, when those events
//! are applied. That keeps a single writer for all shared fields.

use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::config::Config;

use super::status;
use super::{AssistError, CancelToken, FailureKind, OllamaClient};

const PROCESSING_STATUS: &str = "Processing AI request... (:cancel to abort)";
const STREAMING_STATUS: &str = "Streaming AI response... (:cancel to abort)";

// =============================================================================
// Public types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// One response delivered when generation is done.
    Batch,
    /// Incremental chunks with a live preview.
    Streaming,
}

impl RequestMode {
    pub fn from_flag(stream: bool) -> Self {
        if stream { Self::Streaming } else { Self::Batch }
    }

    pub fn is_streaming(self) -> bool {
        self == Self::Streaming
    }
}

/// Identifies one submission. Strictly increasing per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    InFlight { id: RequestId, mode: RequestMode },
}

/// Sent from a request task to its controller.
#[derive(Debug)]
pub enum AssistEvent {
    Chunk { id: RequestId, text: String },
    Finished { id: RequestId, outcome: Result<String, AssistError> },
}

/// What applying an event did, for the UI to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistUpdate {
    /// New streaming text arrived.
    Preview { id: RequestId, status: String },
    /// The current request succeeded and its result is stored.
    Completed { id: RequestId, lines: usize, status: String },
    /// The current request failed; the stored result was cleared.
    Failed { id: RequestId, error: AssistError, status: String },
    /// A request that was already cancelled or timed out has finished.
    /// Nothing was stored.
    Late { id: RequestId, succeeded: bool },
}

impl AssistUpdate {
    pub fn id(&self) -> RequestId {
        match self {
            Self::Preview { id, .. }
            | Self::Completed { id, .. }
            | Self::Failed { id, .. }
            | Self::Late { id, .. } => *id,
        }
    }

    /// Status text to show, if the update changed it.
    pub fn status(&self) -> Option<&str> {
        match self {
            Self::Preview { status, .. }
            | Self::Completed { status, .. }
            | Self::Failed { status, .. } => Some(status),
            Self::Late { .. } => None,
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

#[derive(Debug)]
struct ActiveRequest {
    id: RequestId,
    mode: RequestMode,
    cancel: CancelToken,
    started: Instant,
}

pub struct AssistController {
    client: OllamaClient,
    mode: RequestMode,
    timeout: Duration,
    next_id: u64,
    active: Option<ActiveRequest>,
    status: String,
    result: Option<String>,
    streamed: String,
    last_failure: Option<FailureKind>,
    events_tx: UnboundedSender<AssistEvent>,
    events_rx: UnboundedReceiver<AssistEvent>,
}

impl AssistController {
    pub fn new(config: &Config) -> Result<Self, AssistError> {
        let client = OllamaClient::new(config)?;
        Ok(Self::with_client(
            client,
            RequestMode::from_flag(config.stream),
            config.assist_timeout(),
        ))
    }

    pub fn with_client(client: OllamaClient, mode: RequestMode, timeout: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            client,
            mode,
            timeout,
            next_id: 0,
            active: None,
            status: String::new(),
            result: None,
            streamed: String::new(),
            last_failure: None,
            events_tx,
            events_rx,
        }
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RequestMode) {
        self.mode = mode;
    }

    pub fn phase(&self) -> Phase {
        match &self.active {
            Some(active) => Phase::InFlight { id: active.id, mode: active.mode },
            None => Phase::Idle,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.active.is_some()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Result of the last successful request, until taken or replaced.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn take_result(&mut self) -> Option<String> {
        self.result.take()
    }

    pub fn last_failure(&self) -> Option<FailureKind> {
        self.last_failure
    }

    /// Submit in the configured mode.
    pub async fn submit(&mut self, prompt: &str) -> Result<RequestId, AssistError> {
        self.submit_with_mode(prompt, self.mode).await
    }

    /// Start a request unless one is already in flight.
    ///
    /// The backend is probed and the model checked first; if either fails the
    /// controller stays idle and the error is returned.
    pub async fn submit_with_mode(
        &mut self,
        prompt: &str,
        mode: RequestMode,
    ) -> Result<RequestId, AssistError> {
        if prompt.trim().is_empty() {
            return Err(self.reject(AssistError::EmptyPrompt, mode));
        }
        if let Some(active) = &self.active {
            warn!("Rejected assist request: {} still in flight", active.id);
            return Err(self.reject(AssistError::Busy, mode));
        }

        if let Err(e) = self.client.preflight().await {
            warn!("Assist preflight failed: {}", e);
            self.status = match &e {
                AssistError::Unavailable { .. } => e.status_message(mode.is_streaming()),
                other => status::preflight_message(&other.to_string()),
            };
            self.last_failure = Some(e.kind());
            return Err(e);
        }

        self.next_id += 1;
        let id = RequestId(self.next_id);
        let cancel = CancelToken::new();

        self.result = None;
        self.streamed.clear();
        self.last_failure = None;
        self.status = match mode {
            RequestMode::Batch => PROCESSING_STATUS,
            RequestMode::Streaming => STREAMING_STATUS,
        }
        .to_string();
        self.active = Some(ActiveRequest {
            id,
            mode,
            cancel: cancel.clone(),
            started: Instant::now(),
        });

        info!(
            "Assist request {} issued ({:?}, model {}, {} chars)",
            id,
            mode,
            self.client.model(),
            prompt.len()
        );
        tokio::spawn(run_request(
            self.client.clone(),
            prompt.to_string(),
            mode,
            id,
            cancel,
            self.timeout,
            self.events_tx.clone(),
        ));
        Ok(id)
    }

    fn reject(&mut self, error: AssistError, mode: RequestMode) -> AssistError {
        self.status = error.status_message(mode.is_streaming());
        error
    }

    /// Drop the in-flight request. The controller is idle again as soon as
    /// this returns; the task notices the signal at its next await point and
    /// whatever it reports afterwards arrives as [`AssistUpdate::Late`].
    pub fn cancel(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        active.cancel.cancel();
        self.result = None;
        self.streamed.clear();
        self.last_failure = Some(FailureKind::Cancelled);
        self.status = AssistError::Cancelled.status_message(active.mode.is_streaming());
        info!(
            "Assist request {} cancelled after {:.1?}",
            active.id,
            active.started.elapsed()
        );
        true
    }

    /// Wait for the next event that produces an update.
    ///
    /// Cancel-safe, for use as a `tokio::select!` branch.
    pub async fn next_update(&mut self) -> Option<AssistUpdate> {
        loop {
            let event = self.events_rx.recv().await?;
            if let Some(update) = self.apply(event) {
                return Some(update);
            }
        }
    }

    /// Apply every event already queued, without waiting.
    pub fn poll_updates(&mut self) -> Vec<AssistUpdate> {
        let mut updates = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            updates.extend(self.apply(event));
        }
        updates
    }

    fn is_current(&self, id: RequestId) -> bool {
        self.active.as_ref().is_some_and(|a| a.id == id)
    }

    fn apply(&mut self, event: AssistEvent) -> Option<AssistUpdate> {
        match event {
            AssistEvent::Chunk { id, text } => {
                if !self.is_current(id) {
                    debug!("Dropping stream chunk from stale request {}", id);
                    return None;
                }
                self.streamed.push_str(&text);
                self.status = status::streaming_message(&self.streamed);
                Some(AssistUpdate::Preview { id, status: self.status.clone() })
            }
            AssistEvent::Finished { id, outcome } => {
                let Some(active) = self.active.take_if(|a| a.id == id) else {
                    let succeeded = outcome.is_ok();
                    info!("Late completion of request {} ignored (ok: {})", id, succeeded);
                    return Some(AssistUpdate::Late { id, succeeded });
                };
                self.streamed.clear();
                let streaming = active.mode.is_streaming();

                match outcome {
                    Ok(text) => {
                        let lines = status::response_lines(&text);
                        self.status = status::ready_message(&text, streaming);
                        self.result = Some(text);
                        self.last_failure = None;
                        info!(
                            "Assist request {} completed in {:.1?} ({} lines)",
                            id,
                            active.started.elapsed(),
                            lines
                        );
                        Some(AssistUpdate::Completed { id, lines, status: self.status.clone() })
                    }
                    Err(error) => {
                        self.status = error.status_message(streaming);
                        self.result = None;
                        self.last_failure = Some(error.kind());
                        warn!("Assist request {} failed: {}", id, error);
                        Some(AssistUpdate::Failed { id, error, status: self.status.clone() })
                    }
                }
            }
        }
    }
}

/// Body of the per-request task: race the backend call against the deadline
/// and report the outcome.
async fn run_request(
    client: OllamaClient,
    prompt: String,
    mode: RequestMode,
    id: RequestId,
    cancel: CancelToken,
    timeout: Duration,
    tx: UnboundedSender<AssistEvent>,
) {
    let work = async {
        match mode {
            RequestMode::Batch => client.generate(&prompt, &cancel).await,
            RequestMode::Streaming => {
                let chunk_tx = tx.clone();
                client
                    .generate_stream(&prompt, &cancel, move |chunk| {
                        let event = AssistEvent::Chunk { id, text: chunk.to_string() };
                        if chunk_tx.send(event).is_err() {
                            debug!("Controller gone; dropping chunk of {}", id);
                        }
                    })
                    .await
            }
        }
    };

    let outcome = match tokio::time::timeout(timeout, work).await {
        Ok(outcome) => outcome,
        Err(_) => {
            cancel.cancel();
            warn!("Assist request {} hit the {:?} deadline", id, timeout);
            Err(AssistError::Timeout { after: timeout })
        }
    };

    if tx.send(AssistEvent::Finished { id, outcome }).is_err() {
        debug!("Controller gone before request {} finished", id);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn backend(models: &[&str]) -> MockServer {
        let server = MockServer::start().await;
        let models: Vec<_> = models.iter().map(|n| json!({ "name": n })).collect();
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": models })))
            .mount(&server)
            .await;
        server
    }

    async fn mount_generate(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    fn controller(server: &MockServer, mode: RequestMode, timeout: Duration) -> Result<AssistController, AssistError> {
        controller_at(&server.uri(), mode, timeout)
    }

    fn controller_at(uri: &str, mode: RequestMode, timeout: Duration) -> Result<AssistController, AssistError> {
        let config = Config {
            base_url: uri.to_string(),
            model: "llama2".to_string(),
            ..Config::default()
        };
        Ok(AssistController::with_client(OllamaClient::new(&config)?, mode, timeout))
    }

    async fn next(controller: &mut AssistController) -> Option<AssistUpdate> {
        tokio::time::timeout(Duration::from_secs(5), controller.next_update())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn test_batch_success_stores_result() -> Result<(), AssistError> {
        let server = backend(&["llama2:latest"]).await;
        mount_generate(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "response": "let x = 1;\nlet y = 2;" })),
        )
        .await;

        let mut c = controller(&server, RequestMode::Batch, Duration::from_secs(5))?;
        let id = c.submit("declare two vars").await?;
        assert_eq!(c.phase(), Phase::InFlight { id, mode: RequestMode::Batch });
        assert_eq!(c.status(), PROCESSING_STATUS);

        let update = next(&mut c).await;
        assert!(matches!(update, Some(AssistUpdate::Completed { lines: 2, .. })));
        assert!(!c.is_in_flight());
        assert_eq!(c.result(), Some("let x = 1;\nlet y = 2;"));
        assert!(c.status().starts_with("AI response ready (2 lines). Preview: let x = 1; let y = 2;"));

        assert_eq!(c.take_result().as_deref(), Some("let x = 1;\nlet y = 2;"));
        assert_eq!(c.result(), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_second_submit_is_busy() -> Result<(), AssistError> {
        let server = backend(&["llama2"]).await;
        mount_generate(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "ok" }))
                .set_delay(Duration::from_millis(300)),
        )
        .await;

        let mut c = controller(&server, RequestMode::Batch, Duration::from_secs(5))?;
        let first = c.submit("one").await?;
        assert_eq!(c.submit("two").await, Err(AssistError::Busy));
        assert_eq!(
            c.status(),
            "AI request already in progress. Use :cancel to abort it first"
        );
        assert_eq!(c.phase(), Phase::InFlight { id: first, mode: RequestMode::Batch });

        assert!(matches!(next(&mut c).await, Some(AssistUpdate::Completed { id, .. }) if id == first));
        // Idle again, so a new request is accepted with a fresh id.
        let second = c.submit("two").await?;
        assert!(second > first);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected() -> Result<(), AssistError> {
        let server = backend(&["llama2"]).await;
        let mut c = controller(&server, RequestMode::Batch, Duration::from_secs(5))?;
        assert_eq!(c.submit("   ").await, Err(AssistError::EmptyPrompt));
        assert_eq!(c.status(), "No prompt entered");
        assert_eq!(c.phase(), Phase::Idle);
        Ok(())
    }

    #[tokio::test]
    async fn test_preflight_failure_stays_idle() -> Result<(), AssistError> {
        let server = backend(&["mistral:7b"]).await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut c = controller(&server, RequestMode::Batch, Duration::from_secs(5))?;
        let err = c.submit("hello").await.err();
        assert!(matches!(err, Some(AssistError::ModelNotFound { .. })));
        assert!(!c.is_in_flight());
        assert_eq!(c.last_failure(), Some(FailureKind::ModelNotFound));
        assert!(c.status().starts_with("Model error: model 'llama2' not found. Available: mistral:7b"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_backend_stays_idle() -> Result<(), AssistError> {
        let uri = crate::assist::client::tests::refused_uri()?;
        let mut c = controller_at(&uri, RequestMode::Streaming, Duration::from_secs(5))?;

        let err = c.submit("hello").await.err();
        assert!(matches!(err, Some(AssistError::Unavailable { .. })));
        assert!(!c.is_in_flight());
        assert_eq!(c.status(), "Cannot connect to Ollama. Is it running? Try: ollama serve");
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_is_immediate_and_late_result_is_dropped() -> Result<(), AssistError> {
        let server = backend(&["llama2"]).await;
        mount_generate(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "too late" }))
                .set_delay(Duration::from_secs(10)),
        )
        .await;

        let mut c = controller(&server, RequestMode::Batch, Duration::from_secs(30))?;
        let id = c.submit("slow").await?;
        assert!(c.cancel());
        assert!(!c.is_in_flight());
        assert_eq!(c.status(), "AI request cancelled by user");
        assert_eq!(c.last_failure(), Some(FailureKind::Cancelled));
        assert!(!c.cancel());

        // The task observes the signal and reports back as a late outcome.
        assert_eq!(next(&mut c).await, Some(AssistUpdate::Late { id, succeeded: false }));
        assert_eq!(c.status(), "AI request cancelled by user");
        assert_eq!(c.result(), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_late_success_never_overwrites_state() -> Result<(), AssistError> {
        let server = backend(&["llama2"]).await;
        mount_generate(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "x" }))
                .set_delay(Duration::from_secs(10)),
        )
        .await;

        let mut c = controller(&server, RequestMode::Streaming, Duration::from_secs(30))?;
        let id = c.submit("slow").await?;
        assert!(c.cancel());
        assert_eq!(c.status(), "AI stream cancelled by user");

        // A success that raced the cancel signal.
        assert_eq!(c.apply(AssistEvent::Chunk { id, text: "partial".into() }), None);
        let update = c.apply(AssistEvent::Finished { id, outcome: Ok("done".into()) });
        assert_eq!(update, Some(AssistUpdate::Late { id, succeeded: true }));
        assert_eq!(c.result(), None);
        assert_eq!(c.status(), "AI stream cancelled by user");
        Ok(())
    }

    #[tokio::test]
    async fn test_deadline_reports_timeout() -> Result<(), AssistError> {
        let server = backend(&["llama2"]).await;
        mount_generate(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "never" }))
                .set_delay(Duration::from_secs(10)),
        )
        .await;

        let limit = Duration::from_millis(150);
        let mut c = controller(&server, RequestMode::Batch, limit)?;
        let id = c.submit("slow").await?;

        let update = next(&mut c).await;
        assert_eq!(
            update.as_ref().map(AssistUpdate::id),
            Some(id),
            "unexpected update {update:?}"
        );
        assert!(matches!(
            update,
            Some(AssistUpdate::Failed { error: AssistError::Timeout { after }, .. }) if after == limit
        ));
        assert_eq!(c.last_failure(), Some(FailureKind::Timeout));
        assert_eq!(c.status(), "AI request timeout. Try a simpler prompt or check Ollama");
        assert!(!c.is_in_flight());
        Ok(())
    }

    #[tokio::test]
    async fn test_streaming_deadline_reports_timeout() -> Result<(), AssistError> {
        let server = backend(&["llama2"]).await;
        mount_generate(
            &server,
            ResponseTemplate::new(200)
                .set_body_string("{\"response\":\"never\",\"done\":true}\n")
                .set_delay(Duration::from_secs(10)),
        )
        .await;

        let limit = Duration::from_millis(150);
        let mut c = controller(&server, RequestMode::Streaming, limit)?;
        let id = c.submit("slow").await?;
        assert_eq!(c.phase(), Phase::InFlight { id, mode: RequestMode::Streaming });

        let started = Instant::now();
        let update = next(&mut c).await;
        assert!(
            matches!(
                update,
                Some(AssistUpdate::Failed { id: failed, error: AssistError::Timeout { after }, .. })
                    if failed == id && after == limit
            ),
            "unexpected update {update:?}"
        );
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(c.last_failure(), Some(FailureKind::Timeout));
        assert_eq!(c.status(), "AI request timeout. Try a simpler prompt or check Ollama");
        assert_eq!(c.result(), None);
        assert_eq!(c.phase(), Phase::Idle);
        Ok(())
    }

    #[tokio::test]
    async fn test_streaming_cancel_clears_result() -> Result<(), AssistError> {
        let server = backend(&["llama2"]).await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("{\"response\":\"first\",\"done\":true}\n"),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_generate(
            &server,
            ResponseTemplate::new(200)
                .set_body_string("{\"response\":\"second\",\"done\":true}\n")
                .set_delay(Duration::from_secs(10)),
        )
        .await;

        let mut c = controller(&server, RequestMode::Streaming, Duration::from_secs(30))?;
        c.submit("one").await?;
        let mut update = next(&mut c).await;
        while matches!(update, Some(AssistUpdate::Preview { .. })) {
            update = next(&mut c).await;
        }
        assert!(matches!(update, Some(AssistUpdate::Completed { .. })), "unexpected update {update:?}");
        assert_eq!(c.result(), Some("first"));

        let id = c.submit("two").await?;
        assert_eq!(c.result(), None);
        assert!(c.cancel());
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.status(), "AI stream cancelled by user");
        assert_eq!(c.last_failure(), Some(FailureKind::Cancelled));

        assert_eq!(next(&mut c).await, Some(AssistUpdate::Late { id, succeeded: false }));
        assert_eq!(c.result(), None);
        assert_eq!(c.status(), "AI stream cancelled by user");
        Ok(())
    }

    #[tokio::test]
    async fn test_streaming_previews_then_completes() -> Result<(), AssistError> {
        let server = backend(&["llama2"]).await;
        mount_generate(
            &server,
            ResponseTemplate::new(200).set_body_string(concat!(
                "{\"response\":\"Hello\",\"done\":false}\n",
                "{\"response\":\", world\",\"done\":false}\n",
                "{\"response\":\"\",\"done\":true}\n",
            )),
        )
        .await;

        let mut c = controller(&server, RequestMode::Streaming, Duration::from_secs(5))?;
        c.submit("greet").await?;
        assert_eq!(c.status(), STREAMING_STATUS);

        let mut previews = Vec::new();
        let completed = loop {
            match next(&mut c).await {
                Some(AssistUpdate::Preview { status, .. }) => previews.push(status),
                other => break other,
            }
        };
        assert_eq!(previews, ["Streaming: Hello", "Streaming: Hello, world"]);
        assert!(matches!(completed, Some(AssistUpdate::Completed { lines: 1, .. })));
        assert_eq!(c.result(), Some("Hello, world"));
        assert!(c.status().starts_with("Stream complete (1 lines). Preview: Hello, world"));
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_clears_previous_result() -> Result<(), AssistError> {
        let server = backend(&["llama2"]).await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "first" })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_generate(&server, ResponseTemplate::new(200).set_body_json(json!({ "response": "" }))).await;

        let mut c = controller(&server, RequestMode::Batch, Duration::from_secs(5))?;
        c.submit("one").await?;
        assert!(matches!(next(&mut c).await, Some(AssistUpdate::Completed { .. })));
        assert_eq!(c.result(), Some("first"));

        c.submit("two").await?;
        assert!(matches!(
            next(&mut c).await,
            Some(AssistUpdate::Failed { error: AssistError::EmptyResponse, .. })
        ));
        assert_eq!(c.result(), None);
        assert_eq!(c.status(), "AI returned empty response. Try rephrasing your prompt");
        assert!(c.poll_updates().is_empty());
        Ok(())
    }
}
