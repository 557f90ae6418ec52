//! Cooperative cancellation shared between the controller and a request task.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use super::AssistError;

/// A cloneable, one-way cancellation signal.
///
/// Cancelling is sticky: once raised, every current and future waiter observes
/// it. The running operation only notices at its next suspension point.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives inside `self`, so this only returns after a cancel.
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Drive `fut` until it finishes or the token is cancelled.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, AssistError>
    where
        F: Future<Output = Result<T, AssistError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(AssistError::Cancelled),
            res = fut => res,
        }
    }
}
