//! Text-generation assist: backend client, cancellation and the request
//! controller that drives them.

mod cancel;
mod client;
mod controller;
mod error;
pub mod status;

pub use cancel::CancelToken;
pub use client::OllamaClient;
pub use controller::{AssistController, AssistEvent, AssistUpdate, Phase, RequestId, RequestMode};
pub use error::{AssistError, FailureKind};
