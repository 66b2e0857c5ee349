// ── Engine: Response Providers ─────────────────────────────────────────────
// The seam between the assistant and the LLM vendor. One provider per wire
// format; callers hold `Arc<dyn ResponseProvider>` and never know which
// concrete backend is in use, so tests swap in a scripted fake.

pub mod google;

pub use google::GoogleProvider;

use async_trait::async_trait;
use thiserror::Error;

use crate::atoms::constants::{MSG_AUTH_FAILED, MSG_GENERIC_FAILURE, MSG_OVERLOADED, MSG_RATE_LIMITED};

// ── Provider trait ─────────────────────────────────────────────────────────

#[async_trait]
pub trait ResponseProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Send one assembled prompt and return the raw reply text.
    /// Exactly one attempt per call — retrying is the user's next send.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

// ── Error taxonomy ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never produced an HTTP response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Non-success HTTP status from the API.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// 401/403 — the key is missing, invalid, or not entitled.
    #[error("auth error 401: {0}")]
    Auth(String),

    /// 429 — quota exhausted.
    #[error("rate limited 429: {0}")]
    RateLimited(String),

    /// Transport succeeded but the response body carried no text.
    #[error("response contained no text")]
    Empty,
}

/// Map a provider failure onto the canned user-facing string.
///
/// Matching is by textual status fragment, not by variant: errors bubbled
/// up from other layers still land on the right message as long as their
/// text mentions the status code.
pub fn fallback_message(err: &ProviderError) -> &'static str {
    let text = err.to_string();
    if text.contains("503") {
        MSG_OVERLOADED
    } else if text.contains("429") {
        MSG_RATE_LIMITED
    } else if text.contains("401") {
        MSG_AUTH_FAILED
    } else {
        MSG_GENERIC_FAILURE
    }
}
