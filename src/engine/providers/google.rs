// ── Engine: Google Gemini Provider ─────────────────────────────────────────
// Non-streaming `generateContent` call with fixed generation parameters.
// One attempt per user turn: no retry, no backoff, no circuit breaking —
// the caller surfaces a canned fallback and the user's next send is the
// retry.

use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use serde_json::{json, Value};

use crate::atoms::constants::{
    GENERATION_MAX_OUTPUT_TOKENS, GENERATION_TEMPERATURE, GENERATION_TOP_K, GENERATION_TOP_P,
    GOOGLE_BASE_URL, GOOGLE_MODEL,
};
use crate::engine::providers::{ProviderError, ResponseProvider};

pub struct GoogleProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GoogleProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        GoogleProvider {
            client: Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            base_url: GOOGLE_BASE_URL.into(),
            model: GOOGLE_MODEL.into(),
            api_key: api_key.into(),
        }
    }

    /// Point the provider at a different endpoint (self-hosted proxy, test
    /// server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Concatenated text of the first candidate's parts. `None` when the
    /// response carries no text at all.
    fn candidate_text(body: &Value) -> Option<String> {
        let parts = body["candidates"].get(0)?["content"]["parts"].as_array()?;
        let text: String = parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl ResponseProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": GENERATION_TEMPERATURE,
                "topK": GENERATION_TOP_K,
                "topP": GENERATION_TOP_P,
                "maxOutputTokens": GENERATION_MAX_OUTPUT_TOKENS,
            },
        });

        info!("[provider] Google request model={}", self.model);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body_text = response.text().await.unwrap_or_default();
            let message = format!("API error {}: {}", status, clip(&body_text, 200));
            error!("[provider] Google error {}: {}", status, clip(&body_text, 500));

            return Err(match status {
                401 | 403 => ProviderError::Auth(message),
                429 => ProviderError::RateLimited(message),
                _ => ProviderError::Api { status, message },
            });
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(format!("Malformed response body: {}", e)))?;

        // A 200 with no candidate text is a protocol failure, not a reply.
        Self::candidate_text(&parsed).ok_or(ProviderError::Empty)
    }
}

fn clip(text: &str, max: usize) -> &str {
    let end = text
        .char_indices()
        .nth(max)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_text_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Szia" }, { "text": "!" }] }
            }]
        });
        assert_eq!(GoogleProvider::candidate_text(&body).as_deref(), Some("Szia!"));
    }

    #[test]
    fn test_candidate_text_empty_is_none() {
        let blocked = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert!(GoogleProvider::candidate_text(&blocked).is_none());
        assert!(GoogleProvider::candidate_text(&json!({})).is_none());
    }

    #[test]
    fn test_clip_respects_char_boundaries() {
        let text = "áéíóöőúüű";
        assert_eq!(clip(text, 3), "áéí");
        assert_eq!(clip("rövid", 200), "rövid");
    }
}
