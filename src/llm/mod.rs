//! LLM summarizer.
//!
//! A stateless wrapper over an OpenAI-compatible chat-completions endpoint.
//! Failures never propagate as errors: the caller always gets an
//! [`AiAnalysis`], possibly carrying the failure sentinel in `reasoning`.
//! The cache-store rule lives here too, so a failed analysis can never
//! poison the analysis cache.

mod prompt;

pub use prompt::{build_user_prompt, SYSTEM_PROMPT};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{AI_FAILURE_PREFIX, AI_UNAVAILABLE_MESSAGE, LLM_TEMPERATURE};
use crate::config::LlmConfig;
use crate::derive::DerivedRecord;

/// Result of one analysis call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AiAnalysis {
    /// Markdown assessment, or the failure sentinel.
    pub reasoning: String,
    /// Failure detail for the UI's debug pane.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
}

impl AiAnalysis {
    fn failed(message: impl std::fmt::Display) -> Self {
        Self {
            reasoning: format!("{AI_FAILURE_PREFIX}: {message}"),
            debug: Some(json!({ "error": message.to_string() })),
        }
    }
}

/// Whether an analysis result is worth caching: non-empty, not a failure
/// sentinel, not the canonical unavailable message.
pub fn is_cacheable_analysis(reasoning: &str) -> bool {
    !reasoning.trim().is_empty()
        && !reasoning.starts_with(AI_FAILURE_PREFIX)
        && reasoning != AI_UNAVAILABLE_MESSAGE
}

/// Chat-completions client.
pub struct LlmClient {
    client: Arc<reqwest::Client>,
    config: LlmConfig,
    timeout: Duration,
    /// Test hook mirroring the provider override: replaces the base URL.
    base_override: Option<String>,
}

impl LlmClient {
    /// Builds a client; `timeout` should be the 3× provider timeout from
    /// [`crate::config::Config::llm_timeout`].
    pub fn new(client: Arc<reqwest::Client>, config: LlmConfig, timeout: Duration) -> Self {
        Self {
            client,
            config,
            timeout,
            base_override: None,
        }
    }

    /// Points the client at a different base URL (tests).
    pub fn with_base_override(mut self, base: String) -> Self {
        self.base_override = Some(base);
        self
    }

    fn endpoint(&self) -> String {
        let base = self
            .base_override
            .as_deref()
            .unwrap_or(&self.config.base_url);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    /// Produces a natural-language assessment of a derived record.
    ///
    /// Transport failures, non-2xx statuses, and malformed responses all
    /// come back as the failure sentinel rather than an error.
    pub async fn analyze(&self, ip: &str, record: &DerivedRecord) -> AiAnalysis {
        let body = json!({
            "model": self.config.model,
            "temperature": LLM_TEMPERATURE,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_user_prompt(ip, record) },
            ],
        });

        let response = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                log::warn!("LLM request for {ip} failed: {e}");
                return AiAnalysis::failed(e);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("LLM returned HTTP {status} for {ip}");
            return AiAnalysis::failed(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            ));
        }

        let payload: Value = match response.json().await {
            Ok(payload) => payload,
            Err(e) => return AiAnalysis::failed(format!("invalid response: {e}")),
        };

        let reasoning = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|content| !content.is_empty());

        match reasoning {
            Some(reasoning) => AiAnalysis {
                reasoning: reasoning.to_string(),
                debug: None,
            },
            None => AiAnalysis::failed("empty completion"),
        }
    }
}
