//! Shared server state.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::aggregate::Engine;
use crate::config::Config;
use crate::initialization::init_client;
use crate::llm::LlmClient;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The aggregation engine.
    pub engine: Arc<Engine>,
    /// LLM summarizer, when `LLM_API_KEY` is configured.
    pub llm: Option<Arc<LlmClient>>,
    /// Server start time, for health uptime.
    pub started_at: Instant,
}

impl AppState {
    /// Builds the full application state from a configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let llm = match config.llm.clone() {
            Some(llm_config) => {
                let client = init_client(&config).context("Failed to initialize LLM client")?;
                Some(Arc::new(LlmClient::new(
                    client,
                    llm_config,
                    config.llm_timeout(),
                )))
            }
            None => None,
        };
        let engine = Engine::new(config).context("Failed to initialize aggregation engine")?;
        Ok(Self {
            engine: Arc::new(engine),
            llm,
            started_at: Instant::now(),
        })
    }
}
