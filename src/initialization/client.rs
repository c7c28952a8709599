//! HTTP client initialization.

use std::sync::Arc;
use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::Config;

/// User-Agent sent to providers.
const USER_AGENT: &str = concat!("ipintel/", env!("CARGO_PKG_VERSION"));

/// Initializes the shared HTTP client for provider and LLM calls.
///
/// The per-request timeout is applied at the call sites (provider calls use
/// the API timeout, LLM calls three times that); the client-level timeout
/// here is a generous backstop.
pub fn init_client(config: &Config) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let backstop = config.llm_timeout() + Duration::from_secs(5);
    let client = ClientBuilder::new()
        .timeout(backstop)
        .connect_timeout(Duration::from_secs(5))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(Arc::new(client))
}
