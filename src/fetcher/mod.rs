//! Single-provider fetch execution.
//!
//! One GET per provider call, with the credential-pool executor loop wrapped
//! around it for keyed providers: rotate to the next key on key-related or
//! 5xx failures, give up (as a provider-level error, never a crash) when the
//! pool is exhausted.

use reqwest::Client;
use serde_json::Value;

use crate::config::{Config, MAX_KEY_ATTEMPTS};
use crate::credentials::{is_key_related_error, CredentialPool};
use crate::error_handling::{ErrorType, FetchFailure, ProcessingStats};
use crate::models::{ProviderFailure, ProviderOutcome, ProviderSuccess};
use crate::providers::Provider;

/// Longest body excerpt carried into an error message.
const MAX_ERROR_EXCERPT: usize = 300;

/// Fetches one provider for one target, rotating keys as needed.
///
/// `target` is the IP, or the ASN digits for ASN-dependent providers.
/// Always returns an outcome; failures become `Err(ProviderFailure)` and are
/// folded into the aggregation's error list by the caller.
pub async fn fetch_provider(
    client: &Client,
    provider: &'static Provider,
    target: &str,
    pool: Option<&CredentialPool>,
    config: &Config,
    stats: &ProcessingStats,
) -> ProviderOutcome {
    if !provider.needs_key() {
        return fetch_once(client, provider, target, None, config)
            .await
            .map_err(|failure| {
                stats.increment(failure.error_type);
                ProviderFailure {
                    source: provider.name.to_string(),
                    error: failure.to_string(),
                }
            });
    }

    let Some(pool) = pool.filter(|p| !p.is_empty()) else {
        return Err(ProviderFailure {
            source: provider.name.to_string(),
            error: "no API key configured".to_string(),
        });
    };

    let attempts = pool.len().min(MAX_KEY_ATTEMPTS);
    let mut last_failure: Option<FetchFailure> = None;

    for _ in 0..attempts {
        let Some(lease) = pool.get_next() else {
            break;
        };

        match fetch_once(client, provider, target, Some(&lease.key), config).await {
            Ok(success) => {
                pool.mark_success(lease.index);
                return Ok(success);
            }
            Err(failure) => {
                stats.increment(failure.error_type);
                let retryable = is_key_related_error(failure.status, &failure.message)
                    || failure.is_server_error();
                if retryable {
                    pool.mark_failure(lease.index, &failure.message);
                    log::debug!(
                        "{}: attempt with key #{} failed ({}), rotating",
                        provider.name,
                        lease.index,
                        failure
                    );
                    last_failure = Some(failure);
                    continue;
                }
                // Not the key's fault; retrying another key won't help.
                return Err(ProviderFailure {
                    source: provider.name.to_string(),
                    error: failure.to_string(),
                });
            }
        }
    }

    let detail = last_failure
        .map(|f| f.to_string())
        .unwrap_or_else(|| "no key available".to_string());
    Err(ProviderFailure {
        source: provider.name.to_string(),
        error: format!("All API keys exhausted: {detail}"),
    })
}

/// Issues a single GET and interprets the response through the provider
/// descriptor.
async fn fetch_once(
    client: &Client,
    provider: &'static Provider,
    target: &str,
    key: Option<&str>,
    config: &Config,
) -> Result<ProviderSuccess, FetchFailure> {
    let url = provider.url(target, key, config.provider_base_override.as_deref());

    let mut request = client.get(&url).timeout(config.api_timeout);
    for (name, value) in (provider.headers)(key) {
        request = request.header(name, value);
    }

    let response = request
        .send()
        .await
        .map_err(|e| FetchFailure::from_transport(&e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let classification = if is_key_related_error(Some(status.as_u16()), &body) {
            ErrorType::KeyRejected
        } else {
            ErrorType::HttpStatus
        };
        return Err(FetchFailure {
            status: Some(status.as_u16()),
            message: excerpt(&body, status.canonical_reason().unwrap_or("request failed")),
            error_type: classification,
        });
    }

    let payload: Value = response.json().await.map_err(|e| FetchFailure {
        status: Some(status.as_u16()),
        message: format!("invalid JSON from {}: {e}", provider.name),
        error_type: ErrorType::Parse,
    })?;

    if (provider.check_error)(&payload) {
        return Err(FetchFailure {
            status: Some(status.as_u16()),
            message: (provider.error_message)(&payload),
            error_type: ErrorType::LogicalError,
        });
    }

    let raw_data = match provider.raw_transform {
        Some(project) => project(&payload),
        None => payload.clone(),
    };

    Ok(ProviderSuccess {
        source: provider.name.to_string(),
        data: (provider.transform)(&payload),
        raw_data: Some(raw_data),
    })
}

/// Trims a body to a loggable excerpt, falling back to `default` when empty.
fn excerpt(body: &str, default: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return default.to_string();
    }
    let mut excerpt: String = trimmed.chars().take(MAX_ERROR_EXCERPT).collect();
    if trimmed.chars().count() > MAX_ERROR_EXCERPT {
        excerpt.push('…');
    }
    excerpt
}
