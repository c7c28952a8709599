//! Configuration constants.
//!
//! This module defines the operational constants used throughout the service:
//! timeouts, cache TTLs, credential-pool cooldowns, and concurrency caps.

use std::time::Duration;

/// Cache key version prefix. Bump to invalidate every cached entry after an
/// incompatible change to the cached bundle shape.
pub const CACHE_VERSION: &str = "v1";

/// Default per-request timeout for provider calls in milliseconds.
pub const DEFAULT_API_TIMEOUT_MS: u64 = 5_000;
/// Minimum accepted per-request timeout. Values below this are coerced up so
/// a misconfigured environment cannot make every provider call fail instantly.
pub const MIN_API_TIMEOUT_MS: u64 = 1_000;

/// Default frontend timeout hint surfaced by `/api/config` (milliseconds).
pub const DEFAULT_FRONTEND_TIMEOUT_MS: u64 = 5_000;
/// Default connectivity-probe timeout hint surfaced by `/api/config` (milliseconds).
pub const DEFAULT_CONNECTIVITY_TIMEOUT_MS: u64 = 5_000;

/// Default TTL for positive merged-record cache entries, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 900;
/// Values below this are treated as misconfiguration and reset to the default.
pub const MIN_CACHE_TTL_SECS: u64 = 60;
/// TTL for negative cache entries (every provider failed), in seconds.
/// Short so a transient outage doesn't pin bad results for long.
pub const NEGATIVE_CACHE_TTL_SECS: u64 = 60;

/// Maximum concurrent outbound provider requests per aggregated IP.
/// Bounds how much of the connection budget a single IP can take.
pub const PER_IP_CONCURRENCY: usize = 4;

/// Hard cap on batch sizes accepted by the streaming endpoints.
pub const MAX_BATCH_ITEMS: usize = 20;

/// Capacity of the bounded event channel between the batch scheduler and the
/// SSE encoder. Back-pressures workers when the client is slow.
pub const STREAM_CHANNEL_CAPACITY: usize = 16;

/// How long an unhealthy API key stays benched before it is retried.
pub const KEY_COOLDOWN: Duration = Duration::from_secs(5 * 60);
/// Gap after which an isolated key failure stops counting toward the
/// unhealthy threshold.
pub const KEY_FAILURE_DECAY: Duration = Duration::from_secs(2 * 60);
/// Consecutive (non-decayed) failures after which a key is marked unhealthy.
pub const KEY_UNHEALTHY_THRESHOLD: u32 = 2;
/// Upper bound on key-rotation attempts per provider call.
pub const MAX_KEY_ATTEMPTS: usize = 3;

/// Case-insensitive substrings that mark a provider response body as a
/// key/quota problem (rotate to the next key) rather than a data problem.
pub const KEY_ERROR_PATTERNS: &[&str] = &[
    "rate limit",
    "quota",
    "limit exceeded",
    "request quota",
    "invalid key",
    "invalid api key",
    "unauthorized",
    "too many requests",
    "daily limit",
    "monthly limit",
    "exceeded",
    "throttl",
];

/// Default model for the LLM summarizer.
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";
/// Sampling temperature for the LLM summarizer.
pub const LLM_TEMPERATURE: f64 = 0.3;
/// Prefix of the sentinel reasoning string returned on LLM failure.
/// Responses starting with this are never cached.
pub const AI_FAILURE_PREFIX: &str = "AI Analysis Failed";
/// Canonical "LLM not available" reasoning string. Never cached.
pub const AI_UNAVAILABLE_MESSAGE: &str =
    "AI analysis is temporarily unavailable. Please try again later.";

/// AbuseIPDB report window, in days.
pub const ABUSEIPDB_MAX_AGE_DAYS: u32 = 90;
