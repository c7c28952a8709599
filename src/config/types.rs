//! Configuration types.
//!
//! The service is configured through the environment (12-factor style). This
//! module defines the [`Config`] struct, the coercion rules applied to raw
//! values, and the CLI enums for logging.

use std::time::Duration;

use clap::ValueEnum;

use super::constants::{
    DEFAULT_API_TIMEOUT_MS, DEFAULT_CACHE_TTL_SECS, DEFAULT_CONNECTIVITY_TIMEOUT_MS,
    DEFAULT_FRONTEND_TIMEOUT_MS, DEFAULT_LLM_MODEL, MIN_API_TIMEOUT_MS, MIN_CACHE_TTL_SECS,
};

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Deployment environment. Controls error verbosity on the API surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    /// Local development: API errors carry details.
    Development,
    /// Production (default): API errors are terse.
    Production,
}

/// LLM summarizer settings. Present only when `LLM_API_KEY` is configured.
#[derive(Clone, Debug)]
pub struct LlmConfig {
    /// Bearer token for the completion endpoint.
    pub api_key: String,
    /// Base URL of an OpenAI-compatible API (no trailing `/chat/completions`).
    pub base_url: String,
    /// Model identifier.
    pub model: String,
}

/// Nullable host hints surfaced verbatim by `GET /api/config`.
#[derive(Clone, Debug, Default)]
pub struct HostHints {
    /// Host probed for plain IPv4 connectivity.
    pub ipv4_host: Option<String>,
    /// Host probed for plain IPv6 connectivity.
    pub ipv6_host: Option<String>,
    /// Cloudflare-fronted IPv4 host.
    pub cfv4_host: Option<String>,
    /// Cloudflare-fronted IPv6 host.
    pub cfv6_host: Option<String>,
    /// Hurricane Electric tunnel host.
    pub he_host: Option<String>,
}

/// Service configuration.
///
/// Built from the environment with [`Config::from_env`], or constructed
/// directly in tests. Provider credentials accept comma-separated multi-key
/// values; every key in a value joins that provider's rotation pool.
#[derive(Clone, Debug)]
pub struct Config {
    /// Deployment environment.
    pub environment: Environment,

    /// Per-request timeout for provider calls.
    pub api_timeout: Duration,

    /// Frontend timeout hint (ms), surfaced by `/api/config`.
    pub frontend_timeout_ms: u64,

    /// Connectivity-probe timeout hint (ms), surfaced by `/api/config`.
    pub connectivity_timeout_ms: u64,

    /// TTL for positive merged-record cache entries.
    pub cache_ttl: Duration,

    /// IPQualityScore API keys.
    pub ipqs_keys: Vec<String>,

    /// AbuseIPDB API keys.
    pub abuseipdb_keys: Vec<String>,

    /// IP2Location.io API keys.
    pub ip2location_keys: Vec<String>,

    /// ipinfo.io tokens.
    pub ipinfo_tokens: Vec<String>,

    /// Cloudflare API tokens (Radar ASN lookups).
    pub cloudflare_tokens: Vec<String>,

    /// LLM summarizer settings, if configured.
    pub llm: Option<LlmConfig>,

    /// Host hints for the UI.
    pub hosts: HostHints,

    /// Test hook: when set, every provider URL is rewritten to
    /// `<override>/<provider-name><path>` so a single mock server can stand
    /// in for the whole provider universe.
    pub provider_base_override: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            api_timeout: Duration::from_millis(DEFAULT_API_TIMEOUT_MS),
            frontend_timeout_ms: DEFAULT_FRONTEND_TIMEOUT_MS,
            connectivity_timeout_ms: DEFAULT_CONNECTIVITY_TIMEOUT_MS,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            ipqs_keys: Vec::new(),
            abuseipdb_keys: Vec::new(),
            ip2location_keys: Vec::new(),
            ipinfo_tokens: Vec::new(),
            cloudflare_tokens: Vec::new(),
            llm: None,
            hosts: HostHints::default(),
            provider_base_override: None,
        }
    }
}

impl Config {
    /// Loads configuration from the process environment, applying defaults
    /// and coercion rules for out-of-range values.
    pub fn from_env() -> Self {
        let environment = match env_var("ENVIRONMENT").as_deref() {
            Some("development") => Environment::Development,
            _ => Environment::Production,
        };

        let api_timeout_ms = env_parse("API_TIMEOUT_MS", DEFAULT_API_TIMEOUT_MS);
        let api_timeout_ms = if api_timeout_ms < MIN_API_TIMEOUT_MS {
            log::warn!(
                "API_TIMEOUT_MS={} below minimum, using {} ms",
                api_timeout_ms,
                MIN_API_TIMEOUT_MS
            );
            MIN_API_TIMEOUT_MS
        } else {
            api_timeout_ms
        };

        let cache_ttl_secs = env_parse("CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECS);
        let cache_ttl_secs = if cache_ttl_secs < MIN_CACHE_TTL_SECS {
            log::warn!(
                "CACHE_TTL_SECONDS={} below minimum, using default {} s",
                cache_ttl_secs,
                DEFAULT_CACHE_TTL_SECS
            );
            DEFAULT_CACHE_TTL_SECS
        } else {
            cache_ttl_secs
        };

        let llm = env_var("LLM_API_KEY").map(|api_key| LlmConfig {
            api_key,
            base_url: env_var("LLM_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: env_var("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        });

        Self {
            environment,
            api_timeout: Duration::from_millis(api_timeout_ms),
            frontend_timeout_ms: env_parse("FRONTEND_TIMEOUT_MS", DEFAULT_FRONTEND_TIMEOUT_MS),
            connectivity_timeout_ms: env_parse(
                "CONNECTIVITY_TIMEOUT_MS",
                DEFAULT_CONNECTIVITY_TIMEOUT_MS,
            ),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            ipqs_keys: env_keys("IPQS_KEY"),
            abuseipdb_keys: env_keys("ABUSEIPDB_KEY"),
            ip2location_keys: env_keys("IP2LOCATION_KEY"),
            ipinfo_tokens: env_keys("IPINFO_TOKEN"),
            cloudflare_tokens: env_keys("CLOUDFLARE_API_TOKEN"),
            llm,
            hosts: HostHints {
                ipv4_host: env_var("IPV4_HOST"),
                ipv6_host: env_var("IPV6_HOST"),
                cfv4_host: env_var("CFV4_HOST"),
                cfv6_host: env_var("CFV6_HOST"),
                he_host: env_var("HE_HOST"),
            },
            provider_base_override: None,
        }
    }

    /// Credential pool for a provider, by provider name.
    ///
    /// Unknown names return an empty slice (the provider is simply disabled).
    pub fn credentials(&self, provider: &str) -> &[String] {
        match provider {
            "ipqs" => &self.ipqs_keys,
            "abuseipdb" => &self.abuseipdb_keys,
            "ip2location" => &self.ip2location_keys,
            "ipinfo" => &self.ipinfo_tokens,
            "cloudflare_asn" => &self.cloudflare_tokens,
            _ => &[],
        }
    }

    /// Timeout applied to LLM calls: three times the provider timeout.
    pub fn llm_timeout(&self) -> Duration {
        self.api_timeout * 3
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    env_var(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Splits a comma-separated credential value into individual keys.
fn env_keys(name: &str) -> Vec<String> {
    parse_key_list(&env_var(name).unwrap_or_default())
}

/// Parses a comma-separated key list, dropping empty segments.
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
