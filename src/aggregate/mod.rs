//! Single-IP aggregation.
//!
//! The [`Engine`] owns the provider fan-out pipeline: cache lookup, wave 1
//! (no-key and keyed providers), ASN resolution, wave 2 (ASN-dependent
//! providers), merge, and the cache write. Every provider failure is
//! tolerated; the result always comes back, possibly with an empty merge and
//! a full error list.

mod merge;

pub use merge::{overlay, resolve_asn};

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::cache::Cache;
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, NEGATIVE_CACHE_TTL_SECS, PER_IP_CONCURRENCY};
use crate::credentials::CredentialPool;
use crate::error_handling::ProcessingStats;
use crate::fetcher::fetch_provider;
use crate::initialization::init_client;
use crate::models::{IpBundle, MergedMap, ProviderFailure, ProviderSuccess};
use crate::providers::{partition_enabled, Provider, PROVIDERS};

/// Shape persisted under `v1:merged:<ip>`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergedCacheEntry {
    merged: MergedMap,
    successful: Vec<ProviderSuccess>,
    errors: Vec<ProviderFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    asn: Option<String>,
    cached_at: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_negative_cache: bool,
}

/// The aggregation engine: one per process.
///
/// Holds the shared HTTP client, the TTL cache, and the per-provider
/// credential pools. Cheap to share behind an `Arc`.
pub struct Engine {
    config: Arc<Config>,
    client: Arc<reqwest::Client>,
    cache: Cache,
    pools: HashMap<&'static str, Arc<CredentialPool>>,
    clock: Arc<dyn Clock>,
    stats: Arc<ProcessingStats>,
}

impl Engine {
    /// Builds an engine with the system clock.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Builds an engine with an injected clock (tests drive TTL/cooldown).
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = init_client(&config).context("Failed to initialize HTTP client")?;
        let pools = PROVIDERS
            .iter()
            .filter(|p| p.needs_key())
            .map(|p| {
                let pool = CredentialPool::new(p.name, config.credentials(p.name), clock.clone());
                (p.name, Arc::new(pool))
            })
            .collect();
        Ok(Self {
            cache: Cache::new(clock.clone()),
            config: Arc::new(config),
            client,
            pools,
            clock,
            stats: Arc::new(ProcessingStats::new()),
        })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The engine's clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The shared TTL cache.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Failure counters across all provider calls.
    pub fn stats(&self) -> &Arc<ProcessingStats> {
        &self.stats
    }

    /// Credential pool for a provider, if it has one.
    pub fn pool(&self, provider: &str) -> Option<&Arc<CredentialPool>> {
        self.pools.get(provider)
    }

    /// Aggregates one IP across all enabled providers.
    ///
    /// `asn_hint` short-circuits ASN discovery (e.g. from an edge snapshot).
    /// Never fails: provider errors land in the bundle's error list, cache
    /// problems degrade to a refetch.
    pub async fn check_ip(&self, ip: &str, asn_hint: Option<String>) -> IpBundle {
        let cache_key = Cache::merged_key(ip);
        if let Some(entry) = self.cache.get::<MergedCacheEntry>(&cache_key).await {
            log::debug!("cache hit for {ip}");
            let attempted = entry.successful.len() + entry.errors.len();
            return IpBundle {
                ip: ip.to_string(),
                asn: entry.asn,
                successful: entry.successful,
                errors: entry.errors,
                merged: entry.merged,
                partially_from_cache: true,
                cached_api_count: attempted,
                total_api_count: attempted,
            };
        }

        let partition = partition_enabled(&self.config);
        let semaphore = Arc::new(Semaphore::new(PER_IP_CONCURRENCY));

        // Wave 1: everything that only needs the IP.
        let wave1: Vec<&'static Provider> = partition.wave1().copied().collect();
        let (mut successful, mut errors) = self.run_wave(&wave1, ip, &semaphore).await;

        let mut merged = MergedMap::new();
        for success in &successful {
            overlay(&mut merged, &success.data);
        }

        let asn = asn_hint.or_else(|| resolve_asn(&merged));

        // Wave 2: ASN-dependent providers, only once the ASN is known.
        if let Some(asn) = asn.as_deref() {
            if !partition.asn_dependent.is_empty() {
                let (wave2_ok, wave2_err) = self
                    .run_wave(&partition.asn_dependent, asn, &semaphore)
                    .await;
                for success in &wave2_ok {
                    overlay(&mut merged, &success.data);
                }
                successful.extend(wave2_ok);
                errors.extend(wave2_err);
            }
        }

        let bundle = IpBundle {
            ip: ip.to_string(),
            asn,
            total_api_count: successful.len() + errors.len(),
            successful,
            errors,
            merged,
            partially_from_cache: false,
            cached_api_count: 0,
        };

        self.write_cache(&cache_key, &bundle).await;
        bundle
    }

    /// Runs one wave of providers concurrently under the per-IP cap,
    /// collecting outcomes in completion order.
    async fn run_wave(
        &self,
        providers: &[&'static Provider],
        target: &str,
        semaphore: &Arc<Semaphore>,
    ) -> (Vec<ProviderSuccess>, Vec<ProviderFailure>) {
        let mut tasks = FuturesUnordered::new();
        for provider in providers {
            let provider: &'static Provider = *provider;
            let semaphore = Arc::clone(semaphore);
            tasks.push(async move {
                let _permit = semaphore.acquire().await;
                fetch_provider(
                    &self.client,
                    provider,
                    target,
                    self.pools.get(provider.name).map(Arc::as_ref),
                    &self.config,
                    &self.stats,
                )
                .await
            });
        }

        let mut successful = Vec::new();
        let mut errors = Vec::new();
        while let Some(outcome) = tasks.next().await {
            match outcome {
                Ok(success) => successful.push(success),
                Err(failure) => {
                    log::debug!("{}: {}", failure.source, failure.error);
                    errors.push(failure);
                }
            }
        }
        (successful, errors)
    }

    /// Persists the bundle: positive TTL when anything succeeded, the short
    /// negative TTL when everything failed, nothing when nothing ran.
    async fn write_cache(&self, cache_key: &str, bundle: &IpBundle) {
        let any_success = !bundle.successful.is_empty();
        let any_error = !bundle.errors.is_empty();
        if !any_success && !any_error {
            return;
        }
        let ttl = if any_success {
            self.config.cache_ttl
        } else {
            std::time::Duration::from_secs(NEGATIVE_CACHE_TTL_SECS)
        };
        let entry = MergedCacheEntry {
            merged: bundle.merged.clone(),
            successful: bundle.successful.clone(),
            errors: bundle.errors.clone(),
            asn: bundle.asn.clone(),
            cached_at: self.clock.now_millis(),
            is_negative_cache: !any_success,
        };
        self.cache.put(cache_key, &entry, ttl).await;
    }
}
