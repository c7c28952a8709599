//! Per-provider API-key pools.
//!
//! Each keyed provider rotates through its configured keys round-robin. Keys
//! that keep failing are benched for a cooldown window and quietly brought
//! back afterwards; a single success restores a key immediately. The pool
//! never fails the aggregation itself: running out of usable keys surfaces
//! as one provider-level error.

use std::sync::Arc;
use std::sync::Mutex;

use crate::clock::Clock;
use crate::config::{
    KEY_COOLDOWN, KEY_ERROR_PATTERNS, KEY_FAILURE_DECAY, KEY_UNHEALTHY_THRESHOLD,
};

/// Health bookkeeping for one API key.
#[derive(Clone, Debug)]
struct KeyState {
    key: String,
    is_healthy: bool,
    last_failure_at: Option<i64>,
    failure_count: u32,
    success_count: u64,
}

impl KeyState {
    fn new(key: String) -> Self {
        Self {
            key,
            is_healthy: true,
            last_failure_at: None,
            failure_count: 0,
            success_count: 0,
        }
    }
}

/// A key handed out by [`CredentialPool::get_next`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeasedKey {
    /// Index into the pool; pass back to `mark_success`/`mark_failure`.
    pub index: usize,
    /// The key material itself.
    pub key: String,
}

/// Rotating key pool for one provider.
#[derive(Debug)]
pub struct CredentialPool {
    provider: String,
    clock: Arc<dyn Clock>,
    state: Mutex<PoolState>,
}

#[derive(Debug)]
struct PoolState {
    keys: Vec<KeyState>,
    cursor: usize,
}

impl CredentialPool {
    /// Builds a pool from an ordered key list.
    pub fn new(provider: &str, keys: &[String], clock: Arc<dyn Clock>) -> Self {
        Self {
            provider: provider.to_string(),
            clock,
            state: Mutex::new(PoolState {
                keys: keys.iter().cloned().map(KeyState::new).collect(),
                cursor: 0,
            }),
        }
    }

    // Lock poisoning keeps the state usable; health bookkeeping is not
    // worth failing an aggregation over.
    fn state(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of keys in the pool (healthy or not).
    pub fn len(&self) -> usize {
        self.state().keys.len()
    }

    /// True when no keys are configured at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hands out the next healthy key, round-robin from the cursor.
    ///
    /// Runs the recovery sweep first: keys past the cooldown window become
    /// healthy again, and stale single failures decay so they don't
    /// accumulate into a bench over hours.
    pub fn get_next(&self) -> Option<LeasedKey> {
        let now = self.clock.now_millis();
        let mut state = self.state();
        let len = state.keys.len();
        if len == 0 {
            return None;
        }

        for entry in &mut state.keys {
            if let Some(failed_at) = entry.last_failure_at {
                let gap = now - failed_at;
                if gap >= KEY_COOLDOWN.as_millis() as i64 {
                    entry.is_healthy = true;
                    entry.failure_count = 0;
                } else if gap > KEY_FAILURE_DECAY.as_millis() as i64
                    && entry.failure_count < KEY_UNHEALTHY_THRESHOLD
                {
                    entry.failure_count = 0;
                }
            }
        }

        for _ in 0..len {
            let index = state.cursor % len;
            state.cursor = (state.cursor + 1) % len;
            if state.keys[index].is_healthy {
                return Some(LeasedKey {
                    index,
                    key: state.keys[index].key.clone(),
                });
            }
        }

        log::warn!("{}: no healthy API key available", self.provider);
        None
    }

    /// Records a successful call with the key at `index`.
    pub fn mark_success(&self, index: usize) {
        let mut state = self.state();
        let Some(entry) = state.keys.get_mut(index) else {
            return;
        };
        entry.success_count += 1;
        if entry.failure_count > 0 {
            entry.failure_count = 0;
            entry.is_healthy = true;
        }
    }

    /// Records a failed call with the key at `index`.
    ///
    /// An isolated failure older than the decay window does not count toward
    /// the bench threshold.
    pub fn mark_failure(&self, index: usize, reason: &str) {
        let now = self.clock.now_millis();
        let mut state = self.state();
        let Some(entry) = state.keys.get_mut(index) else {
            return;
        };
        if let Some(failed_at) = entry.last_failure_at {
            if now - failed_at > KEY_FAILURE_DECAY.as_millis() as i64 {
                entry.failure_count = 0;
            }
        }
        entry.failure_count += 1;
        entry.last_failure_at = Some(now);
        if entry.failure_count >= KEY_UNHEALTHY_THRESHOLD {
            entry.is_healthy = false;
            log::warn!(
                "{}: key #{} benched after {} failures ({})",
                self.provider,
                index,
                entry.failure_count,
                reason
            );
        } else {
            log::debug!("{}: key #{} failed ({})", self.provider, index, reason);
        }
    }

    /// Healthy-key count, for health reporting.
    pub fn healthy_count(&self) -> usize {
        let state = self.state();
        state.keys.iter().filter(|k| k.is_healthy).count()
    }
}

/// Classifies a provider failure as key-related (worth rotating to the next
/// key) from the HTTP status and/or response body.
pub fn is_key_related_error(status: Option<u16>, body: &str) -> bool {
    if matches!(status, Some(401) | Some(403) | Some(429)) {
        return true;
    }
    let lowered = body.to_lowercase();
    KEY_ERROR_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}
