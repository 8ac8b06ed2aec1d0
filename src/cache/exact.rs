//! Exact-match cache: LRU with per-entry TTL keyed by canonical request hash.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::types::Response;

/// Default maximum number of entries (spec §4.4, `maxEntries` default 100).
pub const DEFAULT_MAX_ENTRIES: u64 = 100;

/// Default TTL applied to an entry when the request doesn't override it.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Canonical hash key for an exact-cache lookup: `{model, temperature,
/// systemPrompt, prompt}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExactKey(u64);

impl ExactKey {
    /// Reconstruct a key from a raw hash, e.g. one loaded from a
    /// [`crate::cache::persistence::PersistedEntry`] whose original field
    /// inputs are no longer available.
    pub fn from_raw(hash: u64) -> Self {
        Self(hash)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn compute(
        model: &str,
        temperature: Option<f32>,
        system_prompt: Option<&str>,
        prompt: &str,
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        model.hash(&mut hasher);
        temperature.map(|t| t.to_bits()).hash(&mut hasher);
        system_prompt.hash(&mut hasher);
        prompt.hash(&mut hasher);
        Self(hasher.finish())
    }
}

#[derive(Debug, Clone)]
pub struct ExactCacheEntry {
    pub response: Response,
    pub created_at: std::time::Instant,
    pub expires_at: std::time::Instant,
}

/// Point-in-time snapshot of cache occupancy and sweeper activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub total_entries: u64,
    pub expired_on_last_sweep: u64,
    pub approx_memory_bytes: u64,
}

/// LRU-with-TTL cache over [`ExactKey`] → [`ExactCacheEntry`].
///
/// Built on `moka::sync::Cache` (grounded in the teacher's `cache::
/// ModelCache` / `cache::response::ResponseCache`), with an eviction
/// listener recording expirations so `expired_on_last_sweep` is exact
/// rather than diff-counted.
pub struct ExactCache {
    entries: moka::sync::Cache<ExactKey, ExactCacheEntry>,
    expired_since_sweep: Arc<AtomicU64>,
    default_ttl: Duration,
}

impl ExactCache {
    pub fn new(max_entries: u64, default_ttl: Duration) -> Self {
        let expired_since_sweep = Arc::new(AtomicU64::new(0));
        let listener_counter = expired_since_sweep.clone();
        let entries = moka::sync::Cache::builder()
            .max_capacity(max_entries)
            .eviction_listener(move |_k, _v, cause| {
                if matches!(cause, moka::notification::RemovalCause::Expired) {
                    listener_counter.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();
        Self {
            entries,
            expired_since_sweep,
            default_ttl,
        }
    }

    /// Look up `key`. Returns `None` on miss or if the stored entry has
    /// already expired (moka lazily evicts on next access/sweep, but an
    /// expired entry observed here is still reported as a miss).
    pub fn get(&self, key: &ExactKey) -> Option<Response> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= std::time::Instant::now() {
            self.entries.invalidate(key);
            return None;
        }
        Some(entry.response)
    }

    /// Insert `response` under `key` with `ttl` (falling back to the
    /// cache's default TTL).
    pub fn set(&self, key: ExactKey, response: Response, ttl: Option<Duration>) {
        let now = std::time::Instant::now();
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = ExactCacheEntry {
            response,
            created_at: now,
            expires_at: now + ttl,
        };
        self.entries.insert(key, entry);
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Run moka's pending maintenance (applies eviction listener callbacks
    /// for entries that expired since the last sweep) and return a stats
    /// snapshot. Intended to be called from a periodic `tokio::time::
    /// interval` task (spec default: every 5 minutes).
    pub fn sweep(&self) -> CacheStats {
        self.entries.run_pending_tasks();
        let expired = self.expired_since_sweep.swap(0, Ordering::Relaxed);
        CacheStats {
            total_entries: self.entries.entry_count(),
            expired_on_last_sweep: expired,
            approx_memory_bytes: self.approx_memory_bytes(),
        }
    }

    /// Serializable snapshot of all non-expired entries, for the durable
    /// mirror (spec §4.4, "serialize non-expired entries... reload on
    /// startup, filtering expired entries").
    pub fn snapshot(&self) -> Vec<super::persistence::PersistedEntry> {
        use std::time::{SystemTime, UNIX_EPOCH};
        let now_instant = std::time::Instant::now();
        let now_unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.entries
            .iter()
            .filter_map(|(key, entry)| {
                if entry.expires_at <= now_instant {
                    return None;
                }
                let remaining = entry.expires_at.saturating_duration_since(now_instant);
                Some(super::persistence::PersistedEntry {
                    key_hash: key.raw(),
                    response: entry.response.clone(),
                    expires_at_unix_ms: now_unix_ms + remaining.as_millis() as u64,
                })
            })
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.entry_count(),
            expired_on_last_sweep: self.expired_since_sweep.load(Ordering::Relaxed),
            approx_memory_bytes: self.approx_memory_bytes(),
        }
    }

    /// Per-entry fixed overhead plus twice the stored text length (spec
    /// §4.4: "per-entry fixed overhead + 8·D + length of stored strings·2";
    /// the exact tier has no embedding, so its `8·D` term is 0).
    fn approx_memory_bytes(&self) -> u64 {
        const FIXED_OVERHEAD: u64 = 128;
        self.entries
            .iter()
            .map(|(_, entry)| FIXED_OVERHEAD + entry.response.text.len() as u64 * 2)
            .sum()
    }
}
