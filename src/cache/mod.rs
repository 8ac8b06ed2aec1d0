//! Two-tier response cache: exact-match plus semantic similarity.

pub mod embedding;
pub mod exact;
pub mod persistence;
pub mod semantic;

pub use embedding::{EmbeddingProvider, HashedBagOfWordsEmbedder};
pub use exact::{CacheStats as ExactCacheStats, ExactCache, ExactCacheEntry, ExactKey, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
pub use persistence::{FileStore, NullStore, PersistedEntry, PersistentStore};
pub use semantic::{SemanticCache, SemanticCacheEntry, SimilarMatch, DEFAULT_DIMENSION};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which tier(s) a request's lookup and store should use (spec §3,
/// `McpParams.cacheStrategy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    Exact,
    Semantic,
    Hybrid,
}

/// Combined occupancy snapshot across both tiers, returned by
/// `Pipeline::stats()` (spec §6, `getStats`).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub exact_entries: u64,
    pub exact_expired_on_last_sweep: u64,
    pub exact_approx_memory_bytes: u64,
    pub semantic_entries: u64,
    pub semantic_approx_memory_bytes: u64,
}

/// Facade over `ExactCache` and `SemanticCache`, owning the embedding
/// provider and persistence backend used to serve a request's configured
/// `CacheStrategy`.
///
/// The executor is the only caller: it decides *when* to consult which
/// tier (spec §4.3); this facade just exposes the mechanics each tier
/// needs plus a combined stats view.
pub struct CacheTier {
    exact: ExactCache,
    semantic: SemanticCache,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn PersistentStore>,
    namespace: String,
    semantic_enabled: AtomicBool,
    /// Default TTL applied by callers that don't carry their own via
    /// `McpParams.cache_ttl`; adjustable at runtime (spec §6, `setDefaultTTL`).
    default_ttl: RwLock<Duration>,
}

impl CacheTier {
    pub fn new(
        exact_max_entries: u64,
        default_ttl: Duration,
        semantic_dimension: usize,
        semantic_max_entries: usize,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn PersistentStore>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            exact: ExactCache::new(exact_max_entries, default_ttl),
            semantic: SemanticCache::new(semantic_dimension, semantic_max_entries),
            embedder,
            store,
            namespace: namespace.into(),
            semantic_enabled: AtomicBool::new(true),
            default_ttl: RwLock::new(default_ttl),
        }
    }

    pub fn exact(&self) -> &ExactCache {
        &self.exact
    }

    pub fn semantic(&self) -> &SemanticCache {
        &self.semantic
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn set_semantic_enabled(&self, enabled: bool) {
        self.semantic_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn semantic_enabled(&self) -> bool {
        self.semantic_enabled.load(Ordering::Relaxed)
    }

    pub fn default_ttl(&self) -> Duration {
        *self.default_ttl.read().expect("default ttl lock poisoned")
    }

    pub fn set_default_ttl(&self, ttl: Duration) {
        *self.default_ttl.write().expect("default ttl lock poisoned") = ttl;
    }

    /// Load non-expired entries from the durable mirror into the exact
    /// cache. Called once at startup; a no-op with `NullStore`.
    pub fn load_from_store(&self) -> crate::error::Result<()> {
        use std::time::{SystemTime, UNIX_EPOCH};
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        for entry in self.store.load(&self.namespace)? {
            if entry.expires_at_unix_ms <= now_ms {
                continue;
            }
            // The stored key_hash is opaque; we can't reconstruct the
            // original ExactKey's field structure, so entries are
            // rehydrated keyed on their persisted hash directly.
            let key = ExactKey::from_raw(entry.key_hash);
            let remaining = Duration::from_millis(entry.expires_at_unix_ms - now_ms);
            self.exact.set(key, entry.response, Some(remaining));
        }
        Ok(())
    }

    /// Serialize all non-expired exact-cache entries to the durable
    /// mirror. Intended to be called from the same periodic sweeper that
    /// drives `sweep()`, and optionally on graceful shutdown.
    pub fn persist(&self) -> crate::error::Result<()> {
        let snapshot = self.exact.snapshot();
        self.store.save(&self.namespace, &snapshot)
    }

    /// Run both tiers' expiry sweeps and return a combined snapshot.
    pub fn sweep(&self) -> CacheStats {
        let exact_stats = self.exact.sweep();
        self.semantic.sweep();
        CacheStats {
            exact_entries: exact_stats.total_entries,
            exact_expired_on_last_sweep: exact_stats.expired_on_last_sweep,
            exact_approx_memory_bytes: exact_stats.approx_memory_bytes,
            semantic_entries: self.semantic.len() as u64,
            semantic_approx_memory_bytes: self.semantic.approx_memory_bytes(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let exact_stats = self.exact.stats();
        CacheStats {
            exact_entries: exact_stats.total_entries,
            exact_expired_on_last_sweep: exact_stats.expired_on_last_sweep,
            exact_approx_memory_bytes: exact_stats.approx_memory_bytes,
            semantic_entries: self.semantic.len() as u64,
            semantic_approx_memory_bytes: self.semantic.approx_memory_bytes(),
        }
    }

    pub fn clear(&self) {
        self.exact.clear();
        self.semantic.clear();
    }
}
