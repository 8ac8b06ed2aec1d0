//! Semantic cache: cosine-similarity lookup over embedded prior responses.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::types::{ModelId, Response};

/// Default embedding dimension (spec §4.4, default 128).
pub const DEFAULT_DIMENSION: usize = 128;

/// Recommended floor below which a match is not considered similar enough,
/// even if it scores highest among candidates (spec §4.4, "similarity
/// floor ≥ 0.5 recommended"). Callers may pass a stricter `min_similarity`
/// per request; this is only the cache's own sanity floor.
pub const RECOMMENDED_SIMILARITY_FLOOR: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct SemanticCacheEntry {
    pub embedding: Vec<f32>,
    pub response: Response,
    pub query: String,
    pub system_prompt: Option<String>,
    pub model: Option<ModelId>,
    pub expires_at: Instant,
}

/// Outcome of [`SemanticCache::find_similar`].
#[derive(Debug, Clone)]
pub struct SimilarMatch {
    pub response: Response,
    pub similarity: f32,
}

/// Stores entries in a `Vec` behind an `RwLock`: reads (the common case,
/// a linear cosine scan) proceed concurrently; moka has no native vector
/// index so this is the spec's own algorithm, not a cache-crate feature.
pub struct SemanticCache {
    entries: RwLock<Vec<SemanticCacheEntry>>,
    dimension: usize,
    max_entries: usize,
}

impl SemanticCache {
    pub fn new(dimension: usize, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            dimension,
            max_entries,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Scan for the single highest-scoring non-expired entry (matching
    /// `model` when the entry has one recorded) whose cosine similarity to
    /// `query_embedding` is at least `min_similarity`.
    ///
    /// `query_embedding` must already be L2-normalized and of `self.
    /// dimension()` length; this method trusts the caller (the executor)
    /// to have produced it via the configured `EmbeddingProvider`.
    pub fn find_similar(
        &self,
        query_embedding: &[f32],
        model: Option<&ModelId>,
        min_similarity: f32,
    ) -> Option<SimilarMatch> {
        let now = Instant::now();
        let entries = self.entries.read().expect("semantic cache lock poisoned");
        let mut best: Option<(f32, usize)> = None;
        for (idx, entry) in entries.iter().enumerate() {
            if entry.expires_at <= now {
                continue;
            }
            if let (Some(entry_model), Some(query_model)) = (&entry.model, model) {
                if entry_model != query_model {
                    continue;
                }
            }
            let sim = cosine_similarity(query_embedding, &entry.embedding);
            if sim >= min_similarity {
                match best {
                    Some((best_sim, _)) if best_sim >= sim => {}
                    _ => best = Some((sim, idx)),
                }
            }
        }
        best.map(|(sim, idx)| SimilarMatch {
            response: entries[idx].response.clone(),
            similarity: sim,
        })
    }

    /// Insert an entry, L2-normalizing nothing (the embedding is expected
    /// to already be unit-norm — see `EmbeddingProvider`). Evicts the
    /// oldest entry (by insertion order) when `max_entries` is exceeded,
    /// since there is no natural LRU ordering over a similarity scan.
    pub fn set(&self, entry: SemanticCacheEntry) {
        let mut entries = self.entries.write().expect("semantic cache lock poisoned");
        if entries.len() >= self.max_entries {
            entries.remove(0);
        }
        entries.push(entry);
    }

    pub fn clear(&self) {
        self.entries.write().expect("semantic cache lock poisoned").clear();
    }

    /// Drop expired entries; returns how many were removed. Intended to be
    /// called from the same periodic sweeper that drives `ExactCache::
    /// sweep`.
    pub fn sweep(&self) -> u64 {
        let now = Instant::now();
        let mut entries = self.entries.write().expect("semantic cache lock poisoned");
        let before = entries.len();
        entries.retain(|e| e.expires_at > now);
        (before - entries.len()) as u64
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("semantic cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-entry fixed overhead, plus `8·D` for the stored embedding (one
    /// `f32` per dimension, counted as 8 bytes the way the exact tier's
    /// string-length term is doubled), plus twice the length of the stored
    /// query/system-prompt/response text (spec §4.4).
    pub fn approx_memory_bytes(&self) -> u64 {
        const FIXED_OVERHEAD: u64 = 128;
        let embedding_bytes = 8 * self.dimension as u64;
        self.entries
            .read()
            .expect("semantic cache lock poisoned")
            .iter()
            .map(|entry| {
                let text_len = entry.query.len()
                    + entry.system_prompt.as_deref().map(str::len).unwrap_or(0)
                    + entry.response.text.len();
                FIXED_OVERHEAD + embedding_bytes + text_len as u64 * 2
            })
            .sum()
    }
}

/// Dot product of two unit-norm vectors, i.e. their cosine similarity.
/// Vectors of mismatched length are treated as dissimilar (0.0) rather
/// than panicking, since a dimension mismatch indicates a misconfigured
/// embedder rather than a value the cache should crash on.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn default_ttl() -> Duration {
    Duration::from_secs(3600)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Savings, Source, Usage};

    fn unit(v: Vec<f32>) -> Vec<f32> {
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter().map(|x| x / norm).collect()
    }

    fn entry(embedding: Vec<f32>, ttl: Duration) -> SemanticCacheEntry {
        SemanticCacheEntry {
            embedding,
            response: Response {
                text: "cached".into(),
                model: ModelId::new("m"),
                provider: Some(crate::types::ProviderId::Claude),
                usage: Usage::default(),
                parsed_data: None,
                processing_time_ms: 1.0,
                source: Source::SemanticCache,
                similarity: None,
                savings: Savings::default(),
                success: true,
                error: None,
            },
            query: "q".into(),
            system_prompt: None,
            model: None,
            expires_at: Instant::now() + ttl,
        }
    }

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = unit(vec![1.0, 2.0, 3.0]);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        let a = unit(vec![1.0, 0.0]);
        let b = unit(vec![0.0, 1.0]);
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn finds_best_match_above_threshold() {
        let cache = SemanticCache::new(2, 10);
        cache.set(entry(unit(vec![1.0, 0.0]), Duration::from_secs(60)));
        cache.set(entry(unit(vec![0.9, 0.1]), Duration::from_secs(60)));
        let query = unit(vec![1.0, 0.0]);
        let result = cache.find_similar(&query, None, 0.5).unwrap();
        assert!(result.similarity >= 0.99);
    }

    #[test]
    fn below_threshold_returns_none() {
        let cache = SemanticCache::new(2, 10);
        cache.set(entry(unit(vec![0.0, 1.0]), Duration::from_secs(60)));
        let query = unit(vec![1.0, 0.0]);
        assert!(cache.find_similar(&query, None, 0.9).is_none());
    }

    #[test]
    fn expired_entries_are_skipped() {
        let cache = SemanticCache::new(2, 10);
        cache.set(entry(unit(vec![1.0, 0.0]), Duration::from_millis(0)));
        std::thread::sleep(Duration::from_millis(5));
        let query = unit(vec![1.0, 0.0]);
        assert!(cache.find_similar(&query, None, 0.5).is_none());
    }

    #[test]
    fn model_mismatch_is_skipped() {
        let cache = SemanticCache::new(2, 10);
        let mut e = entry(unit(vec![1.0, 0.0]), Duration::from_secs(60));
        e.model = Some(ModelId::new("claude"));
        cache.set(e);
        let query = unit(vec![1.0, 0.0]);
        let other_model = ModelId::new("gpt-4");
        assert!(cache
            .find_similar(&query, Some(&other_model), 0.5)
            .is_none());
    }
}
