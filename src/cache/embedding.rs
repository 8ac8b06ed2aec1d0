//! Embedding capability consumed by the semantic cache.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::error::Result;

/// Produces a fixed-dimension, unit-L2-norm embedding for a piece of text.
///
/// The semantic cache relies only on the similarity threshold and the
/// exactness of the cosine math; it does not (and cannot) assume anything
/// about embedding quality, so any implementation satisfying the unit-norm
/// and fixed-dimension contract is usable.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimensionality this provider always returns.
    fn dimension(&self) -> usize;
}

/// Deterministic hashed bag-of-words embedder.
///
/// This is a reference implementation only, not a quality embedding model:
/// tokens are hashed into buckets and the resulting vector is L2-normalized.
/// It is useful for exercising the cache's similarity math in tests and as
/// a zero-dependency default, but two semantically identical prompts with
/// no shared tokens will not score as similar. Swap in a real
/// `EmbeddingProvider` for production semantic matching.
pub struct HashedBagOfWordsEmbedder {
    dimension: usize,
}

impl HashedBagOfWordsEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashedBagOfWordsEmbedder {
    fn default() -> Self {
        Self::new(128)
    }
}

#[async_trait]
impl EmbeddingProvider for HashedBagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut buckets = vec![0.0f32; self.dimension];
        for token in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let idx = (hasher.finish() as usize) % self.dimension;
            buckets[idx] += 1.0;
        }
        let norm = buckets.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut buckets {
                *v /= norm;
            }
        }
        Ok(buckets)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
