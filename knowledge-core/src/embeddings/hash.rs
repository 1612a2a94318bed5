//! Deterministic hash-based embedding stub
//!
//! Derives a unit-norm vector from a hash of the input text. Identical
//! inputs always produce identical vectors, so similarity ordering over
//! repeated inputs is stable, which is what the retrieval and caching
//! contracts rely on in tests. Semantic neighbors do not cluster.

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use super::provider::{utils, EmbeddingProvider};

pub struct HashEmbedder {
    name: String,
    dimension: usize,
}

impl HashEmbedder {
    /// Construct the stub. Logs a warning because retrieval quality is
    /// degraded whenever this provider is active outside of tests.
    pub fn new(name: String, dimension: usize) -> Self {
        warn!(
            model = %name,
            dimension,
            "deterministic stub embedder active; semantic retrieval quality is degraded"
        );
        Self { name, dimension }
    }

    /// Generate the deterministic embedding for a text
    #[must_use]
    pub fn generate(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let value = ((seed >> 16) as u16 as f32) / 32768.0 - 1.0;
            embedding.push(value);
        }

        utils::normalize_vector(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.generate(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder() -> HashEmbedder {
        HashEmbedder::new("hash-stub".to_string(), 384)
    }

    #[test]
    fn identical_inputs_produce_identical_vectors() {
        let e = embedder();
        assert_eq!(e.generate("fireball"), e.generate("fireball"));
        assert_ne!(e.generate("fireball"), e.generate("goblin"));
    }

    #[test]
    fn vectors_are_unit_norm() {
        let e = embedder();
        let v = e.generate("a longsword of unusual provenance");
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((0.999..=1.001).contains(&norm), "norm was {norm}");
        assert_eq!(v.len(), 384);
    }

    #[tokio::test]
    async fn batch_matches_single_calls() {
        let e = embedder();
        let texts = vec!["one".to_string(), "two".to_string()];
        let batch = e.embed_batch(&texts).await.unwrap();
        assert_eq!(batch[0], e.embed("one").await.unwrap());
        assert_eq!(batch[1], e.embed("two").await.unwrap());
    }
}
