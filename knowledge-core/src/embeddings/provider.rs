//! Embedding provider trait and shared vector utilities

use anyhow::Result;
use async_trait::async_trait;

/// Trait for embedding providers that convert text to unit-norm vectors
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts in batch
    ///
    /// Default implementation calls [`EmbeddingProvider::embed`] per text;
    /// real providers override this with a batched call.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// The fixed dimension of every vector this provider produces
    fn dimension(&self) -> usize;

    /// Model name or identifier
    fn model_name(&self) -> &str;
}

/// Utility functions shared by providers and the indexing job
pub mod utils {
    use anyhow::Result;

    /// Normalize a vector to unit length. Zero vectors pass through.
    pub fn normalize_vector(mut vector: Vec<f32>) -> Vec<f32> {
        let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vector {
                *x /= magnitude;
            }
        }
        vector
    }

    /// Validate an embedding has the expected dimension
    pub fn validate_dimension(embedding: &[f32], expected: usize) -> Result<()> {
        if embedding.len() != expected {
            anyhow::bail!(
                "Embedding dimension mismatch: got {}, expected {}",
                embedding.len(),
                expected
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::utils;

    #[test]
    fn normalize_produces_unit_vector() {
        let normalized = utils::normalize_vector(vec![3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 0.001);
        assert!((normalized[1] - 0.8).abs() < 0.001);

        let magnitude = normalized.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.001);
    }

    #[test]
    fn validate_dimension_rejects_mismatch() {
        let embedding = vec![1.0, 2.0, 3.0];
        assert!(utils::validate_dimension(&embedding, 3).is_ok());
        assert!(utils::validate_dimension(&embedding, 384).is_err());
    }
}
