use async_trait::async_trait;
use recall_core::RecallError;
use sha2::{Digest, Sha256};

use crate::Embeddings;

/// Signed feature-hashing term-frequency embeddings.
///
/// Text is lowercased and split into alphanumeric tokens. Each token hashes
/// to one slot and a sign; counts accumulate and the result is L2-normalized.
/// Texts sharing vocabulary land close together, with no model download.
pub struct HashingEmbeddings {
    dimensions: usize,
}

impl HashingEmbeddings {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vec;
        }

        for token in tokenize(text) {
            let (idx, sign) = slot_for(&token, self.dimensions);
            vec[idx] += sign;
        }

        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vec {
                *x /= magnitude;
            }
        }
        vec
    }
}

impl Default for HashingEmbeddings {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl Embeddings for HashingEmbeddings {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RecallError> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RecallError> {
        Ok(self.embed(text))
    }

    fn dimension(&self) -> usize {
        self.dimensions
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Slot index from the first four digest bytes, sign from the fifth.
fn slot_for(token: &str, dimensions: usize) -> (usize, f32) {
    let digest = Sha256::digest(token.as_bytes());
    let raw = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    let sign = if digest[4] & 1 == 1 { 1.0 } else { -1.0 };
    (raw as usize % dimensions, sign)
}
