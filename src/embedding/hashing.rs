// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic feature-hashing embedder.
//!
//! Lowercased words and their padded character trigrams are hashed with
//! blake3 into a fixed number of signed buckets. No model download, stable
//! across platforms, and close enough to lexical overlap to rank offline.

use super::provider::{ensure_texts, Embedding, EmbeddingProvider};
use super::similarity::l2_normalize;
use crate::errors::{Origin, RankError, RankResult};

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model_id: format!("hashing-{}", dimension),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_text(&self, text: &str) -> RankResult<Embedding> {
        let mut vector = vec![0.0f32; self.dimension];
        let mut features = 0usize;

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            self.accumulate(&mut vector, &format!("w:{}", word), WORD_WEIGHT);

            let padded: Vec<char> = format!("<{}>", word).chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.accumulate(&mut vector, &format!("g:{}", gram), TRIGRAM_WEIGHT);
            }
            features += 1;
        }

        if features == 0 {
            return Err(RankError::embedding("text has no word characters"));
        }

        l2_normalize(&mut vector);
        if vector.iter().all(|&v| v == 0.0) {
            return Err(RankError::embedding("hashed features cancelled out"));
        }
        Ok(vector)
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let hash = blake3::hash(feature.as_bytes());
        let bytes = hash.as_bytes();
        let mut idx = [0u8; 8];
        idx.copy_from_slice(&bytes[..8]);
        let slot = (u64::from_le_bytes(idx) % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[slot] += sign * weight;
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn batch_size(&self) -> usize {
        256
    }

    fn max_concurrency(&self) -> usize {
        usize::MAX
    }

    fn embed_batch(&self, texts: &[&str]) -> RankResult<Vec<Embedding>> {
        ensure_texts(texts)?;
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                self.embed_text(text)
                    .map_err(|e| e.with_origin(Origin::Batch { index: i }))
            })
            .collect()
    }
}
