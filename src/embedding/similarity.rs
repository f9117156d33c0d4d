// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cosine similarity between embedding vectors.
//!
//! Norms are recomputed on every call even though providers hand out unit
//! vectors, so a misbehaving provider surfaces as an error instead of a
//! silently skewed ranking.

use crate::errors::{Origin, RankError, RankResult};

/// Computes `dot(a, b) / (|a| * |b|)`.
///
/// Accumulates in `f64` and clamps to `[-1, 1]`. Fails with
/// [`RankError::DegenerateVector`] when either vector has zero norm and with
/// [`RankError::EmbeddingFailure`] when the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> RankResult<f32> {
    if a.len() != b.len() {
        return Err(RankError::embedding(format!(
            "dimensionality mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if !(norm_a > 0.0 && norm_b > 0.0) || !dot.is_finite() {
        return Err(RankError::DegenerateVector {
            origin: Origin::Unknown,
        });
    }

    let cos = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok(cos.clamp(-1.0, 1.0) as f32)
}

/// Scales `vector` to unit length in place. Zero vectors are left untouched;
/// the scorer rejects them later.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
}
