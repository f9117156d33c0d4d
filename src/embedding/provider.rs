// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider interface and initialization.
//!
//! Providers are created once through [`init_provider`] and shared read-only
//! across all embedding calls of a run.

use anyhow::{Context, Result};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{EmbeddingConfig, EmbeddingProviderType};
use crate::errors::{RankError, RankResult};

use super::command::CommandProvider;
use super::hashing::HashingEmbedder;
use super::remote::RemoteProvider;

/// A dense, unit-normalized text embedding.
pub type Embedding = Vec<f32>;

/// Handle to an initialized provider, shared across worker threads.
pub type SharedProvider = Arc<dyn EmbeddingProvider>;

/// Trait for embedding providers.
///
/// Implementations must be deterministic for a given text and model, and must
/// return unit-length vectors. Empty input is an error, never a zero vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier.
    fn model_id(&self) -> &str;

    /// Returns the batch size used by the provider.
    fn batch_size(&self) -> usize;

    /// Maximum number of calls that may be in flight at once.
    fn max_concurrency(&self) -> usize {
        1
    }

    /// Generates embeddings for the given texts, index-aligned with the input.
    fn embed_batch(&self, texts: &[&str]) -> RankResult<Vec<Embedding>>;

    /// Generates an embedding for a single text.
    fn embed(&self, text: &str) -> RankResult<Embedding> {
        let mut result = self.embed_batch(&[text])?;
        if result.len() != 1 {
            return Err(RankError::embedding(format!(
                "provider returned {} embeddings for 1 input",
                result.len()
            )));
        }
        result
            .pop()
            .ok_or_else(|| RankError::embedding("No embedding returned"))
    }
}

/// Builds the provider selected by `config`. This is the only place model
/// loading happens; call it once and pass the handle down.
pub fn init_provider(config: &EmbeddingConfig) -> Result<SharedProvider> {
    let provider: SharedProvider = match config.provider() {
        EmbeddingProviderType::Builtin => init_builtin(config)?,
        EmbeddingProviderType::Command => Arc::new(
            CommandProvider::new(config.command().to_string(), config.model().to_string())
                .with_batch_size(config.batch_size())
                .with_max_concurrency(config.max_concurrency())
                .with_max_chars(config.max_chars()),
        ),
        EmbeddingProviderType::Remote => {
            let api_key = std::env::var(config.api_key_env()).ok();
            Arc::new(
                RemoteProvider::new(
                    api_key,
                    config.endpoint().to_string(),
                    config.model().to_string(),
                    Duration::from_millis(config.timeout_ms()),
                    config.batch_size(),
                    config.max_concurrency(),
                )
                .context("Failed to initialize remote embedding provider")?,
            )
        }
        EmbeddingProviderType::Hashing => Arc::new(HashingEmbedder::new(config.dimension())),
    };

    tracing::info!(
        provider = %config.provider(),
        model = provider.model_id(),
        "embedding provider initialized"
    );
    Ok(provider)
}

#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
fn init_builtin(config: &EmbeddingConfig) -> Result<SharedProvider> {
    use super::local::{FastEmbedConfig, FastEmbedder};

    let settings = FastEmbedConfig::from_settings(config)?;
    Ok(Arc::new(FastEmbedder::new(settings)?))
}

#[cfg(all(target_os = "macos", target_arch = "x86_64"))]
fn init_builtin(_config: &EmbeddingConfig) -> Result<SharedProvider> {
    anyhow::bail!(
        "The builtin embedding model is not available on this platform; \
         set [embeddings] provider to \"command\", \"remote\" or \"hashing\""
    )
}

/// Rejects blank input before it reaches a model.
pub(crate) fn ensure_texts(texts: &[&str]) -> RankResult<()> {
    match texts.iter().position(|t| t.trim().is_empty()) {
        Some(i) => Err(RankError::embedding_at(i, "input text is empty")),
        None => Ok(()),
    }
}

/// Checks that a provider answered once per input with non-empty vectors.
pub(crate) fn ensure_outputs(inputs: usize, vectors: &[Embedding]) -> RankResult<()> {
    if vectors.len() != inputs {
        return Err(RankError::embedding(format!(
            "provider returned {} embeddings for {} inputs",
            vectors.len(),
            inputs
        )));
    }
    if let Some(i) = vectors.iter().position(|v| v.is_empty()) {
        return Err(RankError::embedding_at(i, "embedding is empty"));
    }
    Ok(())
}

pub(crate) fn truncate_texts<'a>(texts: &[&'a str], max_chars: usize) -> Vec<Cow<'a, str>> {
    texts
        .iter()
        .map(|text| truncate_to_chars(text, max_chars))
        .collect()
}

pub(crate) fn truncate_to_chars(input: &str, max_chars: usize) -> Cow<'_, str> {
    if max_chars == 0 {
        return Cow::Borrowed("");
    }

    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(input[..idx].to_string()),
        None => Cow::Borrowed(input),
    }
}
