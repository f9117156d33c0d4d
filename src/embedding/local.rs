// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process embedding model backed by fastembed (all-MiniLM-L6-v2).
//!
//! The ONNX session needs exclusive access while running, so calls are
//! serialized behind a mutex and throughput comes from batching instead.

use anyhow::{bail, Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::env;
use std::sync::Mutex;

use super::provider::{ensure_outputs, ensure_texts, truncate_texts, Embedding, EmbeddingProvider};
use super::similarity::l2_normalize;
use crate::config::EmbeddingConfig;
use crate::errors::{RankError, RankResult};

const DEFAULT_FASTEMBED_MODEL: &str = "minilm";
const MAX_FASTEMBED_BATCH_SIZE: usize = 1024;

/// Configuration for the fastembed provider.
#[derive(Debug, Clone)]
pub struct FastEmbedConfig {
    pub model: EmbeddingModel,
    pub batch_size: usize,
    pub max_chars: usize,
    pub normalize: bool,
}

impl FastEmbedConfig {
    /// Builds the provider settings from the config file, then applies the
    /// `FASTEMBED_*` environment overrides on top.
    pub fn from_settings(config: &EmbeddingConfig) -> Result<Self> {
        let model_name =
            env::var("FASTEMBED_MODEL").unwrap_or_else(|_| config.model().to_string());
        let model = parse_model(&model_name)?;

        let mut batch_size = parse_usize_env("FASTEMBED_BATCH_SIZE", config.batch_size())?;
        if batch_size == 0 {
            batch_size = config.batch_size();
        }
        if batch_size > MAX_FASTEMBED_BATCH_SIZE {
            tracing::warn!(
                "FASTEMBED_BATCH_SIZE={} exceeds max {}; clamping.",
                batch_size,
                MAX_FASTEMBED_BATCH_SIZE
            );
            batch_size = MAX_FASTEMBED_BATCH_SIZE;
        }

        let mut max_chars = parse_usize_env("FASTEMBED_MAX_CHARS", config.max_chars())?;
        if max_chars == 0 {
            max_chars = config.max_chars();
        }

        let normalize = parse_bool_env("FASTEMBED_NORMALIZE", true)?;

        Ok(Self {
            model,
            batch_size,
            max_chars,
            normalize,
        })
    }
}

impl Default for FastEmbedConfig {
    fn default() -> Self {
        Self {
            model: EmbeddingModel::AllMiniLML6V2,
            batch_size: 64,
            max_chars: 2000,
            normalize: true,
        }
    }
}

/// FastEmbed provider using sentence-transformers/all-MiniLM-L6-v2.
pub struct FastEmbedder {
    embedder: Mutex<TextEmbedding>,
    config: FastEmbedConfig,
    model_id: String,
}

impl FastEmbedder {
    /// Loads the model, downloading it on first use.
    pub fn new(config: FastEmbedConfig) -> Result<Self> {
        let model = config.model.clone();
        let model_id = model.to_string();
        tracing::info!("Initializing embedding model {} (downloads on first run)", model_id);
        let init = InitOptions::new(model);
        let embedder =
            TextEmbedding::try_new(init).context("Failed to initialize fastembed model")?;

        Ok(Self {
            embedder: Mutex::new(embedder),
            config,
            model_id,
        })
    }
}

impl EmbeddingProvider for FastEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    fn embed_batch(&self, texts: &[&str]) -> RankResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        ensure_texts(texts)?;

        let prepared = truncate_texts(texts, self.config.max_chars);
        let mut embedder = self
            .embedder
            .lock()
            .map_err(|_| RankError::embedding("embedding model lock poisoned"))?;
        let mut embeddings = embedder
            .embed(&prepared, Some(self.config.batch_size))
            .map_err(|e| RankError::embedding(format!("fastembed: {:#}", e)))?;
        drop(embedder);

        ensure_outputs(texts.len(), &embeddings)?;
        if self.config.normalize {
            for embedding in embeddings.iter_mut() {
                l2_normalize(embedding);
            }
        }

        Ok(embeddings)
    }
}

fn parse_model(raw: &str) -> Result<EmbeddingModel> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(EmbeddingModel::AllMiniLML6V2);
    }

    match value.to_lowercase().as_str() {
        "minilm"
        | "all-minilm-l6-v2"
        | "allminilm-l6-v2"
        | "xenova/all-minilm-l6-v2"
        | "sentence-transformers/all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "bge-small" | "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => {
            Ok(EmbeddingModel::BGESmallENV15)
        }
        other => bail!(
            "Unsupported embedding model '{}'. Supported values: {}, bge-small",
            other,
            DEFAULT_FASTEMBED_MODEL
        ),
    }
}

fn parse_usize_env(name: &str, default: usize) -> Result<usize> {
    match env::var(name) {
        Ok(raw) => {
            let value = raw.trim();
            if value.is_empty() {
                Ok(default)
            } else {
                value
                    .parse::<usize>()
                    .with_context(|| format!("Invalid {} value: {}", name, value))
            }
        }
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("Failed to read {}", name)),
    }
}

fn parse_bool_env(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(raw) => {
            let value = raw.trim().to_lowercase();
            if value.is_empty() {
                return Ok(default);
            }
            match value.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => bail!("Invalid {} value: {}", name, other),
            }
        }
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("Failed to read {}", name)),
    }
}
