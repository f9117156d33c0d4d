// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command provider that shells out to an external process.
//!
//! The process receives `{"model": ..., "texts": [...]}` on stdin and must
//! print either a JSON array of vectors or an object carrying one under
//! `embeddings`, `vectors` or `data`.

use serde_json::Value;
use std::io::Write;
use std::process::{Command, Stdio};

use super::provider::{ensure_outputs, ensure_texts, truncate_texts, Embedding, EmbeddingProvider};
use super::similarity::l2_normalize;
use crate::errors::{RankError, RankResult};

const DEFAULT_COMMAND_BATCH_SIZE: usize = 64;

pub struct CommandProvider {
    command: String,
    model: String,
    batch_size: usize,
    max_concurrency: usize,
    max_chars: usize,
}

impl CommandProvider {
    pub fn new(command: String, model: String) -> Self {
        Self {
            command,
            model,
            batch_size: DEFAULT_COMMAND_BATCH_SIZE,
            max_concurrency: 1,
            max_chars: usize::MAX,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    fn run_command(&self, texts: &[&str]) -> RankResult<Vec<Embedding>> {
        let prepared = truncate_texts(texts, self.max_chars);
        let payload = serde_json::json!({
            "model": self.model,
            "texts": prepared,
        });

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RankError::embedding(format!(
                    "Failed to spawn embedding command '{}': {}",
                    self.command, e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(payload.to_string().as_bytes()) {
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                return Err(RankError::embedding(format!(
                    "Failed to write embeddings payload: {}",
                    e
                )));
            }
        }

        let output = child.wait_with_output().map_err(|e| {
            RankError::embedding(format!("Failed to read embeddings command output: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RankError::embedding(format!(
                "Embedding command failed (status {}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_vectors(stdout.trim())
    }
}

impl EmbeddingProvider for CommandProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    fn embed_batch(&self, texts: &[&str]) -> RankResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        ensure_texts(texts)?;

        let mut vectors = self.run_command(texts)?;
        ensure_outputs(texts.len(), &vectors)?;
        for vector in vectors.iter_mut() {
            l2_normalize(vector);
        }
        Ok(vectors)
    }
}

fn parse_vectors(raw: &str) -> RankResult<Vec<Embedding>> {
    let parsed: Value = serde_json::from_str(raw).map_err(|e| {
        RankError::embedding(format!(
            "Failed to parse embeddings command output as JSON: {}",
            e
        ))
    })?;

    let rows = match parsed {
        Value::Array(arr) => arr,
        Value::Object(mut obj) => match ["embeddings", "vectors", "data"]
            .iter()
            .find_map(|key| obj.remove(*key))
        {
            Some(Value::Array(arr)) => arr,
            Some(_) => return Err(RankError::embedding("Embeddings output must be a JSON array")),
            None => {
                return Err(RankError::embedding(
                    "Embeddings command output missing 'embeddings' field",
                ))
            }
        },
        _ => {
            return Err(RankError::embedding(
                "Embeddings command output must be JSON array or object",
            ))
        }
    };

    rows.iter()
        .map(|row| {
            row.as_array()
                .ok_or_else(|| RankError::embedding("Embedding row must be an array"))?
                .iter()
                .map(|value| {
                    value
                        .as_f64()
                        .map(|v| v as f32)
                        .ok_or_else(|| RankError::embedding("Embedding value must be a number"))
                })
                .collect::<RankResult<Embedding>>()
        })
        .collect()
}
