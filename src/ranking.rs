// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relevance ranking of content runs against a persona/task context.
//!
//! Runs are embedded in batches on a dedicated worker pool. Each batch carries
//! the index of its first run and results are written back into their slots,
//! so completion order never leaks into the ranking.

use rayon::prelude::*;
use serde::Serialize;

use crate::document::ContentRun;
use crate::embedding::{cosine_similarity, Embedding, SharedProvider};
use crate::errors::{Origin, RankError, RankResult};
use crate::request::ContextQuery;

/// A run with its relevance to the context, in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRun {
    #[serde(flatten)]
    pub run: ContentRun,
    pub relevance: f32,
}

/// Ranker configuration
#[derive(Debug, Clone)]
pub struct RankerConfig {
    /// Worker threads for embedding fan-out; further capped by the provider
    pub max_concurrency: usize,
    /// Runs per provider call; `0` uses the provider's batch size
    pub batch_size: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            batch_size: 0,
        }
    }
}

impl RankerConfig {
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }
}

/// Called after each embedded batch with the number of runs it covered.
pub type ProgressFn<'a> = &'a (dyn Fn(usize) + Sync);

/// Scores and orders content runs.
pub struct ChunkRanker {
    provider: SharedProvider,
    config: RankerConfig,
}

impl ChunkRanker {
    pub fn new(provider: SharedProvider, config: RankerConfig) -> Self {
        Self { provider, config }
    }

    pub fn with_defaults(provider: SharedProvider) -> Self {
        Self::new(provider, RankerConfig::default())
    }

    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    /// Worker count actually used: configured limit, capped by the provider.
    pub fn effective_concurrency(&self) -> usize {
        self.config
            .max_concurrency
            .min(self.provider.max_concurrency())
            .max(1)
    }

    fn effective_batch_size(&self) -> usize {
        match self.config.batch_size {
            0 => self.provider.batch_size().max(1),
            n => n,
        }
    }

    /// Ranks `runs` by relevance to `context`, highest first.
    ///
    /// Ties keep their input order. Any embedding or scoring failure aborts
    /// the whole ranking.
    pub fn rank(&self, context: &ContextQuery, runs: Vec<ContentRun>) -> RankResult<Vec<ScoredRun>> {
        self.rank_with_progress(context, runs, &|_| {})
    }

    pub fn rank_with_progress(
        &self,
        context: &ContextQuery,
        runs: Vec<ContentRun>,
        progress: ProgressFn<'_>,
    ) -> RankResult<Vec<ScoredRun>> {
        if runs.is_empty() {
            return Ok(Vec::new());
        }

        let context_embedding = self
            .provider
            .embed(context.text())
            .map_err(|e| e.with_origin(Origin::Context))?;

        let embeddings = self.embed_runs(&runs, progress)?;
        tracing::debug!("Embedded {} runs", embeddings.len());

        let relevances = runs
            .iter()
            .zip(embeddings.iter())
            .enumerate()
            .map(|(index, (run, embedding))| {
                score(&context_embedding, embedding).map_err(|e| {
                    e.with_origin(Origin::Run {
                        document: run.file_name.clone(),
                        index,
                    })
                })
            })
            .collect::<RankResult<Vec<f32>>>()?;

        let scored = runs
            .into_iter()
            .zip(relevances)
            .map(|(run, relevance)| ScoredRun { run, relevance })
            .collect();

        Ok(sort_by_relevance(scored))
    }

    /// Embeds every run, returning vectors index-aligned with `runs`.
    fn embed_runs(&self, runs: &[ContentRun], progress: ProgressFn<'_>) -> RankResult<Vec<Embedding>> {
        let batch_size = self.effective_batch_size();
        let tasks: Vec<(usize, &[ContentRun])> = runs
            .chunks(batch_size)
            .enumerate()
            .map(|(i, chunk)| (i * batch_size, chunk))
            .collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.effective_concurrency())
            .thread_name(|i| format!("docrank-embed-{}", i))
            .build()
            .map_err(|e| RankError::embedding(format!("failed to start embedding workers: {}", e)))?;

        let provider = &self.provider;
        let results: Vec<(usize, RankResult<Vec<Embedding>>)> = pool.install(|| {
            tasks
                .par_iter()
                .map(|&(start, chunk)| {
                    let texts: Vec<&str> = chunk.iter().map(|r| r.text.as_str()).collect();
                    let result = embed_chunk(provider, start, chunk, &texts);
                    if result.is_ok() {
                        progress(chunk.len());
                    }
                    (start, result)
                })
                .collect()
        });

        let mut slots: Vec<Option<Embedding>> = vec![None; runs.len()];
        for (start, result) in results {
            for (offset, embedding) in result?.into_iter().enumerate() {
                slots[start + offset] = Some(embedding);
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    RankError::embedding("no embedding returned").with_origin(Origin::Run {
                        document: runs[index].file_name.clone(),
                        index,
                    })
                })
            })
            .collect()
    }
}

/// Embeds one batch. A failure the provider located inside the batch is
/// attributed to that run; otherwise to the batch's run range.
fn embed_chunk(
    provider: &SharedProvider,
    start: usize,
    chunk: &[ContentRun],
    texts: &[&str],
) -> RankResult<Vec<Embedding>> {
    let vectors = provider
        .embed_batch(texts)
        .map_err(|e| attribute(e, start, chunk))?;
    if vectors.len() != texts.len() {
        let err = RankError::embedding(format!(
            "provider returned {} embeddings for {} inputs",
            vectors.len(),
            texts.len()
        ));
        return Err(attribute(err, start, chunk));
    }
    Ok(vectors)
}

fn attribute(err: RankError, start: usize, chunk: &[ContentRun]) -> RankError {
    let origin = match err.origin() {
        Some(Origin::Batch { index }) if *index < chunk.len() => Origin::Run {
            document: chunk[*index].file_name.clone(),
            index: start + index,
        },
        _ => batch_origin(start, chunk),
    };
    err.with_origin(origin)
}

fn batch_origin(start: usize, chunk: &[ContentRun]) -> Origin {
    match chunk {
        [only] => Origin::Run {
            document: only.file_name.clone(),
            index: start,
        },
        [first, .., last] => Origin::Runs {
            first: first.file_name.clone(),
            last: last.file_name.clone(),
            start,
            end: start + chunk.len() - 1,
        },
        [] => Origin::Unknown,
    }
}

/// Cosine similarity between the context and a run embedding. A length
/// mismatch means the provider changed dimensionality mid-run.
fn score(context: &[f32], run: &[f32]) -> RankResult<f32> {
    if context.len() != run.len() {
        return Err(RankError::embedding(format!(
            "dimensionality mismatch: context has {}, run has {}",
            context.len(),
            run.len()
        )));
    }
    cosine_similarity(context, run)
}

/// Stable sort, highest relevance first.
pub fn sort_by_relevance(mut scored: Vec<ScoredRun>) -> Vec<ScoredRun> {
    scored.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    scored
}
