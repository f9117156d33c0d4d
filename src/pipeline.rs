// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end ranking run: request → extraction → ranking → output file.
//!
//! The output file is written only after every stage succeeded, through a
//! temporary sibling that is renamed into place.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use crate::assemble::{assemble, RankedOutput};
use crate::config::{Config, ParserConfig};
use crate::document::{extract_all, DocumentSource};
use crate::embedding::SharedProvider;
use crate::errors::RankError;
use crate::ranking::{ChunkRanker, ProgressFn, RankerConfig};
use crate::request::{RankRequest, ValidRequest};

/// Everything a run needs besides the provider.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub documents_dir: PathBuf,
    pub parser: ParserConfig,
    pub ranker: RankerConfig,
    /// Rank and report without writing the output file
    pub dry_run: bool,
}

impl PipelineOptions {
    /// Options for a collection directory laid out as configured.
    pub fn for_collection(dir: &Path, config: &Config) -> Self {
        let (input, output, documents_dir) = config.collection_paths(dir);
        Self {
            input,
            output,
            documents_dir,
            parser: config.parser().clone(),
            ranker: RankerConfig::default()
                .with_max_concurrency(config.embeddings().max_concurrency())
                .with_batch_size(config.embeddings().batch_size()),
            dry_run: false,
        }
    }
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output: RankedOutput,
    /// Where the output was written; `None` for dry runs
    pub output_path: Option<PathBuf>,
    pub runs_ranked: usize,
}

/// Runs the whole pipeline and writes the output file.
pub fn run(
    options: &PipelineOptions,
    provider: SharedProvider,
    progress: ProgressFn<'_>,
) -> Result<RunSummary> {
    let request = RankRequest::from_path(&options.input)?;
    let output = rank_request(
        &request,
        &options.documents_dir,
        &options.parser,
        ChunkRanker::new(provider, options.ranker.clone()),
        progress,
    )?;
    let runs_ranked = output.extracted_sections.len();

    let output_path = if options.dry_run {
        None
    } else {
        write_output(&output, &options.output)?;
        tracing::info!("Output written to {}", options.output.display());
        Some(options.output.clone())
    };

    Ok(RunSummary {
        output,
        output_path,
        runs_ranked,
    })
}

/// Validates, extracts, ranks and assembles without touching the output path.
pub fn rank_request(
    request: &RankRequest,
    documents_dir: &Path,
    parser: &ParserConfig,
    ranker: ChunkRanker,
    progress: ProgressFn<'_>,
) -> Result<RankedOutput> {
    let valid = request.validate()?;
    let sources = resolve_sources(&valid, documents_dir)?;

    tracing::info!("Processing {} documents", sources.len());
    let runs = extract_all(&sources, parser)?;
    tracing::info!("Extracted {} total text chunks", runs.len());

    let context = valid.context();
    tracing::info!(
        model = ranker.provider().model_id(),
        workers = ranker.effective_concurrency(),
        "Calculating relevance scores"
    );
    let ranked = ranker.rank_with_progress(&context, runs, progress)?;

    Ok(assemble(
        &ranked,
        &valid.filenames(),
        valid.role,
        valid.task,
        Utc::now(),
    ))
}

/// Maps requested filenames onto the documents directory. Every file must exist.
pub fn resolve_sources(request: &ValidRequest<'_>, documents_dir: &Path) -> Result<Vec<DocumentSource>> {
    request
        .documents
        .iter()
        .map(|doc| {
            let path = documents_dir.join(&doc.filename);
            if !path.is_file() {
                return Err(anyhow::Error::from(RankError::invalid(format!(
                    "document not found: {}",
                    path.display()
                ))));
            }
            Ok(DocumentSource {
                path,
                file_name: doc.filename.clone(),
            })
        })
        .collect()
}

/// Writes pretty JSON to a temporary sibling, then renames it over `path`.
pub fn write_output(output: &RankedOutput, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = output
        .to_json_pretty()
        .context("Failed to serialize ranked output")?;
    let tmp = temp_sibling(path);
    if let Err(err) = fs::write(&tmp, json).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(err).with_context(|| format!("Failed to write {}", path.display()));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output.json".into());
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
