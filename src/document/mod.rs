// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document parsing - turns source files into ordered content runs
//!
//! A run is one heading or paragraph with its page number. Parsers are
//! selected by file extension; extraction fans out across documents.

pub mod pdf;
pub mod text;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::ParserConfig;
use crate::errors::RankError;

pub use pdf::PdfTextParser;
pub use text::TextParser;

/// Heading depth or paragraph marker of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunLevel {
    H1,
    H2,
    H3,
    /// Plain paragraph content
    P,
}

impl RunLevel {
    /// Maps a Markdown `#` count to a level; anything deeper than three is H3.
    pub fn from_depth(depth: usize) -> Self {
        match depth {
            0 | 1 => RunLevel::H1,
            2 => RunLevel::H2,
            _ => RunLevel::H3,
        }
    }

    pub fn is_paragraph(self) -> bool {
        self == RunLevel::P
    }
}

impl std::fmt::Display for RunLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunLevel::H1 => write!(f, "H1"),
            RunLevel::H2 => write!(f, "H2"),
            RunLevel::H3 => write!(f, "H3"),
            RunLevel::P => write!(f, "P"),
        }
    }
}

/// A unit of extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRun {
    /// Non-empty text content
    pub text: String,
    /// Source document identifier (the request filename)
    pub file_name: String,
    /// Page number (1-indexed)
    pub page: u32,
    pub level: RunLevel,
}

impl ContentRun {
    pub fn new(
        text: impl Into<String>,
        file_name: impl Into<String>,
        page: u32,
        level: RunLevel,
    ) -> Self {
        Self {
            text: text.into(),
            file_name: file_name.into(),
            page,
            level,
        }
    }
}

/// Produces the runs of a single document, in reading order.
pub trait DocumentParser: Send + Sync {
    /// `file_name` is recorded on every run as its source identifier.
    fn parse(&self, path: &Path, file_name: &str) -> Result<Vec<ContentRun>>;
}

/// Picks a parser for `path` by extension.
pub fn parser_for(path: &Path, config: &ParserConfig) -> Result<Box<dyn DocumentParser>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => Ok(Box::new(PdfTextParser::new(config.clone())?)),
        "txt" | "md" | "markdown" => Ok(Box::new(TextParser::new(config.clone()))),
        _ => Err(RankError::invalid(format!(
            "unsupported document type: {}",
            path.display()
        ))
        .into()),
    }
}

/// A document to extract: where it lives and the name it was requested by.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub path: PathBuf,
    pub file_name: String,
}

/// Extracts every document in parallel. Runs come back grouped by document in
/// the order `sources` lists them, regardless of which finished first.
pub fn extract_all(sources: &[DocumentSource], config: &ParserConfig) -> Result<Vec<ContentRun>> {
    let per_document = sources
        .par_iter()
        .map(|source| -> Result<Vec<ContentRun>> {
            let parser = parser_for(&source.path, config)?;
            let runs = parser
                .parse(&source.path, &source.file_name)
                .with_context(|| format!("Failed to extract {}", source.file_name))?;
            if runs.is_empty() {
                tracing::warn!("No text extracted from {}", source.file_name);
            } else {
                tracing::debug!("Extracted {} runs from {}", runs.len(), source.file_name);
            }
            Ok(runs)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(per_document.into_iter().flatten().collect())
}
