// SPDX-License-Identifier: MIT OR Apache-2.0

//! PDF documents via poppler's `pdftotext`.
//!
//! `pdftotext` emits a form feed after every page, which the text block
//! rules already treat as a page break.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::text::runs_from_text;
use super::{ContentRun, DocumentParser};
use crate::config::ParserConfig;

pub struct PdfTextParser {
    binary: PathBuf,
    config: ParserConfig,
}

impl PdfTextParser {
    /// Locates `pdftotext` on `PATH`.
    pub fn new(config: ParserConfig) -> Result<Self> {
        let binary = which::which("pdftotext")
            .context("pdftotext not found on PATH (is poppler installed?)")?;
        Ok(Self { binary, config })
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .with_context(|| format!("Failed to run pdftotext on {}", path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("pdftotext failed on {}: {}", path.display(), stderr.trim());
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!(
            "pdftotext extracted {} characters from {}",
            text.chars().count(),
            path.display()
        );
        Ok(text)
    }
}

impl DocumentParser for PdfTextParser {
    fn parse(&self, path: &Path, file_name: &str) -> Result<Vec<ContentRun>> {
        let text = self.extract_text(path)?;
        Ok(runs_from_text(&text, file_name, &self.config))
    }
}
