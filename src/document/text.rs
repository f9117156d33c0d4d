// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain text and Markdown documents.
//!
//! Pages are separated by form feeds (`\u{c}`), blocks by blank lines.
//! Markdown `#` lines are headings; short single-line blocks without
//! sentence punctuation are treated as headings too.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use super::{ContentRun, DocumentParser, RunLevel};
use crate::config::ParserConfig;

const PAGE_BREAK: char = '\u{c}';
const HEADING_MAX_WORDS: usize = 12;

static MARKDOWN_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").expect("valid heading regex"));

pub struct TextParser {
    config: ParserConfig,
}

impl TextParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }
}

impl DocumentParser for TextParser {
    fn parse(&self, path: &Path, file_name: &str) -> Result<Vec<ContentRun>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read document: {}", path.display()))?;
        Ok(runs_from_text(&content, file_name, &self.config))
    }
}

/// Splits already-extracted text into runs. Shared with the PDF parser.
pub fn runs_from_text(content: &str, file_name: &str, config: &ParserConfig) -> Vec<ContentRun> {
    let mut runs = Vec::new();

    for (idx, page_text) in content.split(PAGE_BREAK).enumerate() {
        let page = (idx + 1) as u32;
        let mut paragraph: Vec<&str> = Vec::new();

        for line in page_text.lines() {
            let line = line.trim();
            if line.is_empty() {
                flush_block(&mut paragraph, file_name, page, config, &mut runs);
                continue;
            }
            if let Some(caps) = MARKDOWN_HEADING.captures(line) {
                flush_block(&mut paragraph, file_name, page, config, &mut runs);
                let level = RunLevel::from_depth(caps[1].len());
                push_run(&mut runs, caps[2].to_string(), file_name, page, level, config);
                continue;
            }
            paragraph.push(line);
        }
        flush_block(&mut paragraph, file_name, page, config, &mut runs);
    }

    runs
}

fn flush_block(
    lines: &mut Vec<&str>,
    file_name: &str,
    page: u32,
    config: &ParserConfig,
    runs: &mut Vec<ContentRun>,
) {
    if lines.is_empty() {
        return;
    }

    let text = collapse_whitespace(&lines.join(" "));
    let level = if lines.len() == 1 && is_heading_like(&text, config) {
        if is_all_caps(&text) {
            RunLevel::H1
        } else {
            RunLevel::H2
        }
    } else {
        RunLevel::P
    };
    lines.clear();

    push_run(runs, text, file_name, page, level, config);
}

fn push_run(
    runs: &mut Vec<ContentRun>,
    text: String,
    file_name: &str,
    page: u32,
    level: RunLevel,
    config: &ParserConfig,
) {
    if text.chars().count() < config.min_run_chars().max(1) {
        return;
    }
    runs.push(ContentRun::new(text, file_name, page, level));
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_heading_like(text: &str, config: &ParserConfig) -> bool {
    if text.chars().count() > config.heading_max_chars() {
        return false;
    }
    if text.split_whitespace().count() > HEADING_MAX_WORDS {
        return false;
    }
    if text.ends_with(['.', ',', ';', '!', '?']) {
        return false;
    }
    match text.chars().find(|c| c.is_alphabetic()) {
        Some(first) => first.is_uppercase(),
        None => false,
    }
}

fn is_all_caps(text: &str) -> bool {
    let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|c| c.is_uppercase())
}
