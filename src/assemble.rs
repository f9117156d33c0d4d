// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds the result record from ranked runs.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::ranking::ScoredRun;

/// Section titles for headings are cut to this many characters.
pub const SECTION_TITLE_MAX_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMetadata {
    /// Every requested document, whether or not it produced runs
    pub input_documents: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    /// ISO-8601, UTC, millisecond precision
    pub processing_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSection {
    pub document: String,
    pub section_title: String,
    pub importance_rank: usize,
    pub page_number: u32,
}

/// Reserved for deeper per-section analysis; always emitted empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsectionAnalysis {
    pub document: String,
    pub refined_text: String,
    pub page_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOutput {
    pub metadata: OutputMetadata,
    pub extracted_sections: Vec<ExtractedSection>,
    pub subsection_analysis: Vec<SubsectionAnalysis>,
}

impl RankedOutput {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Formats a timestamp the way the output file records it, e.g.
/// `2025-07-10T09:30:00.000Z`.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Title for a ranked run: a page label for paragraphs, otherwise the
/// leading characters of the heading text.
pub fn section_title(run: &ScoredRun) -> String {
    if run.run.level.is_paragraph() {
        format!("Content from page {}", run.run.page)
    } else {
        run.run.text.chars().take(SECTION_TITLE_MAX_CHARS).collect()
    }
}

/// Maps ranked runs plus run metadata into the result record. Ranks start at 1
/// and follow the order of `runs`.
pub fn assemble(
    runs: &[ScoredRun],
    documents: &[String],
    persona: &str,
    task: &str,
    timestamp: DateTime<Utc>,
) -> RankedOutput {
    let extracted_sections = runs
        .iter()
        .enumerate()
        .map(|(i, run)| ExtractedSection {
            document: run.run.file_name.clone(),
            section_title: section_title(run),
            importance_rank: i + 1,
            page_number: run.run.page,
        })
        .collect();

    RankedOutput {
        metadata: OutputMetadata {
            input_documents: documents.to_vec(),
            persona: persona.to_string(),
            job_to_be_done: task.to_string(),
            processing_timestamp: format_timestamp(timestamp),
        },
        extracted_sections,
        subsection_analysis: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ContentRun, RunLevel};
    use chrono::TimeZone;

    fn scored(text: &str, file: &str, page: u32, level: RunLevel, relevance: f32) -> ScoredRun {
        ScoredRun {
            run: ContentRun::new(text, file, page, level),
            relevance,
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 10, 9, 30, 0).unwrap()
    }

    #[test]
    fn scenario_titles_and_ranks() {
        let runs = vec![
            scored("Risk section about liquidity", "a.pdf", 2, RunLevel::H1, 0.8),
            scored("Unrelated recipe for soup", "b.pdf", 5, RunLevel::P, 0.1),
        ];
        let out = assemble(
            &runs,
            &["a.pdf".into(), "b.pdf".into(), "c.pdf".into()],
            "Analyst",
            "Summarize risks.",
            fixed_time(),
        );

        let first = &out.extracted_sections[0];
        assert_eq!(first.importance_rank, 1);
        assert_eq!(first.section_title, "Risk section about liquidity");
        assert_eq!(first.document, "a.pdf");
        assert_eq!(first.page_number, 2);
        assert_eq!(out.extracted_sections[1].section_title, "Content from page 5");
        assert_eq!(out.metadata.input_documents.len(), 3);
        assert!(out.subsection_analysis.is_empty());
    }

    #[test]
    fn heading_titles_are_hard_cut_at_80_chars() {
        let long = "Ä".repeat(50) + &"word ".repeat(20);
        let runs = vec![scored(&long, "a.pdf", 1, RunLevel::H2, 0.5)];
        let out = assemble(&runs, &["a.pdf".into()], "p", "t", fixed_time());
        let title = &out.extracted_sections[0].section_title;
        assert_eq!(title.chars().count(), 80);
        assert!(long.starts_with(title.as_str()));
    }

    #[test]
    fn ranks_are_contiguous() {
        let runs: Vec<ScoredRun> = (0..25)
            .map(|i| scored("Heading", "a.pdf", i + 1, RunLevel::H3, 0.0))
            .collect();
        let out = assemble(&runs, &["a.pdf".into()], "p", "t", fixed_time());
        let ranks: Vec<usize> = out
            .extracted_sections
            .iter()
            .map(|s| s.importance_rank)
            .collect();
        assert_eq!(ranks, (1..=25).collect::<Vec<_>>());
    }

    #[test]
    fn empty_runs_give_empty_sections() {
        let out = assemble(&[], &["a.pdf".into()], "p", "t", fixed_time());
        assert!(out.extracted_sections.is_empty());
        assert_eq!(out.metadata.input_documents, vec!["a.pdf".to_string()]);
    }

    #[test]
    fn json_shape() {
        let runs = vec![scored("Intro", "a.pdf", 1, RunLevel::H1, 0.5)];
        let out = assemble(&runs, &["a.pdf".into()], "Analyst", "Summarize", fixed_time());
        let value = serde_json::to_value(&out).unwrap();
        assert_eq!(
            value["metadata"]["processing_timestamp"],
            "2025-07-10T09:30:00.000Z"
        );
        assert_eq!(value["metadata"]["job_to_be_done"], "Summarize");
        assert_eq!(value["extracted_sections"][0]["importance_rank"], 1);
        assert_eq!(value["subsection_analysis"], serde_json::json!([]));
    }
}
