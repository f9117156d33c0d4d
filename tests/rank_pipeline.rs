// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use docrank::assemble::RankedOutput;
use docrank::config::{Config, ParserConfig};
use docrank::document::{ContentRun, RunLevel};
use docrank::embedding::{Embedding, EmbeddingProvider, HashingEmbedder, SharedProvider};
use docrank::errors::{RankError, RankResult};
use docrank::pipeline::{self, PipelineOptions};
use docrank::ranking::{ChunkRanker, RankerConfig};
use docrank::request::ContextQuery;

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn write_request(dir: &Path, documents: &[&str]) {
    let docs: Vec<serde_json::Value> = documents
        .iter()
        .map(|name| serde_json::json!({ "filename": name, "title": name }))
        .collect();
    let request = serde_json::json!({
        "challenge_info": { "challenge_id": "round_1b_002" },
        "documents": docs,
        "persona": { "role": "Travel Planner" },
        "job_to_be_done": { "task": "Plan a trip to the coast with friends" }
    });
    write_file(
        &dir.join("challenge1b_input.json"),
        &serde_json::to_string_pretty(&request).unwrap(),
    );
}

fn options(dir: &Path) -> PipelineOptions {
    PipelineOptions::for_collection(dir, &Config::default())
}

fn hashing() -> SharedProvider {
    Arc::new(HashingEmbedder::new(384))
}

fn no_progress(_: usize) {}

/// Fails for any text containing "CORRUPT", reporting its batch position.
struct Poisoned(HashingEmbedder);

impl EmbeddingProvider for Poisoned {
    fn model_id(&self) -> &str {
        "poisoned"
    }

    fn batch_size(&self) -> usize {
        4
    }

    fn max_concurrency(&self) -> usize {
        4
    }

    fn embed_batch(&self, texts: &[&str]) -> RankResult<Vec<Embedding>> {
        if let Some(i) = texts.iter().position(|t| t.contains("CORRUPT")) {
            return Err(RankError::embedding_at(i, "model unavailable"));
        }
        self.0.embed_batch(texts)
    }
}

/// Fixed vectors keyed by text.
struct Table(HashMap<String, Embedding>);

impl EmbeddingProvider for Table {
    fn model_id(&self) -> &str {
        "table"
    }

    fn batch_size(&self) -> usize {
        1
    }

    fn embed_batch(&self, texts: &[&str]) -> RankResult<Vec<Embedding>> {
        texts
            .iter()
            .map(|t| {
                self.0
                    .get(*t)
                    .cloned()
                    .ok_or_else(|| RankError::embedding("unknown text"))
            })
            .collect()
    }
}

#[test]
fn collection_run_writes_ranked_output() {
    let dir = TempDir::new().unwrap();
    write_request(dir.path(), &["coast.md", "ledger.txt", "blank.md"]);
    write_file(
        &dir.path().join("PDF/coast.md"),
        "# Coast Trip Plan With Friends\n\nPlan a trip to the coast with friends and enjoy the beaches.\n",
    );
    write_file(
        &dir.path().join("PDF/ledger.txt"),
        "LEDGER RECONCILIATION\n\nAccounting ledger reconciliation procedures for auditors.\n\u{c}Quarterly variance tables are archived monthly.\n",
    );
    write_file(&dir.path().join("PDF/blank.md"), "\n\n");

    let summary = pipeline::run(&options(dir.path()), hashing(), &no_progress).unwrap();

    let path = dir.path().join("challenge1b_output.json");
    assert_eq!(summary.output_path.as_deref(), Some(path.as_path()));
    let written: RankedOutput = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, summary.output);

    assert_eq!(
        written.metadata.input_documents,
        vec!["coast.md", "ledger.txt", "blank.md"]
    );
    assert_eq!(written.metadata.persona, "Travel Planner");
    assert_eq!(written.metadata.job_to_be_done, "Plan a trip to the coast with friends");
    assert!(written.metadata.processing_timestamp.ends_with('Z'));

    let sections = &written.extracted_sections;
    assert_eq!(sections.len(), 5);
    assert_eq!(sections[0].document, "coast.md");
    let ranks: Vec<usize> = sections.iter().map(|s| s.importance_rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4, 5]);

    let page_two = sections
        .iter()
        .find(|s| s.document == "ledger.txt" && s.page_number == 2)
        .expect("page two section");
    assert_eq!(page_two.section_title, "Content from page 2");
    assert!(sections
        .iter()
        .any(|s| s.section_title == "Coast Trip Plan With Friends"));
    assert!(written.subsection_analysis.is_empty());
}

#[test]
fn embedding_failure_aborts_without_output() {
    let dir = TempDir::new().unwrap();
    write_request(dir.path(), &["a.md", "b.md", "c.md"]);
    write_file(
        &dir.path().join("PDF/a.md"),
        "Plain paragraph about beaches.\n\nSecond paragraph about hotels.\n",
    );
    write_file(
        &dir.path().join("PDF/b.md"),
        "Another paragraph here.\n\nThis one is CORRUPT and cannot embed.\n",
    );
    write_file(&dir.path().join("PDF/c.md"), "Closing paragraph on trains.\n");

    // Default batch size puts every run in one call.
    let provider: SharedProvider = Arc::new(Poisoned(HashingEmbedder::new(64)));
    let err = pipeline::run(&options(dir.path()), provider, &no_progress).unwrap_err();

    match err.downcast_ref::<RankError>() {
        Some(RankError::EmbeddingFailure { origin, .. }) => {
            assert_eq!(origin.to_string(), "b.md chunk #3")
        }
        other => panic!("expected EmbeddingFailure, got {:?}", other),
    }
    assert!(!dir.path().join("challenge1b_output.json").exists());
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn small_batches_blame_the_failing_run() {
    let dir = TempDir::new().unwrap();
    write_request(dir.path(), &["a.md", "b.md"]);
    write_file(&dir.path().join("PDF/a.md"), "Plain paragraph about beaches.\n");
    write_file(
        &dir.path().join("PDF/b.md"),
        "Another paragraph here.\n\nThis one is CORRUPT and cannot embed.\n",
    );

    let mut opts = options(dir.path());
    opts.ranker = RankerConfig::default().with_batch_size(2);
    let provider: SharedProvider = Arc::new(Poisoned(HashingEmbedder::new(64)));
    let err = pipeline::run(&opts, provider, &no_progress).unwrap_err();

    let origin = err
        .downcast_ref::<RankError>()
        .and_then(|e| e.origin())
        .map(|o| o.to_string());
    assert_eq!(origin.as_deref(), Some("b.md chunk #2"));
}

#[test]
fn documents_without_text_produce_empty_sections() {
    let dir = TempDir::new().unwrap();
    write_request(dir.path(), &["empty.md"]);
    write_file(&dir.path().join("PDF/empty.md"), "");

    // No run means no provider call, so even a provider that fails everything is fine.
    let provider: SharedProvider = Arc::new(Table(HashMap::new()));
    let summary = pipeline::run(&options(dir.path()), provider, &no_progress).unwrap();

    assert!(summary.output.extracted_sections.is_empty());
    assert_eq!(summary.runs_ranked, 0);
    let raw = fs::read_to_string(dir.path().join("challenge1b_output.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["extracted_sections"], serde_json::json!([]));
    assert_eq!(json["subsection_analysis"], serde_json::json!([]));
}

#[test]
fn invalid_request_is_rejected_before_extraction() {
    let dir = TempDir::new().unwrap();
    write_file(
        &dir.path().join("challenge1b_input.json"),
        r#"{"persona": {"role": "Analyst"}, "job_to_be_done": {"task": "Summarize"}, "documents": []}"#,
    );

    let err = pipeline::run(&options(dir.path()), hashing(), &no_progress).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RankError>(),
        Some(RankError::InputValidation(_))
    ));
    assert!(!dir.path().join("challenge1b_output.json").exists());
}

#[test]
fn persona_and_task_reach_metadata_verbatim() {
    let dir = TempDir::new().unwrap();
    write_file(
        &dir.path().join("challenge1b_input.json"),
        r#"{"persona": {"role": " Travel Planner "}, "job_to_be_done": {"task": "Plan a trip "}, "documents": [{"filename": "coast.md"}]}"#,
    );
    write_file(&dir.path().join("PDF/coast.md"), "Sunny coast paragraph text.\n");

    let mut opts = options(dir.path());
    opts.dry_run = true;
    let summary = pipeline::run(&opts, hashing(), &no_progress).unwrap();

    assert_eq!(summary.output.metadata.persona, " Travel Planner ");
    assert_eq!(summary.output.metadata.job_to_be_done, "Plan a trip ");
}

#[test]
fn dry_run_leaves_no_file() {
    let dir = TempDir::new().unwrap();
    write_request(dir.path(), &["coast.md"]);
    write_file(&dir.path().join("PDF/coast.md"), "Sunny coast paragraph text.\n");

    let mut opts = options(dir.path());
    opts.dry_run = true;
    let summary = pipeline::run(&opts, hashing(), &no_progress).unwrap();

    assert!(summary.output_path.is_none());
    assert_eq!(summary.runs_ranked, 1);
    assert!(!dir.path().join("challenge1b_output.json").exists());
}

#[test]
fn analyst_scenario_ranks_liquidity_first() {
    let context = ContextQuery::new("Analyst", "Summarize risks.");
    let vectors: HashMap<String, Embedding> = [
        (context.text().to_string(), vec![0.8, 0.6, 0.0]),
        ("Risk section about liquidity".to_string(), vec![0.7, 0.7, 0.1]),
        ("Unrelated recipe for soup".to_string(), vec![0.0, 0.1, 1.0]),
    ]
    .into_iter()
    .collect();
    let ranker = ChunkRanker::with_defaults(Arc::new(Table(vectors)));

    let ranked = ranker
        .rank(
            &context,
            vec![
                ContentRun::new("Unrelated recipe for soup", "b.pdf", 5, RunLevel::P),
                ContentRun::new("Risk section about liquidity", "a.pdf", 2, RunLevel::H1),
            ],
        )
        .unwrap();
    let output = docrank::assemble::assemble(
        &ranked,
        &["a.pdf".into(), "b.pdf".into()],
        "Analyst",
        "Summarize risks.",
        chrono::Utc::now(),
    );

    let first = &output.extracted_sections[0];
    assert_eq!(first.importance_rank, 1);
    assert_eq!(first.document, "a.pdf");
    assert_eq!(first.section_title, "Risk section about liquidity");
    let second = &output.extracted_sections[1];
    assert_eq!(second.importance_rank, 2);
    assert_eq!(second.section_title, "Content from page 5");
}

#[test]
fn parser_config_controls_heading_detection() {
    let dir = TempDir::new().unwrap();
    write_request(dir.path(), &["notes.txt"]);
    write_file(&dir.path().join("PDF/notes.txt"), "Beach Day Ideas\n\nSwim early.\n");

    let mut opts = options(dir.path());
    opts.parser = ParserConfig {
        heading_max_chars: Some(5),
        min_run_chars: None,
    };
    opts.dry_run = true;
    let summary = pipeline::run(&opts, hashing(), &no_progress).unwrap();

    // Too long to count as a heading, so both runs are paragraphs on page 1.
    assert!(summary
        .output
        .extracted_sections
        .iter()
        .all(|s| s.section_title == "Content from page 1"));
}
