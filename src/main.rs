// SPDX-License-Identifier: MIT OR Apache-2.0

//! docrank - Persona-driven document section ranking
//!
//! Extracts headings and paragraphs from a document collection, embeds them
//! alongside a persona/task description and ranks them by cosine similarity.

mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands, OutputFormat};
use docrank::config::Config;
use docrank::document::{ContentRun, RunLevel};
use docrank::embedding::init_provider;
use docrank::output::{render_sections, use_colors};
use docrank::pipeline::{self, PipelineOptions};
use docrank::ranking::ChunkRanker;
use docrank::request::ContextQuery;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize tracing with DOCRANK_LOG env var (e.g., DOCRANK_LOG=debug docrank rank)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("DOCRANK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    match cli.command {
        Commands::Rank {
            collection,
            input,
            output,
            documents_dir,
            provider,
            model,
            concurrency,
            top,
            dry_run,
            quiet,
        } => {
            let collection = PathBuf::from(collection);
            let mut config = Config::load_for(&collection);
            if let Some(provider) = provider {
                config.embeddings.provider = Some(provider.into());
            }
            if model.is_some() {
                config.embeddings.model = model;
            }
            if concurrency.is_some() {
                config.embeddings.max_concurrency = concurrency;
            }

            let mut options = PipelineOptions::for_collection(&collection, &config);
            if let Some(input) = input {
                options.input = PathBuf::from(input);
            }
            if let Some(output) = output {
                options.output = PathBuf::from(output);
            }
            if let Some(dir) = documents_dir {
                options.documents_dir = PathBuf::from(dir);
            }
            options.dry_run = dry_run;

            let provider = init_provider(config.embeddings())?;

            let bar = if quiet || format == OutputFormat::Json {
                ProgressBar::hidden()
            } else {
                embedding_progress_bar()
            };
            let summary = pipeline::run(&options, provider, &|n| bar.inc(n as u64));
            bar.finish_and_clear();
            let summary = summary?;

            match format {
                OutputFormat::Json => {
                    println!("{}", summary.output.to_json_pretty()?);
                }
                OutputFormat::Text if !quiet => {
                    println!("{}", render_sections(&summary.output, top, use_colors()));
                    match &summary.output_path {
                        Some(path) => println!(
                            "Ranked {} sections; output written to {}",
                            summary.runs_ranked,
                            display_path(path)
                        ),
                        None => println!("Ranked {} sections (dry run)", summary.runs_ranked),
                    }
                }
                OutputFormat::Text => {}
            }
        }
        Commands::Score {
            persona,
            task,
            passages,
            provider,
        } => {
            let mut config = Config::load();
            if let Some(provider) = provider {
                config.embeddings.provider = Some(provider.into());
            }
            let provider = init_provider(config.embeddings())?;
            let ranker = ChunkRanker::with_defaults(provider);

            let runs = passages
                .iter()
                .enumerate()
                .map(|(i, text)| ContentRun::new(text.as_str(), format!("passage-{}", i + 1), 1, RunLevel::P))
                .collect();
            let ranked = ranker
                .rank(&ContextQuery::new(&persona, &task), runs)
                .context("Failed to score passages")?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ranked)?),
                OutputFormat::Text => {
                    for scored in &ranked {
                        println!("{:>8.4}  {}", scored.relevance, scored.run.text);
                    }
                }
            }
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "docrank", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn embedding_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} Embedding {pos} chunks [{elapsed}]")
            .expect("valid progress bar template"),
    );
    bar
}

fn display_path(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
