// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for docrank
//!
//! Loads configuration from .docrankrc.toml in current directory or ~/.config/docrank/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Embedding provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    /// In-process fastembed model
    #[default]
    Builtin,
    /// External process speaking JSON over stdin/stdout
    Command,
    /// OpenAI-compatible HTTP embeddings endpoint
    Remote,
    /// Deterministic feature hashing, no model required
    Hashing,
}

impl std::fmt::Display for EmbeddingProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProviderType::Builtin => write!(f, "builtin"),
            EmbeddingProviderType::Command => write!(f, "command"),
            EmbeddingProviderType::Remote => write!(f, "remote"),
            EmbeddingProviderType::Hashing => write!(f, "hashing"),
        }
    }
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "builtin" | "fastembed" | "local" => Ok(EmbeddingProviderType::Builtin),
            "command" | "cmd" => Ok(EmbeddingProviderType::Command),
            "remote" | "openai" | "http" => Ok(EmbeddingProviderType::Remote),
            "hashing" | "hash" => Ok(EmbeddingProviderType::Hashing),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider type (builtin, command, remote, hashing)
    pub provider: Option<EmbeddingProviderType>,
    /// Model identifier for the embedding provider
    pub model: Option<String>,
    /// Command to execute for command provider
    pub command: Option<String>,
    /// Base URL for the remote provider (the `/embeddings` suffix is appended)
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the remote API key
    pub api_key_env: Option<String>,
    /// Remote request timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Number of texts sent per provider call
    pub batch_size: Option<usize>,
    /// Texts are truncated to this many characters before embedding
    pub max_chars: Option<usize>,
    /// Upper bound on concurrent provider calls
    pub max_concurrency: Option<usize>,
    /// Output dimension of the hashing provider
    pub dimension: Option<usize>,
}

impl EmbeddingConfig {
    /// Get provider type (defaults to Builtin)
    pub fn provider(&self) -> EmbeddingProviderType {
        self.provider.unwrap_or_default()
    }

    /// Get model identifier (defaults to "minilm")
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or("minilm")
    }

    /// Get command (defaults to "embedder")
    pub fn command(&self) -> &str {
        self.command.as_deref().unwrap_or("embedder")
    }

    /// Get remote endpoint (defaults to the OpenAI API)
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or("https://api.openai.com/v1")
    }

    /// Get API key variable name (defaults to "OPENAI_API_KEY")
    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY")
    }

    /// Get timeout (defaults to 30s)
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(30_000)
    }

    /// Get batch size (defaults to 64)
    pub fn batch_size(&self) -> usize {
        self.batch_size.filter(|&n| n > 0).unwrap_or(64)
    }

    /// Get max chars (defaults to 2000)
    pub fn max_chars(&self) -> usize {
        self.max_chars.filter(|&n| n > 0).unwrap_or(2000)
    }

    /// Get max concurrency (defaults to 4)
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.filter(|&n| n > 0).unwrap_or(4)
    }

    /// Get hashing dimension (defaults to 384, the MiniLM width)
    pub fn dimension(&self) -> usize {
        self.dimension.filter(|&n| n > 0).unwrap_or(384)
    }
}

/// Collection layout configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Request file name inside the collection directory
    pub input_file: Option<String>,
    /// Output file name inside the collection directory
    pub output_file: Option<String>,
    /// Directory holding the documents, relative to the collection directory
    pub documents_dir: Option<String>,
}

impl CollectionConfig {
    /// Get input file (defaults to "challenge1b_input.json")
    pub fn input_file(&self) -> &str {
        self.input_file.as_deref().unwrap_or("challenge1b_input.json")
    }

    /// Get output file (defaults to "challenge1b_output.json")
    pub fn output_file(&self) -> &str {
        self.output_file
            .as_deref()
            .unwrap_or("challenge1b_output.json")
    }

    /// Get documents dir (defaults to "PDF")
    pub fn documents_dir(&self) -> &str {
        self.documents_dir.as_deref().unwrap_or("PDF")
    }
}

/// Document parser configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Single-line blocks up to this length may be treated as headings
    pub heading_max_chars: Option<usize>,
    /// Blocks shorter than this are dropped
    pub min_run_chars: Option<usize>,
}

impl ParserConfig {
    /// Get heading max chars (defaults to 80)
    pub fn heading_max_chars(&self) -> usize {
        self.heading_max_chars.unwrap_or(80)
    }

    /// Get min run chars (defaults to 3)
    pub fn min_run_chars(&self) -> usize {
        self.min_run_chars.unwrap_or(3)
    }
}

/// Configuration loaded from .docrankrc.toml or ~/.config/docrank/config.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    /// Collection layout
    #[serde(default)]
    pub collection: CollectionConfig,

    /// Parser configuration
    #[serde(default)]
    pub parser: ParserConfig,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .docrankrc.toml in current directory
    /// 2. ~/.config/docrank/config.toml
    pub fn load() -> Self {
        if let Some(config) = Self::load_from_path(Path::new(".docrankrc.toml")) {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("docrank").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    /// Load configuration rooted at a collection directory, falling back to [`Config::load`].
    pub fn load_for(dir: &Path) -> Self {
        Self::load_from_path(&dir.join(".docrankrc.toml")).unwrap_or_else(Self::load)
    }

    fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Get the embedding configuration
    pub fn embeddings(&self) -> &EmbeddingConfig {
        &self.embeddings
    }

    /// Get the collection configuration
    pub fn collection(&self) -> &CollectionConfig {
        &self.collection
    }

    /// Get the parser configuration
    pub fn parser(&self) -> &ParserConfig {
        &self.parser
    }

    /// Resolve the request, output and documents paths for a collection directory.
    pub fn collection_paths(&self, dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
        (
            dir.join(self.collection.input_file()),
            dir.join(self.collection.output_file()),
            dir.join(self.collection.documents_dir()),
        )
    }
}
