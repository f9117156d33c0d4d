// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for the ranking core.
//!
//! Every variant is fatal for the run that produced it: there is no partial
//! ranking, so callers propagate these up and skip writing output.

use std::fmt;
use thiserror::Error;

/// Where a failing vector came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// The persona/task context embedding.
    Context,
    /// A content run, identified by source document and position in the run list.
    Run { document: String, index: usize },
    /// Position inside a single provider call; the ranker maps it to a run.
    Batch { index: usize },
    /// A whole provider call that failed without naming one input.
    Runs {
        first: String,
        last: String,
        start: usize,
        end: usize,
    },
    /// Not yet attributed (provider-level failures before the ranker tags them).
    Unknown,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Context => write!(f, "context"),
            Origin::Run { document, index } => write!(f, "{} chunk #{}", document, index),
            Origin::Batch { index } => write!(f, "input #{}", index),
            Origin::Runs {
                first,
                last,
                start,
                end,
            } if first == last => write!(f, "{} chunks #{}-#{}", first, start, end),
            Origin::Runs {
                first,
                last,
                start,
                end,
            } => write!(f, "{}..{} chunks #{}-#{}", first, last, start, end),
            Origin::Unknown => write!(f, "input"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RankError {
    /// Provider unavailable, empty text, or dimensionality mismatch.
    #[error("embedding failed for {origin}: {reason}")]
    EmbeddingFailure { origin: Origin, reason: String },

    /// Zero-norm vector reached the similarity scorer.
    #[error("degenerate (zero-norm) vector for {origin}")]
    DegenerateVector { origin: Origin },

    /// Missing or malformed request fields.
    #[error("invalid input: {0}")]
    InputValidation(String),
}

impl RankError {
    /// Provider-level failure that has not been attributed to a run yet.
    pub fn embedding(reason: impl Into<String>) -> Self {
        RankError::EmbeddingFailure {
            origin: Origin::Unknown,
            reason: reason.into(),
        }
    }

    /// Provider-level failure of the `index`-th text of a batch.
    pub fn embedding_at(index: usize, reason: impl Into<String>) -> Self {
        RankError::EmbeddingFailure {
            origin: Origin::Batch { index },
            reason: reason.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        RankError::InputValidation(reason.into())
    }

    /// Re-tags embedding and scoring failures with the run they belong to.
    /// Validation errors pass through untouched.
    pub fn with_origin(self, origin: Origin) -> Self {
        match self {
            RankError::EmbeddingFailure { reason, .. } => {
                RankError::EmbeddingFailure { origin, reason }
            }
            RankError::DegenerateVector { .. } => RankError::DegenerateVector { origin },
            other => other,
        }
    }

    pub fn origin(&self) -> Option<&Origin> {
        match self {
            RankError::EmbeddingFailure { origin, .. } | RankError::DegenerateVector { origin } => {
                Some(origin)
            }
            RankError::InputValidation(_) => None,
        }
    }

    pub fn is_embedding_failure(&self) -> bool {
        matches!(self, RankError::EmbeddingFailure { .. })
    }

    pub fn is_degenerate_vector(&self) -> bool {
        matches!(self, RankError::DegenerateVector { .. })
    }
}

pub type RankResult<T> = std::result::Result<T, RankError>;
