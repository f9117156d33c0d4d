// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ranking request: who is reading, what they need, and which documents.

use serde::Deserialize;
use std::path::Path;

use crate::errors::{RankError, RankResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobToBeDone {
    #[serde(default)]
    pub task: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRef {
    #[serde(default)]
    pub filename: String,
    /// Display title; informational only
    #[serde(default)]
    pub title: Option<String>,
}

/// Input record as read from `challenge1b_input.json`.
///
/// Fields are optional at the serde level so that missing values surface as
/// [`RankError::InputValidation`] from [`RankRequest::validate`] rather than as
/// opaque parse errors.
#[derive(Debug, Clone, Deserialize)]
pub struct RankRequest {
    #[serde(default)]
    pub persona: Option<Persona>,
    #[serde(default)]
    pub job_to_be_done: Option<JobToBeDone>,
    #[serde(default)]
    pub documents: Option<Vec<DocumentRef>>,
    /// Free-form challenge metadata, accepted and ignored
    #[serde(default)]
    pub challenge_info: Option<serde_json::Value>,
}

impl RankRequest {
    pub fn from_json(raw: &str) -> RankResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| RankError::invalid(format!("malformed request JSON: {}", e)))
    }

    pub fn from_path(path: &Path) -> RankResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RankError::invalid(format!("cannot read request {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// Checks required fields and returns the validated view. Role and task
    /// must not be blank but are passed on verbatim.
    pub fn validate(&self) -> RankResult<ValidRequest<'_>> {
        let role = self
            .persona
            .as_ref()
            .map(|p| p.role.as_str())
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| RankError::invalid("missing persona.role"))?;
        let task = self
            .job_to_be_done
            .as_ref()
            .map(|j| j.task.as_str())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| RankError::invalid("missing job_to_be_done.task"))?;
        let documents = self
            .documents
            .as_deref()
            .ok_or_else(|| RankError::invalid("missing documents"))?;
        if documents.is_empty() {
            return Err(RankError::invalid("documents list is empty"));
        }
        if let Some(i) = documents.iter().position(|d| d.filename.trim().is_empty()) {
            return Err(RankError::invalid(format!(
                "documents[{}] has no filename",
                i
            )));
        }

        Ok(ValidRequest {
            role,
            task,
            documents,
        })
    }
}

/// A request whose required fields are present and non-blank.
#[derive(Debug, Clone, Copy)]
pub struct ValidRequest<'a> {
    pub role: &'a str,
    pub task: &'a str,
    pub documents: &'a [DocumentRef],
}

impl ValidRequest<'_> {
    pub fn context(&self) -> ContextQuery {
        ContextQuery::new(self.role, self.task)
    }

    pub fn filenames(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.filename.clone()).collect()
    }
}

/// The persona + task description every run is scored against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextQuery {
    text: String,
}

impl ContextQuery {
    /// Builds `"Persona: <role>. Task: <task>"`. The exact format matters to
    /// anyone comparing scores across runs.
    pub fn new(role: &str, task: &str) -> Self {
        Self {
            text: format!("Persona: {}. Task: {}", role, task),
        }
    }

    /// Wraps an already-formatted context string.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
