// Error types for the conversion pipeline
//
// Every variant here is fatal for a run: the orchestrator stops at the first
// one and nothing is written. Incomplete page metadata is not an error, it is
// reported by the extractor as a skipped file and logged as a warning.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConversionError>;

#[derive(Debug, Error)]
pub enum ConversionError {
    // ── Input errors ──────────────────────────────────────────────────────
    #[error("input not found: '{path}'")]
    InputNotFound { path: PathBuf },

    #[error("cannot read '{path}': {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open archive '{path}': {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("cannot load configuration '{path}': {detail}")]
    Config { path: PathBuf, detail: String },

    // ── Rule errors ───────────────────────────────────────────────────────
    #[error("rule '{name}' has an invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{name}' has an invalid replacement: {detail}")]
    InvalidReplacement { name: String, detail: String },

    #[error("rule '{name}' still changed the content after {passes} passes")]
    RuleDidNotConverge { name: String, passes: usize },

    // ── Transform errors ──────────────────────────────────────────────────
    #[error("structural transform '{stage}' failed: {source:#}")]
    Transform {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    #[error("malformed XML in {context}: {detail}")]
    Xml { context: String, detail: String },

    #[error("cannot write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConversionError {
    pub(crate) fn xml(context: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Xml {
            context: context.into(),
            detail: detail.to_string(),
        }
    }
}
