//! Error types for the ETL pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used by the orchestrator and the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SourceUnavailable,
    SchemaViolation,
    AggregationInputInvalid,
    Infrastructure,
}

/// Errors raised while extracting, transforming, reporting or loading.
#[derive(Debug, Error)]
pub enum EtlError {
    // === Snapshot lookup ===
    /// No snapshot folder or file exists for the category.
    #[error("no snapshot available for category '{category}' under {path}: {reason}")]
    SourceUnavailable {
        category: String,
        path: PathBuf,
        reason: String,
    },

    // === Transform ===
    /// A required canonical column is missing after normalization.
    #[error("category '{category}' is missing required column '{column}'")]
    MissingColumn { category: String, column: String },

    /// Raw content could not be read as a table.
    #[error("malformed source data for category '{category}': {reason}")]
    MalformedSource { category: String, reason: String },

    // === Reports ===
    /// Report building was invoked with a missing or malformed frame.
    #[error("invalid report input '{input}': {reason}")]
    AggregationInputInvalid { input: String, reason: String },

    // === Infrastructure ===
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error on table '{table}': {source}")]
    Database {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl EtlError {
    /// Classify the error into the pipeline taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            EtlError::MissingColumn { .. }
            | EtlError::MalformedSource { .. }
            | EtlError::Csv(_) => ErrorKind::SchemaViolation,
            EtlError::AggregationInputInvalid { .. } => ErrorKind::AggregationInputInvalid,
            EtlError::Io { .. } | EtlError::Database { .. } | EtlError::Config(_) => {
                ErrorKind::Infrastructure
            }
        }
    }

    pub(crate) fn invalid_input(input: &str, reason: impl Into<String>) -> Self {
        EtlError::AggregationInputInvalid {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
