//! Error types for the sqlforge conversion pipeline.
//!
//! One enum per layer:
//!
//! - [`SheetError`] - spreadsheet reading and writing
//! - [`AiError`] - text-generation collaborator failures
//! - [`ConfigError`] - invalid environment / flag values
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Lower layers convert into [`PipelineError`] through `From`, so `?`
//! works across boundaries.

use thiserror::Error;

// =============================================================================
// Spreadsheet Errors
// =============================================================================

/// Errors while reading or writing a mapping spreadsheet.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Failed to read or write the file.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV reader/writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// XLSX reader/writer error.
    #[error("XLSX error on '{path}': {message}")]
    Xlsx { path: String, message: String },

    /// Empty file.
    #[error("Spreadsheet is empty")]
    EmptyFile,

    /// Header row missing or blank.
    #[error("No headers found in spreadsheet")]
    NoHeaders,

    /// Workbook contains no worksheet.
    #[error("Workbook '{0}' has no worksheet")]
    NoWorksheet(String),

    /// Extension is neither xlsx nor csv.
    #[error("Unsupported spreadsheet format: '{0}' (expected .xlsx, .xlsm, .csv, .tsv or .txt)")]
    UnsupportedFormat(String),
}

impl SheetError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

// =============================================================================
// AI Collaborator Errors
// =============================================================================

/// Errors from the text-generation collaborator.
#[derive(Debug, Error)]
pub enum AiError {
    /// Missing API key.
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// API answered with a non-success status.
    #[error("API error: {0}")]
    ApiError(String),

    /// Response body was not the expected JSON.
    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    /// API answered but produced no text.
    #[error("Empty reply from {0}")]
    EmptyReply(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A key holds a value that cannot be parsed.
    #[error("Invalid value for {key}: '{value}' ({message})")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    /// Unknown collaborator provider.
    #[error("Unknown provider '{0}' (expected 'ollama' or 'anthropic')")]
    UnknownProvider(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level errors returned by [`crate::transform::pipeline::convert_file`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Spreadsheet error.
    #[error("Spreadsheet error: {0}")]
    Sheet(#[from] SheetError),

    /// Collaborator error.
    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Run cancelled before all groups were processed.
    #[error("Cancelled after {completed} of {total} groups")]
    Cancelled { completed: usize, total: usize },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for spreadsheet operations.
pub type SheetResult<T> = Result<T, SheetError>;

/// Result type for collaborator operations.
pub type AiResult<T> = Result<T, AiError>;

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
