//! # SQLForge - mapping spreadsheets to Spark SQL
//!
//! SQLForge reads a source-to-target mapping sheet, groups rows by target
//! column and produces one SQL select expression per group, either
//! directly or through a text-generation collaborator.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Mapping XLSX│────▶│   Grouper   │────▶│  Synthesis  │────▶│ Output XLSX │
//! │  (or CSV)   │     │ (agg/scalar)│     │ (direct/AI) │     │ (+SQL cols) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sqlforge::{build_generator, convert_file, Config, ConvertOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().unwrap();
//!     let generator = build_generator(&config).unwrap();
//!     let report = convert_file(
//!         &config.input_file,
//!         &config.output_file,
//!         generator.as_ref(),
//!         &ConvertOptions::from_config(&config),
//!     )
//!     .await
//!     .unwrap();
//!     println!("Converted {} rows", report.summary.rows);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Environment configuration
//! - [`logs`] - Tracing setup and progress helpers
//! - [`models`] - Mapping rows, aliases, expression origin
//! - [`sheet`] - XLSX / CSV reading and writing
//! - [`transform`] - Aliases, grouping, rewriting, synthesis and pipeline
//! - [`ai`] - SqlGenerator trait, prompts, Ollama and Anthropic clients
//! - [`tools`] - Record reader, writer and inspector

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod models;

// Spreadsheets
pub mod sheet;

// Transformation
pub mod transform;

// AI
pub mod ai;

// Record helpers
pub mod tools;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AiError, AiResult, ConfigError, ConfigResult, PipelineError, PipelineResult, SheetError,
    SheetResult,
};

// =============================================================================
// Re-exports - Models and configuration
// =============================================================================

pub use config::{Config, Provider};
pub use models::{ExplodedAlias, ExpressionOrigin, MappingRow};

// =============================================================================
// Re-exports - Spreadsheets
// =============================================================================

pub use sheet::{read_mapping, write_mapping, MappingSheet, Table};

// =============================================================================
// Re-exports - AI
// =============================================================================

pub use ai::{build_generator, AnthropicClient, GenerateOptions, OllamaClient, SqlGenerator};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    convert_file, convert_rows, plan, CancelFlag, Conversion, ConversionReport,
    ConversionSummary, ConvertOptions, PlannedGroup,
};
