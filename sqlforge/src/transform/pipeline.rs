//! High-level conversion pipeline.
//!
//! ```text
//! load → group → assign aliases → plan (per group) → generate → merge → save
//! ```
//!
//! Groups are processed one at a time and each collaborator call is
//! awaited before the next starts. Cancellation is checked before every
//! group; a cancelled run returns an error and writes nothing.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlforge::ai::OllamaClient;
//! use sqlforge::transform::pipeline::{convert_file, ConvertOptions};
//!
//! let client = OllamaClient::new("http://localhost:11434", "gemma3:4b");
//! let report = convert_file(
//!     "transformation_files/Transformation_logic.xlsx".as_ref(),
//!     "output_with_sql.xlsx".as_ref(),
//!     &client,
//!     &ConvertOptions::default(),
//! )
//! .await?;
//! println!("{} expressions generated", report.summary.generated);
//! ```

use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};

use super::alias::assign_aliases;
use super::grouper::{group_rows, Group, Shape};
use super::synthesis::{finish_reply, plan_group, GenerationRequest, Step};
use crate::ai::{GenerateOptions, SqlGenerator, DEFAULT_DIALECT};
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_error, log_info, log_success, log_warning};
use crate::models::{ExpressionOrigin, MappingRow};
use crate::sheet::{read_mapping, write_mapping, MappingSheet};

/// Shared flag to stop a run before its next group.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// SQL dialect named in the generation rules.
    pub dialect: String,
    pub generate: GenerateOptions,
    pub cancel: Option<CancelFlag>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            dialect: DEFAULT_DIALECT.to_string(),
            generate: GenerateOptions::default(),
            cancel: None,
        }
    }
}

impl ConvertOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            dialect: config.dialect.clone(),
            ..Default::default()
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }
}

/// Counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub rows: usize,
    pub groups: usize,
    pub aggregate_groups: usize,
    pub direct: usize,
    pub generated: usize,
    pub sibling_owned: usize,
    pub skipped: usize,
    pub collaborator_calls: usize,
}

impl ConversionSummary {
    fn tally(&mut self, rows: &[MappingRow]) {
        self.rows = rows.len();
        for row in rows {
            match row.origin {
                ExpressionOrigin::Direct => self.direct += 1,
                ExpressionOrigin::Generated => self.generated += 1,
                ExpressionOrigin::OwnedBySibling { .. } => self.sibling_owned += 1,
                ExpressionOrigin::Skipped => self.skipped += 1,
                ExpressionOrigin::Pending => {}
            }
        }
    }
}

/// Converted rows plus run counts.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub rows: Vec<MappingRow>,
    pub summary: ConversionSummary,
}

/// A group with its planned steps, as produced by [`plan`].
#[derive(Debug, Clone)]
pub struct PlannedGroup {
    pub group: Group,
    pub shape: Shape,
    pub steps: Vec<Step>,
}

/// Group, assign aliases and plan every row without calling the collaborator.
pub fn plan(rows: Vec<MappingRow>, dialect: &str) -> (Vec<MappingRow>, Vec<PlannedGroup>) {
    let groups = group_rows(&rows);
    let rows = assign_aliases(rows, &groups);
    let planned = groups
        .into_iter()
        .map(|group| PlannedGroup {
            shape: group.shape(&rows),
            steps: plan_group(&rows, &group, dialect),
            group,
        })
        .collect();
    (rows, planned)
}

/// Convert mapping rows. Output has the same rows in the same order.
pub async fn convert_rows(
    rows: Vec<MappingRow>,
    generator: &dyn SqlGenerator,
    options: &ConvertOptions,
) -> PipelineResult<Conversion> {
    let groups = group_rows(&rows);
    let mut rows = assign_aliases(rows, &groups);
    let total = groups.len();

    let mut summary = ConversionSummary {
        groups: total,
        ..Default::default()
    };

    for (completed, group) in groups.iter().enumerate() {
        if options.is_cancelled() {
            warn!(completed, total, "conversion cancelled");
            return Err(PipelineError::Cancelled { completed, total });
        }

        let shape = group.shape(&rows);
        if shape == Shape::Aggregate {
            summary.aggregate_groups += 1;
        }

        let span = info_span!(
            "group",
            target_table = group.key.target_table.as_deref().unwrap_or_default(),
            target_column = group.key.target_column.as_deref().unwrap_or_default(),
            size = group.len(),
        );
        rows = process_group(rows, group, shape, generator, options, &mut summary)
            .instrument(span)
            .await?;
    }

    summary.tally(&rows);
    Ok(Conversion { rows, summary })
}

async fn process_group(
    mut rows: Vec<MappingRow>,
    group: &Group,
    shape: Shape,
    generator: &dyn SqlGenerator,
    options: &ConvertOptions,
    summary: &mut ConversionSummary,
) -> PipelineResult<Vec<MappingRow>> {
    debug!(?shape, "planning group");
    for step in plan_group(&rows, group, &options.dialect) {
        rows = match step {
            Step::Generate(request) => {
                summary.collaborator_calls += 1;
                apply_generation(rows, request, generator, options).await?
            }
            other => apply_step(rows, other),
        };
    }
    Ok(rows)
}

/// Apply a step that needs no collaborator.
fn apply_step(mut rows: Vec<MappingRow>, step: Step) -> Vec<MappingRow> {
    match step {
        Step::Skip { row } => {
            debug!(row, "no target_column, skipped");
            rows[row].origin = ExpressionOrigin::Skipped;
        }
        Step::Direct { row, expression } => {
            debug!(row, %expression, "direct mapping");
            rows[row].generated_sql_expression = Some(expression);
            rows[row].origin = ExpressionOrigin::Direct;
        }
        // Handled by `apply_generation`.
        Step::Generate(_) => {}
    }
    rows
}

async fn apply_generation(
    mut rows: Vec<MappingRow>,
    request: GenerationRequest,
    generator: &dyn SqlGenerator,
    options: &ConvertOptions,
) -> PipelineResult<Vec<MappingRow>> {
    let reply = generator.generate(&request.instruction, &options.generate).await?;
    let expression = finish_reply(&reply, request.fallback_alias.as_deref());
    debug!(row = request.owner, generator = generator.name(), %expression, "generated expression");

    let owner = request.owner;
    rows[owner].generated_sql_expression = Some(expression);
    rows[owner].origin = ExpressionOrigin::Generated;
    for sibling in request.siblings {
        rows[sibling].generated_sql_expression = None;
        rows[sibling].origin = ExpressionOrigin::OwnedBySibling { owner };
    }
    Ok(rows)
}

/// Result of [`convert_file`].
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub sheet: MappingSheet,
    pub summary: ConversionSummary,
}

/// Read a mapping spreadsheet, convert it and write the result.
///
/// All or nothing: any read, collaborator or write failure aborts the run.
pub async fn convert_file(
    input: &Path,
    output: &Path,
    generator: &dyn SqlGenerator,
    options: &ConvertOptions,
) -> PipelineResult<ConversionReport> {
    let span = info_span!("convert", input = %input.display(), output = %output.display());

    async move {
        log_info(format!("Reading mapping sheet {}", input.display()));
        let mut sheet = read_mapping(input)?;
        log_success(format!(
            "Read {} rows, {} columns",
            sheet.rows.len(),
            sheet.headers.len()
        ));
        if sheet.rows.is_empty() {
            log_warning("Mapping sheet has no data rows");
        }

        log_info(format!("Generating SQL expressions with {}", generator.name()));
        let conversion = convert_rows(std::mem::take(&mut sheet.rows), generator, options).await?;
        sheet.rows = conversion.rows;

        write_mapping(output, &sheet)?;
        log_success(format!("SQL expressions written to {}", output.display()));

        Ok::<_, PipelineError>(ConversionReport {
            sheet,
            summary: conversion.summary,
        })
    }
    .instrument(span)
    .await
    .map_err(|e| {
        log_error(format!("Conversion failed: {e}"));
        e
    })
}
