//! Domain models for the mapping conversion pipeline.
//!
//! - [`MappingRow`] - one source-to-target field correspondence
//! - [`ExplodedAlias`] - alias of an unnested array source column
//! - [`ExpressionOrigin`] - how a row's generated expression came to be
//! - [`columns`] - the spreadsheet column names

use serde::{Deserialize, Serialize};

// =============================================================================
// Column Names
// =============================================================================

/// Spreadsheet column names, as they appear in the header row.
pub mod columns {
    pub const SOURCE_TABLE: &str = "source_table";
    pub const SOURCE_COLUMN: &str = "source_column";
    pub const SOURCE_SUB_COLUMN: &str = "source_sub_column";
    pub const SOURCE_DATA_TYPE: &str = "source_data_type";
    pub const SOURCE_SUB_DATA_TYPE: &str = "source_sub_data_type";
    pub const TARGET_TABLE: &str = "target_table";
    pub const TARGET_COLUMN: &str = "target_column";
    pub const TARGET_SUB_COLUMN: &str = "target_sub_column";
    pub const TARGET_DATA_TYPE: &str = "target_data_type";
    pub const TARGET_SUB_DATA_TYPE: &str = "target_sub_data_type";
    pub const TRANSFORMATION_LOGIC: &str = "transformation_logic";

    /// Output: generated SQL expression.
    pub const GENERATED_SQL_EXPRESSION: &str = "generated_sql_expression";
    /// Output: `LATERAL VIEW EXPLODE(...) AS ...` directive.
    pub const LATERAL_EXPLODED_ALIAS: &str = "lateral_exploded_alias";

    /// Input columns in canonical order.
    pub const INPUT: [&str; 11] = [
        SOURCE_TABLE,
        SOURCE_COLUMN,
        SOURCE_SUB_COLUMN,
        SOURCE_DATA_TYPE,
        SOURCE_SUB_DATA_TYPE,
        TARGET_TABLE,
        TARGET_COLUMN,
        TARGET_SUB_COLUMN,
        TARGET_DATA_TYPE,
        TARGET_SUB_DATA_TYPE,
        TRANSFORMATION_LOGIC,
    ];

    /// Columns appended by the converter.
    pub const OUTPUT: [&str; 2] = [GENERATED_SQL_EXPRESSION, LATERAL_EXPLODED_ALIAS];
}

/// Data type name that marks an array column.
pub const ARRAY_TYPE: &str = "array";

/// Normalize a raw cell: blank, whitespace-only and `NaN` become `None`.
///
/// Non-blank values are kept exactly as provided.
pub fn normalize_cell(raw: Option<&str>) -> Option<String> {
    match raw {
        Some(s) if !s.trim().is_empty() && s.trim() != "NaN" => Some(s.to_string()),
        _ => None,
    }
}

fn is_array_type(data_type: Option<&str>) -> bool {
    data_type.is_some_and(|t| t.trim().eq_ignore_ascii_case(ARRAY_TYPE))
}

// =============================================================================
// Exploded Alias
// =============================================================================

/// Alias given to the rows produced by unnesting an array source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplodedAlias {
    /// Alias name, e.g. `lin_ems_expl`.
    pub name: String,
    /// Array column being exploded.
    pub source_column: String,
}

impl ExplodedAlias {
    /// The lateral-explode directive recorded on the row.
    pub fn lateral_view(&self) -> String {
        format!("LATERAL VIEW EXPLODE({}) AS {}", self.source_column, self.name)
    }

    /// Qualify a column with this alias: `<alias>.<column>`.
    pub fn qualify(&self, column: &str) -> String {
        format!("{}.{}", self.name, column)
    }
}

// =============================================================================
// Expression Origin
// =============================================================================

/// How the row's `generated_sql_expression` was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpressionOrigin {
    /// Not processed yet.
    #[default]
    Pending,
    /// No `target_column`; row ignored.
    Skipped,
    /// Deterministic `<source> AS <target>` copy.
    Direct,
    /// Produced by the text-generation collaborator.
    Generated,
    /// Member of an aggregate group whose expression lives on row `owner`.
    OwnedBySibling { owner: usize },
}

// =============================================================================
// Mapping Row
// =============================================================================

/// One row of the mapping spreadsheet.
///
/// Input fields are `None` when the cell was blank. Only
/// `generated_sql_expression`, `exploded_alias` and `origin` are written by
/// the converter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingRow {
    pub source_table: Option<String>,
    pub source_column: Option<String>,
    pub source_sub_column: Option<String>,
    pub source_data_type: Option<String>,
    pub source_sub_data_type: Option<String>,
    pub target_table: Option<String>,
    pub target_column: Option<String>,
    pub target_sub_column: Option<String>,
    pub target_data_type: Option<String>,
    pub target_sub_data_type: Option<String>,
    pub transformation_logic: Option<String>,

    pub generated_sql_expression: Option<String>,
    pub exploded_alias: Option<ExplodedAlias>,
    pub origin: ExpressionOrigin,

    /// Columns the converter does not interpret, kept for the output file.
    pub extra: Vec<(String, Option<String>)>,
}

impl MappingRow {
    /// Build a row from a header row and the matching cell values.
    ///
    /// Missing trailing cells are treated as blank.
    pub fn from_record(headers: &[String], values: &[Option<String>]) -> Self {
        let mut row = Self::default();
        for (i, header) in headers.iter().enumerate() {
            let value = normalize_cell(values.get(i).and_then(|v| v.as_deref()));
            row.set(header, value);
        }
        row
    }

    fn set(&mut self, column: &str, value: Option<String>) {
        let slot = match column {
            columns::SOURCE_TABLE => &mut self.source_table,
            columns::SOURCE_COLUMN => &mut self.source_column,
            columns::SOURCE_SUB_COLUMN => &mut self.source_sub_column,
            columns::SOURCE_DATA_TYPE => &mut self.source_data_type,
            columns::SOURCE_SUB_DATA_TYPE => &mut self.source_sub_data_type,
            columns::TARGET_TABLE => &mut self.target_table,
            columns::TARGET_COLUMN => &mut self.target_column,
            columns::TARGET_SUB_COLUMN => &mut self.target_sub_column,
            columns::TARGET_DATA_TYPE => &mut self.target_data_type,
            columns::TARGET_SUB_DATA_TYPE => &mut self.target_sub_data_type,
            columns::TRANSFORMATION_LOGIC => &mut self.transformation_logic,
            // Output columns from a previous run are regenerated.
            columns::GENERATED_SQL_EXPRESSION | columns::LATERAL_EXPLODED_ALIAS => return,
            other => {
                self.extra.push((other.to_string(), value));
                return;
            }
        };
        *slot = value;
    }

    /// Value of `column` as it should be written to the output file.
    pub fn value(&self, column: &str) -> Option<String> {
        let field = match column {
            columns::SOURCE_TABLE => &self.source_table,
            columns::SOURCE_COLUMN => &self.source_column,
            columns::SOURCE_SUB_COLUMN => &self.source_sub_column,
            columns::SOURCE_DATA_TYPE => &self.source_data_type,
            columns::SOURCE_SUB_DATA_TYPE => &self.source_sub_data_type,
            columns::TARGET_TABLE => &self.target_table,
            columns::TARGET_COLUMN => &self.target_column,
            columns::TARGET_SUB_COLUMN => &self.target_sub_column,
            columns::TARGET_DATA_TYPE => &self.target_data_type,
            columns::TARGET_SUB_DATA_TYPE => &self.target_sub_data_type,
            columns::TRANSFORMATION_LOGIC => &self.transformation_logic,
            columns::GENERATED_SQL_EXPRESSION => &self.generated_sql_expression,
            columns::LATERAL_EXPLODED_ALIAS => {
                return self.exploded_alias.as_ref().map(ExplodedAlias::lateral_view)
            }
            other => {
                return self
                    .extra
                    .iter()
                    .find(|(name, _)| name == other)
                    .and_then(|(_, v)| v.clone())
            }
        };
        field.clone()
    }

    /// `source_data_type` is `array`.
    pub fn source_is_array(&self) -> bool {
        is_array_type(self.source_data_type.as_deref())
    }

    /// `target_data_type` is `array`.
    pub fn target_is_array(&self) -> bool {
        is_array_type(self.target_data_type.as_deref())
    }

    /// An array source feeding a scalar target: the row needs an exploded alias.
    pub fn needs_explode(&self) -> bool {
        self.source_is_array() && !self.target_is_array()
    }

    /// Transformation text, if the row has any (blank means direct copy).
    pub fn transformation(&self) -> Option<&str> {
        self.transformation_logic.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// `source_sub_column`, falling back to `source_column`.
    pub fn source_field(&self) -> &str {
        self.source_sub_column
            .as_deref()
            .or(self.source_column.as_deref())
            .unwrap_or_default()
    }

    /// Column reference used in expressions: `<alias>.<source_field>` when
    /// the row is exploded, plain `source_column` otherwise.
    pub fn source_reference(&self) -> String {
        match &self.exploded_alias {
            Some(alias) => alias.qualify(self.source_field()),
            None => self.source_column.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|s| Some(s.to_string())).collect()
    }

    #[test]
    fn test_from_record_maps_known_columns() {
        let h = headers(&["source_column", "target_table", "target_column", "notes"]);
        let row = MappingRow::from_record(&h, &cells(&["customer_id", "orders_tgt", "cust_id", "pk"]));

        assert_eq!(row.source_column.as_deref(), Some("customer_id"));
        assert_eq!(row.target_table.as_deref(), Some("orders_tgt"));
        assert_eq!(row.target_column.as_deref(), Some("cust_id"));
        assert_eq!(row.extra, vec![("notes".to_string(), Some("pk".to_string()))]);
    }

    #[test]
    fn test_blank_cells_become_absent() {
        let h = headers(&["source_column", "source_sub_column", "transformation_logic"]);
        let row = MappingRow::from_record(&h, &[Some("a".into()), Some("   ".into()), None]);

        assert_eq!(row.source_sub_column, None);
        assert_eq!(row.transformation_logic, None);
        assert!(row.transformation().is_none());
    }

    #[test]
    fn test_missing_trailing_cells() {
        let h = headers(&["source_column", "target_column"]);
        let row = MappingRow::from_record(&h, &cells(&["a"]));
        assert_eq!(row.target_column, None);
    }

    #[test]
    fn test_values_kept_as_provided() {
        assert_eq!(normalize_cell(Some(" CAST(x AS INT) ")), Some(" CAST(x AS INT) ".into()));
        assert_eq!(normalize_cell(Some("NaN")), None);
        assert_eq!(normalize_cell(Some("")), None);
    }

    #[test]
    fn test_previous_outputs_are_dropped() {
        let h = headers(&["source_column", "generated_sql_expression"]);
        let row = MappingRow::from_record(&h, &cells(&["a", "a AS b"]));
        assert_eq!(row.generated_sql_expression, None);
        assert!(row.extra.is_empty());
    }

    #[test]
    fn test_array_detection() {
        let row = MappingRow {
            source_data_type: Some("Array".into()),
            target_data_type: Some("string".into()),
            ..Default::default()
        };
        assert!(row.source_is_array());
        assert!(!row.target_is_array());
        assert!(row.needs_explode());
    }

    #[test]
    fn test_value_for_output_columns() {
        let row = MappingRow {
            generated_sql_expression: Some("lin_ems_expl.amount AS amt".into()),
            exploded_alias: Some(ExplodedAlias {
                name: "lin_ems_expl".into(),
                source_column: "line_items".into(),
            }),
            extra: vec![("owner".into(), Some("finance".into()))],
            ..Default::default()
        };

        assert_eq!(
            row.value(columns::LATERAL_EXPLODED_ALIAS).as_deref(),
            Some("LATERAL VIEW EXPLODE(line_items) AS lin_ems_expl")
        );
        assert_eq!(
            row.value(columns::GENERATED_SQL_EXPRESSION).as_deref(),
            Some("lin_ems_expl.amount AS amt")
        );
        assert_eq!(row.value("owner").as_deref(), Some("finance"));
        assert_eq!(row.value("unknown"), None);
    }

    #[test]
    fn test_source_field_fallback() {
        let mut row = MappingRow {
            source_column: Some("line_items".into()),
            ..Default::default()
        };
        assert_eq!(row.source_field(), "line_items");
        row.source_sub_column = Some("amount".into());
        assert_eq!(row.source_field(), "amount");
    }

    #[test]
    fn test_source_reference() {
        let mut row = MappingRow {
            source_column: Some("line_items".into()),
            source_sub_column: Some("amount".into()),
            ..Default::default()
        };
        assert_eq!(row.source_reference(), "line_items");

        row.exploded_alias = Some(ExplodedAlias {
            name: "lin_ems_expl".into(),
            source_column: "line_items".into(),
        });
        assert_eq!(row.source_reference(), "lin_ems_expl.amount");
    }
}
