//! Instruction builders for SQL expression generation.
//!
//! Two shapes: a single scalar field ([`scalar_instruction`]) and a group
//! of rows combined into one struct/array target
//! ([`aggregate_instruction`]).

use crate::models::MappingRow;

/// Dialect named in the rules when none is configured.
pub const DEFAULT_DIALECT: &str = "Apache Spark SQL / Databricks SQL";

const PREAMBLE: &str = "You are a senior data engineer.";

fn show(value: Option<&str>) -> &str {
    value.unwrap_or("(none)")
}

/// Rules shared by every instruction.
fn base_rules(dialect: &str) -> Vec<String> {
    vec![
        format!("Use only {dialect} functions"),
        "Write literal values inline (e.g. 'N/A', 0, TRUE); never wrap a literal in a function such as LIT()".to_string(),
        "Do NOT aggregate (SUM, COUNT, COLLECT_LIST, ...) unless the transformation logic explicitly asks for it".to_string(),
        "Wrap the expression in STRUCT() or ARRAY() only when the target data type is array, e.g. ARRAY(STRUCT(...))".to_string(),
        "If the source and target data types are both scalar, strictly do NOT wrap the expression in STRUCT() or ARRAY()".to_string(),
        "Direct mapping from the source column or source sub column to the target if the transformation is empty".to_string(),
        "Return EXACTLY one bare expression: no SELECT, FROM, WHERE, GROUP BY, LATERAL VIEW or any other SQL clause, not even inside ARRAY(...)".to_string(),
        "No explanations, no extra text, no markdown".to_string(),
    ]
}

fn render_rules(rules: &[String]) -> String {
    rules
        .iter()
        .map(|r| format!("- {r}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Instruction for one scalar-shape row.
///
/// `transformation` is the row's transformation text after cross-reference
/// rewriting. The row's exploded alias, if any, must already be assigned.
pub fn scalar_instruction(row: &MappingRow, transformation: &str, dialect: &str) -> String {
    let target_column = show(row.target_column.as_deref());
    let source_reference = row.source_reference();

    let mut rules = base_rules(dialect);
    rules.push(format!("Alias the output as {target_column}, only with AS"));
    if row.source_column.is_none() {
        rules.push(format!("The source column is missing: map NULL to {target_column}"));
    }

    let alias_section = match &row.exploded_alias {
        Some(alias) => {
            rules.push(format!(
                "The source array is already exploded as {}: reference its fields as {}.<field> and do NOT call EXPLODE() or ARRAY_ELEMENT_AT()",
                alias.name, alias.name
            ));
            format!(
                "\nExploded alias:\n- {} is exploded as {} ({})\n",
                alias.source_column,
                alias.name,
                alias.lateral_view()
            )
        }
        None => String::new(),
    };

    format!(
        r#"{PREAMBLE}
Generate ONLY the SQL expression (not a full query) for this field.

Source:
- table: {source_table}
- column: {source_reference}
- sub column: {source_sub_column}
- data type: {source_data_type}
- sub data type: {source_sub_data_type}

Transformation logic:
{transformation}

Target:
- table: {target_table}
- column: {target_column}
- sub column: {target_sub_column}
- data type: {target_data_type}
- sub data type: {target_sub_data_type}
{alias_section}
Rules:
{rules}
"#,
        source_table = show(row.source_table.as_deref()),
        source_sub_column = show(row.source_sub_column.as_deref()),
        source_data_type = show(row.source_data_type.as_deref()),
        source_sub_data_type = show(row.source_sub_data_type.as_deref()),
        target_table = show(row.target_table.as_deref()),
        target_sub_column = show(row.target_sub_column.as_deref()),
        target_data_type = show(row.target_data_type.as_deref()),
        target_sub_data_type = show(row.target_sub_data_type.as_deref()),
        rules = render_rules(&rules),
    )
}

/// The three descriptive lists of an aggregate group: source columns,
/// sub-columns and per-row logic.
pub fn aggregate_lists(rows: &[&MappingRow]) -> (String, String, String) {
    let source_columns = rows
        .iter()
        .map(|r| show(r.source_column.as_deref()))
        .collect::<Vec<_>>()
        .join(", ");

    let sub_columns = rows
        .iter()
        .map(|r| r.source_field())
        .collect::<Vec<_>>()
        .join(", ");

    let logic = rows
        .iter()
        .map(|r| {
            let expr = r
                .transformation()
                .unwrap_or_else(|| show(r.source_column.as_deref()));
            match r.target_sub_column.as_deref() {
                Some(sub) => format!("{expr} AS {sub}"),
                None => expr.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    (source_columns, sub_columns, logic)
}

/// Instruction for an aggregate-shape group.
pub fn aggregate_instruction(rows: &[&MappingRow], dialect: &str) -> String {
    let first = rows[0];
    let target_column = show(first.target_column.as_deref());
    let target_data_type = show(first.target_data_type.as_deref());
    let (source_columns, sub_columns, logic) = aggregate_lists(rows);

    let mut rules = base_rules(dialect);
    rules.extend([
        "Use STRUCT() to combine the sub-columns".to_string(),
        "If the target data type is array, wrap the STRUCT() in ARRAY(...), e.g. ARRAY(STRUCT(...))".to_string(),
        "Use CASE WHEN only if the source logic is conditional".to_string(),
        format!("Alias the output as {target_column}, only with AS"),
    ]);

    format!(
        r#"{PREAMBLE}
Generate ONLY the SQL expression (not a full query) for the following {target_data_type} target.

Target:
- table: {target_table}
- column: {target_column}
- data type: {target_data_type}
- sub data type: {target_sub_data_type}

Combine the following source columns into a single struct/array:
- source columns: {source_columns}
- sub-columns: {sub_columns}
- transformation logic: {logic}

Rules:
{rules}
"#,
        target_table = show(first.target_table.as_deref()),
        target_sub_data_type = show(first.target_sub_data_type.as_deref()),
        rules = render_rules(&rules),
    )
}
