//! Expression synthesis: decide, per group, what each row gets.
//!
//! Planning is pure. [`plan_group`] turns a group into [`Step`]s: a skip,
//! a deterministic direct copy, or a request for the text-generation
//! collaborator. The pipeline executes the steps and finishes replies with
//! [`finish_reply`].

use once_cell::sync::Lazy;
use regex::Regex;

use super::grouper::{Group, Shape};
use super::rewrite::rewrite_transformation;
use crate::ai::prompt::{aggregate_instruction, scalar_instruction};
use crate::models::MappingRow;

/// Dialect tags a model may prefix its reply with.
const DIALECT_TAGS: [&str; 7] = [
    "sparksql",
    "spark-sql",
    "spark_sql",
    "databricks",
    "spark",
    "hive",
    "sql",
];

/// `AS <identifier>` at the very end of the expression.
static TRAILING_ALIAS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bAS\s+(?:[A-Za-z_][A-Za-z0-9_]*|"[^"]+")\s*$"#)
        .expect("alias regex is valid")
});

/// What to do with one row, or one aggregate group.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Row has no `target_column`.
    Skip { row: usize },
    /// Deterministic copy, no collaborator call.
    Direct { row: usize, expression: String },
    /// Ask the collaborator.
    Generate(GenerationRequest),
}

/// One collaborator call and where its reply goes.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Row that receives the expression.
    pub owner: usize,
    /// Aggregate members whose expression lives on `owner`.
    pub siblings: Vec<usize>,
    pub instruction: String,
    /// Alias appended when the reply lacks one; `None` for array targets.
    pub fallback_alias: Option<String>,
}

/// `<source_reference> AS <target_column>`, or `NULL AS <target_column>`
/// when the row has no source column.
pub fn direct_expression(row: &MappingRow) -> String {
    let target_column = row.target_column.as_deref().unwrap_or_default();
    match row.source_column {
        Some(_) => format!("{} AS {}", row.source_reference(), target_column),
        None => format!("NULL AS {target_column}"),
    }
}

/// Plan one group. Rows must already carry their exploded aliases.
pub fn plan_group(rows: &[MappingRow], group: &Group, dialect: &str) -> Vec<Step> {
    match group.shape(rows) {
        Shape::Aggregate => plan_aggregate(rows, group, dialect),
        Shape::Scalar => group
            .members
            .iter()
            .map(|&i| plan_scalar(rows, i, dialect))
            .collect(),
    }
}

fn plan_aggregate(rows: &[MappingRow], group: &Group, dialect: &str) -> Vec<Step> {
    if group.key.target_column.is_none() {
        return group.members.iter().map(|&row| Step::Skip { row }).collect();
    }
    let members: Vec<&MappingRow> = group.rows(rows).collect();
    vec![Step::Generate(GenerationRequest {
        owner: group.first(),
        siblings: group.members[1..].to_vec(),
        instruction: aggregate_instruction(&members, dialect),
        fallback_alias: None,
    })]
}

fn plan_scalar(rows: &[MappingRow], index: usize, dialect: &str) -> Step {
    let row = &rows[index];
    let Some(target_column) = row.target_column.as_deref() else {
        return Step::Skip { row: index };
    };

    match rewrite_transformation(rows, index) {
        None => Step::Direct {
            row: index,
            expression: direct_expression(row),
        },
        Some(transformation) => Step::Generate(GenerationRequest {
            owner: index,
            siblings: Vec::new(),
            instruction: scalar_instruction(row, &transformation, dialect),
            fallback_alias: (!row.target_is_array()).then(|| target_column.to_string()),
        }),
    }
}

fn strip_dialect_tag(text: &str) -> Option<&str> {
    DIALECT_TAGS.iter().find_map(|tag| {
        let head = text.get(..tag.len())?;
        let rest = &text[tag.len()..];
        let separated = rest.starts_with(char::is_whitespace);
        (head.eq_ignore_ascii_case(tag) && separated && !rest.trim().is_empty()).then_some(rest)
    })
}

/// Strip formatting artifacts from a collaborator reply.
///
/// Removes code fences, backticks, leading dialect tags and trailing
/// semicolons, then trims. Applying it twice gives the same string as once.
pub fn clean_reply(reply: &str) -> String {
    let unfenced = reply.replace("```", "").replace('`', "");
    let mut text = unfenced.trim();
    while let Some(rest) = strip_dialect_tag(text) {
        text = rest.trim();
    }
    let mut text = text.to_string();
    while text.ends_with(';') {
        text.pop();
        text.truncate(text.trim_end().len());
    }
    text
}

/// The expression already ends with a top-level `AS <alias>`.
pub fn has_trailing_alias(expression: &str) -> bool {
    TRAILING_ALIAS_RE.is_match(expression)
}

/// Clean the reply and, for scalar targets, make sure it is aliased.
pub fn finish_reply(reply: &str, fallback_alias: Option<&str>) -> String {
    let cleaned = clean_reply(reply);
    match fallback_alias {
        Some(alias) if !has_trailing_alias(&cleaned) => format!("{cleaned} AS {alias}"),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::alias::assign_aliases;
    use crate::transform::grouper::group_rows;

    fn row(source: &str, target: &str, logic: Option<&str>) -> MappingRow {
        MappingRow {
            source_table: Some("orders_src".into()),
            source_column: Some(source.into()),
            source_data_type: Some("string".into()),
            target_table: Some("orders_tgt".into()),
            target_column: Some(target.into()),
            target_data_type: Some("string".into()),
            transformation_logic: logic.map(String::from),
            ..Default::default()
        }
    }

    fn array_target(source: &str, target: &str, sub: &str) -> MappingRow {
        MappingRow {
            target_data_type: Some("array".into()),
            target_sub_column: Some(sub.into()),
            ..row(source, target, None)
        }
    }

    fn plan(rows: Vec<MappingRow>) -> (Vec<MappingRow>, Vec<Step>) {
        let groups = group_rows(&rows);
        let rows = assign_aliases(rows, &groups);
        let steps = groups
            .iter()
            .flat_map(|g| plan_group(&rows, g, "Spark SQL"))
            .collect();
        (rows, steps)
    }

    #[test]
    fn test_direct_copy() {
        let (_, steps) = plan(vec![row("customer_id", "cust_id", None)]);
        assert_eq!(
            steps,
            vec![Step::Direct {
                row: 0,
                expression: "customer_id AS cust_id".into()
            }]
        );
    }

    #[test]
    fn test_blank_logic_is_direct() {
        let (_, steps) = plan(vec![row("customer_id", "cust_id", Some("   "))]);
        assert!(matches!(steps[0], Step::Direct { .. }));
    }

    #[test]
    fn test_direct_copy_through_exploded_alias() {
        let exploded = MappingRow {
            source_column: Some("line_items".into()),
            source_sub_column: Some("amount".into()),
            source_data_type: Some("array".into()),
            ..row("line_items", "amount_out", None)
        };
        let (rows, steps) = plan(vec![exploded]);

        assert_eq!(
            rows[0].exploded_alias.as_ref().map(|a| a.lateral_view()).as_deref(),
            Some("LATERAL VIEW EXPLODE(line_items) AS lin_ems_expl")
        );
        assert_eq!(
            steps,
            vec![Step::Direct {
                row: 0,
                expression: "lin_ems_expl.amount AS amount_out".into()
            }]
        );
    }

    #[test]
    fn test_missing_source_maps_null() {
        let mut r = row("unused", "cust_id", None);
        r.source_column = None;
        let (_, steps) = plan(vec![r]);
        assert_eq!(
            steps,
            vec![Step::Direct {
                row: 0,
                expression: "NULL AS cust_id".into()
            }]
        );
    }

    #[test]
    fn test_missing_target_column_is_skipped() {
        let mut r = row("a", "b", Some("upper(a)"));
        r.target_column = None;
        let (_, steps) = plan(vec![r]);
        assert_eq!(steps, vec![Step::Skip { row: 0 }]);
    }

    #[test]
    fn test_transformation_requests_generation() {
        let (_, steps) = plan(vec![row("first_name", "name", Some("upper case the name"))]);
        let Step::Generate(request) = &steps[0] else {
            panic!("expected a generation request");
        };
        assert_eq!(request.owner, 0);
        assert!(request.siblings.is_empty());
        assert_eq!(request.fallback_alias.as_deref(), Some("name"));
        assert!(request.instruction.contains("upper case the name"));
    }

    #[test]
    fn test_aggregate_group_one_request() {
        let (_, steps) = plan(vec![
            array_target("first_name", "people", "first"),
            row("customer_id", "cust_id", None),
            array_target("last_name", "people", "last"),
        ]);

        assert_eq!(steps.len(), 2);
        let Step::Generate(request) = &steps[0] else {
            panic!("expected a generation request");
        };
        assert_eq!(request.owner, 0);
        assert_eq!(request.siblings, vec![2]);
        assert_eq!(request.fallback_alias, None);
        assert!(request.instruction.contains("first_name, last_name"));
    }

    #[test]
    fn test_single_row_array_target_is_scalar() {
        let (_, steps) = plan(vec![array_target("tags", "tags", "tag")]);
        assert_eq!(
            steps,
            vec![Step::Direct {
                row: 0,
                expression: "tags AS tags".into()
            }]
        );
    }

    #[test]
    fn test_aggregate_without_target_column_is_skipped() {
        let mut a = array_target("a", "x", "a");
        let mut b = array_target("b", "x", "b");
        a.target_column = None;
        b.target_column = None;
        let (_, steps) = plan(vec![a, b]);
        assert_eq!(steps, vec![Step::Skip { row: 0 }, Step::Skip { row: 1 }]);
    }

    #[test]
    fn test_clean_reply_strips_fences() {
        assert_eq!(clean_reply("```sql\nupper(name) AS name\n```"), "upper(name) AS name");
        assert_eq!(clean_reply("  `upper(name)` AS name;  "), "upper(name) AS name");
        assert_eq!(clean_reply("SparkSQL\nCASE WHEN a THEN 1 END"), "CASE WHEN a THEN 1 END");
    }

    #[test]
    fn test_clean_reply_keeps_identifiers() {
        assert_eq!(clean_reply("sql_id AS id"), "sql_id AS id");
        assert_eq!(clean_reply("mysql_flag AS flag"), "mysql_flag AS flag");
    }

    #[test]
    fn test_clean_reply_is_idempotent() {
        let replies = [
            "```sql\nsql ;x\n```",
            "sql\nsql\nupper(a) AS b;;",
            "sql;",
            "``` ```",
            "`a`;\n;",
            "CAST(x AS INT)",
            "",
        ];
        for reply in replies {
            let once = clean_reply(reply);
            assert_eq!(clean_reply(&once), once, "reply: {reply:?}");
        }
    }

    #[test]
    fn test_trailing_alias_detection() {
        assert!(has_trailing_alias("upper(a) AS b"));
        assert!(has_trailing_alias("upper(a) as b "));
        assert!(has_trailing_alias("ARRAY(STRUCT(a AS x)) AS items"));
        assert!(!has_trailing_alias("CAST(a AS INT)"));
        assert!(!has_trailing_alias("upper(alias)"));
    }

    #[test]
    fn test_finish_reply_appends_alias() {
        assert_eq!(finish_reply("```sql\nupper(a)\n```", Some("b")), "upper(a) AS b");
        assert_eq!(finish_reply("CAST(a AS INT)", Some("b")), "CAST(a AS INT) AS b");
        assert_eq!(finish_reply("upper(a) AS c", Some("b")), "upper(a) AS c");
        assert_eq!(finish_reply("ARRAY(STRUCT(a))", None), "ARRAY(STRUCT(a))");
    }
}
