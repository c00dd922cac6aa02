//! End-to-end conversion tests with a scripted collaborator.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Mutex;

use sqlforge::sheet::{read_table, write_table, Table};
use sqlforge::{
    convert_file, convert_rows, AiError, AiResult, ConvertOptions, ExpressionOrigin,
    GenerateOptions, MappingRow, PipelineError, SqlGenerator,
};

/// Replies in order; records every instruction and temperature it saw.
struct ScriptedGenerator {
    replies: Mutex<Vec<String>>,
    instructions: Mutex<Vec<String>>,
    temperatures: Mutex<Vec<f32>>,
}

impl ScriptedGenerator {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
            instructions: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
        }
    }

    fn instructions(&self) -> Vec<String> {
        self.instructions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, instruction: &str, options: &GenerateOptions) -> AiResult<String> {
        self.instructions.lock().unwrap().push(instruction.to_string());
        self.temperatures.lock().unwrap().push(options.temperature);
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| AiError::RequestFailed("script exhausted".to_string()))
    }
}

const HEADERS: [&str; 11] = [
    "source_table",
    "source_column",
    "source_sub_column",
    "source_data_type",
    "source_sub_data_type",
    "target_table",
    "target_column",
    "target_sub_column",
    "target_data_type",
    "target_sub_data_type",
    "transformation_logic",
];

fn table(rows: &[[&str; 11]]) -> Table {
    Table {
        headers: HEADERS.iter().map(|h| h.to_string()).collect(),
        records: rows
            .iter()
            .map(|r| {
                r.iter()
                    .map(|v| (!v.is_empty()).then(|| v.to_string()))
                    .collect()
            })
            .collect(),
    }
}

fn column(table: &Table, name: &str) -> Vec<Option<String>> {
    let i = table
        .headers
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("missing column {name}"));
    table.records.iter().map(|r| r.get(i).cloned().flatten()).collect()
}

async fn run_file(input: &Path, output: &Path, generator: &ScriptedGenerator) {
    convert_file(input, output, generator, &ConvertOptions::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_direct_copy_end_to_end_xlsx() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mapping.xlsx");
    let output = dir.path().join("out/output_with_sql.xlsx");
    write_table(
        &input,
        &table(&[[
            "orders_src", "customer_id", "", "string", "", "orders_tgt", "cust_id", "", "string", "", "",
        ]]),
    )
    .unwrap();

    let generator = ScriptedGenerator::new(&[]);
    run_file(&input, &output, &generator).await;

    let out = read_table(&output).unwrap();
    assert_eq!(column(&out, "generated_sql_expression"), vec![Some("customer_id AS cust_id".into())]);
    assert_eq!(column(&out, "lateral_exploded_alias"), vec![None]);
    assert!(generator.instructions().is_empty());
}

#[tokio::test]
async fn test_exploded_array_end_to_end_csv() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mapping.csv");
    let output = dir.path().join("output.csv");
    write_table(
        &input,
        &table(&[[
            "orders_src", "line_items", "amount", "array", "double", "orders_tgt", "line_amount", "", "double", "", "",
        ]]),
    )
    .unwrap();

    let generator = ScriptedGenerator::new(&[]);
    run_file(&input, &output, &generator).await;

    let out = read_table(&output).unwrap();
    assert_eq!(
        column(&out, "lateral_exploded_alias"),
        vec![Some("LATERAL VIEW EXPLODE(line_items) AS lin_ems_expl".into())]
    );
    assert_eq!(
        column(&out, "generated_sql_expression"),
        vec![Some("lin_ems_expl.amount AS line_amount".into())]
    );
}

#[tokio::test]
async fn test_aggregate_group_fills_first_row_only() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mapping.csv");
    let output = dir.path().join("output.xlsx");
    write_table(
        &input,
        &table(&[
            ["src", "sku", "", "string", "", "tgt", "items", "sku", "array", "string", ""],
            ["src", "id", "", "string", "", "tgt", "cust_id", "", "string", "", ""],
            ["src", "qty", "", "int", "", "tgt", "items", "quantity", "array", "int", "cast to int"],
            ["src", "price", "", "double", "", "tgt", "items", "price", "array", "double", ""],
        ]),
    )
    .unwrap();

    let generator = ScriptedGenerator::new(&[
        "```sql\nARRAY(STRUCT(sku AS sku, CAST(qty AS INT) AS quantity, price AS price)) AS items;\n```",
    ]);
    run_file(&input, &output, &generator).await;

    let out = read_table(&output).unwrap();
    assert_eq!(
        column(&out, "generated_sql_expression"),
        vec![
            Some("ARRAY(STRUCT(sku AS sku, CAST(qty AS INT) AS quantity, price AS price)) AS items".into()),
            Some("id AS cust_id".into()),
            None,
            None,
        ]
    );

    let instructions = generator.instructions();
    assert_eq!(instructions.len(), 1);
    assert!(instructions[0].contains("sku, qty, price"));
    assert!(instructions[0].contains("cast to int AS quantity"));
}

#[tokio::test]
async fn test_output_keeps_row_count_and_order() {
    let rows: Vec<MappingRow> = ["a", "b", "c", "d", "e"]
        .iter()
        .enumerate()
        .map(|(i, name)| MappingRow {
            source_column: Some(name.to_string()),
            target_table: Some("t".into()),
            target_column: (i != 2).then(|| format!("{name}_out")),
            target_data_type: Some("string".into()),
            ..Default::default()
        })
        .collect();

    let generator = ScriptedGenerator::new(&[]);
    let result = convert_rows(rows, &generator, &ConvertOptions::default())
        .await
        .unwrap();

    let sources: Vec<_> = result.rows.iter().map(|r| r.source_column.clone().unwrap()).collect();
    assert_eq!(sources, vec!["a", "b", "c", "d", "e"]);
    assert_eq!(result.rows[2].origin, ExpressionOrigin::Skipped);
    assert_eq!(result.rows[2].generated_sql_expression, None);
    assert_eq!(result.summary.direct, 4);
    assert_eq!(result.summary.skipped, 1);
}

#[tokio::test]
async fn test_scalar_instruction_uses_sibling_aliases() {
    let rows = vec![
        MappingRow {
            source_column: Some("line_items".into()),
            source_sub_column: Some("amount".into()),
            source_data_type: Some("array".into()),
            target_table: Some("orders_tgt".into()),
            target_column: Some("line_amount".into()),
            target_data_type: Some("double".into()),
            ..Default::default()
        },
        MappingRow {
            source_column: Some("discounts".into()),
            source_sub_column: Some("rate".into()),
            source_data_type: Some("array".into()),
            target_table: Some("orders_tgt".into()),
            target_column: Some("net_amount".into()),
            target_data_type: Some("double".into()),
            transformation_logic: Some("amount * (1 - rate) unless valid_amount is null".into()),
            ..Default::default()
        },
    ];

    let generator = ScriptedGenerator::new(&["lin_ems_expl.amount * (1 - dis_nts_expl.rate)"]);
    let result = convert_rows(rows, &generator, &ConvertOptions::default())
        .await
        .unwrap();

    let instruction = &generator.instructions()[0];
    assert!(instruction.contains("lin_ems_expl.amount * (1 - rate)"));
    assert!(instruction.contains("valid_amount"));
    assert!(!instruction.contains("valid_lin_ems_expl"));
    assert_eq!(
        result.rows[1].generated_sql_expression.as_deref(),
        Some("lin_ems_expl.amount * (1 - dis_nts_expl.rate) AS net_amount")
    );
    assert_eq!(
        result.rows[1].transformation_logic.as_deref(),
        Some("amount * (1 - rate) unless valid_amount is null")
    );
    assert_eq!(*generator.temperatures.lock().unwrap(), vec![0.0]);
}

#[tokio::test]
async fn test_collaborator_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mapping.csv");
    let output = dir.path().join("output.xlsx");
    write_table(
        &input,
        &table(&[["src", "name", "", "string", "", "tgt", "name", "", "string", "", "upper case"]]),
    )
    .unwrap();

    let generator = ScriptedGenerator::new(&[]);
    let err = convert_file(&input, &output, &generator, &ConvertOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Ai(_)));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let generator = ScriptedGenerator::new(&[]);

    let err = convert_file(
        &dir.path().join("missing.xlsx"),
        &dir.path().join("out.xlsx"),
        &generator,
        &ConvertOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::Sheet(_)));
}

#[tokio::test]
async fn test_rerun_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mapping.csv");
    write_table(
        &input,
        &table(&[
            ["src", "a", "", "string", "", "t", "x", "", "string", "", ""],
            ["src", "b", "", "string", "", "t", "y", "", "string", "", ""],
            ["src", "c", "", "string", "", "t", "x", "", "string", "", ""],
        ]),
    )
    .unwrap();

    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");
    run_file(&input, &first, &ScriptedGenerator::new(&[])).await;
    run_file(&input, &second, &ScriptedGenerator::new(&[])).await;

    assert_eq!(read_table(&first).unwrap(), read_table(&second).unwrap());
}
