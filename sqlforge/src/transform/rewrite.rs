//! Cross-reference rewriting for exploded array sources.
//!
//! When a row explodes an array into a scalar target, its transformation
//! text may mention sub-columns of other exploded arrays feeding the same
//! target table. Those mentions are qualified with the owning row's alias
//! (`amount` -> `lin_ems_expl.amount`) before the instruction is built.
//!
//! Matching is token based. Quoted literals are left alone, and a token
//! only matches when it is a whole identifier that is not already
//! qualified (`valid_id` never matches `id`, `x.id` is left as is).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::models::MappingRow;

/// Quoted literals (skipped) or bare identifiers.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|[A-Za-z_][A-Za-z0-9_]*"#)
        .expect("token regex is valid")
});

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace every whole-token occurrence of a key of `qualified` with its value.
pub fn qualify_tokens(text: &str, qualified: &HashMap<String, String>) -> String {
    if qualified.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in TOKEN_RE.find_iter(text) {
        let token = m.as_str();
        if token.starts_with('\'') || token.starts_with('"') {
            continue;
        }
        let before = text[..m.start()].chars().next_back();
        if before.is_some_and(|c| is_ident_char(c) || c == '.') {
            continue;
        }
        // Function call, not a column.
        if text[m.end()..].starts_with('(') {
            continue;
        }
        if let Some(replacement) = qualified.get(token) {
            out.push_str(&text[last..m.start()]);
            out.push_str(replacement);
            last = m.end();
        }
    }

    out.push_str(&text[last..]);
    out
}

/// Sub-column qualifications contributed by the siblings of row `index`.
///
/// Siblings are the other rows with the same `target_table`, a non-blank
/// `source_sub_column` and an assigned exploded alias of their own. On duplicate
/// sub-column names the first row wins.
pub fn sibling_qualifications(rows: &[MappingRow], index: usize) -> HashMap<String, String> {
    let target_table = &rows[index].target_table;
    let mut qualified = HashMap::new();

    for (j, other) in rows.iter().enumerate() {
        if j == index || &other.target_table != target_table {
            continue;
        }
        let Some(sub_column) = other.source_sub_column.as_deref() else {
            continue;
        };
        let Some(alias) = &other.exploded_alias else {
            continue;
        };
        qualified
            .entry(sub_column.to_string())
            .or_insert_with(|| alias.qualify(sub_column));
    }

    qualified
}

/// Transformation text of row `index` with sibling sub-columns qualified.
///
/// Rows that do not explode an array into a scalar target get their text
/// back unchanged. Returns `None` when the row has no transformation.
pub fn rewrite_transformation(rows: &[MappingRow], index: usize) -> Option<String> {
    let row = &rows[index];
    let logic = row.transformation()?;
    if !row.needs_explode() {
        return Some(logic.to_string());
    }
    Some(qualify_tokens(logic, &sibling_qualifications(rows, index)))
}
