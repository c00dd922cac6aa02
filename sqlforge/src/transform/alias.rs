//! Exploded alias derivation.
//!
//! An array source feeding a scalar target is unnested with
//! `LATERAL VIEW EXPLODE(<source_column>) AS <alias>`. The alias is a pure
//! function of the source column name: first three characters, `_`, last
//! three characters, `_expl`.

use super::grouper::{Group, Shape};
use crate::models::{ExplodedAlias, MappingRow};

/// Suffix appended to every exploded alias.
pub const ALIAS_SUFFIX: &str = "_expl";

const AFFIX_LEN: usize = 3;

/// Alias name for an exploded array column.
///
/// Characters, not bytes, are counted. Names shorter than three characters
/// are used whole on both sides (`ab` -> `ab_ab_expl`).
pub fn alias_name(source_column: &str) -> String {
    let chars: Vec<char> = source_column.chars().collect();
    let head: String = chars.iter().take(AFFIX_LEN).collect();
    let tail: String = chars[chars.len().saturating_sub(AFFIX_LEN)..].iter().collect();
    format!("{head}_{tail}{ALIAS_SUFFIX}")
}

/// The alias a row needs, if its source is an array and its target is not.
pub fn alias_for(row: &MappingRow) -> Option<ExplodedAlias> {
    if !row.needs_explode() {
        return None;
    }
    let source_column = row.source_column.as_deref()?;
    Some(ExplodedAlias {
        name: alias_name(source_column),
        source_column: source_column.to_string(),
    })
}

/// Record the exploded alias on every Scalar-group row that needs one.
///
/// Members of Aggregate groups never get one, and neither do rows
/// without a `target_column`.
pub fn assign_aliases(mut rows: Vec<MappingRow>, groups: &[Group]) -> Vec<MappingRow> {
    for group in groups {
        let scalar = group.shape(&rows) == Shape::Scalar;
        for &index in &group.members {
            let row = &mut rows[index];
            row.exploded_alias = if scalar && row.target_column.is_some() {
                alias_for(row)
            } else {
                None
            };
        }
    }
    rows
}
