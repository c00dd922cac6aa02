//! Group mapping rows by target and classify each group.
//!
//! # Architecture
//!
//! ```text
//! Mapping rows (flat)                       →  Groups (first-seen order)
//! ┌──────────────────────────────────────┐    ┌───────────────────────────┐
//! │ #0 tgt.items   array  src.a          │    │ (tgt, items) [#0, #2]     │
//! │ #1 tgt.cust_id string src.customer_id│ →  │   → Aggregate             │
//! │ #2 tgt.items   array  src.b          │    ├───────────────────────────┤
//! └──────────────────────────────────────┘    │ (tgt, cust_id) [#1]       │
//!                                             │   → Scalar                │
//!                                             └───────────────────────────┘
//! ```
//!
//! Rows with a blank `target_table` or `target_column` group under the
//! shared absent key; nothing is flagged.

use std::collections::HashMap;

use crate::models::MappingRow;

/// Grouping key: `(target_table, target_column)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub target_table: Option<String>,
    pub target_column: Option<String>,
}

impl GroupKey {
    fn of(row: &MappingRow) -> Self {
        Self {
            target_table: row.target_table.clone(),
            target_column: row.target_column.clone(),
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}",
            self.target_table.as_deref().unwrap_or("<none>"),
            self.target_column.as_deref().unwrap_or("<none>")
        )
    }
}

/// How a group is turned into expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Array target fed by several rows: one combined expression.
    Aggregate,
    /// Each row yields its own expression.
    Scalar,
}

/// Rows sharing a `(target_table, target_column)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: GroupKey,
    /// Indices into the row set, in original row order.
    pub members: Vec<usize>,
}

impl Group {
    /// Index of the first row of the group.
    pub fn first(&self) -> usize {
        self.members[0]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Classify the group.
    ///
    /// The first row's `target_data_type` decides. A single-row array group
    /// is [`Shape::Scalar`].
    pub fn shape(&self, rows: &[MappingRow]) -> Shape {
        if rows[self.first()].target_is_array() && self.len() > 1 {
            Shape::Aggregate
        } else {
            Shape::Scalar
        }
    }

    /// Member rows, in order.
    pub fn rows<'a>(&'a self, rows: &'a [MappingRow]) -> impl Iterator<Item = &'a MappingRow> + 'a {
        self.members.iter().map(move |&i| &rows[i])
    }
}

/// Group rows by `(target_table, target_column)`.
///
/// Groups come out in first-seen order of their key; every row belongs to
/// exactly one group.
pub fn group_rows(rows: &[MappingRow]) -> Vec<Group> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let key = GroupKey::of(row);
        match index.get(&key) {
            Some(&g) => groups[g].members.push(i),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    members: vec![i],
                });
            }
        }
    }

    groups
}
