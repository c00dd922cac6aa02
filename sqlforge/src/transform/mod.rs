//! Transformation module.
//!
//! Mapping rows to SQL expressions:
//! - Alias: exploded-array alias derivation
//! - Grouper: rows by target column, Aggregate vs Scalar
//! - Rewrite: sibling sub-column qualification
//! - Synthesis: per-group plan and reply cleanup
//! - Pipeline: main conversion pipeline

pub mod alias;
pub mod grouper;
pub mod pipeline;
pub mod rewrite;
pub mod synthesis;

pub use alias::{alias_name, assign_aliases};
pub use grouper::{group_rows, Group, GroupKey, Shape};
pub use pipeline::*;
pub use rewrite::rewrite_transformation;
pub use synthesis::{clean_reply, finish_reply, plan_group, GenerationRequest, Step};
