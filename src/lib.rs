//! Quarry - logical core of a small relational query engine
//!
//! This crate provides the analytic half of a query engine:
//! - Immutable expression and logical-plan trees
//! - Expression type inference with implicit widening and nullability
//! - A generic tree-rewrite framework with structural sharing
//! - A rule-based optimizer run to fixed point
//!
//! A resolved logical plan goes in; an equivalent, cheaper resolved plan
//! comes out. Parsing, catalog resolution, and physical execution live in
//! the embedding engine.

pub mod utils;

pub mod expr;
pub mod optimizer;
pub mod plan;
pub mod tree;
pub mod types;

pub use optimizer::Optimizer;
pub use plan::LogicalPlan;
pub use tree::{Transformed, TreeNode};
pub use types::DataType;
