//! Error types for logical plan construction and strict typing.

use thiserror::Error;

use crate::expr::errors::TypeMismatchError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LogicalPlanError {
    #[error("operation requires a resolved plan: {reason}")]
    Unresolved { reason: String },

    #[error("project list must not be empty")]
    EmptyProjectList,

    #[error("expression `{0}` cannot supply an output attribute")]
    NotNamed(String),

    #[error("set operator branches differ in arity: {left} vs {right} columns")]
    SetOpArityMismatch { left: usize, right: usize },
}

/// Strict typing failed at the plan level.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeCheckError {
    #[error(transparent)]
    Expr(#[from] TypeMismatchError),

    #[error(transparent)]
    Plan(#[from] LogicalPlanError),

    #[error("filter predicate `{predicate}` must be BOOLEAN, found {actual}")]
    NonBooleanPredicate { predicate: String, actual: String },

    #[error("join condition `{condition}` must be BOOLEAN, found {actual}")]
    NonBooleanJoinCondition { condition: String, actual: String },

    #[error("limit count `{count}` must be a foldable integral expression")]
    NonIntegralLimit { count: String },

    #[error("set operator column {index} is `{left}` on the left and `{right}` on the right; names must align")]
    SetOpNameMismatch {
        index: usize,
        left: String,
        right: String,
    },
}
