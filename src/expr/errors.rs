//! Error types for expression typing and plan-time evaluation.

use thiserror::Error;

/// Strict typing failed: an operand cannot be reconciled with what its
/// operator expects.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeMismatchError {
    #[error("cannot reconcile {left} with {right} on the widening lattice")]
    Incomparable { left: String, right: String },

    #[error("expression `{expr}` has type {actual}, expected {expected}")]
    UnexpectedType {
        expr: String,
        actual: String,
        expected: String,
    },
}

/// Plan-time evaluation failed. Evaluation is only defined for foldable
/// expressions; everything else is reported, not panicked on, so the
/// constant folder can leave the expression in place.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("expression `{0}` is not foldable")]
    NotFoldable(String),

    #[error("arithmetic overflow evaluating `{0}`")]
    ArithmeticOverflow(String),

    #[error("cannot cast {value} to {target}")]
    InvalidCast { value: String, target: String },
}
