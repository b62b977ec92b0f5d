//! Error types for the optimizer.

use thiserror::Error;

use crate::plan::errors::LogicalPlanError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OptimizerError {
    #[error("optimizer requires a resolved plan:\n{plan}")]
    UnresolvedPlan { plan: String },

    #[error(transparent)]
    Plan(#[from] LogicalPlanError),
}
