//! Constant folding passes.
//!
//! [`FoldConstants`] replaces every foldable subexpression with a literal of
//! its evaluated value, preserving type and nullability. [`FoldConstantFilters`]
//! then removes filters whose condition folded to a boolean constant: a TRUE
//! filter disappears, a FALSE filter collapses the subtree into a rows-empty
//! local relation carrying the same schema.

use std::sync::Arc;

use crate::expr::{evaluator, Expr, Literal};
use crate::plan::{Filter, LocalRelation, LogicalPlan};
use crate::tree::{Transformed, TreeNode};

use super::rules_executor::{OptimizerResult, Rule};
use super::transform_expressions;

pub struct FoldConstants;

impl Rule for FoldConstants {
    fn name(&self) -> &'static str {
        "FoldConstants"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(transform_expressions(plan, &|expr| {
            if matches!(expr, Expr::Literal(_)) || !expr.foldable() {
                return None;
            }
            let data_type = expr.data_type();
            match evaluator::eval(expr).and_then(|v| evaluator::cast_value(v, &data_type)) {
                Ok(value) => Some(Expr::Literal(Literal::new(value, data_type))),
                Err(e) => {
                    log::debug!("leaving `{}` unfolded: {}", expr, e);
                    None
                }
            }
        }))
    }
}

pub struct FoldConstantFilters;

impl Rule for FoldConstantFilters {
    fn name(&self) -> &'static str {
        "FoldConstantFilters"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(plan.transform_down(&|p: &Arc<LogicalPlan>| match p.as_ref() {
            LogicalPlan::Filter(Filter { input, predicate }) => {
                if predicate.is_true_literal() {
                    Some(input.clone())
                } else if predicate.is_false_literal() {
                    Some(Arc::new(LogicalPlan::LocalRelation(LocalRelation {
                        rows: vec![],
                        output: p.as_ref().output(),
                    })))
                } else {
                    None
                }
            }
            _ => None,
        }))
    }
}
