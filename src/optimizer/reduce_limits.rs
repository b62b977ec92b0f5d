//! Nested limit reduction.
//!
//! `Limit(Limit(p, n), m)` becomes `Limit(p, IF(n < m, n, m))`. Both counts
//! are foldable, so FoldConstants turns the IF into the actual minimum on
//! the next pass.

use std::sync::Arc;

use crate::expr::combinators::{if_expr, lt};
use crate::plan::{Limit, LogicalPlan};
use crate::tree::{Transformed, TreeNode};

use super::rules_executor::{OptimizerResult, Rule};

pub struct ReduceLimits;

impl Rule for ReduceLimits {
    fn name(&self) -> &'static str {
        "ReduceLimits"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(plan.transform_down(&|p: &Arc<LogicalPlan>| match p.as_ref() {
            LogicalPlan::Limit(outer) => match outer.input.as_ref() {
                LogicalPlan::Limit(inner) => {
                    let n = inner.count.clone();
                    let m = outer.count.clone();
                    Some(Arc::new(LogicalPlan::Limit(Limit {
                        input: inner.input.clone(),
                        count: if_expr(lt(n.clone(), m.clone()), n, m),
                    })))
                }
                _ => None,
            },
            _ => None,
        }))
    }
}
