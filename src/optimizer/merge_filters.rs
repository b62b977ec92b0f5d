//! Adjacent filter merging.
//!
//! `Filter(Filter(p, a), b)` becomes `Filter(p, a AND b)`. Deeper stacks
//! collapse over successive passes of the batch.

use std::sync::Arc;

use crate::expr::combinators::and_pair;
use crate::plan::{Filter, LogicalPlan};
use crate::tree::{Transformed, TreeNode};

use super::rules_executor::{OptimizerResult, Rule};

pub struct MergeFilters;

impl Rule for MergeFilters {
    fn name(&self) -> &'static str {
        "MergeFilters"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(plan.transform_down(&|p: &Arc<LogicalPlan>| match p.as_ref() {
            LogicalPlan::Filter(outer) => match outer.input.as_ref() {
                LogicalPlan::Filter(inner) => Some(Arc::new(LogicalPlan::Filter(Filter {
                    input: inner.input.clone(),
                    predicate: and_pair(inner.predicate.clone(), outer.predicate.clone()),
                }))),
                _ => None,
            },
            _ => None,
        }))
    }
}
