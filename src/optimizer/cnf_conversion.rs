//! CNF conversion for filter conditions.
//!
//! Rewrites every `Filter` condition into conjunctive normal form so that
//! the pushdown passes can split it into independent conjuncts. Plans other
//! than filters keep their predicate shapes.

use std::sync::Arc;

use crate::expr::predicates::to_cnf;
use crate::plan::{Filter, LogicalPlan};
use crate::tree::{Transformed, TreeNode};

use super::rules_executor::{OptimizerResult, Rule};

pub struct CnfConversion;

impl Rule for CnfConversion {
    fn name(&self) -> &'static str {
        "CNFConversion"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(plan.transform_down(&|p: &Arc<LogicalPlan>| match p.as_ref() {
            LogicalPlan::Filter(filter) => {
                let normalized = to_cnf(&filter.predicate);
                if normalized == filter.predicate {
                    None
                } else {
                    Some(Arc::new(LogicalPlan::Filter(Filter {
                        input: filter.input.clone(),
                        predicate: normalized,
                    })))
                }
            }
            _ => None,
        }))
    }
}
