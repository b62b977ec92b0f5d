//! Rule-based plan optimizer.
//!
//! The optimizer is a single fixed-point batch of pure rewrite rules,
//! applied in a deliberate order: constant folding and boolean
//! simplification first expose shapes for the structural rules, CNF
//! conversion feeds the pushdown passes, and the reduction rules keep the
//! tree canonical between passes.
//!
//! The input must be a resolved plan (every reference bound by id, binary
//! operators with disjoint child ids); the output is an equivalent resolved
//! plan with the same output schema.

use std::sync::Arc;

use crate::expr::Expr;
use crate::plan::{map_expressions, LogicalPlan};
use crate::tree::{Transformed, TreeNode};

mod alias_reduction;
mod cast_reduction;
mod cnf_conversion;
mod constant_folding;
pub mod errors;
mod filter_push_down;
mod limit_push_down;
mod merge_filters;
mod merge_projects;
mod negation_reduction;
mod predicate_simplification;
mod reduce_limits;
pub mod rules_executor;
mod subquery_elimination;

pub use errors::OptimizerError;
pub use rules_executor::{Batch, EndCondition, OptimizerResult, Rule, RulesExecutor};

use alias_reduction::ReduceAliases;
use cast_reduction::ReduceCasts;
use cnf_conversion::CnfConversion;
use constant_folding::{FoldConstantFilters, FoldConstants};
use filter_push_down::{
    PushFiltersThroughAggregates, PushFiltersThroughJoins, PushFiltersThroughProjects,
};
use limit_push_down::{PushLimitsThroughUnions, PushProjectsThroughLimits};
use merge_filters::MergeFilters;
use merge_projects::MergeProjects;
use negation_reduction::ReduceNegations;
use predicate_simplification::{EliminateCommonPredicates, FoldLogicalPredicates};
use reduce_limits::ReduceLimits;
use subquery_elimination::EliminateSubqueries;

const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Rewrite every expression of every plan node bottom-up with a partial
/// rule, rebuilding only the nodes whose expressions changed.
pub(crate) fn transform_expressions<F>(
    plan: &Arc<LogicalPlan>,
    rule: &F,
) -> Transformed<Arc<LogicalPlan>>
where
    F: Fn(&Expr) -> Option<Expr>,
{
    plan.transform_up(&|p: &Arc<LogicalPlan>| {
        let tf = map_expressions(p, &mut |expr| expr.transform_up(rule));
        if tf.is_yes() {
            Some(tf.into_inner())
        } else {
            None
        }
    })
}

/// Top-down variant of [`transform_expressions`], for rules that must see an
/// enclosing shape before its operands are rewritten (negation reduction
/// inspects `AND(p, NOT p)` before the inner NOT flips away).
pub(crate) fn transform_expressions_down<F>(
    plan: &Arc<LogicalPlan>,
    rule: &F,
) -> Transformed<Arc<LogicalPlan>>
where
    F: Fn(&Expr) -> Option<Expr>,
{
    plan.transform_up(&|p: &Arc<LogicalPlan>| {
        let tf = map_expressions(p, &mut |expr| expr.transform_down(rule));
        if tf.is_yes() {
            Some(tf.into_inner())
        } else {
            None
        }
    })
}

pub struct Optimizer {
    executor: RulesExecutor,
}

impl Optimizer {
    pub fn new() -> Optimizer {
        Optimizer {
            executor: RulesExecutor::new(vec![Batch::fixed_point(
                "operator optimizations",
                DEFAULT_MAX_ITERATIONS,
                vec![
                    Box::new(FoldConstants),
                    Box::new(FoldConstantFilters),
                    Box::new(FoldLogicalPredicates),
                    Box::new(CnfConversion),
                    Box::new(EliminateCommonPredicates),
                    Box::new(ReduceAliases),
                    Box::new(ReduceCasts),
                    Box::new(MergeFilters),
                    Box::new(ReduceLimits),
                    Box::new(ReduceNegations),
                    Box::new(MergeProjects),
                    Box::new(EliminateSubqueries),
                    Box::new(PushFiltersThroughProjects),
                    Box::new(PushFiltersThroughJoins),
                    Box::new(PushFiltersThroughAggregates),
                    Box::new(PushProjectsThroughLimits),
                    Box::new(PushLimitsThroughUnions),
                ],
            )]),
        }
    }

    /// Optimize a resolved plan into an equivalent, cheaper one.
    pub fn optimize(&self, plan: Arc<LogicalPlan>) -> OptimizerResult<Arc<LogicalPlan>> {
        if !plan.resolved() {
            return Err(OptimizerError::UnresolvedPlan {
                plan: plan.to_string(),
            });
        }
        self.executor.execute(plan)
    }
}

impl Default for Optimizer {
    fn default() -> Optimizer {
        Optimizer::new()
    }
}
