//! Filter pushdown passes.
//!
//! Moves predicates closer to their data sources so rows are eliminated
//! earlier:
//!
//! - [`PushFiltersThroughProjects`] inlines project-list aliases into the
//!   condition and swaps the two operators.
//! - [`PushFiltersThroughJoins`] splits an inner join's filter into
//!   conjuncts and routes each to the side whose output covers its
//!   reference set; the remainder joins the ON condition.
//! - [`PushFiltersThroughAggregates`] pushes conjuncts that touch no
//!   aggregate output below the aggregation, expanding grouping aliases
//!   back to the underlying expressions.
//!
//! All routing is by attribute id, which makes alias renaming transparent.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::expr::combinators::{and, split_conjunction};
use crate::expr::predicates::to_cnf;
use crate::expr::{Expr, ExprId};
use crate::plan::{Aggregate, Filter, Join, JoinType, LogicalPlan, Project};
use crate::tree::{Transformed, TreeNode};

use super::merge_projects::{alias_map, inline_expr};
use super::rules_executor::{OptimizerResult, Rule};

pub struct PushFiltersThroughProjects;

impl Rule for PushFiltersThroughProjects {
    fn name(&self) -> &'static str {
        "PushFiltersThroughProjects"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(plan.transform_down(&|p: &Arc<LogicalPlan>| match p.as_ref() {
            LogicalPlan::Filter(filter) => match filter.input.as_ref() {
                LogicalPlan::Project(project) => {
                    let definitions = alias_map(&project.items)?;
                    let pushed = inline_expr(&filter.predicate, &definitions);
                    Some(Arc::new(LogicalPlan::Project(Project {
                        input: Arc::new(LogicalPlan::Filter(Filter {
                            input: project.input.clone(),
                            predicate: pushed,
                        })),
                        items: project.items.clone(),
                    })))
                }
                _ => None,
            },
            _ => None,
        }))
    }
}

pub struct PushFiltersThroughJoins;

fn output_ids(plan: &LogicalPlan) -> HashSet<ExprId> {
    plan.output().into_iter().map(|a| a.id).collect()
}

impl Rule for PushFiltersThroughJoins {
    fn name(&self) -> &'static str {
        "PushFiltersThroughJoins"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(plan.transform_down(&|p: &Arc<LogicalPlan>| match p.as_ref() {
            LogicalPlan::Filter(filter) => match filter.input.as_ref() {
                LogicalPlan::Join(join) if join.join_type == JoinType::Inner => {
                    if !filter.predicate.is_pure() {
                        return None;
                    }
                    let left_ids = output_ids(&join.left);
                    let right_ids = output_ids(&join.right);

                    let mut left_only = vec![];
                    let mut right_only = vec![];
                    let mut remainder = vec![];
                    for conjunct in split_conjunction(&filter.predicate) {
                        let refs = conjunct.references();
                        if refs.is_subset(&left_ids) {
                            left_only.push(conjunct);
                        } else if refs.is_subset(&right_ids) {
                            right_only.push(conjunct);
                        } else {
                            remainder.push(conjunct);
                        }
                    }

                    let attach = |side: &Arc<LogicalPlan>, predicates: Vec<Expr>| match and(
                        predicates,
                    ) {
                        Some(predicate) => Arc::new(LogicalPlan::Filter(Filter {
                            input: side.clone(),
                            predicate,
                        })),
                        None => side.clone(),
                    };

                    let condition =
                        and(join.condition.iter().cloned().chain(remainder).collect());
                    Some(Arc::new(LogicalPlan::Join(Join {
                        left: attach(&join.left, left_only),
                        right: attach(&join.right, right_only),
                        join_type: JoinType::Inner,
                        condition,
                    })))
                }
                _ => None,
            },
            _ => None,
        }))
    }
}

pub struct PushFiltersThroughAggregates;

impl Rule for PushFiltersThroughAggregates {
    fn name(&self) -> &'static str {
        "PushFiltersThroughAggregates"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(plan.transform_down(&|p: &Arc<LogicalPlan>| match p.as_ref() {
            LogicalPlan::Filter(filter) => match filter.input.as_ref() {
                LogicalPlan::Aggregate(agg) => {
                    if !agg.functions.iter().all(|f| f.is_pure()) {
                        return None;
                    }
                    let aggregate_ids: HashSet<ExprId> = agg
                        .functions
                        .iter()
                        .filter_map(|f| f.to_attribute())
                        .map(|a| a.id)
                        .collect();
                    let grouping: HashMap<ExprId, Expr> = agg
                        .keys
                        .iter()
                        .filter_map(|key| match key {
                            Expr::GroupingAlias(alias) => Some((alias.id, alias.child.clone())),
                            _ => key.to_attribute().map(|a| (a.id, key.clone())),
                        })
                        .collect();

                    let mut pushable = vec![];
                    let mut kept = vec![];
                    for conjunct in split_conjunction(&to_cnf(&filter.predicate)) {
                        if conjunct.references().is_disjoint(&aggregate_ids) {
                            pushable.push(inline_expr(&conjunct, &grouping));
                        } else {
                            kept.push(conjunct);
                        }
                    }
                    if pushable.is_empty() {
                        return None;
                    }

                    let below = Arc::new(LogicalPlan::Filter(Filter {
                        input: agg.input.clone(),
                        predicate: and(pushable).expect("pushable is non-empty"),
                    }));
                    let aggregate = Arc::new(LogicalPlan::Aggregate(Aggregate {
                        input: below,
                        keys: agg.keys.clone(),
                        functions: agg.functions.clone(),
                    }));
                    Some(match and(kept) {
                        Some(predicate) => Arc::new(LogicalPlan::Filter(Filter {
                            input: aggregate,
                            predicate,
                        })),
                        None => aggregate,
                    })
                }
                _ => None,
            },
            _ => None,
        }))
    }
}
