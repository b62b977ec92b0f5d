//! Scoping-node elimination.
//!
//! Drops `Subquery` wrappers and `With` CTE wrappers (references were
//! substituted during resolution) and strips qualifiers from attribute
//! references so the remaining tree carries bare columns.

use std::sync::Arc;

use crate::expr::{AttributeRef, Expr};
use crate::plan::LogicalPlan;
use crate::tree::{Transformed, TreeNode};

use super::rules_executor::{OptimizerResult, Rule};
use super::transform_expressions;

pub struct EliminateSubqueries;

impl Rule for EliminateSubqueries {
    fn name(&self) -> &'static str {
        "EliminateSubqueries"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        let unwrapped = plan.transform_up(&|p: &Arc<LogicalPlan>| match p.as_ref() {
            LogicalPlan::Subquery(subquery) => Some(subquery.input.clone()),
            LogicalPlan::With(with) => Some(with.input.clone()),
            _ => None,
        });
        let unwrapped_changed = unwrapped.is_yes();
        let stripped = transform_expressions(&unwrapped.into_inner(), &|expr| match expr {
            Expr::Attribute(attr) if attr.qualifier.is_some() => {
                Some(Expr::Attribute(AttributeRef {
                    qualifier: None,
                    ..attr.clone()
                }))
            }
            _ => None,
        });
        Ok(if unwrapped_changed || stripped.is_yes() {
            Transformed::Yes(stripped.into_inner())
        } else {
            Transformed::No(plan.clone())
        })
    }
}
