//! Alias chain collapsing.
//!
//! `Alias(Alias(x, _), n)` keeps only the outermost name and id; the same
//! applies when a grouping or aggregation placeholder wraps a plain alias.

use std::sync::Arc;

use crate::expr::{AggregationAlias, Alias, Expr, GroupingAlias};
use crate::plan::LogicalPlan;
use crate::tree::Transformed;

use super::rules_executor::{OptimizerResult, Rule};
use super::transform_expressions;

pub struct ReduceAliases;

impl Rule for ReduceAliases {
    fn name(&self) -> &'static str {
        "ReduceAliases"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(transform_expressions(plan, &|expr| match expr {
            Expr::Alias(outer) => match &outer.child {
                Expr::Alias(inner) => Some(Expr::Alias(Box::new(Alias {
                    name: outer.name.clone(),
                    child: inner.child.clone(),
                    id: outer.id,
                }))),
                _ => None,
            },
            Expr::GroupingAlias(outer) => match &outer.child {
                Expr::Alias(inner) => Some(Expr::GroupingAlias(Box::new(GroupingAlias {
                    name: outer.name.clone(),
                    child: inner.child.clone(),
                    id: outer.id,
                }))),
                _ => None,
            },
            Expr::AggregationAlias(outer) => match &outer.child {
                Expr::Alias(inner) => Some(Expr::AggregationAlias(Box::new(AggregationAlias {
                    name: outer.name.clone(),
                    child: inner.child.clone(),
                    id: outer.id,
                }))),
                _ => None,
            },
            _ => None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::combinators::*;
    use crate::expr::AttributeRef;
    use crate::plan::{LocalRelation, Project};
    use crate::types::DataType;

    #[test]
    fn test_alias_chain_collapses_to_outer_name() {
        let attr = AttributeRef::new("a", DataType::Int, false);
        let inner = Alias::new(plus(Expr::Attribute(attr.clone()), lit_int(1)), "x");
        let outer = Alias::new(Expr::Alias(Box::new(inner.clone())), "y");
        let outer_id = outer.id;

        let plan = Arc::new(LogicalPlan::Project(Project {
            input: Arc::new(LogicalPlan::LocalRelation(LocalRelation {
                rows: vec![],
                output: vec![attr.clone()],
            })),
            items: vec![Expr::Alias(Box::new(outer))],
        }));

        let result = ReduceAliases.apply(&plan).unwrap();
        assert!(result.is_yes());
        match result.into_inner().as_ref() {
            LogicalPlan::Project(p) => match &p.items[0] {
                Expr::Alias(alias) => {
                    assert_eq!(alias.name, "y");
                    assert_eq!(alias.id, outer_id);
                    assert_eq!(alias.child, inner.child);
                }
                other => panic!("expected Alias, got {}", other),
            },
            other => panic!("expected Project, got {}", other),
        }
    }

    #[test]
    fn test_plain_alias_is_untouched() {
        let attr = AttributeRef::new("a", DataType::Int, false);
        let plan = Arc::new(LogicalPlan::Project(Project {
            input: Arc::new(LogicalPlan::LocalRelation(LocalRelation {
                rows: vec![],
                output: vec![attr.clone()],
            })),
            items: vec![Expr::Alias(Box::new(Alias::new(
                Expr::Attribute(attr),
                "x",
            )))],
        }));
        assert!(!ReduceAliases.apply(&plan).unwrap().is_yes());
    }
}
