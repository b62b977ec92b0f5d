//! Projection merging and identity-projection elimination.
//!
//! Adjacent projections collapse by inlining the inner list's alias
//! definitions into the outer list by id. A projection that reproduces its
//! child's output (same attributes, same order, by id and name) disappears.

use std::collections::HashMap;
use std::sync::Arc;

use crate::expr::{Alias, Expr, ExprId};
use crate::plan::{LogicalPlan, Project};
use crate::tree::{Transformed, TreeNode};

use super::rules_executor::{OptimizerResult, Rule};

pub struct MergeProjects;

/// `id -> defining expression` for a project list, or `None` if an item is
/// not name-bearing or not pure.
pub(crate) fn alias_map(items: &[Expr]) -> Option<HashMap<ExprId, Expr>> {
    items
        .iter()
        .map(|item| {
            if !item.is_pure() {
                return None;
            }
            match item {
                Expr::Attribute(attr) => Some((attr.id, item.clone())),
                Expr::Alias(alias) => Some((alias.id, alias.child.clone())),
                Expr::GroupingAlias(alias) => Some((alias.id, alias.child.clone())),
                Expr::AggregationAlias(alias) => Some((alias.id, alias.child.clone())),
                _ => None,
            }
        })
        .collect()
}

/// Substitute attribute references by id with their defining expressions.
pub(crate) fn inline_expr(expr: &Expr, definitions: &HashMap<ExprId, Expr>) -> Expr {
    expr.transform_up(&|e| match e {
        Expr::Attribute(attr) => definitions.get(&attr.id).cloned(),
        _ => None,
    })
    .into_inner()
}

/// Inline a top-level project item, preserving its output name and id.
fn inline_item(item: &Expr, definitions: &HashMap<ExprId, Expr>) -> Expr {
    match item {
        Expr::Attribute(attr) => match definitions.get(&attr.id) {
            Some(Expr::Attribute(inner)) if inner.id == attr.id => {
                Expr::Attribute(inner.clone())
            }
            Some(replacement) => Expr::Alias(Box::new(Alias {
                name: attr.name.clone(),
                child: replacement.clone(),
                id: attr.id,
            })),
            None => item.clone(),
        },
        _ => inline_expr(item, definitions),
    }
}

fn reproduces_child_output(items: &[Expr], child: &LogicalPlan) -> bool {
    let output = match child.try_output() {
        Ok(output) => output,
        Err(_) => return false,
    };
    items.len() == output.len()
        && items.iter().zip(output.iter()).all(|(item, attr)| {
            matches!(item, Expr::Attribute(a) if a.id == attr.id && a.name == attr.name)
        })
}

impl Rule for MergeProjects {
    fn name(&self) -> &'static str {
        "MergeProjects"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(plan.transform_down(&|p: &Arc<LogicalPlan>| match p.as_ref() {
            LogicalPlan::Project(outer) => {
                if reproduces_child_output(&outer.items, &outer.input) {
                    return Some(outer.input.clone());
                }
                match outer.input.as_ref() {
                    LogicalPlan::Project(inner) => {
                        let definitions = alias_map(&inner.items)?;
                        let items = outer
                            .items
                            .iter()
                            .map(|item| inline_item(item, &definitions))
                            .collect();
                        Some(Arc::new(LogicalPlan::Project(Project {
                            input: inner.input.clone(),
                            items,
                        })))
                    }
                    _ => None,
                }
            }
            _ => None,
        }))
    }
}
