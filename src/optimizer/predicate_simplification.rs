//! Boolean-algebra simplification passes.
//!
//! [`FoldLogicalPredicates`] applies the absorbing and identity elements of
//! AND/OR, cancels constant negations, and short-circuits IF on a constant
//! condition. [`EliminateCommonPredicates`] removes structurally duplicated
//! operands of AND/OR and collapses IF branches that agree.
//!
//! All identities here are sound under three-valued logic: `x AND x = x`
//! relies on both operands being the same expression, and `IF(c, v, v)` is
//! only collapsed when the condition cannot be null (a null condition must
//! produce null, which plain `v` would not preserve).

use std::sync::Arc;

use crate::expr::combinators::{false_lit, true_lit};
use crate::expr::Expr;
use crate::plan::LogicalPlan;
use crate::tree::Transformed;

use super::rules_executor::{OptimizerResult, Rule};
use super::transform_expressions;

pub struct FoldLogicalPredicates;

impl Rule for FoldLogicalPredicates {
    fn name(&self) -> &'static str {
        "FoldLogicalPredicates"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(transform_expressions(plan, &|expr| {
            if let Some((left, right)) = expr.as_and() {
                if left.is_false_literal() || right.is_false_literal() {
                    return Some(false_lit());
                }
                if left.is_true_literal() {
                    return Some(right.clone());
                }
                if right.is_true_literal() {
                    return Some(left.clone());
                }
                if left == right {
                    return Some(left.clone());
                }
                return None;
            }
            if let Some((left, right)) = expr.as_or() {
                if left.is_true_literal() || right.is_true_literal() {
                    return Some(true_lit());
                }
                if left.is_false_literal() {
                    return Some(right.clone());
                }
                if right.is_false_literal() {
                    return Some(left.clone());
                }
                if left == right {
                    return Some(left.clone());
                }
                return None;
            }
            match expr {
                Expr::Not(child) if child.is_true_literal() => Some(false_lit()),
                Expr::Not(child) if child.is_false_literal() => Some(true_lit()),
                Expr::If(if_expr) if if_expr.condition.is_true_literal() => {
                    Some(if_expr.then_value.clone())
                }
                Expr::If(if_expr) if if_expr.condition.is_false_literal() => {
                    Some(if_expr.else_value.clone())
                }
                _ => None,
            }
        }))
    }
}

pub struct EliminateCommonPredicates;

impl Rule for EliminateCommonPredicates {
    fn name(&self) -> &'static str {
        "EliminateCommonPredicates"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(transform_expressions(plan, &|expr| {
            if let Some((left, right)) = expr.as_and() {
                if left == right {
                    return Some(left.clone());
                }
                return None;
            }
            if let Some((left, right)) = expr.as_or() {
                if left == right {
                    return Some(left.clone());
                }
                return None;
            }
            match expr {
                Expr::If(if_expr)
                    if if_expr.then_value == if_expr.else_value
                        && !if_expr.condition.nullable() =>
                {
                    Some(if_expr.then_value.clone())
                }
                _ => None,
            }
        }))
    }
}
