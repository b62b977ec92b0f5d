//! Negation reduction.
//!
//! De Morgan plus comparison flips: double negations cancel, negated
//! comparisons flip their operator, negated null checks invert, a negated
//! IF condition swaps the branches, and a conjunction or disjunction of a
//! predicate with its own negation collapses to a constant when the operand
//! matches structurally.

use std::sync::Arc;

use crate::expr::combinators::{and_pair, false_lit, not, or_pair, true_lit};
use crate::expr::{BinaryExpr, Expr, IfExpr};
use crate::plan::LogicalPlan;
use crate::tree::Transformed;

use super::rules_executor::{OptimizerResult, Rule};
use super::transform_expressions_down;

pub struct ReduceNegations;

/// `true` iff one operand is the structural negation of the other.
fn complements(a: &Expr, b: &Expr) -> bool {
    matches!(a, Expr::Not(inner) if inner.as_ref() == b)
        || matches!(b, Expr::Not(inner) if inner.as_ref() == a)
}

impl Rule for ReduceNegations {
    fn name(&self) -> &'static str {
        "ReduceNegations"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        // Top-down: the contradiction and tautology checks must see the
        // enclosing AND/OR before the inner NOT is flipped away.
        Ok(transform_expressions_down(plan, &|expr| {
            if let Expr::Not(child) = expr {
                return match child.as_ref() {
                    Expr::Not(inner) => Some(inner.as_ref().clone()),
                    Expr::Binary(binary) => {
                        if let Some(flipped) = binary.op.negated() {
                            Some(Expr::Binary(Box::new(BinaryExpr {
                                op: flipped,
                                left: binary.left.clone(),
                                right: binary.right.clone(),
                            })))
                        } else if let Some((left, right)) = child.as_and() {
                            Some(or_pair(not(left.clone()), not(right.clone())))
                        } else if let Some((left, right)) = child.as_or() {
                            Some(and_pair(not(left.clone()), not(right.clone())))
                        } else {
                            None
                        }
                    }
                    Expr::IsNull(inner) => Some(Expr::IsNotNull(inner.clone())),
                    Expr::IsNotNull(inner) => Some(Expr::IsNull(inner.clone())),
                    _ => None,
                };
            }
            if let Some((left, right)) = expr.as_and() {
                if complements(left, right) {
                    return Some(false_lit());
                }
                return None;
            }
            if let Some((left, right)) = expr.as_or() {
                if complements(left, right) {
                    return Some(true_lit());
                }
                return None;
            }
            match expr {
                Expr::If(if_expr) => match &if_expr.condition {
                    Expr::Not(inner) => Some(Expr::If(Box::new(IfExpr {
                        condition: inner.as_ref().clone(),
                        then_value: if_expr.else_value.clone(),
                        else_value: if_expr.then_value.clone(),
                    }))),
                    _ => None,
                },
                _ => None,
            }
        }))
    }
}
