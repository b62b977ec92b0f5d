//! Predicate normalization and reference-set queries.
//!
//! [`to_cnf`] rewrites a boolean expression into conjunctive normal form by
//! pushing negations inward (De Morgan) and distributing OR over AND. Each
//! step strictly reduces either negation depth or the
//! disjunction-over-conjunction nesting, so the rewrite terminates, and a
//! second application is the identity.

use std::collections::HashSet;

use super::combinators::{and_pair, not, or_pair};
use super::{Expr, ExprId};

/// Conjunctive normal form of a boolean expression.
pub fn to_cnf(expr: &Expr) -> Expr {
    if let Some((left, right)) = expr.as_and() {
        return and_pair(to_cnf(left), to_cnf(right));
    }
    if let Some((left, right)) = expr.as_or() {
        return distribute_or(to_cnf(left), to_cnf(right));
    }
    if let Expr::Not(child) = expr {
        return negated_cnf(child);
    }
    expr.clone()
}

/// CNF of `NOT child`, pushing the negation inward.
fn negated_cnf(child: &Expr) -> Expr {
    if let Expr::Not(inner) = child {
        return to_cnf(inner);
    }
    if let Some((left, right)) = child.as_and() {
        return distribute_or(negated_cnf(left), negated_cnf(right));
    }
    if let Some((left, right)) = child.as_or() {
        return and_pair(negated_cnf(left), negated_cnf(right));
    }
    not(child.clone())
}

/// `left OR right` with OR distributed over any AND on either side. Both
/// inputs are already in CNF.
fn distribute_or(left: Expr, right: Expr) -> Expr {
    if let Some((a, b)) = left.as_and() {
        and_pair(
            distribute_or(a.clone(), right.clone()),
            distribute_or(b.clone(), right),
        )
    } else if let Some((c, d)) = right.as_and() {
        and_pair(
            distribute_or(left.clone(), c.clone()),
            distribute_or(left, d.clone()),
        )
    } else {
        or_pair(left, right)
    }
}

/// `true` iff the condition is in CNF: no OR has an AND beneath it.
pub fn is_cnf(expr: &Expr) -> bool {
    fn no_and_below_or(expr: &Expr, under_or: bool) -> bool {
        if expr.as_and().is_some() && under_or {
            return false;
        }
        let under_or = under_or || expr.as_or().is_some();
        match (expr.as_and(), expr.as_or()) {
            (Some((l, r)), _) | (_, Some((l, r))) => {
                no_and_below_or(l, under_or) && no_and_below_or(r, under_or)
            }
            _ => true,
        }
    }
    no_and_below_or(expr, false)
}

/// `true` iff every attribute the expression reads belongs to `ids`.
/// Comparison is by id, which makes alias renaming transparent.
pub fn references_subset(expr: &Expr, ids: &HashSet<ExprId>) -> bool {
    expr.references().is_subset(ids)
}
