//! Predicate and literal builders for [`Expr`].
//!
//! Helper functions for combining predicates with boolean operators and for
//! constructing common expression shapes. These eliminate duplicate
//! construction code across the optimizer rules.
//!
//! # Example
//! ```ignore
//! let predicates = vec![pred1, pred2, pred3];
//! let combined = and(predicates);  // Some(pred1 AND pred2 AND pred3)
//! ```

use super::{BinaryExpr, BinaryOperator, Cast, Expr, IfExpr, Literal, Value};
use crate::types::DataType;

/// Combine predicates with AND.
///
/// - Empty vec → None
/// - Single predicate → Some(predicate)
/// - Multiple → Some(pred1 AND pred2 AND ...)
pub fn and(predicates: Vec<Expr>) -> Option<Expr> {
    combine_predicates(predicates, BinaryOperator::And)
}

/// Combine predicates with OR.
pub fn or(predicates: Vec<Expr>) -> Option<Expr> {
    combine_predicates(predicates, BinaryOperator::Or)
}

fn combine_predicates(predicates: Vec<Expr>, op: BinaryOperator) -> Option<Expr> {
    let mut iter = predicates.into_iter();
    let first = iter.next()?;
    Some(iter.fold(first, |acc, pred| binary(op, acc, pred)))
}

/// Flatten nested ANDs into a flat conjunct list:
/// `(a AND (b AND c))` → `[a, b, c]`.
pub fn split_conjunction(expr: &Expr) -> Vec<Expr> {
    flatten_binary(expr, BinaryOperator::And)
}

/// Flatten nested ORs into a flat disjunct list.
pub fn split_disjunction(expr: &Expr) -> Vec<Expr> {
    flatten_binary(expr, BinaryOperator::Or)
}

fn flatten_binary(expr: &Expr, op: BinaryOperator) -> Vec<Expr> {
    match expr {
        Expr::Binary(binary) if binary.op == op => {
            let mut out = flatten_binary(&binary.left, op);
            out.extend(flatten_binary(&binary.right, op));
            out
        }
        other => vec![other.clone()],
    }
}

pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    Expr::Binary(Box::new(BinaryExpr { op, left, right }))
}

pub fn and_pair(left: Expr, right: Expr) -> Expr {
    binary(BinaryOperator::And, left, right)
}

pub fn or_pair(left: Expr, right: Expr) -> Expr {
    binary(BinaryOperator::Or, left, right)
}

pub fn not(expr: Expr) -> Expr {
    Expr::Not(Box::new(expr))
}

pub fn eq(left: Expr, right: Expr) -> Expr {
    binary(BinaryOperator::Eq, left, right)
}

pub fn neq(left: Expr, right: Expr) -> Expr {
    binary(BinaryOperator::NotEq, left, right)
}

pub fn lt(left: Expr, right: Expr) -> Expr {
    binary(BinaryOperator::Lt, left, right)
}

pub fn lt_eq(left: Expr, right: Expr) -> Expr {
    binary(BinaryOperator::LtEq, left, right)
}

pub fn gt(left: Expr, right: Expr) -> Expr {
    binary(BinaryOperator::Gt, left, right)
}

pub fn gt_eq(left: Expr, right: Expr) -> Expr {
    binary(BinaryOperator::GtEq, left, right)
}

pub fn plus(left: Expr, right: Expr) -> Expr {
    binary(BinaryOperator::Plus, left, right)
}

pub fn minus(left: Expr, right: Expr) -> Expr {
    binary(BinaryOperator::Minus, left, right)
}

pub fn multiply(left: Expr, right: Expr) -> Expr {
    binary(BinaryOperator::Multiply, left, right)
}

pub fn divide(left: Expr, right: Expr) -> Expr {
    binary(BinaryOperator::Divide, left, right)
}

pub fn is_null(expr: Expr) -> Expr {
    Expr::IsNull(Box::new(expr))
}

pub fn is_not_null(expr: Expr) -> Expr {
    Expr::IsNotNull(Box::new(expr))
}

pub fn if_expr(condition: Expr, then_value: Expr, else_value: Expr) -> Expr {
    Expr::If(Box::new(IfExpr {
        condition,
        then_value,
        else_value,
    }))
}

pub fn cast(child: Expr, target: DataType) -> Expr {
    Expr::Cast(Box::new(Cast { child, target }))
}

pub fn true_lit() -> Expr {
    Expr::Literal(Literal::new(Value::Boolean(true), DataType::Boolean))
}

pub fn false_lit() -> Expr {
    Expr::Literal(Literal::new(Value::Boolean(false), DataType::Boolean))
}

pub fn lit_bool(value: bool) -> Expr {
    Expr::Literal(Literal::new(Value::Boolean(value), DataType::Boolean))
}

pub fn lit_int(value: i32) -> Expr {
    Expr::Literal(Literal::new(Value::Int(value), DataType::Int))
}

pub fn lit_long(value: i64) -> Expr {
    Expr::Literal(Literal::new(Value::Long(value), DataType::Long))
}

pub fn lit_double(value: f64) -> Expr {
    Expr::Literal(Literal::new(Value::Double(value), DataType::Double))
}

pub fn lit_string(value: impl Into<String>) -> Expr {
    Expr::Literal(Literal::new(Value::String(value.into()), DataType::String))
}

/// A typed null literal.
pub fn null_lit(data_type: DataType) -> Expr {
    Expr::Literal(Literal::new(Value::Null, data_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_empty() {
        assert!(and(vec![]).is_none());
    }

    #[test]
    fn test_and_single() {
        let pred = true_lit();
        assert_eq!(and(vec![pred.clone()]), Some(pred));
    }

    #[test]
    fn test_and_multiple_left_associates() {
        let combined = and(vec![lit_bool(true), lit_bool(false), lit_bool(true)]).unwrap();
        assert_eq!(
            combined,
            and_pair(and_pair(lit_bool(true), lit_bool(false)), lit_bool(true))
        );
    }

    #[test]
    fn test_split_conjunction_flattens_nesting() {
        let expr = and_pair(lit_int(1), and_pair(lit_int(2), lit_int(3)));
        assert_eq!(
            split_conjunction(&expr),
            vec![lit_int(1), lit_int(2), lit_int(3)]
        );
    }

    #[test]
    fn test_split_conjunction_leaves_or_alone() {
        let expr = or_pair(lit_bool(true), lit_bool(false));
        assert_eq!(split_conjunction(&expr), vec![expr.clone()]);
        assert_eq!(
            split_disjunction(&expr),
            vec![lit_bool(true), lit_bool(false)]
        );
    }
}
