//! Strict typing: implicit widening and cast insertion.
//!
//! `strictly_typed` rewrites an expression so every operator sees operands
//! of the exact type it expects, inserting widening casts where the lattice
//! allows and failing with [`TypeMismatchError`] where it does not. An
//! expression is *well typed* iff the rewrite succeeds, and *strictly typed*
//! iff the rewrite is the identity.

use super::errors::TypeMismatchError;
use super::{
    AggregateFnCall, AggregateFunction, Alias, AggregationAlias, BinaryExpr, Cast, Expr,
    GroupingAlias, IfExpr, SortOrderExpr,
};
use crate::types::{widest, DataType};

/// `expr` if it already has type `target`, otherwise `CAST(expr AS target)`.
pub fn promote_data_type(expr: Expr, target: &DataType) -> Expr {
    if &expr.data_type() == target {
        expr
    } else {
        Expr::Cast(Box::new(Cast {
            child: expr,
            target: target.clone(),
        }))
    }
}

fn expect_numeric(expr: &Expr) -> Result<(), TypeMismatchError> {
    let actual = expr.data_type();
    if actual.is_numeric() {
        Ok(())
    } else {
        Err(TypeMismatchError::UnexpectedType {
            expr: expr.to_string(),
            actual: actual.sql_name(),
            expected: "a numeric type".to_string(),
        })
    }
}

fn expect_boolean(expr: &Expr) -> Result<(), TypeMismatchError> {
    let actual = expr.data_type();
    if actual == DataType::Boolean {
        Ok(())
    } else {
        Err(TypeMismatchError::UnexpectedType {
            expr: expr.to_string(),
            actual: actual.sql_name(),
            expected: "BOOLEAN".to_string(),
        })
    }
}

fn expect_ordered(expr: &Expr) -> Result<(), TypeMismatchError> {
    let actual = expr.data_type();
    if actual.is_ordered() {
        Ok(())
    } else {
        Err(TypeMismatchError::UnexpectedType {
            expr: expr.to_string(),
            actual: actual.sql_name(),
            expected: "an ordered type".to_string(),
        })
    }
}

impl Expr {
    /// A version of this expression with strictly typed children and any
    /// required implicit casts inserted, or the type mismatch that prevents
    /// one from existing.
    pub fn strictly_typed(&self) -> Result<Expr, TypeMismatchError> {
        match self {
            Expr::Literal(_) | Expr::Attribute(_) => Ok(self.clone()),

            Expr::Alias(alias) => Ok(Expr::Alias(Box::new(Alias {
                name: alias.name.clone(),
                child: alias.child.strictly_typed()?,
                id: alias.id,
            }))),

            // Casts always succeed at the type level; narrowing is
            // user-requested.
            Expr::Cast(cast) => Ok(Expr::Cast(Box::new(Cast {
                child: cast.child.strictly_typed()?,
                target: cast.target.clone(),
            }))),

            Expr::Binary(binary) => {
                let left = binary.left.strictly_typed()?;
                let right = binary.right.strictly_typed()?;
                if binary.op.is_arithmetic() {
                    expect_numeric(&left)?;
                    expect_numeric(&right)?;
                    let target = widest(&left.data_type(), &right.data_type())?;
                    Ok(Expr::Binary(Box::new(BinaryExpr {
                        op: binary.op,
                        left: promote_data_type(left, &target),
                        right: promote_data_type(right, &target),
                    })))
                } else if binary.op.is_comparison() {
                    let target = widest(&left.data_type(), &right.data_type())?;
                    if binary.op.requires_ordering() {
                        expect_ordered(&left)?;
                        expect_ordered(&right)?;
                    }
                    Ok(Expr::Binary(Box::new(BinaryExpr {
                        op: binary.op,
                        left: promote_data_type(left, &target),
                        right: promote_data_type(right, &target),
                    })))
                } else {
                    expect_boolean(&left)?;
                    expect_boolean(&right)?;
                    Ok(Expr::Binary(Box::new(BinaryExpr {
                        op: binary.op,
                        left,
                        right,
                    })))
                }
            }

            Expr::Negate(child) => {
                let child = child.strictly_typed()?;
                expect_numeric(&child)?;
                Ok(Expr::Negate(Box::new(child)))
            }

            Expr::Not(child) => {
                let child = child.strictly_typed()?;
                expect_boolean(&child)?;
                Ok(Expr::Not(Box::new(child)))
            }

            Expr::IsNull(child) => Ok(Expr::IsNull(Box::new(child.strictly_typed()?))),
            Expr::IsNotNull(child) => Ok(Expr::IsNotNull(Box::new(child.strictly_typed()?))),

            Expr::If(if_expr) => {
                let condition = if_expr.condition.strictly_typed()?;
                expect_boolean(&condition)?;
                let then_value = if_expr.then_value.strictly_typed()?;
                let else_value = if_expr.else_value.strictly_typed()?;
                let target = widest(&then_value.data_type(), &else_value.data_type())?;
                Ok(Expr::If(Box::new(IfExpr {
                    condition,
                    then_value: promote_data_type(then_value, &target),
                    else_value: promote_data_type(else_value, &target),
                })))
            }

            Expr::Coalesce(args) => {
                assert!(!args.is_empty(), "COALESCE requires at least one argument");
                let args: Vec<Expr> = args
                    .iter()
                    .map(|arg| arg.strictly_typed())
                    .collect::<Result<_, _>>()?;
                let mut target = args[0].data_type();
                for arg in &args[1..] {
                    target = widest(&target, &arg.data_type())?;
                }
                Ok(Expr::Coalesce(
                    args.into_iter()
                        .map(|arg| promote_data_type(arg, &target))
                        .collect(),
                ))
            }

            Expr::AggregateFunction(agg) => {
                let child = agg.child.strictly_typed()?;
                match agg.func {
                    AggregateFunction::Count => {}
                    AggregateFunction::Sum | AggregateFunction::Avg => expect_numeric(&child)?,
                    AggregateFunction::Min | AggregateFunction::Max => expect_ordered(&child)?,
                }
                Ok(Expr::AggregateFunction(Box::new(AggregateFnCall {
                    func: agg.func,
                    child,
                })))
            }

            Expr::GroupingAlias(alias) => Ok(Expr::GroupingAlias(Box::new(GroupingAlias {
                name: alias.name.clone(),
                child: alias.child.strictly_typed()?,
                id: alias.id,
            }))),

            Expr::AggregationAlias(alias) => {
                Ok(Expr::AggregationAlias(Box::new(AggregationAlias {
                    name: alias.name.clone(),
                    child: alias.child.strictly_typed()?,
                    id: alias.id,
                })))
            }

            Expr::SortOrder(order) => Ok(Expr::SortOrder(Box::new(SortOrderExpr {
                child: order.child.strictly_typed()?,
                direction: order.direction,
            }))),
        }
    }

    /// The strictly typed rewrite exists.
    pub fn well_typed(&self) -> bool {
        self.strictly_typed().is_ok()
    }

    /// The strictly typed rewrite exists and is this expression itself: no
    /// further implicit cast insertion is needed.
    pub fn is_strictly_typed(&self) -> bool {
        matches!(self.strictly_typed(), Ok(typed) if typed == *self)
    }
}
