//! Plan-time evaluation of foldable expressions.
//!
//! The constant folder calls [`eval`] on foldable subtrees and replaces them
//! with literals. Evaluation follows SQL three-valued logic: comparisons and
//! arithmetic propagate null, AND/OR short-circuit around it, and division
//! by zero yields null. Integral overflow is reported as an error rather
//! than wrapped, so the folder leaves such expressions in place.

use super::errors::EvalError;
use super::{BinaryOperator, Expr, Value};
use crate::types::DataType;

/// Evaluate a foldable expression to a value.
pub fn eval(expr: &Expr) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(lit) => Ok(lit.value.clone()),

        Expr::Cast(cast) => {
            let value = eval(&cast.child)?;
            cast_value(value, &cast.target)
        }

        Expr::Binary(binary) => {
            let left = eval(&binary.left)?;
            let right = eval(&binary.right)?;
            match binary.op {
                BinaryOperator::And => Ok(eval_and(left, right)),
                BinaryOperator::Or => Ok(eval_or(left, right)),
                op if op.is_comparison() => eval_comparison(op, left, right),
                op => eval_arithmetic(op, left, right, expr),
            }
        }

        Expr::Negate(child) => match eval(child)? {
            Value::Null => Ok(Value::Null),
            Value::Byte(v) => v
                .checked_neg()
                .map(Value::Byte)
                .ok_or_else(|| EvalError::ArithmeticOverflow(expr.to_string())),
            Value::Short(v) => v
                .checked_neg()
                .map(Value::Short)
                .ok_or_else(|| EvalError::ArithmeticOverflow(expr.to_string())),
            Value::Int(v) => v
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EvalError::ArithmeticOverflow(expr.to_string())),
            Value::Long(v) => v
                .checked_neg()
                .map(Value::Long)
                .ok_or_else(|| EvalError::ArithmeticOverflow(expr.to_string())),
            Value::Float(v) => Ok(Value::Float(-v)),
            Value::Double(v) => Ok(Value::Double(-v)),
            _ => Err(EvalError::NotFoldable(expr.to_string())),
        },

        Expr::Not(child) => match eval(child)? {
            Value::Null => Ok(Value::Null),
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            _ => Err(EvalError::NotFoldable(expr.to_string())),
        },

        Expr::IsNull(child) => Ok(Value::Boolean(eval(child)?.is_null())),
        Expr::IsNotNull(child) => Ok(Value::Boolean(!eval(child)?.is_null())),

        Expr::If(if_expr) => match eval(&if_expr.condition)? {
            Value::Null => Ok(Value::Null),
            Value::Boolean(true) => eval(&if_expr.then_value),
            Value::Boolean(false) => eval(&if_expr.else_value),
            _ => Err(EvalError::NotFoldable(expr.to_string())),
        },

        Expr::Coalesce(args) => {
            for arg in args {
                let value = eval(arg)?;
                if !value.is_null() {
                    return Ok(value);
                }
            }
            Ok(Value::Null)
        }

        other => Err(EvalError::NotFoldable(other.to_string())),
    }
}

/// Convert a value to the given type, with SQL cast semantics on the
/// primitive lattice. Null casts to null at any type.
pub fn cast_value(value: Value, target: &DataType) -> Result<Value, EvalError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    if value.data_type().as_ref() == Some(target) {
        return Ok(value);
    }
    let rendered = value.to_string();
    match (&value, target) {
        (v, t) if is_numeric_value(v) && t.is_integral() => {
            let wide = to_long(v);
            Ok(match t {
                DataType::Byte => Value::Byte(wide as i8),
                DataType::Short => Value::Short(wide as i16),
                DataType::Int => Value::Int(wide as i32),
                _ => Value::Long(wide),
            })
        }
        (v, t) if is_numeric_value(v) && t.is_fractional() => {
            let wide = to_double(v);
            Ok(match t {
                DataType::Float => Value::Float(wide as f32),
                _ => Value::Double(wide),
            })
        }
        (v, DataType::String) if is_numeric_value(v) => Ok(Value::String(rendered)),
        (Value::String(s), t) if t.is_numeric() => parse_numeric(s, t).ok_or(EvalError::InvalidCast {
            value: rendered,
            target: target.sql_name(),
        }),
        _ => Err(EvalError::InvalidCast {
            value: rendered,
            target: target.sql_name(),
        }),
    }
}

fn is_numeric_value(value: &Value) -> bool {
    value
        .data_type()
        .map(|t| t.is_numeric())
        .unwrap_or(false)
}

fn to_long(value: &Value) -> i64 {
    match value {
        Value::Byte(v) => *v as i64,
        Value::Short(v) => *v as i64,
        Value::Int(v) => *v as i64,
        Value::Long(v) => *v,
        Value::Float(v) => *v as i64,
        Value::Double(v) => *v as i64,
        _ => 0,
    }
}

fn to_double(value: &Value) -> f64 {
    match value {
        Value::Byte(v) => *v as f64,
        Value::Short(v) => *v as f64,
        Value::Int(v) => *v as f64,
        Value::Long(v) => *v as f64,
        Value::Float(v) => *v as f64,
        Value::Double(v) => *v,
        _ => 0.0,
    }
}

fn parse_numeric(s: &str, target: &DataType) -> Option<Value> {
    let trimmed = s.trim();
    Some(match target {
        DataType::Byte => Value::Byte(trimmed.parse().ok()?),
        DataType::Short => Value::Short(trimmed.parse().ok()?),
        DataType::Int => Value::Int(trimmed.parse().ok()?),
        DataType::Long => Value::Long(trimmed.parse().ok()?),
        DataType::Float => Value::Float(trimmed.parse().ok()?),
        DataType::Double => Value::Double(trimmed.parse().ok()?),
        _ => return None,
    })
}

fn eval_and(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Boolean(false), _) | (_, Value::Boolean(false)) => Value::Boolean(false),
        (Value::Boolean(true), Value::Boolean(true)) => Value::Boolean(true),
        _ => Value::Null,
    }
}

fn eval_or(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Boolean(true), _) | (_, Value::Boolean(true)) => Value::Boolean(true),
        (Value::Boolean(false), Value::Boolean(false)) => Value::Boolean(false),
        _ => Value::Null,
    }
}

fn eval_comparison(op: BinaryOperator, left: Value, right: Value) -> Result<Value, EvalError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let ordering = match (&left, &right) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
        (a, b) if is_numeric_value(a) && is_numeric_value(b) => {
            if matches!(a.data_type(), Some(t) if t.is_fractional())
                || matches!(b.data_type(), Some(t) if t.is_fractional())
            {
                let (a, b) = (to_double(a), to_double(b));
                a.partial_cmp(&b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            } else {
                to_long(a).cmp(&to_long(b))
            }
        }
        _ => {
            return Err(EvalError::NotFoldable(format!(
                "{} {} {}",
                left, op, right
            )))
        }
    };
    let result = match op {
        BinaryOperator::Eq => ordering.is_eq(),
        BinaryOperator::NotEq => !ordering.is_eq(),
        BinaryOperator::Lt => ordering.is_lt(),
        BinaryOperator::LtEq => ordering.is_le(),
        BinaryOperator::Gt => ordering.is_gt(),
        BinaryOperator::GtEq => ordering.is_ge(),
        _ => unreachable!("comparison operator expected"),
    };
    Ok(Value::Boolean(result))
}

fn eval_arithmetic(
    op: BinaryOperator,
    left: Value,
    right: Value,
    source: &Expr,
) -> Result<Value, EvalError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let fractional = matches!(left.data_type(), Some(t) if t.is_fractional())
        || matches!(right.data_type(), Some(t) if t.is_fractional());
    if fractional {
        let (a, b) = (to_double(&left), to_double(&right));
        let result = match op {
            BinaryOperator::Plus => a + b,
            BinaryOperator::Minus => a - b,
            BinaryOperator::Multiply => a * b,
            BinaryOperator::Divide => {
                if b == 0.0 {
                    return Ok(Value::Null);
                }
                a / b
            }
            _ => return Err(EvalError::NotFoldable(source.to_string())),
        };
        Ok(Value::Double(result))
    } else {
        let (a, b) = (to_long(&left), to_long(&right));
        let result = match op {
            BinaryOperator::Plus => a.checked_add(b),
            BinaryOperator::Minus => a.checked_sub(b),
            BinaryOperator::Multiply => a.checked_mul(b),
            BinaryOperator::Divide => {
                if b == 0 {
                    return Ok(Value::Null);
                }
                a.checked_div(b)
            }
            _ => return Err(EvalError::NotFoldable(source.to_string())),
        };
        result
            .map(Value::Long)
            .ok_or_else(|| EvalError::ArithmeticOverflow(source.to_string()))
    }
}
