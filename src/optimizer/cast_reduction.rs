//! Cast reduction.
//!
//! Identity casts disappear. A double cast `CAST(CAST(e AS u) AS t)` drops
//! the inner cast only when `u` is at least as wide as `t` on the numeric
//! lattice; a narrowing inner cast is information-destroying and is kept.

use std::sync::Arc;

use crate::expr::{Cast, Expr};
use crate::plan::LogicalPlan;
use crate::tree::Transformed;
use crate::types::DataType;

use super::rules_executor::{OptimizerResult, Rule};
use super::transform_expressions;

pub struct ReduceCasts;

fn inner_cast_is_redundant(inner: &DataType, outer: &DataType) -> bool {
    inner == outer || (inner.is_numeric() && outer.is_numeric() && outer.narrower_than(inner))
}

impl Rule for ReduceCasts {
    fn name(&self) -> &'static str {
        "ReduceCasts"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(transform_expressions(plan, &|expr| match expr {
            Expr::Cast(outer) => {
                if outer.child.data_type() == outer.target {
                    return Some(outer.child.clone());
                }
                match &outer.child {
                    Expr::Cast(inner) if inner_cast_is_redundant(&inner.target, &outer.target) => {
                        Some(Expr::Cast(Box::new(Cast {
                            child: inner.child.clone(),
                            target: outer.target.clone(),
                        })))
                    }
                    _ => None,
                }
            }
            _ => None,
        }))
    }
}
