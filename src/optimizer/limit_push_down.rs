//! Projection and limit pushdown around row-count operators.
//!
//! [`PushProjectsThroughLimits`] swaps a projection below a limit, which is
//! safe because projection is row-wise. [`PushLimitsThroughUnions`] copies a
//! limit over a union into both branches; the copy only happens while a
//! branch is not already limited by a count at most the outer count
//! (decided by plan-time evaluation, since limit counts are foldable), so
//! the batch converges once ReduceLimits and FoldConstants collapse the
//! nested limits.

use std::sync::Arc;

use crate::expr::{evaluator, Expr, Value};
use crate::plan::{Limit, LogicalPlan, Project, Union};
use crate::tree::{Transformed, TreeNode};

use super::rules_executor::{OptimizerResult, Rule};

pub struct PushProjectsThroughLimits;

impl Rule for PushProjectsThroughLimits {
    fn name(&self) -> &'static str {
        "PushProjectsThroughLimits"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(plan.transform_down(&|p: &Arc<LogicalPlan>| match p.as_ref() {
            LogicalPlan::Project(project) => match project.input.as_ref() {
                LogicalPlan::Limit(limit) => Some(Arc::new(LogicalPlan::Limit(Limit {
                    input: Arc::new(LogicalPlan::Project(Project {
                        input: limit.input.clone(),
                        items: project.items.clone(),
                    })),
                    count: limit.count.clone(),
                }))),
                _ => None,
            },
            _ => None,
        }))
    }
}

pub struct PushLimitsThroughUnions;

fn count_value(expr: &Expr) -> Option<i64> {
    if !expr.foldable() {
        return None;
    }
    match evaluator::eval(expr).ok()? {
        Value::Byte(v) => Some(v as i64),
        Value::Short(v) => Some(v as i64),
        Value::Int(v) => Some(v as i64),
        Value::Long(v) => Some(v),
        _ => None,
    }
}

fn limited_by(branch: &LogicalPlan, count: &Expr) -> bool {
    match branch {
        LogicalPlan::Limit(limit) => {
            limit.count == *count
                || matches!(
                    (count_value(&limit.count), count_value(count)),
                    (Some(inner), Some(outer)) if inner <= outer
                )
        }
        _ => false,
    }
}

impl Rule for PushLimitsThroughUnions {
    fn name(&self) -> &'static str {
        "PushLimitsThroughUnions"
    }

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>> {
        Ok(plan.transform_down(&|p: &Arc<LogicalPlan>| match p.as_ref() {
            LogicalPlan::Limit(outer) => match outer.input.as_ref() {
                LogicalPlan::Union(union) => {
                    if limited_by(&union.left, &outer.count) && limited_by(&union.right, &outer.count)
                    {
                        return None;
                    }
                    let wrap = |branch: &Arc<LogicalPlan>| {
                        if limited_by(branch, &outer.count) {
                            branch.clone()
                        } else {
                            Arc::new(LogicalPlan::Limit(Limit {
                                input: branch.clone(),
                                count: outer.count.clone(),
                            }))
                        }
                    };
                    Some(Arc::new(LogicalPlan::Limit(Limit {
                        input: Arc::new(LogicalPlan::Union(Union {
                            left: wrap(&union.left),
                            right: wrap(&union.right),
                        })),
                        count: outer.count.clone(),
                    })))
                }
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
    use crate::expr::{Alias, AttributeRef};
    use crate::plan::LocalRelation;
    use crate::types::DataType;

    fn relation(name: &str) -> (Arc<LogicalPlan>, AttributeRef) {
        let attr = AttributeRef::new(name, DataType::Int, false);
        let plan = Arc::new(LogicalPlan::LocalRelation(LocalRelation {
            rows: vec![],
            output: vec![attr.clone()],
        }));
        (plan, attr)
    }

    #[test]
    fn test_project_moves_below_limit() {
        let (rel, attr) = relation("a");
        let items = vec![Expr::Alias(Box::new(Alias::new(
            plus(Expr::Attribute(attr), lit_int(1)),
            "x",
        )))];
        let plan = Arc::new(LogicalPlan::Project(Project {
            input: Arc::new(LogicalPlan::Limit(Limit {
                input: rel.clone(),
                count: lit_int(3),
            })),
            items: items.clone(),
        }));

        let result = PushProjectsThroughLimits.apply(&plan).unwrap().into_inner();
        match result.as_ref() {
            LogicalPlan::Limit(l) => {
                assert_eq!(l.count, lit_int(3));
                match l.input.as_ref() {
                    LogicalPlan::Project(p) => {
                        assert_eq!(p.items, items);
                        assert!(Arc::ptr_eq(&p.input, &rel));
                    }
                    other => panic!("expected Project, got {}", other),
                }
            }
            other => panic!("expected Limit, got {}", other),
        }
    }

    #[test]
    fn test_limit_copies_into_union_branches() {
        let (left, _) = relation("a");
        let (right, _) = relation("a");
        let plan = Arc::new(LogicalPlan::Limit(Limit {
            input: Arc::new(LogicalPlan::Union(Union {
                left: left.clone(),
                right: right.clone(),
            })),
            count: lit_int(3),
        }));

        let result = PushLimitsThroughUnions.apply(&plan).unwrap().into_inner();
        match result.as_ref() {
            LogicalPlan::Limit(outer) => match outer.input.as_ref() {
                LogicalPlan::Union(u) => {
                    for branch in [&u.left, &u.right] {
                        match branch.as_ref() {
                            LogicalPlan::Limit(l) => assert_eq!(l.count, lit_int(3)),
                            other => panic!("expected Limit branch, got {}", other),
                        }
                    }
                }
                other => panic!("expected Union, got {}", other),
            },
            other => panic!("expected Limit, got {}", other),
        }
    }

    #[test]
    fn test_already_limited_branches_converge() {
        let (left, _) = relation("a");
        let (right, _) = relation("a");
        let limited = |branch: Arc<LogicalPlan>, n: i32| {
            Arc::new(LogicalPlan::Limit(Limit {
                input: branch,
                count: lit_int(n),
            }))
        };
        let plan = Arc::new(LogicalPlan::Limit(Limit {
            input: Arc::new(LogicalPlan::Union(Union {
                left: limited(left.clone(), 3),
                right: limited(right.clone(), 3),
            })),
            count: lit_int(3),
        }));
        assert!(!PushLimitsThroughUnions.apply(&plan).unwrap().is_yes());

        // A branch limited more tightly than the outer count also counts.
        let plan = Arc::new(LogicalPlan::Limit(Limit {
            input: Arc::new(LogicalPlan::Union(Union {
                left: limited(left, 2),
                right: limited(right, 3),
            })),
            count: lit_int(3),
        }));
        assert!(!PushLimitsThroughUnions.apply(&plan).unwrap().is_yes());
    }

    #[test]
    fn test_foldable_branch_count_is_compared_by_value() {
        let (left, _) = relation("a");
        let (right, _) = relation("a");
        // IF(5 < 3, 5, 3) evaluates to 3: treated as already limited by 3.
        let pending = if_expr(lt(lit_int(5), lit_int(3)), lit_int(5), lit_int(3));
        let branch = |rel: Arc<LogicalPlan>| {
            Arc::new(LogicalPlan::Limit(Limit {
                input: rel,
                count: pending.clone(),
            }))
        };
        let plan = Arc::new(LogicalPlan::Limit(Limit {
            input: Arc::new(LogicalPlan::Union(Union {
                left: branch(left),
                right: branch(right),
            })),
            count: lit_int(3),
        }));
        assert!(!PushLimitsThroughUnions.apply(&plan).unwrap().is_yes());
    }
}
