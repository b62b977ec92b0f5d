//! End-to-end optimizer scenarios.
//!
//! Each test feeds a resolved plan through the default batch and asserts the
//! canonical rewritten shape.

use std::sync::Arc;

use quarry::expr::combinators::*;
use quarry::expr::{Alias, Expr};
use quarry::plan::{Join, JoinType, LogicalPlan, Union};
use quarry::Optimizer;

use super::support::{filter, init_logging, int_relation, limit, project};

fn optimize(plan: Arc<LogicalPlan>) -> Arc<LogicalPlan> {
    init_logging();
    Optimizer::new().optimize(plan).unwrap()
}

#[test]
fn test_adjacent_filters_merge_into_one() {
    let (rel, cols) = int_relation(&["a"]);
    let a = Expr::Attribute(cols[0].clone());
    let plan = filter(
        filter(rel.clone(), gt(a.clone(), lit_int(1))),
        lt(a.clone(), lit_int(10)),
    );

    let optimized = optimize(plan);
    match optimized.as_ref() {
        LogicalPlan::Filter(f) => {
            assert!(Arc::ptr_eq(&f.input, &rel));
            assert_eq!(
                f.predicate,
                and_pair(gt(a.clone(), lit_int(1)), lt(a, lit_int(10)))
            );
        }
        other => panic!("expected a single Filter, got {}", other),
    }
}

#[test]
fn test_nested_limits_fold_to_minimum() {
    let (rel, _) = int_relation(&["a"]);
    let optimized = optimize(limit(limit(rel.clone(), 5), 3));
    match optimized.as_ref() {
        LogicalPlan::Limit(l) => {
            assert!(Arc::ptr_eq(&l.input, &rel));
            assert_eq!(l.count, lit_int(3));
        }
        other => panic!("expected Limit, got {}", other),
    }
}

#[test]
fn test_filter_splits_across_inner_join() {
    let (left, left_cols) = int_relation(&["a", "b"]);
    let (right, right_cols) = int_relation(&["c"]);
    let a = Expr::Attribute(left_cols[0].clone());
    let b = Expr::Attribute(left_cols[1].clone());
    let c = Expr::Attribute(right_cols[0].clone());

    let plan = filter(
        Arc::new(LogicalPlan::Join(Join {
            left: left.clone(),
            right: right.clone(),
            join_type: JoinType::Inner,
            condition: None,
        })),
        and_pair(eq(a.clone(), c.clone()), gt(b.clone(), lit_int(0))),
    );

    let optimized = optimize(plan);
    match optimized.as_ref() {
        LogicalPlan::Join(j) => {
            assert_eq!(j.join_type, JoinType::Inner);
            assert_eq!(j.condition, Some(eq(a, c)));
            match j.left.as_ref() {
                LogicalPlan::Filter(f) => {
                    assert!(Arc::ptr_eq(&f.input, &left));
                    assert_eq!(f.predicate, gt(b, lit_int(0)));
                }
                other => panic!("expected Filter on the left branch, got {}", other),
            }
            assert!(Arc::ptr_eq(&j.right, &right));
        }
        other => panic!("expected Join, got {}", other),
    }
}

#[test]
fn test_projections_merge_with_alias_inlining() {
    let (rel, cols) = int_relation(&["a"]);
    let a = Expr::Attribute(cols[0].clone());
    let x = Alias::new(plus(a.clone(), lit_int(1)), "x");
    let x_ref = Expr::Alias(Box::new(x.clone())).to_attribute().unwrap();
    let y = Alias::new(plus(Expr::Attribute(x_ref), lit_int(2)), "y");
    let y_id = y.id;

    let plan = project(
        project(rel.clone(), vec![Expr::Alias(Box::new(x))]),
        vec![Expr::Alias(Box::new(y))],
    );

    let optimized = optimize(plan);
    match optimized.as_ref() {
        LogicalPlan::Project(p) => {
            assert!(Arc::ptr_eq(&p.input, &rel));
            match &p.items[0] {
                Expr::Alias(alias) => {
                    assert_eq!(alias.name, "y");
                    assert_eq!(alias.id, y_id);
                    assert_eq!(alias.child, plus(plus(a, lit_int(1)), lit_int(2)));
                }
                other => panic!("expected Alias, got {}", other),
            }
        }
        other => panic!("expected Project, got {}", other),
    }
}

#[test]
fn test_negations_reduce_and_normalize_to_cnf() {
    let (rel, cols) = int_relation(&["a", "b"]);
    let a = Expr::Attribute(cols[0].clone());
    let b = Expr::Attribute(cols[1].clone());

    // NOT (a = 1 AND NOT (b = 2))  =>  a <> 1 OR b = 2
    let plan = filter(
        rel,
        not(and_pair(eq(a.clone(), lit_int(1)), not(eq(b.clone(), lit_int(2))))),
    );

    let optimized = optimize(plan);
    match optimized.as_ref() {
        LogicalPlan::Filter(f) => {
            assert_eq!(
                f.predicate,
                or_pair(neq(a, lit_int(1)), eq(b, lit_int(2)))
            );
        }
        other => panic!("expected Filter, got {}", other),
    }
}

#[test]
fn test_limits_push_into_union_branches() {
    let (left, _) = int_relation(&["a"]);
    let (right, _) = int_relation(&["a"]);
    let plan = limit(
        Arc::new(LogicalPlan::Union(Union {
            left: limit(left.clone(), 5),
            right: limit(right.clone(), 5),
        })),
        3,
    );

    let optimized = optimize(plan);
    match optimized.as_ref() {
        LogicalPlan::Limit(outer) => {
            assert_eq!(outer.count, lit_int(3));
            match outer.input.as_ref() {
                LogicalPlan::Union(u) => {
                    for (branch, base) in [(&u.left, &left), (&u.right, &right)] {
                        match branch.as_ref() {
                            LogicalPlan::Limit(l) => {
                                assert_eq!(l.count, lit_int(3));
                                assert!(Arc::ptr_eq(&l.input, base));
                            }
                            other => panic!("expected Limit branch, got {}", other),
                        }
                    }
                }
                other => panic!("expected Union, got {}", other),
            }
        }
        other => panic!("expected Limit, got {}", other),
    }
}

#[test]
fn test_filter_pushes_through_renaming_project() {
    // Renaming is transparent to pushdown because routing is by id.
    let (rel, cols) = int_relation(&["a"]);
    let a = Expr::Attribute(cols[0].clone());
    let renamed = Alias::new(a.clone(), "renamed");
    let renamed_ref = Expr::Alias(Box::new(renamed.clone())).to_attribute().unwrap();

    let plan = filter(
        project(rel.clone(), vec![Expr::Alias(Box::new(renamed))]),
        gt(Expr::Attribute(renamed_ref), lit_int(0)),
    );

    let optimized = optimize(plan);
    match optimized.as_ref() {
        LogicalPlan::Project(p) => match p.input.as_ref() {
            LogicalPlan::Filter(f) => {
                assert!(Arc::ptr_eq(&f.input, &rel));
                assert_eq!(f.predicate, gt(a, lit_int(0)));
            }
            other => panic!("expected Filter below the project, got {}", other),
        },
        other => panic!("expected Project, got {}", other),
    }
}
