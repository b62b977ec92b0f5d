//! Optimizer-wide laws: idempotence, schema preservation, CNF shape,
//! constant folding, scoping-node elimination, and serde round-trips.

use std::collections::HashMap;
use std::sync::Arc;

use quarry::expr::combinators::*;
use quarry::expr::predicates::is_cnf;
use quarry::expr::{Alias, Expr};
use quarry::plan::{Join, JoinType, LogicalPlan, Subquery, Union, With};
use quarry::{Optimizer, TreeNode};

use super::support::{filter, init_logging, int_relation, limit, project, schema};

fn optimize(plan: Arc<LogicalPlan>) -> Arc<LogicalPlan> {
    init_logging();
    Optimizer::new().optimize(plan).unwrap()
}

fn sample_plans() -> Vec<Arc<LogicalPlan>> {
    let mut plans = vec![];

    let (rel, cols) = int_relation(&["a", "b"]);
    let a = Expr::Attribute(cols[0].clone());
    let b = Expr::Attribute(cols[1].clone());

    plans.push(filter(
        filter(rel.clone(), gt(a.clone(), lit_int(1))),
        lt(a.clone(), lit_int(10)),
    ));
    plans.push(limit(limit(rel.clone(), 5), 3));
    plans.push(filter(
        rel.clone(),
        not(and_pair(eq(a.clone(), lit_int(1)), not(eq(b.clone(), lit_int(2))))),
    ));
    plans.push(filter(
        rel.clone(),
        or_pair(
            gt(a.clone(), lit_int(0)),
            and_pair(gt(b.clone(), lit_int(1)), lt(b.clone(), lit_int(9))),
        ),
    ));

    let x = Alias::new(plus(a.clone(), lit_int(1)), "x");
    let x_ref = Expr::Alias(Box::new(x.clone())).to_attribute().unwrap();
    let y = Alias::new(plus(Expr::Attribute(x_ref), lit_int(2)), "y");
    plans.push(project(
        project(rel.clone(), vec![Expr::Alias(Box::new(x))]),
        vec![Expr::Alias(Box::new(y))],
    ));

    let (left, left_cols) = int_relation(&["a", "b"]);
    let (right, right_cols) = int_relation(&["c"]);
    plans.push(filter(
        Arc::new(LogicalPlan::Join(Join {
            left,
            right,
            join_type: JoinType::Inner,
            condition: None,
        })),
        and_pair(
            eq(
                Expr::Attribute(left_cols[0].clone()),
                Expr::Attribute(right_cols[0].clone()),
            ),
            gt(Expr::Attribute(left_cols[1].clone()), lit_int(0)),
        ),
    ));

    let (union_left, _) = int_relation(&["a"]);
    let (union_right, _) = int_relation(&["a"]);
    plans.push(limit(
        Arc::new(LogicalPlan::Union(Union {
            left: limit(union_left, 5),
            right: limit(union_right, 5),
        })),
        3,
    ));

    plans
}

#[test]
fn test_optimization_is_idempotent() {
    for plan in sample_plans() {
        let once = optimize(plan);
        let twice = optimize(once.clone());
        assert!(
            once.same_as(&twice),
            "optimize(optimize(p)) != optimize(p) for\n{}",
            once.as_ref()
        );
    }
}

#[test]
fn test_optimization_preserves_schema() {
    for plan in sample_plans() {
        let before = schema(&plan);
        let after = schema(&optimize(plan.clone()));
        assert_eq!(before, after, "schema drift for\n{}", plan.as_ref());
    }
}

#[test]
fn test_filter_conditions_end_in_cnf() {
    for plan in sample_plans() {
        let optimized = optimize(plan);
        let violations = optimized.collect(&|p| match p.as_ref() {
            LogicalPlan::Filter(f) if !is_cnf(&f.predicate) => Some(f.predicate.clone()),
            _ => None,
        });
        assert!(
            violations.is_empty(),
            "non-CNF filter conditions: {:?}",
            violations
        );
    }
}

#[test]
fn test_closed_expressions_fold_to_single_literals() {
    let (rel, _) = int_relation(&["a"]);
    let closed = Alias::new(
        plus(lit_int(1), multiply(lit_int(2), plus(lit_int(3), lit_int(4)))),
        "x",
    );
    let optimized = optimize(project(rel, vec![Expr::Alias(Box::new(closed))]));
    match optimized.as_ref() {
        LogicalPlan::Project(p) => match &p.items[0] {
            Expr::Alias(alias) => assert_eq!(alias.child, lit_int(15)),
            other => panic!("expected Alias, got {}", other),
        },
        other => panic!("expected Project, got {}", other),
    }
}

#[test]
fn test_contradictory_filter_becomes_empty_relation() {
    let (rel, cols) = int_relation(&["a"]);
    let a = Expr::Attribute(cols[0].clone());
    let plan = filter(rel.clone(), and_pair(gt(a.clone(), lit_int(0)), not(gt(a, lit_int(0)))));
    let before = schema(&plan);

    let optimized = optimize(plan);
    match optimized.as_ref() {
        LogicalPlan::LocalRelation(local) => {
            assert!(local.rows.is_empty());
        }
        other => panic!("expected LocalRelation, got {}", other),
    }
    assert_eq!(schema(&optimized), before);
}

#[test]
fn test_scoping_nodes_are_erased() {
    let (rel, cols) = int_relation(&["a"]);
    let sub = Arc::new(LogicalPlan::Subquery(Subquery {
        input: rel.clone(),
        alias: "t".to_string(),
    }));
    let qualified = sub.as_ref().output()[0].clone();
    let mut cte = HashMap::new();
    cte.insert("t".to_string(), rel.clone());
    let plan = Arc::new(LogicalPlan::With(With {
        input: filter(sub, gt(Expr::Attribute(qualified), lit_int(0))),
        cte,
    }));

    let optimized = optimize(plan);
    assert!(!optimized.exists(&|p| matches!(
        p.as_ref(),
        LogicalPlan::Subquery(_) | LogicalPlan::With(_)
    )));
    match optimized.as_ref() {
        LogicalPlan::Filter(f) => {
            assert!(Arc::ptr_eq(&f.input, &rel));
            let all_bare = f
                .predicate
                .collect(&|e| match e {
                    Expr::Attribute(attr) => Some(attr.qualifier.is_none()),
                    _ => None,
                })
                .into_iter()
                .all(|bare| bare);
            assert!(all_bare);
            assert_eq!(f.predicate.references().len(), 1);
            assert!(f.predicate.references().contains(&cols[0].id));
        }
        other => panic!("expected Filter, got {}", other),
    }
}

#[test]
fn test_optimized_plan_round_trips_through_serde() {
    for plan in sample_plans() {
        let optimized = optimize(plan);
        let encoded = serde_json::to_string(optimized.as_ref()).unwrap();
        let decoded: LogicalPlan = serde_json::from_str(&encoded).unwrap();
        assert_eq!(&decoded, optimized.as_ref());
    }
}

#[test]
fn test_conjuncts_land_on_the_covering_side() {
    // Every pure conjunct whose references fit one join side ends up below it.
    let (left, left_cols) = int_relation(&["a", "b"]);
    let (right, right_cols) = int_relation(&["c", "d"]);
    let plan = filter(
        Arc::new(LogicalPlan::Join(Join {
            left: left.clone(),
            right: right.clone(),
            join_type: JoinType::Inner,
            condition: None,
        })),
        and(vec![
            eq(
                Expr::Attribute(left_cols[0].clone()),
                Expr::Attribute(right_cols[0].clone()),
            ),
            gt(Expr::Attribute(left_cols[1].clone()), lit_int(0)),
            lt(Expr::Attribute(right_cols[1].clone()), lit_int(9)),
        ])
        .unwrap(),
    );

    let optimized = optimize(plan);
    match optimized.as_ref() {
        LogicalPlan::Join(j) => {
            match j.left.as_ref() {
                LogicalPlan::Filter(f) => {
                    assert!(f
                        .predicate
                        .references()
                        .is_subset(&left.output().into_iter().map(|a| a.id).collect()));
                }
                other => panic!("expected Filter on left, got {}", other),
            }
            match j.right.as_ref() {
                LogicalPlan::Filter(f) => {
                    assert!(f
                        .predicate
                        .references()
                        .is_subset(&right.output().into_iter().map(|a| a.id).collect()));
                }
                other => panic!("expected Filter on right, got {}", other),
            }
            assert!(j.condition.is_some());
        }
        other => panic!("expected Join, got {}", other),
    }
}
