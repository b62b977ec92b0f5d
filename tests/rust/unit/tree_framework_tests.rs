//! Tree framework laws over real plan trees.

use std::sync::Arc;

use quarry::expr::combinators::{gt, lit_int};
use quarry::expr::{AttributeRef, Expr};
use quarry::plan::{Filter, Join, JoinType, Limit, LocalRelation, LogicalPlan};
use quarry::types::DataType;
use quarry::TreeNode;

fn relation(name: &str) -> (Arc<LogicalPlan>, AttributeRef) {
    let attr = AttributeRef::new(name, DataType::Int, false);
    let plan = Arc::new(LogicalPlan::LocalRelation(LocalRelation {
        rows: vec![],
        output: vec![attr.clone()],
    }));
    (plan, attr)
}

fn sample_plan() -> Arc<LogicalPlan> {
    let (left, a) = relation("a");
    let (right, _) = relation("b");
    Arc::new(LogicalPlan::Limit(Limit {
        input: Arc::new(LogicalPlan::Filter(Filter {
            input: Arc::new(LogicalPlan::Join(Join {
                left,
                right,
                join_type: JoinType::Inner,
                condition: None,
            })),
            predicate: gt(Expr::Attribute(a), lit_int(0)),
        })),
        count: lit_int(10),
    }))
}

#[test]
fn test_identity_transform_preserves_instance() {
    let plan = sample_plan();
    let down = plan.transform_down(&|_| None);
    assert!(!down.is_yes());
    assert!(Arc::ptr_eq(&down.into_inner(), &plan));

    let up = plan.transform_up(&|_| None);
    assert!(!up.is_yes());
    assert!(Arc::ptr_eq(&up.into_inner(), &plan));
}

#[test]
fn test_size_and_depth_laws() {
    let plan = sample_plan();
    // Limit -> Filter -> Join -> {rel, rel}
    assert_eq!(plan.size(), 5);
    assert_eq!(plan.depth(), 4);

    let size_law = 1 + plan
        .children()
        .iter()
        .map(|c| c.size())
        .sum::<usize>();
    assert_eq!(plan.size(), size_law);

    let depth_law = 1 + plan
        .children()
        .iter()
        .map(|c| c.depth())
        .max()
        .unwrap_or(0);
    assert_eq!(plan.depth(), depth_law);
}

#[test]
fn test_collect_exists_forall() {
    let plan = sample_plan();
    let relations = plan.collect(&|p| match p.as_ref() {
        LogicalPlan::LocalRelation(rel) => Some(rel.output.len()),
        _ => None,
    });
    assert_eq!(relations, vec![1, 1]);

    assert!(plan.exists(&|p| matches!(p.as_ref(), LogicalPlan::Join(_))));
    assert!(!plan.exists(&|p| matches!(p.as_ref(), LogicalPlan::Distinct(_))));
    assert!(plan.for_all(&|p| !matches!(p.as_ref(), LogicalPlan::SingleRowRelation)));
}

#[test]
fn test_pretty_tree_structure_is_stable() {
    let plan = sample_plan();
    let rendered = plan.pretty_tree();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), plan.size());
    assert!(lines[0].starts_with("Limit"));
    assert!(lines[1].starts_with("└── Filter"));
    assert!(lines[2].starts_with("    └── Join"));
    assert!(lines[3].starts_with("        ├── LocalRelation"));
    assert!(lines[4].starts_with("        └── LocalRelation"));

    // The shape reparses isomorphically: indentation depth mirrors tree depth.
    assert_eq!(rendered, plan.pretty_tree());
}

#[test]
fn test_transform_down_replaces_whole_subtrees() {
    let plan = sample_plan();
    let (replacement, _) = relation("c");
    let result = plan
        .transform_down(&|p| {
            matches!(p.as_ref(), LogicalPlan::Join(_)).then(|| replacement.clone())
        })
        .into_inner();
    match result.as_ref() {
        LogicalPlan::Limit(l) => match l.input.as_ref() {
            LogicalPlan::Filter(f) => assert!(Arc::ptr_eq(&f.input, &replacement)),
            other => panic!("expected Filter, got {}", other),
        },
        other => panic!("expected Limit, got {}", other),
    }
}
