//! Shared plan builders for the optimizer suites.

use std::sync::Arc;

use quarry::expr::combinators::lit_int;
use quarry::expr::{AttributeRef, Expr};
use quarry::plan::{Filter, Limit, LocalRelation, LogicalPlan, Project};
use quarry::types::DataType;

/// Opt-in diagnostics: run with `RUST_LOG=debug` to watch batches converge.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn int_relation(names: &[&str]) -> (Arc<LogicalPlan>, Vec<AttributeRef>) {
    let output: Vec<AttributeRef> = names
        .iter()
        .map(|name| AttributeRef::new(*name, DataType::Int, false))
        .collect();
    let plan = Arc::new(LogicalPlan::LocalRelation(LocalRelation {
        rows: vec![],
        output: output.clone(),
    }));
    (plan, output)
}

pub fn filter(input: Arc<LogicalPlan>, predicate: Expr) -> Arc<LogicalPlan> {
    Arc::new(LogicalPlan::Filter(Filter { input, predicate }))
}

pub fn limit(input: Arc<LogicalPlan>, count: i32) -> Arc<LogicalPlan> {
    Arc::new(LogicalPlan::Limit(Limit {
        input,
        count: lit_int(count),
    }))
}

pub fn project(input: Arc<LogicalPlan>, items: Vec<Expr>) -> Arc<LogicalPlan> {
    Arc::new(LogicalPlan::Project(Project { input, items }))
}

/// Observable schema: (name, sql type, nullable) per column.
pub fn schema(plan: &LogicalPlan) -> Vec<(String, String, bool)> {
    plan.output()
        .into_iter()
        .map(|attr| (attr.name, attr.data_type.sql_name(), attr.nullable))
        .collect()
}
