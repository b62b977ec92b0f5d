//! Rule batches and the fixed-point driver.
//!
//! A [`Rule`] is a pure plan-to-plan function that reports whether it
//! changed anything via [`Transformed`]. Rules are grouped into [`Batch`]es,
//! each with an end condition: run once, or re-run to a fixed point under an
//! iteration cap. A batch has converged when a full pass leaves the plan
//! `same_as` the pre-pass plan; because unchanged rewrites pass the original
//! `Arc` through, that check is usually pointer equality.
//!
//! Convergence is a correctness obligation of the rule set; the iteration
//! cap is a safety net and hitting it emits a diagnostic.

use std::sync::Arc;

use crate::plan::LogicalPlan;
use crate::tree::{Transformed, TreeNode};

use super::errors::OptimizerError;

pub type OptimizerResult<T> = Result<T, OptimizerError>;

pub trait Rule {
    fn name(&self) -> &'static str;

    fn apply(&self, plan: &Arc<LogicalPlan>) -> OptimizerResult<Transformed<Arc<LogicalPlan>>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EndCondition {
    Once,
    FixedPoint { max_iterations: usize },
}

pub struct Batch {
    pub name: String,
    pub end_condition: EndCondition,
    pub rules: Vec<Box<dyn Rule>>,
}

impl Batch {
    pub fn once(name: impl Into<String>, rules: Vec<Box<dyn Rule>>) -> Batch {
        Batch {
            name: name.into(),
            end_condition: EndCondition::Once,
            rules,
        }
    }

    pub fn fixed_point(
        name: impl Into<String>,
        max_iterations: usize,
        rules: Vec<Box<dyn Rule>>,
    ) -> Batch {
        Batch {
            name: name.into(),
            end_condition: EndCondition::FixedPoint { max_iterations },
            rules,
        }
    }
}

pub struct RulesExecutor {
    batches: Vec<Batch>,
}

impl RulesExecutor {
    pub fn new(batches: Vec<Batch>) -> RulesExecutor {
        RulesExecutor { batches }
    }

    /// Run every batch in declaration order.
    pub fn execute(&self, plan: Arc<LogicalPlan>) -> OptimizerResult<Arc<LogicalPlan>> {
        let mut plan = plan;
        for batch in &self.batches {
            plan = self.execute_batch(batch, plan)?;
        }
        Ok(plan)
    }

    fn execute_batch(
        &self,
        batch: &Batch,
        mut plan: Arc<LogicalPlan>,
    ) -> OptimizerResult<Arc<LogicalPlan>> {
        match batch.end_condition {
            EndCondition::Once => self.run_pass(batch, plan),
            EndCondition::FixedPoint { max_iterations } => {
                let mut iteration = 0;
                loop {
                    iteration += 1;
                    let before = plan.clone();
                    plan = self.run_pass(batch, plan)?;
                    if plan.same_as(&before) {
                        log::debug!(
                            "batch '{}' converged after {} iteration(s)",
                            batch.name,
                            iteration
                        );
                        break;
                    }
                    if iteration >= max_iterations {
                        log::warn!(
                            "batch '{}' reached its iteration cap ({}) without converging",
                            batch.name,
                            max_iterations
                        );
                        break;
                    }
                }
                Ok(plan)
            }
        }
    }

    fn run_pass(
        &self,
        batch: &Batch,
        mut plan: Arc<LogicalPlan>,
    ) -> OptimizerResult<Arc<LogicalPlan>> {
        for rule in &batch.rules {
            let tf = rule.apply(&plan)?;
            if tf.is_yes() {
                log::trace!("rule {} rewrote the plan", rule.name());
            }
            plan = tf.into_inner();
        }
        Ok(plan)
    }
}
