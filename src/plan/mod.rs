//! Logical Plan representation.
//!
//! Immutable operator trees with per-node output schemas. A resolved plan
//! enters the optimizer, rule batches rewrite it, and an equivalent resolved
//! plan comes out; the physical planner consumes the result.
//!
//! # Key Components
//!
//! - [`LogicalPlan`] - main enum representing all plan operators
//! - [`LocalRelation`] / [`EmptyRelation`] - leaf relations
//! - [`Project`] / [`Filter`] / [`Limit`] / [`Sort`] / [`Distinct`] - unary operators
//! - [`Union`] / [`Intersect`] / [`Except`] / [`Join`] - binary operators
//! - [`Aggregate`] - post-analysis grouping with placeholder aliases
//! - [`Subquery`] / [`With`] - scoping wrappers erased by the optimizer
//!
//! # Lifecycle
//!
//! Plans are pure values, never mutated after construction. A rewrite
//! returns a new tree sharing unchanged subtrees by `Arc` identity, which is
//! what the fixed-point executor's convergence check relies on.
//!
//! # Deduplication Invariant
//!
//! For any binary operator, the attribute-id sets of the two children are
//! disjoint. [`deduplicate_right`] freshens multi-instance relations on one
//! side when a self-join would violate this.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::expr::typing::promote_data_type;
use crate::expr::{Alias, AttributeRef, Expr, ExprId, Value};
use crate::tree::{Transformed, TreeNode};
use crate::types::{widest, DataType};
use crate::utils::serde_arc;

pub mod errors;
pub use errors::{LogicalPlanError, TypeCheckError};

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum LogicalPlan {
    /// In-memory rows with a fixed schema. Multi-instance: `new_instance`
    /// re-freshens the attribute ids to support self-joins.
    LocalRelation(LocalRelation),

    /// Constant one-row source with no columns.
    SingleRowRelation,

    /// Zero rows under a declared schema.
    EmptyRelation(EmptyRelation),

    Project(Project),

    Filter(Filter),

    Limit(Limit),

    Sort(Sort),

    Distinct(Distinct),

    Union(Union),

    Intersect(Intersect),

    Except(Except),

    Join(Join),

    /// Post-analysis aggregation: grouping keys wrapped in `GroupingAlias`,
    /// aggregate outputs wrapped in `AggregationAlias`.
    Aggregate(Aggregate),

    /// Qualifies its child's output with an alias; erased by the optimizer.
    Subquery(Subquery),

    /// CTE scoping wrapper. References were substituted by the resolver, so
    /// the named plans are carried metadata only and the optimizer drops the
    /// wrapper.
    With(With),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct LocalRelation {
    pub rows: Vec<Vec<Value>>,
    pub output: Vec<AttributeRef>,
}

impl LocalRelation {
    /// The same relation under fresh attribute ids.
    pub fn new_instance(&self) -> LocalRelation {
        LocalRelation {
            rows: self.rows.clone(),
            output: self.output.iter().map(|a| a.new_instance()).collect(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct EmptyRelation {
    pub output: Vec<AttributeRef>,
}

impl EmptyRelation {
    pub fn new_instance(&self) -> EmptyRelation {
        EmptyRelation {
            output: self.output.iter().map(|a| a.new_instance()).collect(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(with = "serde_arc")]
    pub input: Arc<LogicalPlan>,
    pub items: Vec<Expr>,
}

impl Project {
    /// Validating constructor; the project list must not be empty and every
    /// item must be name-bearing.
    pub fn try_new(input: Arc<LogicalPlan>, items: Vec<Expr>) -> Result<Project, LogicalPlanError> {
        if items.is_empty() {
            return Err(LogicalPlanError::EmptyProjectList);
        }
        if let Some(unnamed) = items.iter().find(|item| item.to_attribute().is_none()) {
            return Err(LogicalPlanError::NotNamed(unnamed.to_string()));
        }
        Ok(Project { input, items })
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Filter {
    #[serde(with = "serde_arc")]
    pub input: Arc<LogicalPlan>,
    pub predicate: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Limit {
    #[serde(with = "serde_arc")]
    pub input: Arc<LogicalPlan>,
    pub count: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Sort {
    #[serde(with = "serde_arc")]
    pub input: Arc<LogicalPlan>,
    pub order: Vec<Expr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Distinct {
    #[serde(with = "serde_arc")]
    pub input: Arc<LogicalPlan>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Union {
    #[serde(with = "serde_arc")]
    pub left: Arc<LogicalPlan>,
    #[serde(with = "serde_arc")]
    pub right: Arc<LogicalPlan>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Intersect {
    #[serde(with = "serde_arc")]
    pub left: Arc<LogicalPlan>,
    #[serde(with = "serde_arc")]
    pub right: Arc<LogicalPlan>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Except {
    #[serde(with = "serde_arc")]
    pub left: Arc<LogicalPlan>,
    #[serde(with = "serde_arc")]
    pub right: Arc<LogicalPlan>,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    LeftSemi,
    LeftOuter,
    RightOuter,
    FullOuter,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Inner => "Inner",
            JoinType::LeftSemi => "LeftSemi",
            JoinType::LeftOuter => "LeftOuter",
            JoinType::RightOuter => "RightOuter",
            JoinType::FullOuter => "FullOuter",
        };
        f.write_str(name)
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Join {
    #[serde(with = "serde_arc")]
    pub left: Arc<LogicalPlan>,
    #[serde(with = "serde_arc")]
    pub right: Arc<LogicalPlan>,
    pub join_type: JoinType,
    pub condition: Option<Expr>,
}

impl Join {
    /// `true` when the two sides expose overlapping attribute ids (e.g. a
    /// self-join) and the right side must be freshened via
    /// [`deduplicate_right`] before this join is resolved.
    pub fn needs_dedup(&self) -> bool {
        let left_ids: HashSet<ExprId> = self.left.output().into_iter().map(|a| a.id).collect();
        self.right
            .output()
            .iter()
            .any(|attr| left_ids.contains(&attr.id))
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Aggregate {
    #[serde(with = "serde_arc")]
    pub input: Arc<LogicalPlan>,
    pub keys: Vec<Expr>,
    pub functions: Vec<Expr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Subquery {
    #[serde(with = "serde_arc")]
    pub input: Arc<LogicalPlan>,
    pub alias: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct With {
    #[serde(with = "serde_arc")]
    pub input: Arc<LogicalPlan>,
    #[serde(with = "serde_arc::map")]
    pub cte: HashMap<String, Arc<LogicalPlan>>,
}

impl LogicalPlan {
    /// Plan children, in constructor order. The CTE map of [`With`] is not a
    /// child: its references were already substituted by the resolver.
    pub fn inputs(&self) -> Vec<&Arc<LogicalPlan>> {
        match self {
            LogicalPlan::LocalRelation(_)
            | LogicalPlan::SingleRowRelation
            | LogicalPlan::EmptyRelation(_) => vec![],
            LogicalPlan::Project(p) => vec![&p.input],
            LogicalPlan::Filter(f) => vec![&f.input],
            LogicalPlan::Limit(l) => vec![&l.input],
            LogicalPlan::Sort(s) => vec![&s.input],
            LogicalPlan::Distinct(d) => vec![&d.input],
            LogicalPlan::Union(u) => vec![&u.left, &u.right],
            LogicalPlan::Intersect(i) => vec![&i.left, &i.right],
            LogicalPlan::Except(e) => vec![&e.left, &e.right],
            LogicalPlan::Join(j) => vec![&j.left, &j.right],
            LogicalPlan::Aggregate(a) => vec![&a.input],
            LogicalPlan::Subquery(s) => vec![&s.input],
            LogicalPlan::With(w) => vec![&w.input],
        }
    }

    /// Top-level expressions of this node (not recursed into).
    pub fn expressions(&self) -> Vec<&Expr> {
        match self {
            LogicalPlan::Project(p) => p.items.iter().collect(),
            LogicalPlan::Filter(f) => vec![&f.predicate],
            LogicalPlan::Limit(l) => vec![&l.count],
            LogicalPlan::Sort(s) => s.order.iter().collect(),
            LogicalPlan::Join(j) => j.condition.iter().collect(),
            LogicalPlan::Aggregate(a) => a.keys.iter().chain(a.functions.iter()).collect(),
            _ => vec![],
        }
    }

    /// Output schema, or why it cannot be computed.
    pub fn try_output(&self) -> Result<Vec<AttributeRef>, LogicalPlanError> {
        match self {
            LogicalPlan::LocalRelation(rel) => Ok(rel.output.clone()),
            LogicalPlan::SingleRowRelation => Ok(vec![]),
            LogicalPlan::EmptyRelation(rel) => Ok(rel.output.clone()),

            LogicalPlan::Project(p) => {
                if p.items.is_empty() {
                    return Err(LogicalPlanError::EmptyProjectList);
                }
                p.items
                    .iter()
                    .map(|item| {
                        item.to_attribute()
                            .ok_or_else(|| LogicalPlanError::NotNamed(item.to_string()))
                    })
                    .collect()
            }

            LogicalPlan::Filter(f) => f.input.try_output(),
            LogicalPlan::Limit(l) => l.input.try_output(),
            LogicalPlan::Sort(s) => s.input.try_output(),
            LogicalPlan::Distinct(d) => d.input.try_output(),

            LogicalPlan::Union(u) => {
                let (left, right) = zipped_set_op_outputs(&u.left, &u.right)?;
                Ok(left
                    .into_iter()
                    .zip(right)
                    .map(|(l, r)| {
                        let data_type =
                            widest(&l.data_type, &r.data_type).unwrap_or_else(|_| l.data_type.clone());
                        AttributeRef {
                            data_type,
                            nullable: l.nullable || r.nullable,
                            ..l
                        }
                    })
                    .collect())
            }

            LogicalPlan::Intersect(i) => {
                let (left, right) = zipped_set_op_outputs(&i.left, &i.right)?;
                Ok(left
                    .into_iter()
                    .zip(right)
                    .map(|(l, r)| AttributeRef {
                        nullable: l.nullable && r.nullable,
                        ..l
                    })
                    .collect())
            }

            LogicalPlan::Except(e) => {
                zipped_set_op_outputs(&e.left, &e.right)?;
                e.left.try_output()
            }

            LogicalPlan::Join(j) => {
                let left = j.left.try_output()?;
                let right = j.right.try_output()?;
                let force_nullable =
                    |attrs: Vec<AttributeRef>| attrs.into_iter().map(|a| a.with_nullable(true));
                Ok(match j.join_type {
                    JoinType::Inner => left.into_iter().chain(right).collect(),
                    JoinType::LeftSemi => left,
                    JoinType::LeftOuter => left.into_iter().chain(force_nullable(right)).collect(),
                    JoinType::RightOuter => force_nullable(left).chain(right).collect(),
                    JoinType::FullOuter => {
                        force_nullable(left).chain(force_nullable(right)).collect()
                    }
                })
            }

            LogicalPlan::Aggregate(a) => a
                .keys
                .iter()
                .chain(a.functions.iter())
                .map(|item| {
                    item.to_attribute()
                        .ok_or_else(|| LogicalPlanError::NotNamed(item.to_string()))
                })
                .collect(),

            LogicalPlan::Subquery(s) => Ok(s
                .input
                .try_output()?
                .into_iter()
                .map(|a| a.with_qualifier(&s.alias))
                .collect()),

            LogicalPlan::With(w) => w.input.try_output(),
        }
    }

    /// Output schema.
    ///
    /// Panics with full tree context when invoked on a plan whose schema is
    /// undefined; callers that expect failure use [`LogicalPlan::try_output`].
    pub fn output(&self) -> Vec<AttributeRef> {
        self.try_output()
            .unwrap_or_else(|e| panic!("{}\n{}", e, self))
    }

    /// The set of attribute ids this node's children expose.
    pub fn input_ids(&self) -> HashSet<ExprId> {
        self.inputs()
            .iter()
            .flat_map(|child| child.output())
            .map(|a| a.id)
            .collect()
    }

    /// A plan is resolved iff every reference in the subtree binds to a
    /// child output attribute by id, schemas are computable, and the
    /// deduplication invariant holds for binary operators.
    pub fn resolved(&self) -> bool {
        self.inputs().iter().all(|child| child.resolved()) && self.local_resolved()
    }

    fn local_resolved(&self) -> bool {
        if self.try_output().is_err() {
            return false;
        }
        if let (Some(left), Some(right)) = (self.inputs().first(), self.inputs().get(1)) {
            let left_ids: HashSet<ExprId> =
                left.output().into_iter().map(|a| a.id).collect();
            if right.output().iter().any(|a| left_ids.contains(&a.id)) {
                return false;
            }
        }
        let bound = self.input_ids();
        self.expressions()
            .into_iter()
            .all(|expr| expr.references().is_subset(&bound))
    }

    fn describe(&self) -> String {
        fn attrs(output: &[AttributeRef]) -> String {
            output
                .iter()
                .map(|a| format!("{}{}: {}", a.name, a.id, a.data_type))
                .collect::<Vec<_>>()
                .join(", ")
        }
        fn exprs(items: &[Expr]) -> String {
            items
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
        match self {
            LogicalPlan::LocalRelation(rel) => format!(
                "LocalRelation [{}], rows={}",
                attrs(&rel.output),
                rel.rows.len()
            ),
            LogicalPlan::SingleRowRelation => "SingleRowRelation".to_string(),
            LogicalPlan::EmptyRelation(rel) => format!("EmptyRelation [{}]", attrs(&rel.output)),
            LogicalPlan::Project(p) => format!("Project [{}]", exprs(&p.items)),
            LogicalPlan::Filter(f) => format!("Filter [{}]", f.predicate),
            LogicalPlan::Limit(l) => format!("Limit [{}]", l.count),
            LogicalPlan::Sort(s) => format!("Sort [{}]", exprs(&s.order)),
            LogicalPlan::Distinct(_) => "Distinct".to_string(),
            LogicalPlan::Union(_) => "Union".to_string(),
            LogicalPlan::Intersect(_) => "Intersect".to_string(),
            LogicalPlan::Except(_) => "Except".to_string(),
            LogicalPlan::Join(j) => match &j.condition {
                Some(cond) => format!("Join [{}, {}]", j.join_type, cond),
                None => format!("Join [{}]", j.join_type),
            },
            LogicalPlan::Aggregate(a) => format!(
                "Aggregate [keys=[{}], functions=[{}]]",
                exprs(&a.keys),
                exprs(&a.functions)
            ),
            LogicalPlan::Subquery(s) => format!("Subquery [{}]", s.alias),
            LogicalPlan::With(w) => {
                let mut names: Vec<&str> = w.cte.keys().map(|k| k.as_str()).collect();
                names.sort_unstable();
                format!("With [{}]", names.join(", "))
            }
        }
    }

    fn fmt_with_tree(
        &self,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        is_last: bool,
        is_root: bool,
    ) -> fmt::Result {
        let (branch, next_prefix) = if is_last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };

        if is_root {
            writeln!(f, "{}", self.describe())?;
        } else {
            writeln!(f, "{}{}{}", prefix, branch, self.describe())?;
        }

        let children = self.inputs();
        let last = children.len().saturating_sub(1);
        for (i, child) in children.into_iter().enumerate() {
            let child_prefix = if is_root {
                String::new()
            } else {
                format!("{}{}", prefix, next_prefix)
            };
            child.fmt_with_tree(f, &child_prefix, i == last, false)?;
        }
        Ok(())
    }
}

/// Apply `f` to each top-level expression of the node, rebuilding it only
/// if one of them changed.
pub fn map_expressions<F>(plan: &Arc<LogicalPlan>, f: &mut F) -> Transformed<Arc<LogicalPlan>>
where
    F: FnMut(&Expr) -> Transformed<Expr>,
{
    let mut changed = false;
    let mut apply_one = |expr: &Expr, changed: &mut bool| {
        let tf = f(expr);
        *changed |= tf.is_yes();
        tf.into_inner()
    };
    let rebuilt = match plan.as_ref() {
        LogicalPlan::Project(p) => LogicalPlan::Project(Project {
            input: p.input.clone(),
            items: p
                .items
                .iter()
                .map(|item| apply_one(item, &mut changed))
                .collect(),
        }),
        LogicalPlan::Filter(filter) => LogicalPlan::Filter(Filter {
            input: filter.input.clone(),
            predicate: apply_one(&filter.predicate, &mut changed),
        }),
        LogicalPlan::Limit(limit) => LogicalPlan::Limit(Limit {
            input: limit.input.clone(),
            count: apply_one(&limit.count, &mut changed),
        }),
        LogicalPlan::Sort(sort) => LogicalPlan::Sort(Sort {
            input: sort.input.clone(),
            order: sort
                .order
                .iter()
                .map(|key| apply_one(key, &mut changed))
                .collect(),
        }),
        LogicalPlan::Join(join) => LogicalPlan::Join(Join {
            left: join.left.clone(),
            right: join.right.clone(),
            join_type: join.join_type,
            condition: join
                .condition
                .as_ref()
                .map(|cond| apply_one(cond, &mut changed)),
        }),
        LogicalPlan::Aggregate(agg) => LogicalPlan::Aggregate(Aggregate {
            input: agg.input.clone(),
            keys: agg
                .keys
                .iter()
                .map(|key| apply_one(key, &mut changed))
                .collect(),
            functions: agg
                .functions
                .iter()
                .map(|func| apply_one(func, &mut changed))
                .collect(),
        }),
        _ => return Transformed::No(plan.clone()),
    };
    if changed {
        Transformed::Yes(Arc::new(rebuilt))
    } else {
        Transformed::No(plan.clone())
    }
}

/// A version of the plan with strictly typed expressions and any required
/// casts inserted, or the type-check failure preventing one.
pub fn strictly_typed(plan: &Arc<LogicalPlan>) -> Result<Arc<LogicalPlan>, TypeCheckError> {
    let typed = match plan.as_ref() {
        LogicalPlan::LocalRelation(_)
        | LogicalPlan::SingleRowRelation
        | LogicalPlan::EmptyRelation(_) => return Ok(plan.clone()),

        LogicalPlan::Project(p) => LogicalPlan::Project(Project {
            input: strictly_typed(&p.input)?,
            items: p
                .items
                .iter()
                .map(|item| item.strictly_typed())
                .collect::<Result<_, _>>()?,
        }),

        LogicalPlan::Filter(filter) => {
            let predicate = filter.predicate.strictly_typed()?;
            let actual = predicate.data_type();
            if actual != DataType::Boolean {
                return Err(TypeCheckError::NonBooleanPredicate {
                    predicate: predicate.to_string(),
                    actual: actual.sql_name(),
                });
            }
            LogicalPlan::Filter(Filter {
                input: strictly_typed(&filter.input)?,
                predicate,
            })
        }

        LogicalPlan::Limit(limit) => {
            let count = limit.count.strictly_typed()?;
            if !count.foldable() || !count.data_type().is_integral() {
                return Err(TypeCheckError::NonIntegralLimit {
                    count: count.to_string(),
                });
            }
            LogicalPlan::Limit(Limit {
                input: strictly_typed(&limit.input)?,
                count,
            })
        }

        LogicalPlan::Sort(sort) => LogicalPlan::Sort(Sort {
            input: strictly_typed(&sort.input)?,
            order: sort
                .order
                .iter()
                .map(|key| key.strictly_typed())
                .collect::<Result<_, _>>()?,
        }),

        LogicalPlan::Distinct(distinct) => LogicalPlan::Distinct(Distinct {
            input: strictly_typed(&distinct.input)?,
        }),

        LogicalPlan::Union(u) => {
            let (left, right) = aligned_set_op_children(&u.left, &u.right)?;
            LogicalPlan::Union(Union { left, right })
        }
        LogicalPlan::Intersect(i) => {
            let (left, right) = aligned_set_op_children(&i.left, &i.right)?;
            LogicalPlan::Intersect(Intersect { left, right })
        }
        LogicalPlan::Except(e) => {
            let (left, right) = aligned_set_op_children(&e.left, &e.right)?;
            LogicalPlan::Except(Except { left, right })
        }

        LogicalPlan::Join(join) => {
            let condition = join
                .condition
                .as_ref()
                .map(|cond| cond.strictly_typed())
                .transpose()?;
            if let Some(cond) = &condition {
                let actual = cond.data_type();
                if actual != DataType::Boolean {
                    return Err(TypeCheckError::NonBooleanJoinCondition {
                        condition: cond.to_string(),
                        actual: actual.sql_name(),
                    });
                }
            }
            LogicalPlan::Join(Join {
                left: strictly_typed(&join.left)?,
                right: strictly_typed(&join.right)?,
                join_type: join.join_type,
                condition,
            })
        }

        LogicalPlan::Aggregate(agg) => LogicalPlan::Aggregate(Aggregate {
            input: strictly_typed(&agg.input)?,
            keys: agg
                .keys
                .iter()
                .map(|key| key.strictly_typed())
                .collect::<Result<_, _>>()?,
            functions: agg
                .functions
                .iter()
                .map(|func| func.strictly_typed())
                .collect::<Result<_, _>>()?,
        }),

        LogicalPlan::Subquery(s) => LogicalPlan::Subquery(Subquery {
            input: strictly_typed(&s.input)?,
            alias: s.alias.clone(),
        }),

        LogicalPlan::With(w) => LogicalPlan::With(With {
            input: strictly_typed(&w.input)?,
            cte: w.cte.clone(),
        }),
    };
    Ok(Arc::new(typed))
}

fn zipped_set_op_outputs(
    left: &Arc<LogicalPlan>,
    right: &Arc<LogicalPlan>,
) -> Result<(Vec<AttributeRef>, Vec<AttributeRef>), LogicalPlanError> {
    let left = left.try_output()?;
    let right = right.try_output()?;
    if left.len() != right.len() {
        return Err(LogicalPlanError::SetOpArityMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    Ok((left, right))
}

/// Strictly type both branches of a set operator: names must align in
/// order, and every column pair must widen to a common type, with casts
/// inserted into branches that do not already match.
fn aligned_set_op_children(
    left: &Arc<LogicalPlan>,
    right: &Arc<LogicalPlan>,
) -> Result<(Arc<LogicalPlan>, Arc<LogicalPlan>), TypeCheckError> {
    let left = strictly_typed(left)?;
    let right = strictly_typed(right)?;
    let (left_out, right_out) = zipped_set_op_outputs(&left, &right)?;
    for (index, (l, r)) in left_out.iter().zip(right_out.iter()).enumerate() {
        if l.name != r.name {
            return Err(TypeCheckError::SetOpNameMismatch {
                index,
                left: l.name.clone(),
                right: r.name.clone(),
            });
        }
    }
    let targets: Vec<DataType> = left_out
        .iter()
        .zip(right_out.iter())
        .map(|(l, r)| widest(&l.data_type, &r.data_type))
        .collect::<Result<_, _>>()?;
    Ok((
        widen_branch(&left, left_out, &targets),
        widen_branch(&right, right_out, &targets),
    ))
}

fn widen_branch(
    branch: &Arc<LogicalPlan>,
    output: Vec<AttributeRef>,
    targets: &[DataType],
) -> Arc<LogicalPlan> {
    if output
        .iter()
        .zip(targets)
        .all(|(attr, target)| &attr.data_type == target)
    {
        return branch.clone();
    }
    let items = output
        .into_iter()
        .zip(targets)
        .map(|(attr, target)| {
            let name = attr.name.clone();
            let expr = Expr::Attribute(attr);
            if &expr.data_type() == target {
                expr
            } else {
                Expr::Alias(Box::new(Alias::new(
                    promote_data_type(expr, target),
                    name,
                )))
            }
        })
        .collect();
    Arc::new(LogicalPlan::Project(Project {
        input: branch.clone(),
        items,
    }))
}

/// Restore the deduplication invariant for a prospective self-join: freshen
/// every multi-instance relation on the right side whose attribute ids
/// collide with `left_ids`, and rewrite references throughout the right
/// subtree to follow.
pub fn deduplicate_right(
    left_ids: &HashSet<ExprId>,
    right: &Arc<LogicalPlan>,
) -> Arc<LogicalPlan> {
    use std::cell::RefCell;

    let mapping: RefCell<HashMap<ExprId, AttributeRef>> = RefCell::new(HashMap::new());
    let record = |old: &[AttributeRef], fresh: &[AttributeRef]| {
        let mut map = mapping.borrow_mut();
        for (o, n) in old.iter().zip(fresh.iter()) {
            map.insert(o.id, n.clone());
        }
    };

    let replaced = right
        .transform_up(&|plan: &Arc<LogicalPlan>| match plan.as_ref() {
            LogicalPlan::LocalRelation(rel)
                if rel.output.iter().any(|a| left_ids.contains(&a.id)) =>
            {
                let fresh = rel.new_instance();
                record(&rel.output, &fresh.output);
                Some(Arc::new(LogicalPlan::LocalRelation(fresh)))
            }
            LogicalPlan::EmptyRelation(rel)
                if rel.output.iter().any(|a| left_ids.contains(&a.id)) =>
            {
                let fresh = rel.new_instance();
                record(&rel.output, &fresh.output);
                Some(Arc::new(LogicalPlan::EmptyRelation(fresh)))
            }
            _ => None,
        })
        .into_inner();

    let mapping = mapping.into_inner();
    if mapping.is_empty() {
        return replaced;
    }
    replaced
        .transform_up(&|plan: &Arc<LogicalPlan>| {
            let tf = map_expressions(plan, &mut |expr| {
                expr.transform_up(&|e| match e {
                    Expr::Attribute(attr) => mapping
                        .get(&attr.id)
                        .map(|fresh| Expr::Attribute(fresh.clone())),
                    _ => None,
                })
            });
            if tf.is_yes() {
                Some(tf.into_inner())
            } else {
                None
            }
        })
        .into_inner()
}

impl TreeNode for Arc<LogicalPlan> {
    fn children(&self) -> Vec<&Arc<LogicalPlan>> {
        self.as_ref().inputs()
    }

    fn with_new_children(&self, children: Vec<Arc<LogicalPlan>>) -> Arc<LogicalPlan> {
        let arity = self.as_ref().inputs().len();
        assert_eq!(
            children.len(),
            arity,
            "with_new_children arity mismatch for `{}`",
            self.as_ref().describe()
        );
        let mut iter = children.into_iter();
        macro_rules! next {
            () => {
                iter.next().expect("arity checked")
            };
        }
        let rebuilt = match self.as_ref() {
            LogicalPlan::LocalRelation(_)
            | LogicalPlan::SingleRowRelation
            | LogicalPlan::EmptyRelation(_) => return self.clone(),
            LogicalPlan::Project(p) => LogicalPlan::Project(Project {
                input: next!(),
                items: p.items.clone(),
            }),
            LogicalPlan::Filter(f) => LogicalPlan::Filter(Filter {
                input: next!(),
                predicate: f.predicate.clone(),
            }),
            LogicalPlan::Limit(l) => LogicalPlan::Limit(Limit {
                input: next!(),
                count: l.count.clone(),
            }),
            LogicalPlan::Sort(s) => LogicalPlan::Sort(Sort {
                input: next!(),
                order: s.order.clone(),
            }),
            LogicalPlan::Distinct(_) => LogicalPlan::Distinct(Distinct { input: next!() }),
            LogicalPlan::Union(_) => LogicalPlan::Union(Union {
                left: next!(),
                right: next!(),
            }),
            LogicalPlan::Intersect(_) => LogicalPlan::Intersect(Intersect {
                left: next!(),
                right: next!(),
            }),
            LogicalPlan::Except(_) => LogicalPlan::Except(Except {
                left: next!(),
                right: next!(),
            }),
            LogicalPlan::Join(j) => LogicalPlan::Join(Join {
                left: next!(),
                right: next!(),
                join_type: j.join_type,
                condition: j.condition.clone(),
            }),
            LogicalPlan::Aggregate(a) => LogicalPlan::Aggregate(Aggregate {
                input: next!(),
                keys: a.keys.clone(),
                functions: a.functions.clone(),
            }),
            LogicalPlan::Subquery(s) => LogicalPlan::Subquery(Subquery {
                input: next!(),
                alias: s.alias.clone(),
            }),
            LogicalPlan::With(w) => LogicalPlan::With(With {
                input: next!(),
                cte: w.cte.clone(),
            }),
        };
        Arc::new(rebuilt)
    }

    fn node_label(&self) -> String {
        self.as_ref().describe()
    }

    fn ref_eq(&self, other: &Arc<LogicalPlan>) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_tree(f, "", true, true)
    }
}
