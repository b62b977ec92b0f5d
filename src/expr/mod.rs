//! Expression Algebra
//!
//! Immutable expression trees carried by logical plan nodes. These sit
//! between the analyzer's resolved output and the physical planner's input;
//! every optimizer rule that touches a predicate or projection rewrites
//! these trees.
//!
//! # Module Organization
//!
//! - **mod.rs** (this file): type definitions, derived properties, Display
//! - **typing.rs**: strict typing and implicit cast insertion
//! - **evaluator.rs**: plan-time evaluation of foldable expressions
//! - **combinators.rs**: helper builders (AND/OR/literals) and splitting
//! - **predicates.rs**: CNF conversion and reference-set queries
//! - **errors.rs**: error types
//!
//! # Identity
//!
//! Attributes, aliases, and the aggregation placeholders carry an [`ExprId`]
//! minted from a process-wide counter. Identity is by id, never by name:
//! renaming an attribute does not change what it refers to, and every
//! reference-set operation compares ids.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::tree::TreeNode;
use crate::types::{widest, DataType};

pub mod combinators;
pub mod errors;
pub mod evaluator;
pub mod predicates;
pub mod typing;

static EXPR_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Globally unique expression id. Survives renaming; provides referential
/// identity independent of name or cast.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ExprId(pub u64);

impl ExprId {
    /// Mint a fresh id from the process-wide counter.
    pub fn fresh() -> ExprId {
        ExprId(EXPR_ID_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

/// Reset the id counter (useful for testing to get predictable ids).
#[allow(dead_code)]
pub fn reset_expr_id_counter() {
    EXPR_ID_COUNTER.store(1, Ordering::SeqCst);
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A concrete runtime value, as carried by literals and relation rows.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The natural type of the value; `None` for `Null`, which takes its
    /// type from the enclosing literal.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Byte(_) => Some(DataType::Byte),
            Value::Short(_) => Some(DataType::Short),
            Value::Int(_) => Some(DataType::Int),
            Value::Long(_) => Some(DataType::Long),
            Value::Float(_) => Some(DataType::Float),
            Value::Double(_) => Some(DataType::Double),
            Value::String(_) => Some(DataType::String),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// A literal value with an explicit type. Nullable iff the value is null.
    Literal(Literal),

    /// Reference to an output column of a plan, resolved by id.
    Attribute(AttributeRef),

    /// Renames its child; the alias id becomes the attribute id downstream.
    Alias(Box<Alias>),

    Cast(Box<Cast>),

    /// Binary operator application (arithmetic, comparison, AND/OR).
    Binary(Box<BinaryExpr>),

    /// Arithmetic negation.
    Negate(Box<Expr>),

    /// Logical negation, three-valued: NOT(NULL) = NULL.
    Not(Box<Expr>),

    IsNull(Box<Expr>),

    IsNotNull(Box<Expr>),

    If(Box<IfExpr>),

    /// First non-null argument, else null.
    Coalesce(Vec<Expr>),

    AggregateFunction(Box<AggregateFnCall>),

    /// Analyzer-emitted placeholder for a grouping key.
    GroupingAlias(Box<GroupingAlias>),

    /// Analyzer-emitted placeholder for an aggregate output column.
    AggregationAlias(Box<AggregationAlias>),

    /// Sort key with direction; only valid under a Sort operator.
    SortOrder(Box<SortOrderExpr>),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Literal {
    pub value: Value,
    pub data_type: DataType,
}

impl Literal {
    pub fn new(value: Value, data_type: DataType) -> Self {
        Literal { value, data_type }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AttributeRef {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub id: ExprId,
    pub qualifier: Option<String>,
}

impl AttributeRef {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        AttributeRef {
            name: name.into(),
            data_type,
            nullable,
            id: ExprId::fresh(),
            qualifier: None,
        }
    }

    /// Referential equality: same id, regardless of name or qualifier.
    pub fn same_by_id(&self, other: &AttributeRef) -> bool {
        self.id == other.id
    }

    pub fn with_qualifier(&self, qualifier: impl Into<String>) -> Self {
        AttributeRef {
            qualifier: Some(qualifier.into()),
            ..self.clone()
        }
    }

    pub fn with_nullable(&self, nullable: bool) -> Self {
        AttributeRef {
            nullable,
            ..self.clone()
        }
    }

    /// Same column under a fresh id, for multi-instance relations.
    pub fn new_instance(&self) -> Self {
        AttributeRef {
            id: ExprId::fresh(),
            ..self.clone()
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub child: Expr,
    pub id: ExprId,
}

impl Alias {
    pub fn new(child: Expr, name: impl Into<String>) -> Self {
        Alias {
            name: name.into(),
            child,
            id: ExprId::fresh(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Cast {
    pub child: Expr,
    pub target: DataType,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOperator {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Plus
                | BinaryOperator::Minus
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::NotEq
                | BinaryOperator::Lt
                | BinaryOperator::LtEq
                | BinaryOperator::Gt
                | BinaryOperator::GtEq
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    /// Comparisons that only hold on ordered types; `Eq`/`NotEq` work on any
    /// reconcilable pair.
    pub fn requires_ordering(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Lt | BinaryOperator::LtEq | BinaryOperator::Gt | BinaryOperator::GtEq
        )
    }

    /// The comparison produced by pushing a NOT through this one.
    pub fn negated(&self) -> Option<BinaryOperator> {
        match self {
            BinaryOperator::Eq => Some(BinaryOperator::NotEq),
            BinaryOperator::NotEq => Some(BinaryOperator::Eq),
            BinaryOperator::Lt => Some(BinaryOperator::GtEq),
            BinaryOperator::LtEq => Some(BinaryOperator::Gt),
            BinaryOperator::Gt => Some(BinaryOperator::LtEq),
            BinaryOperator::GtEq => Some(BinaryOperator::Lt),
            _ => None,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOperator,
    pub left: Expr,
    pub right: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct IfExpr {
    pub condition: Expr,
    pub then_value: Expr,
    pub else_value: Expr,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Avg => "AVG",
        };
        f.write_str(name)
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AggregateFnCall {
    pub func: AggregateFunction,
    pub child: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GroupingAlias {
    pub name: String,
    pub child: Expr,
    pub id: ExprId,
}

impl GroupingAlias {
    pub fn new(child: Expr) -> Self {
        let id = ExprId::fresh();
        GroupingAlias {
            name: format!("group_{}", id.0),
            child,
            id,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AggregationAlias {
    pub name: String,
    pub child: Expr,
    pub id: ExprId,
}

impl AggregationAlias {
    pub fn new(child: Expr) -> Self {
        let id = ExprId::fresh();
        AggregationAlias {
            name: format!("agg_{}", id.0),
            child,
            id,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("ASC"),
            SortDirection::Desc => f.write_str("DESC"),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SortOrderExpr {
    pub child: Expr,
    pub direction: SortDirection,
}

impl Expr {
    /// The type this expression evaluates to.
    ///
    /// Panics when invoked on an ill-typed node (e.g. arithmetic over
    /// incomparable operands); use [`Expr::strictly_typed`]
    /// (in `typing.rs`) for the fallible check.
    pub fn data_type(&self) -> DataType {
        match self {
            Expr::Literal(lit) => lit.data_type.clone(),
            Expr::Attribute(attr) => attr.data_type.clone(),
            Expr::Alias(alias) => alias.child.data_type(),
            Expr::Cast(cast) => cast.target.clone(),
            Expr::Binary(binary) => {
                if binary.op.is_arithmetic() {
                    widest(&binary.left.data_type(), &binary.right.data_type()).unwrap_or_else(
                        |e| panic!("type of `{}` is undefined: {}", self, e),
                    )
                } else {
                    DataType::Boolean
                }
            }
            Expr::Negate(child) => child.data_type(),
            Expr::Not(_) | Expr::IsNull(_) | Expr::IsNotNull(_) => DataType::Boolean,
            Expr::If(if_expr) => widest(
                &if_expr.then_value.data_type(),
                &if_expr.else_value.data_type(),
            )
            .unwrap_or_else(|e| panic!("type of `{}` is undefined: {}", self, e)),
            Expr::Coalesce(args) => {
                let mut iter = args.iter();
                let first = iter
                    .next()
                    .unwrap_or_else(|| panic!("COALESCE requires at least one argument"));
                iter.fold(first.data_type(), |acc, arg| {
                    widest(&acc, &arg.data_type())
                        .unwrap_or_else(|e| panic!("type of `{}` is undefined: {}", self, e))
                })
            }
            Expr::AggregateFunction(agg) => match agg.func {
                AggregateFunction::Count => DataType::Long,
                AggregateFunction::Sum => {
                    if agg.child.data_type().is_fractional() {
                        DataType::Double
                    } else {
                        DataType::Long
                    }
                }
                AggregateFunction::Avg => DataType::Double,
                AggregateFunction::Min | AggregateFunction::Max => agg.child.data_type(),
            },
            Expr::GroupingAlias(alias) => alias.child.data_type(),
            Expr::AggregationAlias(alias) => alias.child.data_type(),
            Expr::SortOrder(order) => order.child.data_type(),
        }
    }

    /// Whether this expression can evaluate to null.
    pub fn nullable(&self) -> bool {
        match self {
            Expr::Literal(lit) => lit.value.is_null(),
            Expr::Attribute(attr) => attr.nullable,
            Expr::Alias(alias) => alias.child.nullable(),
            Expr::Cast(cast) => cast.child.nullable(),
            Expr::Binary(binary) => match binary.op {
                // Division by zero yields null regardless of operands.
                BinaryOperator::Divide => true,
                _ => binary.left.nullable() || binary.right.nullable(),
            },
            Expr::Negate(child) | Expr::Not(child) => child.nullable(),
            Expr::IsNull(_) | Expr::IsNotNull(_) => false,
            Expr::If(if_expr) => {
                if_expr.condition.nullable()
                    || if_expr.then_value.nullable()
                    || if_expr.else_value.nullable()
            }
            Expr::Coalesce(args) => args.iter().all(|arg| arg.nullable()),
            Expr::AggregateFunction(agg) => !matches!(agg.func, AggregateFunction::Count),
            Expr::GroupingAlias(alias) => alias.child.nullable(),
            Expr::AggregationAlias(alias) => alias.child.nullable(),
            Expr::SortOrder(order) => order.child.nullable(),
        }
    }

    /// Evaluable at plan time: all operands are literals and the operator is
    /// pure. Hereditary, and excludes any attribute reference. Name-binding
    /// expressions (aliases, placeholders) never fold as a whole; their
    /// children fold instead.
    pub fn foldable(&self) -> bool {
        match self {
            Expr::Literal(_) => true,
            Expr::Attribute(_) => false,
            Expr::Alias(_)
            | Expr::GroupingAlias(_)
            | Expr::AggregationAlias(_)
            | Expr::AggregateFunction(_)
            | Expr::SortOrder(_) => false,
            Expr::Cast(cast) => cast.child.foldable(),
            Expr::Binary(binary) => binary.left.foldable() && binary.right.foldable(),
            Expr::Negate(child) | Expr::Not(child) | Expr::IsNull(child) | Expr::IsNotNull(child) => {
                child.foldable()
            }
            Expr::If(if_expr) => {
                if_expr.condition.foldable()
                    && if_expr.then_value.foldable()
                    && if_expr.else_value.foldable()
            }
            Expr::Coalesce(args) => args.iter().all(|arg| arg.foldable()),
        }
    }

    /// Deterministic and side-effect-free. Every operator in this closed
    /// algebra is pure, so the check is structural; only pure expressions may
    /// be reordered across filters or projections.
    pub fn is_pure(&self) -> bool {
        self.children().into_iter().all(|child| child.is_pure())
    }

    /// The set of attribute ids this expression reads.
    pub fn references(&self) -> HashSet<ExprId> {
        let mut ids = HashSet::new();
        self.collect_references(&mut ids);
        ids
    }

    fn collect_references(&self, ids: &mut HashSet<ExprId>) {
        if let Expr::Attribute(attr) = self {
            ids.insert(attr.id);
        }
        for child in self.children() {
            child.collect_references(ids);
        }
    }

    /// Output attribute for name-bearing expressions; `None` otherwise.
    pub fn to_attribute(&self) -> Option<AttributeRef> {
        match self {
            Expr::Attribute(attr) => Some(attr.clone()),
            Expr::Alias(alias) => Some(AttributeRef {
                name: alias.name.clone(),
                data_type: alias.child.data_type(),
                nullable: alias.child.nullable(),
                id: alias.id,
                qualifier: None,
            }),
            Expr::GroupingAlias(alias) => Some(AttributeRef {
                name: alias.name.clone(),
                data_type: alias.child.data_type(),
                nullable: alias.child.nullable(),
                id: alias.id,
                qualifier: None,
            }),
            Expr::AggregationAlias(alias) => Some(AttributeRef {
                name: alias.name.clone(),
                data_type: alias.child.data_type(),
                nullable: alias.child.nullable(),
                id: alias.id,
                qualifier: None,
            }),
            _ => None,
        }
    }

    pub fn as_and(&self) -> Option<(&Expr, &Expr)> {
        match self {
            Expr::Binary(binary) if binary.op == BinaryOperator::And => {
                Some((&binary.left, &binary.right))
            }
            _ => None,
        }
    }

    pub fn as_or(&self) -> Option<(&Expr, &Expr)> {
        match self {
            Expr::Binary(binary) if binary.op == BinaryOperator::Or => {
                Some((&binary.left, &binary.right))
            }
            _ => None,
        }
    }

    pub fn is_true_literal(&self) -> bool {
        matches!(
            self,
            Expr::Literal(Literal {
                value: Value::Boolean(true),
                ..
            })
        )
    }

    pub fn is_false_literal(&self) -> bool {
        matches!(
            self,
            Expr::Literal(Literal {
                value: Value::Boolean(false),
                ..
            })
        )
    }
}

impl TreeNode for Expr {
    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Attribute(_) => vec![],
            Expr::Alias(alias) => vec![&alias.child],
            Expr::Cast(cast) => vec![&cast.child],
            Expr::Binary(binary) => vec![&binary.left, &binary.right],
            Expr::Negate(child) | Expr::Not(child) | Expr::IsNull(child) | Expr::IsNotNull(child) => {
                vec![child]
            }
            Expr::If(if_expr) => vec![
                &if_expr.condition,
                &if_expr.then_value,
                &if_expr.else_value,
            ],
            Expr::Coalesce(args) => args.iter().collect(),
            Expr::AggregateFunction(agg) => vec![&agg.child],
            Expr::GroupingAlias(alias) => vec![&alias.child],
            Expr::AggregationAlias(alias) => vec![&alias.child],
            Expr::SortOrder(order) => vec![&order.child],
        }
    }

    fn with_new_children(&self, children: Vec<Expr>) -> Expr {
        let arity = self.children().len();
        assert_eq!(
            children.len(),
            arity,
            "with_new_children arity mismatch for `{}`",
            self
        );
        let mut iter = children.into_iter();
        // Arity is checked above, so each `next` below is guaranteed to yield.
        macro_rules! next {
            () => {
                iter.next().expect("arity checked")
            };
        }
        match self {
            Expr::Literal(_) | Expr::Attribute(_) => self.clone(),
            Expr::Alias(alias) => Expr::Alias(Box::new(Alias {
                name: alias.name.clone(),
                child: next!(),
                id: alias.id,
            })),
            Expr::Cast(cast) => Expr::Cast(Box::new(Cast {
                child: next!(),
                target: cast.target.clone(),
            })),
            Expr::Binary(binary) => Expr::Binary(Box::new(BinaryExpr {
                op: binary.op,
                left: next!(),
                right: next!(),
            })),
            Expr::Negate(_) => Expr::Negate(Box::new(next!())),
            Expr::Not(_) => Expr::Not(Box::new(next!())),
            Expr::IsNull(_) => Expr::IsNull(Box::new(next!())),
            Expr::IsNotNull(_) => Expr::IsNotNull(Box::new(next!())),
            Expr::If(_) => Expr::If(Box::new(IfExpr {
                condition: next!(),
                then_value: next!(),
                else_value: next!(),
            })),
            Expr::Coalesce(_) => Expr::Coalesce(iter.collect()),
            Expr::AggregateFunction(agg) => Expr::AggregateFunction(Box::new(AggregateFnCall {
                func: agg.func,
                child: next!(),
            })),
            Expr::GroupingAlias(alias) => Expr::GroupingAlias(Box::new(GroupingAlias {
                name: alias.name.clone(),
                child: next!(),
                id: alias.id,
            })),
            Expr::AggregationAlias(alias) => Expr::AggregationAlias(Box::new(AggregationAlias {
                name: alias.name.clone(),
                child: next!(),
                id: alias.id,
            })),
            Expr::SortOrder(order) => Expr::SortOrder(Box::new(SortOrderExpr {
                child: next!(),
                direction: order.direction,
            })),
        }
    }

    fn node_label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{}", lit.value),
            Expr::Attribute(attr) => match &attr.qualifier {
                Some(q) => write!(f, "{}.{}{}", q, attr.name, attr.id),
                None => write!(f, "{}{}", attr.name, attr.id),
            },
            Expr::Alias(alias) => write!(f, "{} AS {}{}", alias.child, alias.name, alias.id),
            Expr::Cast(cast) => write!(f, "CAST({} AS {})", cast.child, cast.target),
            Expr::Binary(binary) => {
                write!(f, "({} {} {})", binary.left, binary.op, binary.right)
            }
            Expr::Negate(child) => write!(f, "(- {})", child),
            Expr::Not(child) => write!(f, "(NOT {})", child),
            Expr::IsNull(child) => write!(f, "({} IS NULL)", child),
            Expr::IsNotNull(child) => write!(f, "({} IS NOT NULL)", child),
            Expr::If(if_expr) => write!(
                f,
                "IF({}, {}, {})",
                if_expr.condition, if_expr.then_value, if_expr.else_value
            ),
            Expr::Coalesce(args) => {
                let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "COALESCE({})", rendered.join(", "))
            }
            Expr::AggregateFunction(agg) => write!(f, "{}({})", agg.func, agg.child),
            Expr::GroupingAlias(alias) => {
                write!(f, "{} AS {}{}", alias.child, alias.name, alias.id)
            }
            Expr::AggregationAlias(alias) => {
                write!(f, "{} AS {}{}", alias.child, alias.name, alias.id)
            }
            Expr::SortOrder(order) => write!(f, "{} {}", order.child, order.direction),
        }
    }
}
