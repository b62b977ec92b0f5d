//! Data types for the plan algebra.
//!
//! A closed set of primitive types plus `Struct`, with the numeric widening
//! lattice used by implicit promotion:
//!
//! ```text
//! Byte < Short < Int < Long < Float < Double
//! ```
//!
//! `Boolean`, `String`, and `Struct` have no widening partners. Nullability is
//! not part of a type; it is a separate bit carried by attributes, literals,
//! and expressions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::expr::errors::TypeMismatchError;

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Struct(Vec<StructField>),
}

/// A named, typed, nullable field of a [`DataType::Struct`].
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl DataType {
    /// SQL name of the type, e.g. `TINYINT` for `Byte`.
    pub fn sql_name(&self) -> String {
        match self {
            DataType::Boolean => "BOOLEAN".to_string(),
            DataType::Byte => "TINYINT".to_string(),
            DataType::Short => "SMALLINT".to_string(),
            DataType::Int => "INT".to_string(),
            DataType::Long => "BIGINT".to_string(),
            DataType::Float => "FLOAT".to_string(),
            DataType::Double => "DOUBLE".to_string(),
            DataType::String => "STRING".to_string(),
            DataType::Struct(fields) => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}: {}", f.name, f.data_type.sql_name()))
                    .collect();
                format!("STRUCT<{}>", rendered.join(", "))
            }
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integral() || self.is_fractional()
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            DataType::Byte | DataType::Short | DataType::Int | DataType::Long
        )
    }

    pub fn is_fractional(&self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }

    /// Types with a total order usable by `<`, `<=`, `>`, `>=`.
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || matches!(self, DataType::String)
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, DataType::Struct(_))
    }

    /// Position on the numeric widening lattice, `None` for non-numerics.
    fn numeric_rank(&self) -> Option<u8> {
        match self {
            DataType::Byte => Some(0),
            DataType::Short => Some(1),
            DataType::Int => Some(2),
            DataType::Long => Some(3),
            DataType::Float => Some(4),
            DataType::Double => Some(5),
            _ => None,
        }
    }

    /// Strict lattice order: `true` iff `self` implicitly widens to `other`
    /// and the two are not the same type.
    pub fn narrower_than(&self, other: &DataType) -> bool {
        match (self.numeric_rank(), other.numeric_rank()) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    /// `true` iff a value of `self` can be used where `other` is expected
    /// without an explicit cast.
    pub fn widens_to(&self, other: &DataType) -> bool {
        self == other || self.narrower_than(other)
    }
}

/// Least upper bound of two types on the widening lattice.
///
/// Equal types are their own bound; distinct numeric types resolve to the
/// wider one; everything else is incomparable and fails.
pub fn widest(left: &DataType, right: &DataType) -> Result<DataType, TypeMismatchError> {
    if left == right {
        return Ok(left.clone());
    }
    match (left.numeric_rank(), right.numeric_rank()) {
        (Some(a), Some(b)) => Ok(if a < b { right.clone() } else { left.clone() }),
        _ => Err(TypeMismatchError::Incomparable {
            left: left.sql_name(),
            right: right.sql_name(),
        }),
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_name())
    }
}
