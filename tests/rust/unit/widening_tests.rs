//! Widening lattice tables and algebraic laws.

use quarry::types::{widest, DataType};
use test_case::test_case;

const NUMERICS: [DataType; 6] = [
    DataType::Byte,
    DataType::Short,
    DataType::Int,
    DataType::Long,
    DataType::Float,
    DataType::Double,
];

#[test_case(DataType::Byte, DataType::Short, DataType::Short; "byte_short")]
#[test_case(DataType::Byte, DataType::Double, DataType::Double; "byte_double")]
#[test_case(DataType::Short, DataType::Int, DataType::Int; "short_int")]
#[test_case(DataType::Int, DataType::Long, DataType::Long; "int_long")]
#[test_case(DataType::Long, DataType::Float, DataType::Float; "long_float")]
#[test_case(DataType::Float, DataType::Double, DataType::Double; "float_double")]
#[test_case(DataType::Int, DataType::Int, DataType::Int; "int_int")]
fn test_widest_pairs(a: DataType, b: DataType, expected: DataType) {
    assert_eq!(widest(&a, &b).unwrap(), expected);
}

#[test_case(DataType::Boolean, DataType::Int; "boolean_int")]
#[test_case(DataType::String, DataType::Double; "string_double")]
#[test_case(DataType::Boolean, DataType::String; "boolean_string")]
fn test_widest_incomparable(a: DataType, b: DataType) {
    assert!(widest(&a, &b).is_err());
    assert!(widest(&b, &a).is_err());
}

#[test]
fn test_widening_is_commutative() {
    for a in &NUMERICS {
        for b in &NUMERICS {
            assert_eq!(widest(a, b).unwrap(), widest(b, a).unwrap());
        }
    }
}

#[test]
fn test_widening_is_associative() {
    for a in &NUMERICS {
        for b in &NUMERICS {
            for c in &NUMERICS {
                let left = widest(&widest(a, b).unwrap(), c).unwrap();
                let right = widest(a, &widest(b, c).unwrap()).unwrap();
                assert_eq!(left, right);
            }
        }
    }
}

#[test]
fn test_narrower_than_is_a_strict_total_order_on_numerics() {
    for (i, a) in NUMERICS.iter().enumerate() {
        for (j, b) in NUMERICS.iter().enumerate() {
            assert_eq!(a.narrower_than(b), i < j);
        }
    }
}

#[test_case(DataType::Byte, "TINYINT")]
#[test_case(DataType::Short, "SMALLINT")]
#[test_case(DataType::Int, "INT")]
#[test_case(DataType::Long, "BIGINT")]
#[test_case(DataType::Float, "FLOAT")]
#[test_case(DataType::Double, "DOUBLE")]
#[test_case(DataType::Boolean, "BOOLEAN")]
#[test_case(DataType::String, "STRING")]
fn test_sql_names(data_type: DataType, expected: &str) {
    assert_eq!(data_type.sql_name(), expected);
}
