//! Expression id allocation behavior.
//!
//! These tests touch the process-wide id counter, so they are serialized
//! against each other; assertions are written to tolerate ids minted
//! concurrently by the rest of the suite.

use quarry::expr::{reset_expr_id_counter, Alias, AttributeRef, Expr, ExprId};
use quarry::types::DataType;
use serial_test::serial;

#[test]
#[serial]
fn test_fresh_ids_are_monotonic_within_a_thread() {
    let a = ExprId::fresh();
    let b = ExprId::fresh();
    let c = ExprId::fresh();
    assert!(a < b);
    assert!(b < c);
}

#[test]
#[serial]
fn test_reset_rewinds_the_counter() {
    reset_expr_id_counter();
    for _ in 0..1000 {
        ExprId::fresh();
    }
    let high = ExprId::fresh();
    reset_expr_id_counter();
    let low = ExprId::fresh();
    assert!(low < high);
}

#[test]
#[serial]
fn test_new_instance_mints_a_fresh_id() {
    let attr = AttributeRef::new("a", DataType::Int, false);
    let fresh = attr.new_instance();
    assert_ne!(attr.id, fresh.id);
    assert_eq!(attr.name, fresh.name);
    assert_eq!(attr.data_type, fresh.data_type);
    assert!(!attr.same_by_id(&fresh));
}

#[test]
#[serial]
fn test_alias_id_survives_into_attribute() {
    let attr = AttributeRef::new("a", DataType::Int, false);
    let alias = Alias::new(Expr::Attribute(attr), "renamed");
    let id = alias.id;
    let out = Expr::Alias(Box::new(alias)).to_attribute().unwrap();
    assert_eq!(out.id, id);
    assert_eq!(out.name, "renamed");
}
