//! Unit tests - cross-module suites exercising the public crate API.

mod expression_id_tests;
mod tree_framework_tests;
mod widening_tests;
