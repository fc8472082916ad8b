//! # trellis-testkit — Test Support for the Schema Engine
//!
//! Companion crate to `trellis-schema`. Not published; it exists so the
//! round-trip property harness and the strategy-equivalence assertion
//! helpers are available to every integration test without duplication.
//!
//! - [`arbitrary`] — derive proptest strategies from schema ASTs.
//! - [`harness`] — the round-trip property and concrete-outcome assertions
//!   that re-run every scenario under both execution strategies.

pub mod arbitrary;
pub mod harness;

pub use arbitrary::{value_strategy, ArbitraryError};
pub use harness::{
    expect_encode_failure, expect_encode_success, expect_parse_failure, expect_parse_failure_tree,
    expect_parse_success, init_tracing, roundtrip,
};
