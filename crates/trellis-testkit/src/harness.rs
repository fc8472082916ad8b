//! # Round-Trip Harness & Strategy-Equivalence Assertions
//!
//! Two layers of checks over a schema:
//!
//! - [`roundtrip`] is the property `decode(encode(x))` is defined and valid
//!   for every generated valid output `x`, run first under the direct
//!   strategy and then through an alternating suspension rewrite driven on a
//!   tokio runtime (success only — wrapped procedures may legitimately
//!   transform values in flight).
//! - The `expect_*` helpers assert one concrete outcome under the direct
//!   strategy, then re-run the `All`- and `Alternate`-rewritten schemas
//!   under the suspendable strategy and require the identical outcome.
//!   Every call is therefore also a strategy-equivalence check.

use std::time::Duration;

use proptest::prelude::*;
use proptest::test_runner::{Config, TestCaseError, TestRunner};
use serde_json::Value;

use trellis_schema::{
    decode, decode_sync, encode, encode_sync, format_flat, format_tree, is, Ast, ParseErrors,
    ParseOptions, SuspendMode, Suspender,
};

use crate::arbitrary::value_strategy;

/// Property-test cases per schema; kept modest because every suspendable
/// case crosses real scheduler yields.
const CASES: u32 = 64;

/// Install an env-filtered subscriber for test logging. Safe to call from
/// every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("building the harness runtime")
}

/// The two rewritten variants every assertion re-runs: all suspension
/// points, and alternating ones.
fn rewrites(schema: &Ast) -> [Ast; 2] {
    [
        Suspender::new(SuspendMode::All)
            .with_delay(Duration::ZERO)
            .rewrite(schema),
        Suspender::new(SuspendMode::Alternate)
            .with_delay(Duration::ZERO)
            .rewrite(schema),
    ]
}

// ---------------------------------------------------------------------------
// Round-trip property
// ---------------------------------------------------------------------------

/// For all generated valid outputs: `decode(encode(x))` succeeds and the
/// result still conforms, under both execution strategies.
pub fn roundtrip(schema: &Ast) {
    let strategy = value_strategy(schema).expect("schema supports value generation");
    let options = ParseOptions::default();

    let mut runner = TestRunner::new(Config {
        cases: CASES,
        ..Config::default()
    });
    runner
        .run(&strategy, |value| {
            prop_assert!(
                is(schema, &value),
                "generator produced a non-conforming value: {value}"
            );
            let encoded = encode_sync(schema, value.clone(), options)
                .map_err(|errors| failure("encode failed", &errors))?;
            let decoded = decode_sync(schema, encoded, options)
                .map_err(|errors| failure("decode-of-encode failed", &errors))?;
            prop_assert!(
                is(schema, &decoded),
                "round-tripped value does not conform: {decoded}"
            );
            Ok(())
        })
        .unwrap_or_else(|error| panic!("round-trip property failed: {error}"));

    let rewritten = Suspender::new(SuspendMode::Alternate)
        .with_delay(Duration::ZERO)
        .rewrite(schema);
    let rt = runtime();
    let mut runner = TestRunner::new(Config {
        cases: CASES,
        ..Config::default()
    });
    runner
        .run(&strategy, |value| {
            let outcome = rt.block_on(async {
                let encoded = encode(&rewritten, value, options).await?;
                decode(&rewritten, encoded, options).await
            });
            outcome
                .map(|_| ())
                .map_err(|errors| failure("suspendable round-trip failed", &errors))
        })
        .unwrap_or_else(|error| panic!("suspendable round-trip property failed: {error}"));
}

fn failure(context: &str, errors: &ParseErrors) -> TestCaseError {
    TestCaseError::fail(format!("{context}: {}", format_flat(errors)))
}

// ---------------------------------------------------------------------------
// Concrete-outcome assertions (direct + both rewrites)
// ---------------------------------------------------------------------------

pub fn expect_parse_success(schema: &Ast, input: &Value, expected: &Value, options: ParseOptions) {
    let direct = decode_sync(schema, input.clone(), options)
        .unwrap_or_else(|errors| panic!("expected parse success, got: {}", format_flat(&errors)));
    assert_eq!(&direct, expected, "direct strategy decoded an unexpected value");

    let rt = runtime();
    for rewritten in rewrites(schema) {
        let suspended = rt
            .block_on(decode(&rewritten, input.clone(), options))
            .unwrap_or_else(|errors| {
                panic!("suspendable strategy diverged: {}", format_flat(&errors))
            });
        assert_eq!(
            suspended, direct,
            "strategies must produce identical success values"
        );
    }
}

pub fn expect_parse_failure(schema: &Ast, input: &Value, message: &str, options: ParseOptions) {
    let direct = match decode_sync(schema, input.clone(), options) {
        Err(errors) => format_flat(&errors),
        Ok(value) => panic!("expected parse failure, decoded {value}"),
    };
    assert_eq!(direct, message);

    let rt = runtime();
    for rewritten in rewrites(schema) {
        let suspended = match rt.block_on(decode(&rewritten, input.clone(), options)) {
            Err(errors) => format_flat(&errors),
            Ok(value) => panic!("expected parse failure under the suspendable strategy, decoded {value}"),
        };
        assert_eq!(
            suspended, direct,
            "strategies must produce identical error reports"
        );
    }
}

/// Like [`expect_parse_failure`] but asserting the tree rendering.
pub fn expect_parse_failure_tree(schema: &Ast, input: &Value, message: &str, options: ParseOptions) {
    let direct = match decode_sync(schema, input.clone(), options) {
        Err(errors) => format_tree(&errors),
        Ok(value) => panic!("expected parse failure, decoded {value}"),
    };
    assert_eq!(direct, message);

    let rt = runtime();
    for rewritten in rewrites(schema) {
        let suspended = match rt.block_on(decode(&rewritten, input.clone(), options)) {
            Err(errors) => format_tree(&errors),
            Ok(value) => panic!("expected parse failure under the suspendable strategy, decoded {value}"),
        };
        assert_eq!(
            suspended, direct,
            "strategies must produce identical error trees"
        );
    }
}

pub fn expect_encode_success(schema: &Ast, input: &Value, expected: &Value, options: ParseOptions) {
    let direct = encode_sync(schema, input.clone(), options)
        .unwrap_or_else(|errors| panic!("expected encode success, got: {}", format_flat(&errors)));
    assert_eq!(&direct, expected, "direct strategy encoded an unexpected value");

    let rt = runtime();
    for rewritten in rewrites(schema) {
        let suspended = rt
            .block_on(encode(&rewritten, input.clone(), options))
            .unwrap_or_else(|errors| {
                panic!("suspendable strategy diverged: {}", format_flat(&errors))
            });
        assert_eq!(
            suspended, direct,
            "strategies must produce identical encoded values"
        );
    }
}

pub fn expect_encode_failure(schema: &Ast, input: &Value, message: &str, options: ParseOptions) {
    let direct = match encode_sync(schema, input.clone(), options) {
        Err(errors) => format_flat(&errors),
        Ok(value) => panic!("expected encode failure, encoded {value}"),
    };
    assert_eq!(direct, message);

    let rt = runtime();
    for rewritten in rewrites(schema) {
        let suspended = match rt.block_on(encode(&rewritten, input.clone(), options)) {
            Err(errors) => format_flat(&errors),
            Ok(value) => panic!("expected encode failure under the suspendable strategy, encoded {value}"),
        };
        assert_eq!(
            suspended, direct,
            "strategies must produce identical error reports"
        );
    }
}
