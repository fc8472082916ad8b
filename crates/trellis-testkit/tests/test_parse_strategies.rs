//! # Strategy Equivalence Across Node Kinds
//!
//! Every scenario runs through the `expect_*` helpers, which assert the
//! direct-strategy outcome and then require the identical outcome from the
//! suspendable strategy over both suspension rewrites. Covers each node
//! kind's success path, its failure messages, and the error-mode and
//! excess-property policies.

use serde_json::{json, Value};

use trellis_schema::{
    ParseError, ParseErrors, ParseFn, ParseOptions, PropertySignature, SchemaAst, TupleElement,
};
use trellis_testkit::{
    expect_encode_failure, expect_encode_success, expect_parse_failure, expect_parse_failure_tree,
    expect_parse_success, init_tracing,
};

fn pair_of_numbers() -> trellis_schema::Ast {
    SchemaAst::tuple(
        vec![
            TupleElement::new(SchemaAst::number()),
            TupleElement::new(SchemaAst::number()),
        ],
        None,
    )
}

fn ends_with(suffix: &'static str) -> trellis_schema::Ast {
    SchemaAst::refinement(
        SchemaAst::string(),
        ParseFn::from_sync(move |value, _| match value.as_str() {
            Some(s) if s.ends_with(suffix) => Ok(value),
            _ => Err(ParseErrors::single(ParseError::Type {
                expected: SchemaAst::string(),
                actual: value,
                message: Some(format!("expected a string ending with \"{suffix}\"")),
            })),
        }),
    )
}

fn string_to_number() -> trellis_schema::Ast {
    SchemaAst::transform(
        SchemaAst::string(),
        SchemaAst::number(),
        ParseFn::from_sync(|value, _| {
            let parsed = value
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .and_then(serde_json::Number::from_f64);
            match parsed {
                Some(n) => Ok(Value::Number(n)),
                None => Err(ParseErrors::single(ParseError::Type {
                    expected: SchemaAst::number(),
                    actual: value,
                    message: Some("cannot be parsed as a number".to_string()),
                })),
            }
        }),
        ParseFn::from_sync(|value, _| Ok(Value::String(value.to_string()))),
    )
}

#[test]
fn leaves_agree_across_strategies() {
    init_tracing();
    expect_parse_success(
        &SchemaAst::string(),
        &json!("a"),
        &json!("a"),
        ParseOptions::default(),
    );
    expect_parse_failure(
        &SchemaAst::string(),
        &json!(1),
        "Expected string, actual 1",
        ParseOptions::default(),
    );
    expect_parse_success(
        &SchemaAst::literal(json!("on")),
        &json!("on"),
        &json!("on"),
        ParseOptions::default(),
    );
}

#[test]
fn tuple_missing_element() {
    expect_parse_failure(
        &pair_of_numbers(),
        &json!([1]),
        "/1 is missing",
        ParseOptions::default(),
    );
}

#[test]
fn tuple_excess_element_under_all_errors() {
    expect_parse_failure(
        &pair_of_numbers(),
        &json!([1, 2, 3]),
        "/2 is unexpected",
        ParseOptions::all_errors(),
    );
}

#[test]
fn tuple_error_mode_controls_accumulation() {
    expect_parse_failure(
        &pair_of_numbers(),
        &json!(["a", "b"]),
        "/0 Expected number, actual \"a\"",
        ParseOptions::default(),
    );
    expect_parse_failure(
        &pair_of_numbers(),
        &json!(["a", "b"]),
        "/0 Expected number, actual \"a\", /1 Expected number, actual \"b\"",
        ParseOptions::all_errors(),
    );
}

#[test]
fn type_literal_excess_property_policy() {
    let schema =
        SchemaAst::type_literal(vec![PropertySignature::new("id", SchemaAst::number())], vec![]);
    expect_parse_success(
        &schema,
        &json!({"id": 1, "extra": true}),
        &json!({"id": 1}),
        ParseOptions::default(),
    );
    expect_parse_failure(
        &schema,
        &json!({"id": 1, "extra": true}),
        "/extra is unexpected",
        ParseOptions::excess_property_error(),
    );
}

#[test]
fn type_literal_failures_render_as_a_tree() {
    let schema = SchemaAst::type_literal(
        vec![
            PropertySignature::new("id", SchemaAst::number()),
            PropertySignature::new("name", SchemaAst::string()),
        ],
        vec![],
    );
    let expected = "2 error(s) found\n\
                    ├─ [\"id\"]\n\
                    │  └─ Expected number, actual \"x\"\n\
                    └─ [\"name\"]\n   \
                    └─ is missing";
    expect_parse_failure_tree(&schema, &json!({"id": "x"}), expected, ParseOptions::all_errors());
}

#[test]
fn union_reports_every_member_in_declared_order() {
    let schema = SchemaAst::union(vec![SchemaAst::string(), SchemaAst::number()]);
    expect_parse_success(&schema, &json!("a"), &json!("a"), ParseOptions::default());
    expect_parse_success(&schema, &json!(2), &json!(2), ParseOptions::default());
    expect_parse_failure(
        &schema,
        &json!(true),
        "union member: Expected string, actual true, union member: Expected number, actual true",
        ParseOptions::default(),
    );
}

#[test]
fn refinement_message_survives_both_strategies() {
    let schema = ends_with("a");
    expect_parse_success(&schema, &json!("ba"), &json!("ba"), ParseOptions::default());
    expect_parse_failure(
        &schema,
        &json!("b"),
        "expected a string ending with \"a\"",
        ParseOptions::default(),
    );
    expect_parse_failure(
        &schema,
        &json!(1),
        "Expected string, actual 1",
        ParseOptions::default(),
    );
}

#[test]
fn transform_runs_in_both_directions() {
    let schema = string_to_number();
    expect_parse_success(&schema, &json!("1.5"), &json!(1.5), ParseOptions::default());
    expect_parse_failure(
        &schema,
        &json!("seven"),
        "cannot be parsed as a number",
        ParseOptions::default(),
    );
    expect_encode_success(&schema, &json!(1.5), &json!("1.5"), ParseOptions::default());
    expect_encode_failure(
        &schema,
        &json!("not a number"),
        "Expected number, actual \"not a number\"",
        ParseOptions::default(),
    );
}

#[test]
fn reversed_refinement_checks_on_encode_only() {
    let schema = SchemaAst::reversed_refinement(
        SchemaAst::string(),
        ParseFn::from_sync(|value, _| match value.as_str() {
            Some(s) if !s.is_empty() => Ok(value),
            _ => Err(ParseErrors::single(ParseError::Type {
                expected: SchemaAst::string(),
                actual: value,
                message: Some("must not be empty".to_string()),
            })),
        }),
    );
    expect_parse_success(&schema, &json!(""), &json!(""), ParseOptions::default());
    expect_encode_success(&schema, &json!("x"), &json!("x"), ParseOptions::default());
    expect_encode_failure(&schema, &json!(""), "must not be empty", ParseOptions::default());
}
