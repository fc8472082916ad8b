//! # Error Formatters
//!
//! Two pure renderers over a non-empty error sequence: a flat single-line
//! form joined with `", "` for assertions and logs, and an indented tree for
//! diagnostics where nesting depth matters.
//!
//! A `Type` error renders through the expected node's message annotation
//! (applied to the actual value) when one is present, then through the
//! error's own message, and only then through the default
//! `Expected <shape>, actual <value>` form.

use serde_json::Value;

use crate::ast::{Ast, SchemaAst};
use crate::error::{ParseError, ParseErrors};

// ---------------------------------------------------------------------------
// Flat renderer
// ---------------------------------------------------------------------------

/// Render every error on one line, joined with `", "`.
pub fn format_flat(errors: &ParseErrors) -> String {
    format_error_list(errors.as_slice())
}

pub(crate) fn format_error_list(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(format_error)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_error(error: &ParseError) -> String {
    match error {
        ParseError::Type {
            expected,
            actual,
            message,
        } => expected
            .annotations()
            .message
            .as_ref()
            .map(|hook| hook(actual))
            .or_else(|| message.clone())
            .unwrap_or_else(|| {
                format!(
                    "Expected {}, actual {}",
                    describe(expected),
                    render_actual(actual)
                )
            }),
        ParseError::Forbidden => "is forbidden".to_string(),
        ParseError::Missing => "is missing".to_string(),
        ParseError::Unexpected { .. } => "is unexpected".to_string(),
        ParseError::Index { index, errors } => {
            format!("/{index} {}", format_error_list(errors.as_slice()))
        }
        ParseError::Key { key, errors } => {
            format!("/{key} {}", format_error_list(errors.as_slice()))
        }
        ParseError::UnionMember { errors } => {
            format!("union member: {}", format_error_list(errors.as_slice()))
        }
    }
}

// ---------------------------------------------------------------------------
// Tree renderer
// ---------------------------------------------------------------------------

/// Render the errors as an indented tree rooted at an `N error(s) found`
/// header line.
pub fn format_tree(errors: &ParseErrors) -> String {
    let mut out = format!("{} error(s) found", errors.len());
    write_forest(&mut out, errors.as_slice(), "");
    out
}

fn write_forest(out: &mut String, errors: &[ParseError], prefix: &str) {
    for (position, error) in errors.iter().enumerate() {
        write_branch(out, error, prefix, position == errors.len() - 1);
    }
}

fn write_branch(out: &mut String, error: &ParseError, prefix: &str, last: bool) {
    let connector = if last { "└─" } else { "├─" };
    let child_prefix = format!("{prefix}{}", if last { "   " } else { "│  " });
    match error {
        ParseError::Index { index, errors } => {
            out.push_str(&format!("\n{prefix}{connector} [{index}]"));
            write_forest(out, errors.as_slice(), &child_prefix);
        }
        ParseError::Key { key, errors } => {
            out.push_str(&format!("\n{prefix}{connector} [\"{key}\"]"));
            write_forest(out, errors.as_slice(), &child_prefix);
        }
        ParseError::UnionMember { errors } => {
            out.push_str(&format!("\n{prefix}{connector} union member"));
            write_forest(out, errors.as_slice(), &child_prefix);
        }
        leaf => out.push_str(&format!("\n{prefix}{connector} {}", format_error(leaf))),
    }
}

// ---------------------------------------------------------------------------
// Descriptions
// ---------------------------------------------------------------------------

/// Human-readable description of a node's expected shape: the identifier or
/// title annotation when present, else a kind-derived description.
pub fn describe(ast: &Ast) -> String {
    let annotations = ast.annotations();
    if let Some(identifier) = &annotations.identifier {
        return identifier.clone();
    }
    if let Some(title) = &annotations.title {
        return title.clone();
    }
    match &**ast {
        SchemaAst::StringKeyword { .. } => "string".to_string(),
        SchemaAst::NumberKeyword { .. } => "number".to_string(),
        SchemaAst::BooleanKeyword { .. } => "boolean".to_string(),
        SchemaAst::Literal { value, .. } => render_actual(value),
        SchemaAst::Unknown { .. } => "unknown".to_string(),
        SchemaAst::Declaration { .. } => "a declaration".to_string(),
        SchemaAst::Tuple { .. } => "a tuple or array".to_string(),
        SchemaAst::TypeLiteral { .. } => "an object".to_string(),
        SchemaAst::Union { members, .. } => members
            .iter()
            .map(describe)
            .collect::<Vec<_>>()
            .join(" or "),
        // Forcing here could run user thunks during error rendering.
        SchemaAst::Lazy { .. } => "a deferred schema".to_string(),
        SchemaAst::Refinement { from, .. } => format!("a refinement of {}", describe(from)),
        SchemaAst::Transform { from, to, .. } => {
            format!(
                "a transformation from {} to {}",
                describe(from),
                describe(to)
            )
        }
    }
}

/// Compact JSON rendering of the offending value.
pub fn render_actual(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<unrenderable>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Annotations;
    use serde_json::json;

    #[test]
    fn flat_renders_default_type_message() {
        let errors = ParseErrors::single(ParseError::Type {
            expected: SchemaAst::string(),
            actual: json!(1),
            message: None,
        });
        assert_eq!(format_flat(&errors), "Expected string, actual 1");
    }

    #[test]
    fn flat_prefers_message_annotation() {
        let schema = crate::ast::annotated(
            &SchemaAst::string(),
            Annotations::default().message(|actual| format!("not a string: {actual}")),
        );
        let errors = ParseErrors::single(ParseError::Type {
            expected: schema,
            actual: json!(false),
            message: None,
        });
        assert_eq!(format_flat(&errors), "not a string: false");
    }

    #[test]
    fn flat_prefixes_nested_locations() {
        let errors = ParseErrors::single(ParseError::Index {
            index: 2,
            errors: ParseErrors::single(ParseError::Key {
                key: "name".to_string(),
                errors: ParseErrors::single(ParseError::Missing),
            }),
        });
        assert_eq!(format_flat(&errors), "/2 /name is missing");
    }

    #[test]
    fn flat_joins_siblings_with_comma() {
        let errors = ParseErrors::from_vec(vec![
            ParseError::Index {
                index: 0,
                errors: ParseErrors::single(ParseError::Missing),
            },
            ParseError::Index {
                index: 1,
                errors: ParseErrors::single(ParseError::Unexpected { actual: json!(3) }),
            },
        ])
        .expect("non-empty");
        assert_eq!(format_flat(&errors), "/0 is missing, /1 is unexpected");
    }

    #[test]
    fn tree_nests_under_header() {
        let errors = ParseErrors::from_vec(vec![
            ParseError::Index {
                index: 0,
                errors: ParseErrors::single(ParseError::Type {
                    expected: SchemaAst::number(),
                    actual: json!("a"),
                    message: None,
                }),
            },
            ParseError::Key {
                key: "id".to_string(),
                errors: ParseErrors::single(ParseError::Missing),
            },
        ])
        .expect("non-empty");
        let rendered = format_tree(&errors);
        let expected = "2 error(s) found\n\
                        ├─ [0]\n\
                        │  └─ Expected number, actual \"a\"\n\
                        └─ [\"id\"]\n   \
                        └─ is missing";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn union_description_joins_members() {
        let union = SchemaAst::union(vec![SchemaAst::string(), SchemaAst::number()]);
        assert_eq!(describe(&union), "string or number");
    }
}
