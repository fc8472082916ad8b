//! # Parse Result & Error Model
//!
//! A parse produces either one success value or a non-empty ordered sequence
//! of structured errors. The error variants mirror the recursive shape of the
//! AST: `Index`, `Key` and `UnionMember` nest child error sequences, so a
//! single failure report can point at a tuple position inside an object key
//! inside a union alternative, to arbitrary depth.
//!
//! The non-empty invariant is enforced by construction: [`ParseErrors`] has a
//! private field and its only constructors refuse empty input (the private
//! newtype pattern).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::ast::Ast;
use crate::format;

/// Result of running a compiled decode or encode procedure.
pub type ParseOutcome = Result<Value, ParseErrors>;

// ---------------------------------------------------------------------------
// Per-call configuration
// ---------------------------------------------------------------------------

/// Policy for record keys not covered by any property or index signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcessProperty {
    /// Drop unknown keys; they are absent from the decoded result.
    #[default]
    Ignore,
    /// Report an `Unexpected` error per unknown key.
    Error,
}

/// Whether a composite node stops at its first failing child or collects
/// every failure at every position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    #[default]
    First,
    All,
}

/// Per-call parse behavior. Passed by value on every call; never stored in
/// or mutating the AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseOptions {
    pub on_excess_property: ExcessProperty,
    pub errors: ErrorMode,
}

impl ParseOptions {
    pub fn excess_property_error() -> Self {
        Self {
            on_excess_property: ExcessProperty::Error,
            ..Self::default()
        }
    }

    pub fn all_errors() -> Self {
        Self {
            errors: ErrorMode::All,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// One structural parse failure.
#[derive(Debug, Clone)]
pub enum ParseError {
    /// The actual value does not match the expected shape.
    Type {
        expected: Ast,
        actual: Value,
        message: Option<String>,
    },
    /// Structurally valid but explicitly disallowed — notably produced when
    /// the direct strategy encounters a suspension point.
    Forbidden,
    /// Required element or key absent.
    Missing,
    /// Excess element or key present (policy-dependent).
    Unexpected { actual: Value },
    /// Nested failure at a tuple/array position.
    Index { index: usize, errors: ParseErrors },
    /// Nested failure at a record key.
    Key { key: String, errors: ParseErrors },
    /// One union alternative failed.
    UnionMember { errors: ParseErrors },
}

/// Non-empty ordered sequence of parse errors.
#[derive(Debug, Clone, Error)]
#[error("{}", format::format_error_list(.errors))]
pub struct ParseErrors {
    errors: Vec<ParseError>,
}

impl ParseErrors {
    pub fn single(error: ParseError) -> Self {
        Self {
            errors: vec![error],
        }
    }

    /// `None` when `errors` is empty; the non-empty invariant is preserved
    /// at every construction site.
    pub fn from_vec(errors: Vec<ParseError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    /// Always at least 1.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParseError> {
        self.errors.iter()
    }

    pub fn as_slice(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_vec(self) -> Vec<ParseError> {
        self.errors
    }
}

impl<'a> IntoIterator for &'a ParseErrors {
    type Item = &'a ParseError;
    type IntoIter = std::slice::Iter<'a, ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
