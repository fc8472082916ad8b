//! # trellis-schema — Schema Interpreter Core
//!
//! A schema is a declarative description of a data shape, authored as a
//! recursive [`ast::SchemaAst`] tree. This crate compiles that tree into
//! bidirectional conversions between an untrusted input representation and a
//! validated output representation (both `serde_json::Value`), with
//! structured, multi-location error reports.
//!
//! ## Dual execution model
//!
//! Every compiled procedure is a future. The **direct** strategy
//! ([`parser::decode_sync`], [`parser::encode_sync`]) polls it exactly once
//! and therefore runs as a plain synchronous call chain; crossing a
//! suspension point there yields a `Forbidden` error. The **suspendable**
//! strategy ([`parser::decode`], [`parser::encode`]) hands the future to a
//! cooperative scheduler. Both strategies share one per-node implementation,
//! so they produce identical outcomes for every schema and input.
//!
//! The [`suspend`] module rewrites a schema so selected conversions are
//! forced through a suspension point, which is how strategy equivalence is
//! exercised end to end.
//!
//! ## Module map
//!
//! - [`ast`] — node kinds, annotations, construction, output-side projection.
//! - [`error`] — parse options, the structured error tree, non-empty error
//!   sequences.
//! - [`parser`] — the interpreter: AST to decode/encode procedures.
//! - [`suspend`] — the suspension rewriter.
//! - [`format`] — flat and tree error renderers.

pub mod ast;
pub mod error;
pub mod format;
pub mod parser;
pub mod suspend;

// Re-export primary types for ergonomic imports.
pub use ast::{
    annotated, type_side, Annotations, Ast, IndexSignature, LazyNode, ParseFn, PropertySignature,
    SchemaAst, TupleElement,
};
pub use error::{
    ErrorMode, ExcessProperty, ParseError, ParseErrors, ParseOptions, ParseOutcome,
};
pub use format::{format_flat, format_tree};
pub use parser::{decode, decode_sync, encode, encode_sync, is};
pub use suspend::{SuspendMode, Suspender, DEFAULT_SUSPEND_DELAY};
