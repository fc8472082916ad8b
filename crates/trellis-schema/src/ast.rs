//! # Schema AST — Recursive Shape Description
//!
//! The schema AST is an immutable recursive tree describing a data shape and
//! its conversion rules. Authoring code builds a tree of [`SchemaAst`] nodes
//! (shared via [`Ast`], an `Arc` alias); the interpreter in [`crate::parser`]
//! compiles the tree into decode/encode procedures.
//!
//! ## Invariants
//!
//! - Nodes are immutable once constructed. Rewrites (the suspension rewriter,
//!   [`type_side`]) always produce a new tree and never mutate their input.
//! - `Lazy` nodes are forced at most once per node instance; the forced result
//!   is memoized in a [`once_cell::sync::OnceCell`], which is what makes
//!   cyclic (self-referential) schemas terminate.
//! - [`Annotations`] are metadata only. They feed the error formatters and
//!   identifier lookup, never structural decoding.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::error::{ParseOptions, ParseOutcome};

/// Shared handle to a schema node. All child links use this alias so that
/// rewritten trees can share unaffected substructure.
pub type Ast = Arc<SchemaAst>;

/// Custom message hook: renders an error message for the offending value.
pub type MessageHook = Arc<dyn Fn(&Value) -> String + Send + Sync>;

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// Opaque metadata attached to any node: naming for diagnostics plus an
/// optional message hook consulted by the error formatters.
#[derive(Clone, Default)]
pub struct Annotations {
    /// Stable identifier, preferred by [`crate::format::describe`].
    pub identifier: Option<String>,
    /// Human-readable title, used when no identifier is set.
    pub title: Option<String>,
    /// Free-form description; not consulted by the formatters.
    pub description: Option<String>,
    /// Custom message renderer keyed by the actual (offending) value.
    pub message: Option<MessageHook>,
}

impl Annotations {
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn message<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.message = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for Annotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Annotations")
            .field("identifier", &self.identifier)
            .field("title", &self.title)
            .field("description", &self.description)
            .field("message", &self.message.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Parse procedures
// ---------------------------------------------------------------------------

/// A custom conversion procedure carried by `Declaration`, `Refinement` and
/// `Transform` nodes.
///
/// Procedures return a boxed future so the same node logic serves both
/// execution strategies: a synchronous procedure resolves on first poll,
/// while a suspended one (see [`crate::suspend`]) yields before resolving.
#[derive(Clone)]
pub struct ParseFn(Arc<dyn Fn(Value, ParseOptions) -> BoxFuture<'static, ParseOutcome> + Send + Sync>);

impl ParseFn {
    /// Wrap an already-asynchronous procedure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value, ParseOptions) -> BoxFuture<'static, ParseOutcome> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wrap a synchronous procedure; the returned future resolves immediately.
    pub fn from_sync<F>(f: F) -> Self
    where
        F: Fn(Value, ParseOptions) -> ParseOutcome + Send + Sync + 'static,
    {
        Self(Arc::new(move |value, options| {
            let outcome = f(value, options);
            Box::pin(futures_util::future::ready(outcome))
        }))
    }

    pub fn call(&self, value: Value, options: ParseOptions) -> BoxFuture<'static, ParseOutcome> {
        (self.0)(value, options)
    }
}

impl fmt::Debug for ParseFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ParseFn")
    }
}

// ---------------------------------------------------------------------------
// Composite node pieces
// ---------------------------------------------------------------------------

/// One fixed position of a `Tuple` node.
#[derive(Debug, Clone)]
pub struct TupleElement {
    pub ty: Ast,
    pub optional: bool,
}

impl TupleElement {
    pub fn new(ty: Ast) -> Self {
        Self { ty, optional: false }
    }

    pub fn optional(ty: Ast) -> Self {
        Self { ty, optional: true }
    }
}

/// One declared key of a `TypeLiteral` node.
#[derive(Debug, Clone)]
pub struct PropertySignature {
    pub key: String,
    pub ty: Ast,
    pub optional: bool,
    pub readonly: bool,
}

impl PropertySignature {
    pub fn new(key: impl Into<String>, ty: Ast) -> Self {
        Self {
            key: key.into(),
            ty,
            optional: false,
            readonly: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Catch-all key pattern of a `TypeLiteral` node: any key accepted by
/// `parameter` is decoded against `ty`.
#[derive(Debug, Clone)]
pub struct IndexSignature {
    pub parameter: Ast,
    pub ty: Ast,
    pub readonly: bool,
}

impl IndexSignature {
    pub fn new(parameter: Ast, ty: Ast) -> Self {
        Self {
            parameter,
            ty,
            readonly: false,
        }
    }
}

/// Deferred, memoized indirection cell enabling cyclic schema definitions.
///
/// The thunk runs at most once per `LazyNode` instance; subsequent forces
/// return the cached node.
#[derive(Clone)]
pub struct LazyNode {
    thunk: Arc<dyn Fn() -> Ast + Send + Sync>,
    cell: OnceCell<Ast>,
}

impl LazyNode {
    pub fn new<F>(thunk: F) -> Self
    where
        F: Fn() -> Ast + Send + Sync + 'static,
    {
        Self {
            thunk: Arc::new(thunk),
            cell: OnceCell::new(),
        }
    }

    /// Force the thunk, memoizing the produced node.
    pub fn force(&self) -> &Ast {
        self.cell.get_or_init(|| (self.thunk)())
    }

    /// Whether the thunk has already run.
    pub fn is_forced(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for LazyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyNode")
            .field("forced", &self.is_forced())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// The AST itself
// ---------------------------------------------------------------------------

/// Closed set of schema node kinds.
///
/// The interpreter, the suspension rewriter and the error formatters all
/// match exhaustively on this enum; adding a variant forces every consumer
/// to handle it.
#[derive(Debug, Clone)]
pub enum SchemaAst {
    /// Leaf: accepts any JSON string.
    StringKeyword { annotations: Annotations },
    /// Leaf: accepts any JSON number.
    NumberKeyword { annotations: Annotations },
    /// Leaf: accepts any JSON boolean.
    BooleanKeyword { annotations: Annotations },
    /// Leaf: accepts exactly one value.
    Literal { value: Value, annotations: Annotations },
    /// Leaf: accepts anything.
    Unknown { annotations: Annotations },
    /// Named/generic schema with custom conversion procedures. The procedures
    /// may capture compiled forms of the type parameters.
    Declaration {
        type_parameters: Vec<Ast>,
        decode: ParseFn,
        encode: ParseFn,
        annotations: Annotations,
    },
    /// Fixed-position sequence with an optional variadic tail. When `rest` is
    /// present it is non-empty: the first entry types the variadic middle,
    /// the remaining entries are required trailing elements.
    Tuple {
        elements: Vec<TupleElement>,
        rest: Option<Vec<Ast>>,
        is_readonly: bool,
        annotations: Annotations,
    },
    /// Keyed record with optional catch-all key patterns.
    TypeLiteral {
        property_signatures: Vec<PropertySignature>,
        index_signatures: Vec<IndexSignature>,
        annotations: Annotations,
    },
    /// At least one member must accept the value; members are tried in
    /// declared order and the first success wins.
    Union {
        members: Vec<Ast>,
        annotations: Annotations,
    },
    /// Deferred node for self-referential schemas.
    Lazy {
        node: LazyNode,
        annotations: Annotations,
    },
    /// A base node plus an accept/reject procedure. `is_reversed` swaps which
    /// direction (decode vs encode) receives the check.
    Refinement {
        from: Ast,
        decode: ParseFn,
        is_reversed: bool,
        annotations: Annotations,
    },
    /// Independent decode/encode procedures bridging two unrelated shapes.
    Transform {
        from: Ast,
        to: Ast,
        decode: ParseFn,
        encode: ParseFn,
        annotations: Annotations,
    },
}

impl SchemaAst {
    pub fn string() -> Ast {
        Arc::new(Self::StringKeyword {
            annotations: Annotations::default(),
        })
    }

    pub fn number() -> Ast {
        Arc::new(Self::NumberKeyword {
            annotations: Annotations::default(),
        })
    }

    pub fn boolean() -> Ast {
        Arc::new(Self::BooleanKeyword {
            annotations: Annotations::default(),
        })
    }

    pub fn literal(value: Value) -> Ast {
        Arc::new(Self::Literal {
            value,
            annotations: Annotations::default(),
        })
    }

    pub fn unknown() -> Ast {
        Arc::new(Self::Unknown {
            annotations: Annotations::default(),
        })
    }

    pub fn declaration(type_parameters: Vec<Ast>, decode: ParseFn, encode: ParseFn) -> Ast {
        Arc::new(Self::Declaration {
            type_parameters,
            decode,
            encode,
            annotations: Annotations::default(),
        })
    }

    pub fn tuple(elements: Vec<TupleElement>, rest: Option<Vec<Ast>>) -> Ast {
        debug_assert!(
            rest.as_ref().map_or(true, |r| !r.is_empty()),
            "tuple rest must be non-empty when present"
        );
        Arc::new(Self::Tuple {
            elements,
            rest,
            is_readonly: true,
            annotations: Annotations::default(),
        })
    }

    pub fn type_literal(
        property_signatures: Vec<PropertySignature>,
        index_signatures: Vec<IndexSignature>,
    ) -> Ast {
        Arc::new(Self::TypeLiteral {
            property_signatures,
            index_signatures,
            annotations: Annotations::default(),
        })
    }

    pub fn union(members: Vec<Ast>) -> Ast {
        Arc::new(Self::Union {
            members,
            annotations: Annotations::default(),
        })
    }

    pub fn lazy<F>(thunk: F) -> Ast
    where
        F: Fn() -> Ast + Send + Sync + 'static,
    {
        Arc::new(Self::Lazy {
            node: LazyNode::new(thunk),
            annotations: Annotations::default(),
        })
    }

    pub fn refinement(from: Ast, decode: ParseFn) -> Ast {
        Arc::new(Self::Refinement {
            from,
            decode,
            is_reversed: false,
            annotations: Annotations::default(),
        })
    }

    pub fn reversed_refinement(from: Ast, decode: ParseFn) -> Ast {
        Arc::new(Self::Refinement {
            from,
            decode,
            is_reversed: true,
            annotations: Annotations::default(),
        })
    }

    pub fn transform(from: Ast, to: Ast, decode: ParseFn, encode: ParseFn) -> Ast {
        Arc::new(Self::Transform {
            from,
            to,
            decode,
            encode,
            annotations: Annotations::default(),
        })
    }

    /// The node's metadata.
    pub fn annotations(&self) -> &Annotations {
        match self {
            Self::StringKeyword { annotations }
            | Self::NumberKeyword { annotations }
            | Self::BooleanKeyword { annotations }
            | Self::Literal { annotations, .. }
            | Self::Unknown { annotations }
            | Self::Declaration { annotations, .. }
            | Self::Tuple { annotations, .. }
            | Self::TypeLiteral { annotations, .. }
            | Self::Union { annotations, .. }
            | Self::Lazy { annotations, .. }
            | Self::Refinement { annotations, .. }
            | Self::Transform { annotations, .. } => annotations,
        }
    }

    fn annotations_mut(&mut self) -> &mut Annotations {
        match self {
            Self::StringKeyword { annotations }
            | Self::NumberKeyword { annotations }
            | Self::BooleanKeyword { annotations }
            | Self::Literal { annotations, .. }
            | Self::Unknown { annotations }
            | Self::Declaration { annotations, .. }
            | Self::Tuple { annotations, .. }
            | Self::TypeLiteral { annotations, .. }
            | Self::Union { annotations, .. }
            | Self::Lazy { annotations, .. }
            | Self::Refinement { annotations, .. }
            | Self::Transform { annotations, .. } => annotations,
        }
    }
}

/// Return a copy of `ast` carrying the given annotations. The input node is
/// untouched; children are shared.
pub fn annotated(ast: &Ast, annotations: Annotations) -> Ast {
    let mut node = (**ast).clone();
    *node.annotations_mut() = annotations;
    Arc::new(node)
}

// ---------------------------------------------------------------------------
// Output-side projection
// ---------------------------------------------------------------------------

/// Project a schema onto its output ("type") side.
///
/// Transforms collapse to their `to` side, reversed refinements (which apply
/// on the encoded side) are dropped, non-reversed refinements keep their
/// check, and composites are mapped recursively. The result is the shape a
/// decoded value conforms to, used by the `is` validity predicate and by
/// value generation.
pub fn type_side(ast: &Ast) -> Ast {
    match &**ast {
        SchemaAst::StringKeyword { .. }
        | SchemaAst::NumberKeyword { .. }
        | SchemaAst::BooleanKeyword { .. }
        | SchemaAst::Literal { .. }
        | SchemaAst::Unknown { .. } => ast.clone(),
        SchemaAst::Declaration {
            type_parameters,
            decode,
            encode,
            annotations,
        } => Arc::new(SchemaAst::Declaration {
            type_parameters: type_parameters.iter().map(type_side).collect(),
            decode: decode.clone(),
            encode: encode.clone(),
            annotations: annotations.clone(),
        }),
        SchemaAst::Tuple {
            elements,
            rest,
            is_readonly,
            annotations,
        } => Arc::new(SchemaAst::Tuple {
            elements: elements
                .iter()
                .map(|e| TupleElement {
                    ty: type_side(&e.ty),
                    optional: e.optional,
                })
                .collect(),
            rest: rest
                .as_ref()
                .map(|tail| tail.iter().map(type_side).collect()),
            is_readonly: *is_readonly,
            annotations: annotations.clone(),
        }),
        SchemaAst::TypeLiteral {
            property_signatures,
            index_signatures,
            annotations,
        } => Arc::new(SchemaAst::TypeLiteral {
            property_signatures: property_signatures
                .iter()
                .map(|p| PropertySignature {
                    key: p.key.clone(),
                    ty: type_side(&p.ty),
                    optional: p.optional,
                    readonly: p.readonly,
                })
                .collect(),
            index_signatures: index_signatures
                .iter()
                .map(|i| IndexSignature {
                    parameter: type_side(&i.parameter),
                    ty: type_side(&i.ty),
                    readonly: i.readonly,
                })
                .collect(),
            annotations: annotations.clone(),
        }),
        SchemaAst::Union {
            members,
            annotations,
        } => Arc::new(SchemaAst::Union {
            members: members.iter().map(type_side).collect(),
            annotations: annotations.clone(),
        }),
        SchemaAst::Lazy { node, annotations } => {
            let node = node.clone();
            Arc::new(SchemaAst::Lazy {
                node: LazyNode::new(move || type_side(node.force())),
                annotations: annotations.clone(),
            })
        }
        SchemaAst::Refinement {
            from,
            decode,
            is_reversed,
            annotations,
        } => {
            if *is_reversed {
                type_side(from)
            } else {
                Arc::new(SchemaAst::Refinement {
                    from: type_side(from),
                    decode: decode.clone(),
                    is_reversed: false,
                    annotations: annotations.clone(),
                })
            }
        }
        SchemaAst::Transform { to, .. } => type_side(to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn lazy_thunk_runs_at_most_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let node = LazyNode::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            SchemaAst::string()
        });
        assert!(!node.is_forced());
        let first = node.force().clone();
        let second = node.force().clone();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn annotated_copies_instead_of_mutating() {
        let plain = SchemaAst::string();
        let named = annotated(&plain, Annotations::default().identifier("Name"));
        assert!(plain.annotations().identifier.is_none());
        assert_eq!(named.annotations().identifier.as_deref(), Some("Name"));
    }

    #[test]
    fn type_side_collapses_transforms() {
        let schema = SchemaAst::transform(
            SchemaAst::string(),
            SchemaAst::number(),
            ParseFn::from_sync(|v, _| Ok(v)),
            ParseFn::from_sync(|v, _| Ok(v)),
        );
        let ty = type_side(&schema);
        assert!(matches!(&*ty, SchemaAst::NumberKeyword { .. }));
    }

    #[test]
    fn type_side_drops_reversed_refinements_only() {
        let kept = SchemaAst::refinement(SchemaAst::string(), ParseFn::from_sync(|v, _| Ok(v)));
        assert!(matches!(&*type_side(&kept), SchemaAst::Refinement { .. }));

        let dropped =
            SchemaAst::reversed_refinement(SchemaAst::string(), ParseFn::from_sync(|v, _| Ok(v)));
        assert!(matches!(
            &*type_side(&dropped),
            SchemaAst::StringKeyword { .. }
        ));
    }
}
