//! # Suspension Rewriter
//!
//! Rewrites a schema so selected conversions are forced through the
//! suspendable strategy. Structure is preserved: composite nodes are rebuilt
//! around rewritten children, custom procedures are wrapped to suspend before
//! delegating, and leaves become identity transforms whose procedures suspend
//! and then re-validate against the leaf itself. The input tree is never
//! mutated.
//!
//! In [`SuspendMode::Alternate`] a parity bit flips on every visited node and
//! nodes landing on the "skip" side are returned unchanged, subtree included.
//! Parity is explicit state on the [`Suspender`] — callers choose the
//! starting parity and may reuse one rewriter across calls to carry parity
//! over; there is no process-wide toggle, so concurrent rewrites cannot
//! interfere.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::Sleep;

use crate::ast::{
    Annotations, Ast, IndexSignature, LazyNode, ParseFn, PropertySignature, SchemaAst,
    TupleElement,
};
use crate::parser;

/// Default simulated I/O latency for wrapped conversions.
pub const DEFAULT_SUSPEND_DELAY: Duration = Duration::from_millis(1);

/// Which nodes get wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendMode {
    /// Every eligible node.
    All,
    /// Alternating nodes, by visit order.
    Alternate,
}

/// Future that always suspends at least once, then waits out the delay.
///
/// The initial yield happens before the timer is armed, so the direct
/// strategy observes a suspension (and reports `Forbidden`) even with a zero
/// delay and without a timer driver on the stack.
struct Suspension {
    delay: Duration,
    yielded: bool,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl Suspension {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            yielded: false,
            sleep: None,
        }
    }
}

impl Future for Suspension {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if !this.yielded {
            this.yielded = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        if this.delay.is_zero() {
            return Poll::Ready(());
        }
        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(tokio::time::sleep(this.delay)));
        sleep.as_mut().poll(cx)
    }
}

/// Structure-preserving rewriter inserting suspension points.
#[derive(Debug, Clone)]
pub struct Suspender {
    mode: SuspendMode,
    delay: Duration,
    parity: bool,
}

impl Suspender {
    pub fn new(mode: SuspendMode) -> Self {
        Self {
            mode,
            delay: DEFAULT_SUSPEND_DELAY,
            parity: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Starting parity for [`SuspendMode::Alternate`]. The bit flips before
    /// each node is examined and the node is wrapped when it lands on `true`,
    /// so the default (`false`) wraps the first visited node.
    pub fn with_parity(mut self, parity: bool) -> Self {
        self.parity = parity;
        self
    }

    /// Produce a rewritten copy of `ast`. `&mut self` because `Alternate`
    /// mode advances the parity bit across visited nodes, including across
    /// repeated calls on the same rewriter.
    pub fn rewrite(&mut self, ast: &Ast) -> Ast {
        if self.mode == SuspendMode::Alternate {
            self.parity = !self.parity;
            if !self.parity {
                return ast.clone();
            }
        }
        match &**ast {
            SchemaAst::StringKeyword { .. }
            | SchemaAst::NumberKeyword { .. }
            | SchemaAst::BooleanKeyword { .. }
            | SchemaAst::Literal { .. }
            | SchemaAst::Unknown { .. } => self.wrap_leaf(ast),
            SchemaAst::Declaration {
                type_parameters,
                decode,
                encode,
                annotations,
            } => Arc::new(SchemaAst::Declaration {
                type_parameters: type_parameters.iter().map(|p| self.rewrite(p)).collect(),
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
                        ty: self.rewrite(&e.ty),
                        optional: e.optional,
                    })
                    .collect(),
                rest: rest
                    .as_ref()
                    .map(|tail| tail.iter().map(|ty| self.rewrite(ty)).collect()),
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
                        ty: self.rewrite(&p.ty),
                        optional: p.optional,
                        readonly: p.readonly,
                    })
                    .collect(),
                index_signatures: index_signatures
                    .iter()
                    .map(|i| IndexSignature {
                        parameter: i.parameter.clone(),
                        ty: self.rewrite(&i.ty),
                        readonly: i.readonly,
                    })
                    .collect(),
                annotations: annotations.clone(),
            }),
            SchemaAst::Union {
                members,
                annotations,
            } => Arc::new(SchemaAst::Union {
                members: members.iter().map(|m| self.rewrite(m)).collect(),
                annotations: annotations.clone(),
            }),
            SchemaAst::Lazy { node, annotations } => {
                // Forcing must re-enter the rewriter so cyclic schemas stay
                // suspended all the way down. The parity snapshot is taken at
                // rewrite time.
                let node = node.clone();
                let snapshot = self.clone();
                Arc::new(SchemaAst::Lazy {
                    node: LazyNode::new(move || {
                        let mut rewriter = snapshot.clone();
                        rewriter.rewrite(node.force())
                    }),
                    annotations: annotations.clone(),
                })
            }
            SchemaAst::Refinement {
                from,
                decode,
                is_reversed,
                annotations,
            } => Arc::new(SchemaAst::Refinement {
                from: self.rewrite(from),
                decode: self.wrap_procedure(decode),
                is_reversed: *is_reversed,
                annotations: annotations.clone(),
            }),
            SchemaAst::Transform {
                from,
                to,
                decode,
                encode,
                annotations,
            } => Arc::new(SchemaAst::Transform {
                from: self.rewrite(from),
                to: self.rewrite(to),
                decode: self.wrap_procedure(decode),
                encode: self.wrap_procedure(encode),
                annotations: annotations.clone(),
            }),
        }
    }

    fn wrap_procedure(&self, procedure: &ParseFn) -> ParseFn {
        let delay = self.delay;
        let inner = procedure.clone();
        ParseFn::new(move |value, options| {
            let inner = inner.clone();
            Box::pin(async move {
                Suspension::new(delay).await;
                inner.call(value, options).await
            })
        })
    }

    fn wrap_leaf(&self, ast: &Ast) -> Ast {
        let delay = self.delay;
        let target = ast.clone();
        let procedure = ParseFn::new(move |value, options| {
            let target = target.clone();
            Box::pin(async move {
                Suspension::new(delay).await;
                parser::decode(&target, value, options).await
            })
        });
        Arc::new(SchemaAst::Transform {
            from: ast.clone(),
            to: ast.clone(),
            decode: procedure.clone(),
            encode: procedure,
            annotations: Annotations::default(),
        })
    }
}
