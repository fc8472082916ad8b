//! # Value Generation — Proptest Strategies from Schema ASTs
//!
//! Derives a `proptest` strategy producing values that conform to a schema's
//! output shape. This is the engine's "value generator" collaborator: the
//! round-trip harness samples it and checks every sample against the `is`
//! oracle before exercising encode/decode.
//!
//! Generation works on the output-side projection, so transforms never
//! appear here. Refinements generate from their base shape and filter
//! through the refinement check; `Lazy` nodes are forced under a depth cap
//! so cyclic schemas produce bounded values (union members that bottom out
//! at the cap are simply not sampled).

use proptest::prelude::*;
use serde_json::{Map, Value};
use thiserror::Error;

use trellis_schema::{decode_sync, type_side, Ast, ParseOptions, SchemaAst};

/// Forcing depth cap for `Lazy` nodes during strategy construction.
const MAX_LAZY_DEPTH: usize = 8;

/// A schema shape with no derivable value strategy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArbitraryError {
    /// Declarations carry opaque procedures; nothing to derive from.
    #[error("declaration schemas have no derivable value strategy")]
    Declaration,
    /// Every member of a union was itself underivable.
    #[error("no union member admits value generation")]
    EmptyUnion,
    /// A cyclic schema with no derivable base case.
    #[error("lazy schema exceeded the generation depth limit")]
    DepthLimit,
}

/// Strategy over values conforming to the schema's output shape.
pub fn value_strategy(ast: &Ast) -> Result<BoxedStrategy<Value>, ArbitraryError> {
    strategy_for(&type_side(ast), 0)
}

fn strategy_for(ast: &Ast, depth: usize) -> Result<BoxedStrategy<Value>, ArbitraryError> {
    match &**ast {
        SchemaAst::StringKeyword { .. } => Ok("[a-zA-Z0-9]{0,12}".prop_map(Value::String).boxed()),
        SchemaAst::NumberKeyword { .. } => Ok(prop_oneof![
            any::<i32>().prop_map(Value::from),
            (-1.0e9f64..1.0e9f64).prop_map(Value::from),
        ]
        .boxed()),
        SchemaAst::BooleanKeyword { .. } => Ok(any::<bool>().prop_map(Value::Bool).boxed()),
        SchemaAst::Literal { value, .. } => Ok(Just(value.clone()).boxed()),
        SchemaAst::Unknown { .. } => Ok(unknown_value()),
        SchemaAst::Declaration { .. } => Err(ArbitraryError::Declaration),
        SchemaAst::Tuple { elements, rest, .. } => {
            let mut strategy: BoxedStrategy<Vec<Value>> = Just(Vec::new()).boxed();
            for element in elements {
                let item = strategy_for(&element.ty, depth)?;
                strategy = (strategy, item)
                    .prop_map(|(mut values, item)| {
                        values.push(item);
                        values
                    })
                    .boxed();
            }
            if let Some((head, tail)) = rest.as_deref().and_then(<[Ast]>::split_first) {
                let middle = proptest::collection::vec(strategy_for(head, depth)?, 0..4);
                strategy = (strategy, middle)
                    .prop_map(|(mut values, mut middle)| {
                        values.append(&mut middle);
                        values
                    })
                    .boxed();
                for ty in tail {
                    let item = strategy_for(ty, depth)?;
                    strategy = (strategy, item)
                        .prop_map(|(mut values, item)| {
                            values.push(item);
                            values
                        })
                        .boxed();
                }
            }
            Ok(strategy.prop_map(Value::Array).boxed())
        }
        SchemaAst::TypeLiteral {
            property_signatures,
            ..
        } => {
            // A record with no keys beyond the declared ones is always valid,
            // so index signatures contribute nothing here.
            let mut strategy: BoxedStrategy<Map<String, Value>> = Just(Map::new()).boxed();
            for property in property_signatures {
                let key = property.key.clone();
                let item = strategy_for(&property.ty, depth)?;
                strategy = (strategy, item)
                    .prop_map(move |(mut map, item)| {
                        map.insert(key.clone(), item);
                        map
                    })
                    .boxed();
            }
            Ok(strategy.prop_map(Value::Object).boxed())
        }
        SchemaAst::Union { members, .. } => {
            let viable: Vec<BoxedStrategy<Value>> = members
                .iter()
                .filter_map(|member| strategy_for(member, depth).ok())
                .collect();
            if viable.is_empty() {
                Err(ArbitraryError::EmptyUnion)
            } else {
                Ok(proptest::strategy::Union::new(viable).boxed())
            }
        }
        SchemaAst::Lazy { node, .. } => {
            if depth >= MAX_LAZY_DEPTH {
                Err(ArbitraryError::DepthLimit)
            } else {
                strategy_for(node.force(), depth + 1)
            }
        }
        SchemaAst::Refinement { from, .. } => {
            let base = strategy_for(from, depth)?;
            let schema = ast.clone();
            Ok(base
                .prop_filter("refinement accepts the value", move |value| {
                    decode_sync(&schema, value.clone(), ParseOptions::default()).is_ok()
                })
                .boxed())
        }
        // Unreachable through `value_strategy` (the projection collapses
        // transforms), but a raw AST handed to `strategy_for` still gets a
        // sensible answer: generate for the output side.
        SchemaAst::Transform { to, .. } => strategy_for(&type_side(to), depth),
    }
}

fn unknown_value() -> BoxedStrategy<Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        "[a-z0-9]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
    .boxed()
}
