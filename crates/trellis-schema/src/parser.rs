//! # Interpreter — Compiling the AST into Decode/Encode Procedures
//!
//! One recursive implementation serves both execution strategies. Every node
//! is interpreted as a boxed future: a tree with no suspension points
//! resolves on the first poll, which is exactly what the direct entry points
//! ([`decode_sync`], [`encode_sync`]) rely on — they poll once via
//! `now_or_never` and report a single `Forbidden` error if the computation
//! would suspend. The suspendable entry points ([`decode`], [`encode`])
//! return the future for a cooperative scheduler to drive.
//!
//! Decode and encode share per-node traversal; only the direction-dependent
//! pieces (which custom procedure runs, which side of a transform validates)
//! differ. Error accumulation is deterministic: positions and keys are
//! visited in declared order, union alternatives are tried in declared order,
//! and `ErrorMode::All` collects one wrapped error per failing location while
//! `ErrorMode::First` stops at the first.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{Map, Value};

use crate::ast::{type_side, Ast, IndexSignature, PropertySignature, SchemaAst, TupleElement};
use crate::error::{ErrorMode, ExcessProperty, ParseError, ParseErrors, ParseOptions, ParseOutcome};

/// Which conversion a compiled procedure performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Decode,
    Encode,
}

/// Compile-and-run under the suspendable strategy: input representation to
/// validated output representation.
pub fn decode(ast: &Ast, input: Value, options: ParseOptions) -> BoxFuture<'static, ParseOutcome> {
    run(ast.clone(), Direction::Decode, input, options)
}

/// Compile-and-run under the suspendable strategy: validated output back to
/// input representation.
pub fn encode(ast: &Ast, input: Value, options: ParseOptions) -> BoxFuture<'static, ParseOutcome> {
    run(ast.clone(), Direction::Encode, input, options)
}

/// Direct strategy decode: runs to completion on the calling stack. Hitting
/// a suspension point fails with `Forbidden`.
pub fn decode_sync(ast: &Ast, input: Value, options: ParseOptions) -> ParseOutcome {
    finish_now(decode(ast, input, options))
}

/// Direct strategy encode. See [`decode_sync`].
pub fn encode_sync(ast: &Ast, input: Value, options: ParseOptions) -> ParseOutcome {
    finish_now(encode(ast, input, options))
}

/// Validity oracle: does `value` conform to the schema's output shape?
pub fn is(ast: &Ast, value: &Value) -> bool {
    decode_sync(&type_side(ast), value.clone(), ParseOptions::default()).is_ok()
}

fn finish_now(future: BoxFuture<'static, ParseOutcome>) -> ParseOutcome {
    match future.now_or_never() {
        Some(outcome) => outcome,
        None => {
            tracing::debug!("suspension point reached under the direct strategy");
            Err(ParseErrors::single(ParseError::Forbidden))
        }
    }
}

// ---------------------------------------------------------------------------
// Per-node interpretation
// ---------------------------------------------------------------------------

fn run(
    ast: Ast,
    direction: Direction,
    input: Value,
    options: ParseOptions,
) -> BoxFuture<'static, ParseOutcome> {
    Box::pin(async move {
        match &*ast {
            SchemaAst::StringKeyword { .. } => check_leaf(&ast, input, Value::is_string),
            SchemaAst::NumberKeyword { .. } => check_leaf(&ast, input, Value::is_number),
            SchemaAst::BooleanKeyword { .. } => check_leaf(&ast, input, Value::is_boolean),
            SchemaAst::Literal { value, .. } => {
                if input == *value {
                    Ok(input)
                } else {
                    type_error(&ast, input)
                }
            }
            SchemaAst::Unknown { .. } => Ok(input),
            SchemaAst::Declaration { decode, encode, .. } => match direction {
                Direction::Decode => decode.call(input, options).await,
                Direction::Encode => encode.call(input, options).await,
            },
            SchemaAst::Tuple { elements, rest, .. } => {
                run_tuple(&ast, elements, rest.as_deref(), direction, input, options).await
            }
            SchemaAst::TypeLiteral {
                property_signatures,
                index_signatures,
                ..
            } => {
                run_type_literal(
                    &ast,
                    property_signatures,
                    index_signatures,
                    direction,
                    input,
                    options,
                )
                .await
            }
            SchemaAst::Union { members, .. } => {
                run_union(&ast, members, direction, input, options).await
            }
            SchemaAst::Lazy { node, .. } => {
                run(node.force().clone(), direction, input, options).await
            }
            SchemaAst::Refinement {
                from,
                decode,
                is_reversed,
                ..
            } => {
                // The check rides the decode direction unless reversed.
                let check_applies = (direction == Direction::Decode) != *is_reversed;
                match direction {
                    Direction::Decode => {
                        let value = run(from.clone(), direction, input, options).await?;
                        if check_applies {
                            decode.call(value, options).await
                        } else {
                            Ok(value)
                        }
                    }
                    Direction::Encode => {
                        let value = if check_applies {
                            decode.call(input, options).await?
                        } else {
                            input
                        };
                        run(from.clone(), direction, value, options).await
                    }
                }
            }
            SchemaAst::Transform {
                from,
                to,
                decode,
                encode,
                ..
            } => match direction {
                Direction::Decode => {
                    let source = run(from.clone(), direction, input, options).await?;
                    let converted = decode.call(source, options).await?;
                    run(to.clone(), direction, converted, options).await
                }
                Direction::Encode => {
                    let target = run(to.clone(), direction, input, options).await?;
                    let converted = encode.call(target, options).await?;
                    run(from.clone(), direction, converted, options).await
                }
            },
        }
    })
}

fn check_leaf(ast: &Ast, input: Value, accepts: fn(&Value) -> bool) -> ParseOutcome {
    if accepts(&input) {
        Ok(input)
    } else {
        type_error(ast, input)
    }
}

fn type_error(ast: &Ast, actual: Value) -> ParseOutcome {
    Err(ParseErrors::single(ParseError::Type {
        expected: ast.clone(),
        actual,
        message: None,
    }))
}

async fn run_tuple(
    ast: &Ast,
    elements: &[TupleElement],
    rest: Option<&[Ast]>,
    direction: Direction,
    input: Value,
    options: ParseOptions,
) -> ParseOutcome {
    let Value::Array(items) = input else {
        return type_error(ast, input);
    };
    let collect_all = options.errors == ErrorMode::All;
    let mut output: Vec<Value> = Vec::with_capacity(items.len());
    let mut errors: Vec<ParseError> = Vec::new();

    for (index, element) in elements.iter().enumerate() {
        match items.get(index) {
            Some(item) => {
                match run(element.ty.clone(), direction, item.clone(), options).await {
                    Ok(value) => output.push(value),
                    Err(child) => {
                        let error = ParseError::Index {
                            index,
                            errors: child,
                        };
                        if collect_all {
                            errors.push(error);
                        } else {
                            return Err(ParseErrors::single(error));
                        }
                    }
                }
            }
            None => {
                if element.optional {
                    continue;
                }
                let error = ParseError::Index {
                    index,
                    errors: ParseErrors::single(ParseError::Missing),
                };
                if collect_all {
                    errors.push(error);
                } else {
                    return Err(ParseErrors::single(error));
                }
            }
        }
    }

    match rest.and_then(<[Ast]>::split_first) {
        Some((head, tail)) => {
            // Variadic middle, then required trailing elements.
            let tail_start = items.len().saturating_sub(tail.len()).max(elements.len());
            for index in elements.len()..tail_start {
                match run(head.clone(), direction, items[index].clone(), options).await {
                    Ok(value) => output.push(value),
                    Err(child) => {
                        let error = ParseError::Index {
                            index,
                            errors: child,
                        };
                        if collect_all {
                            errors.push(error);
                        } else {
                            return Err(ParseErrors::single(error));
                        }
                    }
                }
            }
            for (offset, ty) in tail.iter().enumerate() {
                let index = tail_start + offset;
                match items.get(index) {
                    Some(item) => match run(ty.clone(), direction, item.clone(), options).await {
                        Ok(value) => output.push(value),
                        Err(child) => {
                            let error = ParseError::Index {
                                index,
                                errors: child,
                            };
                            if collect_all {
                                errors.push(error);
                            } else {
                                return Err(ParseErrors::single(error));
                            }
                        }
                    },
                    None => {
                        let error = ParseError::Index {
                            index,
                            errors: ParseErrors::single(ParseError::Missing),
                        };
                        if collect_all {
                            errors.push(error);
                        } else {
                            return Err(ParseErrors::single(error));
                        }
                    }
                }
            }
        }
        None => {
            for index in elements.len()..items.len() {
                let error = ParseError::Index {
                    index,
                    errors: ParseErrors::single(ParseError::Unexpected {
                        actual: items[index].clone(),
                    }),
                };
                if collect_all {
                    errors.push(error);
                } else {
                    return Err(ParseErrors::single(error));
                }
            }
        }
    }

    match ParseErrors::from_vec(errors) {
        Some(errors) => Err(errors),
        None => Ok(Value::Array(output)),
    }
}

async fn run_type_literal(
    ast: &Ast,
    property_signatures: &[PropertySignature],
    index_signatures: &[IndexSignature],
    direction: Direction,
    input: Value,
    options: ParseOptions,
) -> ParseOutcome {
    let Value::Object(map) = input else {
        return type_error(ast, input);
    };
    let collect_all = options.errors == ErrorMode::All;
    let mut output: Map<String, Value> = Map::new();
    let mut errors: Vec<ParseError> = Vec::new();

    for property in property_signatures {
        match map.get(&property.key) {
            Some(item) => {
                match run(property.ty.clone(), direction, item.clone(), options).await {
                    Ok(value) => {
                        output.insert(property.key.clone(), value);
                    }
                    Err(child) => {
                        let error = ParseError::Key {
                            key: property.key.clone(),
                            errors: child,
                        };
                        if collect_all {
                            errors.push(error);
                        } else {
                            return Err(ParseErrors::single(error));
                        }
                    }
                }
            }
            None => {
                if property.optional {
                    continue;
                }
                let error = ParseError::Key {
                    key: property.key.clone(),
                    errors: ParseErrors::single(ParseError::Missing),
                };
                if collect_all {
                    errors.push(error);
                } else {
                    return Err(ParseErrors::single(error));
                }
            }
        }
    }

    // Keys not covered by a property signature go through the first index
    // signature whose parameter accepts them, else the excess policy.
    for (key, item) in &map {
        if property_signatures.iter().any(|p| p.key == *key) {
            continue;
        }
        let mut covered = false;
        for signature in index_signatures {
            if !key_matches(&signature.parameter, key, options).await {
                continue;
            }
            covered = true;
            match run(signature.ty.clone(), direction, item.clone(), options).await {
                Ok(value) => {
                    output.insert(key.clone(), value);
                }
                Err(child) => {
                    let error = ParseError::Key {
                        key: key.clone(),
                        errors: child,
                    };
                    if collect_all {
                        errors.push(error);
                    } else {
                        return Err(ParseErrors::single(error));
                    }
                }
            }
            break;
        }
        if covered {
            continue;
        }
        match options.on_excess_property {
            ExcessProperty::Ignore => {
                tracing::trace!(key = %key, "dropping excess property");
            }
            ExcessProperty::Error => {
                let error = ParseError::Key {
                    key: key.clone(),
                    errors: ParseErrors::single(ParseError::Unexpected {
                        actual: item.clone(),
                    }),
                };
                if collect_all {
                    errors.push(error);
                } else {
                    return Err(ParseErrors::single(error));
                }
            }
        }
    }

    match ParseErrors::from_vec(errors) {
        Some(errors) => Err(errors),
        None => Ok(Value::Object(output)),
    }
}

async fn key_matches(parameter: &Ast, key: &str, options: ParseOptions) -> bool {
    run(
        parameter.clone(),
        Direction::Decode,
        Value::String(key.to_string()),
        options,
    )
    .await
    .is_ok()
}

async fn run_union(
    ast: &Ast,
    members: &[Ast],
    direction: Direction,
    input: Value,
    options: ParseOptions,
) -> ParseOutcome {
    let mut member_errors: Vec<ParseError> = Vec::with_capacity(members.len());
    for (position, member) in members.iter().enumerate() {
        match run(member.clone(), direction, input.clone(), options).await {
            Ok(value) => {
                tracing::trace!(member = position, "union member accepted");
                return Ok(value);
            }
            // The caller needs every alternative's reason, so union failures
            // are always a full collection regardless of the error mode.
            Err(errors) => member_errors.push(ParseError::UnionMember { errors }),
        }
    }
    match ParseErrors::from_vec(member_errors) {
        Some(errors) => Err(errors),
        // An empty union accepts nothing.
        None => type_error(ast, input),
    }
}
