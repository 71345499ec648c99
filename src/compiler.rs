//! Validation of untrusted query payloads into `CompiledQuery` trees.
//!
//! The walk is fail-fast: the first structural problem is reported with its
//! location as a JSON pointer into the query document.

use serde_json::{Map, Value};

use crate::context::Context;
use crate::errors::{CompileError, Result};
use crate::expression::{CompiledQuery, Direction, Expr, OrderKey, Select};
use crate::operand::Operand;
use crate::operators::{ComparisonOp, LogicalOp, Operator, Registry};
use crate::pointer::Pointer;

/// Compile a query that has already been decoded from JSON.
pub fn compile(registry: &Registry, ctx: &Context, raw: &Value) -> Result<CompiledQuery> {
    let compiled = Compiler { registry, ctx }.query(raw)?;
    tracing::debug!(
        query = compiled.name().unwrap_or("<unnamed>"),
        nodes = compiled.filter().map(Expr::node_count).unwrap_or(0),
        ordering_keys = compiled.select().map(|s| s.ordering.len()).unwrap_or(0),
        "compiled query"
    );
    Ok(compiled)
}

/// Decode and compile a JSON query string.
pub fn compile_str(registry: &Registry, ctx: &Context, raw: &str) -> Result<CompiledQuery> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| CompileError::InvalidJson(e.to_string()))?;
    compile(registry, ctx, &value)
}

struct Compiler<'r> {
    registry: &'r Registry,
    ctx: &'r Context,
}

impl Compiler<'_> {
    fn query(&self, raw: &Value) -> Result<CompiledQuery> {
        let obj = object(raw, "", "query must be an object")?;
        only_keys(obj, "", &["_debug", "debugInfo", "filter", "select"])?;
        // `_debug` wins over `debugInfo`; neither can fail compilation
        let name = obj
            .get("_debug")
            .or_else(|| obj.get("debugInfo"))
            .and_then(debug_name);
        let filter = match obj.get("filter") {
            None | Some(Value::Null) => None,
            Some(f) => self.filter(f, "/filter")?,
        };
        let select = match obj.get("select") {
            None | Some(Value::Null) => None,
            Some(s) => Some(self.select(s, "/select")?),
        };
        Ok(CompiledQuery {
            name,
            filter,
            select,
        })
    }

    // A list is an implicit `$and`; an empty list matches everything.
    fn filter(&self, raw: &Value, at: &str) -> Result<Option<Expr>> {
        match raw {
            Value::Array(items) => {
                let mut children = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.expr(item, &format!("{at}/{i}"), 1))
                    .collect::<Result<Vec<_>>>()?;
                Ok(match children.len() {
                    0 => None,
                    1 => children.pop(),
                    _ => Some(Expr::Logical {
                        op: LogicalOp::And,
                        children,
                    }),
                })
            }
            Value::Object(_) => self.expr(raw, at, 1).map(Some),
            _ => Err(malformed(at, "filter must be an expression or a list of expressions")),
        }
    }

    fn expr(&self, raw: &Value, at: &str, depth: usize) -> Result<Expr> {
        if depth > self.ctx.max_depth {
            return Err(CompileError::TooDeep {
                at: at.to_string(),
                limit: self.ctx.max_depth,
            });
        }
        let obj = object(raw, at, "expression must be an object")?;
        let op_name = match obj.get("op") {
            Some(Value::String(s)) => s.as_str(),
            Some(_) => return Err(malformed(&format!("{at}/op"), "`op` must be a string")),
            None => return Err(malformed(at, "missing `op`")),
        };
        let op = self
            .registry
            .lookup(op_name)
            .map_err(|e| CompileError::InvalidOperator {
                at: format!("{at}/op"),
                op: op_name.to_string(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| CompileError::UnknownOperator {
                at: format!("{at}/op"),
                op: op_name.to_string(),
            })?;
        match op {
            Operator::Comparison(op) => self.comparison(op, obj, at),
            Operator::Logical(op) => self.logical(op, obj, at, depth),
        }
    }

    fn comparison(&self, op: ComparisonOp, obj: &Map<String, Value>, at: &str) -> Result<Expr> {
        only_keys(obj, at, &["op", "path", "value"])?;
        let path = match obj.get("path") {
            Some(Value::String(p)) => pointer(p, &format!("{at}/path"))?,
            Some(_) => return Err(malformed(&format!("{at}/path"), "`path` must be a string")),
            None => {
                return Err(malformed(
                    at,
                    &format!("comparison `{}` requires a `path`", op.name()),
                ))
            }
        };
        let operand_at = format!("{at}/value");
        let operand = match obj.get("value") {
            Some(v) => operand(v, &operand_at)?,
            None => {
                return Err(malformed(
                    at,
                    &format!("comparison `{}` requires a `value`", op.name()),
                ))
            }
        };
        check_operand(&op, &operand, &operand_at)?;
        Ok(Expr::Comparison { op, path, operand })
    }

    fn logical(
        &self,
        op: LogicalOp,
        obj: &Map<String, Value>,
        at: &str,
        depth: usize,
    ) -> Result<Expr> {
        if obj.contains_key("path") {
            return Err(malformed(
                &format!("{at}/path"),
                &format!("logical operator `{}` takes no `path`", op.name()),
            ));
        }
        only_keys(obj, at, &["op", "value", "with"])?;
        let (key, raw) = match (obj.get("value"), obj.get("with")) {
            (Some(v), None) => ("value", v),
            (None, Some(w)) => ("with", w),
            (Some(_), Some(_)) => {
                return Err(malformed(at, "`value` and `with` are mutually exclusive"))
            }
            (None, None) => {
                return Err(malformed(
                    at,
                    &format!("logical operator `{}` requires a list of operands", op.name()),
                ))
            }
        };
        let items = match raw {
            Value::Array(items) => items,
            _ => {
                return Err(malformed(
                    &format!("{at}/{key}"),
                    "logical operands must be a list",
                ))
            }
        };
        let arity = op.arity();
        if items.is_empty() || !arity.contains(&items.len()) {
            return Err(CompileError::Arity {
                at: format!("{at}/{key}"),
                op: op.name().to_string(),
                expected: describe_arity(*arity.start().max(&1), *arity.end()),
                found: items.len(),
            });
        }
        let children = items
            .iter()
            .enumerate()
            .map(|(i, item)| self.expr(item, &format!("{at}/{key}/{i}"), depth + 1))
            .collect::<Result<Vec<_>>>()?;
        Ok(Expr::Logical { op, children })
    }

    fn select(&self, raw: &Value, at: &str) -> Result<Select> {
        let obj = match raw {
            Value::Object(obj) => obj,
            _ => return Err(invalid_select(at, "select must be an object")),
        };
        for key in obj.keys() {
            if key != "ordering" && key != "limit" {
                return Err(invalid_select(at, &format!("unexpected key `{key}`")));
            }
        }
        let ordering = match obj.get("ordering") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => {
                if entries.len() > self.ctx.max_ordering_keys {
                    return Err(invalid_select(
                        &format!("{at}/ordering"),
                        &format!(
                            "at most {} ordering keys are allowed, got {}",
                            self.ctx.max_ordering_keys,
                            entries.len()
                        ),
                    ));
                }
                entries
                    .iter()
                    .enumerate()
                    .map(|(i, e)| order_key(e, &format!("{at}/ordering/{i}")))
                    .collect::<Result<Vec<_>>>()?
            }
            Some(_) => {
                return Err(invalid_select(
                    &format!("{at}/ordering"),
                    "ordering must be a list",
                ))
            }
        };
        let limit = match obj.get("limit") {
            None | Some(Value::Null) => None,
            Some(v) => match v.as_u64() {
                Some(n) => Some(usize::try_from(n).unwrap_or(usize::MAX)),
                None => {
                    return Err(invalid_select(
                        &format!("{at}/limit"),
                        "limit must be a non-negative integer",
                    ))
                }
            },
        };
        Ok(Select { ordering, limit })
    }
}

// Accepts `{"$asc": "/p"}`, `{"$desc": "/p"}` or the pair `["Ascending", "/p"]`.
fn order_key(raw: &Value, at: &str) -> Result<OrderKey> {
    let (direction, path, path_at) = match raw {
        Value::Object(obj) => {
            let mut entries = obj.iter();
            let (key, path) = match (entries.next(), entries.next()) {
                (Some(entry), None) => entry,
                _ => {
                    return Err(invalid_select(
                        at,
                        "ordering entry must have exactly one of `$asc` or `$desc`",
                    ))
                }
            };
            let direction = match key.as_str() {
                "$asc" => Direction::Ascending,
                "$desc" => Direction::Descending,
                other => {
                    return Err(invalid_select(
                        at,
                        &format!("unknown ordering direction `{other}`"),
                    ))
                }
            };
            (direction, path, format!("{at}/{key}"))
        }
        Value::Array(pair) if pair.len() == 2 => {
            let direction = match pair[0].as_str() {
                Some("Ascending") => Direction::Ascending,
                Some("Descending") => Direction::Descending,
                _ => {
                    return Err(invalid_select(
                        &format!("{at}/0"),
                        "direction must be `Ascending` or `Descending`",
                    ))
                }
            };
            (direction, &pair[1], format!("{at}/1"))
        }
        _ => {
            return Err(invalid_select(
                at,
                "ordering entry must be `{\"$asc\": path}`, `{\"$desc\": path}` or `[direction, path]`",
            ))
        }
    };
    let path = match path {
        Value::String(p) => pointer(p, &path_at)?,
        _ => return Err(invalid_select(&path_at, "ordering path must be a string")),
    };
    Ok(OrderKey { path, direction })
}

fn operand(raw: &Value, at: &str) -> Result<Operand> {
    let obj = object(raw, at, "operand must be an object with `value` or `path`")?;
    let mut entries = obj.iter();
    match (entries.next(), entries.next()) {
        (Some((key, v)), None) if key == "value" => Ok(Operand::Literal(v.clone())),
        (Some((key, Value::String(p))), None) if key == "path" => {
            Ok(Operand::Reference(pointer(p, &format!("{at}/path"))?))
        }
        (Some((key, _)), None) if key == "path" => {
            Err(malformed(&format!("{at}/path"), "`path` must be a string"))
        }
        _ => Err(malformed(
            at,
            "operand must have exactly one of `value` or `path`",
        )),
    }
}

// Operator-specific operand shapes that can be checked before evaluation.
fn check_operand(op: &ComparisonOp, operand: &Operand, at: &str) -> Result<()> {
    match (op, operand.as_literal()) {
        (ComparisonOp::Exists, Some(Value::Bool(_))) => Ok(()),
        (ComparisonOp::Exists, _) => Err(malformed(at, "`$exists` takes a literal boolean")),
        (ComparisonOp::In | ComparisonOp::Nin, Some(v)) if !v.is_array() => Err(malformed(
            at,
            &format!("`{}` takes a list", op.name()),
        )),
        _ => Ok(()),
    }
}

fn debug_name(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn pointer(raw: &str, at: &str) -> Result<Pointer> {
    Pointer::parse(raw).map_err(|e| CompileError::InvalidPointer {
        at: at.to_string(),
        pointer: raw.to_string(),
        reason: e.to_string(),
    })
}

fn object<'v>(raw: &'v Value, at: &str, reason: &str) -> Result<&'v Map<String, Value>> {
    raw.as_object().ok_or_else(|| malformed(at, reason))
}

fn only_keys(obj: &Map<String, Value>, at: &str, allowed: &[&str]) -> Result<()> {
    match obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(malformed(at, &format!("unexpected key `{key}`"))),
        None => Ok(()),
    }
}

fn describe_arity(min: usize, max: usize) -> String {
    if min == max {
        format!("exactly {min}")
    } else if max == usize::MAX {
        format!("at least {min}")
    } else {
        format!("{min} to {max}")
    }
}

fn malformed(at: &str, reason: &str) -> CompileError {
    CompileError::Malformed {
        at: at.to_string(),
        reason: reason.to_string(),
    }
}

fn invalid_select(at: &str, reason: &str) -> CompileError {
    CompileError::InvalidSelect {
        at: at.to_string(),
        reason: reason.to_string(),
    }
}
