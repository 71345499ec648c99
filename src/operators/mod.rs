use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::errors::RegistrationError;
use crate::parser::{ParseError, Parser};

/// Extension comparison operator, registered under `<extension>$<name>`.
pub trait Comparator: Send + Sync {
    /// Fully qualified identifier, e.g. `geo$within`.
    fn name(&self) -> &str;
    fn compare(&self, left: &Value, right: &Value) -> bool;
    /// Result when the compared path is missing from the document.
    ///
    /// `right` is `None` when the operand is itself an unresolved reference.
    fn matches_absent(&self, _right: Option<&Value>) -> bool {
        false
    }
}

/// Extension logical operator over child results.
pub trait Combinator: Send + Sync {
    fn name(&self) -> &str;
    fn arity(&self) -> RangeInclusive<usize> {
        1..=usize::MAX
    }
    /// Child results are produced lazily in declaration order; whatever is
    /// not pulled is never evaluated.
    fn combine(&self, results: &mut dyn Iterator<Item = bool>) -> bool;
}

#[derive(Clone)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    Nin,
    Contains,
    NotContains,
    Exists,
    Extension(Arc<dyn Comparator>),
}

impl ComparisonOp {
    pub fn name(&self) -> &str {
        match self {
            ComparisonOp::Eq => "$eq",
            ComparisonOp::Ne => "$ne",
            ComparisonOp::Lt => "$lt",
            ComparisonOp::Gt => "$gt",
            ComparisonOp::Le => "$le",
            ComparisonOp::Ge => "$ge",
            ComparisonOp::In => "$in",
            ComparisonOp::Nin => "$nin",
            ComparisonOp::Contains => "$contains",
            ComparisonOp::NotContains => "$ncontains",
            ComparisonOp::Exists => "$exists",
            ComparisonOp::Extension(c) => c.name(),
        }
    }

    /// Compares two present values. Mismatched shapes are `false`.
    pub fn compare(&self, left: &Value, right: &Value) -> bool {
        match self {
            ComparisonOp::Eq => builtins::eq(left, right),
            ComparisonOp::Ne => !builtins::eq(left, right),
            ComparisonOp::Lt => builtins::ordered(left, right, |o| o.is_lt()),
            ComparisonOp::Gt => builtins::ordered(left, right, |o| o.is_gt()),
            ComparisonOp::Le => builtins::ordered(left, right, |o| o.is_le()),
            ComparisonOp::Ge => builtins::ordered(left, right, |o| o.is_ge()),
            ComparisonOp::In => builtins::member(left, right).unwrap_or(false),
            ComparisonOp::Nin => builtins::member(left, right).is_some_and(|found| !found),
            ComparisonOp::Contains => builtins::contains(left, right).unwrap_or(false),
            ComparisonOp::NotContains => {
                builtins::contains(left, right).is_some_and(|found| !found)
            }
            ComparisonOp::Exists => right.as_bool() == Some(true),
            ComparisonOp::Extension(c) => c.compare(left, right),
        }
    }

    pub fn matches_absent(&self, right: Option<&Value>) -> bool {
        match self {
            ComparisonOp::Exists => right.and_then(Value::as_bool) == Some(false),
            ComparisonOp::Extension(c) => c.matches_absent(right),
            _ => false,
        }
    }
}

impl fmt::Debug for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone)]
pub enum LogicalOp {
    And,
    Or,
    Not,
    Xor,
    Extension(Arc<dyn Combinator>),
}

impl LogicalOp {
    pub fn name(&self) -> &str {
        match self {
            LogicalOp::And => "$and",
            LogicalOp::Or => "$or",
            LogicalOp::Not => "$not",
            LogicalOp::Xor => "$xor",
            LogicalOp::Extension(c) => c.name(),
        }
    }

    pub fn arity(&self) -> RangeInclusive<usize> {
        match self {
            LogicalOp::Not => 1..=1,
            LogicalOp::Extension(c) => c.arity(),
            _ => 1..=usize::MAX,
        }
    }

    pub fn combine(&self, results: &mut dyn Iterator<Item = bool>) -> bool {
        match self {
            LogicalOp::And => {
                for r in results {
                    if !r {
                        return false;
                    }
                }
                true
            }
            LogicalOp::Or => {
                for r in results {
                    if r {
                        return true;
                    }
                }
                false
            }
            LogicalOp::Not => match results.next() {
                Some(r) => !r,
                None => false,
            },
            LogicalOp::Xor => results.fold(false, |acc, r| acc ^ r),
            LogicalOp::Extension(c) => c.combine(results),
        }
    }
}

impl fmt::Debug for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of resolving an operator identifier.
#[derive(Debug, Clone)]
pub enum Operator {
    Comparison(ComparisonOp),
    Logical(LogicalOp),
}

/// Thread-safe operator registry.
///
/// Built-ins are always available. Extensions are added at startup; once the
/// registry is shared with an engine it is only ever read.
#[derive(Clone, Default)]
pub struct Registry {
    comparators: Arc<HashMap<String, Arc<dyn Comparator>>>,
    combinators: Arc<HashMap<String, Arc<dyn Combinator>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_comparator<C: Comparator + 'static>(
        &mut self,
        c: C,
    ) -> Result<(), RegistrationError> {
        let id = self.claim(c.name())?;
        tracing::debug!(operator = %id, kind = "comparison", "registered extension operator");
        Arc::make_mut(&mut self.comparators).insert(id, Arc::new(c));
        Ok(())
    }

    pub fn register_combinator<C: Combinator + 'static>(
        &mut self,
        c: C,
    ) -> Result<(), RegistrationError> {
        let id = self.claim(c.name())?;
        tracing::debug!(operator = %id, kind = "logical", "registered extension operator");
        Arc::make_mut(&mut self.combinators).insert(id, Arc::new(c));
        Ok(())
    }

    /// Resolves an identifier. `Err` means the identifier is malformed,
    /// `Ok(None)` that it is well-formed but not registered.
    pub fn lookup(&self, id: &str) -> Result<Option<Operator>, ParseError> {
        let (extension, name) = Parser::new(id).parse_operator()?;
        if extension.is_some() {
            if let Some(c) = self.comparators.get(id) {
                return Ok(Some(Operator::Comparison(ComparisonOp::Extension(c.clone()))));
            }
            return Ok(self
                .combinators
                .get(id)
                .map(|c| Operator::Logical(LogicalOp::Extension(c.clone()))));
        }
        Ok(builtins::lookup(name))
    }

    pub fn contains(&self, id: &str) -> bool {
        matches!(self.lookup(id), Ok(Some(_)))
    }

    fn claim(&self, id: &str) -> Result<String, RegistrationError> {
        let (extension, _) =
            Parser::new(id)
                .parse_operator()
                .map_err(|e| RegistrationError::InvalidIdentifier {
                    id: id.to_string(),
                    reason: e.to_string(),
                })?;
        if extension.is_none() {
            return Err(RegistrationError::InvalidIdentifier {
                id: id.to_string(),
                reason: "bare `$name` identifiers are reserved for built-ins".into(),
            });
        }
        if self.comparators.contains_key(id) || self.combinators.contains_key(id) {
            return Err(RegistrationError::Duplicate(id.to_string()));
        }
        Ok(id.to_string())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut comparators: Vec<_> = self.comparators.keys().collect();
        let mut combinators: Vec<_> = self.combinators.keys().collect();
        comparators.sort();
        combinators.sort();
        f.debug_struct("Registry")
            .field("comparators", &comparators)
            .field("combinators", &combinators)
            .finish()
    }
}

pub mod builtins {
    use super::*;
    use crate::comparison::{cmp_values, values_equal};
    use std::cmp::Ordering;

    pub fn lookup(name: &str) -> Option<Operator> {
        let op = match name {
            "eq" => Operator::Comparison(ComparisonOp::Eq),
            "ne" => Operator::Comparison(ComparisonOp::Ne),
            "lt" => Operator::Comparison(ComparisonOp::Lt),
            "gt" => Operator::Comparison(ComparisonOp::Gt),
            "le" => Operator::Comparison(ComparisonOp::Le),
            "ge" => Operator::Comparison(ComparisonOp::Ge),
            "in" => Operator::Comparison(ComparisonOp::In),
            "nin" => Operator::Comparison(ComparisonOp::Nin),
            "contains" => Operator::Comparison(ComparisonOp::Contains),
            "ncontains" => Operator::Comparison(ComparisonOp::NotContains),
            "exists" => Operator::Comparison(ComparisonOp::Exists),
            "and" => Operator::Logical(LogicalOp::And),
            "or" => Operator::Logical(LogicalOp::Or),
            "not" => Operator::Logical(LogicalOp::Not),
            "xor" => Operator::Logical(LogicalOp::Xor),
            _ => return None,
        };
        Some(op)
    }

    pub fn eq(left: &Value, right: &Value) -> bool {
        values_equal(left, right)
    }

    pub fn ordered<F>(left: &Value, right: &Value, pred_on_ord: F) -> bool
    where
        F: Fn(Ordering) -> bool,
    {
        cmp_values(left, right).is_some_and(pred_on_ord)
    }

    /// `Some(found)` when `right` is an array, `None` otherwise.
    pub fn member(left: &Value, right: &Value) -> Option<bool> {
        right
            .as_array()
            .map(|items| items.iter().any(|item| values_equal(left, item)))
    }

    /// Substring or element containment; `None` for unsupported shapes.
    pub fn contains(left: &Value, right: &Value) -> Option<bool> {
        match (left, right) {
            (Value::String(haystack), Value::String(needle)) => {
                Some(haystack.contains(needle.as_str()))
            }
            (Value::Array(items), needle) => {
                Some(items.iter().any(|item| values_equal(item, needle)))
            }
            _ => None,
        }
    }
}
