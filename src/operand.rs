use serde_json::Value;

use crate::pointer::Pointer;

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    /// Points into the same document the comparison is evaluated against.
    Reference(Pointer),
}

impl Operand {
    pub fn resolve<'v>(&'v self, document: &'v Value) -> Option<&'v Value> {
        match self {
            Operand::Literal(v) => Some(v),
            Operand::Reference(p) => p.resolve(document),
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Operand::Literal(v) => Some(v),
            Operand::Reference(_) => None,
        }
    }
}
