//! Content-based recipient selection.
//!
//! A query (filter + ordering + limit) is compiled once against an operator
//! registry, then evaluated against the metadata document of every connected
//! client. The matches are ordered and truncated into a recipient list.

pub mod errors;
pub mod context;
pub mod engine;
pub mod operators; // built-in and extension operators
pub mod pointer;
pub mod operand;
pub mod expression;
pub mod compiler;
pub mod filter;
pub mod selector;
mod comparison;
mod parser;

use serde_json::Value;

pub use context::Context;
pub use engine::{Engine, Recipient};
pub use errors::{CompileError, RegistrationError, Result};
pub use expression::{CompiledQuery, Direction, Expr, OrderKey, Select};
pub use operand::Operand;
pub use operators::{Combinator, Comparator, Registry};
pub use parser::ParseError;
pub use pointer::Pointer;

/// Convenience: compile with built-in operators and default limits.
pub fn compile(raw: &Value) -> Result<CompiledQuery> {
    compiler::compile(&Registry::new(), &Context::default(), raw)
}

/// Convenience: does `document` match the query's filter?
pub fn matches(query: &CompiledQuery, document: &Value) -> bool {
    filter::matches(query, document)
}
