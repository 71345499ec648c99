//! RFC 6901 pointers over metadata documents.

use std::fmt;

use serde_json::Value;

use crate::parser::{ParseError, Parser};

/// A parsed, validated JSON pointer.
///
/// Parsing happens once at compile time; `resolve` then walks the
/// pre-split tokens for every candidate document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    raw: String,
    tokens: Vec<String>,
}

impl Pointer {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let tokens = Parser::new(raw).parse_pointer_tokens()?;
        Ok(Self {
            raw: raw.to_string(),
            tokens,
        })
    }

    pub fn root() -> Self {
        Self {
            raw: String::new(),
            tokens: Vec::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Returns the value this pointer names in `document`, or `None` when any
    /// token fails to resolve.
    pub fn resolve<'v>(&self, document: &'v Value) -> Option<&'v Value> {
        self.tokens
            .iter()
            .try_fold(document, |node, token| step(node, token))
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One-shot resolution of a pointer string. A syntactically invalid pointer
/// resolves to nothing.
pub fn resolve<'v>(document: &'v Value, path: &str) -> Option<&'v Value> {
    Pointer::parse(path).ok()?.resolve(document)
}

fn step<'v>(node: &'v Value, token: &str) -> Option<&'v Value> {
    match node {
        Value::Object(map) => map.get(token),
        Value::Array(items) => array_index(token).and_then(|i| items.get(i)),
        _ => None,
    }
}

// Decimal digits only, no leading zeros; `-` (one past the end) never exists.
fn array_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    token.parse().ok()
}
