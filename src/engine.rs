use std::sync::Arc;

use serde_json::Value;

use crate::compiler;
use crate::context::Context;
use crate::errors::Result;
use crate::expression::CompiledQuery;
use crate::filter;
use crate::operators::Registry;
use crate::selector;

/// A matched client: the caller's handle plus the metadata it matched on.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient<'d, H> {
    pub handle: H,
    pub document: &'d Value,
}

/// Compiles queries and routes them over candidate documents.
///
/// The registry is frozen once it is handed to the engine, so an `Engine`
/// can be cloned cheaply and shared across worker threads.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    registry: Arc<Registry>,
    ctx: Context,
}

impl Engine {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
            ctx: Context::default(),
        }
    }

    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn compile(&self, raw: &Value) -> Result<CompiledQuery> {
        compiler::compile(&self.registry, &self.ctx, raw).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected query");
        })
    }

    pub fn compile_str(&self, raw: &str) -> Result<CompiledQuery> {
        compiler::compile_str(&self.registry, &self.ctx, raw).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected query");
        })
    }

    pub fn matches(&self, query: &CompiledQuery, document: &Value) -> bool {
        filter::matches(query, document)
    }

    /// Filters `candidates`, then orders and limits the matches.
    ///
    /// Ties under the query's ordering keep candidate order, so callers that
    /// need reproducible output should enumerate candidates in a stable order.
    pub fn route<'d, H, I>(&self, query: &CompiledQuery, candidates: I) -> Vec<Recipient<'d, H>>
    where
        I: IntoIterator<Item = (H, &'d Value)>,
    {
        let span = tracing::debug_span!("route", query = query.name().unwrap_or("<unnamed>"));
        let _enter = span.enter();
        let matched: Vec<Recipient<'d, H>> = candidates
            .into_iter()
            .filter(|(_, document)| filter::matches(query, document))
            .map(|(handle, document)| Recipient { handle, document })
            .collect();
        selector::select(query.select(), matched, |r| r.document)
    }
}
