// src/expression.rs
use crate::operand::Operand;
use crate::operators::{ComparisonOp, LogicalOp};
use crate::pointer::Pointer;

/// A validated filter node.
#[derive(Debug, Clone)]
pub enum Expr {
    Comparison {
        op: ComparisonOp,
        path: Pointer,
        operand: Operand,
    },
    Logical {
        op: LogicalOp,
        children: Vec<Expr>,
    },
}

impl Expr {
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Comparison { .. } => 1,
            Expr::Logical { children, .. } => {
                1 + children.iter().map(Expr::node_count).sum::<usize>()
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Expr::Comparison { .. } => 1,
            Expr::Logical { children, .. } => {
                1 + children.iter().map(Expr::depth).max().unwrap_or(0)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub path: Pointer,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    pub ordering: Vec<OrderKey>,
    pub limit: Option<usize>,
}

/// Immutable result of compilation. Safe to share across threads and to
/// evaluate against any number of documents.
#[derive(Debug, Clone, Default)]
pub struct CompiledQuery {
    pub(crate) name: Option<String>,
    pub(crate) filter: Option<Expr>,
    pub(crate) select: Option<Select>,
}

impl CompiledQuery {
    /// `_debug.name`, carried for observability only.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `None` matches every document.
    pub fn filter(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }

    pub fn select(&self) -> Option<&Select> {
        self.select.as_ref()
    }
}
