use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Syntax tree of a notation string: numbers and nested lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ast {
    Number(NumberNode),
    List(ListNode),
}

impl Ast {
    pub fn span(&self) -> Span {
        match self {
            Ast::Number(node) => node.span,
            Ast::List(node) => node.span,
        }
    }

    /// Nesting depth: 0 for a number, 1 for a flat list
    pub fn depth(&self) -> usize {
        match self {
            Ast::Number(_) => 0,
            Ast::List(node) => 1 + node.items.iter().map(Ast::depth).max().unwrap_or(0),
        }
    }

    pub fn number(value: f64, span: Span) -> Self {
        Ast::Number(NumberNode { value, span })
    }

    pub fn list(items: Vec<Ast>, span: Span) -> Self {
        Ast::List(ListNode { items, span })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberNode {
    pub value: f64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListNode {
    pub items: Vec<Ast>,
    pub span: Span,
}

/// Which surface syntax a string was read with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Syntax {
    /// Comma-separated nested arrays, as in `[[[1,2]],[[0,2]]]`
    Array,
    /// Single-character throw heights, as in `531` or `[54]24`
    Compact,
}
