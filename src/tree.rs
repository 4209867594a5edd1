//! Syntax trees.
//!
//! The parser's output: construct nodes over token nodes, all sharing one
//! immutable view of the parsed source. Nodes are never mutated after
//! construction and clone cheaply.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::grammar::{Rule, Token};

/// A half-open byte range in the parsed source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

// ============================================================================
// NODES
// ============================================================================

/// The slice of the source matched by a token symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenNode {
    pub(crate) source: Arc<str>,
    pub(crate) span: Span,
    pub(crate) token: Token,
}

impl TokenNode {
    pub fn name(&self) -> &str {
        self.token.name()
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// The matched text.
    pub fn value(&self) -> &str {
        &self.source[self.span.start..self.span.end]
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// The span derived by one rule, with one child per matched body symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructNode {
    pub(crate) source: Arc<str>,
    pub(crate) span: Span,
    pub(crate) rule: Arc<Rule>,
    pub(crate) children: Vec<SyntaxTree>,
}

impl ConstructNode {
    pub fn name(&self) -> &str {
        self.rule.head().name()
    }

    /// The rule whose body produced the children.
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn value(&self) -> &str {
        &self.source[self.span.start..self.span.end]
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn children(&self) -> &[SyntaxTree] {
        &self.children
    }
}

/// A node of a syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxTree {
    Token(Arc<TokenNode>),
    Construct(Arc<ConstructNode>),
}

impl SyntaxTree {
    pub fn span(&self) -> Span {
        match self {
            SyntaxTree::Token(node) => node.span,
            SyntaxTree::Construct(node) => node.span,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SyntaxTree::Token(node) => node.name(),
            SyntaxTree::Construct(node) => node.name(),
        }
    }

    /// The matched slice of the source.
    pub fn value(&self) -> &str {
        match self {
            SyntaxTree::Token(node) => node.value(),
            SyntaxTree::Construct(node) => node.value(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            SyntaxTree::Token(node) => node.source(),
            SyntaxTree::Construct(node) => node.source(),
        }
    }

    /// Walks this node and its children depth-first, delivering enter, token
    /// and exit events to `visitor`.
    pub fn accept<V: SyntaxTreeVisitor>(&self, visitor: &mut V) {
        match self {
            SyntaxTree::Token(node) => visitor.token(node),
            SyntaxTree::Construct(node) => {
                visitor.enter_construct(node);
                for child in &node.children {
                    child.accept(visitor);
                }
                visitor.exit_construct(node);
            }
        }
    }
}

impl fmt::Display for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+ Syntax tree [source={{{}}}]", self.value())?;
        fmt_level(self, f, 1)
    }
}

fn fmt_level(tree: &SyntaxTree, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
    for _ in 0..level {
        f.write_str("|--")?;
    }
    match tree {
        SyntaxTree::Token(node) => writeln!(
            f,
            "+ Token [name={}, value={{{}}}, pattern={{{}}}, start={}, end={}]",
            node.name(),
            node.value(),
            node.token.pattern(),
            node.span.start,
            node.span.end
        ),
        SyntaxTree::Construct(node) => {
            writeln!(
                f,
                "+ Construct [name={}, rule={{{}}}, start={}, end={}]",
                node.name(),
                node.rule,
                node.span.start,
                node.span.end
            )?;
            for child in &node.children {
                fmt_level(child, f, level + 1)?;
            }
            Ok(())
        }
    }
}

// ============================================================================
// VISITOR
// ============================================================================

/// The visit protocol for syntax trees: token nodes are visited once,
/// construct nodes bracket their children with enter and exit events.
pub trait SyntaxTreeVisitor {
    fn token(&mut self, node: &TokenNode);
    fn enter_construct(&mut self, node: &ConstructNode);
    fn exit_construct(&mut self, node: &ConstructNode);
}
