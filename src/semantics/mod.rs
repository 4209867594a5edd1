//! Semantic analysis over syntax trees.
//!
//! The shared abstraction is a post-order fold: one value per node, with
//! `None` suppressing a node's contribution entirely. Both interpreters are
//! built on it.

pub mod simple;
pub mod typed;
pub mod value;

pub use simple::SimpleInterpreter;
pub use typed::{Handler, HandlerArgs, TypedInterpreter, TypedInterpreterBuilder};
pub use value::{TypeDesc, Value};

use crate::tree::{ConstructNode, SyntaxTree, SyntaxTreeVisitor, TokenNode};

/// A function computed over a syntax tree, producing one value per node.
/// Children values are collected bottom-up and handed to the parent's
/// `construct` call. Returning `None` drops the node's contribution.
pub trait SyntaxTreeFunction {
    type Output;

    fn token(&mut self, node: &TokenNode) -> Option<Self::Output>;

    fn construct(&mut self, node: &ConstructNode, children: Vec<Self::Output>)
        -> Option<Self::Output>;
}

/// Folds `function` over `tree` post-order and returns the root's value,
/// or `None` when every contribution was suppressed.
pub fn apply<F: SyntaxTreeFunction>(function: &mut F, tree: &SyntaxTree) -> Option<F::Output> {
    let mut visitor = FoldVisitor {
        function,
        stack: Vec::new(),
        result: None,
    };
    tree.accept(&mut visitor);
    visitor.result
}

struct FoldVisitor<'a, F: SyntaxTreeFunction> {
    function: &'a mut F,
    stack: Vec<Vec<F::Output>>,
    result: Option<F::Output>,
}

impl<F: SyntaxTreeFunction> FoldVisitor<'_, F> {
    fn emit(&mut self, value: F::Output) {
        match self.stack.last_mut() {
            Some(siblings) => siblings.push(value),
            None => self.result = Some(value),
        }
    }
}

impl<F: SyntaxTreeFunction> SyntaxTreeVisitor for FoldVisitor<'_, F> {
    fn token(&mut self, node: &TokenNode) {
        if let Some(value) = self.function.token(node) {
            self.emit(value);
        }
    }

    fn enter_construct(&mut self, _node: &ConstructNode) {
        self.stack.push(Vec::new());
    }

    fn exit_construct(&mut self, node: &ConstructNode) {
        let children = self.stack.pop().unwrap_or_default();
        if let Some(value) = self.function.construct(node, children) {
            self.emit(value);
        }
    }
}
