//! Name-keyed interpretation with pass-through defaults.

use std::collections::HashMap;

use crate::errors::SemanticsError;
use crate::semantics::value::Value;
use crate::semantics::{self, SyntaxTreeFunction};
use crate::tree::{ConstructNode, SyntaxTree, TokenNode};

type TokenRule = Box<dyn Fn(&TokenNode) -> Option<Value>>;
type ConstructRule = Box<dyn Fn(&ConstructNode, Vec<Value>) -> Option<Value>>;

/// An interpreter wired from plain closures, one per token or construct
/// name. Anonymous tokens are suppressed; unhandled named tokens yield
/// their matched text; unhandled constructs yield their children untouched.
///
/// For grammar-checked wiring and typed handler signatures, use
/// [`crate::semantics::TypedInterpreter`] instead.
#[derive(Default)]
pub struct SimpleInterpreter {
    tokens: HashMap<String, TokenRule>,
    constructs: HashMap<String, ConstructRule>,
}

impl SimpleInterpreter {
    pub fn builder() -> SimpleInterpreterBuilder {
        SimpleInterpreterBuilder {
            interpreter: SimpleInterpreter::default(),
        }
    }

    /// Folds the tree bottom-up and moves the root value out as `T`.
    pub fn analyze<T: 'static>(&self, tree: &SyntaxTree) -> Result<T, SemanticsError> {
        let mut eval = Evaluation { interpreter: self };
        let Some(value) = semantics::apply(&mut eval, tree) else {
            return Err(SemanticsError::new(
                "analysis produced no value".into(),
                tree.source(),
                tree.span(),
            ));
        };
        let span = tree.span();
        value
            .take::<T>()
            .map_err(|cause| SemanticsError::new(cause, tree.source(), span))
    }
}

struct Evaluation<'a> {
    interpreter: &'a SimpleInterpreter,
}

impl SyntaxTreeFunction for Evaluation<'_> {
    type Output = Value;

    fn token(&mut self, node: &TokenNode) -> Option<Value> {
        if node.name().is_empty() {
            return None;
        }
        match self.interpreter.tokens.get(node.name()) {
            Some(rule) => rule(node),
            None => Some(Value::text(node.value())),
        }
    }

    fn construct(&mut self, node: &ConstructNode, children: Vec<Value>) -> Option<Value> {
        match self.interpreter.constructs.get(node.name()) {
            Some(rule) => rule(node, children),
            None => Some(Value::sequence(children)),
        }
    }
}

/// Registers closures by name; no validation happens against any grammar.
pub struct SimpleInterpreterBuilder {
    interpreter: SimpleInterpreter,
}

impl SimpleInterpreterBuilder {
    pub fn token(
        mut self,
        name: impl Into<String>,
        rule: impl Fn(&TokenNode) -> Option<Value> + 'static,
    ) -> Self {
        self.interpreter.tokens.insert(name.into(), Box::new(rule));
        self
    }

    pub fn construct(
        mut self,
        name: impl Into<String>,
        rule: impl Fn(&ConstructNode, Vec<Value>) -> Option<Value> + 'static,
    ) -> Self {
        self.interpreter
            .constructs
            .insert(name.into(), Box::new(rule));
        self
    }

    pub fn build(self) -> SimpleInterpreter {
        self.interpreter
    }
}
