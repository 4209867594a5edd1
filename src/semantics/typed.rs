//! Typed interpretation of syntax trees.
//!
//! Handlers are registered against token and construct names. Every
//! registration carries type descriptors, and `build` reconciles them
//! against the grammar in three passes before any tree is analyzed: tag
//! discovery, return-type resolution per construct, and parameter-signature
//! reconciliation against each rule body. Miswired handlers fail fast as
//! [`WiringError`]s instead of surfacing mid-analysis.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{HandlerError, HandlerResult, SemanticsError, WiringError};
use crate::grammar::{Grammar, Symbol};
use crate::semantics::value::{TypeDesc, Value};
use crate::semantics::{self, SyntaxTreeFunction};
use crate::tree::{ConstructNode, Span, SyntaxTree, TokenNode};

type Invoke = Arc<dyn Fn(Vec<Value>) -> HandlerResult<Value>>;

// ============================================================================
// HANDLERS
// ============================================================================

/// One handler record: parameter descriptors, return descriptor, and the
/// invoker. Usually produced by the typed registration methods on
/// [`TypedInterpreterBuilder`]; building records by hand is the escape
/// hatch for generated or dynamically assembled interpreters.
#[derive(Clone)]
pub struct Handler {
    params: Vec<TypeDesc>,
    ret: TypeDesc,
    invoke: Invoke,
}

impl Handler {
    pub fn new(
        params: Vec<TypeDesc>,
        ret: TypeDesc,
        invoke: impl Fn(Vec<Value>) -> HandlerResult<Value> + 'static,
    ) -> Self {
        Self {
            params,
            ret,
            invoke: Arc::new(invoke),
        }
    }

    pub fn params(&self) -> &[TypeDesc] {
        &self.params
    }

    pub fn return_type(&self) -> TypeDesc {
        self.ret
    }

    /// Invokes the handler; a unit-returning handler contributes nothing.
    fn call(&self, args: Vec<Value>) -> HandlerResult<Option<Value>> {
        let value = (self.invoke)(args)?;
        if self.ret.accepts(&TypeDesc::unit()) {
            return Ok(None);
        }
        Ok(Some(value))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({}) -> {}", describe_params(&self.params), self.ret)
    }
}

fn describe_params(params: &[TypeDesc]) -> String {
    params
        .iter()
        .map(TypeDesc::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Extracts a construct handler's positional arguments from child values.
/// Implemented for tuples of up to six elements; a `Vec<Value>` element
/// consumes one sequence-typed argument.
pub trait HandlerArgs: Sized {
    fn descriptors() -> Vec<TypeDesc>;
    fn from_values(values: Vec<Value>) -> HandlerResult<Self>;
}

impl HandlerArgs for () {
    fn descriptors() -> Vec<TypeDesc> {
        Vec::new()
    }

    fn from_values(_values: Vec<Value>) -> HandlerResult<Self> {
        Ok(())
    }
}

macro_rules! impl_handler_args {
    ($($element:ident),+) => {
        impl<$($element: 'static),+> HandlerArgs for ($($element,)+) {
            fn descriptors() -> Vec<TypeDesc> {
                vec![$(TypeDesc::of::<$element>()),+]
            }

            fn from_values(values: Vec<Value>) -> HandlerResult<Self> {
                let mut values = values.into_iter();
                Ok(($(
                    values
                        .next()
                        .ok_or_else(|| HandlerError::from("handler argument count mismatch"))?
                        .take::<$element>()?,
                )+))
            }
        }
    };
}

impl_handler_args!(A);
impl_handler_args!(A, B);
impl_handler_args!(A, B, C);
impl_handler_args!(A, B, C, D);
impl_handler_args!(A, B, C, D, E);
impl_handler_args!(A, B, C, D, E, F);

fn token_handler<R, F>(f: F) -> Handler
where
    R: 'static,
    F: Fn(&str) -> HandlerResult<R> + 'static,
{
    Handler::new(vec![TypeDesc::text()], TypeDesc::of::<R>(), move |args| {
        let mut args = args.into_iter();
        let text: String = args
            .next()
            .ok_or_else(|| HandlerError::from("token handler invoked without its text"))?
            .take()?;
        Ok(Value::new(f(&text)?))
    })
}

fn construct_handler<A, R, F>(f: F) -> Handler
where
    A: HandlerArgs,
    R: 'static,
    F: Fn(A) -> HandlerResult<R> + 'static,
{
    Handler::new(A::descriptors(), TypeDesc::of::<R>(), move |args| {
        Ok(Value::new(f(A::from_values(args)?)?))
    })
}

// ============================================================================
// BUILDER
// ============================================================================

/// Registers handlers against one grammar; [`build`](Self::build) validates
/// the wiring and produces the interpreter.
pub struct TypedInterpreterBuilder {
    grammar: Grammar,
    tokens: Vec<(String, Handler)>,
    constructs: Vec<(String, Handler)>,
}

impl TypedInterpreterBuilder {
    /// Registers `f` for the named token; it receives the matched text.
    pub fn token<R, F>(self, name: impl Into<String>, f: F) -> Self
    where
        R: 'static,
        F: Fn(&str) -> HandlerResult<R> + 'static,
    {
        self.token_handler(name, token_handler(f))
    }

    /// Registers one handler for several token names.
    pub fn tokens<R, F, I>(mut self, names: I, f: F) -> Self
    where
        R: 'static,
        F: Fn(&str) -> HandlerResult<R> + 'static,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let handler = token_handler(f);
        for name in names {
            self.tokens.push((name.into(), handler.clone()));
        }
        self
    }

    /// Registers a hand-built token handler record.
    pub fn token_handler(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.tokens.push((name.into(), handler));
        self
    }

    /// Registers `f` for the named construct. Its tuple parameter mirrors
    /// the values the construct's rule bodies supply, one element per
    /// contributing body symbol.
    pub fn construct<A, R, F>(self, name: impl Into<String>, f: F) -> Self
    where
        A: HandlerArgs,
        R: 'static,
        F: Fn(A) -> HandlerResult<R> + 'static,
    {
        self.construct_handler(name, construct_handler(f))
    }

    /// Registers one handler for several construct names.
    pub fn constructs<A, R, F, I>(mut self, names: I, f: F) -> Self
    where
        A: HandlerArgs,
        R: 'static,
        F: Fn(A) -> HandlerResult<R> + 'static,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let handler = construct_handler(f);
        for name in names {
            self.constructs.push((name.into(), handler.clone()));
        }
        self
    }

    /// Registers a hand-built construct handler record.
    pub fn construct_handler(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.constructs.push((name.into(), handler));
        self
    }

    /// Validates every registration against the grammar and freezes the
    /// interpreter.
    pub fn build(self) -> Result<TypedInterpreter, WiringError> {
        let mut tokens: HashMap<String, Handler> = HashMap::new();
        for (name, handler) in &self.tokens {
            if name.is_empty() || self.grammar.token(name).is_none() {
                return Err(WiringError::UndefinedToken { name: name.clone() });
            }
            let text_like = handler
                .params
                .first()
                .map_or(true, |param| param.accepts(&TypeDesc::text()));
            if handler.params.len() > 1 || !text_like {
                return Err(WiringError::TokenMethodParameter {
                    name: name.clone(),
                    params: describe_params(&handler.params),
                });
            }
            if tokens.insert(name.clone(), handler.clone()).is_some() {
                return Err(WiringError::DoubleTokenAnnotation { name: name.clone() });
            }
        }

        let mut constructs: HashMap<String, Handler> = HashMap::new();
        for (name, handler) in &self.constructs {
            if self.grammar.rules(name).is_none() {
                return Err(WiringError::UndefinedConstruct { name: name.clone() });
            }
            if constructs.insert(name.clone(), handler.clone()).is_some() {
                return Err(WiringError::DoubleConstructAnnotation { name: name.clone() });
            }
        }

        let return_types = map_return_types(&self.grammar, &constructs)?;
        check_signatures(&self.grammar, &tokens, &constructs, &return_types)?;

        Ok(TypedInterpreter {
            grammar: self.grammar,
            tokens,
            constructs,
            return_types,
        })
    }
}

/// Resolves the value type each construct contributes to its parents: its
/// handler's return type, or the sequence type when it has none. Handlers
/// reached through different rules of one head must agree.
fn map_return_types(
    grammar: &Grammar,
    constructs: &HashMap<String, Handler>,
) -> Result<HashMap<String, TypeDesc>, WiringError> {
    let mut mapped: HashMap<String, TypeDesc> = HashMap::new();

    for rule in grammar {
        let head = rule.head().name();
        let Some(handler) = constructs.get(head) else {
            continue;
        };
        match mapped.get(head) {
            None => {
                mapped.insert(head.to_string(), handler.ret);
            }
            Some(prior) if prior.accepts(&handler.ret) => {}
            Some(prior) => {
                return Err(WiringError::ReturnTypeMismatch {
                    construct: head.to_string(),
                    first: prior.to_string(),
                    second: handler.ret.to_string(),
                });
            }
        }
    }

    for rule in grammar {
        let head = rule.head().name();
        if constructs.contains_key(head) {
            continue;
        }
        match mapped.get(head) {
            None => {
                mapped.insert(head.to_string(), TypeDesc::sequence());
            }
            Some(prior) if prior.accepts(&TypeDesc::sequence()) => {}
            Some(prior) => {
                return Err(WiringError::DefaultReturnTypeMismatch {
                    construct: head.to_string(),
                    declared: prior.to_string(),
                });
            }
        }
    }

    Ok(mapped)
}

/// Checks every handled rule: the expected parameter list is derived from
/// the body (anonymous tokens contribute nothing, named tokens their
/// handler's return type or the matched text, constructs their resolved
/// type, unit entries dropped) and must line up with the handler's declared
/// parameters.
fn check_signatures(
    grammar: &Grammar,
    tokens: &HashMap<String, Handler>,
    constructs: &HashMap<String, Handler>,
    return_types: &HashMap<String, TypeDesc>,
) -> Result<(), WiringError> {
    for rule in grammar {
        let Some(handler) = constructs.get(rule.head().name()) else {
            continue;
        };

        let mut expected: Vec<TypeDesc> = Vec::new();
        for symbol in rule.body() {
            match symbol {
                Symbol::Construct(construct) => {
                    if let Some(desc) = return_types.get(construct.name()) {
                        expected.push(*desc);
                    }
                }
                Symbol::Token(token) => {
                    if let Some(token_handler) = tokens.get(token.name()) {
                        expected.push(token_handler.ret);
                    } else if !token.is_anonymous() {
                        expected.push(TypeDesc::text());
                    }
                }
            }
        }
        expected.retain(|desc| !desc.accepts(&TypeDesc::unit()));

        if expected.len() != handler.params.len() {
            return Err(WiringError::ParameterCountMismatch {
                rule: rule.to_string(),
                expected: expected.len(),
                actual: handler.params.len(),
            });
        }
        for (index, (want, have)) in expected.iter().zip(&handler.params).enumerate() {
            if !have.accepts(want) {
                return Err(WiringError::ParameterTypeMismatch {
                    rule: rule.to_string(),
                    index,
                    expected: want.to_string(),
                    actual: have.to_string(),
                });
            }
        }
    }
    Ok(())
}

// ============================================================================
// INTERPRETER
// ============================================================================

/// Folds syntax trees into domain values through validated handlers.
///
/// Evaluation state is scoped to each `analyze` call; the interpreter
/// itself stays immutable and reusable across calls.
pub struct TypedInterpreter {
    grammar: Grammar,
    tokens: HashMap<String, Handler>,
    constructs: HashMap<String, Handler>,
    return_types: HashMap<String, TypeDesc>,
}

impl TypedInterpreter {
    /// Starts a builder binding handlers to `grammar`.
    pub fn builder(grammar: Grammar) -> TypedInterpreterBuilder {
        TypedInterpreterBuilder {
            grammar,
            tokens: Vec::new(),
            constructs: Vec::new(),
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// The value type the named construct contributes to its parents.
    pub fn return_type(&self, construct: &str) -> Option<TypeDesc> {
        self.return_types.get(construct).copied()
    }

    /// Folds the tree bottom-up through the registered handlers and moves
    /// the root value out as `T`. The first handler failure aborts the
    /// analysis, wrapped with the span of the node under analysis.
    pub fn analyze<T: 'static>(&self, tree: &SyntaxTree) -> Result<T, SemanticsError> {
        let mut eval = Evaluation {
            interpreter: self,
            error: None,
        };
        let result = semantics::apply(&mut eval, tree);
        if let Some(error) = eval.error {
            return Err(error);
        }
        let Some(value) = result else {
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
    interpreter: &'a TypedInterpreter,
    error: Option<SemanticsError>,
}

impl Evaluation<'_> {
    fn invoke(
        &mut self,
        handler: &Handler,
        args: Vec<Value>,
        source: &str,
        span: Span,
    ) -> Option<Value> {
        match handler.call(args) {
            Ok(value) => value,
            Err(cause) => {
                self.error = Some(SemanticsError::new(cause, source, span));
                None
            }
        }
    }
}

impl SyntaxTreeFunction for Evaluation<'_> {
    type Output = Value;

    fn token(&mut self, node: &TokenNode) -> Option<Value> {
        if self.error.is_some() {
            return None;
        }
        let interpreter = self.interpreter;
        if let Some(handler) = interpreter.tokens.get(node.name()) {
            let args = vec![Value::text(node.value())];
            return self.invoke(handler, args, node.source(), node.span());
        }
        if node.name().is_empty() {
            return None;
        }
        Some(Value::text(node.value()))
    }

    fn construct(&mut self, node: &ConstructNode, children: Vec<Value>) -> Option<Value> {
        if self.error.is_some() {
            return None;
        }
        let interpreter = self.interpreter;
        let Some(handler) = interpreter.constructs.get(node.name()) else {
            return Some(merge_children(children));
        };
        self.invoke(handler, children, node.source(), node.span())
    }
}

/// Default value of a construct without a handler: a lone sequence child is
/// forwarded as-is; several children merge into one sequence, flattening
/// sequence-typed elements exactly one level.
fn merge_children(mut children: Vec<Value>) -> Value {
    if children.len() == 1 && children[0].is::<Vec<Value>>() {
        return children.remove(0);
    }
    if children.len() > 1 {
        let mut merged = Vec::with_capacity(children.len());
        for value in children {
            match value.into_sequence() {
                Ok(items) => merged.extend(items),
                Err(value) => merged.push(value),
            }
        }
        return Value::sequence(merged);
    }
    Value::sequence(children)
}

// ============================================================================
// TESTS
// ============================================================================
