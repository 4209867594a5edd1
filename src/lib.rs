//! A grammar toolkit.
//!
//! Build a BNF grammar through [`Grammar::builder`] or compile one from its
//! textual form with [`text::compile`], parse inputs by memoized recursive
//! descent, and fold the resulting syntax tree into a domain value with an
//! interpreter.
//!
//! ```
//! use gramarye::{Grammar, RecursiveDescentParser, Rule, TypedInterpreter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let grammar = Grammar::builder()
//!     .ignore_pattern("\\s")
//!     .rule(Rule::builder("greeting").produces(["word:[a-z]+", ":!"])?)
//!     .build()?;
//!
//! let parser = RecursiveDescentParser::new(grammar.clone())?;
//! let tree = parser.parse("hello !")?;
//!
//! let interpreter = TypedInterpreter::builder(grammar)
//!     .construct("greeting", |(word,): (String,)| Ok(word.len()))
//!     .build()?;
//! assert_eq!(interpreter.analyze::<usize>(&tree)?, 5);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod errors;
pub mod grammar;
pub mod parser;
pub mod semantics;
pub mod text;
pub mod tree;

pub use errors::{
    GrammarError, HandlerError, HandlerResult, LeftRecursionError, ParseError, SemanticsError,
    WiringError,
};
pub use grammar::{Construct, Grammar, Rule, Symbol, Token};
pub use parser::RecursiveDescentParser;
pub use semantics::{SimpleInterpreter, SyntaxTreeFunction, TypeDesc, TypedInterpreter, Value};
pub use tree::{ConstructNode, Span, SyntaxTree, SyntaxTreeVisitor, TokenNode};
