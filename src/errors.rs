//! Error types for every phase of the toolkit.
//!
//! Each phase gets its own enum deriving `thiserror::Error` and
//! `miette::Diagnostic`. Parse and semantic errors carry the offending
//! source text so reports render as annotated excerpts.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::grammar::Token;
use crate::tree::Span;

/// The boxed cause a failing handler reports.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for user-registered handlers.
pub type HandlerResult<T> = Result<T, HandlerError>;

// ============================================================================
// GRAMMAR CONSTRUCTION
// ============================================================================

/// Failures while building a [`Grammar`](crate::grammar::Grammar).
#[derive(Debug, Error, Diagnostic)]
pub enum GrammarError {
    #[error("no rule produces the axiom \"{axiom}\"")]
    #[diagnostic(code(gramarye::grammar::no_rule_for_axiom))]
    NoRuleForAxiom { axiom: String },

    #[error("token \"{name}\" is declared with two different patterns, in ({first}) and ({second})")]
    #[diagnostic(
        code(gramarye::grammar::duplicate_token_name),
        help("a token name binds a single pattern across the whole grammar")
    )]
    DuplicateTokenName {
        name: String,
        first: String,
        second: String,
    },

    #[error("a grammar needs at least one rule")]
    #[diagnostic(code(gramarye::grammar::no_rules))]
    NoRules,

    #[error("construct names must not be empty")]
    #[diagnostic(code(gramarye::grammar::empty_construct_name))]
    EmptyConstructName,

    #[error("token \"{name}\" has an empty pattern")]
    #[diagnostic(code(gramarye::grammar::empty_token_pattern))]
    EmptyTokenPattern { name: String },

    #[error("token \"{name}\" has an invalid pattern \"{pattern}\"")]
    #[diagnostic(code(gramarye::grammar::invalid_token_pattern))]
    InvalidTokenPattern {
        name: String,
        pattern: String,
        #[source]
        cause: regex::Error,
    },

    #[error("invalid ignore pattern \"{pattern}\"")]
    #[diagnostic(code(gramarye::grammar::invalid_ignore_pattern))]
    InvalidIgnorePattern {
        pattern: String,
        #[source]
        cause: regex::Error,
    },
}

// ============================================================================
// PARSER CONSTRUCTION
// ============================================================================

/// Raised when a grammar cannot be parsed top-down because some construct
/// can derive a form that starts with itself.
#[derive(Debug, Error, Diagnostic)]
#[error("left recursion: \"{head}\" derives a form starting with \"{first}\", which reaches \"{head}\" again")]
#[diagnostic(
    code(gramarye::parser::left_recursion),
    help("rewrite the cycle with right recursion or an explicit repetition construct")
)]
pub struct LeftRecursionError {
    pub head: String,
    pub first: String,
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse failures. The parser distinguishes positions where it knows which
/// tokens should have matched from positions where a complete derivation
/// stopped short of the end of the input.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("at offset {offset}: expected one of {expected_list}, but {found} was found")]
    #[diagnostic(code(gramarye::parse::expected_symbols))]
    ExpectedSymbols {
        #[source_code]
        src: NamedSource<String>,
        #[label("{found} here")]
        at: SourceSpan,
        offset: usize,
        /// The token symbols attempted at the farthest failing position.
        expected: Vec<Token>,
        expected_list: String,
        found: String,
    },

    #[error("at offset {offset}: the input continues past the grammar ({found})")]
    #[diagnostic(code(gramarye::parse::unexpected_symbol))]
    UnexpectedSymbol {
        #[source_code]
        src: NamedSource<String>,
        #[label("nothing in the grammar matches from here")]
        at: SourceSpan,
        offset: usize,
        found: String,
    },

    #[error("\"{name}\" is not a construct of this grammar")]
    #[diagnostic(code(gramarye::parse::unknown_axiom))]
    UnknownAxiom { name: String },
}

impl ParseError {
    pub(crate) fn expected_symbols(source: &str, position: usize, mut expected: Vec<Token>) -> Self {
        expected.sort_by(|a, b| (a.name(), a.pattern()).cmp(&(b.name(), b.pattern())));
        let expected_list = format!(
            "[{}]",
            expected
                .iter()
                .map(Token::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Self::ExpectedSymbols {
            src: named_source(source),
            at: char_span(source, position),
            offset: position,
            expected,
            expected_list,
            found: describe_char(source, position),
        }
    }

    pub(crate) fn unexpected_symbol(source: &str, position: usize) -> Self {
        Self::UnexpectedSymbol {
            src: named_source(source),
            at: char_span(source, position),
            offset: position,
            found: describe_char(source, position),
        }
    }

    pub(crate) fn unknown_axiom(name: &str) -> Self {
        Self::UnknownAxiom { name: name.into() }
    }
}

// ============================================================================
// INTERPRETER WIRING
// ============================================================================

/// Failures while reconciling registered handlers against a grammar.
#[derive(Debug, Error, Diagnostic)]
pub enum WiringError {
    #[error("a handler is tagged with token \"{name}\", which the grammar does not declare")]
    #[diagnostic(code(gramarye::wiring::undefined_token))]
    UndefinedToken { name: String },

    #[error("two handlers are tagged with token \"{name}\"")]
    #[diagnostic(code(gramarye::wiring::double_token_annotation))]
    DoubleTokenAnnotation { name: String },

    #[error("the handler for token \"{name}\" must take at most one parameter, of the matched-text type, but declares ({params})")]
    #[diagnostic(code(gramarye::wiring::token_handler_parameter))]
    TokenMethodParameter { name: String, params: String },

    #[error("a handler is tagged with construct \"{name}\", which the grammar does not declare")]
    #[diagnostic(code(gramarye::wiring::undefined_construct))]
    UndefinedConstruct { name: String },

    #[error("two handlers are tagged with construct \"{name}\"")]
    #[diagnostic(code(gramarye::wiring::double_construct_annotation))]
    DoubleConstructAnnotation { name: String },

    #[error("handlers reached from \"{construct}\" declare unrelated return types {first} and {second}")]
    #[diagnostic(code(gramarye::wiring::return_type_mismatch))]
    ReturnTypeMismatch {
        construct: String,
        first: String,
        second: String,
    },

    #[error("construct \"{construct}\" has no handler and defaults to a sequence, which {declared} cannot stand in for")]
    #[diagnostic(code(gramarye::wiring::default_return_type_mismatch))]
    DefaultReturnTypeMismatch { construct: String, declared: String },

    #[error("the handler for ({rule}) takes {actual} parameters, but the rule body supplies {expected}")]
    #[diagnostic(code(gramarye::wiring::parameter_count_mismatch))]
    ParameterCountMismatch {
        rule: String,
        expected: usize,
        actual: usize,
    },

    #[error("in ({rule}): handler parameter {index} is {actual}, but the rule body supplies {expected}")]
    #[diagnostic(code(gramarye::wiring::parameter_type_mismatch))]
    ParameterTypeMismatch {
        rule: String,
        index: usize,
        expected: String,
        actual: String,
    },
}

// ============================================================================
// SEMANTIC ANALYSIS
// ============================================================================

/// A handler failure, wrapped once with its root cause preserved and the
/// span of the node that was under analysis.
#[derive(Debug, Error, Diagnostic)]
#[error("semantic analysis failed: {cause}")]
#[diagnostic(code(gramarye::semantics))]
pub struct SemanticsError {
    #[source]
    pub cause: HandlerError,
    #[source_code]
    src: NamedSource<String>,
    #[label("raised while analyzing this")]
    at: SourceSpan,
}

impl SemanticsError {
    pub(crate) fn new(cause: HandlerError, source: &str, span: Span) -> Self {
        Self {
            cause,
            src: named_source(source),
            at: SourceSpan::new(span.start.into(), span.end - span.start),
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn named_source(source: &str) -> NamedSource<String> {
    NamedSource::new("input", source.to_string())
}

fn char_span(source: &str, position: usize) -> SourceSpan {
    let len = source
        .get(position..)
        .and_then(|rest| rest.chars().next())
        .map_or(0, char::len_utf8);
    SourceSpan::new(position.into(), len)
}

/// Human-readable description of the character at `position`, spelling out
/// non-printables and end-of-source.
pub(crate) fn describe_char(source: &str, position: usize) -> String {
    let Some(ch) = source.get(position..).and_then(|rest| rest.chars().next()) else {
        return "<end-of-source>".into();
    };
    match ch {
        ' ' => "<white space>".into(),
        '\n' => "<new-line>".into(),
        '\r' => "<carriage-return>".into(),
        '\t' => "<tab>".into(),
        _ => format!("'{ch}'"),
    }
}
