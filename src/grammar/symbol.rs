//! Grammar symbols.
//!
//! A rule body is a sequence of symbols: constructs (non-terminals,
//! identified by name) and tokens (terminals, identified by name and
//! pattern). Symbols are immutable shared values; two symbols built from
//! equal inputs compare equal, and cloning is cheap.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use regex::Regex;

use crate::errors::GrammarError;

// ============================================================================
// CONSTRUCTS
// ============================================================================

/// A non-terminal symbol, identified by its name.
#[derive(Debug, Clone)]
pub struct Construct {
    name: Arc<str>,
}

impl Construct {
    /// Creates a construct symbol. The name must not be empty.
    pub fn new(name: impl AsRef<str>) -> Result<Self, GrammarError> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(GrammarError::EmptyConstructName);
        }
        Ok(Self {
            name: Arc::from(name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Construct {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Construct {}

impl Hash for Construct {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl Borrow<str> for Construct {
    fn borrow(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// TOKENS
// ============================================================================

/// A terminal symbol: a possibly-empty name plus the regular expression
/// that matches it. An empty name marks the token as anonymous; it still
/// participates in matching but never surfaces a value.
#[derive(Debug, Clone)]
pub struct Token {
    name: Arc<str>,
    pattern: Arc<str>,
    regex: Arc<Regex>,
}

impl Token {
    /// Creates a token symbol, compiling its pattern for prefix matching.
    pub fn new(name: impl AsRef<str>, pattern: impl AsRef<str>) -> Result<Self, GrammarError> {
        let name = name.as_ref();
        let pattern = pattern.as_ref();
        if pattern.is_empty() {
            return Err(GrammarError::EmptyTokenPattern { name: name.into() });
        }
        let regex = compile_prefix(pattern).map_err(|cause| GrammarError::InvalidTokenPattern {
            name: name.into(),
            pattern: pattern.into(),
            cause,
        })?;
        Ok(Self {
            name: Arc::from(name),
            pattern: Arc::from(pattern),
            regex: Arc::new(regex),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }

    /// The pattern as written, without the prefix anchoring.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Length of the match at the start of `haystack`, if any.
    pub(crate) fn match_prefix(&self, haystack: &str) -> Option<usize> {
        self.regex.find(haystack).map(|m| m.end())
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.pattern == other.pattern
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.pattern.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.pattern)
    }
}

/// Compiles `pattern` so that it only matches at the start of a haystack.
/// The wrapping group keeps top-level alternations anchored as a whole.
pub(crate) fn compile_prefix(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"\A(?:{pattern})"))
}

// ============================================================================
// SYMBOLS
// ============================================================================

/// A body element: either a construct or a token. Matching on this enum is
/// the dispatch point shared by the parser and the interpreters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Construct(Construct),
    Token(Token),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Construct(construct) => construct.name(),
            Symbol::Token(token) => token.name(),
        }
    }

    pub fn as_construct(&self) -> Option<&Construct> {
        match self {
            Symbol::Construct(construct) => Some(construct),
            Symbol::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Symbol::Token(token) => Some(token),
            Symbol::Construct(_) => None,
        }
    }
}

impl From<Construct> for Symbol {
    fn from(construct: Construct) -> Self {
        Symbol::Construct(construct)
    }
}

impl From<Token> for Symbol {
    fn from(token: Token) -> Self {
        Symbol::Token(token)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Construct(construct) => construct.fmt(f),
            Symbol::Token(token) => token.fmt(f),
        }
    }
}
