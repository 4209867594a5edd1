//! Production rules.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::GrammarError;
use crate::grammar::symbol::{Construct, Symbol, Token};

// Creation order breaks ties between rules of equal body length.
static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// A grammar production: one head construct and an ordered body of symbols.
/// The body may be empty.
///
/// Rules of the same head are tried from the most general to the least:
/// longer bodies sort first, ties resolve to creation order. Structural
/// equality ignores the creation sequence.
#[derive(Debug, Clone)]
pub struct Rule {
    head: Construct,
    body: Vec<Symbol>,
    seq: u64,
}

impl Rule {
    /// Starts a builder for a rule producing `head`.
    pub fn builder(head: impl AsRef<str>) -> RuleBuilder {
        RuleBuilder {
            head: head.as_ref().to_string(),
            body: Vec::new(),
        }
    }

    pub fn head(&self) -> &Construct {
        &self.head
    }

    pub fn body(&self) -> &[Symbol] {
        &self.body
    }

    pub fn is_epsilon(&self) -> bool {
        self.body.is_empty()
    }

    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.head == other.head && self.body == other.body
    }
}

impl Eq for Rule {}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.head)?;
        if self.body.is_empty() {
            return write!(f, " /");
        }
        for symbol in &self.body {
            write!(f, " {symbol}")?;
            if matches!(symbol, Symbol::Token(_)) {
                write!(f, "/$")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Accumulates body symbols for a [`Rule`]. Symbol names and patterns are
/// validated and compiled when the rule is built.
#[derive(Debug)]
pub struct RuleBuilder {
    head: String,
    body: Vec<BodyPart>,
}

#[derive(Debug)]
enum BodyPart {
    Construct(String),
    Token { name: String, pattern: String },
}

impl RuleBuilder {
    /// Appends a construct reference to the body.
    pub fn construct(mut self, name: impl AsRef<str>) -> Self {
        self.body.push(BodyPart::Construct(name.as_ref().to_string()));
        self
    }

    /// Appends a token to the body. An empty name makes it anonymous.
    pub fn token(mut self, name: impl AsRef<str>, pattern: impl AsRef<str>) -> Self {
        self.body.push(BodyPart::Token {
            name: name.as_ref().to_string(),
            pattern: pattern.as_ref().to_string(),
        });
        self
    }

    /// Builds the rule from plain symbol specs: `"name"` is a construct,
    /// `"name:pattern"` is a token (the name may be empty, as in `":\\n"`).
    /// A convenience for writing whole grammars inline.
    pub fn produces<I, S>(mut self, symbols: I) -> Result<Rule, GrammarError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for spec in symbols {
            let spec = spec.as_ref();
            self = match spec.split_once(':') {
                Some((name, pattern)) => self.token(name, pattern),
                None => self.construct(spec),
            };
        }
        self.build()
    }

    /// Compiles the body and seals the rule.
    pub fn build(self) -> Result<Rule, GrammarError> {
        let head = Construct::new(&self.head)?;
        let mut body = Vec::with_capacity(self.body.len());
        for part in self.body {
            match part {
                BodyPart::Construct(name) => body.push(Symbol::Construct(Construct::new(name)?)),
                BodyPart::Token { name, pattern } => {
                    body.push(Symbol::Token(Token::new(name, pattern)?))
                }
            }
        }
        Ok(Rule {
            head,
            body,
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
        })
    }
}
