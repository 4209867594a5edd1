//! Grammar model: symbols, rules, and the validating builder.
//!
//! A grammar is a set of ignored patterns, an axiom, and an ordered list of
//! rules per construct. Building it checks the global invariants: the axiom
//! must be producible, every construct mentioned in a body is known, and a
//! token name binds a single pattern across the whole grammar. A built
//! grammar is immutable and freely shareable.

pub mod rule;
pub mod symbol;

pub use rule::{Rule, RuleBuilder};
pub use symbol::{Construct, Symbol, Token};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::errors::GrammarError;
use crate::grammar::symbol::compile_prefix;

// ============================================================================
// IGNORED PATTERNS
// ============================================================================

/// A pattern skipped between tokens, anywhere in the input. Usually spaces
/// and comments.
#[derive(Debug, Clone)]
pub(crate) struct IgnorePattern {
    raw: Arc<str>,
    regex: Arc<Regex>,
}

impl IgnorePattern {
    fn new(pattern: &str) -> Result<Self, GrammarError> {
        let regex = compile_prefix(pattern).map_err(|cause| GrammarError::InvalidIgnorePattern {
            pattern: pattern.into(),
            cause,
        })?;
        Ok(Self {
            raw: Arc::from(pattern),
            regex: Arc::new(regex),
        })
    }

    pub(crate) fn raw(&self) -> &str {
        &self.raw
    }

    pub(crate) fn match_prefix(&self, haystack: &str) -> Option<usize> {
        self.regex.find(haystack).map(|m| m.end())
    }
}

// ============================================================================
// GRAMMAR
// ============================================================================

/// A context-free grammar in BNF form. Created through [`Grammar::builder`]
/// or compiled from text with [`crate::text::compile`].
///
/// Iterating a grammar yields its rules grouped by head, each group in rule
/// order (longest body first, then creation order).
#[derive(Debug, Clone)]
pub struct Grammar {
    ignored: Vec<IgnorePattern>,
    axiom: Construct,
    rules: HashMap<Construct, Vec<Arc<Rule>>>,
    rule_list: Vec<Arc<Rule>>,
    tokens_by_name: BTreeMap<String, Token>,
    constructs_by_name: BTreeMap<String, Construct>,
}

impl Grammar {
    /// Starts an empty grammar builder.
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::default()
    }

    /// The start construct of the grammar.
    pub fn axiom(&self) -> &Construct {
        &self.axiom
    }

    /// The rules producing the named construct, in rule order. `Some` with
    /// an empty slice means the construct is known but has no production
    /// and can never match.
    pub fn rules(&self, construct: &str) -> Option<&[Arc<Rule>]> {
        self.rules.get(construct).map(Vec::as_slice)
    }

    /// The named token symbol, if the grammar declares one.
    pub fn token(&self, name: &str) -> Option<&Token> {
        self.tokens_by_name.get(name)
    }

    /// The named construct symbol, if the grammar mentions one.
    pub fn construct(&self, name: &str) -> Option<&Construct> {
        self.constructs_by_name.get(name)
    }

    /// All named tokens, in name order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens_by_name.values()
    }

    /// All constructs, in name order.
    pub fn constructs(&self) -> impl Iterator<Item = &Construct> {
        self.constructs_by_name.values()
    }

    /// The ignored pattern sources, in declaration order.
    pub fn ignored_patterns(&self) -> impl Iterator<Item = &str> {
        self.ignored.iter().map(IgnorePattern::raw)
    }

    pub(crate) fn ignored(&self) -> &[IgnorePattern] {
        &self.ignored
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Rule>> {
        self.rule_list.iter()
    }
}

impl<'a> IntoIterator for &'a Grammar {
    type Item = &'a Arc<Rule>;
    type IntoIter = std::slice::Iter<'a, Arc<Rule>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rule_list.iter()
    }
}

impl fmt::Display for Grammar {
    /// Emits the textual grammar language; the output compiles back to an
    /// equivalent grammar through [`crate::text::compile`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pattern in &self.ignored {
            writeln!(f, "ignore:{}/$", pattern.raw())?;
        }
        for rule in &self.rule_list {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Accumulates rules and ignored patterns, then validates the whole set and
/// freezes it into a [`Grammar`]. Building consumes the builder.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    rules: Vec<Rule>,
    ignored: Vec<String>,
}

impl GrammarBuilder {
    /// Adds a rule. The head of the first rule added becomes the default
    /// axiom.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds an ignored pattern unless the same source string is already
    /// present.
    pub fn ignore_pattern(mut self, pattern: impl AsRef<str>) -> Self {
        let pattern = pattern.as_ref();
        if !self.ignored.iter().any(|p| p == pattern) {
            self.ignored.push(pattern.to_string());
        }
        self
    }

    /// Adds several ignored patterns, deduplicated by source string.
    pub fn ignore_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            self = self.ignore_pattern(pattern);
        }
        self
    }

    /// Builds the grammar with the default axiom, the head of the first
    /// rule added.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        let Some(first) = self.rules.first() else {
            return Err(GrammarError::NoRules);
        };
        let axiom = first.head().name().to_string();
        self.build_with_axiom(&axiom)
    }

    /// Builds the grammar with the named construct as axiom.
    pub fn build_with_axiom(self, axiom: &str) -> Result<Grammar, GrammarError> {
        // Group rules per head, keeping heads in first-appearance order,
        // then sort each group into rule order.
        let mut head_order: Vec<Construct> = Vec::new();
        let mut by_head: HashMap<Construct, Vec<Arc<Rule>>> = HashMap::new();
        for rule in self.rules {
            let head = rule.head().clone();
            let group = by_head.entry(head.clone()).or_default();
            if group.is_empty() {
                head_order.push(head);
            }
            group.push(Arc::new(rule));
        }
        for group in by_head.values_mut() {
            group.sort_by_key(|rule| (std::cmp::Reverse(rule.body().len()), rule.seq()));
        }

        let Some(axiom) = head_order.iter().find(|head| head.name() == axiom).cloned() else {
            return Err(GrammarError::NoRuleForAxiom {
                axiom: axiom.into(),
            });
        };

        let rule_list: Vec<Arc<Rule>> = head_order
            .iter()
            .flat_map(|head| by_head[head].iter().cloned())
            .collect();

        // Close the construct set: a construct that appears in a body but
        // never as a head is known-but-unproductive.
        for rule in &rule_list {
            for symbol in rule.body() {
                if let Symbol::Construct(construct) = symbol {
                    by_head.entry(construct.clone()).or_default();
                }
            }
        }

        // A token name binds a single pattern everywhere.
        let mut tokens_by_name: BTreeMap<String, Token> = BTreeMap::new();
        let mut declaring_rule: HashMap<String, Arc<Rule>> = HashMap::new();
        for rule in &rule_list {
            for symbol in rule.body() {
                let Symbol::Token(token) = symbol else {
                    continue;
                };
                if token.is_anonymous() {
                    continue;
                }
                match tokens_by_name.get(token.name()) {
                    None => {
                        tokens_by_name.insert(token.name().to_string(), token.clone());
                        declaring_rule.insert(token.name().to_string(), rule.clone());
                    }
                    Some(first) if first == token => {}
                    Some(_) => {
                        return Err(GrammarError::DuplicateTokenName {
                            name: token.name().to_string(),
                            first: declaring_rule[token.name()].to_string(),
                            second: rule.to_string(),
                        });
                    }
                }
            }
        }

        let mut constructs_by_name: BTreeMap<String, Construct> = BTreeMap::new();
        for construct in by_head.keys() {
            constructs_by_name.insert(construct.name().to_string(), construct.clone());
        }

        let mut ignored = Vec::with_capacity(self.ignored.len());
        for pattern in &self.ignored {
            ignored.push(IgnorePattern::new(pattern)?);
        }

        Ok(Grammar {
            ignored,
            axiom,
            rules: by_head,
            rule_list,
            tokens_by_name,
            constructs_by_name,
        })
    }
}
