//! Memoized recursive-descent parsing.
//!
//! The parser interprets a [`Grammar`] top-down: a construct matches by
//! trying its rules from the most general to the least and keeping the
//! first full derivation, a token matches by prefix regex, retrying once
//! after skipping ignored text. Every transient of a parse call lives in an
//! explicit per-call context, so one parser can serve any number of
//! sequential calls and the grammar stays shareable.

use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::Arc;

use crate::errors::{LeftRecursionError, ParseError};
use crate::grammar::{Construct, Grammar, Symbol, Token};
use crate::tree::{ConstructNode, Span, SyntaxTree, TokenNode};

const MEMO_CAPACITY: usize = 200;

/// A top-down parser for one grammar. Construction rejects grammars no
/// recursive descent can terminate on.
#[derive(Debug, Clone)]
pub struct RecursiveDescentParser {
    grammar: Grammar,
}

impl RecursiveDescentParser {
    /// Wraps a grammar, failing if any construct is left recursive.
    pub fn new(grammar: Grammar) -> Result<Self, LeftRecursionError> {
        detect_left_recursion(&grammar)?;
        Ok(Self { grammar })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Parses `source` from the grammar's axiom. The whole input must be
    /// consumed, up to trailing ignored text.
    pub fn parse(&self, source: &str) -> Result<SyntaxTree, ParseError> {
        let axiom = self.grammar.axiom().name().to_string();
        self.parse_with_axiom(source, &axiom)
    }

    /// Parses `source` from the named construct instead of the axiom.
    pub fn parse_with_axiom(&self, source: &str, axiom: &str) -> Result<SyntaxTree, ParseError> {
        let Some(start) = self.grammar.construct(axiom) else {
            return Err(ParseError::unknown_axiom(axiom));
        };

        let mut run = ParseRun::new(source);
        match self.match_construct(&mut run, start, 0) {
            Some(tree) => Ok(tree),
            None if !run.expected.is_empty() => Err(ParseError::expected_symbols(
                source,
                run.expected_at,
                run.expected,
            )),
            None => Err(ParseError::unexpected_symbol(source, run.unexpected_at)),
        }
    }

    fn match_symbol(&self, run: &mut ParseRun, symbol: &Symbol, at: usize) -> Option<SyntaxTree> {
        match symbol {
            Symbol::Token(token) => self.match_token(run, token, at),
            Symbol::Construct(construct) => self.match_construct(run, construct, at),
        }
    }

    /// Tries `token` at `at`, once more after skipping ignored text. A miss
    /// advances the expected-token bookkeeping; misses are not memoized so
    /// that bookkeeping stays exact.
    fn match_token(&self, run: &mut ParseRun, token: &Token, at: usize) -> Option<SyntaxTree> {
        let key = (Symbol::Token(token.clone()), at);
        if let Some(hit) = run.memo.get(&key) {
            return hit;
        }

        let mut start = at;
        let mut matched = token.match_prefix(&run.source[start..]);
        if matched.is_none() {
            start = self.skip_ignored(&run.source, at);
            matched = token.match_prefix(&run.source[start..]);
        }

        match matched {
            Some(length) => {
                let node = SyntaxTree::Token(Arc::new(TokenNode {
                    source: run.source.clone(),
                    span: Span {
                        start,
                        end: start + length,
                    },
                    token: token.clone(),
                }));
                run.memo.insert(key, Some(node.clone()));
                Some(node)
            }
            None => {
                if start > run.expected_at {
                    run.expected_at = start;
                    run.expected.clear();
                }
                if start == run.expected_at && !run.expected.contains(token) {
                    run.expected.push(token.clone());
                }
                None
            }
        }
    }

    /// Tries the rules of `construct` at `at` in rule order; the first rule
    /// whose whole body matches wins. Only the outermost invocation demands
    /// that the derivation reach the end of the input.
    fn match_construct(
        &self,
        run: &mut ParseRun,
        construct: &Construct,
        at: usize,
    ) -> Option<SyntaxTree> {
        let key = (Symbol::Construct(construct.clone()), at);
        if let Some(hit) = run.memo.get(&key) {
            return hit;
        }

        let root = mem::take(&mut run.root);
        let rules = self.grammar.rules(construct.name()).unwrap_or(&[]);

        let mut result = None;
        'rules: for rule in rules {
            let mut cursor = at;
            let mut children = Vec::with_capacity(rule.body().len());
            for symbol in rule.body() {
                let Some(child) = self.match_symbol(run, symbol, cursor) else {
                    continue 'rules;
                };
                cursor = child.span().end;
                children.push(child);
            }

            let (start, mut end) = match (children.first(), children.last()) {
                (Some(first), Some(last)) => (first.span().start, last.span().end),
                _ => (at, at),
            };

            if root {
                end = self.skip_ignored(&run.source, end);
                if end != run.source.len() {
                    if end > run.unexpected_at {
                        run.unexpected_at = end;
                    }
                    continue;
                }
            }

            result = Some(SyntaxTree::Construct(Arc::new(ConstructNode {
                source: run.source.clone(),
                span: Span { start, end },
                rule: rule.clone(),
                children,
            })));
            break;
        }

        run.memo.insert(key, result.clone());
        result
    }

    /// Advances past every ignored-pattern match starting at `at`. Only a
    /// non-empty match advances, so the loop terminates on any pattern set.
    fn skip_ignored(&self, source: &str, mut at: usize) -> usize {
        loop {
            let mut advanced = false;
            for pattern in self.grammar.ignored() {
                if let Some(length) = pattern.match_prefix(&source[at..]) {
                    if length > 0 {
                        at += length;
                        advanced = true;
                        break;
                    }
                }
            }
            if !advanced {
                return at;
            }
        }
    }
}

// ============================================================================
// PER-CALL STATE
// ============================================================================

/// Everything transient about one parse call: the memo, the farthest-failure
/// cursors, and the root flag that is spent on the outermost construct.
struct ParseRun {
    source: Arc<str>,
    memo: Memo,
    expected_at: usize,
    expected: Vec<Token>,
    unexpected_at: usize,
    root: bool,
}

impl ParseRun {
    fn new(source: &str) -> Self {
        Self {
            source: Arc::from(source),
            memo: Memo::new(MEMO_CAPACITY),
            expected_at: 0,
            expected: Vec::new(),
            unexpected_at: 0,
            root: true,
        }
    }
}

// ============================================================================
// MEMO
// ============================================================================

type MemoKey = (Symbol, usize);

/// Bounded cache of symbol outcomes by position. Two generations of at most
/// `capacity` entries each: inserts go to the hot generation, reads promote
/// from the old one, and filling the hot generation retires the old.
/// Evicting never changes a parse outcome, only recomputation.
struct Memo {
    hot: HashMap<MemoKey, Option<SyntaxTree>>,
    cold: HashMap<MemoKey, Option<SyntaxTree>>,
    capacity: usize,
}

impl Memo {
    fn new(capacity: usize) -> Self {
        Self {
            hot: HashMap::new(),
            cold: HashMap::new(),
            capacity,
        }
    }

    fn get(&mut self, key: &MemoKey) -> Option<Option<SyntaxTree>> {
        if let Some(entry) = self.cold.remove(key) {
            self.store(key.clone(), entry);
        }
        self.hot.get(key).cloned()
    }

    fn insert(&mut self, key: MemoKey, value: Option<SyntaxTree>) {
        self.store(key, value);
    }

    fn store(&mut self, key: MemoKey, value: Option<SyntaxTree>) {
        if self.hot.len() >= self.capacity && !self.hot.contains_key(&key) {
            self.cold = mem::take(&mut self.hot);
        }
        self.hot.insert(key, value);
    }
}

// ============================================================================
// LEFT-RECURSION DETECTION
// ============================================================================

/// Rejects the grammar if, following first-body-symbol edges, any construct
/// can reach itself. Such a rule set would recurse forever before consuming
/// a single character.
fn detect_left_recursion(grammar: &Grammar) -> Result<(), LeftRecursionError> {
    let mut edges: HashMap<&Construct, HashSet<&Construct>> = HashMap::new();
    for rule in grammar {
        if let Some(Symbol::Construct(first)) = rule.body().first() {
            edges.entry(rule.head()).or_default().insert(first);
        }
    }

    for rule in grammar {
        if let Some(Symbol::Construct(first)) = rule.body().first() {
            if reaches(&edges, first, rule.head()) {
                return Err(LeftRecursionError {
                    head: rule.head().name().to_string(),
                    first: first.name().to_string(),
                });
            }
        }
    }
    Ok(())
}

fn reaches<'a>(
    edges: &HashMap<&'a Construct, HashSet<&'a Construct>>,
    from: &'a Construct,
    to: &Construct,
) -> bool {
    let mut seen = HashSet::new();
    let mut stack = vec![from];
    while let Some(construct) = stack.pop() {
        if construct == to {
            return true;
        }
        if !seen.insert(construct) {
            continue;
        }
        if let Some(next) = edges.get(construct) {
            stack.extend(next.iter().copied());
        }
    }
    false
}

// ============================================================================
// TESTS
// ============================================================================
