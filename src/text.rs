//! The textual grammar language.
//!
//! A grammar can be written as plain text: `ignore:<regex>/$` lines first,
//! then one rule per line as `HEAD -> sym …` or `HEAD = sym …`, with `/`
//! standing for the empty body and token specs written `name:<regex>/$`
//! (the name may be empty). Line comments `//…` and block comments
//! `/* … */` are ignored.
//!
//! The language is itself defined as a grammar and parsed by the same
//! engine; [`compile`] folds the syntax tree back into builder calls.
//! [`Grammar`]'s `Display` emits this language, and the emitted text
//! compiles back to an equivalent grammar.

use miette::Diagnostic;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::errors::{GrammarError, ParseError};
use crate::grammar::{Grammar, GrammarBuilder, Rule, RuleBuilder};
use crate::parser::RecursiveDescentParser;
use crate::tree::{ConstructNode, SyntaxTreeVisitor, TokenNode};

/// Failures while compiling a textual grammar: either the text does not
/// parse, or the described grammar violates a build invariant.
#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] GrammarError),
}

// ============================================================================
// BOOTSTRAP GRAMMAR
// ============================================================================

static BOOTSTRAP: Lazy<RecursiveDescentParser> = Lazy::new(|| {
    let grammar = bootstrap_grammar().expect("the grammar-language bootstrap must build");
    RecursiveDescentParser::new(grammar)
        .expect("the grammar-language bootstrap must be free of left recursion")
});

fn bootstrap_grammar() -> Result<Grammar, GrammarError> {
    Grammar::builder()
        .ignore_patterns([
            r"//[^\n]*",        // comment line
            r"(?s)(/\*.*?\*/)", // comment block
        ])
        .rule(Rule::builder("grammar").produces(["ignore_patterns", "rules"])?)
        .rule(Rule::builder("ignore_patterns").produces(["ignore_pattern", r":\n", "ignore_patterns"])?)
        .rule(Rule::builder("ignore_patterns").produces(["ignore_pattern"])?)
        .rule(Rule::builder("ignore_patterns").produces([r":( |\t)*\n", "ignore_patterns"])?)
        .rule(Rule::builder("ignore_patterns").build()?)
        .rule(Rule::builder("ignore_pattern").produces([
            r":( |\t)*ignore\:",
            r"ignored_pattern:.*?\/\$",
            r":( |\t)*",
        ])?)
        .rule(Rule::builder("rules").produces(["rule", r":( |\t)*\n", "rules"])?)
        .rule(Rule::builder("rules").produces(["rule"])?)
        .rule(Rule::builder("rules").produces([r":( |\t)*\n", "rules"])?)
        .rule(Rule::builder("rules").build()?)
        .rule(Rule::builder("rule").produces([
            r":( |\t)*",
            "construct",
            r":( |\t)*(\=|\-\>)",
            "rule_body",
        ])?)
        .rule(Rule::builder("rule_body").produces(["rule_tail"])?)
        .rule(Rule::builder("rule_body").produces([r":( |\t)*/"])?)
        .rule(Rule::builder("rule_tail").produces([r":( |\t)*", "symbol", "rule_tail"])?)
        .rule(Rule::builder("rule_tail").produces([r":( |\t)*", "symbol"])?)
        .rule(Rule::builder("symbol").produces(["token"])?)
        .rule(Rule::builder("symbol").produces(["construct"])?)
        .rule(Rule::builder("token").produces([
            r"token_name:([a-zA-Z_][a-zA-Z0-9_\-]*)",
            "token_pattern",
        ])?)
        .rule(Rule::builder("token").produces(["token_pattern"])?)
        .rule(Rule::builder("token_pattern").produces([r":\:", r"token_pattern:.*?\/\$"])?)
        .rule(Rule::builder("construct").produces([r"construct_name:[a-zA-Z_][a-zA-Z0-9_\-]*"])?)
        .build()
}

// ============================================================================
// COMPILER
// ============================================================================

/// Compiles a grammar from its textual form.
pub fn compile(source: &str) -> Result<Grammar, CompileError> {
    let tree = BOOTSTRAP.parse(source)?;
    let mut assembler = GrammarAssembler::default();
    tree.accept(&mut assembler);
    assembler.finish()
}

/// Folds the grammar-language syntax tree back into builder calls. Rule
/// heads and body symbols arrive through the same `construct_name` token;
/// whether a rule builder is already open tells them apart.
#[derive(Default)]
struct GrammarAssembler {
    builder: Option<GrammarBuilder>,
    rule: Option<RuleBuilder>,
    token_name: String,
    grammar: Option<Result<Grammar, GrammarError>>,
    error: Option<GrammarError>,
}

impl GrammarAssembler {
    fn finish(self) -> Result<Grammar, CompileError> {
        if let Some(error) = self.error {
            return Err(error.into());
        }
        match self.grammar {
            Some(result) => Ok(result?),
            None => Err(GrammarError::NoRules.into()),
        }
    }
}

impl SyntaxTreeVisitor for GrammarAssembler {
    fn token(&mut self, node: &TokenNode) {
        match node.name() {
            "token_name" => self.token_name = node.value().to_string(),
            "token_pattern" => {
                // The matched text carries the /$ terminator.
                let value = node.value();
                let pattern = &value[..value.len() - 2];
                if let Some(rule) = self.rule.take() {
                    self.rule = Some(rule.token(&self.token_name, pattern));
                }
            }
            "construct_name" => {
                self.rule = Some(match self.rule.take() {
                    None => Rule::builder(node.value()),
                    Some(rule) => rule.construct(node.value()),
                });
            }
            "ignored_pattern" => {
                let value = node.value();
                let pattern = &value[..value.len() - 2];
                if let Some(builder) = self.builder.take() {
                    self.builder = Some(builder.ignore_pattern(pattern));
                }
            }
            _ => {}
        }
    }

    fn enter_construct(&mut self, node: &ConstructNode) {
        match node.name() {
            "grammar" => self.builder = Some(Grammar::builder()),
            "rule" => self.rule = None,
            "token" => self.token_name.clear(),
            _ => {}
        }
    }

    fn exit_construct(&mut self, node: &ConstructNode) {
        if self.error.is_some() {
            return;
        }
        match node.name() {
            "rule" => {
                let Some(rule) = self.rule.take() else {
                    return;
                };
                let Some(builder) = self.builder.take() else {
                    return;
                };
                match rule.build() {
                    Ok(rule) => self.builder = Some(builder.rule(rule)),
                    Err(error) => {
                        self.builder = Some(builder);
                        self.error = Some(error);
                    }
                }
            }
            "grammar" => {
                if let Some(builder) = self.builder.take() {
                    self.grammar = Some(builder.build());
                }
            }
            _ => {}
        }
    }
}
