// tests/grammar_tests.rs

use gramarye::errors::GrammarError;
use gramarye::grammar::{Grammar, Rule, Symbol, Token};

fn rule(head: &str, body: &[&str]) -> Rule {
    Rule::builder(head)
        .produces(body.iter().copied())
        .expect("rule should build")
}

#[test]
fn first_rule_head_is_the_default_axiom() {
    let grammar = Grammar::builder()
        .rule(rule("start", &["item"]))
        .rule(rule("item", &["word:[a-z]+"]))
        .build()
        .expect("grammar should build");
    assert_eq!(grammar.axiom().name(), "start");
}

#[test]
fn explicit_axiom_overrides_the_default() {
    let grammar = Grammar::builder()
        .rule(rule("start", &["item"]))
        .rule(rule("item", &["word:[a-z]+"]))
        .build_with_axiom("item")
        .expect("grammar should build");
    assert_eq!(grammar.axiom().name(), "item");
}

#[test]
fn unknown_axiom_is_rejected() {
    let result = Grammar::builder()
        .rule(rule("start", &["word:[a-z]+"]))
        .build_with_axiom("missing");
    assert!(matches!(
        result,
        Err(GrammarError::NoRuleForAxiom { axiom }) if axiom == "missing"
    ));
}

#[test]
fn an_empty_builder_cannot_build() {
    assert!(matches!(Grammar::builder().build(), Err(GrammarError::NoRules)));
}

#[test]
fn rules_are_ordered_longest_body_first() {
    // Added shortest first; rule order must still put the longest first.
    let grammar = Grammar::builder()
        .rule(rule("list", &["word:[a-z]+"]))
        .rule(rule("list", &[]))
        .rule(rule("list", &["word:[a-z]+", ":,", "list"]))
        .build()
        .expect("grammar should build");

    let lengths: Vec<usize> = grammar
        .rules("list")
        .expect("list should have rules")
        .iter()
        .map(|rule| rule.body().len())
        .collect();
    assert_eq!(lengths, vec![3, 1, 0]);
}

#[test]
fn equal_length_rules_keep_creation_order() {
    let grammar = Grammar::builder()
        .rule(rule("choice", &["first:a"]))
        .rule(rule("choice", &["second:a"]))
        .build()
        .expect("grammar should build");

    let rules = grammar.rules("choice").expect("choice should have rules");
    assert_eq!(rules[0].body()[0].name(), "first");
    assert_eq!(rules[1].body()[0].name(), "second");
}

#[test]
fn dangling_constructs_are_known_but_unproductive() {
    let grammar = Grammar::builder()
        .rule(rule("start", &["phantom"]))
        .build()
        .expect("grammar should build");

    let rules = grammar.rules("phantom").expect("phantom should be known");
    assert!(rules.is_empty());
    assert!(grammar.construct("phantom").is_some());
}

#[test]
fn a_token_name_binds_one_pattern() {
    let result = Grammar::builder()
        .rule(rule("start", &["num:[0-9]+", "tail"]))
        .rule(rule("tail", &["num:[a-f0-9]+"]))
        .build();
    assert!(matches!(
        result,
        Err(GrammarError::DuplicateTokenName { name, .. }) if name == "num"
    ));
}

#[test]
fn repeating_an_identical_token_is_fine() {
    let grammar = Grammar::builder()
        .rule(rule("start", &["num:[0-9]+", "tail"]))
        .rule(rule("tail", &["num:[0-9]+"]))
        .build()
        .expect("grammar should build");
    assert_eq!(grammar.token("num").map(Token::pattern), Some("[0-9]+"));
}

#[test]
fn anonymous_tokens_never_collide() {
    let grammar = Grammar::builder()
        .rule(rule("start", &[":a", "tail"]))
        .rule(rule("tail", &[":b"]))
        .build()
        .expect("grammar should build");
    assert_eq!(grammar.tokens().count(), 0);
}

#[test]
fn ignored_patterns_deduplicate_by_source() {
    let grammar = Grammar::builder()
        .ignore_patterns(["\\s", "#[^\\n]*", "\\s"])
        .rule(rule("start", &["word:[a-z]+"]))
        .build()
        .expect("grammar should build");
    assert_eq!(grammar.ignored_patterns().count(), 2);
}

#[test]
fn invalid_token_patterns_fail_the_build() {
    let result = Rule::builder("start").produces(["word:[unclosed"]);
    assert!(matches!(
        result,
        Err(GrammarError::InvalidTokenPattern { name, .. }) if name == "word"
    ));
}

#[test]
fn empty_names_and_patterns_are_rejected() {
    assert!(matches!(
        Rule::builder("").build(),
        Err(GrammarError::EmptyConstructName)
    ));
    assert!(matches!(
        Rule::builder("start").token("word", "").build(),
        Err(GrammarError::EmptyTokenPattern { .. })
    ));
}

#[test]
fn symbols_are_equal_by_value() {
    let rule_a = rule("start", &["word:[a-z]+"]);
    let rule_b = rule("start", &["word:[a-z]+"]);
    assert_eq!(rule_a, rule_b);
    assert_eq!(rule_a.head(), rule_b.head());
    assert_eq!(rule_a.body(), rule_b.body());

    let other = rule("start", &["word:[a-z]*"]);
    assert_ne!(rule_a, other);
}

#[test]
fn rules_display_in_the_textual_form() {
    assert_eq!(
        rule("pair", &["key:[a-z]+", ":\\=", "value"]).to_string(),
        "pair -> key:[a-z]+/$ :\\=/$ value"
    );
    assert_eq!(rule("pair", &[]).to_string(), "pair -> /");
}

#[test]
fn bodies_distinguish_tokens_from_constructs() {
    let rule = rule("start", &["word:[a-z]+", "tail"]);
    assert!(matches!(&rule.body()[0], Symbol::Token(token) if token.name() == "word"));
    assert!(matches!(&rule.body()[1], Symbol::Construct(c) if c.name() == "tail"));
}
