// tests/interpreter_tests.rs
//
// End-to-end scenarios: arithmetic with precedence through the typed
// interpreter, CSV through the raw visitor protocol, INI through typed
// handlers over domain tuples, and the wiring checks that reject
// mismatched handlers before any analysis runs.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;

use gramarye::errors::WiringError;
use gramarye::grammar::{Grammar, Rule};
use gramarye::parser::RecursiveDescentParser;
use gramarye::semantics::{Handler, SimpleInterpreter, TypeDesc, TypedInterpreter, Value};
use gramarye::tree::{ConstructNode, SyntaxTreeVisitor, TokenNode};

fn rule(head: &str, body: &[&str]) -> Rule {
    Rule::builder(head)
        .produces(body.iter().copied())
        .expect("rule should build")
}

// ============================================================================
// ARITHMETIC
// ============================================================================

/// Additive operators outermost, multiplicative inner, parentheses and
/// unary signs innermost. Precedence is encoded in the rule layering.
fn arithmetic_grammar() -> Grammar {
    Grammar::builder()
        .ignore_pattern("\\s")
        .rule(rule("expression", &["level1"]))
        .rule(rule("level1", &["level1-tail"]))
        .rule(rule("level1-tail", &["level2", r"level1-operator:[\+\-]", "level1"]))
        .rule(rule("level1-tail", &["level2"]))
        .rule(rule("level2", &["level2-tail"]))
        .rule(rule("level2-tail", &["level-final", r"level2-operator:[\*\/]", "level2"]))
        .rule(rule("level2-tail", &["level-final"]))
        .rule(rule("level-final", &["term"]))
        .rule(rule("level-final", &["negative"]))
        .rule(rule("level-final", &["positive"]))
        .rule(rule("negative", &[r":\-", "term"]))
        .rule(rule("positive", &[r":\+", "term"]))
        .rule(rule("term", &[r"number:[\+\-]?[0-9]*\.?[0-9]+([eE][\+\-]?[0-9]+)?"]))
        .rule(rule("term", &[r":\(", "expression", r":\)"]))
        .build()
        .expect("grammar should build")
}

fn arithmetic_interpreter(grammar: Grammar) -> TypedInterpreter {
    TypedInterpreter::builder(grammar)
        .token("number", |text| text.parse::<f64>().map_err(Into::into))
        .construct("negative", |(term,): (f64,)| Ok(-term))
        .constructs(
            ["term", "positive", "expression", "level-final"],
            |(term,): (f64,)| Ok(term),
        )
        // The elements alternate operands and operators; precedence is
        // already settled by the grammar, so evaluation is left to right.
        .constructs(["level1", "level2"], |(elements,): (Vec<Value>,)| {
            let mut elements = elements.into_iter();
            let mut value: f64 = match elements.next() {
                Some(first) => first.take()?,
                None => return Err("an operation needs at least one operand".into()),
            };
            while let Some(element) = elements.next() {
                let operator: String = element.take()?;
                let operand: f64 = match elements.next() {
                    Some(operand) => operand.take()?,
                    None => return Err(format!("operator '{operator}' has no operand").into()),
                };
                match operator.as_str() {
                    "+" => value += operand,
                    "-" => value -= operand,
                    "*" => value *= operand,
                    "/" => value /= operand,
                    other => return Err(format!("unknown operator '{other}'").into()),
                }
            }
            Ok(value)
        })
        .build()
        .expect("wiring should validate")
}

fn evaluate(expression: &str) -> f64 {
    let grammar = arithmetic_grammar();
    let parser = RecursiveDescentParser::new(grammar.clone()).expect("parser should build");
    let interpreter = arithmetic_interpreter(grammar);
    let tree = parser.parse(expression).expect("expression should parse");
    interpreter
        .analyze::<f64>(&tree)
        .expect("expression should evaluate")
}

#[test]
fn evaluates_with_precedence() {
    assert_eq!(evaluate("1+2*3+4"), 11.0);
    assert_eq!(evaluate("(1+2)*3+4"), 13.0);
    assert_eq!(evaluate("1+2*(3+4)"), 15.0);
    assert_eq!(evaluate("(1+2)*(3+4)"), 21.0);
}

#[test]
fn evaluates_nested_parentheses() {
    assert_eq!(evaluate("(2*((1+2)*3+6)-5)*8"), 200.0);
}

#[test]
fn evaluates_unary_signs_and_decimals() {
    assert_eq!(evaluate("-(1+2)*3"), -9.0);
    assert_eq!(evaluate("+(2*3)"), 6.0);
    assert_eq!(evaluate("1.5*4"), 6.0);
}

#[test]
fn handler_failures_preserve_their_root_cause() {
    let grammar = Grammar::builder()
        .rule(rule("start", &["byte:[0-9]+"]))
        .build()
        .expect("grammar should build");
    let parser = RecursiveDescentParser::new(grammar.clone()).expect("parser should build");
    let interpreter = TypedInterpreter::builder(grammar)
        .token("byte", |text| text.parse::<u8>().map_err(Into::into))
        .build()
        .expect("wiring should validate");

    let tree = parser.parse("999").expect("digits should parse");
    let error = interpreter
        .analyze::<Vec<Value>>(&tree)
        .expect_err("999 does not fit a byte");
    assert!(error.cause.downcast_ref::<std::num::ParseIntError>().is_some());
}

// ============================================================================
// CSV
// ============================================================================

fn csv_grammar(separator: char) -> Grammar {
    Grammar::builder()
        .ignore_pattern(" ")
        .rule(rule("csv", &["tuples"]))
        .rule(rule("tuples", &["tuple", r":\n+", "tuples"]))
        .rule(rule("tuples", &["tuple"]))
        .rule(rule("tuples", &[]))
        .rule(rule("tuple", &["elements"]))
        .rule(Rule::builder("elements")
            .construct("element")
            .token("", format!("\\{separator}"))
            .construct("elements")
            .build()
            .expect("rule should build"))
        .rule(rule("elements", &["element"]))
        .rule(rule("element", &["doubleQuotedText"]))
        .rule(rule("element", &["singleQuotedText"]))
        .rule(rule("element", &["unquotedText"]))
        .rule(rule("doubleQuotedText", &[":\\\"", "doubleQuotedTextTail", ":\\\""]))
        .rule(rule(
            "doubleQuotedTextTail",
            &[r#"doubleQuotedTextFragment:[^"\\]*"#, "escapeSequence", "doubleQuotedTextTail"],
        ))
        .rule(rule("doubleQuotedTextTail", &[r#"doubleQuotedTextFinalFragment:[^"]*"#]))
        .rule(rule("singleQuotedText", &[r":\'", "singleQuotedTextTail", r":\'"]))
        .rule(rule(
            "singleQuotedTextTail",
            &[r"singleQuotedTextFragment:[^'\\]*", "escapeSequence", "singleQuotedTextTail"],
        ))
        .rule(rule("singleQuotedTextTail", &[r"singleQuotedTextFinalFragment:[^']*"]))
        .rule(rule("escapeSequence", &[r"escapeSequence:\\."]))
        .rule(Rule::builder("unquotedText")
            .token(
                "unquotedText",
                format!(r#"[^ "'\{separator}\n][^\{separator}\n]*|\b"#),
            )
            .build()
            .expect("rule should build"))
        .build()
        .expect("grammar should build")
}

/// Collects tuples through the raw visitor protocol, decoding escape
/// sequences on the way.
#[derive(Default)]
struct CsvVisitor {
    csv: Vec<Vec<String>>,
    tuple: Vec<String>,
    element: String,
}

impl SyntaxTreeVisitor for CsvVisitor {
    fn token(&mut self, node: &TokenNode) {
        match node.name() {
            "doubleQuotedTextFragment"
            | "doubleQuotedTextFinalFragment"
            | "singleQuotedTextFragment"
            | "singleQuotedTextFinalFragment"
            | "unquotedText" => self.element.push_str(node.value()),
            "escapeSequence" => {
                let escaped = node.value().chars().nth(1).unwrap_or_default();
                self.element.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            }
            _ => {}
        }
    }

    fn enter_construct(&mut self, node: &ConstructNode) {
        match node.name() {
            "tuple" => self.tuple.clear(),
            "element" => self.element.clear(),
            _ => {}
        }
    }

    fn exit_construct(&mut self, node: &ConstructNode) {
        match node.name() {
            "tuple" => self.csv.push(std::mem::take(&mut self.tuple)),
            "element" => self.tuple.push(std::mem::take(&mut self.element)),
            _ => {}
        }
    }
}

#[test]
fn parses_csv_with_quotes_and_escapes() {
    let source = "unquoted-text; \"double quoted \\\" text\"; 12.45\n35; 'single quoted \\' text'; unquoted-text\n";
    let parser = RecursiveDescentParser::new(csv_grammar(';')).expect("parser should build");
    let tree = parser.parse(source).expect("the csv should parse");

    let mut visitor = CsvVisitor::default();
    tree.accept(&mut visitor);
    assert_eq!(
        visitor.csv,
        vec![
            vec![
                "unquoted-text".to_string(),
                "double quoted \" text".to_string(),
                "12.45".to_string(),
            ],
            vec![
                "35".to_string(),
                "single quoted ' text".to_string(),
                "unquoted-text".to_string(),
            ],
        ]
    );
}

#[test]
fn parses_a_lone_tuple_from_its_construct() {
    let parser = RecursiveDescentParser::new(csv_grammar(';')).expect("parser should build");
    let tree = parser
        .parse_with_axiom("a; b; c", "tuple")
        .expect("the tuple should parse");

    let mut visitor = CsvVisitor::default();
    tree.accept(&mut visitor);
    assert_eq!(visitor.csv, vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]]);
}

// ============================================================================
// INI
// ============================================================================

type Ini = BTreeMap<String, BTreeMap<String, String>>;

fn ini_grammar() -> Grammar {
    Grammar::builder()
        .ignore_pattern(" ")
        .rule(rule("ini", &["sections"]))
        .rule(rule("sections", &["section", "sections"]))
        .rule(rule("sections", &[r":\n", "sections"]))
        .rule(rule("sections", &[]))
        .rule(rule(
            "section",
            &[r":\[", r"section-name:[a-zA-Z0-9_\-]+", r":\]", r":\n", "pairs"],
        ))
        .rule(rule("pairs", &["pair", r":\n", "pairs"]))
        .rule(rule("pairs", &[r":\n", "pairs"]))
        .rule(rule("pairs", &["pair"]))
        .rule(rule("pairs", &[]))
        .rule(rule("pair", &[r"key:[a-zA-Z0-9_\-]+", r":\=", r"value:[^\n]*"]))
        .build()
        .expect("grammar should build")
}

fn ini_interpreter(grammar: Grammar) -> TypedInterpreter {
    TypedInterpreter::builder(grammar)
        .tokens(["key", "value", "section-name"], |text| {
            Ok(text.to_string())
        })
        .construct("pair", |(key, value): (String, String)| Ok((key, value)))
        .construct("section", |(name, pairs): (String, Vec<Value>)| {
            let mut section = BTreeMap::new();
            for pair in pairs {
                let (key, value): (String, String) = pair.take()?;
                section.insert(key, value);
            }
            Ok((name, section))
        })
        .construct("ini", |(sections,): (Vec<Value>,)| {
            let mut ini = Ini::new();
            for section in sections {
                let (name, pairs): (String, BTreeMap<String, String>) = section.take()?;
                ini.entry(name).or_default().extend(pairs);
            }
            Ok(ini)
        })
        .build()
        .expect("wiring should validate")
}

fn compile_ini(source: &str) -> Ini {
    let grammar = ini_grammar();
    let parser = RecursiveDescentParser::new(grammar.clone()).expect("parser should build");
    let tree = parser.parse(source).expect("the ini should parse");
    ini_interpreter(grammar)
        .analyze::<Ini>(&tree)
        .expect("the ini should analyze")
}

#[test]
fn repeated_ini_sections_merge() {
    let ini = compile_ini("[s1]\nk1=v1\n\n[s1]\nk2=v2");
    let mut expected = Ini::new();
    expected.insert(
        "s1".into(),
        BTreeMap::from([("k1".into(), "v1".into()), ("k2".into(), "v2".into())]),
    );
    assert_eq!(ini, expected);
}

#[test]
fn ini_sections_keep_their_pairs_apart() {
    let ini = compile_ini("[a]\nx=1\n[b]\nx=2\ny=3");
    assert_eq!(ini["a"].len(), 1);
    assert_eq!(ini["b"].len(), 2);
    assert_eq!(ini["b"]["y"], "3");
}

#[test]
fn blank_lines_are_tolerated_between_pairs() {
    let ini = compile_ini("[a]\n\n\nx=1\n\ny=2");
    assert_eq!(ini["a"]["x"], "1");
    assert_eq!(ini["a"]["y"], "2");
}

// ============================================================================
// WIRING VALIDATION
// ============================================================================

fn word_grammar() -> Grammar {
    Grammar::builder()
        .rule(rule("start", &["word:[a-z]+"]))
        .build()
        .expect("grammar should build")
}

#[test]
fn handlers_for_unknown_tags_are_rejected() {
    let result = TypedInterpreter::builder(word_grammar())
        .token("nope", |text| Ok(text.to_string()))
        .build();
    assert!(matches!(
        result,
        Err(WiringError::UndefinedToken { name }) if name == "nope"
    ));

    let result = TypedInterpreter::builder(word_grammar())
        .construct("nope", |(word,): (String,)| Ok(word))
        .build();
    assert!(matches!(
        result,
        Err(WiringError::UndefinedConstruct { name }) if name == "nope"
    ));
}

#[test]
fn double_registrations_are_rejected() {
    let result = TypedInterpreter::builder(word_grammar())
        .token("word", |text| Ok(text.to_string()))
        .token("word", |text| Ok(text.len()))
        .build();
    assert!(matches!(
        result,
        Err(WiringError::DoubleTokenAnnotation { name }) if name == "word"
    ));

    let result = TypedInterpreter::builder(word_grammar())
        .construct("start", |(word,): (String,)| Ok(word))
        .construct("start", |(word,): (String,)| Ok(word))
        .build();
    assert!(matches!(
        result,
        Err(WiringError::DoubleConstructAnnotation { name }) if name == "start"
    ));
}

#[test]
fn token_handlers_must_accept_text() {
    let handler = Handler::new(
        vec![TypeDesc::of::<u32>()],
        TypeDesc::text(),
        |_args| Ok(Value::text("")),
    );
    let result = TypedInterpreter::builder(word_grammar())
        .token_handler("word", handler)
        .build();
    assert!(matches!(
        result,
        Err(WiringError::TokenMethodParameter { name, .. }) if name == "word"
    ));
}

#[test]
fn handler_arity_must_match_the_rule_body() {
    let result = TypedInterpreter::builder(word_grammar())
        .construct("start", |(a, b): (String, String)| Ok(format!("{a}{b}")))
        .build();
    assert!(matches!(
        result,
        Err(WiringError::ParameterCountMismatch {
            expected: 1,
            actual: 2,
            ..
        })
    ));
}

#[test]
fn handler_parameter_types_must_match_the_rule_body() {
    let result = TypedInterpreter::builder(word_grammar())
        .construct("start", |(word,): (u32,)| Ok(word))
        .build();
    assert!(matches!(
        result,
        Err(WiringError::ParameterTypeMismatch { index: 0, .. })
    ));
}

#[test]
fn token_handler_types_flow_into_parent_signatures() {
    let grammar = Grammar::builder()
        .rule(rule("start", &["count:[0-9]+"]))
        .build()
        .expect("grammar should build");
    // With the token handler producing u32, a (String,) construct handler
    // no longer lines up.
    let result = TypedInterpreter::builder(grammar)
        .token("count", |text| text.parse::<u32>().map_err(Into::into))
        .construct("start", |(count,): (String,)| Ok(count))
        .build();
    assert!(matches!(
        result,
        Err(WiringError::ParameterTypeMismatch { .. })
    ));
}

#[test]
fn anonymous_tokens_contribute_no_parameter() {
    let grammar = Grammar::builder()
        .ignore_pattern("\\s")
        .rule(rule("start", &[":\\(", "word:[a-z]+", ":\\)"]))
        .build()
        .expect("grammar should build");
    let parser = RecursiveDescentParser::new(grammar.clone()).expect("parser should build");
    let interpreter = TypedInterpreter::builder(grammar)
        .construct("start", |(word,): (String,)| Ok(word.to_uppercase()))
        .build()
        .expect("wiring should validate");

    let tree = parser.parse("(hello)").expect("should parse");
    assert_eq!(interpreter.analyze::<String>(&tree).unwrap(), "HELLO");
}

// ============================================================================
// SIMPLE INTERPRETER
// ============================================================================

#[test]
fn simple_interpreter_defaults_pass_values_through() {
    let grammar = Grammar::builder()
        .ignore_pattern("\\s")
        .rule(rule("pair", &["left:[a-z]+", "right:[0-9]+"]))
        .build()
        .expect("grammar should build");
    let parser = RecursiveDescentParser::new(grammar).expect("parser should build");
    let tree = parser.parse("abc 42").expect("should parse");

    let interpreter = SimpleInterpreter::builder()
        .token("right", |node| {
            node.value().parse::<u32>().ok().map(Value::new)
        })
        .build();

    let values = interpreter
        .analyze::<Vec<Value>>(&tree)
        .expect("analysis should produce the children");
    assert_eq!(values.len(), 2);
    let mut values = values.into_iter();
    assert_eq!(values.next().unwrap().take::<String>().unwrap(), "abc");
    assert_eq!(values.next().unwrap().take::<u32>().unwrap(), 42);
}

#[test]
fn simple_interpreter_suppresses_dropped_nodes() {
    let grammar = Grammar::builder()
        .ignore_pattern("\\s")
        .rule(rule("pair", &["left:[a-z]+", "right:[0-9]+"]))
        .build()
        .expect("grammar should build");
    let parser = RecursiveDescentParser::new(grammar).expect("parser should build");
    let tree = parser.parse("abc 42").expect("should parse");

    let interpreter = SimpleInterpreter::builder()
        .token("left", |_node| None)
        .build();

    let values = interpreter
        .analyze::<Vec<Value>>(&tree)
        .expect("analysis should produce the children");
    assert_eq!(values.len(), 1);
}
