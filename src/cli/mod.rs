//! The gramarye command-line interface.
//!
//! This module is the entry point for all CLI commands and orchestrates the
//! core library functions. Failures render as miette reports.

use std::path::Path;
use std::{fs, process};

use clap::Parser;
use miette::Report;

use crate::cli::args::{Command, GramaryeArgs};
use crate::grammar::Grammar;
use crate::parser::RecursiveDescentParser;
use crate::text;

pub mod args;

/// The main entry point for the CLI.
pub fn run() {
    let args = GramaryeArgs::parse();

    let result = match args.command {
        Command::Check { grammar } => handle_check(&grammar),
        Command::Tree {
            grammar,
            input,
            axiom,
        } => handle_tree(&grammar, &input, axiom.as_deref()),
        Command::Print { grammar } => handle_print(&grammar),
    };

    if let Err(report) = result {
        eprintln!("{report:?}");
        process::exit(1);
    }
}

fn read_file(path: &Path) -> Result<String, Report> {
    fs::read_to_string(path)
        .map_err(|error| Report::msg(format!("cannot read {}: {error}", path.display())))
}

fn load_grammar(path: &Path) -> Result<Grammar, Report> {
    let source = read_file(path)?;
    text::compile(&source).map_err(Report::new)
}

/// Handles the `check` subcommand.
fn handle_check(path: &Path) -> Result<(), Report> {
    let grammar = load_grammar(path)?;
    RecursiveDescentParser::new(grammar.clone()).map_err(Report::new)?;
    println!(
        "{}: {} rules, {} constructs, {} named tokens",
        path.display(),
        grammar.iter().count(),
        grammar.constructs().count(),
        grammar.tokens().count(),
    );
    Ok(())
}

/// Handles the `tree` subcommand.
fn handle_tree(grammar_path: &Path, input_path: &Path, axiom: Option<&str>) -> Result<(), Report> {
    let grammar = load_grammar(grammar_path)?;
    let parser = RecursiveDescentParser::new(grammar).map_err(Report::new)?;
    let source = read_file(input_path)?;

    let tree = match axiom {
        Some(axiom) => parser.parse_with_axiom(&source, axiom),
        None => parser.parse(&source),
    }
    .map_err(Report::new)?;

    print!("{tree}");
    Ok(())
}

/// Handles the `print` subcommand.
fn handle_print(path: &Path) -> Result<(), Report> {
    let grammar = load_grammar(path)?;
    print!("{grammar}");
    Ok(())
}
