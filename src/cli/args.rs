//! Command-line arguments for the gramarye tool.
//!
//! Uses `clap` with its derive feature for a declarative, type-safe
//! argument surface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "gramarye",
    version,
    about = "Compile BNF grammars and parse inputs against them."
)]
pub struct GramaryeArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile a grammar file and report any defects.
    Check {
        /// The grammar file, in the textual grammar language.
        #[arg(required = true)]
        grammar: PathBuf,
    },
    /// Parse an input file and print its syntax tree.
    Tree {
        /// The grammar file, in the textual grammar language.
        #[arg(required = true)]
        grammar: PathBuf,
        /// The input file to parse.
        #[arg(required = true)]
        input: PathBuf,
        /// Parse from this construct instead of the grammar's axiom.
        #[arg(long)]
        axiom: Option<String>,
    },
    /// Print the canonical textual form of a grammar.
    Print {
        /// The grammar file, in the textual grammar language.
        #[arg(required = true)]
        grammar: PathBuf,
    },
}
