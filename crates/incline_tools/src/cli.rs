//! Command-line interface of the `incline` binary.

use clap::{Args, Parser, Subcommand};
use incline::lr::LrMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "incline")]
#[command(about = "Inspect incline grammars, automata and parse trees")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that loads a grammar.
#[derive(Args, Debug, Clone)]
pub struct GrammarArgs {
    /// Grammar file
    #[arg(short, long)]
    pub grammar: PathBuf,

    /// Automaton construction: lr0, lr1 (Pager-merged) or lalr
    #[arg(short, long, default_value = "lr1")]
    pub mode: LrMode,

    /// Force implicit whitespace on
    #[arg(long)]
    pub whitespace: bool,

    /// Directory of the persisted automaton cache
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the syntax table and report states and conflicts
    Table {
        #[command(flatten)]
        grammar: GrammarArgs,

        /// Print the items of every state
        #[arg(long)]
        states: bool,
    },

    /// Export the automaton, or a parse tree, as Graphviz DOT
    Dot {
        #[command(flatten)]
        grammar: GrammarArgs,

        /// Parse this file and export its tree instead of the automaton
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the automaton and table as JSON
    Json {
        #[command(flatten)]
        grammar: GrammarArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a file and print its tree
    Parse {
        #[command(flatten)]
        grammar: GrammarArgs,

        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Mark nodes still flagged changed
        #[arg(long)]
        changed: bool,
    },

    /// Replay a script of token edits against a document
    Replay {
        #[command(flatten)]
        grammar: GrammarArgs,

        /// Edit script, one command per line
        #[arg(short, long)]
        script: PathBuf,
    },
}
