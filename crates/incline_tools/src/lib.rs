//! Incline Tools - developer utilities for incline grammars
//!
//! Table reports, Graphviz and JSON export of automata and parse trees, and a
//! replay runner for scripted token edits.

pub mod cli;
pub mod replay;
pub mod visualize;

use cli::GrammarArgs;
use incline::grammar::GrammarSource;
use incline::lr::{self, AutomatonCache, SyntaxTable};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::sync::Arc;
use tracing::info;

/// A grammar file read and compiled into a syntax table.
pub struct Loaded {
    pub source: GrammarSource,
    pub table: Arc<SyntaxTable>,
}

/// Read the grammar named by `args` and build its table, going through the
/// automaton cache when a cache directory is given.
///
/// # Errors
///
/// Fails when the file cannot be read, the grammar is malformed or the cache
/// directory is unusable.
pub fn load_grammar(args: &GrammarArgs) -> Result<Loaded> {
    let text = std::fs::read_to_string(&args.grammar)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading grammar {}", args.grammar.display()))?;
    let loaded = compile(&text, args)?;
    info!(
        grammar = %args.grammar.display(),
        mode = %args.mode,
        states = loaded.table.state_count(),
        conflicts = loaded.table.conflicts().len(),
        "grammar loaded"
    );
    Ok(loaded)
}

/// Compile grammar `text` with the options of `args`.
///
/// # Errors
///
/// Fails for a malformed grammar or an unusable cache directory.
pub fn compile(text: &str, args: &GrammarArgs) -> Result<Loaded> {
    if let Some(dir) = &args.cache_dir {
        let cache = AutomatonCache::new(dir).into_diagnostic()?;
        let (source, table) = cache
            .load_or_build(text, args.whitespace, args.mode)
            .into_diagnostic()?;
        return Ok(Loaded { source, table });
    }
    let source = GrammarSource::parse_with_whitespace(text, args.whitespace).into_diagnostic()?;
    let table = lr::build(&Arc::new(source.grammar.clone()), args.mode);
    Ok(Loaded { source, table })
}
