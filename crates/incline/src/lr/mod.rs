//! # LR Automata
//!
//! Automaton construction ([`graph`]), action tables ([`table`]) and the
//! persisted automaton cache ([`cache`]).
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use incline::grammar::GrammarSource;
//! use incline::lr::{self, Action, LrMode};
//! use incline::grammar::Symbol;
//!
//! let source = GrammarSource::parse("E ::= E \"+\" \"a\" | \"a\"").unwrap();
//! let table = lr::build(&Arc::new(source.grammar), LrMode::Lr1);
//! assert!(matches!(table.lookup(0, &Symbol::terminal("a")), Some(Action::Shift(_))));
//! assert!(table.conflicts().is_empty());
//! ```
//!
//! Tables are pure functions of the grammar and mode. [`build`] memoizes them
//! per process; the returned `Arc` is shared and never mutated.

#[cfg(feature = "serialize")]
pub mod cache;
mod config;
pub mod graph;
pub mod item;
pub mod table;

#[cfg(feature = "serialize")]
pub use cache::AutomatonCache;
pub use config::{LrMode, ParserConfig};
pub use graph::{BuildStats, StateGraph, StateId};
pub use item::{Item, StateSet};
pub use table::{Action, Conflict, ConflictKind, Resolution, SyntaxTable};

use crate::error::GrammarError;
use crate::grammar::{Grammar, Symbol};
use dashmap::DashMap;
use std::sync::{Arc, LazyLock};
use tracing::trace;

static TABLES: LazyLock<DashMap<(u64, LrMode), Arc<SyntaxTable>, ahash::RandomState>> =
    LazyLock::new(DashMap::default);

/// Build (or fetch the memoized) syntax table for `grammar`.
#[must_use]
pub fn build(grammar: &Arc<Grammar>, mode: LrMode) -> Arc<SyntaxTable> {
    let key = (grammar.fingerprint(), mode);
    if let Some(table) = TABLES.get(&key) {
        trace!(fingerprint = key.0, %mode, "syntax table memo hit");
        return Arc::clone(&table);
    }
    let table = Arc::new(build_uncached(Arc::clone(grammar), mode));
    Arc::clone(TABLES.entry(key).or_insert(table).value())
}

/// Build a syntax table rooted at `start`.
///
/// # Errors
///
/// Returns [`GrammarError::UndefinedStart`] if `start` has no rule in `grammar`.
pub fn build_from(start: &Symbol, grammar: &Grammar, mode: LrMode) -> Result<Arc<SyntaxTable>, GrammarError> {
    let rooted = Arc::new(grammar.with_start(start)?);
    Ok(build(&rooted, mode))
}

/// Build a syntax table without consulting or filling the memo.
#[must_use]
pub fn build_uncached(grammar: Arc<Grammar>, mode: LrMode) -> SyntaxTable {
    let graph = StateGraph::build(&grammar, mode);
    SyntaxTable::build(graph, grammar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarSource;

    #[test]
    fn memoized_tables_are_shared() {
        let grammar = Arc::new(GrammarSource::parse("S ::= \"x\" S | \"y\"").unwrap().grammar);
        let first = build(&grammar, LrMode::Lalr);
        let second = build(&grammar, LrMode::Lalr);
        assert!(Arc::ptr_eq(&first, &second));
        let other_mode = build(&grammar, LrMode::Lr0);
        assert!(!Arc::ptr_eq(&first, &other_mode));
    }

    #[test]
    fn build_from_reroots_the_grammar() {
        let grammar = GrammarSource::parse("S ::= T \"x\"\nT ::= \"y\"").unwrap().grammar;
        let table = build_from(&Symbol::nonterminal("T"), &grammar, LrMode::Lr1).unwrap();
        let t = table.grammar().symbol_id(&Symbol::nonterminal("T")).unwrap();
        assert_eq!(table.grammar().start(), t);
        assert!(build_from(&Symbol::nonterminal("Nope"), &grammar, LrMode::Lr1).is_err());
    }
}
