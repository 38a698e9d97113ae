//! # Grammar Model
//!
//! Context-free grammars over interned [`Symbol`]s.
//!
//! ## Overview
//!
//! A [`Grammar`] holds the start symbol, the productions in declaration order
//! and the rule table mapping every nonterminal to its alternatives. Production
//! `0` is always the synthetic start rule `⟨start⟩ ::= Start`; every other
//! production keeps the position it was declared in, which is what the syntax
//! table uses to settle reduce/reduce conflicts.
//!
//! FIRST, FOLLOW and nullability are computed once when the grammar is built
//! (see [`analysis`]).
//!
//! ## Usage
//!
//! ```rust
//! use incline::grammar::{Assoc, GrammarBuilder, Symbol};
//!
//! let grammar = GrammarBuilder::new()
//!     .start("E")
//!     .rule("E", [
//!         vec![Symbol::nonterminal("E"), Symbol::terminal("+"), Symbol::nonterminal("E")],
//!         vec![Symbol::terminal("a")],
//!     ])
//!     .precedence(Assoc::Left, ["+"])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(grammar.productions().len(), 3);
//! ```
//!
//! Grammars are usually read from source text instead, see [`source`].

pub mod analysis;
pub mod annotation;
pub mod source;
mod symbol;

pub use analysis::GrammarMetrics;
pub use annotation::Annotation;
pub use source::{GrammarOptions, GrammarSource, LexerRuleSource};
pub use symbol::{AnyMode, Symbol, SymbolId};

use crate::error::GrammarError;
use hashbrown::HashMap;
use std::collections::BTreeSet;
use std::fmt;

/// Index of a production inside its grammar.
pub type ProductionId = usize;

/// Ordered set of symbol ids, used for FIRST/FOLLOW and lookahead sets.
pub type SymbolSet = BTreeSet<SymbolId>;

/// The production synthesized for the augmented start rule.
pub const START_PRODUCTION: ProductionId = 0;

/// Operator associativity declared with `%left`, `%right` or `%nonassoc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Assoc {
    Left,
    Right,
    NonAssoc,
}

/// Precedence of a terminal. Higher levels bind tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Precedence {
    pub level: u32,
    pub assoc: Assoc,
}

/// A production `left ::= right`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    pub id: ProductionId,
    /// `None` for the synthetic start rule.
    pub left: Option<SymbolId>,
    pub right: Vec<SymbolId>,
    /// Explicit `%prec` tag.
    pub precedence: Option<SymbolId>,
    pub annotation: Option<Annotation>,
}

impl Production {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.right.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.right.is_empty()
    }
}

/// One right-hand side as handed to [`GrammarBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alternative {
    pub symbols: Vec<Symbol>,
    pub precedence: Option<Symbol>,
    pub annotation: Option<String>,
}

impl Alternative {
    #[must_use]
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self {
            symbols,
            ..Self::default()
        }
    }

    /// The empty alternative.
    #[must_use]
    pub fn epsilon() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_precedence(mut self, terminal: impl Into<compact_str::CompactString>) -> Self {
        self.precedence = Some(Symbol::Terminal(terminal.into()));
        self
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }
}

impl From<Vec<Symbol>> for Alternative {
    fn from(symbols: Vec<Symbol>) -> Self {
        Self::new(symbols)
    }
}

/// A built, immutable grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    symbols: Vec<Symbol>,
    ids: HashMap<Symbol, SymbolId, ahash::RandomState>,
    productions: Vec<Production>,
    /// Alternatives per symbol id; empty for terminals.
    rules: Vec<Vec<ProductionId>>,
    start: SymbolId,
    precedences: HashMap<SymbolId, Precedence, ahash::RandomState>,
    sets: analysis::FirstFollow,
}

impl Grammar {
    pub const FINISH: SymbolId = SymbolId(0);
    pub const EPSILON: SymbolId = SymbolId(1);

    /// The user-facing start nonterminal.
    #[must_use]
    pub const fn start(&self) -> SymbolId {
        self.start
    }

    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    #[must_use]
    pub fn symbol_id(&self, symbol: &Symbol) -> Option<SymbolId> {
        self.ids.get(symbol).copied()
    }

    /// All symbols, indexed by [`SymbolId`].
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Every symbol that can label a leaf, including `Finish`.
    pub fn terminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_terminal() && !s.is_epsilon())
            .map(|(i, _)| SymbolId(i as u32))
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_nonterminal())
            .map(|(i, _)| SymbolId(i as u32))
    }

    #[must_use]
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    #[must_use]
    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id]
    }

    /// Alternatives of a nonterminal, in declaration order.
    #[must_use]
    pub fn alternatives(&self, nonterminal: SymbolId) -> &[ProductionId] {
        &self.rules[nonterminal.index()]
    }

    /// Alternatives of a nonterminal looked up by symbol.
    #[must_use]
    pub fn lookup(&self, nonterminal: &Symbol) -> Option<&[ProductionId]> {
        let id = self.symbol_id(nonterminal)?;
        self.symbol(id)
            .is_nonterminal()
            .then(|| self.alternatives(id))
    }

    #[must_use]
    pub fn precedence_of(&self, terminal: SymbolId) -> Option<Precedence> {
        self.precedences.get(&terminal).copied()
    }

    /// Precedence of a production: its `%prec` tag, otherwise the rightmost
    /// terminal of its right side that has one.
    #[must_use]
    pub fn production_precedence(&self, id: ProductionId) -> Option<Precedence> {
        let production = &self.productions[id];
        if let Some(tag) = production.precedence {
            return self.precedence_of(tag);
        }
        production
            .right
            .iter()
            .rev()
            .filter(|s| self.symbol(**s).is_terminal())
            .find_map(|s| self.precedence_of(*s))
    }

    /// Display name of a production's left side.
    #[must_use]
    pub fn left_name(&self, id: ProductionId) -> &str {
        self.productions[id]
            .left
            .map_or("<start>", |left| self.symbol(left).name())
    }

    /// Stable hash of the productions and precedences.
    ///
    /// Used to key memoized automata; equal grammars built in different
    /// orders of `rule` calls hash differently.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        use std::hash::{BuildHasher, Hash, Hasher};

        let state = ahash::RandomState::with_seeds(0x1c, 0x2f, 0x3a, 0x4d);
        let mut hasher = state.build_hasher();
        self.symbols.hash(&mut hasher);
        self.productions.hash(&mut hasher);
        let mut precs: Vec<_> = self.precedences.iter().collect();
        precs.sort_by_key(|(id, _)| **id);
        precs.hash(&mut hasher);
        hasher.finish()
    }

    /// The same grammar rooted at another nonterminal.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::UndefinedStart`] if `start` is not a
    /// nonterminal with at least one alternative.
    pub fn with_start(&self, start: &Symbol) -> Result<Self, GrammarError> {
        let undefined = || GrammarError::UndefinedStart {
            name: start.name().to_string(),
        };
        let id = self.symbol_id(start).ok_or_else(undefined)?;
        if !start.is_nonterminal() || self.rules[id.index()].is_empty() {
            return Err(undefined());
        }
        if id == self.start {
            return Ok(self.clone());
        }
        let mut grammar = self.clone();
        grammar.start = id;
        grammar.productions[START_PRODUCTION].right = vec![id];
        grammar.sets =
            analysis::FirstFollow::compute(&grammar.symbols, &grammar.productions, &grammar.rules, id);
        Ok(grammar)
    }

    /// Render a production as `A ::= x y z`.
    #[must_use]
    pub fn display_production(&self, id: ProductionId) -> String {
        let production = &self.productions[id];
        let mut out = format!("{} ::=", self.left_name(id));
        if production.right.is_empty() {
            out.push_str(" ε");
        }
        for sym in &production.right {
            out.push(' ');
            out.push_str(&self.symbol(*sym).to_string());
        }
        out
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for nt in self.nonterminals() {
            let alternatives = self.alternatives(nt);
            if alternatives.is_empty() {
                continue;
            }
            write!(f, "{} ::=", self.symbol(nt).name())?;
            for (i, pid) in alternatives.iter().enumerate() {
                if i > 0 {
                    f.write_str("\n    |")?;
                }
                let right = &self.productions[*pid].right;
                if right.is_empty() {
                    f.write_str(" ")?;
                }
                for sym in right {
                    write!(f, " {}", self.symbol(*sym))?;
                }
            }
            f.write_str("\n    ;\n")?;
        }
        Ok(())
    }
}

/// Builder for [`Grammar`].
///
/// Rules are kept in the order `rule`/`alternative` are called. Calling
/// `rule` twice for the same nonterminal appends alternatives.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    start: Option<compact_str::CompactString>,
    rules: Vec<(compact_str::CompactString, Alternative)>,
    precedences: Vec<(Assoc, Vec<compact_str::CompactString>)>,
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start nonterminal. Defaults to the first rule's left side.
    #[must_use]
    pub fn start(mut self, name: impl Into<compact_str::CompactString>) -> Self {
        self.start = Some(name.into());
        self
    }

    #[must_use]
    pub fn rule<I, A>(mut self, left: impl Into<compact_str::CompactString>, alternatives: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Alternative>,
    {
        let left = left.into();
        for alt in alternatives {
            self.rules.push((left.clone(), alt.into()));
        }
        self
    }

    #[must_use]
    pub fn alternative(
        mut self,
        left: impl Into<compact_str::CompactString>,
        alternative: impl Into<Alternative>,
    ) -> Self {
        self.rules.push((left.into(), alternative.into()));
        self
    }

    /// Declare a precedence level. Each call binds tighter than the previous one.
    #[must_use]
    pub fn precedence<I, S>(mut self, assoc: Assoc, terminals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<compact_str::CompactString>,
    {
        self.precedences
            .push((assoc, terminals.into_iter().map(Into::into).collect()));
        self
    }

    pub(crate) fn push_alternative(&mut self, left: compact_str::CompactString, alt: Alternative) {
        self.rules.push((left, alt));
    }

    pub(crate) fn push_precedence(&mut self, assoc: Assoc, terminals: Vec<compact_str::CompactString>) {
        self.precedences.push((assoc, terminals));
    }

    pub(crate) fn set_start(&mut self, name: compact_str::CompactString) {
        self.start = Some(name);
    }

    /// Build the grammar and compute its FIRST/FOLLOW sets.
    ///
    /// # Errors
    ///
    /// Returns an error if the grammar has no rules, if the start symbol has no
    /// rule, or if a nonterminal is used without being defined.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        let Some((first_left, _)) = self.rules.first() else {
            return Err(GrammarError::Empty);
        };
        let start_name = self.start.clone().unwrap_or_else(|| first_left.clone());

        let mut symbols = vec![Symbol::Finish, Symbol::Epsilon];
        let mut ids: HashMap<Symbol, SymbolId, ahash::RandomState> = HashMap::default();
        ids.insert(Symbol::Finish, Grammar::FINISH);
        ids.insert(Symbol::Epsilon, Grammar::EPSILON);
        let mut intern = |symbol: &Symbol| -> SymbolId {
            if let Some(id) = ids.get(symbol) {
                return *id;
            }
            let id = SymbolId(symbols.len() as u32);
            symbols.push(symbol.clone());
            ids.insert(symbol.clone(), id);
            id
        };

        let start = intern(&Symbol::Nonterminal(start_name.clone()));
        let mut productions = vec![Production {
            id: START_PRODUCTION,
            left: None,
            right: vec![start],
            precedence: None,
            annotation: None,
        }];
        for (left, alt) in &self.rules {
            let left_id = intern(&Symbol::Nonterminal(left.clone()));
            let right = alt
                .symbols
                .iter()
                .filter(|s| !s.is_epsilon())
                .map(&mut intern)
                .collect();
            let precedence = alt.precedence.as_ref().map(&mut intern);
            let annotation = alt
                .annotation
                .as_deref()
                .map(Annotation::parse)
                .transpose()
                .map_err(|message| GrammarError::MalformedAnnotation {
                    rule: left.to_string(),
                    message,
                })?;
            productions.push(Production {
                id: productions.len(),
                left: Some(left_id),
                right,
                precedence,
                annotation,
            });
        }

        let mut precedences = HashMap::default();
        for (level, (assoc, terminals)) in self.precedences.iter().enumerate() {
            for name in terminals {
                let id = intern(&Symbol::Terminal(name.clone()));
                precedences.insert(
                    id,
                    Precedence {
                        level: level as u32 + 1,
                        assoc: *assoc,
                    },
                );
            }
        }

        let mut rules = vec![Vec::new(); symbols.len()];
        for production in &productions[1..] {
            if let Some(left) = production.left {
                rules[left.index()].push(production.id);
            }
        }

        if rules[start.index()].is_empty() {
            return Err(GrammarError::UndefinedStart {
                name: start_name.to_string(),
            });
        }
        for production in &productions[1..] {
            for sym in &production.right {
                if symbols[sym.index()].is_nonterminal() && rules[sym.index()].is_empty() {
                    return Err(GrammarError::UndefinedNonterminal {
                        name: symbols[sym.index()].name().to_string(),
                        used_in: production
                            .left
                            .map(|l| symbols[l.index()].name().to_string())
                            .unwrap_or_default(),
                    });
                }
            }
        }

        let sets = analysis::FirstFollow::compute(&symbols, &productions, &rules, start);
        Ok(Grammar {
            symbols,
            ids,
            productions,
            rules,
            start,
            precedences,
            sets,
        })
    }
}
