//! # Syntax Table
//!
//! Per-(state, symbol) parse actions derived from a [`StateGraph`].
//!
//! Final items install reduces on their lookaheads (on every terminal for
//! LR(0)), the start production installs `Accept` on end of input, and edges
//! install shifts (terminals) and gotos (nonterminals).
//!
//! ## Conflicts
//!
//! When a cell is already taken:
//!
//! 1. If the production and the competing terminal (or both productions)
//!    have a declared precedence, the higher level wins. On a tie `%left`
//!    reduces, `%right` shifts and `%nonassoc` leaves the cell empty, so the
//!    input is a syntax error.
//! 2. Otherwise shift beats reduce and the earlier-declared production wins a
//!    reduce/reduce conflict.
//!
//! Every conflict is kept in [`SyntaxTable::conflicts`]. Conflicts settled by
//! rule 2 are also logged as warnings.

use super::graph::{StateGraph, StateId};
use crate::grammar::{Assoc, Grammar, ProductionId, START_PRODUCTION, Symbol, SymbolId};
use hashbrown::HashMap;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

/// LR parsing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    /// Shift a terminal and go to state.
    Shift(StateId),
    /// Reduce using production.
    Reduce(ProductionId),
    /// Go to state after reducing to a nonterminal.
    Goto(StateId),
    /// Accept (successful parse).
    Accept,
}

impl Action {
    #[must_use]
    pub const fn shift(state: StateId) -> Self {
        Self::Shift(state)
    }

    #[must_use]
    pub const fn reduce(production: ProductionId) -> Self {
        Self::Reduce(production)
    }

    #[must_use]
    pub const fn goto(state: StateId) -> Self {
        Self::Goto(state)
    }
}

/// Type alias for the action table: (state, symbol) -> Action
type ActionTable = HashMap<(StateId, SymbolId), Action, ahash::RandomState>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
    AcceptReduce,
}

/// What a conflicting cell ended up holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Resolution {
    Shift(StateId),
    Reduce(ProductionId),
    Accept,
    /// `%nonassoc`: the cell was cleared.
    Error,
}

/// A conflict met while filling the table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Conflict {
    pub state: StateId,
    pub symbol: SymbolId,
    pub kind: ConflictKind,
    /// Productions competing for the cell.
    pub productions: Vec<ProductionId>,
    pub resolution: Resolution,
    /// Settled by declared precedence rather than the default policy.
    pub by_precedence: bool,
}

/// Action table for one grammar and automaton. Immutable once built.
#[derive(Debug, Clone)]
pub struct SyntaxTable {
    grammar: Arc<Grammar>,
    graph: StateGraph,
    actions: ActionTable,
    conflicts: Vec<Conflict>,
}

impl SyntaxTable {
    /// Fill the table from an automaton built for `grammar`.
    #[must_use]
    pub fn build(graph: StateGraph, grammar: Arc<Grammar>) -> Self {
        let mut table = Self {
            grammar,
            graph,
            actions: HashMap::default(),
            conflicts: Vec::new(),
        };
        let lr0_lookahead: Vec<SymbolId> = table
            .grammar
            .terminals()
            .filter(|t| !matches!(table.grammar.symbol(*t), Symbol::Any(_)))
            .collect();
        let is_lr0 = table.graph.mode() == super::LrMode::Lr0;

        for state in 0..table.graph.state_count() {
            let mut reduces = Vec::new();
            for (item, la) in table.graph.state(state).iter() {
                if !item.is_final(&table.grammar) {
                    continue;
                }
                if item.production == START_PRODUCTION {
                    reduces.push((Grammar::FINISH, Action::Accept));
                } else if is_lr0 {
                    reduces.extend(
                        lr0_lookahead
                            .iter()
                            .map(|s| (*s, Action::Reduce(item.production))),
                    );
                } else {
                    reduces.extend(la.iter().map(|s| (*s, Action::Reduce(item.production))));
                }
            }
            for (symbol, action) in reduces {
                table.install(state, symbol, action);
            }

            let edges: Vec<(SymbolId, StateId)> = table.graph.edges_from(state).collect();
            for (symbol, target) in edges {
                let action = if table.grammar.symbol(symbol).is_nonterminal() {
                    Action::Goto(target)
                } else {
                    Action::Shift(target)
                };
                table.install(state, symbol, action);
            }
        }

        debug!(
            states = table.graph.state_count(),
            actions = table.actions.len(),
            conflicts = table.conflicts.len(),
            "built syntax table"
        );
        table
    }

    fn install(&mut self, state: StateId, symbol: SymbolId, action: Action) {
        let key = (state, symbol);
        let Some(existing) = self.actions.get(&key).copied() else {
            self.actions.insert(key, action);
            return;
        };
        if existing == action {
            return;
        }

        let conflict = match (existing, action) {
            (Action::Reduce(p), Action::Shift(target)) | (Action::Shift(target), Action::Reduce(p)) => {
                self.resolve_shift_reduce(state, symbol, p, target)
            }
            (Action::Reduce(p), Action::Reduce(q)) => self.resolve_reduce_reduce(state, symbol, p, q),
            (Action::Accept, Action::Reduce(p)) | (Action::Reduce(p), Action::Accept) => {
                self.actions.insert(key, Action::Accept);
                Conflict {
                    state,
                    symbol,
                    kind: ConflictKind::AcceptReduce,
                    productions: vec![START_PRODUCTION, p],
                    resolution: Resolution::Accept,
                    by_precedence: false,
                }
            }
            // Edges are unique per (state, symbol) and gotos only exist for
            // nonterminals, which never appear in lookahead sets.
            _ => return,
        };
        self.report(&conflict);
        self.conflicts.push(conflict);
    }

    fn resolve_shift_reduce(
        &mut self,
        state: StateId,
        symbol: SymbolId,
        production: ProductionId,
        target: StateId,
    ) -> Conflict {
        let token = self.grammar.precedence_of(symbol);
        let rule = self.grammar.production_precedence(production);
        let (resolution, by_precedence) = match (token, rule) {
            (Some(token), Some(rule)) => {
                let resolution = match token.level.cmp(&rule.level) {
                    Ordering::Greater => Resolution::Shift(target),
                    Ordering::Less => Resolution::Reduce(production),
                    Ordering::Equal => match token.assoc {
                        Assoc::Left => Resolution::Reduce(production),
                        Assoc::Right => Resolution::Shift(target),
                        Assoc::NonAssoc => Resolution::Error,
                    },
                };
                (resolution, true)
            }
            _ => (Resolution::Shift(target), false),
        };

        let key = (state, symbol);
        match resolution {
            Resolution::Shift(target) => {
                self.actions.insert(key, Action::Shift(target));
            }
            Resolution::Reduce(p) => {
                self.actions.insert(key, Action::Reduce(p));
            }
            Resolution::Error | Resolution::Accept => {
                self.actions.remove(&key);
            }
        }
        Conflict {
            state,
            symbol,
            kind: ConflictKind::ShiftReduce,
            productions: vec![production],
            resolution,
            by_precedence,
        }
    }

    fn resolve_reduce_reduce(
        &mut self,
        state: StateId,
        symbol: SymbolId,
        existing: ProductionId,
        incoming: ProductionId,
    ) -> Conflict {
        let earlier = existing.min(incoming);
        let (winner, by_precedence) = match (
            self.grammar.production_precedence(existing),
            self.grammar.production_precedence(incoming),
        ) {
            (Some(a), Some(b)) => match a.level.cmp(&b.level) {
                Ordering::Greater => (existing, true),
                Ordering::Less => (incoming, true),
                Ordering::Equal => (earlier, false),
            },
            _ => (earlier, false),
        };
        self.actions.insert((state, symbol), Action::Reduce(winner));
        Conflict {
            state,
            symbol,
            kind: ConflictKind::ReduceReduce,
            productions: vec![existing, incoming],
            resolution: Resolution::Reduce(winner),
            by_precedence,
        }
    }

    fn report(&self, conflict: &Conflict) {
        let symbol = self.grammar.symbol(conflict.symbol);
        let productions: Vec<String> = conflict
            .productions
            .iter()
            .map(|p| self.grammar.display_production(*p))
            .collect();
        if conflict.by_precedence {
            debug!(
                state = conflict.state,
                %symbol,
                kind = ?conflict.kind,
                resolution = ?conflict.resolution,
                "conflict resolved by precedence: {}",
                productions.join(" / ")
            );
        } else {
            warn!(
                state = conflict.state,
                %symbol,
                kind = ?conflict.kind,
                resolution = ?conflict.resolution,
                "conflict resolved by default policy: {}",
                productions.join(" / ")
            );
        }
    }

    /// Action for `symbol` in `state`.
    #[must_use]
    pub fn lookup(&self, state: StateId, symbol: &Symbol) -> Option<Action> {
        let id = self.grammar.symbol_id(&symbol.lookup_key())?;
        self.lookup_id(state, id)
    }

    #[inline]
    #[must_use]
    pub fn lookup_id(&self, state: StateId, symbol: SymbolId) -> Option<Action> {
        self.actions.get(&(state, symbol)).copied()
    }

    /// Goto target for a nonterminal.
    #[must_use]
    pub fn goto(&self, state: StateId, nonterminal: SymbolId) -> Option<StateId> {
        match self.lookup_id(state, nonterminal) {
            Some(Action::Goto(target)) => Some(target),
            _ => None,
        }
    }

    /// Terminals with an action in `state`, in symbol order.
    #[must_use]
    pub fn expected(&self, state: StateId) -> Vec<SymbolId> {
        self.grammar
            .terminals()
            .filter(|t| self.actions.contains_key(&(state, *t)))
            .collect()
    }

    #[must_use]
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    #[must_use]
    pub fn graph(&self) -> &StateGraph {
        &self.graph
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.graph.state_count()
    }

    #[must_use]
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// Conflicts settled by the default policy rather than by precedence.
    pub fn unresolved_conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter().filter(|c| !c.by_precedence)
    }

    /// All actions, sorted by state and symbol.
    #[must_use]
    pub fn actions(&self) -> Vec<((StateId, SymbolId), Action)> {
        let mut out: Vec<_> = self.actions.iter().map(|(k, v)| (*k, *v)).collect();
        out.sort_by_key(|(k, _)| *k);
        out
    }
}
