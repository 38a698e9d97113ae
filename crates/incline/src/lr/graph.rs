//! # Automaton Builder
//!
//! Builds the LR automaton of a grammar as a graph of item sets.
//!
//! ## Overview
//!
//! [`StateGraph::build`] runs a worklist over kernel item sets. For every
//! state it computes the successor kernels, then tries to merge each one into
//! an existing state that was reached over the same symbol and is weakly
//! compatible (Pager). A merge that grows a lookahead set re-enqueues the
//! target so the new lookaheads propagate. States are closed once at the end.
//!
//! - [`LrMode::Lr0`] carries no lookaheads, so every state with an equal core merges.
//! - [`LrMode::Lr1`] gives LR(1) precision at close to LALR size.
//! - [`LrMode::Lalr`] additionally runs [`StateGraph::convert_lalr`].

use super::item::{Item, StateSet};
use super::LrMode;
use crate::grammar::{Grammar, START_PRODUCTION, SymbolId, SymbolSet};
use hashbrown::HashMap;
use std::collections::BTreeMap;
use tracing::debug;

/// Index of an automaton state.
pub type StateId = usize;

/// Counters collected while building a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildStats {
    /// Successor kernels that became new states.
    pub created: usize,
    /// Successor kernels merged into an existing state.
    pub merged: usize,
    /// States processed again after a merge grew their lookaheads.
    pub requeued: usize,
    /// States removed by LALR core merging.
    pub lalr_merged: usize,
    /// States left unreachable after requeued states redirected their edges.
    pub pruned: usize,
}

/// The automaton: closed item sets and transition edges.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StateGraph {
    mode: LrMode,
    states: Vec<StateSet>,
    edges: Edges,
    fingerprint: u64,
    stats: BuildStats,
}

/// Close an item set: add `B ::= • γ` for every item with a nonterminal
/// `B` after the dot, until nothing changes.
///
/// For LR(1) modes the added item's lookahead is `FIRST(β · L)`, where `β`
/// follows `B` and `L` is the lookahead of the item that introduced it.
#[must_use]
pub fn closure(grammar: &Grammar, set: &StateSet, mode: LrMode) -> StateSet {
    let empty = SymbolSet::new();
    let mut result = set.clone();
    let mut work: Vec<Item> = result.cores().collect();
    while let Some(item) = work.pop() {
        let Some(next) = item.next_symbol(grammar) else {
            continue;
        };
        if !grammar.symbol(next).is_nonterminal() {
            continue;
        }
        let lookahead = match mode {
            LrMode::Lr0 => SymbolSet::new(),
            LrMode::Lr1 | LrMode::Lalr => grammar.first_with_lookahead(
                item.remaining(grammar),
                result.lookahead(item).unwrap_or(&empty),
            ),
        };
        for pid in grammar.alternatives(next) {
            let added = Item::new(*pid, 0);
            if result.add(added, &lookahead) {
                work.push(added);
            }
        }
    }
    result
}

/// Kernel of the successor over `symbol`: every item with `symbol` after the
/// dot, advanced by one, keeping its lookahead.
#[must_use]
pub fn goto_kernel(grammar: &Grammar, set: &StateSet, symbol: SymbolId) -> StateSet {
    set.iter()
        .filter(|(item, _)| item.next_symbol(grammar) == Some(symbol))
        .map(|(item, la)| (item.advance(), la.clone()))
        .collect()
}

/// `closure(goto_kernel(set, symbol))`.
#[must_use]
pub fn goto(grammar: &Grammar, set: &StateSet, symbol: SymbolId, mode: LrMode) -> StateSet {
    closure(grammar, &goto_kernel(grammar, set, symbol), mode)
}

type Edges = BTreeMap<(StateId, SymbolId), StateId>;

/// Drop the states no path from the start state reaches, renumbering the
/// rest in their original order. Returns the kept states, their edges and
/// how many states were dropped.
fn prune_unreachable(states: Vec<StateSet>, edges: Edges) -> (Vec<StateSet>, Edges, usize) {
    let mut reachable = vec![false; states.len()];
    reachable[0] = true;
    let mut work = vec![0];
    while let Some(id) = work.pop() {
        for (_, &to) in edges.range((id, SymbolId(0))..=(id, SymbolId(u32::MAX))) {
            if !reachable[to] {
                reachable[to] = true;
                work.push(to);
            }
        }
    }

    let before = states.len();
    let mut renumber = vec![None; before];
    let mut kept = Vec::with_capacity(before);
    for (id, state) in states.into_iter().enumerate() {
        if reachable[id] {
            renumber[id] = Some(kept.len());
            kept.push(state);
        }
    }
    let edges = edges
        .into_iter()
        .filter_map(|((from, symbol), to)| Some(((renumber[from]?, symbol), renumber[to]?)))
        .collect();
    let pruned = before - kept.len();
    (kept, edges, pruned)
}

impl StateGraph {
    /// The start kernel `{⟨start⟩ ::= • Start}` with lookahead `{Finish}`
    /// (empty for LR(0)).
    #[must_use]
    pub fn start_kernel(mode: LrMode) -> StateSet {
        let lookahead: SymbolSet = match mode {
            LrMode::Lr0 => SymbolSet::new(),
            LrMode::Lr1 | LrMode::Lalr => [Grammar::FINISH].into_iter().collect(),
        };
        [(Item::new(START_PRODUCTION, 0), lookahead)]
            .into_iter()
            .collect()
    }

    /// Build the automaton for `grammar`.
    #[must_use]
    pub fn build(grammar: &Grammar, mode: LrMode) -> Self {
        let mut states = vec![Self::start_kernel(mode)];
        let mut edges = BTreeMap::new();
        let mut done = vec![false];
        let mut todo = vec![0];
        let mut candidates: HashMap<SymbolId, Vec<StateId>, ahash::RandomState> =
            HashMap::default();
        let mut stats = BuildStats::default();

        while let Some(id) = todo.pop() {
            done[id] = true;
            let closed = closure(grammar, &states[id], mode);

            let mut successors: BTreeMap<SymbolId, StateSet> = BTreeMap::new();
            for (item, la) in closed.iter() {
                if let Some(symbol) = item.next_symbol(grammar) {
                    successors.entry(symbol).or_default().add(item.advance(), la);
                }
            }

            for (symbol, kernel) in successors {
                let slot = candidates.entry(symbol).or_default();
                let compatible = slot
                    .iter()
                    .copied()
                    .find(|c| states[*c].weakly_compatible(&kernel));
                let target = if let Some(target) = compatible {
                    stats.merged += 1;
                    if states[target].merge(&kernel) && done[target] {
                        done[target] = false;
                        todo.push(target);
                        stats.requeued += 1;
                    }
                    target
                } else {
                    let target = states.len();
                    states.push(kernel);
                    done.push(false);
                    todo.push(target);
                    slot.push(target);
                    stats.created += 1;
                    target
                };
                edges.insert((id, symbol), target);
            }
        }

        let (states, edges, pruned) = prune_unreachable(states, edges);
        stats.pruned = pruned;
        let states = states
            .iter()
            .map(|kernel| closure(grammar, kernel, mode))
            .collect();
        let mut graph = Self {
            mode,
            states,
            edges,
            fingerprint: grammar.fingerprint(),
            stats,
        };
        if mode == LrMode::Lalr {
            graph.convert_lalr();
        }
        debug!(
            mode = %mode,
            states = graph.states.len(),
            edges = graph.edges.len(),
            created = stats.created,
            merged = stats.merged,
            requeued = stats.requeued,
            lalr_merged = graph.stats.lalr_merged,
            pruned,
            "built LR automaton"
        );
        graph
    }

    /// Merge all states with equal cores, unioning their lookaheads, and
    /// repoint every edge at the surviving state.
    ///
    /// State ids are renumbered densely in order of first appearance, so the
    /// start state stays `0`.
    pub fn convert_lalr(&mut self) {
        let before = self.states.len();
        let mut merged: Vec<StateSet> = Vec::new();
        let mut by_core: HashMap<Vec<Item>, StateId, ahash::RandomState> = HashMap::default();
        let mut renumber = Vec::with_capacity(before);

        for state in self.states.drain(..) {
            let core: Vec<Item> = state.cores().collect();
            if let Some(&id) = by_core.get(&core) {
                merged[id].merge(&state);
                renumber.push(id);
            } else {
                let id = merged.len();
                by_core.insert(core, id);
                merged.push(state);
                renumber.push(id);
            }
        }

        self.edges = std::mem::take(&mut self.edges)
            .into_iter()
            .map(|((from, symbol), to)| ((renumber[from], symbol), renumber[to]))
            .collect();
        self.states = merged;
        self.stats.lalr_merged += before - self.states.len();
        if self.mode == LrMode::Lr1 {
            self.mode = LrMode::Lalr;
        }
    }

    /// Target of the edge `(state, symbol)`.
    #[inline]
    #[must_use]
    pub fn follow(&self, state: StateId, symbol: SymbolId) -> Option<StateId> {
        self.edges.get(&(state, symbol)).copied()
    }

    #[must_use]
    pub fn state(&self, id: StateId) -> &StateSet {
        &self.states[id]
    }

    #[must_use]
    pub fn states(&self) -> &[StateSet] {
        &self.states
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = ((StateId, SymbolId), StateId)> + '_ {
        self.edges.iter().map(|(k, v)| (*k, *v))
    }

    /// Outgoing edges of one state.
    pub fn edges_from(&self, state: StateId) -> impl Iterator<Item = (SymbolId, StateId)> + '_ {
        self.edges
            .range((state, SymbolId(0))..=(state, SymbolId(u32::MAX)))
            .map(|((_, symbol), to)| (*symbol, *to))
    }

    #[must_use]
    pub const fn mode(&self) -> LrMode {
        self.mode
    }

    #[must_use]
    pub const fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Fingerprint of the grammar this graph was built from.
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Alternative, GrammarBuilder, Symbol};

    fn nt(name: &str) -> Symbol {
        Symbol::nonterminal(name)
    }

    fn t(name: &str) -> Symbol {
        Symbol::terminal(name)
    }

    /// S ::= C C ; C ::= "c" C | "d"
    ///
    /// Canonical LR(1) needs 10 states for this grammar, LALR needs 7.
    fn cc_grammar() -> Grammar {
        GrammarBuilder::new()
            .rule("S", [vec![nt("C"), nt("C")]])
            .rule("C", [vec![t("c"), nt("C")], vec![t("d")]])
            .build()
            .unwrap()
    }

    #[test]
    fn closure_adds_alternatives_with_first_lookahead() {
        let g = cc_grammar();
        let closed = closure(&g, &StateGraph::start_kernel(LrMode::Lr1), LrMode::Lr1);
        // <start> ::= • S, S ::= • C C, C ::= • c C, C ::= • d
        assert_eq!(closed.len(), 4);
        let c = g.symbol_id(&t("c")).unwrap();
        let d = g.symbol_id(&t("d")).unwrap();
        let la = closed.lookahead(Item::new(3, 0)).unwrap();
        assert!(la.contains(&c) && la.contains(&d));
        assert!(!la.contains(&Grammar::FINISH));
    }

    #[test]
    fn goto_advances_and_closes() {
        let g = cc_grammar();
        let start = closure(&g, &StateGraph::start_kernel(LrMode::Lr1), LrMode::Lr1);
        let c = g.symbol_id(&t("c")).unwrap();
        let next = goto(&g, &start, c, LrMode::Lr1);
        assert!(next.lookahead(Item::new(2, 1)).is_some());
        assert!(next.lookahead(Item::new(2, 0)).is_some());
        assert!(next.lookahead(Item::new(3, 0)).is_some());
    }

    #[test]
    fn pager_merges_cc_grammar_to_lalr_size() {
        let g = cc_grammar();
        let lr1 = StateGraph::build(&g, LrMode::Lr1);
        let lalr = StateGraph::build(&g, LrMode::Lalr);
        let lr0 = StateGraph::build(&g, LrMode::Lr0);
        assert_eq!(lalr.state_count(), 7);
        assert_eq!(lr0.state_count(), 7);
        // No conflicts in this grammar, so weak compatibility merges like LALR.
        assert_eq!(lr1.state_count(), 7);
    }

    #[test]
    fn weak_compatibility_keeps_lr1_only_grammar_apart() {
        // S ::= "a" A "d" | "b" B "d" | "a" B "e" | "b" A "e"
        // A ::= "c" ; B ::= "c"
        // LALR merges the two states after "c" and gets a reduce/reduce
        // conflict; Pager keeps them separate.
        let g = GrammarBuilder::new()
            .rule(
                "S",
                [
                    vec![t("a"), nt("A"), t("d")],
                    vec![t("b"), nt("B"), t("d")],
                    vec![t("a"), nt("B"), t("e")],
                    vec![t("b"), nt("A"), t("e")],
                ],
            )
            .rule("A", [vec![t("c")]])
            .rule("B", [vec![t("c")]])
            .build()
            .unwrap();
        let lr1 = StateGraph::build(&g, LrMode::Lr1);
        let lalr = StateGraph::build(&g, LrMode::Lalr);
        assert_eq!(lr1.state_count(), lalr.state_count() + 1);
    }

    #[test]
    fn edges_point_at_existing_states() {
        let g = GrammarBuilder::new()
            .rule("S", [vec![t("b"), nt("A"), t("d")]])
            .rule("A", [Alternative::new(vec![t("c")]), Alternative::epsilon()])
            .build()
            .unwrap();
        for mode in [LrMode::Lr0, LrMode::Lr1, LrMode::Lalr] {
            let graph = StateGraph::build(&g, mode);
            for ((from, _), to) in graph.edges() {
                assert!(from < graph.state_count());
                assert!(to < graph.state_count());
            }
            let b = g.symbol_id(&t("b")).unwrap();
            assert!(graph.follow(0, b).is_some());
            assert_eq!(graph.edges_from(0).count(), 2);
        }
    }

    #[test]
    fn orphaned_states_are_pruned_and_renumbered() {
        let states = vec![StateSet::default(); 4];
        let edges: Edges = [((0, SymbolId(1)), 2), ((1, SymbolId(1)), 3), ((2, SymbolId(2)), 0)]
            .into_iter()
            .collect();
        let (kept, edges, pruned) = prune_unreachable(states, edges);
        assert_eq!(kept.len(), 2);
        assert_eq!(pruned, 2);
        let edges: Vec<_> = edges.into_iter().collect();
        assert_eq!(edges, vec![((0, SymbolId(1)), 1), ((1, SymbolId(2)), 0)]);
    }
}
