//! LR items and item sets.

use crate::grammar::{Grammar, ProductionId, SymbolId, SymbolSet};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A production with a dot position: the core of an LR item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    pub production: ProductionId,
    pub dot: u32,
}

impl Item {
    #[must_use]
    pub const fn new(production: ProductionId, dot: u32) -> Self {
        Self { production, dot }
    }

    /// Symbol right after the dot, `None` for a final item.
    #[must_use]
    pub fn next_symbol(self, grammar: &Grammar) -> Option<SymbolId> {
        grammar
            .production(self.production)
            .right
            .get(self.dot as usize)
            .copied()
    }

    /// Symbols after the one following the dot.
    #[must_use]
    pub fn remaining(self, grammar: &Grammar) -> &[SymbolId] {
        let right = &grammar.production(self.production).right;
        right.get(self.dot as usize + 1..).unwrap_or(&[])
    }

    #[must_use]
    pub fn is_final(self, grammar: &Grammar) -> bool {
        self.dot as usize >= grammar.production(self.production).right.len()
    }

    #[must_use]
    pub const fn advance(self) -> Self {
        Self {
            production: self.production,
            dot: self.dot + 1,
        }
    }
}

/// A set of items with one lookahead set per item core.
///
/// Keyed by core, so two sets are automaton-equal exactly when their keys
/// match. LR(0) sets carry empty lookaheads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StateSet {
    items: BTreeMap<Item, SymbolSet>,
}

impl StateSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, merging the lookahead into an existing core.
    /// Returns true if anything changed.
    pub fn add(&mut self, item: Item, lookahead: &SymbolSet) -> bool {
        match self.items.get_mut(&item) {
            Some(existing) => {
                let before = existing.len();
                existing.extend(lookahead.iter().copied());
                existing.len() != before
            }
            None => {
                self.items.insert(item, lookahead.clone());
                true
            }
        }
    }

    #[must_use]
    pub fn lookahead(&self, item: Item) -> Option<&SymbolSet> {
        self.items.get(&item)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Item, &SymbolSet)> {
        self.items.iter().map(|(item, la)| (*item, la))
    }

    pub fn cores(&self) -> impl Iterator<Item = Item> + '_ {
        self.items.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Same items ignoring lookaheads.
    #[must_use]
    pub fn same_core(&self, other: &Self) -> bool {
        self.items.len() == other.items.len() && self.items.keys().eq(other.items.keys())
    }

    /// Pager's weak compatibility.
    ///
    /// The cores must be equal. Then for every pair of distinct items `i`, `j`
    /// the merge must not make a lookahead shared between `i` and `j` that was
    /// shared in neither state before: merging is refused when
    /// `self[i] ∩ other[j]` or `self[j] ∩ other[i]` is non-empty while both
    /// `self[i] ∩ self[j]` and `other[i] ∩ other[j]` are empty.
    #[must_use]
    pub fn weakly_compatible(&self, other: &Self) -> bool {
        if !self.same_core(other) {
            return false;
        }
        if self.items.len() == 1 {
            return true;
        }
        let left: Vec<&SymbolSet> = self.items.values().collect();
        let right: Vec<&SymbolSet> = other.items.values().collect();
        for i in 0..left.len() {
            for j in i + 1..left.len() {
                let crossed = !left[i].is_disjoint(right[j]) || !left[j].is_disjoint(right[i]);
                if crossed
                    && left[i].is_disjoint(left[j])
                    && right[i].is_disjoint(right[j])
                {
                    return false;
                }
            }
        }
        true
    }

    /// Union `other`'s lookaheads into this set. Cores must match.
    /// Returns true if any lookahead grew.
    pub fn merge(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (item, la) in &other.items {
            changed |= self.add(*item, la);
        }
        changed
    }

    /// Render items as `A ::= x • y {la}` lines.
    #[must_use]
    pub fn describe(&self, grammar: &Grammar) -> String {
        let mut out = String::new();
        for (item, la) in &self.items {
            let production = grammar.production(item.production);
            let _ = write!(out, "{} ::=", grammar.left_name(item.production));
            for (pos, sym) in production.right.iter().enumerate() {
                if pos == item.dot as usize {
                    out.push_str(" •");
                }
                let _ = write!(out, " {}", grammar.symbol(*sym));
            }
            if item.dot as usize >= production.right.len() {
                out.push_str(" •");
            }
            if !la.is_empty() {
                let names: Vec<String> = la.iter().map(|s| grammar.symbol(*s).to_string()).collect();
                let _ = write!(out, "  {{{}}}", names.join(", "));
            }
            out.push('\n');
        }
        out
    }
}

impl FromIterator<(Item, SymbolSet)> for StateSet {
    fn from_iter<I: IntoIterator<Item = (Item, SymbolSet)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (item, la) in iter {
            set.add(item, &la);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolId;

    fn la(ids: &[u32]) -> SymbolSet {
        ids.iter().map(|i| SymbolId(*i)).collect()
    }

    fn two_items(a: &[u32], b: &[u32]) -> StateSet {
        [(Item::new(1, 1), la(a)), (Item::new(2, 1), la(b))]
            .into_iter()
            .collect()
    }

    #[test]
    fn single_item_cores_are_always_compatible() {
        let x: StateSet = [(Item::new(1, 1), la(&[5]))].into_iter().collect();
        let y: StateSet = [(Item::new(1, 1), la(&[6]))].into_iter().collect();
        assert!(x.weakly_compatible(&y));
    }

    #[test]
    fn different_cores_are_incompatible() {
        let x = two_items(&[5], &[6]);
        let y: StateSet = [(Item::new(1, 1), la(&[5]))].into_iter().collect();
        assert!(!x.weakly_compatible(&y));
    }

    #[test]
    fn crossing_lookaheads_block_merge() {
        // {A: c, B: d} and {A: d, B: c} would give both items {c, d}.
        let x = two_items(&[5], &[6]);
        let y = two_items(&[6], &[5]);
        assert!(!x.weakly_compatible(&y));
    }

    #[test]
    fn crossing_is_fine_when_already_shared() {
        let x = two_items(&[5, 7], &[6, 7]);
        let y = two_items(&[6], &[5]);
        assert!(x.weakly_compatible(&y));
    }

    #[test]
    fn merge_reports_growth() {
        let mut x = two_items(&[5], &[6]);
        assert!(!x.merge(&two_items(&[5], &[6])));
        assert!(x.merge(&two_items(&[5, 8], &[6])));
        assert_eq!(x.lookahead(Item::new(1, 1)), Some(&la(&[5, 8])));
    }
}
