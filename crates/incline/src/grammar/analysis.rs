//! # Grammar Analysis
//!
//! FIRST, FOLLOW and nullability, plus a few size metrics.
//!
//! All sets are computed by fixed-point iteration. Every step is a monotone
//! union over the finite vocabulary, so the iteration terminates for any
//! grammar, including left- and right-recursive ones.

use super::{Grammar, Production, ProductionId, Symbol, SymbolId, SymbolSet};

/// Precomputed FIRST/FOLLOW sets, indexed by symbol id.
///
/// FIRST sets contain [`Grammar::EPSILON`] when the symbol is nullable.
#[derive(Debug, Clone, Default)]
pub(crate) struct FirstFollow {
    first: Vec<SymbolSet>,
    follow: Vec<SymbolSet>,
    nullable: Vec<bool>,
}

impl FirstFollow {
    pub(crate) fn compute(
        symbols: &[Symbol],
        productions: &[Production],
        rules: &[Vec<ProductionId>],
        start: SymbolId,
    ) -> Self {
        let n = symbols.len();
        let mut nullable = vec![false; n];
        nullable[Grammar::EPSILON.index()] = true;

        let mut changed = true;
        while changed {
            changed = false;
            for p in productions.iter().skip(1) {
                let Some(left) = p.left else { continue };
                if !nullable[left.index()] && p.right.iter().all(|s| nullable[s.index()]) {
                    nullable[left.index()] = true;
                    changed = true;
                }
            }
        }

        let mut first: Vec<SymbolSet> = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut set = SymbolSet::new();
                if s.is_terminal() {
                    set.insert(SymbolId(i as u32));
                }
                set
            })
            .collect();
        for (i, is_nullable) in nullable.iter().enumerate() {
            if *is_nullable {
                first[i].insert(Grammar::EPSILON);
            }
        }

        changed = true;
        while changed {
            changed = false;
            for p in productions.iter().skip(1) {
                let Some(left) = p.left else { continue };
                for sym in &p.right {
                    if *sym != left {
                        let add: Vec<SymbolId> = first[sym.index()]
                            .iter()
                            .copied()
                            .filter(|s| *s != Grammar::EPSILON)
                            .collect();
                        for s in add {
                            changed |= first[left.index()].insert(s);
                        }
                    }
                    if !nullable[sym.index()] {
                        break;
                    }
                }
            }
        }

        let mut follow = vec![SymbolSet::new(); n];
        follow[start.index()].insert(Grammar::FINISH);
        changed = true;
        while changed {
            changed = false;
            for p in productions.iter().skip(1) {
                let Some(left) = p.left else { continue };
                for (i, sym) in p.right.iter().enumerate() {
                    if rules[sym.index()].is_empty() {
                        continue;
                    }
                    let mut rest_nullable = true;
                    let mut add = SymbolSet::new();
                    for next in &p.right[i + 1..] {
                        add.extend(
                            first[next.index()]
                                .iter()
                                .filter(|s| **s != Grammar::EPSILON),
                        );
                        if !nullable[next.index()] {
                            rest_nullable = false;
                            break;
                        }
                    }
                    if rest_nullable {
                        add.extend(follow[left.index()].iter().copied());
                    }
                    let target = &mut follow[sym.index()];
                    for s in add {
                        changed |= target.insert(s);
                    }
                }
            }
        }

        Self {
            first,
            follow,
            nullable,
        }
    }
}

impl Grammar {
    /// FIRST set of a single symbol; contains [`Grammar::EPSILON`] if nullable.
    #[must_use]
    pub fn first(&self, symbol: SymbolId) -> &SymbolSet {
        &self.sets.first[symbol.index()]
    }

    /// FOLLOW set of a nonterminal.
    #[must_use]
    pub fn follow(&self, symbol: SymbolId) -> &SymbolSet {
        &self.sets.follow[symbol.index()]
    }

    #[must_use]
    pub fn nullable(&self, symbol: SymbolId) -> bool {
        self.sets.nullable[symbol.index()]
    }

    /// FIRST of a symbol sequence; contains [`Grammar::EPSILON`] if the
    /// whole sequence is nullable.
    #[must_use]
    pub fn first_of_sequence(&self, sequence: &[SymbolId]) -> SymbolSet {
        let mut out = SymbolSet::new();
        for sym in sequence {
            out.extend(
                self.first(*sym)
                    .iter()
                    .filter(|s| **s != Self::EPSILON),
            );
            if !self.nullable(*sym) {
                return out;
            }
        }
        out.insert(Self::EPSILON);
        out
    }

    /// `FIRST(sequence · lookahead)` for a lookahead set of terminals.
    ///
    /// The result never contains epsilon.
    #[must_use]
    pub fn first_with_lookahead(&self, sequence: &[SymbolId], lookahead: &SymbolSet) -> SymbolSet {
        let mut out = self.first_of_sequence(sequence);
        if out.remove(&Self::EPSILON) {
            out.extend(lookahead.iter().copied());
        }
        out
    }
}

/// Metrics about a grammar's size and shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarMetrics {
    pub production_count: usize,
    pub nonterminal_count: usize,
    pub terminal_count: usize,
    pub nullable_count: usize,
    pub left_recursive_count: usize,
}

impl GrammarMetrics {
    #[must_use]
    pub fn compute(grammar: &Grammar) -> Self {
        let nonterminals: Vec<SymbolId> = grammar.nonterminals().collect();
        let left_recursive_count = nonterminals
            .iter()
            .filter(|nt| {
                grammar.alternatives(**nt).iter().any(|pid| {
                    grammar.production(*pid).right.first().copied() == Some(**nt)
                })
            })
            .count();

        Self {
            production_count: grammar.productions().len() - 1,
            nonterminal_count: nonterminals.len(),
            terminal_count: grammar.terminals().count(),
            nullable_count: nonterminals.iter().filter(|nt| grammar.nullable(**nt)).count(),
            left_recursive_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Alternative, GrammarBuilder};

    fn ids(g: &Grammar, names: &[Symbol]) -> SymbolSet {
        names.iter().map(|s| g.symbol_id(s).unwrap()).collect()
    }

    fn nullable_grammar() -> Grammar {
        // S ::= "b" A "d"
        // A ::= "c" | ε
        GrammarBuilder::new()
            .rule(
                "S",
                [vec![
                    Symbol::terminal("b"),
                    Symbol::nonterminal("A"),
                    Symbol::terminal("d"),
                ]],
            )
            .rule(
                "A",
                [Alternative::new(vec![Symbol::terminal("c")]), Alternative::epsilon()],
            )
            .build()
            .unwrap()
    }

    #[test]
    fn first_of_nullable_nonterminal_contains_epsilon() {
        let g = nullable_grammar();
        let a = g.symbol_id(&Symbol::nonterminal("A")).unwrap();
        assert!(g.nullable(a));
        let mut expected = ids(&g, &[Symbol::terminal("c")]);
        expected.insert(Grammar::EPSILON);
        assert_eq!(g.first(a), &expected);
    }

    #[test]
    fn follow_propagates_through_nullable_suffix() {
        let g = nullable_grammar();
        let a = g.symbol_id(&Symbol::nonterminal("A")).unwrap();
        assert_eq!(g.follow(a), &ids(&g, &[Symbol::terminal("d")]));
        assert!(g.follow(g.start()).contains(&Grammar::FINISH));
    }

    #[test]
    fn first_with_lookahead_appends_lookahead_only_when_nullable() {
        let g = nullable_grammar();
        let a = g.symbol_id(&Symbol::nonterminal("A")).unwrap();
        let d = g.symbol_id(&Symbol::terminal("d")).unwrap();
        let la: SymbolSet = [Grammar::FINISH].into_iter().collect();

        let through = g.first_with_lookahead(&[a], &la);
        assert!(through.contains(&Grammar::FINISH));
        assert!(!through.contains(&Grammar::EPSILON));

        let blocked = g.first_with_lookahead(&[a, d], &la);
        assert!(!blocked.contains(&Grammar::FINISH));
        assert!(blocked.contains(&d));
    }

    #[test]
    fn left_recursion_terminates() {
        let g = GrammarBuilder::new()
            .rule(
                "E",
                [
                    vec![
                        Symbol::nonterminal("E"),
                        Symbol::terminal("+"),
                        Symbol::nonterminal("E"),
                    ],
                    vec![Symbol::terminal("a")],
                ],
            )
            .build()
            .unwrap();
        let metrics = GrammarMetrics::compute(&g);
        assert_eq!(metrics.left_recursive_count, 1);
        assert_eq!(metrics.nullable_count, 0);
        let plus = g.symbol_id(&Symbol::terminal("+")).unwrap();
        assert!(g.follow(g.start()).contains(&plus));
    }
}
