//! The incremental LR parser.

use super::stack::{Frame, ParseStack};
use super::{ParseMetrics, ParseStatus};
use crate::arena::{NodeId, TreeArena};
use crate::error::{InvariantViolation, SyntaxError};
use crate::grammar::{AnyMode, GrammarSource, ProductionId, Symbol};
use crate::lr::{self, Action, ParserConfig, StateId, SyntaxTable};
use crate::syntax::{Document, ast};
use compact_str::CompactString;
use hashbrown::HashSet;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, trace};

/// Previous value of one attribute changed during an attempt.
#[derive(Debug, Clone, Copy)]
enum Undo {
    Parent(NodeId, Option<NodeId>),
    Left(NodeId, Option<NodeId>),
    Right(NodeId, Option<NodeId>),
    Changed(NodeId, bool),
    State(NodeId, StateId),
}

/// How one attempt ended.
enum Outcome {
    Accepted,
    Rejected {
        node: NodeId,
        state: StateId,
        /// Whether a failed validation broke reused subtrees down.
        broke_down: bool,
    },
}

/// What the dispatcher does next.
enum Step {
    Continue(NodeId),
    Accept,
    Reject(NodeId),
}

/// Incremental parser for one document.
///
/// Reuses unchanged subtrees of the previous parse by shifting them whole
/// and only descends into nodes on a changed path. A rejected attempt
/// leaves the tree exactly as it was.
#[derive(Debug)]
pub struct IncParser {
    table: Arc<SyntaxTable>,
    config: ParserConfig,
    pass_through: HashSet<CompactString, ahash::RandomState>,
    last_status: bool,
    error_node: Option<NodeId>,
    last_error: Option<SyntaxError>,
    metrics: ParseMetrics,
}

impl IncParser {
    #[must_use]
    pub fn new(table: Arc<SyntaxTable>, config: ParserConfig) -> Self {
        let pass_through = config.pass_through.iter().cloned().collect();
        Self {
            table,
            config,
            pass_through,
            last_status: false,
            error_node: None,
            last_error: None,
            metrics: ParseMetrics::default(),
        }
    }

    /// Parser for a grammar source. Builds (or reuses) the syntax table for
    /// `config.mode` and adds the grammar's `passthrough` option to the
    /// configured pass-through terminals.
    #[must_use]
    pub fn for_source(source: &GrammarSource, config: ParserConfig) -> Self {
        let table = lr::build(&Arc::new(source.grammar.clone()), config.mode);
        let config = config.with_pass_through(source.options.pass_through.iter().cloned());
        Self::new(table, config)
    }

    #[must_use]
    pub fn table(&self) -> &Arc<SyntaxTable> {
        &self.table
    }

    #[must_use]
    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Whether the last parse accepted the document.
    #[must_use]
    pub const fn last_status(&self) -> bool {
        self.last_status
    }

    /// Lookahead node the last rejected parse stopped at.
    #[must_use]
    pub const fn error_node(&self) -> Option<NodeId> {
        self.error_node
    }

    #[must_use]
    pub const fn last_error(&self) -> Option<&SyntaxError> {
        self.last_error.as_ref()
    }

    /// Counters of the last parse.
    #[must_use]
    pub const fn metrics(&self) -> &ParseMetrics {
        &self.metrics
    }

    /// Terminals with an action in `state`.
    #[must_use]
    pub fn expected_symbols(&self, state: StateId) -> Vec<Symbol> {
        let grammar = self.table.grammar();
        self.table
            .expected(state)
            .into_iter()
            .map(|id| grammar.symbol(id).clone())
            .collect()
    }

    /// Parse `doc` against its previous tree.
    ///
    /// With `reparse` every nonterminal is broken down instead of reused.
    /// On acceptance the root's children become `[bos, ..., eos]`. On
    /// rejection the tree is unchanged and [`IncParser::error_node`] names
    /// the offending lookahead.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation`] if the table and tree disagree in a
    /// way no input can cause, such as a missing goto after a reduce.
    pub fn inc_parse(
        &mut self,
        arena: &mut TreeArena,
        doc: &Document,
        reparse: bool,
    ) -> Result<ParseStatus, InvariantViolation> {
        self.metrics = ParseMetrics::default();
        let reparse = reparse || self.config.reparse;

        let mut outcome = self.attempt(arena, doc, reparse)?;
        if let Outcome::Rejected { broke_down: true, .. } = outcome
            && self.config.exact_errors
        {
            debug!("rejected after a failed validation, reparsing in full");
            outcome = self.attempt(arena, doc, true)?;
        }

        match outcome {
            Outcome::Accepted => {
                self.last_status = true;
                self.error_node = None;
                self.last_error = None;
                debug!(metrics = ?self.metrics, "accepted");
                Ok(ParseStatus::Accepted)
            }
            Outcome::Rejected { node, state, .. } => {
                self.last_status = false;
                self.error_node = Some(node);
                let error = self.syntax_error(arena, doc, node, state);
                debug!(%error, metrics = ?self.metrics, "rejected");
                self.last_error = Some(error);
                Ok(ParseStatus::Error(node))
            }
        }
    }

    fn attempt(
        &mut self,
        arena: &mut TreeArena,
        doc: &Document,
        reparse: bool,
    ) -> Result<Outcome, InvariantViolation> {
        self.metrics.attempts += 1;
        let allocated = arena.len();
        let mut run = Run {
            arena,
            table: &self.table,
            pass_through: &self.pass_through,
            doc,
            stack: ParseStack::new(),
            undo: Vec::new(),
            validating: false,
            reparse,
            broke_down: false,
            metrics: &mut self.metrics,
        };
        let outcome = run.drive();
        if !matches!(outcome, Ok(Outcome::Accepted)) {
            run.rollback();
            arena.truncate(allocated);
        }
        outcome
    }

    fn syntax_error(&self, arena: &TreeArena, doc: &Document, node: NodeId, state: StateId) -> SyntaxError {
        let mut start = 0;
        for terminal in arena.terminals(doc.bos()) {
            if terminal == node {
                break;
            }
            start += arena.text(terminal).len();
        }
        SyntaxError {
            node,
            found: arena[node].lookup_symbol(),
            expected: self.expected_symbols(state),
            span: start..start + arena.text(node).len(),
        }
    }
}

/// State of one parse attempt.
struct Run<'a> {
    arena: &'a mut TreeArena,
    table: &'a SyntaxTable,
    pass_through: &'a HashSet<CompactString, ahash::RandomState>,
    doc: &'a Document,
    stack: ParseStack,
    undo: Vec<Undo>,
    validating: bool,
    reparse: bool,
    broke_down: bool,
    metrics: &'a mut ParseMetrics,
}

impl Run<'_> {
    fn drive(&mut self) -> Result<Outcome, InvariantViolation> {
        let root = self.doc.root();
        let mut la = self
            .arena
            .pop_lookahead(self.doc.bos())
            .ok_or(InvariantViolation::MalformedRoot { node: root })?;

        let mut steps = 0;
        loop {
            steps += 1;
            self.metrics.steps += 1;
            if steps > 16 * self.arena.len() + 1024 {
                return Err(InvariantViolation::NoProgress { steps });
            }
            trace!(state = self.stack.state(), lookahead = %la, symbol = %self.arena[la].symbol(), "step");

            let step = if self.arena[la].symbol().is_nonterminal() {
                Step::Continue(self.nonterminal(la)?)
            } else {
                self.terminal(la)?
            };
            match step {
                Step::Continue(next) => la = next,
                Step::Accept => return Ok(Outcome::Accepted),
                Step::Reject(node) => {
                    return Ok(Outcome::Rejected {
                        node,
                        state: self.stack.state(),
                        broke_down: self.broke_down,
                    });
                }
            }
        }
    }

    fn terminal(&mut self, la: NodeId) -> Result<Step, InvariantViolation> {
        let state = self.stack.state();
        let lookup = self.arena[la].lookup_symbol();
        match self.table.lookup(state, &lookup) {
            Some(Action::Accept) => {
                self.accept();
                Ok(Step::Accept)
            }
            Some(Action::Shift(next)) => {
                self.clear_changed(la);
                self.push_node(la, next);
                self.validating = false;
                self.metrics.shifts += 1;
                Ok(Step::Continue(self.next(la)?))
            }
            Some(Action::Reduce(production)) => {
                self.reduce(production)?;
                Ok(Step::Continue(la))
            }
            Some(Action::Goto(_)) | None => self.no_action(la, state),
        }
    }

    fn no_action(&mut self, la: NodeId, state: StateId) -> Result<Step, InvariantViolation> {
        if self.validating {
            self.validating = false;
            self.broke_down = true;
            self.metrics.right_breakdowns += 1;
            return Ok(if self.right_breakdown() {
                Step::Continue(la)
            } else {
                Step::Reject(la)
            });
        }
        if self.is_pass_through(la) {
            self.clear_changed(la);
            self.set_state(la, state);
            self.stack.push(Frame::PassThrough { node: la, state });
            self.metrics.pass_through += 1;
            return Ok(Step::Continue(self.next(la)?));
        }
        for mode in [AnyMode::Multiline, AnyMode::SingleLine] {
            match self.table.lookup(state, &Symbol::Any(mode)) {
                Some(Action::Shift(target)) => return Ok(Step::Continue(self.any_span(la, target, mode)?)),
                Some(Action::Reduce(production)) => {
                    self.reduce(production)?;
                    return Ok(Step::Continue(la));
                }
                _ => {}
            }
        }
        Ok(Step::Reject(la))
    }

    fn nonterminal(&mut self, la: NodeId) -> Result<NodeId, InvariantViolation> {
        if self.reparse || self.arena[la].is_changed() {
            self.clear_changed(la);
            return self.left_breakdown(la);
        }

        let state = self.stack.state();
        let symbol = self.arena[la].symbol().clone();
        if let Some(Action::Goto(next)) = self.table.lookup(state, &symbol) {
            self.push_node(la, next);
            self.validating = true;
            self.metrics.optimistic_shifts += 1;
            return self.next(la);
        }

        if let Some(first) = self.arena.find_first_terminal(la) {
            let lookup = self.arena[first].lookup_symbol();
            if let Some(Action::Reduce(production)) = self.table.lookup(state, &lookup) {
                self.reduce(production)?;
                return Ok(la);
            }
        }
        self.left_breakdown(la)
    }

    /// Descend into the first child, or move past a childless node.
    fn left_breakdown(&mut self, la: NodeId) -> Result<NodeId, InvariantViolation> {
        self.metrics.left_breakdowns += 1;
        match self.arena[la].children().first() {
            Some(child) => Ok(*child),
            None => self.next(la),
        }
    }

    /// Undo an optimistic shift: break the top of the stack down to its
    /// rightmost terminal, reshifting every piece from the state below it.
    fn right_breakdown(&mut self) -> bool {
        loop {
            let Some(frame) = self.stack.pop() else {
                return false;
            };
            match frame {
                Frame::Node { node, .. } if self.arena[node].symbol().is_nonterminal() => {
                    let children = self.arena[node].children().to_vec();
                    for child in children {
                        if !self.reshift(child) {
                            return false;
                        }
                    }
                }
                Frame::Node { node, .. } => return self.reshift(node),
                Frame::PassThrough { node, .. } => {
                    let state = self.stack.state();
                    self.set_state(node, state);
                    self.stack.push(Frame::PassThrough { node, state });
                    return true;
                }
                Frame::AnySpan { nodes, .. } => {
                    let state = self.stack.state();
                    let target = [AnyMode::Multiline, AnyMode::SingleLine]
                        .into_iter()
                        .find_map(|mode| match self.table.lookup(state, &Symbol::Any(mode)) {
                            Some(Action::Shift(target)) => Some(target),
                            _ => None,
                        });
                    let Some(target) = target else {
                        return false;
                    };
                    self.stack.push(Frame::AnySpan { nodes, state: target });
                    return true;
                }
                Frame::Bottom => return false,
            }
        }
    }

    /// Push a node of a broken-down subtree in the state the table gives it.
    fn reshift(&mut self, node: NodeId) -> bool {
        let state = self.stack.state();
        let symbol = self.arena[node].lookup_symbol();
        match self.table.lookup(state, &symbol) {
            Some(Action::Shift(next) | Action::Goto(next)) => {
                self.push_node(node, next);
                true
            }
            _ if self.is_pass_through(node) => {
                self.set_state(node, state);
                self.stack.push(Frame::PassThrough { node, state });
                true
            }
            _ => false,
        }
    }

    /// Consume lookaheads into one wildcard span until one has an action in
    /// `target`, the input ends, or (single-line) a line break is reached.
    fn any_span(&mut self, la: NodeId, target: StateId, mode: AnyMode) -> Result<NodeId, InvariantViolation> {
        let mut nodes: SmallVec<[NodeId; 4]> = SmallVec::new();
        let mut current = la;
        loop {
            let node = &self.arena[current];
            if node.symbol().is_nonterminal() {
                self.clear_changed(current);
                current = self.left_breakdown(current)?;
                continue;
            }
            if matches!(node.symbol(), Symbol::Finish)
                || (mode == AnyMode::SingleLine && node.text().contains('\n'))
                || self.table.lookup(target, &node.lookup_symbol()).is_some()
            {
                break;
            }
            self.clear_changed(current);
            self.set_state(current, target);
            nodes.push(current);
            current = self.next(current)?;
        }
        trace!(consumed = nodes.len(), target, "wildcard span");
        self.metrics.any_spans += 1;
        self.stack.push(Frame::AnySpan { nodes, state: target });
        Ok(current)
    }

    fn reduce(&mut self, production: ProductionId) -> Result<(), InvariantViolation> {
        let table = self.table;
        let grammar = table.grammar();
        let rule = grammar.production(production);
        let children = self
            .stack
            .pop_symbols(rule.len())
            .ok_or_else(|| InvariantViolation::StackUnderflow {
                production: grammar.display_production(production),
            })?;
        let state = self.stack.state();
        let left = rule.left.ok_or_else(|| InvariantViolation::StackUnderflow {
            production: grammar.display_production(production),
        })?;
        let symbol = grammar.symbol(left).clone();
        let next = table
            .goto(state, left)
            .ok_or_else(|| InvariantViolation::MissingGoto {
                state,
                symbol: symbol.clone(),
            })?;

        for &child in &children {
            let node = &self.arena[child];
            self.undo.push(Undo::Parent(child, node.parent()));
            self.undo.push(Undo::Left(child, node.left()));
            self.undo.push(Undo::Right(child, node.right()));
        }
        trace!(production = %grammar.display_production(production), children = children.len(), next, "reduce");
        let node = self.arena.alloc_node(symbol, children);
        self.arena.set_state(node, next);
        if let Some(annotation) = &rule.annotation {
            let alternate = ast::evaluate(annotation, &*self.arena, node);
            self.arena.set_alternate(node, alternate);
        }
        self.stack.push(Frame::Node { node, state: next });
        self.metrics.reductions += 1;
        Ok(())
    }

    /// Splice the parsed content between the document's boundaries.
    fn accept(&mut self) {
        let root = self.doc.root();
        let mut children = Vec::with_capacity(self.stack.len() + 2);
        children.push(self.doc.bos());
        children.extend(self.stack.nodes());
        children.push(self.doc.eos());
        self.arena.set_children(root, children);
        self.arena.set_changed(root, false);
    }

    fn push_node(&mut self, node: NodeId, state: StateId) {
        self.set_state(node, state);
        self.stack.push(Frame::Node { node, state });
    }

    fn set_state(&mut self, node: NodeId, state: StateId) {
        self.undo.push(Undo::State(node, self.arena[node].state()));
        self.arena.set_state(node, state);
    }

    fn clear_changed(&mut self, node: NodeId) {
        if self.arena[node].is_changed() {
            self.undo.push(Undo::Changed(node, true));
            self.arena.set_changed(node, false);
        }
    }

    fn is_pass_through(&self, node: NodeId) -> bool {
        let node = &self.arena[node];
        node.symbol().is_epsilon() || self.pass_through.contains(node.lookup_symbol().name())
    }

    fn next(&self, node: NodeId) -> Result<NodeId, InvariantViolation> {
        self.arena.pop_lookahead(node).ok_or(InvariantViolation::MalformedRoot {
            node: self.doc.root(),
        })
    }

    /// Restore every attribute changed during the attempt, newest first.
    /// Nodes the attempt allocated are dropped by the caller.
    fn rollback(&mut self) {
        let undone = self.undo.len();
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::Parent(node, value) => self.arena.set_parent(node, value),
                Undo::Left(node, value) => self.arena.set_left(node, value),
                Undo::Right(node, value) => self.arena.set_right(node, value),
                Undo::Changed(node, value) => self.arena.set_changed(node, value),
                Undo::State(node, value) => self.arena.set_state(node, value),
            }
        }
        trace!(undone, "rolled back");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Token;
    use crate::syntax::render;

    fn parser(grammar: &str, config: ParserConfig) -> IncParser {
        IncParser::for_source(&GrammarSource::parse(grammar).unwrap(), config)
    }

    fn document(arena: &mut TreeArena, tokens: &[(Option<&str>, &str)]) -> Document {
        let mut offset = 0;
        let tokens: Vec<Token> = tokens
            .iter()
            .map(|(class, text)| {
                let token = Token::new(*class, *text, offset..offset + text.len());
                offset += text.len();
                token
            })
            .collect();
        Document::from_tokens(arena, &tokens)
    }

    fn literals<'a>(texts: &[&'a str]) -> Vec<(Option<&'a str>, &'a str)> {
        texts.iter().map(|t| (None, *t)).collect()
    }

    const SUM: &str = "E ::= E \"+\" \"a\" | \"a\"";

    #[test]
    fn accepts_and_builds_the_tree() {
        let mut arena = TreeArena::new();
        let doc = document(&mut arena, &literals(&["a", "+", "a"]));
        let mut parser = parser(SUM, ParserConfig::default());

        assert_eq!(parser.inc_parse(&mut arena, &doc, false).unwrap(), ParseStatus::Accepted);
        assert!(parser.last_status());
        let children = arena[doc.root()].children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0], doc.bos());
        assert_eq!(children[2], doc.eos());
        assert_eq!(arena[children[1]].symbol(), &Symbol::nonterminal("E"));
        assert_eq!(doc.text(&arena), "a+a");
        assert!(!arena[doc.root()].is_changed());
    }

    #[test]
    fn unchanged_tree_is_shifted_whole() {
        let mut arena = TreeArena::new();
        let doc = document(&mut arena, &literals(&["a", "+", "a"]));
        let mut parser = parser(SUM, ParserConfig::default());
        parser.inc_parse(&mut arena, &doc, false).unwrap();
        let before = render(&arena, doc.root());

        assert!(parser.inc_parse(&mut arena, &doc, false).unwrap().is_accepted());
        assert_eq!(parser.metrics().optimistic_shifts, 1);
        assert_eq!(parser.metrics().reductions, 0);
        assert_eq!(render(&arena, doc.root()), before);
    }

    #[test]
    fn edit_reuses_the_unchanged_prefix() {
        let mut arena = TreeArena::new();
        let mut doc = document(&mut arena, &literals(&["a", "+", "a"]));
        let mut parser = parser(SUM, ParserConfig::default());
        parser.inc_parse(&mut arena, &doc, false).unwrap();

        let last = doc.tokens(&arena)[2];
        let plus = doc.insert_token_after(&mut arena, last, &Token::new(None, "+", 3..4)).unwrap();
        doc.insert_token_after(&mut arena, plus, &Token::new(None, "a", 4..5)).unwrap();

        assert!(parser.inc_parse(&mut arena, &doc, false).unwrap().is_accepted());
        assert_eq!(doc.text(&arena), "a+a+a");
        assert!(parser.metrics().optimistic_shifts >= 1);
        assert_eq!(parser.metrics().attempts, 1);
    }

    #[test]
    fn rejection_names_the_lookahead_and_leaves_the_tree_alone() {
        let mut arena = TreeArena::new();
        let mut doc = document(&mut arena, &literals(&["a", "+", "a"]));
        let mut parser = parser(SUM, ParserConfig::default());
        parser.inc_parse(&mut arena, &doc, false).unwrap();

        let last = doc.tokens(&arena)[2];
        doc.insert_token_after(&mut arena, last, &Token::new(None, "+", 3..4)).unwrap();
        let before = arena.snapshot(doc.root());

        let status = parser.inc_parse(&mut arena, &doc, false).unwrap();
        assert_eq!(status, ParseStatus::Error(doc.eos()));
        assert_eq!(parser.error_node(), Some(doc.eos()));
        assert_eq!(parser.metrics().attempts, 1);
        assert_eq!(arena.snapshot(doc.root()), before);
        assert!(arena[doc.root()].is_changed());

        let error = parser.last_error().unwrap();
        assert_eq!(error.found, Symbol::Finish);
        assert_eq!(error.span, 4..4);
        assert!(error.expected.contains(&Symbol::terminal("a")));
    }

    #[test]
    fn failed_validation_is_retried_in_full() {
        let grammar = "S ::= A \"x\" | B \"y\"\nA ::= \"a\"\nB ::= \"a\"";
        for (exact, attempts) in [(true, 2), (false, 1)] {
            let mut arena = TreeArena::new();
            let mut doc = document(&mut arena, &literals(&["a", "x"]));
            let mut parser = parser(grammar, ParserConfig::default().with_exact_errors(exact));
            parser.inc_parse(&mut arena, &doc, false).unwrap();

            let x = doc.tokens(&arena)[1];
            doc.replace_token(&mut arena, x, None, "z");
            let nodes = arena.len();
            assert_eq!(parser.inc_parse(&mut arena, &doc, false).unwrap(), ParseStatus::Error(x));
            assert_eq!(parser.metrics().attempts, attempts);
            assert_eq!(parser.metrics().right_breakdowns, 1);
            assert_eq!(arena.len(), nodes);
        }
    }

    #[test]
    fn rejected_attempts_free_the_nodes_they_built() {
        let mut arena = TreeArena::new();
        let mut doc = document(&mut arena, &literals(&["a", "+", "a"]));
        let mut parser = parser(SUM, ParserConfig::default());
        parser.inc_parse(&mut arena, &doc, false).unwrap();
        let last = doc.tokens(&arena)[2];
        doc.insert_token_after(&mut arena, last, &Token::new(None, "+", 3..4)).unwrap();
        doc.commit(&mut arena);
        let nodes = arena.len();

        for _ in 0..5 {
            assert!(!parser.inc_parse(&mut arena, &doc, true).unwrap().is_accepted());
            assert!(parser.metrics().reductions > 0);
            assert_eq!(arena.len(), nodes);
        }
        assert_eq!(arena.commit(), 2);
    }

    #[test]
    fn failed_validation_breaks_down_from_the_right() {
        let grammar = "S ::= A \"x\" | B \"y\"\nA ::= \"a\"\nB ::= \"a\"";
        let mut arena = TreeArena::new();
        let mut doc = document(&mut arena, &literals(&["a", "x"]));
        let mut parser = parser(grammar, ParserConfig::default());
        parser.inc_parse(&mut arena, &doc, false).unwrap();

        let x = doc.tokens(&arena)[1];
        doc.replace_token(&mut arena, x, None, "y");
        assert!(parser.inc_parse(&mut arena, &doc, false).unwrap().is_accepted());
        assert_eq!(parser.metrics().right_breakdowns, 1);

        let s = arena[doc.root()].children()[1];
        let first = arena[s].children()[0];
        assert_eq!(arena[first].symbol(), &Symbol::nonterminal("B"));
    }

    #[test]
    fn pass_through_tokens_stay_in_the_tree() {
        let mut arena = TreeArena::new();
        let doc = document(&mut arena, &[(None, "a"), (Some("comment"), "#c"), (None, "+"), (None, "a")]);
        let mut parser = parser(SUM, ParserConfig::default().with_pass_through(["comment"]));

        assert!(parser.inc_parse(&mut arena, &doc, false).unwrap().is_accepted());
        assert_eq!(parser.metrics().pass_through, 1);
        assert_eq!(doc.text(&arena), "a#c+a");
    }

    #[test]
    fn unknown_tokens_are_rejected_without_pass_through() {
        let mut arena = TreeArena::new();
        let doc = document(&mut arena, &[(None, "a"), (Some("comment"), "#c")]);
        let mut parser = parser(SUM, ParserConfig::default());
        let status = parser.inc_parse(&mut arena, &doc, false).unwrap();
        assert_eq!(status, ParseStatus::Error(doc.tokens(&arena)[1]));
    }

    #[test]
    fn wildcard_spans_absorb_until_the_next_expected_token() {
        let mut arena = TreeArena::new();
        let doc = document(
            &mut arena,
            &[(None, "x"), (Some("ID"), "foo"), (Some("ID"), "bar"), (None, "y")],
        );
        let mut parser = parser("S ::= \"x\" ANY \"y\"", ParserConfig::default());

        assert!(parser.inc_parse(&mut arena, &doc, false).unwrap().is_accepted());
        assert_eq!(parser.metrics().any_spans, 1);
        let s = arena[doc.root()].children()[1];
        assert_eq!(arena[s].children().len(), 4);
    }

    #[test]
    fn single_line_wildcards_stop_at_line_breaks() {
        let mut arena = TreeArena::new();
        let doc = document(&mut arena, &[(None, "x"), (Some("ID"), "foo"), (Some("NL"), "\n"), (None, "y")]);
        let mut parser = parser("S ::= \"x\" ANYNCR \"y\"", ParserConfig::default());
        let status = parser.inc_parse(&mut arena, &doc, false).unwrap();
        assert_eq!(status, ParseStatus::Error(doc.tokens(&arena)[2]));
    }

    #[test]
    fn full_reparse_matches_incremental_result() {
        let mut arena = TreeArena::new();
        let mut doc = document(&mut arena, &literals(&["a", "+", "a"]));
        let mut parser = parser(SUM, ParserConfig::default());
        parser.inc_parse(&mut arena, &doc, false).unwrap();
        let first = doc.tokens(&arena)[0];
        doc.replace_token(&mut arena, first, None, "a");
        parser.inc_parse(&mut arena, &doc, false).unwrap();
        let incremental = arena.snapshot(doc.root());

        parser.inc_parse(&mut arena, &doc, true).unwrap();
        assert_eq!(parser.metrics().optimistic_shifts, 0);
        assert_eq!(arena.snapshot(doc.root()), incremental);
    }
}
