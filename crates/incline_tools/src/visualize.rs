//! Automaton and tree export
//!
//! Graphviz DOT for LR automata and parse trees, JSON for automata with their
//! action tables, and a plain-text table report.

use incline::arena::{NodeId, TreeArena};
use incline::error::diagnostics::ConflictDiagnostic;
use incline::lr::{Action, SyntaxTable};
use serde_json::{Value, json};
use std::fmt::Write;

/// Escape text for a double-quoted DOT label, turning line breaks into
/// left-justified breaks.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\l"),
            c => out.push(c),
        }
    }
    out
}

fn action_name(table: &SyntaxTable, action: Action) -> String {
    match action {
        Action::Shift(state) => format!("shift {state}"),
        Action::Reduce(p) => format!("reduce {}", table.grammar().display_production(p)),
        Action::Goto(state) => format!("goto {state}"),
        Action::Accept => "accept".to_string(),
    }
}

/// The automaton as a DOT digraph: one box per state listing its items,
/// one edge per transition.
///
/// ```rust
/// use std::sync::Arc;
/// use incline::grammar::GrammarSource;
/// use incline::lr::{self, LrMode};
///
/// let source = GrammarSource::parse("S ::= \"a\"").unwrap();
/// let table = lr::build(&Arc::new(source.grammar), LrMode::Lr1);
/// let dot = incline_tools::visualize::automaton_dot(&table);
/// assert!(dot.starts_with("digraph Automaton {"));
/// ```
#[must_use]
pub fn automaton_dot(table: &SyntaxTable) -> String {
    let grammar = table.grammar();
    let graph = table.graph();
    let mut out = String::new();
    let _ = writeln!(out, "digraph Automaton {{");
    let _ = writeln!(out, "  rankdir=LR;");
    let _ = writeln!(out, "  node [shape=box, fontname=monospace];");
    for (id, state) in graph.states().iter().enumerate() {
        let items = escape(&state.describe(grammar));
        let peripheries = if table.conflicts().iter().any(|c| c.state == id) { 2 } else { 1 };
        let _ = writeln!(
            out,
            "  s{id} [label=\"{id}\\l{items}\", peripheries={peripheries}];"
        );
    }
    for ((from, symbol), to) in graph.edges() {
        let label = escape(&grammar.symbol(symbol).to_string());
        let _ = writeln!(out, "  s{from} -> s{to} [label=\"{label}\"];");
    }
    let _ = writeln!(out, "}}");
    out
}

/// A parse tree as a DOT digraph. Tokens are drawn as ellipses, language
/// boxes as dashed edges from their magic terminal.
#[must_use]
pub fn tree_dot(arena: &TreeArena, root: NodeId) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph Tree {{");
    let _ = writeln!(out, "  node [fontname=monospace];");
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let node = &arena[id];
        let shape = if node.is_leaf() { "ellipse" } else { "box" };
        let label = escape(&node.symbol().to_string());
        let _ = writeln!(out, "  {id} [label=\"{label}\", shape={shape}];");
        for child in node.children() {
            let _ = writeln!(out, "  {id} -> {child};");
        }
        if let Some(sub) = node.language_box() {
            let _ = writeln!(out, "  {id} -> {sub} [style=dashed];");
            stack.push(sub);
        }
        stack.extend(node.children().iter().rev());
    }
    let _ = writeln!(out, "}}");
    out
}

/// States, edges, actions and conflicts of a table as one JSON document.
#[must_use]
pub fn automaton_json(table: &SyntaxTable) -> Value {
    let grammar = table.grammar();
    let graph = table.graph();
    let states: Vec<Value> = graph
        .states()
        .iter()
        .enumerate()
        .map(|(id, state)| {
            json!({
                "id": id,
                "items": state.describe(grammar).lines().collect::<Vec<_>>(),
            })
        })
        .collect();
    let edges: Vec<Value> = graph
        .edges()
        .map(|((from, symbol), to)| {
            json!({ "from": from, "symbol": grammar.symbol(symbol).to_string(), "to": to })
        })
        .collect();
    let mut actions = table.actions();
    actions.sort_by_key(|((state, symbol), _)| (*state, *symbol));
    let actions: Vec<Value> = actions
        .into_iter()
        .map(|((state, symbol), action)| {
            json!({
                "state": state,
                "symbol": grammar.symbol(symbol).to_string(),
                "action": action_name(table, action),
            })
        })
        .collect();
    let conflicts: Vec<Value> = table
        .conflicts()
        .iter()
        .map(|c| {
            let diagnostic = ConflictDiagnostic::new(table, c);
            json!({
                "state": diagnostic.state,
                "symbol": diagnostic.symbol.to_string(),
                "kind": diagnostic.kind,
                "detail": diagnostic.detail,
                "by_precedence": diagnostic.by_precedence,
            })
        })
        .collect();
    json!({
        "mode": graph.mode().to_string(),
        "states": states,
        "edges": edges,
        "actions": actions,
        "conflicts": conflicts,
    })
}

/// Summary of a table: mode, sizes, build statistics and, optionally, the
/// items of every state.
#[must_use]
pub fn table_report(table: &SyntaxTable, with_states: bool) -> String {
    let graph = table.graph();
    let stats = graph.stats();
    let mut out = String::new();
    let _ = writeln!(out, "mode: {}", graph.mode());
    let _ = writeln!(out, "states: {}", table.state_count());
    let _ = writeln!(out, "productions: {}", table.grammar().productions().len());
    let _ = writeln!(
        out,
        "built: {} created, {} merged, {} requeued, {} pruned, {} merged by LALR",
        stats.created, stats.merged, stats.requeued, stats.pruned, stats.lalr_merged
    );
    let _ = writeln!(
        out,
        "conflicts: {} ({} by default policy)",
        table.conflicts().len(),
        table.unresolved_conflicts().count()
    );
    if with_states {
        for (id, state) in graph.states().iter().enumerate() {
            let _ = writeln!(out, "\nstate {id}");
            out.push_str(&state.describe(table.grammar()));
            let mut edges: Vec<_> = graph.edges_from(id).collect();
            edges.sort_unstable();
            for (symbol, to) in edges {
                let _ = writeln!(out, "  {} -> {to}", table.grammar().symbol(symbol));
            }
        }
    }
    out
}
