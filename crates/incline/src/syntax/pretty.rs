//! # Tree Printing
//!
//! Indented text rendering of a parse tree, one node per line.
//!
//! ```text
//! Root
//!   ""
//!   E [3]
//!     "1" INT
//!   $
//! ```
//!
//! Nonterminals show their automaton state, tokens their class. Language
//! boxes are rendered nested below their magic terminal.

use crate::arena::{NodeId, TreeArena};
use crate::grammar::Symbol;
use std::fmt::Write;

/// Configuration for tree printing
#[derive(Debug, Clone)]
pub struct PrettyConfig {
    /// Indentation string per level
    pub indent: String,
    /// Show automaton states on nonterminals
    pub states: bool,
    /// Flag nodes marked changed with `*`
    pub changed: bool,
}

impl Default for PrettyConfig {
    fn default() -> Self {
        Self {
            indent: "  ".into(),
            states: true,
            changed: false,
        }
    }
}

/// Render the subtree of `root` with the default configuration.
#[must_use]
pub fn render(arena: &TreeArena, root: NodeId) -> String {
    render_with(arena, root, &PrettyConfig::default())
}

#[must_use]
pub fn render_with(arena: &TreeArena, root: NodeId, config: &PrettyConfig) -> String {
    let mut out = String::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((id, depth)) = stack.pop() {
        let node = &arena[id];
        for _ in 0..depth {
            out.push_str(&config.indent);
        }
        let _ = write!(out, "{}", node.symbol());
        match node.symbol() {
            Symbol::Nonterminal(_) if config.states && id != root => {
                let _ = write!(out, " [{}]", node.state());
            }
            _ => {}
        }
        if let Some(class) = node.lookup() {
            let _ = write!(out, " {class}");
        }
        if config.changed && node.is_changed() {
            out.push_str(" *");
        }
        out.push('\n');

        if let Some(sub_root) = node.language_box() {
            stack.push((sub_root, depth + 1));
        }
        stack.extend(node.children().iter().rev().map(|c| (*c, depth + 1)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Token;
    use crate::syntax::Document;

    #[test]
    fn renders_one_node_per_line() {
        let mut arena = TreeArena::new();
        let doc = Document::from_tokens(&mut arena, &[Token::new(Some("INT"), "1", 0..1)]);
        let expected = "Root\n  \"\"\n  \"1\" INT\n  $\n";
        assert_eq!(render(&arena, doc.root()), expected);
    }

    #[test]
    fn changed_nodes_are_flagged_on_request() {
        let mut arena = TreeArena::new();
        let doc = Document::from_tokens(&mut arena, &[]);
        let config = PrettyConfig {
            changed: true,
            ..PrettyConfig::default()
        };
        assert!(render_with(&arena, doc.root(), &config).starts_with("Root *\n"));
    }
}
