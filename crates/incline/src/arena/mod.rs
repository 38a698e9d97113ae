//! # Versioned Tree Arena
//!
//! Parse trees live in a [`TreeArena`] and are addressed by [`NodeId`]
//! handles. Nodes are flagged deleted rather than freed, so handles stay
//! valid for the lifetime of the arena. The one exception is a rolled back
//! parse attempt, whose nodes are dropped with [`TreeArena::truncate`].
//!
//! ## Overview
//!
//! Parent to child is the only owning relation. Sibling links
//! (`left`/`right`), the terminal thread (`prev_term`/`next_term`) and the
//! language box links are plain handles maintained by the mutation
//! operations:
//!
//! - [`TreeArena::set_children`] is the only way a subtree changes parent.
//! - [`TreeArena::insert_after_node`] and [`TreeArena::remove_child`]
//!   splice siblings and the terminal thread in constant time.
//! - [`TreeArena::mark_changed`] flags the path to the root, crossing from a
//!   language box into its host document.
//!
//! Structural attributes are versioned per node (see [`history`]):
//! [`TreeArena::save`] records them at a version and [`TreeArena::load`]
//! restores the latest record at or before a version.
//!
//! ## Example
//!
//! ```rust
//! use incline::arena::TreeArena;
//! use incline::grammar::Symbol;
//!
//! let mut arena = TreeArena::new();
//! let a = arena.alloc_terminal(Symbol::terminal("a"), None, "a");
//! let root = arena.alloc_node(Symbol::nonterminal("Root"), [a]);
//! assert_eq!(arena[a].parent(), Some(root));
//! assert_eq!(arena.text(root), "a");
//! ```

pub mod history;
mod tree_arena;

pub use history::{AttrLog, History};
pub use tree_arena::{Terminals, TreeArena, TreeSnapshot};

use crate::grammar::Symbol;
use crate::lr::StateId;
use crate::syntax::ast::AstValue;
use compact_str::CompactString;
use smallvec::SmallVec;

/// Edit-history version. Increases by one per committed edit.
pub type Version = u64;

/// Stable handle to a node in a [`TreeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u32);

impl NodeId {
    /// Handle from a raw index. Only meaningful for the arena that issued it.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One tree node.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) symbol: Symbol,
    pub(crate) lookup: Option<CompactString>,
    pub(crate) text: CompactString,
    pub(crate) state: StateId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: SmallVec<[NodeId; 4]>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) prev_term: Option<NodeId>,
    pub(crate) next_term: Option<NodeId>,
    pub(crate) changed: bool,
    pub(crate) deleted: bool,
    /// Sub-document root to the magic terminal that embeds it.
    pub(crate) magic_backref: Option<NodeId>,
    /// Magic terminal to the root of the document it embeds.
    pub(crate) language_box: Option<NodeId>,
    /// Abstract node built from the production's annotation.
    pub(crate) alternate: Option<AstValue>,
    pub(crate) version: Version,
    pub(crate) touched: bool,
    pub(crate) history: History,
}

impl Node {
    fn new(symbol: Symbol, lookup: Option<CompactString>, text: CompactString) -> Self {
        Self {
            symbol,
            lookup,
            text,
            state: 0,
            parent: None,
            children: SmallVec::new(),
            left: None,
            right: None,
            prev_term: None,
            next_term: None,
            changed: false,
            deleted: false,
            magic_backref: None,
            language_box: None,
            alternate: None,
            version: 0,
            touched: true,
            history: History::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Token class assigned by the lexer, if any.
    #[must_use]
    pub fn lookup(&self) -> Option<&str> {
        self.lookup.as_deref()
    }

    /// Symbol the parser looks up in the table for this node: the token
    /// class when the lexer assigned one, otherwise the node's own symbol.
    #[must_use]
    pub fn lookup_symbol(&self) -> Symbol {
        match &self.lookup {
            Some(class) => Symbol::Terminal(class.clone()),
            None => self.symbol.lookup_key(),
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Automaton state the parser last assigned.
    #[must_use]
    pub const fn state(&self) -> StateId {
        self.state
    }

    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[must_use]
    pub const fn left(&self) -> Option<NodeId> {
        self.left
    }

    #[must_use]
    pub const fn right(&self) -> Option<NodeId> {
        self.right
    }

    #[must_use]
    pub const fn prev_term(&self) -> Option<NodeId> {
        self.prev_term
    }

    #[must_use]
    pub const fn next_term(&self) -> Option<NodeId> {
        self.next_term
    }

    #[must_use]
    pub const fn is_changed(&self) -> bool {
        self.changed
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    #[must_use]
    pub const fn magic_backref(&self) -> Option<NodeId> {
        self.magic_backref
    }

    #[must_use]
    pub const fn language_box(&self) -> Option<NodeId> {
        self.language_box
    }

    /// Abstract node the parser built for this node when it was reduced by
    /// an annotated production.
    #[must_use]
    pub const fn alternate(&self) -> Option<&AstValue> {
        self.alternate.as_ref()
    }

    /// Last version stamped by `mark_changed` / `mark_version`.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Leaves are everything except nonterminals.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        !self.symbol.is_nonterminal()
    }
}
