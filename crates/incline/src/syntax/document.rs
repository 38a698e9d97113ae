//! Token-level document editing over a versioned tree.

use crate::arena::{NodeId, TreeArena, Version};
use crate::error::InvariantViolation;
use crate::grammar::Symbol;
use crate::lexer::Token;
use tracing::debug;

/// Symbol of every document root.
pub const ROOT: &str = "Root";

/// One document: `Root(bos, ..., eos)` in a shared arena.
///
/// Edits are token-level and mark the path to the root changed for the
/// next incremental parse. Versions come from the arena's clock, so
/// documents embedded in one another commit and undo together.
///
/// # Example
///
/// ```rust
/// use incline::arena::TreeArena;
/// use incline::lexer::Token;
/// use incline::syntax::Document;
///
/// let mut arena = TreeArena::new();
/// let mut doc = Document::new(&mut arena);
/// let a = doc.insert_token_after(&mut arena, doc.bos(), &Token::new(None, "a", 0..1))?;
/// doc.commit(&mut arena);
/// doc.replace_token(&mut arena, a, None, "b");
/// doc.commit(&mut arena);
/// assert_eq!(doc.text(&arena), "b");
/// doc.undo_to(&mut arena, 1);
/// assert_eq!(doc.text(&arena), "a");
/// # Ok::<(), incline::error::InvariantViolation>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: NodeId,
    bos: NodeId,
    eos: NodeId,
}

impl Document {
    /// An empty document, saved at the arena's current version.
    pub fn new(arena: &mut TreeArena) -> Self {
        Self::from_tokens(arena, &[])
    }

    /// A flat document of `tokens`, saved at the arena's current version.
    ///
    /// Edits pending in other documents of the arena are left for the next
    /// commit.
    pub fn from_tokens(arena: &mut TreeArena, tokens: &[Token]) -> Self {
        let bos = arena.alloc_terminal(Symbol::terminal(""), None, "");
        let eos = arena.alloc(Symbol::Finish);
        let mut children = Vec::with_capacity(tokens.len() + 2);
        children.push(bos);
        for token in tokens {
            children.push(alloc_token(arena, token));
        }
        children.push(eos);
        let root = arena.alloc_node(Symbol::nonterminal(ROOT), children.iter().copied());
        arena.relink_terminals(root);
        let version = arena.version();
        arena.mark_changed(root, version);
        arena.save(root, version);
        for node in children {
            arena.save(node, version);
        }
        debug!(tokens = tokens.len(), version, "document created");
        Self { root, bos, eos }
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub const fn bos(&self) -> NodeId {
        self.bos
    }

    #[must_use]
    pub const fn eos(&self) -> NodeId {
        self.eos
    }

    /// Insert `token` as the right sibling of `anchor`.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation::DetachedNode`] if `anchor` has no parent
    /// and [`InvariantViolation::MalformedRoot`] if `anchor` is the end of
    /// the document.
    pub fn insert_token_after(
        &mut self,
        arena: &mut TreeArena,
        anchor: NodeId,
        token: &Token,
    ) -> Result<NodeId, InvariantViolation> {
        let node = alloc_token(arena, token);
        self.insert_leaf_after(arena, anchor, node)
    }

    /// Insert a magic terminal for language `lang` after `anchor` and embed
    /// `sub` in it. The parser sees the box as the terminal `<lang>`.
    ///
    /// # Errors
    ///
    /// As [`Document::insert_token_after`].
    pub fn insert_language_box(
        &mut self,
        arena: &mut TreeArena,
        anchor: NodeId,
        lang: &str,
        sub: &Self,
    ) -> Result<NodeId, InvariantViolation> {
        let magic = arena.alloc_terminal(Symbol::magic(lang), None, "");
        self.insert_leaf_after(arena, anchor, magic)?;
        self.embed(arena, magic, sub);
        Ok(magic)
    }

    fn insert_leaf_after(
        &mut self,
        arena: &mut TreeArena,
        anchor: NodeId,
        node: NodeId,
    ) -> Result<NodeId, InvariantViolation> {
        if anchor == self.eos {
            return Err(InvariantViolation::MalformedRoot { node: self.root });
        }
        let parent = arena[anchor]
            .parent()
            .ok_or(InvariantViolation::DetachedNode { node: anchor })?;
        arena.insert_after_node(parent, anchor, node)?;
        arena.mark_changed(node, arena.pending());
        Ok(node)
    }

    /// Remove a token from the document.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation::MalformedRoot`] for the document's
    /// boundary tokens and [`InvariantViolation::DetachedNode`] if `node`
    /// has no parent.
    pub fn remove_token(&mut self, arena: &mut TreeArena, node: NodeId) -> Result<(), InvariantViolation> {
        if node == self.bos || node == self.eos {
            return Err(InvariantViolation::MalformedRoot { node: self.root });
        }
        let parent = arena[node]
            .parent()
            .ok_or(InvariantViolation::DetachedNode { node })?;
        arena.remove_child(parent, node)?;
        arena.mark_changed(parent, arena.pending());
        Ok(())
    }

    /// Change the text and class of a token in place.
    pub fn replace_token(&mut self, arena: &mut TreeArena, node: NodeId, lookup: Option<&str>, text: &str) {
        arena.set_token(node, lookup, text);
        arena.mark_changed(node, arena.pending());
    }

    /// Record the pending changes of every document in `arena` as the next
    /// version. See [`TreeArena::commit`].
    pub fn commit(&mut self, arena: &mut TreeArena) -> Version {
        arena.commit()
    }

    /// Restore the whole arena to `version`. Returns `false` if `version`
    /// is newer than any commit.
    ///
    /// This document and every document embedded in it are marked for a
    /// full reparse.
    pub fn undo_to(&mut self, arena: &mut TreeArena, version: Version) -> bool {
        if !arena.restore(version) {
            return false;
        }
        let pending = arena.pending();
        let mut roots = vec![self.root];
        while let Some(root) = roots.pop() {
            for leaf in arena.leaves(root) {
                if let Some(sub) = arena[leaf].language_box() {
                    roots.push(sub);
                }
                arena.mark_changed(leaf, pending);
            }
        }
        true
    }

    /// Move forward again after [`Document::undo_to`].
    pub fn redo_to(&mut self, arena: &mut TreeArena, version: Version) -> bool {
        if version < arena.version() {
            return false;
        }
        self.undo_to(arena, version)
    }

    /// Wire `magic` (a magic terminal of this document) to `sub`, so edits
    /// inside `sub` mark this document changed.
    pub fn embed(&mut self, arena: &mut TreeArena, magic: NodeId, sub: &Self) {
        arena.set_language_box(magic, sub.root);
        arena.mark_changed(magic, arena.pending());
    }

    /// Concatenated token text.
    #[must_use]
    pub fn text(&self, arena: &TreeArena) -> String {
        arena.text(self.root)
    }

    /// Tokens between the boundaries, in order.
    #[must_use]
    pub fn tokens(&self, arena: &TreeArena) -> Vec<NodeId> {
        arena
            .terminals(self.bos)
            .filter(|t| *t != self.bos && *t != self.eos)
            .collect()
    }
}

fn alloc_token(arena: &mut TreeArena, token: &Token) -> NodeId {
    if token.is_indentation() {
        let name = token.lookup.clone().unwrap_or_default();
        return arena.alloc_terminal(Symbol::IndentationTerminal(name), None, "");
    }
    arena.alloc_terminal(
        Symbol::terminal(token.text.clone()),
        token.lookup.as_deref(),
        token.text.clone(),
    )
}
