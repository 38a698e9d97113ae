//! Node storage and the tree mutation operations.

use super::history::Content;
use super::{Node, NodeId, Version};
use crate::error::InvariantViolation;
use crate::grammar::Symbol;
use crate::lr::StateId;
use crate::syntax::ast::AstValue;
use compact_str::CompactString;
use smallvec::SmallVec;
use std::ops::Index;
use tracing::{debug, trace};

/// Owner of every node of one or more documents.
///
/// Documents embedded as language boxes share the host's arena so change
/// marking can cross between them. The arena also owns the version clock:
/// a commit records the pending edits of every document in it, and a
/// restore moves all of them back together.
#[derive(Debug, Clone, Default)]
pub struct TreeArena {
    nodes: Vec<Node>,
    /// Nodes whose versioned attributes changed since the last save.
    touched: Vec<NodeId>,
    /// Last committed or restored version.
    version: Version,
    /// Newest commit, the limit for redo.
    max_version: Version,
}

/// Structural copy of a subtree, for comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSnapshot {
    pub symbol: Symbol,
    pub text: CompactString,
    pub children: Vec<TreeSnapshot>,
}

impl TreeArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Version the nodes currently reflect.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Newest committed version.
    #[must_use]
    pub const fn max_version(&self) -> Version {
        self.max_version
    }

    /// Version the next [`TreeArena::commit`] records.
    #[must_use]
    pub const fn pending(&self) -> Version {
        self.version + 1
    }

    /// Save every pending change as a new version and return it.
    ///
    /// Committing while an older version is restored starts a new branch:
    /// every node first forgets the versions after the restored one, so a
    /// later restore can never reach the abandoned branch.
    pub fn commit(&mut self) -> Version {
        if self.version < self.max_version {
            let dropped = self.max_version - self.version;
            for node in &mut self.nodes {
                node.history.truncate_after(self.version);
            }
            debug!(from = self.version, dropped, "branched history");
        }
        self.version = self.pending();
        self.max_version = self.version;
        let saved = self.save_touched(self.version);
        debug!(version = self.version, saved, "committed");
        self.version
    }

    /// Restore every node to `version`, dropping unsaved changes. Returns
    /// `false`, changing nothing, if `version` was never committed.
    pub fn restore(&mut self, version: Version) -> bool {
        if version > self.max_version {
            return false;
        }
        self.load_all(version);
        self.version = version;
        debug!(version, "restored");
        true
    }

    /// Drop every node allocated at or after `len`.
    ///
    /// Only valid when nothing left in the arena refers to those nodes, as
    /// after a rolled back parse attempt.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.nodes.len() {
            return;
        }
        self.nodes.truncate(len);
        self.touched.retain(|id| id.index() < len);
    }

    /// Number of nodes ever allocated, deleted ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// All handles in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|i| NodeId::from_raw(i as u32))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(node);
        self.touched.push(id);
        id
    }

    /// Mutable access for a change that must be saved with the next version.
    fn touch(&mut self, id: NodeId) -> &mut Node {
        let node = &mut self.nodes[id.index()];
        if !node.touched {
            node.touched = true;
            self.touched.push(id);
        }
        node
    }

    /// Allocate a childless node with no text.
    pub fn alloc(&mut self, symbol: Symbol) -> NodeId {
        self.push(Node::new(symbol, None, CompactString::default()))
    }

    /// Allocate a token leaf.
    pub fn alloc_terminal(
        &mut self,
        symbol: Symbol,
        lookup: Option<&str>,
        text: impl Into<CompactString>,
    ) -> NodeId {
        self.push(Node::new(symbol, lookup.map(CompactString::from), text.into()))
    }

    /// Allocate an interior node adopting `children`.
    pub fn alloc_node(&mut self, symbol: Symbol, children: impl IntoIterator<Item = NodeId>) -> NodeId {
        let id = self.alloc(symbol);
        self.set_children(id, children);
        id
    }

    /// Replace the children of `parent`, rewiring each child's parent and
    /// sibling links. The children's previous parents are left untouched.
    pub fn set_children(&mut self, parent: NodeId, children: impl IntoIterator<Item = NodeId>) {
        let children: SmallVec<[NodeId; 4]> = children.into_iter().collect();
        let mut last: Option<NodeId> = None;
        for &child in &children {
            let node = self.touch(child);
            node.parent = Some(parent);
            node.left = last;
            node.right = None;
            if let Some(prev) = last {
                self.touch(prev).right = Some(child);
            }
            last = Some(child);
        }
        self.touch(parent).children = children;
    }

    /// Index of `child` among the children of `parent`.
    #[must_use]
    pub fn position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self[parent].children.iter().position(|c| *c == child)
    }

    /// Insert `new` as the right sibling of `anchor` and thread its
    /// terminals into the terminal list after the last terminal at or
    /// before `anchor`.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation::DetachedNode`] if `anchor` is not a
    /// child of `parent`.
    pub fn insert_after_node(
        &mut self,
        parent: NodeId,
        anchor: NodeId,
        new: NodeId,
    ) -> Result<(), InvariantViolation> {
        let pos = self
            .position(parent, anchor)
            .ok_or(InvariantViolation::DetachedNode { node: anchor })?;
        let right = self[anchor].right;
        self.touch(parent).children.insert(pos + 1, new);
        {
            let node = self.touch(new);
            node.parent = Some(parent);
            node.left = Some(anchor);
            node.right = right;
            node.deleted = false;
        }
        self.touch(anchor).right = Some(new);
        if let Some(right) = right {
            self.touch(right).left = Some(new);
        }

        if let (Some(first), Some(last)) = (self.first_leaf(new), self.last_leaf(new)) {
            let prev = self.leaf_at_or_before(anchor);
            let next = prev.and_then(|p| self[p].next_term);
            self.touch(first).prev_term = prev;
            self.touch(last).next_term = next;
            if let Some(prev) = prev {
                self.touch(prev).next_term = Some(first);
            }
            if let Some(next) = next {
                self.touch(next).prev_term = Some(last);
            }
        }
        Ok(())
    }

    /// Detach `child` from `parent` and flag it deleted. Its own children
    /// are kept so it stays inspectable at older versions.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation::DetachedNode`] if `child` is not a
    /// child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), InvariantViolation> {
        let pos = self
            .position(parent, child)
            .ok_or(InvariantViolation::DetachedNode { node: child })?;
        self.touch(parent).children.remove(pos);
        let (left, right) = (self[child].left, self[child].right);
        if let Some(left) = left {
            self.touch(left).right = right;
        }
        if let Some(right) = right {
            self.touch(right).left = left;
        }
        self.touch(child).deleted = true;

        if let (Some(first), Some(last)) = (self.first_leaf(child), self.last_leaf(child)) {
            let prev = self[first].prev_term;
            let next = self[last].next_term;
            if let Some(prev) = prev {
                self.touch(prev).next_term = next;
            }
            if let Some(next) = next {
                self.touch(next).prev_term = prev;
            }
        }
        Ok(())
    }

    /// Change a token's class and text. A plain terminal is renamed to
    /// its new text.
    pub fn set_token(&mut self, node: NodeId, lookup: Option<&str>, text: impl Into<CompactString>) {
        let node = self.touch(node);
        node.lookup = lookup.map(CompactString::from);
        node.text = text.into();
        if let Symbol::Terminal(name) = &mut node.symbol {
            name.clone_from(&node.text);
        }
    }

    /// Link a magic terminal to the root of the document it embeds.
    pub fn set_language_box(&mut self, magic: NodeId, sub_root: NodeId) {
        self.nodes[magic.index()].language_box = Some(sub_root);
        self.nodes[sub_root.index()].magic_backref = Some(magic);
    }

    /// Flag `node` and its ancestors changed and stamp them with `version`.
    ///
    /// Stops at the first node already marked for `version`. A document
    /// root embedded as a language box continues into its host.
    pub fn mark_changed(&mut self, node: NodeId, version: Version) {
        let mut current = Some(node);
        let mut steps = 0usize;
        while let Some(id) = current {
            let node = &mut self.nodes[id.index()];
            if node.changed && node.version == version {
                break;
            }
            node.changed = true;
            node.version = version;
            current = node.parent.or(node.magic_backref);
            steps += 1;
        }
        trace!(%node, version, steps, "marked changed");
    }

    /// Stamp `node` and its ancestors with `version` without flagging them.
    pub fn mark_version(&mut self, node: NodeId, version: Version) {
        let mut current = Some(node);
        while let Some(id) = current {
            let node = &mut self.nodes[id.index()];
            if node.version == version {
                break;
            }
            node.version = version;
            current = node.parent.or(node.magic_backref);
        }
    }

    /// Record the versioned attributes of `node` at `version`.
    pub fn save(&mut self, node: NodeId, version: Version) {
        let node = &mut self.nodes[node.index()];
        node.touched = false;
        let history = &mut node.history;
        history.parent.record(version, node.parent);
        history.children.record(version, node.children.clone());
        history.left.record(version, node.left);
        history.right.record(version, node.right);
        history.prev_term.record(version, node.prev_term);
        history.next_term.record(version, node.next_term);
        history.deleted.record(version, node.deleted);
        history.content.record(
            version,
            Content {
                symbol: node.symbol.clone(),
                lookup: node.lookup.clone(),
                text: node.text.clone(),
            },
        );
    }

    /// Restore the attributes of `node` recorded at or before `version`.
    ///
    /// A node with no record that old did not exist yet and is flagged
    /// deleted. Returns whether the node is live at `version`.
    pub fn load(&mut self, node: NodeId, version: Version) -> bool {
        let node = &mut self.nodes[node.index()];
        let history = &node.history;
        if history.deleted.at(version).is_none() {
            node.deleted = true;
            return false;
        }
        if let Some(parent) = history.parent.at(version).copied() {
            node.parent = parent;
        }
        if let Some(children) = history.children.at(version).cloned() {
            node.children = children;
        }
        if let Some(left) = history.left.at(version).copied() {
            node.left = left;
        }
        if let Some(right) = history.right.at(version).copied() {
            node.right = right;
        }
        if let Some(prev) = history.prev_term.at(version).copied() {
            node.prev_term = prev;
        }
        if let Some(next) = history.next_term.at(version).copied() {
            node.next_term = next;
        }
        if let Some(deleted) = history.deleted.at(version).copied() {
            node.deleted = deleted;
        }
        if let Some(content) = history.content.at(version).cloned() {
            node.symbol = content.symbol;
            node.lookup = content.lookup;
            node.text = content.text;
        }
        !node.deleted
    }

    /// Save every node changed since the last save. Returns how many.
    pub(crate) fn save_touched(&mut self, version: Version) -> usize {
        let touched = std::mem::take(&mut self.touched);
        for id in &touched {
            self.save(*id, version);
        }
        touched.len()
    }

    /// Load every node at `version`, dropping unsaved changes. Change
    /// flags are not versioned and keep their current value.
    pub(crate) fn load_all(&mut self, version: Version) {
        for id in std::mem::take(&mut self.touched) {
            self.nodes[id.index()].touched = false;
        }
        for i in 0..self.nodes.len() {
            self.load(NodeId::from_raw(i as u32), version);
        }
    }

    /// Leftmost terminal at or after `node`: descend first children and
    /// skip past childless nonterminals to the right.
    #[must_use]
    pub fn find_first_terminal(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            let node = &self[current];
            if node.is_leaf() {
                return Some(current);
            }
            current = match node.children.first() {
                Some(child) => *child,
                None => self.pop_lookahead(current)?,
            };
        }
    }

    /// Next node to the right of `node`, climbing parents until one has a
    /// right sibling. `None` past the last node of the tree.
    #[must_use]
    pub fn pop_lookahead(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            if let Some(right) = self[current].right {
                return Some(right);
            }
            current = self[current].parent?;
        }
    }

    /// First leaf inside the subtree of `node`.
    #[must_use]
    pub fn first_leaf(&self, node: NodeId) -> Option<NodeId> {
        if self[node].is_leaf() {
            return Some(node);
        }
        self[node].children.iter().find_map(|c| self.first_leaf(*c))
    }

    /// Last leaf inside the subtree of `node`.
    #[must_use]
    pub fn last_leaf(&self, node: NodeId) -> Option<NodeId> {
        if self[node].is_leaf() {
            return Some(node);
        }
        self[node].children.iter().rev().find_map(|c| self.last_leaf(*c))
    }

    fn leaf_at_or_before(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            if let Some(leaf) = self.last_leaf(current) {
                return Some(leaf);
            }
            let mut up = current;
            current = loop {
                if let Some(left) = self[up].left {
                    break left;
                }
                up = self[up].parent?;
            };
        }
    }

    /// Iterate the terminal thread starting at `from`.
    #[must_use]
    pub fn terminals(&self, from: NodeId) -> Terminals<'_> {
        Terminals {
            arena: self,
            next: Some(from),
        }
    }

    /// Leaves of the subtree of `root` in order, without entering
    /// language boxes.
    #[must_use]
    pub fn leaves(&self, root: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self[id];
            if node.is_leaf() {
                leaves.push(id);
            } else {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        leaves
    }

    /// Source text of a subtree. Magic terminals contribute the text of
    /// the document they embed.
    #[must_use]
    pub fn text(&self, root: NodeId) -> String {
        let mut out = String::new();
        for leaf in self.leaves(root) {
            match self[leaf].language_box {
                Some(sub_root) => out.push_str(&self.text(sub_root)),
                None => out.push_str(&self[leaf].text),
            }
        }
        out
    }

    /// Rebuild the terminal thread over the leaves of `root`.
    pub fn relink_terminals(&mut self, root: NodeId) -> usize {
        let leaves = self.leaves(root);
        let mut prev: Option<NodeId> = None;
        for &leaf in &leaves {
            let node = self.touch(leaf);
            node.prev_term = prev;
            node.next_term = None;
            if let Some(prev) = prev {
                self.touch(prev).next_term = Some(leaf);
            }
            prev = Some(leaf);
        }
        leaves.len()
    }

    /// Structural copy of the subtree of `root`.
    #[must_use]
    pub fn snapshot(&self, root: NodeId) -> TreeSnapshot {
        let node = &self[root];
        TreeSnapshot {
            symbol: node.symbol.clone(),
            text: node.text.clone(),
            children: node.children.iter().map(|c| self.snapshot(*c)).collect(),
        }
    }

    pub(crate) fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) {
        self.touch(node).parent = parent;
    }

    pub(crate) fn set_left(&mut self, node: NodeId, left: Option<NodeId>) {
        self.touch(node).left = left;
    }

    pub(crate) fn set_right(&mut self, node: NodeId, right: Option<NodeId>) {
        self.touch(node).right = right;
    }

    pub(crate) fn set_changed(&mut self, node: NodeId, changed: bool) {
        self.nodes[node.index()].changed = changed;
    }

    pub(crate) fn set_state(&mut self, node: NodeId, state: StateId) {
        self.nodes[node.index()].state = state;
    }

    pub(crate) fn set_alternate(&mut self, node: NodeId, alternate: Option<AstValue>) {
        self.nodes[node.index()].alternate = alternate;
    }
}

impl Index<NodeId> for TreeArena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

/// Iterator over the terminal thread.
pub struct Terminals<'a> {
    arena: &'a TreeArena,
    next: Option<NodeId>,
}

impl Iterator for Terminals<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.arena[current].next_term;
        Some(current)
    }
}
