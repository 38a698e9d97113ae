//! Per-node attribute history.
//!
//! Every versioned attribute keeps its own append-only log of
//! `(version, value)` entries sorted by version. Reading at `v` returns the
//! latest entry whose version is `<= v`.

use super::{NodeId, Version};
use crate::grammar::Symbol;
use compact_str::CompactString;
use smallvec::SmallVec;

/// Log of one attribute's values over versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrLog<T> {
    entries: Vec<(Version, T)>,
}

impl<T> Default for AttrLog<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Clone + PartialEq> AttrLog<T> {
    /// Record `value` at `version`.
    ///
    /// Entries newer than `version` are dropped first: writing at an older
    /// version starts a new branch of history and discards the redo tail.
    pub fn record(&mut self, version: Version, value: T) {
        let keep = self.entries.partition_point(|(v, _)| *v <= version);
        self.entries.truncate(keep);
        match self.entries.last_mut() {
            Some((v, old)) if *v == version => *old = value,
            Some((_, old)) if *old == value => {}
            _ => self.entries.push((version, value)),
        }
    }

    /// Value in effect at `version`, if any entry is that old.
    #[must_use]
    pub fn at(&self, version: Version) -> Option<&T> {
        let idx = self.entries.partition_point(|(v, _)| *v <= version);
        idx.checked_sub(1).map(|i| &self.entries[i].1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest recorded version.
    #[must_use]
    pub fn latest(&self) -> Option<Version> {
        self.entries.last().map(|(v, _)| *v)
    }

    /// Drop every entry newer than `version`.
    pub fn truncate_after(&mut self, version: Version) {
        let keep = self.entries.partition_point(|(v, _)| *v <= version);
        self.entries.truncate(keep);
    }
}

/// Symbol, token class and text, versioned together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub symbol: Symbol,
    pub lookup: Option<CompactString>,
    pub text: CompactString,
}

/// All versioned attributes of one node.
#[derive(Debug, Clone, Default)]
pub struct History {
    pub(crate) parent: AttrLog<Option<NodeId>>,
    pub(crate) children: AttrLog<SmallVec<[NodeId; 4]>>,
    pub(crate) left: AttrLog<Option<NodeId>>,
    pub(crate) right: AttrLog<Option<NodeId>>,
    pub(crate) prev_term: AttrLog<Option<NodeId>>,
    pub(crate) next_term: AttrLog<Option<NodeId>>,
    pub(crate) deleted: AttrLog<bool>,
    pub(crate) content: AttrLog<Content>,
}

impl History {
    /// Whether the node existed at `version`.
    #[must_use]
    pub fn existed_at(&self, version: Version) -> bool {
        self.deleted.at(version).is_some_and(|deleted| !deleted)
    }

    /// Newest version any attribute was recorded at.
    #[must_use]
    pub fn latest(&self) -> Option<Version> {
        self.deleted.latest()
    }

    /// Forget every version after `version` in all attributes.
    pub fn truncate_after(&mut self, version: Version) {
        self.parent.truncate_after(version);
        self.children.truncate_after(version);
        self.left.truncate_after(version);
        self.right.truncate_after(version);
        self.prev_term.truncate_after(version);
        self.next_term.truncate_after(version);
        self.deleted.truncate_after(version);
        self.content.truncate_after(version);
    }
}
