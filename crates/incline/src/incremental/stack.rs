//! Parse stack of the incremental parser.

use crate::arena::NodeId;
use crate::lr::StateId;
use smallvec::SmallVec;

/// One stack entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Frame {
    /// Sentinel below everything, in state 0.
    Bottom,
    /// A shifted terminal or an optimistically shifted subtree.
    Node { node: NodeId, state: StateId },
    /// Nodes consumed by a wildcard. Counts as one grammar symbol.
    AnySpan {
        nodes: SmallVec<[NodeId; 4]>,
        state: StateId,
    },
    /// A node shifted without a state change. Not counted by reduces.
    PassThrough { node: NodeId, state: StateId },
}

impl Frame {
    pub(crate) const fn state(&self) -> StateId {
        match self {
            Self::Bottom => 0,
            Self::Node { state, .. } | Self::AnySpan { state, .. } | Self::PassThrough { state, .. } => {
                *state
            }
        }
    }

    /// Whether the frame stands for a grammar symbol.
    const fn counts(&self) -> bool {
        matches!(self, Self::Node { .. } | Self::AnySpan { .. })
    }

    pub(crate) fn nodes(&self) -> &[NodeId] {
        match self {
            Self::Bottom => &[],
            Self::Node { node, .. } | Self::PassThrough { node, .. } => std::slice::from_ref(node),
            Self::AnySpan { nodes, .. } => nodes,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ParseStack {
    frames: Vec<Frame>,
}

impl ParseStack {
    pub(crate) fn new() -> Self {
        Self {
            frames: vec![Frame::Bottom],
        }
    }

    /// State on top of the stack.
    pub(crate) fn state(&self) -> StateId {
        self.frames.last().map_or(0, Frame::state)
    }

    pub(crate) fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pop the top frame. The bottom sentinel is never popped.
    pub(crate) fn pop(&mut self) -> Option<Frame> {
        if matches!(self.frames.last(), None | Some(Frame::Bottom)) {
            return None;
        }
        self.frames.pop()
    }

    /// Pop frames until `count` symbols are off the stack and return their
    /// nodes in order. Pass-through frames met on the way are absorbed.
    /// `None` if the stack holds fewer symbols.
    pub(crate) fn pop_symbols(&mut self, count: usize) -> Option<Vec<NodeId>> {
        let mut popped = Vec::new();
        let mut seen = 0;
        while seen < count {
            let frame = self.pop()?;
            if frame.counts() {
                seen += 1;
            }
            popped.push(frame);
        }
        Some(popped.iter().rev().flat_map(|f| f.nodes().iter().copied()).collect())
    }

    /// Nodes of every frame from bottom to top.
    pub(crate) fn nodes(&self) -> Vec<NodeId> {
        self.frames.iter().flat_map(|f| f.nodes().iter().copied()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.len() - 1
    }
}
