//! In-order walking of parent-linked search trees
//!
//! Trees use one shared sentinel node for "no child" and "no parent". Nodes are
//! never owned: [`TreeLinks`] answers link queries against the inspected memory
//! (or a flat node table in tests), and the walker only holds node identities.
//!
//! Every descent and ascent is capped at `max_steps` link hops. Hitting the cap
//! reports `None`, the same as running off the end of the sequence; the two are
//! told apart only in the log.

use std::fmt::Debug;

use crate::error::Result;

/// Link structure of an inspected tree
pub trait TreeLinks {
    /// Node identity (an address, or an index into a node table)
    type Node: Copy + Eq + Debug;

    fn root(&self) -> Result<Self::Node>;
    fn left(&self, node: Self::Node) -> Result<Self::Node>;
    fn right(&self, node: Self::Node) -> Result<Self::Node>;
    fn parent(&self, node: Self::Node) -> Result<Self::Node>;
    fn is_sentinel(&self, node: Self::Node) -> bool;
}

/// Bounded in-order traversal with a single-slot position cache
#[derive(Debug)]
pub struct TreeWalker<L: TreeLinks> {
    links: L,
    max_steps: usize,
    cursor: Option<(usize, L::Node)>,
}

impl<L: TreeLinks> TreeWalker<L> {
    pub fn new(links: L, max_steps: usize) -> Self {
        Self {
            links,
            max_steps,
            cursor: None,
        }
    }

    /// Resume with a cursor saved from an earlier walker of the same update cycle
    pub fn with_cursor(links: L, max_steps: usize, cursor: Option<(usize, L::Node)>) -> Self {
        Self {
            links,
            max_steps,
            cursor,
        }
    }

    /// Last resolved `(index, node)` pair, if any
    pub fn cursor(&self) -> Option<(usize, L::Node)> {
        self.cursor
    }

    fn descend_left(&self, mut node: L::Node) -> Result<Option<L::Node>> {
        for _ in 0..=self.max_steps {
            let left = self.links.left(node)?;
            if self.links.is_sentinel(left) {
                return Ok(Some(node));
            }
            node = left;
        }
        tracing::warn!("tree descent exceeded {} steps", self.max_steps);
        Ok(None)
    }

    /// Smallest node of the tree
    pub fn leftmost(&self) -> Result<Option<L::Node>> {
        let root = self.links.root()?;
        if self.links.is_sentinel(root) {
            return Ok(None);
        }
        self.descend_left(root)
    }

    /// In-order successor of `node`, or `None` at the end of the sequence
    pub fn successor(&self, node: L::Node) -> Result<Option<L::Node>> {
        let right = self.links.right(node)?;
        if !self.links.is_sentinel(right) {
            return self.descend_left(right);
        }

        let mut current = node;
        for _ in 0..=self.max_steps {
            let parent = self.links.parent(current)?;
            if self.links.is_sentinel(parent) {
                // climbed out of the root's right spine
                return Ok(None);
            }
            if self.links.left(parent)? == current {
                return Ok(Some(parent));
            }
            if self.links.right(parent)? != current {
                tracing::debug!("node {:?} is not a child of its parent {:?}", current, parent);
                return Ok(None);
            }
            current = parent;
        }
        tracing::warn!("tree ascent exceeded {} steps", self.max_steps);
        Ok(None)
    }

    /// The `i`-th node in order.
    ///
    /// When `i` directly follows the previously resolved index, a single
    /// successor step from the cached node is taken; otherwise the walk restarts
    /// from the leftmost node.
    pub fn nth(&mut self, i: usize) -> Result<Option<L::Node>> {
        let (mut node, mut remaining) = match self.cursor {
            Some((index, cached)) if index + 1 == i => {
                tracing::trace!("tree cursor hit at {}", index);
                (Some(cached), 1)
            }
            _ => (self.leftmost()?, i),
        };

        while remaining > 0 {
            let Some(current) = node else {
                break;
            };
            node = self.successor(current)?;
            remaining -= 1;
        }

        if let Some(found) = node {
            self.cursor = Some((i, found));
        }
        Ok(node)
    }
}
