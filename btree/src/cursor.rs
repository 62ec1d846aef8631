// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use crate::error::Result;
use crate::node::{Key, TreeNode};
use crate::tree::{probe, TreeConfig};

/// Stateful in-order traversal over a tree.
///
/// A cursor holds a stack of `(node, index)` frames addressing the current
/// position: the key index inside a leaf, or the separator reached after
/// the current sub-descent inside an internal node. Cursors only read; if
/// the tree is mutated while a cursor is live, behaviour is undefined.
pub struct Cursor<'s, S, N: TreeNode<S>> {
    store: &'s S,
    frames: Vec<(N, usize)>,
}

impl<'s, S, N: TreeNode<S>> Cursor<'s, S, N> {
    /// Cursor positioned at the smallest key; out of tree when the tree is
    /// empty.
    pub(crate) fn first(store: &'s S, root: N) -> Result<Self> {
        let mut cursor = Cursor {
            store,
            frames: Vec::new(),
        };
        cursor.descend_left(root)?;
        let exhausted = match cursor.frames.last() {
            None => false,
            Some((node, index)) => *index >= node.keys(store)?.size(),
        };
        if exhausted {
            cursor.pop_to_separator()?;
        }
        Ok(cursor)
    }

    /// Cursor positioned at the least key `>= key`; out of tree when no
    /// such key exists.
    pub(crate) fn from_key(
        config: TreeConfig,
        store: &'s S,
        root: N,
        key: &[u8],
    ) -> Result<Self> {
        let mut cursor = Cursor {
            store,
            frames: Vec::new(),
        };
        let mut node = root;
        loop {
            let keys = node.keys(store)?;
            let (index, exact) = probe(&config, &keys, key);
            let children = node.children(store)?;
            let leaf = children.size() == 0;
            cursor.frames.push((node.clone(), index));
            if exact {
                return Ok(cursor);
            }
            if leaf {
                if index >= keys.size() {
                    // Past the last key of this leaf: the least upper bound
                    // is the next key in ancestral order.
                    cursor.pop_to_separator()?;
                }
                return Ok(cursor);
            }
            node = children.get(index);
        }
    }

    /// Whether the cursor points at a key.
    pub fn in_tree(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Key at the current position, if in the tree.
    pub fn key(&self) -> Result<Option<Key>> {
        match self.frames.last() {
            None => Ok(None),
            Some((node, index)) => Ok(Some(node.keys(self.store)?.get(*index))),
        }
    }

    /// Value at the current position, if in the tree.
    pub fn value(&self) -> Result<Option<N::Value>> {
        match self.frames.last() {
            None => Ok(None),
            Some((node, index)) => Ok(Some(node.values(self.store)?.get(*index))),
        }
    }

    /// Advance to the next key in order; past the last key the cursor
    /// leaves the tree. A no-op once out of the tree.
    pub fn move_right(&mut self) -> Result<()> {
        let (node, index) = match self.frames.last() {
            None => return Ok(()),
            Some((node, index)) => (node.clone(), *index),
        };
        let children = node.children(self.store)?;
        let leaf = children.size() == 0;
        let can_step = if leaf {
            index + 1 < node.keys(self.store)?.size()
        } else {
            index + 1 < children.size()
        };
        if !can_step {
            return self.pop_to_separator();
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.1 = index + 1;
        }
        if !leaf {
            let child = children.get(index + 1);
            self.descend_left(child)?;
        }
        Ok(())
    }

    fn descend_left(&mut self, node: N) -> Result<()> {
        let mut node = node;
        loop {
            let children = node.children(self.store)?;
            self.frames.push((node.clone(), 0));
            if children.size() == 0 {
                return Ok(());
            }
            node = children.get(0);
        }
    }

    /// Pop frames until the top one addresses a separator that has not been
    /// yielded yet; the cursor leaves the tree when no ancestor has one.
    fn pop_to_separator(&mut self) -> Result<()> {
        while self.frames.pop().is_some() {
            let stop = match self.frames.last() {
                None => true,
                Some((node, index)) => *index < node.keys(self.store)?.size(),
            };
            if stop {
                break;
            }
        }
        Ok(())
    }
}
