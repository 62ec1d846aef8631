// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! The order-parameterised tree algorithm, written against [`TreeNode`].
//!
//! Splits, merges and rotations are expressed as sequence algebra over the
//! node's keys, values and children, handed to `update` in one piece.

use std::cmp::Ordering;

use objstore::Seq;

use crate::error::Result;
use crate::node::{Key, TreeNode};

/// Total order over keys.
pub type KeyCompare = fn(&[u8], &[u8]) -> Ordering;

/// The default key order: lexicographic on unsigned bytes, with the shorter
/// string first on a shared prefix.
pub fn lexicographic(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Order parameter and key comparator of one tree.
///
/// The order is the maximum number of children of an internal node; the
/// minimum node sizes derive from it.
#[derive(Clone, Copy)]
pub struct TreeConfig {
    order: usize,
    compare: KeyCompare,
}

impl TreeConfig {
    /// Create a config. Panics if `order` is below 3.
    pub fn new(order: usize, compare: KeyCompare) -> Self {
        assert!(order >= 3, "tree order must be at least 3");
        Self { order, compare }
    }

    /// Maximum children of an internal node.
    pub fn order(&self) -> usize {
        self.order
    }

    pub(crate) fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        (self.compare)(a, b)
    }

    fn min_children(&self) -> usize {
        (self.order + 1) / 2
    }

    fn max_children(&self) -> usize {
        self.order
    }

    fn min_leaf_keys(&self) -> usize {
        self.min_children() - 1
    }

    fn max_leaf_keys(&self) -> usize {
        self.order - 1
    }
}

/// Least-upper-bound probe: the smallest index whose key is `>= key`, and
/// whether it is an exact match. Returns the key count when all keys are
/// smaller.
pub(crate) fn probe(config: &TreeConfig, keys: &Seq<Key>, key: &[u8]) -> (usize, bool) {
    for index in 0..keys.size() {
        match config.compare(key, &keys.get(index)) {
            Ordering::Greater => {}
            Ordering::Equal => return (index, true),
            Ordering::Less => return (index, false),
        }
    }
    (keys.size(), false)
}

pub(crate) fn size<S, N: TreeNode<S>>(store: &S, node: &N) -> Result<u64> {
    let mut total = node.keys(store)?.size() as u64;
    let children = node.children(store)?;
    for index in 0..children.size() {
        total += size(store, &children.get(index))?;
    }
    Ok(total)
}

pub(crate) fn find<S, N: TreeNode<S>>(
    config: &TreeConfig,
    store: &S,
    node: &N,
    key: &[u8],
) -> Result<Option<N::Value>> {
    let keys = node.keys(store)?;
    let (index, exact) = probe(config, &keys, key);
    if exact {
        return Ok(Some(node.values(store)?.get(index)));
    }
    let children = node.children(store)?;
    if children.size() == 0 {
        return Ok(None);
    }
    find(config, store, &children.get(index), key)
}

struct Split<N, V> {
    key: Key,
    value: V,
    left: N,
}

pub(crate) fn put<S, N: TreeNode<S>>(
    config: &TreeConfig,
    store: &mut S,
    root: &N,
    key: &[u8],
    value: N::Value,
) -> Result<()> {
    let split = match insert(config, store, root, key, value)? {
        None => return Ok(()),
        Some(split) => split,
    };
    // The root split. Its current content moves into a fresh sibling so the
    // externally held root handle stays the root of the grown tree.
    let keys = root.keys(store)?;
    let values = root.values(store)?;
    let children = root.children(store)?;
    let carried = root.create_sibling(store, keys, values, children)?;
    root.update(
        store,
        Seq::wrap(vec![split.key]),
        Seq::wrap(vec![split.value]),
        Seq::wrap(vec![split.left, carried]),
    )
}

fn insert<S, N: TreeNode<S>>(
    config: &TreeConfig,
    store: &mut S,
    node: &N,
    key: &[u8],
    value: N::Value,
) -> Result<Option<Split<N, N::Value>>> {
    let keys = node.keys(store)?;
    let (index, exact) = probe(config, &keys, key);
    if exact {
        let values = node.values(store)?.with(index, value);
        let children = node.children(store)?;
        node.update(store, keys, values, children)?;
        return Ok(None);
    }
    let children = node.children(store)?;
    if children.size() == 0 {
        let new_keys = keys.splice_in(index, key.to_vec());
        let new_values = node.values(store)?.splice_in(index, value);
        if new_keys.size() > config.max_leaf_keys() {
            return Ok(Some(split_overfull(
                config, store, node, new_keys, new_values, children,
            )?));
        }
        node.update(store, new_keys, new_values, children)?;
        return Ok(None);
    }
    let split = match insert(config, store, &children.get(index), key, value)? {
        None => return Ok(None),
        Some(split) => split,
    };
    let new_keys = keys.splice_in(index, split.key);
    let new_values = node.values(store)?.splice_in(index, split.value);
    let new_children = children.splice_in(index, split.left);
    if new_children.size() > config.max_children() {
        return Ok(Some(split_overfull(
            config,
            store,
            node,
            new_keys,
            new_values,
            new_children,
        )?));
    }
    node.update(store, new_keys, new_values, new_children)?;
    Ok(None)
}

/// Split a node whose proposed content exceeds its bounds: the median
/// key/value is promoted, everything below it goes to a fresh left sibling
/// and the node keeps the rest.
fn split_overfull<S, N: TreeNode<S>>(
    config: &TreeConfig,
    store: &mut S,
    node: &N,
    keys: Seq<Key>,
    values: Seq<N::Value>,
    children: Seq<N>,
) -> Result<Split<N, N::Value>> {
    let median = config.min_children() - 1;
    let key = keys.get(median);
    let value = values.get(median);
    let (left_children, right_children) = if children.size() == 0 {
        (Seq::empty(), Seq::empty())
    } else {
        (
            children.slice(0, median + 1),
            children.slice(median + 1, children.size()),
        )
    };
    let left = node.create_sibling(
        store,
        keys.slice(0, median),
        values.slice(0, median),
        left_children,
    )?;
    node.update(
        store,
        keys.slice(median + 1, keys.size()),
        values.slice(median + 1, values.size()),
        right_children,
    )?;
    Ok(Split { key, value, left })
}

pub(crate) fn remove<S, N: TreeNode<S>>(
    config: &TreeConfig,
    store: &mut S,
    root: &N,
    key: &[u8],
) -> Result<()> {
    remove_from(config, store, root, key)?;
    // An internal root left with a single child collapses into it.
    let children = root.children(store)?;
    if children.size() == 1 {
        let child = children.get(0);
        let keys = child.keys(store)?;
        let values = child.values(store)?;
        let grandchildren = child.children(store)?;
        root.update(store, keys, values, grandchildren)?;
    }
    Ok(())
}

/// Remove `key` below `node`, returning whether `node` underflowed.
fn remove_from<S, N: TreeNode<S>>(
    config: &TreeConfig,
    store: &mut S,
    node: &N,
    key: &[u8],
) -> Result<bool> {
    let keys = node.keys(store)?;
    let (index, exact) = probe(config, &keys, key);
    let children = node.children(store)?;
    if children.size() == 0 {
        if !exact {
            return Ok(false);
        }
        let new_keys = keys.splice_out(index);
        let new_values = node.values(store)?.splice_out(index);
        let underflow = new_keys.size() < config.min_leaf_keys();
        node.update(store, new_keys, new_values, children)?;
        return Ok(underflow);
    }
    if exact {
        // Replace the separator with its predecessor, the largest key of
        // the left subtree.
        let (pred_key, pred_value, deep_underflow) =
            pop_last(config, store, &children.get(index))?;
        let new_keys = keys.with(index, pred_key);
        let new_values = node.values(store)?.with(index, pred_value);
        node.update(store, new_keys, new_values, children)?;
        if deep_underflow {
            return rebalance(config, store, node, index);
        }
        return Ok(false);
    }
    if remove_from(config, store, &children.get(index), key)? {
        return rebalance(config, store, node, index);
    }
    Ok(false)
}

/// Remove and return the right-most key/value of the subtree under `node`,
/// rebalancing inside the subtree on the way out. The returned flag says
/// whether `node` itself underflowed.
fn pop_last<S, N: TreeNode<S>>(
    config: &TreeConfig,
    store: &mut S,
    node: &N,
) -> Result<(Key, N::Value, bool)> {
    let keys = node.keys(store)?;
    let children = node.children(store)?;
    if children.size() == 0 {
        let last = keys.size() - 1;
        let key = keys.get(last);
        let value = node.values(store)?.get(last);
        let new_values = node.values(store)?.without_last();
        node.update(store, keys.without_last(), new_values, children)?;
        return Ok((key, value, last < config.min_leaf_keys()));
    }
    let last_index = children.size() - 1;
    let (key, value, deep_underflow) = pop_last(config, store, &children.get(last_index))?;
    if deep_underflow {
        let underflow = rebalance(config, store, node, last_index)?;
        return Ok((key, value, underflow));
    }
    Ok((key, value, false))
}

fn spare<S, N: TreeNode<S>>(config: &TreeConfig, store: &S, node: &N) -> Result<bool> {
    let children = node.children(store)?;
    if children.size() == 0 {
        Ok(node.keys(store)?.size() > config.min_leaf_keys())
    } else {
        Ok(children.size() > config.min_children())
    }
}

fn underflowed<S, N: TreeNode<S>>(config: &TreeConfig, store: &S, node: &N) -> Result<bool> {
    let children = node.children(store)?;
    if children.size() == 0 {
        Ok(node.keys(store)?.size() < config.min_leaf_keys())
    } else {
        Ok(children.size() < config.min_children())
    }
}

/// Fix up the underflowed child at `index`: borrow from a sibling with
/// spare capacity, else merge with a sibling. Returns whether the parent
/// underflowed in turn.
fn rebalance<S, N: TreeNode<S>>(
    config: &TreeConfig,
    store: &mut S,
    parent: &N,
    index: usize,
) -> Result<bool> {
    let children = parent.children(store)?;
    if index > 0 && spare(config, store, &children.get(index - 1))? {
        rotate_clockwise(store, parent, index - 1)?;
        return Ok(false);
    }
    if index + 1 < children.size() && spare(config, store, &children.get(index + 1))? {
        rotate_counter_clockwise(store, parent, index)?;
        return Ok(false);
    }
    let separator = if index > 0 { index - 1 } else { index };
    merge(store, parent, separator)?;
    underflowed(config, store, parent)
}

/// Move the left sibling's last key through the parent separator into the
/// right sibling (and its last child across, for internals).
fn rotate_clockwise<S, N: TreeNode<S>>(store: &mut S, parent: &N, separator: usize) -> Result<()> {
    let parent_keys = parent.keys(store)?;
    let parent_values = parent.values(store)?;
    let children = parent.children(store)?;
    let left = children.get(separator);
    let right = children.get(separator + 1);

    let left_keys = left.keys(store)?;
    let left_values = left.values(store)?;
    let left_children = left.children(store)?;
    let last = left_keys.size() - 1;

    let right_keys = right.keys(store)?;
    let right_values = right.values(store)?;
    let right_children = right.children(store)?;
    let new_right_children = if left_children.size() == 0 {
        right_children
    } else {
        right_children.splice_in(0, left_children.get(left_children.size() - 1))
    };

    right.update(
        store,
        right_keys.splice_in(0, parent_keys.get(separator)),
        right_values.splice_in(0, parent_values.get(separator)),
        new_right_children,
    )?;
    left.update(
        store,
        left_keys.slice(0, last),
        left_values.slice(0, last),
        left_children.without_last(),
    )?;
    parent.update(
        store,
        parent_keys.with(separator, left_keys.get(last)),
        parent_values.with(separator, left_values.get(last)),
        children,
    )
}

/// Move the right sibling's first key through the parent separator into the
/// left sibling (and its first child across, for internals).
fn rotate_counter_clockwise<S, N: TreeNode<S>>(
    store: &mut S,
    parent: &N,
    separator: usize,
) -> Result<()> {
    let parent_keys = parent.keys(store)?;
    let parent_values = parent.values(store)?;
    let children = parent.children(store)?;
    let left = children.get(separator);
    let right = children.get(separator + 1);

    let left_keys = left.keys(store)?;
    let left_values = left.values(store)?;
    let left_children = left.children(store)?;

    let right_keys = right.keys(store)?;
    let right_values = right.values(store)?;
    let right_children = right.children(store)?;
    let new_left_children = if right_children.size() == 0 {
        left_children
    } else {
        left_children.splice_in(left_children.size(), right_children.get(0))
    };

    left.update(
        store,
        left_keys.splice_in(left_keys.size(), parent_keys.get(separator)),
        left_values.splice_in(left_values.size(), parent_values.get(separator)),
        new_left_children,
    )?;
    right.update(
        store,
        right_keys.without_first(),
        right_values.without_first(),
        right_children.without_first(),
    )?;
    parent.update(
        store,
        parent_keys.with(separator, right_keys.get(0)),
        parent_values.with(separator, right_values.get(0)),
        children,
    )
}

/// Merge the children either side of `separator` into the left one; the
/// separator key/value joins the merged child and the parent shrinks by one
/// key and one child. The right child is left detached.
fn merge<S, N: TreeNode<S>>(store: &mut S, parent: &N, separator: usize) -> Result<()> {
    let parent_keys = parent.keys(store)?;
    let parent_values = parent.values(store)?;
    let children = parent.children(store)?;
    let left = children.get(separator);
    let right = children.get(separator + 1);

    let merged_keys = left
        .keys(store)?
        .concat(&Seq::wrap(vec![parent_keys.get(separator)]))
        .concat(&right.keys(store)?);
    let merged_values = left
        .values(store)?
        .concat(&Seq::wrap(vec![parent_values.get(separator)]))
        .concat(&right.values(store)?);
    let merged_children = left.children(store)?.concat(&right.children(store)?);

    left.update(store, merged_keys, merged_values, merged_children)?;
    parent.update(
        store,
        parent_keys.splice_out(separator),
        parent_values.splice_out(separator),
        children.splice_out(separator + 1),
    )
}

pub(crate) fn for_each<S, N, F>(store: &S, node: &N, f: &mut F) -> Result<()>
where
    N: TreeNode<S>,
    F: FnMut(&[u8], &N::Value) -> Result<()>,
{
    let keys = node.keys(store)?;
    let values = node.values(store)?;
    let children = node.children(store)?;
    for index in 0..keys.size() {
        if children.size() != 0 {
            for_each(store, &children.get(index), f)?;
        }
        f(&keys.get(index), &values.get(index))?;
    }
    if children.size() != 0 {
        for_each(store, &children.get(keys.size()), f)?;
    }
    Ok(())
}

/// Walk the whole tree checking structural invariants, panicking on any
/// violation. Intended for tests.
pub(crate) fn verify<S, N: TreeNode<S>>(config: &TreeConfig, store: &S, root: &N) -> Result<()> {
    verify_node(config, store, root, true, None, None)?;
    Ok(())
}

fn verify_node<S, N: TreeNode<S>>(
    config: &TreeConfig,
    store: &S,
    node: &N,
    is_root: bool,
    lower: Option<&[u8]>,
    upper: Option<&[u8]>,
) -> Result<usize> {
    let keys = node.keys(store)?.to_vec();
    let values = node.values(store)?;
    let children = node.children(store)?;

    assert_eq!(keys.len(), values.size(), "key and value counts differ");
    assert!(
        children.size() == 0 || children.size() == keys.len() + 1,
        "{} children do not fit {} keys",
        children.size(),
        keys.len()
    );
    if children.size() == 0 {
        assert!(
            keys.len() <= config.max_leaf_keys(),
            "leaf holds {} keys, more than {}",
            keys.len(),
            config.max_leaf_keys()
        );
        if !is_root {
            assert!(
                keys.len() >= config.min_leaf_keys(),
                "leaf holds {} keys, fewer than {}",
                keys.len(),
                config.min_leaf_keys()
            );
        }
    } else {
        assert!(
            children.size() <= config.max_children(),
            "node holds {} children, more than {}",
            children.size(),
            config.max_children()
        );
        if !is_root {
            assert!(
                children.size() >= config.min_children(),
                "node holds {} children, fewer than {}",
                children.size(),
                config.min_children()
            );
        }
    }

    for (index, key) in keys.iter().enumerate() {
        if index > 0 {
            assert!(
                config.compare(&keys[index - 1], key) == Ordering::Less,
                "keys out of order"
            );
        }
        if let Some(lower) = lower {
            assert!(config.compare(lower, key) == Ordering::Less, "key under lower bound");
        }
        if let Some(upper) = upper {
            assert!(config.compare(key, upper) == Ordering::Less, "key over upper bound");
        }
    }

    if children.size() == 0 {
        return Ok(0);
    }
    let mut depth = 0;
    for index in 0..children.size() {
        let child_lower = if index == 0 {
            lower
        } else {
            Some(keys[index - 1].as_slice())
        };
        let child_upper = if index == keys.len() {
            upper
        } else {
            Some(keys[index].as_slice())
        };
        let child_depth = verify_node(
            config,
            store,
            &children.get(index),
            false,
            child_lower,
            child_upper,
        )?;
        if index == 0 {
            depth = child_depth;
        } else {
            assert_eq!(depth, child_depth, "leaves at different depths");
        }
    }
    Ok(depth + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::{MemNode, NullStore};
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn config(order: usize) -> TreeConfig {
        TreeConfig::new(order, lexicographic)
    }

    fn key(byte: u8) -> Key {
        vec![byte]
    }

    fn insert_all(
        config: &TreeConfig,
        store: &mut NullStore,
        root: &MemNode<u64>,
        bytes: &[u8],
    ) {
        for &byte in bytes {
            put(config, store, root, &key(byte), u64::from(byte)).unwrap();
            verify(config, store, root).unwrap();
        }
    }

    fn keys_of(store: &NullStore, node: &MemNode<u64>) -> Vec<Key> {
        node.keys(store).unwrap().to_vec()
    }

    fn children_of(store: &NullStore, node: &MemNode<u64>) -> Vec<MemNode<u64>> {
        node.children(store).unwrap().to_vec()
    }

    fn collect(store: &NullStore, node: &MemNode<u64>) -> Vec<(Key, u64)> {
        let mut out = Vec::new();
        for_each(store, node, &mut |key, value| {
            out.push((key.to_vec(), *value));
            Ok(())
        })
        .unwrap();
        out
    }

    #[test]
    fn test_probe() {
        let cfg = config(3);
        let keys = Seq::wrap(vec![key(2), key(4), key(6)]);
        assert_eq!(probe(&cfg, &keys, &key(1)), (0, false));
        assert_eq!(probe(&cfg, &keys, &key(2)), (0, true));
        assert_eq!(probe(&cfg, &keys, &key(3)), (1, false));
        assert_eq!(probe(&cfg, &keys, &key(6)), (2, true));
        assert_eq!(probe(&cfg, &keys, &key(7)), (3, false));
        assert_eq!(probe(&cfg, &Seq::empty(), &key(1)), (0, false));
    }

    #[test]
    fn test_lexicographic_order() {
        assert_eq!(lexicographic(&[], &[]), Ordering::Equal);
        assert_eq!(lexicographic(&[], &[1]), Ordering::Less);
        assert_eq!(lexicographic(&[0], &[1]), Ordering::Less);
        assert_eq!(lexicographic(&[0], &[0, 0]), Ordering::Less);
        assert_eq!(lexicographic(&[0], &[]), Ordering::Greater);
        assert_eq!(lexicographic(&[1], &[0]), Ordering::Greater);
    }

    #[test]
    fn test_empty_tree() {
        let cfg = config(3);
        let store = NullStore;
        let root = MemNode::<u64>::empty();
        assert_eq!(size(&store, &root).unwrap(), 0);
        assert_eq!(find(&cfg, &store, &root, &key(1)).unwrap(), None);
        assert!(collect(&store, &root).is_empty());
    }

    // Order 3: inserting 0..=2 splits the root around key 1; inserting 3
    // lands in the right leaf.
    #[test]
    fn test_minimal_split() {
        let cfg = config(3);
        let mut store = NullStore;
        let root = MemNode::<u64>::empty();
        insert_all(&cfg, &mut store, &root, &[0, 1, 2]);

        assert_eq!(keys_of(&store, &root), vec![key(1)]);
        let children = children_of(&store, &root);
        assert_eq!(children.len(), 2);
        assert_eq!(keys_of(&store, &children[0]), vec![key(0)]);
        assert_eq!(keys_of(&store, &children[1]), vec![key(2)]);

        insert_all(&cfg, &mut store, &root, &[3]);
        let children = children_of(&store, &root);
        assert_eq!(keys_of(&store, &children[1]), vec![key(2), key(3)]);
        assert_eq!(size(&store, &root).unwrap(), 4);
        assert_eq!(
            collect(&store, &root),
            vec![(key(0), 0), (key(1), 1), (key(2), 2), (key(3), 3)]
        );
    }

    // Order 3: from [[0] 1 [2] 3 [4]], removing 0 merges the left pair.
    #[test]
    fn test_remove_with_merge() {
        let cfg = config(3);
        let mut store = NullStore;
        let root = MemNode::<u64>::empty();
        insert_all(&cfg, &mut store, &root, &[0, 1, 2, 3, 4]);

        assert_eq!(keys_of(&store, &root), vec![key(1), key(3)]);
        remove(&cfg, &mut store, &root, &key(0)).unwrap();
        verify(&cfg, &store, &root).unwrap();

        assert_eq!(keys_of(&store, &root), vec![key(3)]);
        let children = children_of(&store, &root);
        assert_eq!(keys_of(&store, &children[0]), vec![key(1), key(2)]);
        assert_eq!(keys_of(&store, &children[1]), vec![key(4)]);
        assert_eq!(size(&store, &root).unwrap(), 4);
        assert_eq!(
            collect(&store, &root)
                .into_iter()
                .map(|(k, _)| k)
                .collect::<Vec<_>>(),
            vec![key(1), key(2), key(3), key(4)]
        );
    }

    #[test]
    fn test_remove_with_clockwise_rotation() {
        let cfg = config(3);
        let mut store = NullStore;
        let root = MemNode::<u64>::empty();
        // Builds [[0, 1] 2 [3]].
        insert_all(&cfg, &mut store, &root, &[3, 2, 1, 0]);
        assert_eq!(keys_of(&store, &root), vec![key(2)]);

        remove(&cfg, &mut store, &root, &key(3)).unwrap();
        verify(&cfg, &store, &root).unwrap();
        assert_eq!(keys_of(&store, &root), vec![key(1)]);
        let children = children_of(&store, &root);
        assert_eq!(keys_of(&store, &children[0]), vec![key(0)]);
        assert_eq!(keys_of(&store, &children[1]), vec![key(2)]);
    }

    #[test]
    fn test_remove_with_counter_clockwise_rotation() {
        let cfg = config(3);
        let mut store = NullStore;
        let root = MemNode::<u64>::empty();
        // Builds [[0] 1 [2, 3]].
        insert_all(&cfg, &mut store, &root, &[0, 1, 2, 3]);

        remove(&cfg, &mut store, &root, &key(0)).unwrap();
        verify(&cfg, &store, &root).unwrap();
        assert_eq!(keys_of(&store, &root), vec![key(2)]);
        let children = children_of(&store, &root);
        assert_eq!(keys_of(&store, &children[0]), vec![key(1)]);
        assert_eq!(keys_of(&store, &children[1]), vec![key(3)]);
    }

    #[test]
    fn test_remove_internal_key_uses_predecessor() {
        let cfg = config(3);
        let mut store = NullStore;
        let root = MemNode::<u64>::empty();
        insert_all(&cfg, &mut store, &root, &[0, 1, 2, 3]);

        // 1 sits in the root; its predecessor 0 replaces it.
        remove(&cfg, &mut store, &root, &key(1)).unwrap();
        verify(&cfg, &store, &root).unwrap();
        assert_eq!(
            collect(&store, &root)
                .into_iter()
                .map(|(k, _)| k)
                .collect::<Vec<_>>(),
            vec![key(0), key(2), key(3)]
        );
        assert_eq!(find(&cfg, &store, &root, &key(1)).unwrap(), None);
    }

    #[test]
    fn test_replace_keeps_size() {
        let cfg = config(3);
        let mut store = NullStore;
        let root = MemNode::<u64>::empty();
        put(&cfg, &mut store, &root, &key(5), 1).unwrap();
        assert_eq!(find(&cfg, &store, &root, &key(5)).unwrap(), Some(1));

        put(&cfg, &mut store, &root, &key(5), 2).unwrap();
        assert_eq!(size(&store, &root).unwrap(), 1);
        assert_eq!(find(&cfg, &store, &root, &key(5)).unwrap(), Some(2));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let cfg = config(3);
        let mut store = NullStore;
        let root = MemNode::<u64>::empty();
        insert_all(&cfg, &mut store, &root, &[1, 2, 3]);
        remove(&cfg, &mut store, &root, &key(9)).unwrap();
        verify(&cfg, &store, &root).unwrap();
        assert_eq!(size(&store, &root).unwrap(), 3);
    }

    #[test]
    fn test_remove_last_key_leaves_valid_empty_root() {
        let cfg = config(3);
        let mut store = NullStore;
        let root = MemNode::<u64>::empty();
        insert_all(&cfg, &mut store, &root, &[4]);
        remove(&cfg, &mut store, &root, &key(4)).unwrap();
        verify(&cfg, &store, &root).unwrap();
        assert_eq!(size(&store, &root).unwrap(), 0);
        assert_eq!(find(&cfg, &store, &root, &key(4)).unwrap(), None);
    }

    #[test]
    fn test_grow_and_shrink_sequential() {
        let cfg = config(3);
        let mut store = NullStore;
        let root = MemNode::<u64>::empty();
        let bytes: Vec<u8> = (0..32).collect();
        insert_all(&cfg, &mut store, &root, &bytes);
        assert_eq!(size(&store, &root).unwrap(), 32);

        for &byte in &bytes {
            remove(&cfg, &mut store, &root, &key(byte)).unwrap();
            verify(&cfg, &store, &root).unwrap();
            assert_eq!(find(&cfg, &store, &root, &key(byte)).unwrap(), None);
        }
        assert_eq!(size(&store, &root).unwrap(), 0);
    }

    // Any insertion order yields the same sorted traversal, for several
    // orders of tree.
    #[test]
    fn test_permutations_sort_identically() {
        for &order in &[3usize, 4, 5, 8] {
            let cfg = config(order);
            for seed in 0..4u64 {
                let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
                let mut bytes: Vec<u8> = (0..64).collect();
                bytes.shuffle(&mut rng);

                let mut store = NullStore;
                let root = MemNode::<u64>::empty();
                insert_all(&cfg, &mut store, &root, &bytes);

                let walked: Vec<Key> = collect(&store, &root)
                    .into_iter()
                    .map(|(k, _)| k)
                    .collect();
                let expected: Vec<Key> = (0..64).map(key).collect();
                assert_eq!(walked, expected);
                assert_eq!(size(&store, &root).unwrap(), 64);

                let mut to_remove = bytes.clone();
                to_remove.shuffle(&mut rng);
                for &byte in &to_remove {
                    remove(&cfg, &mut store, &root, &key(byte)).unwrap();
                    verify(&cfg, &store, &root).unwrap();
                }
                assert_eq!(size(&store, &root).unwrap(), 0);
            }
        }
    }

    #[test]
    fn test_custom_comparator_reverses_traversal() {
        fn reversed(a: &[u8], b: &[u8]) -> Ordering {
            b.cmp(a)
        }
        let cfg = TreeConfig::new(3, reversed);
        let mut store = NullStore;
        let root = MemNode::<u64>::empty();
        for byte in 0..8u8 {
            put(&cfg, &mut store, &root, &key(byte), u64::from(byte)).unwrap();
            verify(&cfg, &store, &root).unwrap();
        }
        let walked: Vec<Key> = collect(&store, &root)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        let expected: Vec<Key> = (0..8).rev().map(key).collect();
        assert_eq!(walked, expected);
    }
}
