// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use objstore::{codec, transact, transact_read, Store};

use crate::cursor::Cursor;
use crate::error::{BTreeError, Result};
use crate::node::{Key, PersistNode};
use crate::tree::{self, lexicographic, TreeConfig};

/// The order of persistent trees unless configured otherwise.
pub const DEFAULT_ORDER: usize = 128;

/// An order-parameterised B-tree whose nodes are objects of a transactional
/// store.
///
/// Every operation runs as a transaction closure: when the store signals
/// that a restart is needed, the operation re-runs from the top with fresh
/// reads. The root object's handle stays the same across splits and merges,
/// so it can be persisted by external code.
pub struct BTree<S: Store> {
    store: S,
    root: S::Handle,
    config: TreeConfig,
}

impl<S: Store> BTree<S> {
    /// Create an empty tree with the default order and key comparator,
    /// allocating its root object inside a transaction.
    pub fn create_empty(store: S) -> Result<Self> {
        Self::create_with_config(store, TreeConfig::new(DEFAULT_ORDER, lexicographic))
    }

    /// Create an empty tree with a custom order and comparator.
    pub fn create_with_config(mut store: S, config: TreeConfig) -> Result<Self> {
        let root = transact(&mut store, |store| {
            store
                .create(codec::encode_bin_array(&[]), Vec::new())
                .map_err(BTreeError::from)
        })?;
        Ok(Self {
            store,
            root,
            config,
        })
    }

    /// Reopen a tree from a previously obtained root handle, with the
    /// default order and comparator.
    pub fn from_root(store: S, root: S::Handle) -> Self {
        Self::from_root_with_config(store, root, TreeConfig::new(DEFAULT_ORDER, lexicographic))
    }

    /// Reopen a tree from its root handle with an explicit config.
    ///
    /// The order is not persisted in the root: every participant reading
    /// the same root must agree on it.
    pub fn from_root_with_config(store: S, root: S::Handle, config: TreeConfig) -> Self {
        Self {
            store,
            root,
            config,
        }
    }

    /// Handle of the root object.
    pub fn root_handle(&self) -> &S::Handle {
        &self.root
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Total number of keys in the tree.
    pub fn size(&self) -> Result<u64> {
        let root = self.root.clone();
        transact_read(&self.store, move |store| {
            tree::size(store, &PersistNode::open(root.clone()))
        })
    }

    /// Look up the value held against `key`.
    pub fn find(&self, key: &[u8]) -> Result<Option<S::Handle>> {
        let config = self.config;
        let root = self.root.clone();
        transact_read(&self.store, move |store| {
            tree::find(&config, store, &PersistNode::open(root.clone()), key)
        })
    }

    /// Insert `value` against `key`, replacing any existing value.
    pub fn put(&mut self, key: &[u8], value: S::Handle) -> Result<()> {
        let config = self.config;
        let root = self.root.clone();
        transact(&mut self.store, move |store| {
            tree::put(
                &config,
                store,
                &PersistNode::open(root.clone()),
                key,
                value.clone(),
            )
        })
    }

    /// Insert many pairs.
    pub fn batch_put<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (Key, S::Handle)>,
    {
        for (key, value) in entries {
            self.put(&key, value)?;
        }
        Ok(())
    }

    /// Remove `key`; absent keys are a no-op.
    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        let config = self.config;
        let root = self.root.clone();
        transact(&mut self.store, move |store| {
            tree::remove(&config, store, &PersistNode::open(root.clone()), key)
        })
    }

    /// Visit every `(key, value)` pair in comparator order. Re-runs from
    /// the top if the store requests a restart.
    pub fn for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&[u8], &S::Handle) -> Result<()>,
    {
        let root = self.root.clone();
        transact_read(&self.store, move |store| {
            tree::for_each(store, &PersistNode::open(root.clone()), &mut f)
        })
    }

    /// Cursor positioned at the smallest key.
    pub fn cursor(&self) -> Result<Cursor<'_, S, PersistNode<S::Handle>>> {
        let root = self.root.clone();
        transact_read(&self.store, move |store| {
            Cursor::first(store, PersistNode::open(root.clone()))
        })
    }

    /// Cursor positioned at the least key `>= key`.
    pub fn cursor_from(&self, key: &[u8]) -> Result<Cursor<'_, S, PersistNode<S::Handle>>> {
        let config = self.config;
        let root = self.root.clone();
        transact_read(&self.store, move |store| {
            Cursor::from_key(config, store, PersistNode::open(root.clone()), key)
        })
    }

    /// Walk the whole tree checking structural invariants, panicking on any
    /// violation. Intended for tests.
    pub fn verify(&self) -> Result<()> {
        let config = self.config;
        let root = self.root.clone();
        transact_read(&self.store, move |store| {
            tree::verify(&config, store, &PersistNode::open(root.clone()))
        })
    }
}
