// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use std::cell::RefCell;
use std::rc::Rc;

use objstore::Seq;

use crate::error::Result;
use crate::node::{Key, TreeNode};

/// Store stand-in for the in-memory node backing; it holds nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStore;

struct Inner<V> {
    keys: Vec<Key>,
    values: Vec<V>,
    children: Vec<MemNode<V>>,
}

/// A node holding its keys, values and children in owned memory.
///
/// This is the test-harness twin of the persistent node: the same tree
/// algorithm drives both. Cloning shares the node, so sequences of children
/// keep node identity.
pub struct MemNode<V> {
    inner: Rc<RefCell<Inner<V>>>,
}

impl<V> Clone for MemNode<V> {
    fn clone(&self) -> Self {
        MemNode {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: Clone + 'static> MemNode<V> {
    /// Create an empty root node.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    fn new(keys: Vec<Key>, values: Vec<V>, children: Vec<MemNode<V>>) -> Self {
        MemNode {
            inner: Rc::new(RefCell::new(Inner {
                keys,
                values,
                children,
            })),
        }
    }
}

impl<V: Clone + 'static> TreeNode<NullStore> for MemNode<V> {
    type Value = V;

    fn keys(&self, _: &NullStore) -> Result<Seq<Key>> {
        Ok(Seq::wrap(self.inner.borrow().keys.clone()))
    }

    fn values(&self, _: &NullStore) -> Result<Seq<V>> {
        Ok(Seq::wrap(self.inner.borrow().values.clone()))
    }

    fn children(&self, _: &NullStore) -> Result<Seq<Self>> {
        Ok(Seq::wrap(self.inner.borrow().children.clone()))
    }

    fn update(
        &self,
        _: &mut NullStore,
        keys: Seq<Key>,
        values: Seq<V>,
        children: Seq<Self>,
    ) -> Result<()> {
        let keys = keys.to_vec();
        let values = values.to_vec();
        let children = children.to_vec();
        let mut inner = self.inner.borrow_mut();
        inner.keys = keys;
        inner.values = values;
        inner.children = children;
        Ok(())
    }

    fn create_sibling(
        &self,
        _: &mut NullStore,
        keys: Seq<Key>,
        values: Seq<V>,
        children: Seq<Self>,
    ) -> Result<Self> {
        Ok(MemNode::new(keys.to_vec(), values.to_vec(), children.to_vec()))
    }
}
