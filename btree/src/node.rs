// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use std::cell::RefCell;
use std::rc::Rc;

use objstore::{codec, CodecError, Object, ObjectHandle, Seq, Store};

use crate::error::Result;

/// A key is an opaque byte string.
pub type Key = Vec<u8>;

/// The node contract the tree algorithm is written against.
///
/// A node owns three parallel sequences: keys, values and children. Leaves
/// are the nodes with no children. `update` replaces all three at once,
/// writing through to any backing store; `create_sibling` allocates a fresh
/// peer node of the same flavour.
pub trait TreeNode<S>: Clone + 'static {
    /// Value type held against each key.
    type Value: Clone + 'static;

    /// Keys held by this node, in comparator order.
    fn keys(&self, store: &S) -> Result<Seq<Key>>;

    /// Values paired with `keys`.
    fn values(&self, store: &S) -> Result<Seq<Self::Value>>;

    /// Child nodes; empty for leaves, otherwise one more than the keys.
    fn children(&self, store: &S) -> Result<Seq<Self>>;

    /// Atomically replace keys, values and children.
    fn update(
        &self,
        store: &mut S,
        keys: Seq<Key>,
        values: Seq<Self::Value>,
        children: Seq<Self>,
    ) -> Result<()>;

    /// Allocate a fresh peer node.
    fn create_sibling(
        &self,
        store: &mut S,
        keys: Seq<Key>,
        values: Seq<Self::Value>,
        children: Seq<Self>,
    ) -> Result<Self>;
}

#[derive(Clone)]
struct Content<H> {
    keys: Seq<Key>,
    values: Seq<H>,
    children: Seq<H>,
}

/// A node backed by one store object.
///
/// The payload holds the keys; the object's refs hold the values followed
/// by the child handles. Content is decoded on first access and cached for
/// the life of this node object, which never outlives one transaction
/// attempt.
pub struct PersistNode<H: ObjectHandle> {
    handle: H,
    content: Rc<RefCell<Option<Content<H>>>>,
}

impl<H: ObjectHandle> Clone for PersistNode<H> {
    fn clone(&self) -> Self {
        PersistNode {
            handle: self.handle.clone(),
            content: Rc::clone(&self.content),
        }
    }
}

impl<H: ObjectHandle> PersistNode<H> {
    /// Wrap a store handle; nothing is read until the node is used.
    pub fn open(handle: H) -> Self {
        PersistNode {
            handle,
            content: Rc::new(RefCell::new(None)),
        }
    }

    /// Handle of the backing object.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    fn load<S: Store<Handle = H>>(&self, store: &S) -> Result<Content<H>> {
        if let Some(content) = &*self.content.borrow() {
            return Ok(content.clone());
        }
        let object = store.read(&self.handle)?;
        let content = decode_node(object)?;
        *self.content.borrow_mut() = Some(content.clone());
        Ok(content)
    }
}

/// Split a node object into its decoded content: the payload is an array of
/// key bins, the refs are the values followed by the child handles.
fn decode_node<H: ObjectHandle>(object: Object<H>) -> Result<Content<H>, CodecError> {
    let keys = codec::decode_bin_array(&object.payload)?;
    let key_count = keys.len();
    if object.refs.len() < key_count {
        return Err(CodecError::Invalid(format!(
            "{} refs cannot hold {} values",
            object.refs.len(),
            key_count
        )));
    }
    let child_count = object.refs.len() - key_count;
    if child_count != 0 && child_count != key_count + 1 {
        return Err(CodecError::Invalid(format!(
            "{} child references do not fit {} keys",
            child_count, key_count
        )));
    }
    let mut values = object.refs;
    let children = values.split_off(key_count);
    Ok(Content {
        keys: Seq::wrap(keys),
        values: Seq::wrap(values),
        children: Seq::wrap(children),
    })
}

fn encode_refs<H: ObjectHandle>(values: &Seq<H>, child_handles: &Seq<H>) -> Vec<H> {
    let mut refs = values.to_vec();
    refs.extend(child_handles.to_vec());
    refs
}

impl<S: Store> TreeNode<S> for PersistNode<S::Handle> {
    type Value = S::Handle;

    fn keys(&self, store: &S) -> Result<Seq<Key>> {
        Ok(self.load(store)?.keys)
    }

    fn values(&self, store: &S) -> Result<Seq<S::Handle>> {
        Ok(self.load(store)?.values)
    }

    fn children(&self, store: &S) -> Result<Seq<Self>> {
        let children = self.load(store)?.children;
        Ok(children.map(|handle| PersistNode::open(handle.clone())))
    }

    fn update(
        &self,
        store: &mut S,
        keys: Seq<Key>,
        values: Seq<S::Handle>,
        children: Seq<Self>,
    ) -> Result<()> {
        let payload = codec::encode_bin_array(&keys.to_vec());
        let child_handles = children.map(|child| child.handle.clone());
        store.write(&self.handle, payload, encode_refs(&values, &child_handles))?;
        *self.content.borrow_mut() = Some(Content {
            keys,
            values,
            children: child_handles,
        });
        Ok(())
    }

    fn create_sibling(
        &self,
        store: &mut S,
        keys: Seq<Key>,
        values: Seq<S::Handle>,
        children: Seq<Self>,
    ) -> Result<Self> {
        let payload = codec::encode_bin_array(&keys.to_vec());
        let child_handles = children.map(|child| child.handle.clone());
        let handle = store.create(payload, encode_refs(&values, &child_handles))?;
        Ok(PersistNode {
            handle,
            content: Rc::new(RefCell::new(Some(Content {
                keys,
                values,
                children: child_handles,
            }))),
        })
    }
}
