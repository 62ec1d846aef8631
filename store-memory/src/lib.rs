// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! An object store living in memory, which is generally intended for tests.

#![deny(missing_docs)]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::anyhow;

use objstore::{Object, ObjectHandle, Store, StoreError};

pub(crate) type Result<T> = std::result::Result<T, StoreError>;

/// Handle naming an object inside a [`MemoryStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryHandle(usize);

impl ObjectHandle for MemoryHandle {
    fn same_referent(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// An object store living in memory.
///
/// Cloning the store shares the backing objects, so a test can keep an
/// inspection handle while a collection owns the store. Like the handles it
/// hands out, the store is bound to one thread.
#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Rc<RefCell<Vec<Object<MemoryHandle>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects ever created.
    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    /// Whether no object was ever created.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    type Handle = MemoryHandle;

    fn create(&mut self, payload: Vec<u8>, refs: Vec<MemoryHandle>) -> Result<MemoryHandle> {
        let mut objects = self.objects.borrow_mut();
        let handle = MemoryHandle(objects.len());
        objects.push(Object { payload, refs });
        Ok(handle)
    }

    fn read(&self, handle: &MemoryHandle) -> Result<Object<MemoryHandle>> {
        self.objects
            .borrow()
            .get(handle.0)
            .cloned()
            .ok_or_else(|| StoreError::Store(anyhow!("no object for {:?}", handle)))
    }

    fn write(
        &mut self,
        handle: &MemoryHandle,
        payload: Vec<u8>,
        refs: Vec<MemoryHandle>,
    ) -> Result<()> {
        let mut objects = self.objects.borrow_mut();
        match objects.get_mut(handle.0) {
            Some(slot) => {
                *slot = Object { payload, refs };
                Ok(())
            }
            None => Err(StoreError::Store(anyhow!("no object for {:?}", handle))),
        }
    }
}
