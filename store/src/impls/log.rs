// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use log::info;

use crate::error::StoreError;
use crate::object::Object;
use crate::store::Store;

/// LogStore logs all accesses through the store.
#[derive(Clone, Debug)]
pub struct LogStore<S: Store> {
    name: String,
    store: S,
}

impl<S: Store> LogStore<S> {
    /// Create a new LogStore.
    pub fn new<N: Into<String>>(name: N, store: S) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }
}

impl<S: Store> Store for LogStore<S> {
    type Handle = S::Handle;

    fn create(
        &mut self,
        payload: Vec<u8>,
        refs: Vec<Self::Handle>,
    ) -> Result<Self::Handle, StoreError> {
        info!(
            "{}: create {} payload bytes, {} refs",
            self.name,
            payload.len(),
            refs.len()
        );
        self.store.create(payload, refs)
    }

    fn read(&self, handle: &Self::Handle) -> Result<Object<Self::Handle>, StoreError> {
        info!("{}: read {:?}", self.name, handle);
        self.store.read(handle)
    }

    fn write(
        &mut self,
        handle: &Self::Handle,
        payload: Vec<u8>,
        refs: Vec<Self::Handle>,
    ) -> Result<(), StoreError> {
        info!(
            "{}: write {:?} - {} payload bytes, {} refs",
            self.name,
            handle,
            payload.len(),
            refs.len()
        );
        self.store.write(handle, payload, refs)
    }
}
