// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use crate::error::StoreError;
use crate::object::Object;
use crate::store::Store;

/// The user-provided fail function.
pub trait FailFn: Fn(&str) -> Result<(), StoreError> {}

impl<F: Fn(&str) -> Result<(), StoreError>> FailFn for F {}

/// FailStore is a store which fails according to a user-provided function.
///
/// Tests use it to inject restart-needed signals and store failures at
/// chosen points.
pub struct FailStore<F: FailFn, S: Store> {
    fail_fn: F,
    store: S,
}

impl<F: FailFn, S: Store> FailStore<F, S> {
    /// Create a new store with the given fail function.
    /// The `fail_fn` is called with a different string per store function.
    pub fn new(fail_fn: F, store: S) -> Self {
        Self { fail_fn, store }
    }
}

impl<F: FailFn, S: Store> Store for FailStore<F, S> {
    type Handle = S::Handle;

    fn create(
        &mut self,
        payload: Vec<u8>,
        refs: Vec<Self::Handle>,
    ) -> Result<Self::Handle, StoreError> {
        (self.fail_fn)("create")?;
        self.store.create(payload, refs)
    }

    fn read(&self, handle: &Self::Handle) -> Result<Object<Self::Handle>, StoreError> {
        (self.fail_fn)("read")?;
        self.store.read(handle)
    }

    fn write(
        &mut self,
        handle: &Self::Handle,
        payload: Vec<u8>,
        refs: Vec<Self::Handle>,
    ) -> Result<(), StoreError> {
        (self.fail_fn)("write")?;
        self.store.write(handle, payload, refs)
    }
}
