// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use crate::error::StoreError;
use crate::object::{Object, ObjectHandle};

/// A transactional object store.
///
/// Every call may report [`StoreError::RestartNeeded`], meaning the
/// enclosing transaction has to be re-run; see [`transact`]. Writes within
/// one transaction become visible atomically, which is the store's own
/// responsibility.
pub trait Store {
    /// Handle type naming objects in this store.
    type Handle: ObjectHandle;

    /// Allocate a new object holding `payload` and `refs`.
    fn create(
        &mut self,
        payload: Vec<u8>,
        refs: Vec<Self::Handle>,
    ) -> Result<Self::Handle, StoreError>;

    /// Read the payload and references of the object named by `handle`.
    fn read(&self, handle: &Self::Handle) -> Result<Object<Self::Handle>, StoreError>;

    /// Replace the payload and references of the object named by `handle`.
    fn write(
        &mut self,
        handle: &Self::Handle,
        payload: Vec<u8>,
        refs: Vec<Self::Handle>,
    ) -> Result<(), StoreError>;
}

/// Errors able to carry the store's restart-needed signal.
pub trait Restartable {
    /// Return whether this failure is the restart-needed signal.
    fn is_restart(&self) -> bool;
}

/// Run `body` against the store, re-running it from the top whenever it
/// fails with the restart-needed signal.
///
/// The closure must hold no decoded state from a previous attempt; every
/// attempt re-reads whatever it needs.
pub fn transact<S, T, E, F>(store: &mut S, mut body: F) -> Result<T, E>
where
    S: Store,
    E: Restartable,
    F: FnMut(&mut S) -> Result<T, E>,
{
    loop {
        match body(store) {
            Err(ref err) if err.is_restart() => continue,
            result => return result,
        }
    }
}

/// Read-only variant of [`transact`]; the result may borrow from the store.
pub fn transact_read<'s, S, T, E, F>(store: &'s S, mut body: F) -> Result<T, E>
where
    S: Store,
    E: Restartable,
    F: FnMut(&'s S) -> Result<T, E>,
{
    loop {
        match body(store) {
            Err(ref err) if err.is_restart() => continue,
            result => return result,
        }
    }
}
