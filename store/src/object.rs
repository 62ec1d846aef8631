// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use std::fmt;

/// A handle naming one object held by the store.
///
/// Handles compare by referent identity: two handles are the same iff they
/// name the same store object, regardless of the object's current content.
pub trait ObjectHandle: Clone + fmt::Debug + 'static {
    /// Return whether `self` and `other` name the same store object.
    fn same_referent(&self, other: &Self) -> bool;
}

/// The state of one store object: an opaque byte payload and an ordered
/// list of references to other store objects.
#[derive(Clone, Debug, PartialEq)]
pub struct Object<H> {
    /// Opaque byte payload.
    pub payload: Vec<u8>,
    /// Ordered references to other store objects.
    pub refs: Vec<H>,
}
