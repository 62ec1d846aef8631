// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! The transactional object store contract, and the shared utilities the
//! persistent collections are built on: the transaction driver, the lazy
//! sequence view and the MessagePack framing helpers.

#![deny(missing_docs)]

pub mod codec;
mod error;
mod impls;
mod object;
mod seq;
mod store;

pub use self::error::{CodecError, StoreError};
pub use self::impls::{FailFn, FailStore, LogStore};
pub use self::object::{Object, ObjectHandle};
pub use self::seq::Seq;
pub use self::store::{transact, transact_read, Restartable, Store};
