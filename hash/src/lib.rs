// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! # Linear hash
//!
//! An incrementally splitting hash map whose buckets are singly linked
//! chains of objects in a transactional store. Keys are byte strings
//! compared by equality; the hash is keyed by 16 random bytes persisted in
//! the map's root object.

#![deny(missing_docs)]

mod bucket;
mod error;
mod hash;
mod map;
mod root;

pub use self::bucket::BUCKET_CAPACITY;
pub use self::error::LinearHashError;
pub use self::map::{LinearHash, Stats};
