// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! # B-tree
//!
//! An order-parameterised B-tree whose state is spread across objects of a
//! transactional store. The tree algorithm is written against a small node
//! contract and drives two backings: nodes persisted through store handles,
//! and plain in-memory nodes used as a test harness.

#![deny(missing_docs)]

mod btree;
mod cursor;
mod error;
mod mem;
mod node;
mod tree;

pub use self::btree::{BTree, DEFAULT_ORDER};
pub use self::cursor::Cursor;
pub use self::error::BTreeError;
pub use self::mem::{MemNode, NullStore};
pub use self::node::{Key, PersistNode, TreeNode};
pub use self::tree::{lexicographic, KeyCompare, TreeConfig};
