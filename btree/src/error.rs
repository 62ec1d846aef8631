// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use objstore::Restartable;

pub(crate) type Result<T, E = BTreeError> = std::result::Result<T, E>;

/// The B-tree error.
#[derive(Debug, thiserror::Error)]
pub enum BTreeError {
    /// A node payload did not match the node encoding.
    #[error("{0}")]
    Codec(#[from] objstore::CodecError),
    /// Underlying store failure, including the restart signal.
    #[error(transparent)]
    Store(#[from] objstore::StoreError),
}

impl Restartable for BTreeError {
    fn is_restart(&self) -> bool {
        match self {
            BTreeError::Store(err) => err.is_restart(),
            BTreeError::Codec(_) => false,
        }
    }
}
