// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use objstore::Restartable;

pub(crate) type Result<T, E = LinearHashError> = std::result::Result<T, E>;

/// The linear hash error.
#[derive(Debug, thiserror::Error)]
pub enum LinearHashError {
    /// A root or bucket payload did not match its encoding.
    #[error("{0}")]
    Codec(#[from] objstore::CodecError),
    /// Underlying store failure, including the restart signal.
    #[error(transparent)]
    Store(#[from] objstore::StoreError),
}

impl Restartable for LinearHashError {
    fn is_restart(&self) -> bool {
        match self {
            LinearHashError::Store(err) => err.is_restart(),
            LinearHashError::Codec(_) => false,
        }
    }
}
