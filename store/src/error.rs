// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use crate::store::Restartable;

/// Failure reported by the object store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The enclosing transaction must be restarted; the caller stops work
    /// and the transaction driver re-runs the closure from the top.
    #[error("transaction restart required")]
    RestartNeeded,
    /// Any other store failure, surfaced verbatim.
    #[error("{0}")]
    Store(#[from] anyhow::Error),
}

impl Restartable for StoreError {
    fn is_restart(&self) -> bool {
        matches!(self, StoreError::RestartNeeded)
    }
}

/// Error raised when a payload does not match its expected encoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// MessagePack-level read failure.
    #[error("{0}")]
    Read(String),
    /// Bytes were left over after the payload was fully decoded.
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
    /// A map payload carried a field this decoder does not know.
    #[error("unknown field `{0}`")]
    UnknownField(String),
    /// A map payload carried the same field twice.
    #[error("duplicate field `{0}`")]
    DuplicateField(String),
    /// A map payload is missing a required field.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// The payload decoded, but its structure is not valid for its object.
    #[error("{0}")]
    Invalid(String),
}
