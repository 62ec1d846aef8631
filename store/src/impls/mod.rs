// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

mod fail;
mod log;

pub use self::fail::{FailFn, FailStore};
pub use self::log::LogStore;
