// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use std::hash::Hasher;

use siphasher::sip::SipHasher24;

/// Hash `key` under the map's persisted 16-byte hash key.
pub(crate) fn keyed_hash(hash_key: &[u8; 16], key: &[u8]) -> u64 {
    let mut hasher = SipHasher24::new_with_key(hash_key);
    hasher.write(key);
    hasher.finish()
}
