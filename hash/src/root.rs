// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use rmp::encode;

use objstore::{codec, CodecError, Object, ObjectHandle, Store};

use crate::bucket::BUCKET_CAPACITY;
use crate::error::Result;

/// Decoded root of a linear hash map: the occupancy counters and hash key
/// from the payload, plus the ordered top-level bucket handles from the
/// object's refs.
pub(crate) struct Root<H> {
    pub(crate) size: u64,
    pub(crate) bucket_count: u64,
    pub(crate) split_index: u64,
    pub(crate) mask_high: u64,
    pub(crate) mask_low: u64,
    pub(crate) hash_key: [u8; 16],
    pub(crate) buckets: Vec<H>,
}

impl<H: ObjectHandle> Root<H> {
    pub(crate) fn read<S: Store<Handle = H>>(store: &S, handle: &H) -> Result<Self> {
        let object = store.read(handle)?;
        Ok(Self::decode(object)?)
    }

    fn decode(object: Object<H>) -> Result<Self, CodecError> {
        let mut rd = object.payload.as_slice();
        let entries = codec::read_map_len(&mut rd)?;
        if entries != 6 {
            return Err(CodecError::Invalid(format!(
                "root map holds {} entries instead of 6",
                entries
            )));
        }

        let mut size = None;
        let mut bucket_count = None;
        let mut split_index = None;
        let mut mask_high = None;
        let mut mask_low = None;
        let mut hash_key = None;
        for _ in 0..entries {
            let field = codec::read_str(&mut rd)?;
            let slot = match field.as_str() {
                "Size" => &mut size,
                "BucketCount" => &mut bucket_count,
                "SplitIndex" => &mut split_index,
                "MaskHigh" => &mut mask_high,
                "MaskLow" => &mut mask_low,
                "HashKey" => {
                    if hash_key.is_some() {
                        return Err(CodecError::DuplicateField(field));
                    }
                    let raw = codec::read_bin(&mut rd)?;
                    if raw.len() != 16 {
                        return Err(CodecError::Invalid(format!(
                            "hash key holds {} bytes instead of 16",
                            raw.len()
                        )));
                    }
                    let mut key = [0u8; 16];
                    key.copy_from_slice(&raw);
                    hash_key = Some(key);
                    continue;
                }
                _ => return Err(CodecError::UnknownField(field)),
            };
            if slot.is_some() {
                return Err(CodecError::DuplicateField(field));
            }
            *slot = Some(codec::read_uint(&mut rd)?);
        }
        codec::expect_end(rd)?;

        Ok(Root {
            size: size.ok_or(CodecError::MissingField("Size"))?,
            bucket_count: bucket_count.ok_or(CodecError::MissingField("BucketCount"))?,
            split_index: split_index.ok_or(CodecError::MissingField("SplitIndex"))?,
            mask_high: mask_high.ok_or(CodecError::MissingField("MaskHigh"))?,
            mask_low: mask_low.ok_or(CodecError::MissingField("MaskLow"))?,
            hash_key: hash_key.ok_or(CodecError::MissingField("HashKey"))?,
            buckets: object.refs,
        })
    }

    pub(crate) fn encode_payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        encode::write_map_len(&mut buf, 6).unwrap();
        encode::write_str(&mut buf, "Size").unwrap();
        encode::write_uint(&mut buf, self.size).unwrap();
        encode::write_str(&mut buf, "BucketCount").unwrap();
        encode::write_uint(&mut buf, self.bucket_count).unwrap();
        encode::write_str(&mut buf, "SplitIndex").unwrap();
        encode::write_uint(&mut buf, self.split_index).unwrap();
        encode::write_str(&mut buf, "MaskHigh").unwrap();
        encode::write_uint(&mut buf, self.mask_high).unwrap();
        encode::write_str(&mut buf, "MaskLow").unwrap();
        encode::write_uint(&mut buf, self.mask_low).unwrap();
        encode::write_str(&mut buf, "HashKey").unwrap();
        encode::write_bin(&mut buf, &self.hash_key).unwrap();
        buf
    }

    pub(crate) fn write<S: Store<Handle = H>>(&self, store: &mut S, handle: &H) -> Result<()> {
        store.write(handle, self.encode_payload(), self.buckets.clone())?;
        Ok(())
    }

    /// Top-level bucket index for a hash code: the low mask decides, unless
    /// the addressed bucket was already split this generation, in which
    /// case the high mask applies.
    pub(crate) fn bucket_index(&self, hash: u64) -> usize {
        let low = hash & self.mask_low;
        if low >= self.split_index {
            low as usize
        } else {
            (hash & self.mask_high) as usize
        }
    }

    pub(crate) fn bucket_handle(&self, index: usize) -> Result<H, CodecError> {
        self.buckets.get(index).cloned().ok_or_else(|| {
            CodecError::Invalid(format!(
                "bucket index {} outside {} top-level buckets",
                index,
                self.buckets.len()
            ))
        })
    }

    pub(crate) fn apply_chain_delta(&mut self, delta: i64) {
        self.bucket_count = (self.bucket_count as i64 + delta) as u64;
    }

    pub(crate) fn over_utilised(&self) -> bool {
        4 * self.size > 3 * BUCKET_CAPACITY as u64 * self.bucket_count
    }
}
