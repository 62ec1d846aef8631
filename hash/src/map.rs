// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use rand::rngs::OsRng;
use rand::RngCore;

use objstore::{transact, transact_read, Store};

use crate::bucket::{chain_find, chain_put, chain_remove, Bucket, Link, BUCKET_CAPACITY};
use crate::error::Result;
use crate::hash::keyed_hash;
use crate::root::Root;

/// A linear hash map whose buckets are objects of a transactional store.
///
/// Every operation runs as a transaction closure: when the store signals
/// that a restart is needed, the operation re-runs from the top with fresh
/// reads. Keys are byte strings compared by equality.
pub struct LinearHash<S: Store> {
    store: S,
    root: S::Handle,
}

/// Occupancy counters of a map's root, for diagnostics and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stats {
    /// Total entries.
    pub size: u64,
    /// Total buckets, chain extensions included.
    pub bucket_count: u64,
    /// Next top-level bucket slated for splitting.
    pub split_index: u64,
    /// Mask addressing already-split buckets.
    pub mask_high: u64,
    /// Mask addressing not-yet-split buckets.
    pub mask_low: u64,
}

impl<S: Store> LinearHash<S> {
    /// Create an empty map, allocating its root and two empty buckets
    /// inside a transaction. The hash key is 16 fresh random bytes from the
    /// operating system and never changes for the life of the map.
    pub fn create_empty(store: S) -> Result<Self> {
        let mut hash_key = [0u8; 16];
        OsRng.fill_bytes(&mut hash_key);
        Self::create_with_hash_key(store, hash_key)
    }

    pub(crate) fn create_with_hash_key(mut store: S, hash_key: [u8; 16]) -> Result<Self> {
        let root = transact(&mut store, |store| {
            let first = Bucket::create_empty(store)?;
            let second = Bucket::create_empty(store)?;
            let root = Root {
                size: 0,
                bucket_count: 2,
                split_index: 0,
                mask_high: 3,
                mask_low: 1,
                hash_key,
                buckets: vec![first.handle().clone(), second.handle().clone()],
            };
            let handle = store.create(root.encode_payload(), root.buckets.clone())?;
            Ok::<_, crate::error::LinearHashError>(handle)
        })?;
        Ok(Self { store, root })
    }

    /// Reopen a map from its root handle.
    pub fn from_root(store: S, root: S::Handle) -> Self {
        Self { store, root }
    }

    /// Handle of the root object.
    pub fn root_handle(&self) -> &S::Handle {
        &self.root
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of entries in the map.
    pub fn size(&self) -> Result<u64> {
        let handle = self.root.clone();
        transact_read(&self.store, move |store| {
            Ok(Root::read(store, &handle)?.size)
        })
    }

    /// Occupancy counters of the root.
    pub fn stats(&self) -> Result<Stats> {
        let handle = self.root.clone();
        transact_read(&self.store, move |store| {
            let root = Root::read(store, &handle)?;
            Ok(Stats {
                size: root.size,
                bucket_count: root.bucket_count,
                split_index: root.split_index,
                mask_high: root.mask_high,
                mask_low: root.mask_low,
            })
        })
    }

    /// Look up the value held against `key`.
    pub fn find(&self, key: &[u8]) -> Result<Option<S::Handle>> {
        let handle = self.root.clone();
        transact_read(&self.store, move |store| {
            let root = Root::read(store, &handle)?;
            let index = root.bucket_index(keyed_hash(&root.hash_key, key));
            chain_find(store, root.bucket_handle(index)?, key)
        })
    }

    /// Insert `value` against `key`, replacing any existing value. When the
    /// map runs past three-quarters full, the bucket at the split index is
    /// split before the operation returns.
    pub fn put(&mut self, key: &[u8], value: S::Handle) -> Result<()> {
        let handle = self.root.clone();
        transact(&mut self.store, move |store| {
            let mut root = Root::read(store, &handle)?;
            let index = root.bucket_index(keyed_hash(&root.hash_key, key));
            let head = root.bucket_handle(index)?;
            let putting = chain_put(store, head, key, value.clone())?;

            let mut dirty = false;
            if putting.added {
                root.size += 1;
                dirty = true;
            }
            if putting.chain_delta != 0 {
                root.apply_chain_delta(putting.chain_delta);
                dirty = true;
            }
            if root.over_utilised() {
                split(store, &mut root)?;
                dirty = true;
            }
            if dirty {
                root.write(store, &handle)?;
            }
            Ok(())
        })
    }

    /// Insert many pairs.
    pub fn batch_put<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (Vec<u8>, S::Handle)>,
    {
        for (key, value) in entries {
            self.put(&key, value)?;
        }
        Ok(())
    }

    /// Remove `key`; absent keys are a no-op.
    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        let handle = self.root.clone();
        transact(&mut self.store, move |store| {
            let mut root = Root::read(store, &handle)?;
            let index = root.bucket_index(keyed_hash(&root.hash_key, key));
            let head = root.bucket_handle(index)?;
            let removal = chain_remove(store, head, key, true)?;

            let mut dirty = false;
            match removal.link {
                Link::Relink(new_head) => {
                    root.buckets[index] = new_head;
                    dirty = true;
                }
                Link::End | Link::Unchanged => {}
            }
            if removal.done {
                root.size -= 1;
                dirty = true;
            }
            if removal.chain_delta != 0 {
                root.apply_chain_delta(removal.chain_delta);
                dirty = true;
            }
            if dirty {
                root.write(store, &handle)?;
            }
            Ok(())
        })
    }

    /// Visit every `(key, value)` pair: top-level buckets in index order,
    /// chains front to back, slots in slot order. Re-runs from the top if
    /// the store requests a restart.
    pub fn for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&[u8], &S::Handle) -> Result<()>,
    {
        let handle = self.root.clone();
        transact_read(&self.store, move |store| {
            let root = Root::read(store, &handle)?;
            for head in &root.buckets {
                let mut cursor = head.clone();
                loop {
                    let bucket = Bucket::read(store, cursor)?;
                    for slot in 0..bucket.slot_limit() {
                        if bucket.slot_occupied(slot) {
                            f(bucket.slot_key(slot), &bucket.value_at(slot))?;
                        }
                    }
                    match bucket.next() {
                        Some(next) => cursor = next.clone(),
                        None => break,
                    }
                }
            }
            Ok(())
        })
    }

    /// Walk the whole map checking structural invariants, panicking on any
    /// violation. Intended for tests.
    pub fn verify(&self) -> Result<()> {
        let handle = self.root.clone();
        transact_read(&self.store, move |store| {
            let root = Root::read(store, &handle)?;
            let mut entries = 0u64;
            let mut buckets = 0u64;
            for (index, head) in root.buckets.iter().enumerate() {
                let mut seen: Vec<Vec<u8>> = Vec::new();
                let mut cursor = head.clone();
                loop {
                    let bucket = Bucket::read(store, cursor.clone())?;
                    buckets += 1;
                    for slot in 0..bucket.slot_limit() {
                        if !bucket.slot_occupied(slot) {
                            assert!(
                                bucket.slot_key(slot).is_empty(),
                                "unoccupied slot {} of bucket {:?} keeps a key",
                                slot,
                                cursor
                            );
                            continue;
                        }
                        entries += 1;
                        let key = bucket.slot_key(slot).to_vec();
                        let target = root.bucket_index(keyed_hash(&root.hash_key, &key));
                        assert_eq!(
                            target, index,
                            "key in bucket {} addresses bucket {}",
                            index, target
                        );
                        assert!(!seen.contains(&key), "key occurs twice in one chain");
                        seen.push(key);
                    }
                    match bucket.next() {
                        Some(next) => cursor = next.clone(),
                        None => break,
                    }
                }
            }
            assert_eq!(buckets, root.bucket_count, "bucket count mismatch");
            assert_eq!(entries, root.size, "entry count mismatch");
            Ok(())
        })
    }
}

/// Split the bucket at the split index.
///
/// A fresh bucket is appended to the top level and the split chain is
/// rehashed through the advanced masks: entries that no longer address the
/// old index move to the fresh bucket's chain, and chain links emptied by
/// the exodus are unlinked. Buckets still holding entries are written once
/// their final chain link is known.
fn split<S: Store>(store: &mut S, root: &mut Root<S::Handle>) -> Result<()> {
    let split_from = root.split_index as usize;

    let fresh = Bucket::create_empty(store)?;
    root.buckets.push(fresh.handle().clone());
    root.bucket_count += 1;
    root.split_index += 1;
    if 2 * root.split_index == root.buckets.len() as u64 {
        // Every bucket of this generation is split: start the next one.
        root.split_index = 0;
        root.mask_low = root.mask_high;
        root.mask_high = root.mask_high * 2 + 1;
    }

    let mut moved_chain = vec![fresh];
    let mut previous: Option<Bucket<S::Handle>> = None;
    let mut cursor = root.bucket_handle(split_from)?;
    loop {
        let mut bucket = Bucket::read(store, cursor)?;
        let next = bucket.next().cloned();

        for slot in 0..bucket.slot_limit() {
            if !bucket.slot_occupied(slot) {
                continue;
            }
            let key = bucket.slot_key(slot).to_vec();
            if root.bucket_index(keyed_hash(&root.hash_key, &key)) == split_from {
                continue;
            }
            let value = bucket.value_at(slot);
            stash(store, &mut moved_chain, root, &key, value)?;
            bucket.clear(slot);
        }
        bucket.tidy();

        if bucket.is_empty() {
            match (&mut previous, &next) {
                // Nothing survives ahead of it and nothing follows: the
                // top-level slot keeps this bucket, written out empty.
                (None, None) => bucket.write(store)?,
                (None, Some(next)) => {
                    root.buckets[split_from] = next.clone();
                    root.bucket_count -= 1;
                }
                (Some(previous), None) => {
                    previous.set_next(None);
                    root.bucket_count -= 1;
                }
                (Some(previous), Some(next)) => {
                    previous.set_next(Some(next.clone()));
                    root.bucket_count -= 1;
                }
            }
        } else {
            if let Some(mut done) = previous.take() {
                done.write(store)?;
            }
            previous = Some(bucket);
        }

        match next {
            Some(handle) => cursor = handle,
            None => break,
        }
    }
    if let Some(mut done) = previous.take() {
        done.write(store)?;
    }

    // Link the fresh chain back to front and write it out.
    let mut follower: Option<S::Handle> = None;
    for mut bucket in moved_chain.into_iter().rev() {
        bucket.set_next(follower.take());
        follower = Some(bucket.handle().clone());
        bucket.write(store)?;
    }
    Ok(())
}

/// Append a moved entry to the fresh bucket's chain, growing it when the
/// tail bucket fills.
fn stash<S: Store>(
    store: &mut S,
    chain: &mut Vec<Bucket<S::Handle>>,
    root: &mut Root<S::Handle>,
    key: &[u8],
    value: S::Handle,
) -> Result<()> {
    let full = match chain.last() {
        Some(bucket) => bucket.slot_limit() >= BUCKET_CAPACITY,
        None => true,
    };
    if full {
        chain.push(Bucket::create_empty(store)?);
        root.bucket_count += 1;
    }
    let tail_index = chain.len() - 1;
    let tail = &mut chain[tail_index];
    let slot = tail.slot_limit();
    tail.place(slot, key, value);
    Ok(())
}
