// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! Buckets and bucket-chain operations.
//!
//! A bucket's payload is an array of key bins (a zero-length bin marks an
//! empty slot); its refs are the chain-next pointer followed by the slot
//! values. The bucket's own handle doubles as a sentinel: in `refs[0]` it
//! marks the chain end, in a value position it marks an empty slot.

use objstore::{codec, CodecError, ObjectHandle, Store};

use crate::error::Result;

/// Number of key slots in one bucket.
pub const BUCKET_CAPACITY: usize = 64;

pub(crate) struct Bucket<H> {
    handle: H,
    entries: Vec<Vec<u8>>,
    refs: Vec<H>,
    payload: Vec<u8>,
    entries_dirty: bool,
}

impl<H: ObjectHandle> Bucket<H> {
    pub(crate) fn read<S: Store<Handle = H>>(store: &S, handle: H) -> Result<Self> {
        let object = store.read(&handle)?;
        let entries = codec::decode_bin_array(&object.payload)?;
        if entries.len() > BUCKET_CAPACITY {
            return Err(CodecError::Invalid(format!(
                "bucket payload holds {} slots, more than {}",
                entries.len(),
                BUCKET_CAPACITY
            ))
            .into());
        }
        if object.refs.is_empty() || object.refs.len() > BUCKET_CAPACITY + 1 {
            return Err(CodecError::Invalid(format!(
                "bucket holds {} refs",
                object.refs.len()
            ))
            .into());
        }
        Ok(Bucket {
            handle,
            entries,
            refs: object.refs,
            payload: object.payload,
            entries_dirty: false,
        })
    }

    /// Allocate a fresh empty bucket: a new object whose only ref is its
    /// own handle, marking both "no next bucket" and "no values".
    pub(crate) fn create_empty<S: Store<Handle = H>>(store: &mut S) -> Result<Self> {
        let payload = codec::encode_bin_array(&[]);
        let handle = store.create(payload.clone(), Vec::new())?;
        let refs = vec![handle.clone()];
        store.write(&handle, payload.clone(), refs.clone())?;
        Ok(Bucket {
            handle,
            entries: Vec::new(),
            refs,
            payload,
            entries_dirty: false,
        })
    }

    pub(crate) fn handle(&self) -> &H {
        &self.handle
    }

    /// Next bucket in the chain, or `None` at the chain end.
    pub(crate) fn next(&self) -> Option<&H> {
        if self.refs[0].same_referent(&self.handle) {
            None
        } else {
            Some(&self.refs[0])
        }
    }

    pub(crate) fn set_next(&mut self, next: Option<H>) {
        self.refs[0] = next.unwrap_or_else(|| self.handle.clone());
    }

    /// Upper bound of slots worth scanning; everything beyond is empty.
    pub(crate) fn slot_limit(&self) -> usize {
        self.entries.len().max(self.refs.len().saturating_sub(1))
    }

    pub(crate) fn slot_empty(&self, slot: usize) -> bool {
        slot + 1 >= self.refs.len() || self.refs[slot + 1].same_referent(&self.handle)
    }

    pub(crate) fn slot_key(&self, slot: usize) -> &[u8] {
        self.entries.get(slot).map(|key| key.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn slot_occupied(&self, slot: usize) -> bool {
        !self.slot_empty(slot) && !self.slot_key(slot).is_empty()
    }

    /// Slot holding `key`, if any.
    pub(crate) fn find_slot(&self, key: &[u8]) -> Option<usize> {
        (0..self.slot_limit()).find(|&slot| self.slot_occupied(slot) && self.slot_key(slot) == key)
    }

    /// First empty slot within capacity, if any.
    pub(crate) fn first_empty_slot(&self) -> Option<usize> {
        (0..BUCKET_CAPACITY).find(|&slot| self.slot_empty(slot))
    }

    pub(crate) fn value_at(&self, slot: usize) -> H {
        self.refs[slot + 1].clone()
    }

    /// Overwrite the value of an occupied slot; the key array is untouched,
    /// so the payload is not re-encoded.
    pub(crate) fn set_value(&mut self, slot: usize, value: H) {
        self.refs[slot + 1] = value;
    }

    pub(crate) fn place(&mut self, slot: usize, key: &[u8], value: H) {
        while self.entries.len() <= slot {
            self.entries.push(Vec::new());
        }
        self.entries[slot] = key.to_vec();
        while self.refs.len() <= slot + 1 {
            self.refs.push(self.handle.clone());
        }
        self.refs[slot + 1] = value;
        self.entries_dirty = true;
    }

    pub(crate) fn clear(&mut self, slot: usize) {
        if slot < self.entries.len() {
            self.entries[slot] = Vec::new();
            self.entries_dirty = true;
        }
        if slot + 1 < self.refs.len() {
            self.refs[slot + 1] = self.handle.clone();
        }
        self.tidy();
    }

    /// Trim trailing self references off the ref tail, and the key slots
    /// stranded beyond them, keeping the persisted size tight.
    pub(crate) fn tidy(&mut self) {
        while self.refs.len() > 1 && self.refs[self.refs.len() - 1].same_referent(&self.handle) {
            self.refs.pop();
        }
        if self.entries.len() > self.refs.len() - 1 {
            self.entries.truncate(self.refs.len() - 1);
            self.entries_dirty = true;
        }
    }

    /// A bucket is empty once only the chain pointer remains.
    pub(crate) fn is_empty(&self) -> bool {
        self.refs.len() == 1
    }

    pub(crate) fn write<S: Store<Handle = H>>(&mut self, store: &mut S) -> Result<()> {
        if self.entries_dirty {
            self.payload = codec::encode_bin_array(&self.entries);
            self.entries_dirty = false;
        }
        store.write(&self.handle, self.payload.clone(), self.refs.clone())?;
        Ok(())
    }
}

/// What happened to the caller's pointer at this bucket after a removal.
pub(crate) enum Link<H> {
    /// The bucket is still in place.
    Unchanged,
    /// The bucket was detached; point at this handle instead.
    Relink(H),
    /// The bucket was detached and nothing follows it.
    End,
}

pub(crate) struct Putting {
    pub(crate) added: bool,
    pub(crate) chain_delta: i64,
}

pub(crate) struct Removal<H> {
    pub(crate) done: bool,
    pub(crate) chain_delta: i64,
    pub(crate) link: Link<H>,
}

pub(crate) fn chain_find<S: Store>(
    store: &S,
    handle: S::Handle,
    key: &[u8],
) -> Result<Option<S::Handle>> {
    let mut cursor = handle;
    loop {
        let bucket = Bucket::read(store, cursor)?;
        if let Some(slot) = bucket.find_slot(key) {
            return Ok(Some(bucket.value_at(slot)));
        }
        match bucket.next() {
            Some(next) => cursor = next.clone(),
            None => return Ok(None),
        }
    }
}

/// Insert into the chain rooted at `handle`.
///
/// A matching slot anywhere in the chain is overwritten in place. Otherwise
/// the pair lands in the first empty slot of the first bucket that has one;
/// any later occurrence of the key is then removed from the rest of the
/// chain, so the net effect may be a move rather than an insertion
/// (`added` is false in that case). A full chain grows by one bucket.
pub(crate) fn chain_put<S: Store>(
    store: &mut S,
    handle: S::Handle,
    key: &[u8],
    value: S::Handle,
) -> Result<Putting> {
    let mut bucket = Bucket::read(store, handle)?;
    if let Some(slot) = bucket.find_slot(key) {
        bucket.set_value(slot, value);
        bucket.write(store)?;
        return Ok(Putting {
            added: false,
            chain_delta: 0,
        });
    }
    match bucket.first_empty_slot() {
        None => match bucket.next().cloned() {
            Some(next) => chain_put(store, next, key, value),
            None => {
                let mut fresh = Bucket::create_empty(store)?;
                bucket.set_next(Some(fresh.handle().clone()));
                bucket.write(store)?;
                fresh.place(0, key, value);
                fresh.write(store)?;
                Ok(Putting {
                    added: true,
                    chain_delta: 1,
                })
            }
        },
        Some(slot) => {
            bucket.place(slot, key, value);
            let (added, chain_delta) = match bucket.next().cloned() {
                None => (true, 0),
                Some(next) => {
                    let removal = chain_remove(store, next, key, false)?;
                    match removal.link {
                        Link::Relink(next) => bucket.set_next(Some(next)),
                        Link::End => bucket.set_next(None),
                        Link::Unchanged => {}
                    }
                    (!removal.done, removal.chain_delta)
                }
            };
            bucket.write(store)?;
            Ok(Putting { added, chain_delta })
        }
    }
}

/// Remove from the chain rooted at `handle`. `head` marks the chain head,
/// whose handle the root must keep even when the bucket empties.
///
/// A bucket emptied by the removal is detached without being written; its
/// successor (or the chain end) is reported through [`Link`] for the caller
/// to relink.
pub(crate) fn chain_remove<S: Store>(
    store: &mut S,
    handle: S::Handle,
    key: &[u8],
    head: bool,
) -> Result<Removal<S::Handle>> {
    let mut bucket = Bucket::read(store, handle)?;
    match bucket.find_slot(key) {
        Some(slot) => {
            bucket.clear(slot);
            if bucket.is_empty() {
                match bucket.next().cloned() {
                    Some(next) => Ok(Removal {
                        done: true,
                        chain_delta: -1,
                        link: Link::Relink(next),
                    }),
                    None if head => {
                        bucket.write(store)?;
                        Ok(Removal {
                            done: true,
                            chain_delta: 0,
                            link: Link::Unchanged,
                        })
                    }
                    None => Ok(Removal {
                        done: true,
                        chain_delta: -1,
                        link: Link::End,
                    }),
                }
            } else {
                bucket.write(store)?;
                Ok(Removal {
                    done: true,
                    chain_delta: 0,
                    link: Link::Unchanged,
                })
            }
        }
        None => match bucket.next().cloned() {
            None => Ok(Removal {
                done: false,
                chain_delta: 0,
                link: Link::Unchanged,
            }),
            Some(next) => {
                let removal = chain_remove(store, next, key, false)?;
                match &removal.link {
                    Link::Relink(next) => {
                        bucket.set_next(Some(next.clone()));
                        bucket.write(store)?;
                    }
                    Link::End => {
                        bucket.set_next(None);
                        bucket.write(store)?;
                    }
                    Link::Unchanged => {}
                }
                Ok(Removal {
                    done: removal.done,
                    chain_delta: removal.chain_delta,
                    link: Link::Unchanged,
                })
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objstore_memory::{MemoryHandle, MemoryStore};

    fn key(n: usize) -> Vec<u8> {
        format!("key-{}", n).into_bytes()
    }

    fn value(store: &mut MemoryStore, n: usize) -> MemoryHandle {
        store.create(vec![n as u8], Vec::new()).unwrap()
    }

    fn chain_handles(store: &MemoryStore, head: MemoryHandle) -> Vec<MemoryHandle> {
        let mut out = vec![head.clone()];
        let mut cursor = head;
        loop {
            let bucket = Bucket::read(store, cursor).unwrap();
            match bucket.next() {
                Some(next) => {
                    out.push(next.clone());
                    cursor = next.clone();
                }
                None => return out,
            }
        }
    }

    #[test]
    fn test_empty_bucket_shape() {
        let mut store = MemoryStore::new();
        let bucket = Bucket::create_empty(&mut store).unwrap();
        assert!(bucket.is_empty());
        assert!(bucket.next().is_none());
        assert_eq!(bucket.first_empty_slot(), Some(0));

        let object = store.read(bucket.handle()).unwrap();
        assert_eq!(object.payload, vec![0x90]);
        assert_eq!(object.refs.len(), 1);
        assert!(object.refs[0].same_referent(bucket.handle()));
    }

    #[test]
    fn test_place_clear_and_tidy() {
        let mut store = MemoryStore::new();
        let mut bucket = Bucket::create_empty(&mut store).unwrap();
        for n in 0..3 {
            let v = value(&mut store, n);
            bucket.place(n, &key(n), v);
        }
        assert_eq!(bucket.slot_limit(), 3);
        assert!(bucket.slot_occupied(1));

        // Clearing a middle slot keeps the tail slots addressable.
        bucket.clear(1);
        assert!(bucket.slot_empty(1));
        assert!(bucket.slot_occupied(2));
        assert_eq!(bucket.slot_limit(), 3);
        assert_eq!(bucket.find_slot(&key(2)), Some(2));

        // Clearing the tail slot trims the ref tail and the stranded slots.
        bucket.clear(2);
        assert_eq!(bucket.slot_limit(), 1);
        assert!(!bucket.is_empty());

        bucket.clear(0);
        assert!(bucket.is_empty());
    }

    #[test]
    fn test_full_bucket_grows_a_chain() {
        let mut store = MemoryStore::new();
        let head = Bucket::create_empty(&mut store).unwrap();
        let head_handle = head.handle().clone();

        for n in 0..BUCKET_CAPACITY {
            let v = value(&mut store, n);
            let putting = chain_put(&mut store, head_handle.clone(), &key(n), v).unwrap();
            assert!(putting.added);
            assert_eq!(putting.chain_delta, 0);
        }

        // The 65th key does not fit and spills into a fresh chain bucket.
        let v = value(&mut store, BUCKET_CAPACITY);
        let putting = chain_put(&mut store, head_handle.clone(), &key(BUCKET_CAPACITY), v).unwrap();
        assert!(putting.added);
        assert_eq!(putting.chain_delta, 1);
        assert_eq!(chain_handles(&store, head_handle.clone()).len(), 2);

        for n in 0..=BUCKET_CAPACITY {
            let found = chain_find(&store, head_handle.clone(), &key(n)).unwrap();
            assert!(found.is_some());
        }
        assert_eq!(
            chain_find(&store, head_handle, b"absent").unwrap(),
            None
        );
    }

    #[test]
    fn test_overwrite_keeps_payload_bytes() {
        let mut store = MemoryStore::new();
        let head = Bucket::create_empty(&mut store).unwrap();
        let head_handle = head.handle().clone();

        let first = value(&mut store, 1);
        chain_put(&mut store, head_handle.clone(), b"k", first).unwrap();
        let before = store.read(&head_handle).unwrap().payload;

        let second = value(&mut store, 2);
        let putting = chain_put(&mut store, head_handle.clone(), b"k", second.clone()).unwrap();
        assert!(!putting.added);
        let object = store.read(&head_handle).unwrap();
        assert_eq!(object.payload, before);
        assert!(object.refs[1].same_referent(&second));
    }

    #[test]
    fn test_put_moves_key_forward_in_chain() {
        let mut store = MemoryStore::new();
        let head = Bucket::create_empty(&mut store).unwrap();
        let head_handle = head.handle().clone();

        // Fill the head, spill one key into a second bucket.
        for n in 0..BUCKET_CAPACITY {
            let v = value(&mut store, n);
            chain_put(&mut store, head_handle.clone(), &key(n), v).unwrap();
        }
        let spilled = key(BUCKET_CAPACITY);
        let v = value(&mut store, BUCKET_CAPACITY);
        chain_put(&mut store, head_handle.clone(), &spilled, v).unwrap();

        // Free a head slot, then re-put the spilled key: it moves into the
        // head and the emptied tail bucket is detached.
        let removal = chain_remove(&mut store, head_handle.clone(), &key(3), true).unwrap();
        assert!(removal.done);
        assert_eq!(removal.chain_delta, 0);

        let moved = value(&mut store, 99);
        let putting = chain_put(&mut store, head_handle.clone(), &spilled, moved.clone()).unwrap();
        assert!(!putting.added);
        assert_eq!(putting.chain_delta, -1);
        assert_eq!(chain_handles(&store, head_handle.clone()).len(), 1);

        let found = chain_find(&store, head_handle, &spilled).unwrap().unwrap();
        assert!(found.same_referent(&moved));
    }

    #[test]
    fn test_remove_detaches_emptied_tail() {
        let mut store = MemoryStore::new();
        let head = Bucket::create_empty(&mut store).unwrap();
        let head_handle = head.handle().clone();

        for n in 0..=BUCKET_CAPACITY {
            let v = value(&mut store, n);
            chain_put(&mut store, head_handle.clone(), &key(n), v).unwrap();
        }
        assert_eq!(chain_handles(&store, head_handle.clone()).len(), 2);

        // Removing the spilled key empties the tail bucket, which reports
        // its own detachment to the head.
        let removal =
            chain_remove(&mut store, head_handle.clone(), &key(BUCKET_CAPACITY), true).unwrap();
        assert!(removal.done);
        assert_eq!(removal.chain_delta, -1);
        assert!(matches!(removal.link, Link::Unchanged));
        assert_eq!(chain_handles(&store, head_handle.clone()).len(), 1);
        assert_eq!(
            chain_find(&store, head_handle, &key(BUCKET_CAPACITY)).unwrap(),
            None
        );
    }

    #[test]
    fn test_remove_emptied_head_reports_relink() {
        let mut store = MemoryStore::new();
        let head = Bucket::create_empty(&mut store).unwrap();
        let head_handle = head.handle().clone();

        for n in 0..=BUCKET_CAPACITY {
            let v = value(&mut store, n);
            chain_put(&mut store, head_handle.clone(), &key(n), v).unwrap();
        }
        // Empty the head bucket one key at a time; the last removal must
        // hand the chain's tail back as the new head.
        for n in 0..BUCKET_CAPACITY - 1 {
            chain_remove(&mut store, head_handle.clone(), &key(n), true).unwrap();
        }
        let removal =
            chain_remove(&mut store, head_handle.clone(), &key(BUCKET_CAPACITY - 1), true)
                .unwrap();
        assert!(removal.done);
        assert_eq!(removal.chain_delta, -1);
        match removal.link {
            Link::Relink(new_head) => {
                assert!(!new_head.same_referent(&head_handle));
                let found = chain_find(&store, new_head, &key(BUCKET_CAPACITY)).unwrap();
                assert!(found.is_some());
            }
            _ => panic!("head was not relinked"),
        }
    }

    #[test]
    fn test_remove_emptied_sole_head_is_written_out() {
        let mut store = MemoryStore::new();
        let head = Bucket::create_empty(&mut store).unwrap();
        let head_handle = head.handle().clone();

        let v = value(&mut store, 0);
        chain_put(&mut store, head_handle.clone(), &key(0), v).unwrap();
        let removal = chain_remove(&mut store, head_handle.clone(), &key(0), true).unwrap();
        assert!(removal.done);
        assert_eq!(removal.chain_delta, 0);
        assert!(matches!(removal.link, Link::Unchanged));

        // The emptied head was written back in its empty shape.
        let object = store.read(&head_handle).unwrap();
        assert_eq!(object.payload, vec![0x90]);
        assert_eq!(object.refs.len(), 1);
    }

    #[test]
    fn test_remove_absent_key() {
        let mut store = MemoryStore::new();
        let head = Bucket::create_empty(&mut store).unwrap();
        let v = value(&mut store, 0);
        chain_put(&mut store, head.handle().clone(), &key(0), v).unwrap();
        let removal = chain_remove(&mut store, head.handle().clone(), b"absent", true).unwrap();
        assert!(!removal.done);
        assert_eq!(removal.chain_delta, 0);
    }
}
