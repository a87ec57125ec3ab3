//! # B+Tree Leaf Node Implementation
//!
//! Leaf nodes store the actual `(record id, key)` index entries in sorted
//! order and are linked left-to-right for range scans.
//!
//! ## Page Layout
//!
//! ```text
//! +----------------------+
//! | key_count   (i32 LE) |
//! | next_leaf   (i32 LE) |  page id of the right sibling, -1 at the edge
//! +----------------------+
//! | entry[0]    (12B)    |  rid.pid (i32) | rid.sid (i32) | key (i32)
//! | entry[1]             |
//! | ...                  |
//! | entry[L-1]           |
//! +----------------------+
//! | unused tail          |
//! +----------------------+
//! ```
//!
//! Entries are kept non-decreasing by key. Equal keys are permitted; a new
//! entry is placed at the first position whose stored key is `>= key`.
//!
//! ## Split Policy
//!
//! A full leaf splits deterministically at `half = L / 2`: entries
//! `[half, L)` move to the sibling, and the sibling's first key becomes the
//! copy-up separator — it is promoted to the parent AND remains in the
//! sibling. The new entry lands on whichever side it sorts into.
//!
//! The sibling inherits the old next-leaf pointer; the caller patches this
//! node's pointer once the sibling's page id has been allocated.

use eyre::{ensure, Result};
use zerocopy::little_endian::I32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{INVALID_PID, LEAF_CAPACITY, LEAF_ENTRY_SIZE, LEAF_HEADER_SIZE, PAGE_SIZE};
use crate::records::RecordId;
use crate::storage::PagedFile;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct LeafHeader {
    key_count: I32,
    next_leaf: I32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, PartialEq, Eq)]
pub struct LeafEntry {
    rid_pid: I32,
    rid_sid: I32,
    key: I32,
}

const _: () = assert!(std::mem::size_of::<LeafEntry>() == LEAF_ENTRY_SIZE);
const _: () = assert!(std::mem::size_of::<LeafHeader>() == LEAF_HEADER_SIZE);

impl LeafEntry {
    fn new(key: i32, rid: RecordId) -> Self {
        Self {
            rid_pid: I32::new(rid.pid),
            rid_sid: I32::new(rid.sid),
            key: I32::new(key),
        }
    }

    pub fn key(&self) -> i32 {
        self.key.get()
    }

    pub fn rid(&self) -> RecordId {
        RecordId::new(self.rid_pid.get(), self.rid_sid.get())
    }
}

pub struct LeafNode {
    data: [u8; PAGE_SIZE],
}

impl LeafNode {
    pub fn new() -> Self {
        let mut node = Self {
            data: [0u8; PAGE_SIZE],
        };
        node.set_next_leaf(INVALID_PID);
        node
    }

    pub fn read(&mut self, pid: i32, file: &mut PagedFile) -> Result<()> {
        file.read(pid, &mut self.data)
    }

    pub fn write(&self, pid: i32, file: &mut PagedFile) -> Result<()> {
        file.write(pid, &self.data)
    }

    fn header(&self) -> &LeafHeader {
        LeafHeader::ref_from_bytes(&self.data[..LEAF_HEADER_SIZE]).unwrap()
    }

    fn header_mut(&mut self) -> &mut LeafHeader {
        LeafHeader::mut_from_bytes(&mut self.data[..LEAF_HEADER_SIZE]).unwrap()
    }

    fn entries(&self) -> &[LeafEntry] {
        let end = LEAF_HEADER_SIZE + LEAF_CAPACITY * LEAF_ENTRY_SIZE;
        <[LeafEntry]>::ref_from_bytes(&self.data[LEAF_HEADER_SIZE..end]).unwrap()
    }

    fn entries_mut(&mut self) -> &mut [LeafEntry] {
        let end = LEAF_HEADER_SIZE + LEAF_CAPACITY * LEAF_ENTRY_SIZE;
        <[LeafEntry]>::mut_from_bytes(&mut self.data[LEAF_HEADER_SIZE..end]).unwrap()
    }

    pub fn key_count(&self) -> usize {
        self.header().key_count.get() as usize
    }

    /// Smallest entry index whose key is `>= search_key`, or `None` when
    /// every stored key is strictly smaller.
    pub fn locate(&self, search_key: i32) -> Option<usize> {
        let count = self.key_count();
        let eid = self.entries()[..count].partition_point(|e| e.key() < search_key);
        (eid < count).then_some(eid)
    }

    pub fn entry(&self, eid: usize) -> Result<(i32, RecordId)> {
        ensure!(
            eid < self.key_count(),
            "entry index {} out of bounds (key_count={})",
            eid,
            self.key_count()
        );
        let entry = &self.entries()[eid];
        Ok((entry.key(), entry.rid()))
    }

    pub fn insert(&mut self, key: i32, rid: RecordId) -> Result<()> {
        let count = self.key_count();
        ensure!(count < LEAF_CAPACITY, "leaf node full (key_count={})", count);

        let pos = self.entries()[..count].partition_point(|e| e.key() < key);
        let entries = self.entries_mut();
        entries.copy_within(pos..count, pos + 1);
        entries[pos] = LeafEntry::new(key, rid);

        self.header_mut().key_count = I32::new(count as i32 + 1);
        Ok(())
    }

    /// Splits a full leaf, inserting `(key, rid)` on whichever side it
    /// sorts into. Returns the sibling's first key, which the caller
    /// installs in the parent as the copy-up separator.
    ///
    /// The sibling inherits this node's next-leaf pointer; the caller must
    /// point this node at the sibling once its page id is allocated.
    pub fn insert_and_split(
        &mut self,
        key: i32,
        rid: RecordId,
        sibling: &mut LeafNode,
    ) -> Result<i32> {
        ensure!(
            self.key_count() == LEAF_CAPACITY,
            "insert_and_split requires a full leaf (key_count={})",
            self.key_count()
        );
        ensure!(
            sibling.key_count() == 0,
            "split sibling must be empty (key_count={})",
            sibling.key_count()
        );

        let half = LEAF_CAPACITY / 2;
        let sibling_key = self.entries()[half].key();
        let moved = LEAF_CAPACITY - half;

        sibling.entries_mut()[..moved].copy_from_slice(&self.entries()[half..]);
        sibling.header_mut().key_count = I32::new(moved as i32);
        self.header_mut().key_count = I32::new(half as i32);
        sibling.set_next_leaf(self.next_leaf());

        if key >= sibling_key {
            sibling.insert(key, rid)?;
        } else {
            self.insert(key, rid)?;
        }

        Ok(sibling_key)
    }

    pub fn next_leaf(&self) -> i32 {
        self.header().next_leaf.get()
    }

    pub fn set_next_leaf(&mut self, pid: i32) {
        self.header_mut().next_leaf = I32::new(pid);
    }
}

impl Default for LeafNode {
    fn default() -> Self {
        Self::new()
    }
}
