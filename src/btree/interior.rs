//! # B+Tree Interior Node Implementation
//!
//! Interior nodes hold separator keys and child page ids, steering the
//! descent from root to leaf.
//!
//! ## Page Layout
//!
//! ```text
//! +------------------------+
//! | key_count     (i32 LE) |
//! +------------------------+
//! | children[0..K+1] (i32) |  key_count + 1 live child page ids
//! +------------------------+
//! | keys[0..K]       (i32) |  key_count live separator keys
//! +------------------------+
//! ```
//!
//! ## Navigation Semantics
//!
//! Separators follow the leaf copy-up discipline: the smallest key in the
//! subtree at `children[i + 1]` equals `keys[i]`. For a search key S the
//! descent target is `children[i]` for the smallest `i` with `keys[i] > S`,
//! falling back to the rightmost child when every separator is `<= S` —
//! descent never fails.
//!
//! ## Split Policy
//!
//! A full interior node splits at `half = K / 2`. Unlike the leaf split,
//! the middle key is MOVED up: it becomes the parent separator and appears
//! in neither sibling afterwards.

use eyre::{ensure, Result};
use zerocopy::little_endian::I32;
use zerocopy::FromBytes;

use crate::config::{INTERIOR_CAPACITY, PAGE_SIZE};
use crate::storage::PagedFile;

const CHILDREN_START: usize = 4;
const KEYS_START: usize = CHILDREN_START + (INTERIOR_CAPACITY + 1) * 4;
const KEYS_END: usize = KEYS_START + INTERIOR_CAPACITY * 4;

const _: () = assert!(KEYS_END <= PAGE_SIZE);

pub struct InteriorNode {
    data: [u8; PAGE_SIZE],
}

impl InteriorNode {
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    pub fn read(&mut self, pid: i32, file: &mut PagedFile) -> Result<()> {
        file.read(pid, &mut self.data)
    }

    pub fn write(&self, pid: i32, file: &mut PagedFile) -> Result<()> {
        file.write(pid, &self.data)
    }

    pub fn key_count(&self) -> usize {
        I32::ref_from_bytes(&self.data[..4]).unwrap().get() as usize
    }

    fn set_key_count(&mut self, count: usize) {
        *I32::mut_from_bytes(&mut self.data[..4]).unwrap() = I32::new(count as i32);
    }

    fn keys(&self) -> &[I32] {
        <[I32]>::ref_from_bytes(&self.data[KEYS_START..KEYS_END]).unwrap()
    }

    fn keys_mut(&mut self) -> &mut [I32] {
        <[I32]>::mut_from_bytes(&mut self.data[KEYS_START..KEYS_END]).unwrap()
    }

    fn children(&self) -> &[I32] {
        <[I32]>::ref_from_bytes(&self.data[CHILDREN_START..KEYS_START]).unwrap()
    }

    fn children_mut(&mut self) -> &mut [I32] {
        <[I32]>::mut_from_bytes(&mut self.data[CHILDREN_START..KEYS_START]).unwrap()
    }

    /// Smallest separator index whose key is `>= search_key`, or `None`
    /// when every separator is strictly smaller.
    pub fn locate(&self, search_key: i32) -> Option<usize> {
        let count = self.key_count();
        let eid = self.keys()[..count].partition_point(|k| k.get() < search_key);
        (eid < count).then_some(eid)
    }

    /// Child page to descend into for `search_key`. Every key of the key
    /// space has a unique child: keys below `keys[0]` go left of it, keys
    /// `>=` the last separator take the rightmost child.
    pub fn locate_child(&self, search_key: i32) -> i32 {
        let count = self.key_count();
        let idx = self.keys()[..count].partition_point(|k| k.get() <= search_key);
        self.children()[idx].get()
    }

    pub fn separator(&self, eid: usize) -> Result<i32> {
        ensure!(
            eid < self.key_count(),
            "separator index {} out of bounds (key_count={})",
            eid,
            self.key_count()
        );
        Ok(self.keys()[eid].get())
    }

    pub fn child(&self, idx: usize) -> Result<i32> {
        ensure!(
            idx <= self.key_count(),
            "child index {} out of bounds (key_count={})",
            idx,
            self.key_count()
        );
        Ok(self.children()[idx].get())
    }

    /// Inserts a separator; `pid` becomes the right-hand child of `key`.
    pub fn insert(&mut self, key: i32, pid: i32) -> Result<()> {
        let count = self.key_count();
        ensure!(
            count < INTERIOR_CAPACITY,
            "interior node full (key_count={})",
            count
        );

        let pos = self.keys()[..count].partition_point(|k| k.get() < key);

        let keys = self.keys_mut();
        keys.copy_within(pos..count, pos + 1);
        keys[pos] = I32::new(key);

        let children = self.children_mut();
        children.copy_within(pos + 1..count + 1, pos + 2);
        children[pos + 1] = I32::new(pid);

        self.set_key_count(count + 1);
        Ok(())
    }

    /// Splits a full interior node. The middle separator is moved up: it is
    /// returned for the parent and retained by neither sibling. The new
    /// `(key, pid)` pair lands on whichever side it sorts into.
    pub fn insert_and_split(
        &mut self,
        key: i32,
        pid: i32,
        sibling: &mut InteriorNode,
    ) -> Result<i32> {
        ensure!(
            self.key_count() == INTERIOR_CAPACITY,
            "insert_and_split requires a full node (key_count={})",
            self.key_count()
        );
        ensure!(
            sibling.key_count() == 0,
            "split sibling must be empty (key_count={})",
            sibling.key_count()
        );

        let half = INTERIOR_CAPACITY / 2;
        let mid_key = self.keys()[half].get();
        let moved = INTERIOR_CAPACITY - half - 1;

        sibling.keys_mut()[..moved].copy_from_slice(&self.keys()[half + 1..]);
        sibling.children_mut()[..moved + 1].copy_from_slice(&self.children()[half + 1..]);
        sibling.set_key_count(moved);
        self.set_key_count(half);

        if key >= mid_key {
            sibling.insert(key, pid)?;
        } else {
            self.insert(key, pid)?;
        }

        Ok(mid_key)
    }

    /// Turns an empty node into a root with a single separator.
    pub fn initialize_root(&mut self, left_pid: i32, key: i32, right_pid: i32) -> Result<()> {
        ensure!(
            self.key_count() == 0,
            "initialize_root requires an empty node (key_count={})",
            self.key_count()
        );

        let children = self.children_mut();
        children[0] = I32::new(left_pid);
        children[1] = I32::new(right_pid);
        self.keys_mut()[0] = I32::new(key);
        self.set_key_count(1);
        Ok(())
    }
}

impl Default for InteriorNode {
    fn default() -> Self {
        Self::new()
    }
}
