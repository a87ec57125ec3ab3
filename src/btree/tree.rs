//! # B+Tree Index
//!
//! `BTreeIndex` ties the node types to a paged file: it owns the tree
//! metadata, drives insertion with split propagation, and exposes ordered
//! forward scans through an [`IndexCursor`].
//!
//! ## Index File Layout
//!
//! ```text
//! Page 0:   root_pid (i32 LE), tree_height (i32 LE), rest unused
//! Page 1+:  leaf or interior nodes
//! ```
//!
//! A page's kind carries no on-page tag; it is inferred from the level at
//! which the descent reaches it (`height == 1` is the leaf level).
//!
//! ## Insert Algorithm
//!
//! Insertion is one recursive descent. Each level returns an optional
//! promoted `(separator, sibling pid)` pair meaning "I split; install this
//! separator in the parent". A pair surviving the root allocates a new
//! root and grows the tree by one level.
//!
//! Page writes proceed bottom-up. On a split the sibling's contents are
//! finalized first, then its page id is allocated, the sibling is written,
//! the original node's sibling link is patched, and finally the original
//! node is written. The metadata page is committed only on [`close`],
//! so a crash mid-insert can leak an allocated page but never corrupts
//! committed state.
//!
//! [`close`]: BTreeIndex::close

use std::path::Path;

use eyre::{ensure, Result};
use tracing::debug;
use zerocopy::little_endian::I32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{INTERIOR_CAPACITY, INVALID_PID, LEAF_CAPACITY, META_PID, PAGE_SIZE};
use crate::records::RecordId;
use crate::storage::{Mode, PagedFile};

use super::interior::InteriorNode;
use super::leaf::LeafNode;

/// Position of one leaf entry for forward iteration. `pid == -1` denotes
/// end-of-scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexCursor {
    pub pid: i32,
    pub eid: usize,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct IndexMeta {
    root_pid: I32,
    tree_height: I32,
}

#[derive(Debug)]
pub struct BTreeIndex {
    file: PagedFile,
    root_pid: i32,
    height: i32,
}

impl BTreeIndex {
    /// Opens an index file. In write mode a missing file is created with
    /// empty-tree metadata; in read mode it is an error.
    pub fn open<P: AsRef<Path>>(path: P, mode: Mode) -> Result<Self> {
        let mut file = PagedFile::open(path, mode)?;

        if file.end_pid() == 0 {
            ensure!(
                mode == Mode::Write,
                "index file '{}' holds no metadata page",
                file.path().display()
            );
            let mut index = Self {
                file,
                root_pid: INVALID_PID,
                height: 0,
            };
            index.write_meta()?;
            return Ok(index);
        }

        let mut buf = [0u8; PAGE_SIZE];
        file.read(META_PID, &mut buf)?;
        let meta = IndexMeta::ref_from_bytes(&buf[..std::mem::size_of::<IndexMeta>()]).unwrap();

        Ok(Self {
            root_pid: meta.root_pid.get(),
            height: meta.tree_height.get(),
            file,
        })
    }

    /// Persists the tree metadata and closes the file.
    pub fn close(mut self) -> Result<()> {
        self.write_meta()?;
        self.file.sync()
    }

    fn write_meta(&mut self) -> Result<()> {
        let meta = IndexMeta {
            root_pid: I32::new(self.root_pid),
            tree_height: I32::new(self.height),
        };
        let mut buf = [0u8; PAGE_SIZE];
        buf[..std::mem::size_of::<IndexMeta>()].copy_from_slice(meta.as_bytes());
        self.file.write(META_PID, &buf)
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn root_pid(&self) -> i32 {
        self.root_pid
    }

    pub fn insert(&mut self, key: i32, rid: RecordId) -> Result<()> {
        if self.height == 0 {
            let mut root = LeafNode::new();
            root.insert(key, rid)?;
            let pid = self.file.end_pid();
            root.write(pid, &mut self.file)?;
            self.root_pid = pid;
            self.height = 1;
            return Ok(());
        }

        if let Some((separator, sibling_pid)) =
            self.insert_rec(key, rid, self.root_pid, self.height)?
        {
            let mut new_root = InteriorNode::new();
            new_root.initialize_root(self.root_pid, separator, sibling_pid)?;
            let pid = self.file.end_pid();
            new_root.write(pid, &mut self.file)?;
            self.root_pid = pid;
            self.height += 1;
            debug!(root = pid, height = self.height, "root split");
        }

        Ok(())
    }

    /// Returns the promoted `(separator, sibling pid)` pair when the node
    /// at `pid` split, `None` when the entry fit.
    fn insert_rec(
        &mut self,
        key: i32,
        rid: RecordId,
        pid: i32,
        level: i32,
    ) -> Result<Option<(i32, i32)>> {
        if level == 1 {
            let mut leaf = LeafNode::new();
            leaf.read(pid, &mut self.file)?;

            if leaf.key_count() < LEAF_CAPACITY {
                leaf.insert(key, rid)?;
                leaf.write(pid, &mut self.file)?;
                return Ok(None);
            }

            let mut sibling = LeafNode::new();
            let separator = leaf.insert_and_split(key, rid, &mut sibling)?;
            let sibling_pid = self.file.end_pid();
            leaf.set_next_leaf(sibling_pid);
            sibling.write(sibling_pid, &mut self.file)?;
            leaf.write(pid, &mut self.file)?;
            debug!(page = pid, sibling = sibling_pid, separator, "leaf split");
            return Ok(Some((separator, sibling_pid)));
        }

        let mut node = InteriorNode::new();
        node.read(pid, &mut self.file)?;
        let child_pid = node.locate_child(key);

        let Some((separator, new_pid)) = self.insert_rec(key, rid, child_pid, level - 1)? else {
            return Ok(None);
        };

        if node.key_count() < INTERIOR_CAPACITY {
            node.insert(separator, new_pid)?;
            node.write(pid, &mut self.file)?;
            return Ok(None);
        }

        let mut sibling = InteriorNode::new();
        let mid_key = node.insert_and_split(separator, new_pid, &mut sibling)?;
        let sibling_pid = self.file.end_pid();
        sibling.write(sibling_pid, &mut self.file)?;
        node.write(pid, &mut self.file)?;
        debug!(page = pid, sibling = sibling_pid, mid_key, "interior split");
        Ok(Some((mid_key, sibling_pid)))
    }

    /// Positions a cursor at the first entry whose key is `>= search_key`.
    /// When every key in the target leaf is smaller, the cursor parks one
    /// past its end and the next [`read_forward`] follows the leaf chain.
    ///
    /// [`read_forward`]: BTreeIndex::read_forward
    pub fn locate(&mut self, search_key: i32) -> Result<IndexCursor> {
        ensure!(self.height > 0, "locate on an empty tree");

        let mut pid = self.root_pid;
        for _ in 1..self.height {
            let mut node = InteriorNode::new();
            node.read(pid, &mut self.file)?;
            pid = node.locate_child(search_key);
        }

        let mut leaf = LeafNode::new();
        leaf.read(pid, &mut self.file)?;
        let eid = leaf.locate(search_key).unwrap_or(leaf.key_count());

        Ok(IndexCursor { pid, eid })
    }

    /// Emits the entry under the cursor and advances it, following the
    /// leaf chain. Returns `None` once the scan is exhausted; the cursor
    /// then stays parked at `pid == -1`.
    pub fn read_forward(&mut self, cursor: &mut IndexCursor) -> Result<Option<(i32, RecordId)>> {
        loop {
            if cursor.pid == INVALID_PID {
                return Ok(None);
            }

            let mut leaf = LeafNode::new();
            leaf.read(cursor.pid, &mut self.file)?;

            if cursor.eid < leaf.key_count() {
                let (key, rid) = leaf.entry(cursor.eid)?;
                if cursor.eid + 1 < leaf.key_count() {
                    cursor.eid += 1;
                } else {
                    cursor.pid = leaf.next_leaf();
                    cursor.eid = 0;
                }
                return Ok(Some((key, rid)));
            }

            // locate can park a cursor one past a leaf's end
            cursor.pid = leaf.next_leaf();
            cursor.eid = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rid(n: i32) -> RecordId {
        RecordId::new(n / 100, n % 100)
    }

    fn open_temp() -> (tempfile::TempDir, BTreeIndex) {
        let dir = tempdir().unwrap();
        let index = BTreeIndex::open(dir.path().join("t.idx"), Mode::Write).unwrap();
        (dir, index)
    }

    /// Collects every `(key, rid)` from `start_key` to the end of the tree.
    fn scan_from(index: &mut BTreeIndex, start_key: i32) -> Vec<(i32, RecordId)> {
        let mut cursor = index.locate(start_key).unwrap();
        let mut out = Vec::new();
        while let Some(entry) = index.read_forward(&mut cursor).unwrap() {
            out.push(entry);
        }
        out
    }

    #[test]
    fn fresh_index_is_empty() {
        let (_dir, index) = open_temp();

        assert!(index.is_empty());
        assert_eq!(index.height(), 0);
        assert_eq!(index.root_pid(), INVALID_PID);
    }

    #[test]
    fn open_read_mode_requires_existing_file() {
        let dir = tempdir().unwrap();
        assert!(BTreeIndex::open(dir.path().join("missing.idx"), Mode::Read).is_err());
    }

    #[test]
    fn locate_on_empty_tree_is_an_error() {
        let (_dir, mut index) = open_temp();
        assert!(index.locate(1).is_err());
    }

    #[test]
    fn first_insert_creates_root_leaf_after_meta_page() {
        let (_dir, mut index) = open_temp();

        index.insert(42, rid(1)).unwrap();

        assert_eq!(index.height(), 1);
        assert_eq!(index.root_pid(), 1);
        assert_eq!(scan_from(&mut index, i32::MIN), vec![(42, rid(1))]);
    }

    #[test]
    fn overflowing_the_root_leaf_grows_the_tree() {
        let (_dir, mut index) = open_temp();

        let n = LEAF_CAPACITY as i32 + 1;
        for key in 1..=n {
            index.insert(key, rid(key)).unwrap();
        }

        assert_eq!(index.height(), 2);

        // walk the cursor and group entries by leaf page
        let mut cursor = index.locate(i32::MIN).unwrap();
        let mut leaves: Vec<(i32, usize)> = Vec::new();
        loop {
            let pid = cursor.pid;
            if index.read_forward(&mut cursor).unwrap().is_none() {
                break;
            }
            if let Some(last) = leaves.last_mut() {
                if last.0 == pid {
                    last.1 += 1;
                    continue;
                }
            }
            leaves.push((pid, 1));
        }

        let half = LEAF_CAPACITY / 2;
        assert_eq!(
            leaves.iter().map(|&(_, c)| c).collect::<Vec<_>>(),
            vec![half, LEAF_CAPACITY - half + 1]
        );

        // the separator key equals the right leaf's first key
        let right_first = half as i32 + 1;
        let cursor = index.locate(right_first).unwrap();
        assert_eq!(cursor.pid, leaves[1].0);
        assert_eq!(cursor.eid, 0);
    }

    #[test]
    fn ascending_inserts_keep_scan_sorted_and_complete() {
        let (_dir, mut index) = open_temp();

        let n = 6000;
        for key in 1..=n {
            index.insert(key, rid(key)).unwrap();
        }

        assert!(index.height() >= 3, "height={}", index.height());

        let entries = scan_from(&mut index, i32::MIN);
        assert_eq!(entries.len(), n as usize);
        for (i, &(key, r)) in entries.iter().enumerate() {
            assert_eq!(key, i as i32 + 1);
            assert_eq!(r, rid(key));
        }
    }

    #[test]
    fn height_never_decreases() {
        let (_dir, mut index) = open_temp();

        let mut last_height = 0;
        for key in 0..4000 {
            index.insert(key, rid(key)).unwrap();
            assert!(index.height() >= last_height);
            last_height = index.height();
        }
        assert!(last_height >= 2);
    }

    #[test]
    fn shuffled_inserts_scan_in_order() {
        let (_dir, mut index) = open_temp();

        let n: i32 = 1000;
        // 733 is coprime with 1000, so this visits every key once
        for i in 0..n {
            let key = (i * 733) % n;
            index.insert(key, rid(key)).unwrap();
        }

        let entries = scan_from(&mut index, i32::MIN);
        assert_eq!(entries.len(), n as usize);
        for (i, &(key, _)) in entries.iter().enumerate() {
            assert_eq!(key, i as i32);
        }

        for key in 0..n {
            let mut cursor = index.locate(key).unwrap();
            let (found, r) = index.read_forward(&mut cursor).unwrap().unwrap();
            assert_eq!(found, key);
            assert_eq!(r, rid(key));
        }
    }

    #[test]
    fn locate_past_every_key_ends_the_scan() {
        let (_dir, mut index) = open_temp();

        for key in 0..100 {
            index.insert(key, rid(key)).unwrap();
        }

        let mut cursor = index.locate(1000).unwrap();
        assert_ne!(cursor.pid, INVALID_PID);
        assert_eq!(index.read_forward(&mut cursor).unwrap(), None);
        assert_eq!(cursor.pid, INVALID_PID);

        // a parked cursor stays at the end
        assert_eq!(index.read_forward(&mut cursor).unwrap(), None);
    }

    #[test]
    fn locate_mid_range_resumes_at_first_matching_key() {
        let (_dir, mut index) = open_temp();

        for key in (0..500).map(|k| k * 2) {
            index.insert(key, rid(key)).unwrap();
        }

        // 501 is absent; the cursor lands on 502
        let entries = scan_from(&mut index, 501);
        assert_eq!(entries.first().map(|&(k, _)| k), Some(502));
        assert_eq!(entries.len(), 249);
    }

    #[test]
    fn duplicate_keys_all_survive_splits() {
        let (_dir, mut index) = open_temp();

        let n = LEAF_CAPACITY * 3;
        for i in 0..n {
            index.insert(7, RecordId::new(0, i as i32)).unwrap();
        }

        // a full scan sees every duplicate exactly once
        let entries = scan_from(&mut index, i32::MIN);
        assert_eq!(entries.len(), n);
        assert!(entries.iter().all(|&(k, _)| k == 7));

        let mut sids: Vec<i32> = entries.iter().map(|&(_, r)| r.sid).collect();
        sids.sort_unstable();
        assert_eq!(sids, (0..n as i32).collect::<Vec<_>>());

        // a point locate still lands on an entry with the searched key
        let mut cursor = index.locate(7).unwrap();
        let (key, _) = index.read_forward(&mut cursor).unwrap().unwrap();
        assert_eq!(key, 7);
    }

    #[test]
    fn metadata_survives_close_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");

        let mut index = BTreeIndex::open(&path, Mode::Write).unwrap();
        for key in 0..1000 {
            index.insert(key, rid(key)).unwrap();
        }
        let height = index.height();
        let root = index.root_pid();
        index.close().unwrap();

        let mut index = BTreeIndex::open(&path, Mode::Read).unwrap();
        assert_eq!(index.height(), height);
        assert_eq!(index.root_pid(), root);

        for key in 0..1000 {
            let mut cursor = index.locate(key).unwrap();
            let (found, r) = index.read_forward(&mut cursor).unwrap().unwrap();
            assert_eq!(found, key);
            assert_eq!(r, rid(key));
        }
    }

    #[test]
    fn dropping_without_close_skips_the_metadata_commit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");

        let mut index = BTreeIndex::open(&path, Mode::Write).unwrap();
        index.insert(1, rid(1)).unwrap();
        drop(index);

        let index = BTreeIndex::open(&path, Mode::Write).unwrap();
        assert!(index.is_empty());
    }
}
