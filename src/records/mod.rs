//! # Heap Table Storage
//!
//! This module implements the append-only heap file that stores the actual
//! `(key, value)` tuples. The B+tree index references tuples here through
//! [`RecordId`]s; full table scans walk the file in record-id order.
//!
//! ## Page Layout
//!
//! Heap pages use a slot array so variable-length values pack tightly:
//!
//! ```text
//! +--------------------------+
//! | record_count    (u16 LE) |
//! | free_end        (u16 LE) |
//! +--------------------------+
//! | slot[0]         (u16 LE) |  cell offset, grows down from the header
//! | slot[1]                  |
//! | ...                      |
//! +--------------------------+
//! | free space               |
//! +--------------------------+
//! | cells                    |  grow up from the page end
//! | [key: i32][len: u16][..] |
//! +--------------------------+
//! ```
//!
//! ## Record Ids
//!
//! A `RecordId` is `(page id, slot id)`, ordered lexicographically.
//! `pid == -1` is the "no record" sentinel. Appends go to the last page
//! while the value fits, then roll over to a fresh page, so record ids are
//! monotonically increasing in append order.

use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use zerocopy::little_endian::{I32, U16};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{HEAP_CELL_OVERHEAD, HEAP_HEADER_SIZE, HEAP_MAX_VALUE_LEN, PAGE_SIZE};
use crate::storage::{Mode, PagedFile};

/// Locator of one tuple in the heap: `(page id, slot id)`, ordered
/// lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordId {
    pub pid: i32,
    pub sid: i32,
}

impl RecordId {
    pub const fn new(pid: i32, sid: i32) -> Self {
        Self { pid, sid }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct HeapHeader {
    record_count: U16,
    free_end: U16,
}

const _: () = assert!(std::mem::size_of::<HeapHeader>() == HEAP_HEADER_SIZE);

struct HeapPage {
    data: [u8; PAGE_SIZE],
}

impl HeapPage {
    fn new() -> Self {
        let mut page = Self {
            data: [0u8; PAGE_SIZE],
        };
        page.header_mut().free_end = U16::new(PAGE_SIZE as u16);
        page
    }

    fn header(&self) -> &HeapHeader {
        HeapHeader::ref_from_bytes(&self.data[..HEAP_HEADER_SIZE]).unwrap()
    }

    fn header_mut(&mut self) -> &mut HeapHeader {
        HeapHeader::mut_from_bytes(&mut self.data[..HEAP_HEADER_SIZE]).unwrap()
    }

    fn record_count(&self) -> usize {
        self.header().record_count.get() as usize
    }

    fn slot(&self, sid: usize) -> usize {
        let off = HEAP_HEADER_SIZE + sid * 2;
        U16::ref_from_bytes(&self.data[off..off + 2]).unwrap().get() as usize
    }

    fn free_space(&self) -> usize {
        self.header().free_end.get() as usize - HEAP_HEADER_SIZE - self.record_count() * 2
    }

    fn fits(&self, value_len: usize) -> bool {
        self.free_space() >= 2 + HEAP_CELL_OVERHEAD + value_len
    }

    fn append(&mut self, key: i32, value: &str) -> Result<usize> {
        ensure!(self.fits(value.len()), "heap page full");

        let cell_size = HEAP_CELL_OVERHEAD + value.len();
        let offset = self.header().free_end.get() as usize - cell_size;

        self.data[offset..offset + 4].copy_from_slice(&key.to_le_bytes());
        self.data[offset + 4..offset + 6]
            .copy_from_slice(&(value.len() as u16).to_le_bytes());
        self.data[offset + 6..offset + cell_size].copy_from_slice(value.as_bytes());

        let sid = self.record_count();
        let slot_off = HEAP_HEADER_SIZE + sid * 2;
        self.data[slot_off..slot_off + 2].copy_from_slice(&(offset as u16).to_le_bytes());

        let header = self.header_mut();
        header.record_count = U16::new(sid as u16 + 1);
        header.free_end = U16::new(offset as u16);

        Ok(sid)
    }

    fn record(&self, sid: usize) -> Result<(i32, String)> {
        ensure!(
            sid < self.record_count(),
            "slot {} out of bounds (record_count={})",
            sid,
            self.record_count()
        );

        let offset = self.slot(sid);
        ensure!(
            offset + HEAP_CELL_OVERHEAD <= PAGE_SIZE,
            "cell header extends beyond page boundary: offset={}",
            offset
        );

        let key = I32::ref_from_bytes(&self.data[offset..offset + 4])
            .unwrap()
            .get();
        let len = U16::ref_from_bytes(&self.data[offset + 4..offset + 6])
            .unwrap()
            .get() as usize;
        ensure!(
            offset + HEAP_CELL_OVERHEAD + len <= PAGE_SIZE,
            "cell value extends beyond page boundary: offset={}, len={}",
            offset,
            len
        );

        let value = std::str::from_utf8(&self.data[offset + 6..offset + 6 + len])
            .wrap_err("heap cell holds invalid utf-8")?;
        Ok((key, value.to_owned()))
    }
}

/// The heap file of one table: `(key, value)` tuples addressed by
/// [`RecordId`], appended at the tail and never moved.
#[derive(Debug)]
pub struct RecordFile {
    file: PagedFile,
}

impl RecordFile {
    pub fn open<P: AsRef<Path>>(path: P, mode: Mode) -> Result<Self> {
        Ok(Self {
            file: PagedFile::open(path, mode)?,
        })
    }

    pub fn close(self) -> Result<()> {
        self.file.sync()
    }

    pub fn append(&mut self, key: i32, value: &str) -> Result<RecordId> {
        ensure!(
            value.len() <= HEAP_MAX_VALUE_LEN,
            "value of {} bytes exceeds the page limit of {}",
            value.len(),
            HEAP_MAX_VALUE_LEN
        );

        let mut page = HeapPage::new();
        let mut pid = self.file.end_pid();

        if pid > 0 {
            let last = pid - 1;
            self.file.read(last, &mut page.data)?;
            if page.fits(value.len()) {
                pid = last;
            } else {
                page = HeapPage::new();
            }
        }

        let sid = page.append(key, value)?;
        self.file.write(pid, &page.data)?;

        Ok(RecordId::new(pid, sid as i32))
    }

    pub fn read(&mut self, rid: RecordId) -> Result<(i32, String)> {
        ensure!(rid.sid >= 0, "invalid record id ({}, {})", rid.pid, rid.sid);
        let mut page = HeapPage::new();
        self.file.read(rid.pid, &mut page.data)?;
        page.record(rid.sid as usize)
    }

    /// One past the last record: the rid the next `append` would return
    /// if the last page still has room.
    pub fn end_rid(&mut self) -> Result<RecordId> {
        let pages = self.file.end_pid();
        if pages == 0 {
            return Ok(RecordId::new(0, 0));
        }

        let last = pages - 1;
        let mut page = HeapPage::new();
        self.file.read(last, &mut page.data)?;
        Ok(RecordId::new(last, page.record_count() as i32))
    }

    /// Successor of `rid` in `(pid, sid)` order, or `None` at the tail.
    pub fn next_rid(&mut self, rid: RecordId) -> Result<Option<RecordId>> {
        let mut page = HeapPage::new();
        self.file.read(rid.pid, &mut page.data)?;

        if (rid.sid + 1) < page.record_count() as i32 {
            return Ok(Some(RecordId::new(rid.pid, rid.sid + 1)));
        }
        if rid.pid + 1 < self.file.end_pid() {
            return Ok(Some(RecordId::new(rid.pid + 1, 0)));
        }
        Ok(None)
    }
}
