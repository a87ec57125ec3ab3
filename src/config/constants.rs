//! # LarkDB Configuration Constants
//!
//! This module centralizes the page geometry constants. Node capacities are
//! derived from the page size, so changing `PAGE_SIZE` automatically
//! re-derives everything below it. Constants that depend on each other are
//! co-located to prevent mismatch bugs.
//!
//! ## Dependency Graph
//!
//! ```text
//! PAGE_SIZE (1024 bytes)
//!       │
//!       ├─> LEAF_CAPACITY (derived: (PAGE_SIZE - LEAF_HEADER_SIZE) / LEAF_ENTRY_SIZE)
//!       │     LEAF_HEADER_SIZE (8 bytes: key count + next-leaf pointer)
//!       │     LEAF_ENTRY_SIZE  (12 bytes: record id + key)
//!       │
//!       └─> INTERIOR_CAPACITY (derived: (PAGE_SIZE - 8) / 8)
//!             One separator key plus one child pointer per slot, plus the
//!             leading left child pointer and the key count.
//! ```
//!
//! ## Critical Invariants
//!
//! Enforced by compile-time assertions:
//!
//! 1. `PAGE_SIZE` is a power of two
//! 2. `LEAF_CAPACITY >= 2` (a page too small to split is rejected at build time)
//! 3. Leaf and interior layouts fit within `PAGE_SIZE`

/// Size of every page in table and index files, in bytes.
pub const PAGE_SIZE: usize = 1024;

/// Page id sentinel for "no such page" (unset root, end of leaf chain).
pub const INVALID_PID: i32 = -1;

/// Page 0 of an index file holds the tree metadata.
pub const META_PID: i32 = 0;

/// Leaf page header: `key_count: i32` + `next_leaf: i32`.
pub const LEAF_HEADER_SIZE: usize = 8;

/// Leaf entry: `rid.pid: i32` + `rid.sid: i32` + `key: i32`.
pub const LEAF_ENTRY_SIZE: usize = 12;

/// Maximum entries per leaf page.
pub const LEAF_CAPACITY: usize = (PAGE_SIZE - LEAF_HEADER_SIZE) / LEAF_ENTRY_SIZE;

/// Maximum separator keys per interior page. Each slot costs one key and
/// one child pointer; the key count and the leading left child pointer
/// account for the remaining 8 bytes.
pub const INTERIOR_CAPACITY: usize = (PAGE_SIZE - 8) / 8;

/// Heap page header: `record_count: u16` + `free_end: u16`.
pub const HEAP_HEADER_SIZE: usize = 4;

/// Heap record cell overhead: `key: i32` + `val_len: u16`.
pub const HEAP_CELL_OVERHEAD: usize = 6;

/// Largest value that fits in a fresh heap page alongside its slot.
pub const HEAP_MAX_VALUE_LEN: usize =
    PAGE_SIZE - HEAP_HEADER_SIZE - 2 - HEAP_CELL_OVERHEAD;

const _: () = assert!(PAGE_SIZE.is_power_of_two());
const _: () = assert!(LEAF_CAPACITY >= 2, "page size too small for a leaf node");
const _: () = assert!(LEAF_HEADER_SIZE + LEAF_CAPACITY * LEAF_ENTRY_SIZE <= PAGE_SIZE);
const _: () = assert!(4 + (INTERIOR_CAPACITY + 1) * 4 + INTERIOR_CAPACITY * 4 <= PAGE_SIZE);
