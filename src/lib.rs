//! # LarkDB - Minimal Relational Storage Engine
//!
//! LarkDB is a disk-backed storage engine built around a B+tree index over
//! 32-bit signed integer keys. Tables are two-column `(key, value)` heaps;
//! the index maps keys to record locators and drives range-planned
//! selection queries.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Shell (REPL, plaintext)       │
//! ├─────────────────────────────────────┤
//! │   SQL Layer (Lexer/Parser/Planner)   │
//! ├───────────────────┬─────────────────┤
//! │   B+Tree Index    │   Heap Table     │
//! ├───────────────────┴─────────────────┤
//! │      Paged File I/O (1KB pages)      │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! Each table owns two files in the database directory:
//!
//! ```text
//! database_dir/
//! ├── movies.tbl    # heap pages of (key, value) tuples
//! └── movies.idx    # B+tree: metadata page + leaf/interior nodes
//! ```
//!
//! ## Query Planning
//!
//! A `WHERE` conjunction over the key column folds into one contiguous
//! `[min_key, max_key]` interval. The planner proves conjunctions like
//! `key > 5 AND key < 5` empty without touching storage, and picks an
//! index scan whenever a key range exists and the index file does. Value
//! comparisons and key not-equals ride along as residual filters.
//!
//! ## Scope
//!
//! Single-threaded and synchronous by design. No write-ahead logging, no
//! deletion, no transactions: the engine favors a small, fully understood
//! core over operational breadth.
//!
//! ## Module Overview
//!
//! - [`storage`]: fixed-size paged file I/O
//! - [`btree`]: the index — leaf/interior nodes and the tree
//! - [`records`]: slotted heap pages behind [`records::RecordFile`]
//! - [`sql`]: lexer, parser, range planner, executor
//! - [`cli`]: the interactive shell
//! - [`config`]: page geometry constants

pub mod btree;
pub mod cli;
pub mod config;
pub mod records;
pub mod sql;
pub mod storage;

pub use btree::{BTreeIndex, IndexCursor};
pub use records::{RecordFile, RecordId};
pub use sql::{Engine, ExecuteResult, Rows};
pub use storage::{Mode, PagedFile};
