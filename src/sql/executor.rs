//! # Statement Execution
//!
//! `Engine` binds the storage pieces together: it resolves table names to
//! heap and index files, asks the planner how to run each selection, and
//! drives the chosen scan.
//!
//! ## Selection
//!
//! An index scan positions a cursor at `min_key` and walks the leaf chain
//! until the key exceeds `max_key` — strictly exceeds, so duplicates of
//! `max_key` spanning a leaf boundary are all returned. The heap tuple is
//! read only when the projection or a value residual requires it; bare
//! `COUNT(*)` and key-only projections never touch the heap.
//!
//! A table scan walks record ids from `(0, 0)` and evaluates the full
//! conjunction against every tuple.
//!
//! ## Loading
//!
//! `LOAD` reads `key,value` lines (the value optionally quoted) and
//! appends them to the heap; `WITH INDEX` maintains the B+tree alongside.
//! `CREATE INDEX` bulk-builds the index from an existing heap file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use eyre::{eyre, Result, WrapErr};
use tracing::info;

use crate::btree::BTreeIndex;
use crate::records::{RecordFile, RecordId};
use crate::storage::Mode;

use super::ast::{LoadStatement, Projection, SelectStatement, Statement};
use super::parser::parse;
use super::planner::{plan, IndexScanPlan, QueryPlan};

pub const TABLE_FILE_EXTENSION: &str = "tbl";
pub const INDEX_FILE_EXTENSION: &str = "idx";

/// Result rows of one selection, already projected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rows {
    Keys(Vec<i32>),
    Values(Vec<String>),
    Pairs(Vec<(i32, String)>),
    Count(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteResult {
    Rows(Rows),
    Loaded(usize),
    Indexed(usize),
}

/// Executes statements against the table files of one directory.
#[derive(Debug)]
pub struct Engine {
    base_dir: PathBuf,
}

impl Engine {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", table, TABLE_FILE_EXTENSION))
    }

    fn index_path(&self, table: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", table, INDEX_FILE_EXTENSION))
    }

    /// Parses and runs one statement.
    pub fn execute(&self, input: &str) -> Result<ExecuteResult> {
        match parse(input)? {
            Statement::Select(stmt) => Ok(ExecuteResult::Rows(self.select(&stmt)?)),
            Statement::Load(stmt) => Ok(ExecuteResult::Loaded(self.load(&stmt)?)),
            Statement::CreateIndex { table } => {
                Ok(ExecuteResult::Indexed(self.create_index(table)?))
            }
        }
    }

    pub fn select(&self, stmt: &SelectStatement<'_>) -> Result<Rows> {
        let mut records = RecordFile::open(self.table_path(stmt.table), Mode::Read)
            .wrap_err_with(|| format!("table '{}' does not exist", stmt.table))?;

        let index_path = self.index_path(stmt.table);
        let index_available = index_path.exists();

        let mut count = 0usize;
        let mut matched: Vec<(i32, Option<String>)> = Vec::new();

        match plan(&stmt.predicates, stmt.projection, index_available) {
            QueryPlan::Unsat => {}
            QueryPlan::IndexScan(scan) => {
                let mut index = BTreeIndex::open(&index_path, Mode::Read)?;
                self.index_scan(
                    &mut index,
                    &mut records,
                    &scan,
                    stmt.projection,
                    &mut count,
                    &mut matched,
                )?;
            }
            QueryPlan::TableScan => {
                self.table_scan(&mut records, stmt, &mut count, &mut matched)?;
            }
        }

        Ok(project(stmt.projection, matched, count))
    }

    fn index_scan(
        &self,
        index: &mut BTreeIndex,
        records: &mut RecordFile,
        scan: &IndexScanPlan<'_>,
        projection: Projection,
        count: &mut usize,
        matched: &mut Vec<(i32, Option<String>)>,
    ) -> Result<()> {
        if index.is_empty() {
            return Ok(());
        }

        let mut cursor = index.locate(scan.min_key)?;
        while let Some((key, rid)) = index.read_forward(&mut cursor)? {
            if key > scan.max_key {
                break;
            }
            if scan.key_not_equals.contains(&key) {
                continue;
            }

            let value = if scan.need_value {
                let (_, value) = records.read(rid)?;
                let keep = scan
                    .value_predicates
                    .iter()
                    .all(|(op, literal)| op.matches(value.as_str().cmp(*literal)));
                if !keep {
                    continue;
                }
                Some(value)
            } else {
                None
            };

            *count += 1;
            if projection != Projection::Count {
                matched.push((key, value));
            }
        }

        Ok(())
    }

    fn table_scan(
        &self,
        records: &mut RecordFile,
        stmt: &SelectStatement<'_>,
        count: &mut usize,
        matched: &mut Vec<(i32, Option<String>)>,
    ) -> Result<()> {
        let end = records.end_rid()?;
        let mut rid = RecordId::new(0, 0);

        while rid < end {
            let (key, value) = records.read(rid)?;

            if stmt.predicates.iter().all(|p| p.matches(key, &value)) {
                *count += 1;
                if stmt.projection != Projection::Count {
                    matched.push((key, Some(value)));
                }
            }

            match records.next_rid(rid)? {
                Some(next) => rid = next,
                None => break,
            }
        }

        Ok(())
    }

    /// Appends every line of the load file to the table's heap, keeping
    /// the index in step when requested. Returns the number of rows
    /// loaded.
    pub fn load(&self, stmt: &LoadStatement<'_>) -> Result<usize> {
        let input = File::open(stmt.file)
            .wrap_err_with(|| format!("failed to open load file '{}'", stmt.file))?;
        let reader = BufReader::new(input);

        let mut records = RecordFile::open(self.table_path(stmt.table), Mode::Write)?;
        let mut index = match stmt.with_index {
            true => Some(BTreeIndex::open(self.index_path(stmt.table), Mode::Write)?),
            false => None,
        };

        let mut loaded = 0usize;
        for (number, line) in reader.lines().enumerate() {
            let line =
                line.wrap_err_with(|| format!("failed to read line {} of '{}'", number + 1, stmt.file))?;
            if line.trim().is_empty() {
                continue;
            }

            let (key, value) = parse_load_line(&line)
                .wrap_err_with(|| format!("malformed line {} of '{}'", number + 1, stmt.file))?;

            let rid = records.append(key, &value)?;
            if let Some(index) = &mut index {
                index.insert(key, rid)?;
            }
            loaded += 1;
        }

        if let Some(index) = index {
            index.close()?;
        }
        records.close()?;

        info!(table = stmt.table, rows = loaded, "load complete");
        Ok(loaded)
    }

    /// Builds the table's index from its heap file. Returns the number of
    /// keys indexed.
    pub fn create_index(&self, table: &str) -> Result<usize> {
        let mut records = RecordFile::open(self.table_path(table), Mode::Read)
            .wrap_err_with(|| format!("table '{}' does not exist", table))?;
        let mut index = BTreeIndex::open(self.index_path(table), Mode::Write)?;

        let end = records.end_rid()?;
        let mut rid = RecordId::new(0, 0);
        let mut indexed = 0usize;

        while rid < end {
            let (key, _) = records.read(rid)?;
            index.insert(key, rid)?;
            indexed += 1;

            match records.next_rid(rid)? {
                Some(next) => rid = next,
                None => break,
            }
        }

        index.close()?;
        info!(table, keys = indexed, "index built");
        Ok(indexed)
    }
}

fn project(projection: Projection, matched: Vec<(i32, Option<String>)>, count: usize) -> Rows {
    match projection {
        Projection::Count => Rows::Count(count),
        Projection::Key => Rows::Keys(matched.into_iter().map(|(key, _)| key).collect()),
        Projection::Value => Rows::Values(matched.into_iter().filter_map(|(_, v)| v).collect()),
        Projection::All => Rows::Pairs(
            matched
                .into_iter()
                .filter_map(|(key, v)| v.map(|v| (key, v)))
                .collect(),
        ),
    }
}

/// Parses one `key,value` load line. The value may be wrapped in single
/// or double quotes; an unmatched quote keeps the remainder of the line.
fn parse_load_line(line: &str) -> Result<(i32, String)> {
    let rest = line.trim_start_matches([' ', '\t']);

    let comma = rest
        .find(',')
        .ok_or_else(|| eyre!("expected 'key,value', found no comma"))?;

    let key_text = rest[..comma].trim();
    let key = key_text
        .parse::<i32>()
        .wrap_err_with(|| format!("invalid key '{}'", key_text))?;

    let value = rest[comma + 1..].trim_start_matches([' ', '\t']);
    let value = match value.chars().next() {
        Some(quote @ ('\'' | '"')) => {
            let inner = &value[1..];
            match inner.find(quote) {
                Some(end) => &inner[..end],
                None => inner,
            }
        }
        _ => value,
    };

    Ok((key, value.to_owned()))
}
