//! # Paged File I/O
//!
//! `PagedFile` implements fixed-size page access over a `std::fs::File`.
//! It is the only component that touches the filesystem; everything above
//! it works in terms of page ids.
//!
//! ## Open Modes
//!
//! - [`Mode::Read`]: the file must already exist; writes are rejected.
//! - [`Mode::Write`]: the file is created when absent; existing contents
//!   are preserved (appends continue after the last page).
//!
//! ## Append Discipline
//!
//! `end_pid()` returns the next page id to allocate. Writing exactly at
//! `end_pid()` extends the file by one page; writing further past the end
//! is rejected so a bug cannot silently create holes.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use tracing::debug;

use crate::config::PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

#[derive(Debug)]
pub struct PagedFile {
    file: File,
    path: PathBuf,
    page_count: i32,
    writable: bool,
}

impl PagedFile {
    pub fn open<P: AsRef<Path>>(path: P, mode: Mode) -> Result<Self> {
        let path = path.as_ref();

        let file = match mode {
            Mode::Read => OpenOptions::new()
                .read(true)
                .open(path)
                .wrap_err_with(|| format!("failed to open '{}' for reading", path.display()))?,
            Mode::Write => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(path)
                .wrap_err_with(|| format!("failed to open '{}' for writing", path.display()))?,
        };

        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to get metadata for '{}'", path.display()))?
            .len();

        ensure!(
            file_size % PAGE_SIZE as u64 == 0,
            "file '{}' size {} is not a multiple of page size {}",
            path.display(),
            file_size,
            PAGE_SIZE
        );

        let page_count = (file_size / PAGE_SIZE as u64) as i32;

        debug!(path = %path.display(), pages = page_count, ?mode, "opened paged file");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            page_count,
            writable: mode == Mode::Write,
        })
    }

    pub fn read(&mut self, pid: i32, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        ensure!(
            pid >= 0 && pid < self.page_count,
            "page {} out of bounds in '{}' (page_count={})",
            pid,
            self.path.display(),
            self.page_count
        );

        self.file
            .seek(SeekFrom::Start(pid as u64 * PAGE_SIZE as u64))
            .wrap_err_with(|| format!("failed to seek to page {} in '{}'", pid, self.path.display()))?;
        self.file
            .read_exact(buf)
            .wrap_err_with(|| format!("failed to read page {} from '{}'", pid, self.path.display()))
    }

    pub fn write(&mut self, pid: i32, buf: &[u8; PAGE_SIZE]) -> Result<()> {
        ensure!(
            self.writable,
            "file '{}' was opened read-only",
            self.path.display()
        );
        ensure!(
            pid >= 0 && pid <= self.page_count,
            "write to page {} past end of '{}' (page_count={})",
            pid,
            self.path.display(),
            self.page_count
        );

        self.file
            .seek(SeekFrom::Start(pid as u64 * PAGE_SIZE as u64))
            .wrap_err_with(|| format!("failed to seek to page {} in '{}'", pid, self.path.display()))?;
        self.file
            .write_all(buf)
            .wrap_err_with(|| format!("failed to write page {} to '{}'", pid, self.path.display()))?;

        if pid == self.page_count {
            self.page_count += 1;
        }

        Ok(())
    }

    /// Next page id to allocate; `write(end_pid(), ..)` appends.
    pub fn end_pid(&self) -> i32 {
        self.page_count
    }

    pub fn sync(&self) -> Result<()> {
        self.file
            .sync_all()
            .wrap_err_with(|| format!("failed to sync '{}'", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
