//! # LarkDB CLI Entry Point
//!
//! Binary entry point for the LarkDB shell.
//!
//! ## Usage
//!
//! ```bash
//! # Open the current directory as the database
//! larkdb
//!
//! # Open a specific directory
//! larkdb ./data
//!
//! # Show version
//! larkdb --version
//! ```
//!
//! Table files (`<name>.tbl`) and index files (`<name>.idx`) live directly
//! in the database directory. Logging goes to stderr and is controlled
//! through `RUST_LOG`.

use std::env;
use std::path::PathBuf;

use eyre::{bail, ensure, Result};
use tracing_subscriber::EnvFilter;

use larkdb::cli::Repl;
use larkdb::sql::Engine;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut base_dir: Option<PathBuf> = None;

    for arg in &args[1..] {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-v" => {
                println!("larkdb {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            flag if flag.starts_with('-') => {
                bail!("unknown option: {}", flag);
            }
            path => {
                if base_dir.is_some() {
                    bail!("multiple database directories specified");
                }
                base_dir = Some(PathBuf::from(path));
            }
        }
    }

    let base_dir = base_dir.unwrap_or_else(|| PathBuf::from("."));
    ensure!(
        base_dir.is_dir(),
        "'{}' is not a directory",
        base_dir.display()
    );

    let mut repl = Repl::new(Engine::new(base_dir))?;
    repl.run()
}

fn print_usage() {
    println!("LarkDB - disk-backed B+tree storage engine");
    println!();
    println!("USAGE:");
    println!("    larkdb [OPTIONS] [DATABASE_DIR]");
    println!();
    println!("ARGS:");
    println!("    [DATABASE_DIR]    Directory holding .tbl/.idx files (default: .)");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help        Print help information");
    println!("    -v, --version     Print version information");
}
