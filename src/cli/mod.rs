//! # Interactive Shell
//!
//! The command-line front end: a rustyline read-eval-print loop that feeds
//! statements to the [`Engine`](crate::sql::Engine) and prints result rows
//! as plaintext, one row per line.

mod repl;

pub use repl::Repl;
