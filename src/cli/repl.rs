//! # REPL - Read-Eval-Print Loop
//!
//! The interactive loop for the LarkDB shell. Handles:
//!
//! - Reading input with rustyline (history, line editing)
//! - Dispatching dot commands vs statements
//! - Executing statements and printing results
//!
//! One statement per line. Dot commands (`.help`, `.quit`) are executed
//! immediately; anything else goes through the SQL pipeline. Statement
//! errors are displayed but do not terminate the loop; use `.quit` or
//! Ctrl+D to exit.
//!
//! ## Output Format
//!
//! Result rows print one per line:
//!
//! ```text
//! SELECT key ...       -> <int>
//! SELECT value ...     -> <string>
//! SELECT * ...         -> <int> '<string>'
//! SELECT COUNT(*) ...  -> <int>
//! ```

use eyre::{Result, WrapErr};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::sql::{Engine, ExecuteResult, Rows};

const PROMPT: &str = "larkdb> ";

pub struct Repl {
    engine: Engine,
    editor: DefaultEditor,
}

impl Repl {
    pub fn new(engine: Engine) -> Result<Self> {
        let editor = DefaultEditor::new().wrap_err("failed to initialize line editor")?;
        Ok(Self { engine, editor })
    }

    pub fn run(&mut self) -> Result<()> {
        self.print_welcome();

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    if !self.handle_line(&line) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye");
                    break;
                }
                Err(err) => {
                    eprintln!("Error reading input: {}", err);
                    break;
                }
            }
        }

        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return true;
        }

        self.editor.add_history_entry(trimmed).ok();

        if let Some(command) = trimmed.strip_prefix('.') {
            return self.execute_command(command);
        }

        match self.engine.execute(trimmed) {
            Ok(result) => print_result(result),
            Err(err) => eprintln!("Error: {:#}", err),
        }
        true
    }

    fn execute_command(&self, command: &str) -> bool {
        match command.trim() {
            "quit" | "exit" => false,
            "help" => {
                print_help();
                true
            }
            other => {
                eprintln!("Error: unknown command '.{}' (try .help)", other);
                true
            }
        }
    }

    fn print_welcome(&self) {
        println!("LarkDB version {}", env!("CARGO_PKG_VERSION"));
        println!("Enter \".help\" for usage hints.");
        println!("Database directory: {}", self.engine.base_dir().display());
        println!();
    }
}

fn print_result(result: ExecuteResult) {
    match result {
        ExecuteResult::Rows(rows) => print_rows(rows),
        ExecuteResult::Loaded(rows) => {
            println!(
                "{} row{} loaded",
                rows,
                if rows == 1 { "" } else { "s" }
            );
        }
        ExecuteResult::Indexed(keys) => {
            println!(
                "{} key{} indexed",
                keys,
                if keys == 1 { "" } else { "s" }
            );
        }
    }
}

fn print_rows(rows: Rows) {
    match rows {
        Rows::Keys(keys) => {
            for key in keys {
                println!("{}", key);
            }
        }
        Rows::Values(values) => {
            for value in values {
                println!("{}", value);
            }
        }
        Rows::Pairs(pairs) => {
            for (key, value) in pairs {
                println!("{} '{}'", key, value);
            }
        }
        Rows::Count(count) => println!("{}", count),
    }
}

fn print_help() {
    println!("Statements:");
    println!("    SELECT key|value|*|COUNT(*) FROM <table> [WHERE <cond> [AND <cond>]*]");
    println!("    LOAD <table> FROM '<file>' [WITH INDEX]");
    println!("    CREATE INDEX ON <table>");
    println!();
    println!("Conditions compare key against integers or value against strings,");
    println!("with =, <>, !=, <, <=, > or >=.");
    println!();
    println!("Commands:");
    println!("    .help    Show this message");
    println!("    .quit    Exit the shell");
}
