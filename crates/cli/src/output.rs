//! Terminal output.
//!
//! Command results go to stdout; prompts and error notices go to stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fmt::Display;
use std::io::Write;

pub fn line(message: impl Display) {
    println!("{message}");
}

pub fn error(message: impl Display) {
    eprintln!("{message}");
}

/// Print without a newline and flush, for interactive input.
pub fn prompt(message: impl Display) {
    eprint!("{message}");
    let _ = std::io::stderr().flush();
}
