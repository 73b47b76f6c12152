//! Handles Command Line Interface (CLI) related functionalities.
//!
//! Includes argument parsing for the one-shot subcommands, the interactive
//! operator prompts, and table rendering of query results.

mod commands;
mod display;
mod prompts;

pub use commands::*;
pub use prompts::*;
