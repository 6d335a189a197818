//! Text command input for Mixdeck
//!
//! One command per line; see [`HELP`] for the vocabulary.

mod commands;

pub use commands::{parse_command, Command, Dispatch, ParseError, HELP};
