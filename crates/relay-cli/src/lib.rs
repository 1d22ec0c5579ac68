//! Operator CLI for the relay bot.
//!
//! The binary in `main.rs` only parses arguments and installs logging; the
//! subcommands and the console collaborators used by `relay dry-run` live
//! here.

pub mod cmd;
pub mod console;
pub mod output;
