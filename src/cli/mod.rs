//! Command-line interface for recipe-sieve.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{CheckArgs, Cli, Commands, DiscoverArgs, FilterArgs, ProbeArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
