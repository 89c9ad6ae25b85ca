//! yt CLI library.
//!
//! This crate provides the command-line interface for yt timers.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, ExportArgs, WhenArgs};
pub use config::Config;
