//! CLI subcommand implementations.

pub mod add;
pub mod archive;
pub mod edit;
pub mod export;
pub mod list;
pub mod session;
pub mod show;
pub mod sort;
pub mod status;
pub mod util;
