//! CLI subcommands.

pub mod archive;
pub mod config;
pub mod deploy;
pub mod package;
