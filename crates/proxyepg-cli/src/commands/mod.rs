//! Subcommand implementations.

pub mod channels;
pub mod config;
pub mod run;
