//! Config loading, adapter wiring, guide output
//!
//! This crate provides the `proxyepg` command-line interface. One
//! invocation is one guide run; schedule it with cron or a systemd timer.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod secret;

pub use cli::Cli;
pub use config::AppConfig;
pub use error::{CliError, CliResult};
