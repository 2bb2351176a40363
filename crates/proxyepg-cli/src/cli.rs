//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use proxyepg_core::{TracingOutputFormat, WeekStart, WindowPolicy};

use crate::config::AppConfig;

/// proxyepg - One XMLTV guide from several Israeli TV providers
#[derive(Debug, Parser)]
#[command(name = "proxyepg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "PROXYEPG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log line format: compact, pretty or json
    #[arg(long, env = "PROXYEPG_LOG_FORMAT")]
    pub log_format: Option<TracingOutputFormat>,

    // --- Guide overrides ---
    /// Channel catalog (channels.xml or TOML)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Output file, `-` for stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Period to cover: day or week
    #[arg(long)]
    pub window: Option<WindowPolicy>,

    /// First day of a week window: sunday or monday
    #[arg(long)]
    pub week_start: Option<WeekStart>,

    /// Reference timezone (IANA name)
    #[arg(long)]
    pub timezone: Option<String>,

    /// Route provider traffic through this proxy
    #[arg(long, env = "PROXYEPG_PROXY")]
    pub proxy: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded config.
    ///
    /// Paths given here are relative to the working directory, not to the
    /// config file.
    pub fn apply_overrides(&self, config: &mut AppConfig) -> std::io::Result<()> {
        let cwd = std::env::current_dir()?;
        if let Some(catalog) = &self.catalog {
            config.guide.catalog = Some(cwd.join(catalog));
        }
        if let Some(output) = &self.output {
            config.guide.output = if output.as_os_str() == "-" {
                output.clone()
            } else {
                cwd.join(output)
            };
        }
        if let Some(window) = self.window {
            config.guide.window = window;
        }
        if let Some(week_start) = self.week_start {
            config.guide.week_start = week_start;
        }
        if let Some(timezone) = &self.timezone {
            config.guide.timezone = timezone.clone();
        }
        if let Some(proxy) = &self.proxy {
            config.network.proxy = Some(proxy.clone());
        }
        Ok(())
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the guide (the default when no command is given)
    Run,

    /// List catalog channels and their variants
    Channels,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration and catalog
    Validate,

    /// Show configuration file path
    Path,
}
