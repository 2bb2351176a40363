//! Configuration commands.

use std::path::Path;

use proxyepg_core::Provider;

use crate::config::AppConfig;
use crate::error::{CliError, CliResult};

/// Dump the effective configuration to stdout.
pub fn dump(config: &AppConfig, path: &Path) -> CliResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| CliError::config(format!("failed to serialize config: {e}")))?;
    println!("# config.toml ({})", path.display());
    println!("{toml_str}");
    Ok(())
}

/// Validate the configuration without contacting any provider.
///
/// Checks the timezone, run limits, secret references and the catalog.
pub fn validate(config: &AppConfig) -> CliResult<()> {
    config.engine_config()?;
    config.http_settings()?;
    let catalog = config.load_catalog()?;

    let usage = catalog.provider_usage();
    for provider in Provider::ALL {
        let Some(count) = usage.get(&provider) else {
            continue;
        };
        if !config.providers.common(provider).enabled {
            println!(
                "warning: {count} variant(s) use {}, which is disabled",
                provider.key()
            );
        }
    }

    println!("Catalog has {} channel(s).", catalog.len());
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> CliResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
