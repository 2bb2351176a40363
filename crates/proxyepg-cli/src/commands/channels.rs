//! Lists the catalog without fetching anything.

use std::fmt::Write as _;

use proxyepg_core::{Catalog, Provider};

use crate::config::AppConfig;
use crate::error::CliResult;

/// Prints every logical channel with its variants in priority order.
pub fn list(config: &AppConfig) -> CliResult<()> {
    let catalog = config.load_catalog()?;
    print!("{}", render(&catalog, config));
    Ok(())
}

fn render(catalog: &Catalog, config: &AppConfig) -> String {
    let mut out = String::new();
    for channel in catalog.channels() {
        let name = channel
            .variants
            .first()
            .map_or(channel.id.as_str(), |v| channel.display_name_for(v));
        let _ = writeln!(out, "{}  {}", channel.id, name);
        for (rank, variant) in channel.variants.iter().enumerate() {
            let disabled = if config.providers.common(variant.provider).enabled {
                ""
            } else {
                " (disabled)"
            };
            let _ = writeln!(
                out,
                "  {}. {}:{}{}",
                rank + 1,
                variant.provider.key(),
                variant.provider_channel_id,
                disabled
            );
        }
    }

    let usage = catalog.provider_usage();
    let summary: Vec<String> = Provider::ALL
        .iter()
        .filter_map(|p| usage.get(p).map(|n| format!("{}={n}", p.key())))
        .collect();
    let _ = writeln!(
        out,
        "{} channel(s); variants: {}",
        catalog.len(),
        summary.join(" ")
    );
    out
}
