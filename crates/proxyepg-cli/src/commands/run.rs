//! Guide command: builds the guide once and writes it out.
//!
//! Steps:
//! - Catalog and engine settings from config
//! - One adapter per provider the catalog references
//! - Guide run, then atomic output write

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use proxyepg_core::{Provider, ReferenceZone};
use proxyepg_engine::{GuideJob, ProviderRegistry, RunReport};
use proxyepg_providers::{
    CellcomConfig, CellcomProvider, ErrorProvider, FreeTvConfig, FreeTvProvider, HotConfig,
    HotProvider, HttpSettings, PartnerConfig, PartnerProvider, ProviderError, ProviderResult,
    ScheduleProvider, YesConfig, YesProvider,
};

use crate::config::AppConfig;
use crate::error::CliResult;
use crate::output::{self, OutputTarget};
use crate::secret;

/// Builds the guide and writes it to the configured output.
pub async fn run(config: &AppConfig) -> CliResult<RunReport> {
    let zone = config.zone()?;
    let engine_config = config.engine_config()?;
    let http = config.http_settings()?;
    let catalog = config.load_catalog()?;
    info!(channels = catalog.len(), zone = zone.name(), "catalog loaded");

    let registry = build_registry(config, &http, zone, &catalog.provider_usage());
    let job = GuideJob::new(engine_config, catalog, registry)?;
    let (guide, report) = job.run(Utc::now()).await;

    let target = output_target(config);
    output::write_guide(&guide, &target)?;
    info!(
        output = %target,
        channels = guide.channels().len(),
        programmes = guide.programmes().len(),
        "guide written"
    );

    for unresolved in report.unresolved() {
        debug!(channel = %unresolved.channel_id, "left out of guide");
    }
    Ok(report)
}

fn output_target(config: &AppConfig) -> OutputTarget {
    let path = &config.guide.output;
    match OutputTarget::from_path(path) {
        OutputTarget::Stdout => OutputTarget::Stdout,
        OutputTarget::File(path) => OutputTarget::File(config.resolve_path(&path)),
    }
}

/// Builds adapters for every enabled provider that the catalog uses.
///
/// An adapter that cannot be built is replaced by an [`ErrorProvider`], so
/// its variants fail and fall through like any other provider error.
pub fn build_registry(
    config: &AppConfig,
    http: &HttpSettings,
    zone: ReferenceZone,
    usage: &HashMap<Provider, usize>,
) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    for provider in Provider::ALL {
        let Some(variants) = usage.get(&provider) else {
            continue;
        };
        if !config.providers.common(provider).enabled {
            info!(provider = provider.key(), variants, "provider disabled in config");
            continue;
        }
        match build_adapter(provider, config, http, zone) {
            Ok(adapter) => {
                debug!(provider = provider.key(), variants, "adapter ready");
                registry.register(adapter);
            }
            Err(e) => {
                warn!(
                    provider = provider.key(),
                    error = %e,
                    "adapter unavailable, its variants will be skipped"
                );
                registry.register(Arc::new(ErrorProvider::new(provider, e)));
            }
        }
    }

    registry
}

fn build_adapter(
    provider: Provider,
    config: &AppConfig,
    http: &HttpSettings,
    zone: ReferenceZone,
) -> ProviderResult<Arc<dyn ScheduleProvider>> {
    let settings = &config.providers;
    let url = settings.common(provider).url.clone();

    let adapter: Arc<dyn ScheduleProvider> = match provider {
        Provider::FreeTv => {
            let mut ftv = FreeTvConfig::default();
            if let Some(url) = url {
                ftv = ftv.with_api_url(url);
            }
            let cookies = secret::resolve_opt(settings.freetv.cookies.as_deref()).map_err(|e| {
                ProviderError::configuration(format!("providers.freetv.cookies: {e}"))
            })?;
            if let Some(cookies) = cookies {
                ftv = ftv.with_cookies(cookies);
            }
            Arc::new(FreeTvProvider::new(ftv, http, zone)?)
        }
        Provider::Cellcom => {
            let s = &settings.cellcom;
            let mut cellcom = CellcomConfig::default().with_strategy(s.strategy);
            if let Some(url) = url {
                cellcom.service_url = url;
            }
            if let Some(partner_id) = &s.partner_id {
                cellcom = cellcom.with_partner_id(partner_id.clone());
            }
            if let Some(code) = &s.quoted_timestamp_code {
                cellcom.quoted_timestamp_code = code.clone();
            }
            if let Some(udid) = &s.udid {
                cellcom = cellcom.with_udid(udid.clone());
            }
            Arc::new(CellcomProvider::new(cellcom, http)?)
        }
        Provider::Partner => {
            let mut partner = PartnerConfig::default();
            if let Some(url) = url {
                partner.epg_url = url;
            }
            if let Some(brand) = &settings.partner.brand {
                partner.brand = brand.clone();
            }
            Arc::new(PartnerProvider::new(partner, http, zone)?)
        }
        Provider::Yes => {
            let mut yes = YesConfig::default();
            if let Some(url) = url {
                yes.schedule_url = url;
            }
            Arc::new(YesProvider::new(yes, http, zone)?)
        }
        Provider::Hot => {
            let mut hot = HotConfig::default();
            if let Some(url) = url {
                hot.schedule_url = url;
            }
            if let Some(secs) = settings.hot.timeout_secs {
                hot.timeout = Duration::from_secs(secs);
            }
            Arc::new(HotProvider::new(hot, http, zone)?)
        }
    };
    Ok(adapter)
}

/// Output path after CLI overrides, for display.
pub fn output_path(config: &AppConfig) -> PathBuf {
    match output_target(config) {
        OutputTarget::Stdout => PathBuf::from("-"),
        OutputTarget::File(path) => path,
    }
}
