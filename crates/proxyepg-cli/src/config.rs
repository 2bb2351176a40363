//! Tool configuration.
//!
//! Everything lives in one `config.toml`, by default at
//! `~/.config/proxyepg/config.toml`. Every key has a default, so an empty
//! file (or none at all) plus a catalog is enough to run.
//!
//! `network.proxy`, `network.ca_pem_b64` and `providers.freetv.cookies`
//! accept secret references (see [`crate::secret`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use proxyepg_core::{
    Catalog, GuideMeta, LogicalChannel, Provider, ReferenceZone, WeekStart, WindowPolicy,
};
use proxyepg_engine::EngineConfig;
use proxyepg_providers::{CellcomStrategy, HttpSettings};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CliError, CliResult};
use crate::secret;

// ---------------------------------------------------------------------------
// AppConfig (config.toml)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub guide: GuideSettings,
    pub network: NetworkSettings,
    pub providers: ProviderSettings,

    /// Inline catalog, appended after the catalog file.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<LogicalChannel>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// What to build and where to put it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideSettings {
    /// IANA name of the reference timezone.
    pub timezone: String,
    pub window: WindowPolicy,
    pub week_start: WeekStart,
    pub lang: String,
    pub source_info_name: String,
    pub generator_info_name: String,
    /// `channels.xml` or a TOML file with `[[channels]]`.
    pub catalog: Option<PathBuf>,
    /// Output path; `-` writes to stdout.
    pub output: PathBuf,
}

impl Default for GuideSettings {
    fn default() -> Self {
        let meta = GuideMeta::default();
        Self {
            timezone: ReferenceZone::DEFAULT_NAME.to_string(),
            window: WindowPolicy::default(),
            week_start: WeekStart::default(),
            lang: meta.lang,
            source_info_name: meta.source_info_name,
            generator_info_name: meta.generator_info_name,
            catalog: None,
            output: PathBuf::from("guide.xml"),
        }
    }
}

/// Outbound HTTP and run limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub proxy: Option<String>,
    /// Extra root CA, base64 of a PEM bundle.
    pub ca_pem_b64: Option<String>,
    pub insecure_tls: bool,
    pub user_agent: Option<String>,
    pub request_timeout_secs: u64,
    pub run_timeout_secs: u64,
    pub max_parallel_channels: usize,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            proxy: None,
            ca_pem_b64: None,
            insecure_tls: false,
            user_agent: None,
            request_timeout_secs: HttpSettings::DEFAULT_TIMEOUT_SECS,
            run_timeout_secs: EngineConfig::DEFAULT_RUN_TIMEOUT_SECS,
            max_parallel_channels: EngineConfig::DEFAULT_MAX_PARALLEL_CHANNELS,
        }
    }
}

/// Keys every `[providers.*]` table accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonSettings {
    /// A disabled provider is never asked; its variants are skipped.
    pub enabled: bool,
    /// Concurrent fetches against this provider.
    pub concurrency: Option<usize>,
    /// Endpoint override.
    pub url: Option<String>,
}

impl Default for CommonSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: None,
            url: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub freetv: FreeTvSettings,
    pub cellcom: CellcomSettings,
    pub partner: PartnerSettings,
    pub yes: YesSettings,
    pub hot: HotSettings,
}

impl ProviderSettings {
    pub fn common(&self, provider: Provider) -> &CommonSettings {
        match provider {
            Provider::FreeTv => &self.freetv.common,
            Provider::Cellcom => &self.cellcom.common,
            Provider::Partner => &self.partner.common,
            Provider::Yes => &self.yes.common,
            Provider::Hot => &self.hot.common,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeTvSettings {
    #[serde(flatten)]
    pub common: CommonSettings,
    /// Browser `Cookie` header for the challenge session.
    pub cookies: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CellcomSettings {
    #[serde(flatten)]
    pub common: CommonSettings,
    pub strategy: CellcomStrategy,
    pub partner_id: Option<String>,
    pub quoted_timestamp_code: Option<String>,
    pub udid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartnerSettings {
    #[serde(flatten)]
    pub common: CommonSettings,
    pub brand: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YesSettings {
    #[serde(flatten)]
    pub common: CommonSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HotSettings {
    #[serde(flatten)]
    pub common: CommonSettings,
    /// Timeout for one whole-day download.
    pub timeout_secs: Option<u64>,
}

/// A catalog file written in TOML.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    channels: Vec<LogicalChannel>,
}

impl AppConfig {
    /// Loads the configuration from the default path, or defaults if the
    /// file does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Loads the configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proxyepg")
            .join("config.toml")
    }

    /// Resolves `path` against the config file's directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn zone(&self) -> CliResult<ReferenceZone> {
        self.guide
            .timezone
            .parse()
            .map_err(|e| CliError::config(format!("guide.timezone: {e}")))
    }

    pub fn meta(&self) -> GuideMeta {
        GuideMeta {
            source_info_name: self.guide.source_info_name.clone(),
            generator_info_name: self.guide.generator_info_name.clone(),
            lang: self.guide.lang.clone(),
        }
    }

    /// Engine settings derived from `[guide]`, `[network]` and the
    /// per-provider concurrency keys.
    pub fn engine_config(&self) -> CliResult<EngineConfig> {
        let mut config = EngineConfig::new(self.zone()?)
            .with_window_policy(self.guide.window)
            .with_week_start(self.guide.week_start)
            .with_max_parallel_channels(self.network.max_parallel_channels)
            .with_run_timeout(Duration::from_secs(self.network.run_timeout_secs))
            .with_meta(self.meta());
        for provider in Provider::ALL {
            if let Some(limit) = self.providers.common(provider).concurrency {
                config = config.with_provider_concurrency(provider, limit);
            }
        }
        config
            .validate()
            .map_err(|e| CliError::config(e.to_string()))?;
        Ok(config)
    }

    /// HTTP settings with secret references resolved.
    pub fn http_settings(&self) -> CliResult<HttpSettings> {
        let network = &self.network;
        let mut http = HttpSettings::new()
            .with_insecure_tls(network.insecure_tls)
            .with_timeout(Duration::from_secs(network.request_timeout_secs));
        if let Some(proxy) = secret::resolve_opt(network.proxy.as_deref())
            .map_err(|e| CliError::config(format!("network.proxy: {e}")))?
        {
            http = http.with_proxy(proxy);
        }
        if let Some(ca) = secret::resolve_opt(network.ca_pem_b64.as_deref())
            .map_err(|e| CliError::config(format!("network.ca_pem_b64: {e}")))?
        {
            http = http
                .with_ca_pem_base64(&ca)
                .map_err(|e| CliError::config(format!("network.ca_pem_b64: {}", e.message())))?;
        }
        if let Some(agent) = &network.user_agent {
            http = http.with_user_agent(agent.clone());
        }
        Ok(http)
    }

    /// Loads the catalog file (if any) followed by the inline channels.
    pub fn load_catalog(&self) -> CliResult<Catalog> {
        let from_file = match &self.guide.catalog {
            Some(path) => {
                let path = self.resolve_path(path);
                Some(read_catalog_file(&path)?)
            }
            None => None,
        };

        let catalog = match from_file {
            Some(catalog) => catalog.extend(self.channels.clone()),
            None => Catalog::new(self.channels.clone()),
        }
        .map_err(|e| CliError::catalog(self.catalog_label(), e.to_string()))?;

        if catalog.is_empty() {
            return Err(CliError::catalog(
                self.catalog_label(),
                "no channels configured; set guide.catalog or add [[channels]]",
            ));
        }
        Ok(catalog)
    }

    fn catalog_label(&self) -> PathBuf {
        self.guide
            .catalog
            .as_deref()
            .map(|p| self.resolve_path(p))
            .unwrap_or_else(|| PathBuf::from("[[channels]]"))
    }
}

fn read_catalog_file(path: &Path) -> CliResult<Catalog> {
    let content =
        std::fs::read_to_string(path).map_err(|e| CliError::catalog(path, e.to_string()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let catalog = if is_toml {
        let file: CatalogFile =
            toml::from_str(&content).map_err(|e| CliError::catalog(path, e.to_string()))?;
        Catalog::new(file.channels)
    } else {
        Catalog::from_channels_xml(&content)
    };
    catalog.map_err(|e| CliError::catalog(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    mod parsing {
        use super::*;

        #[test]
        fn empty_file_is_all_defaults() {
            let config: AppConfig = toml::from_str("").unwrap();
            assert_eq!(config.guide.timezone, "Asia/Jerusalem");
            assert_eq!(config.guide.window, WindowPolicy::Week);
            assert_eq!(config.guide.output, PathBuf::from("guide.xml"));
            assert_eq!(config.network.run_timeout_secs, 900);
            assert!(config.providers.hot.common.enabled);
            assert_eq!(config.providers.cellcom.strategy, CellcomStrategy::FullListing);
        }

        #[test]
        fn full_example() {
            let config: AppConfig = toml::from_str(
                r#"
[guide]
timezone = "Europe/London"
window = "day"
week_start = "monday"
output = "/srv/epg/guide.xml"

[network]
proxy = "http://10.0.0.1:3128"
max_parallel_channels = 3

[providers.freetv]
concurrency = 1
cookies = "env::IL_FTV_COOKIES"

[providers.cellcom]
strategy = "time_range"
partner_id = "1234"

[providers.hot]
enabled = false
timeout_secs = 120

[[channels]]
id = "Kan11.il"
name = "Kan 11"
variants = [ { site = "freetv.tv", site_id = "3359448" }, { site = "hot.net.il", site_id = "11" } ]
"#,
            )
            .unwrap();

            assert_eq!(config.guide.window, WindowPolicy::Day);
            assert_eq!(config.guide.week_start, WeekStart::Monday);
            assert_eq!(config.network.max_parallel_channels, 3);
            assert_eq!(config.providers.freetv.common.concurrency, Some(1));
            assert_eq!(config.providers.freetv.cookies.as_deref(), Some("env::IL_FTV_COOKIES"));
            assert_eq!(config.providers.cellcom.strategy, CellcomStrategy::TimeRange);
            assert!(!config.providers.hot.common.enabled);
            assert_eq!(config.providers.hot.timeout_secs, Some(120));
            assert_eq!(config.channels.len(), 1);
            assert_eq!(config.channels[0].variants[1].provider, Provider::Hot);
        }

        #[test]
        fn dump_round_trips() {
            let mut config = AppConfig::default();
            config.providers.partner.brand = Some("orange".into());
            let text = toml::to_string_pretty(&config).unwrap();
            let back: AppConfig = toml::from_str(&text).unwrap();
            assert_eq!(back.providers.partner.brand.as_deref(), Some("orange"));
            assert!(back.providers.partner.common.enabled);
        }
    }

    mod derived {
        use super::*;

        #[test]
        fn engine_config_carries_limits() {
            let mut config = AppConfig::default();
            config.guide.window = WindowPolicy::Day;
            config.providers.freetv.common.concurrency = Some(1);
            config.network.max_parallel_channels = 2;

            let engine = config.engine_config().unwrap();
            assert_eq!(engine.window_policy, WindowPolicy::Day);
            assert_eq!(engine.concurrency_for(Provider::FreeTv), 1);
            assert_eq!(engine.max_parallel_channels, 2);
        }

        #[test]
        fn bad_timezone_is_config_error() {
            let mut config = AppConfig::default();
            config.guide.timezone = "Mars/Olympus".into();
            assert!(matches!(config.zone(), Err(CliError::Config(_))));
        }

        #[test]
        fn zero_parallelism_is_rejected() {
            let mut config = AppConfig::default();
            config.network.max_parallel_channels = 0;
            assert!(config.engine_config().is_err());
        }

        #[test]
        fn http_settings_resolve_env_proxy() {
            unsafe {
                std::env::set_var("_PROXYEPG_TEST_PROXY", "http://127.0.0.1:8080");
            }
            let mut config = AppConfig::default();
            config.network.proxy = Some("env::_PROXYEPG_TEST_PROXY".into());
            let http = config.http_settings().unwrap();
            assert_eq!(http.proxy.as_deref(), Some("http://127.0.0.1:8080"));
            unsafe {
                std::env::remove_var("_PROXYEPG_TEST_PROXY");
            }
        }

        #[test]
        fn unresolvable_proxy_is_config_error() {
            let mut config = AppConfig::default();
            config.network.proxy = Some("env::_PROXYEPG_UNSET_PROXY_4321".into());
            assert!(matches!(config.http_settings(), Err(CliError::Config(_))));
        }
    }

    mod catalog {
        use super::*;

        #[test]
        fn xml_file_relative_to_config_then_inline() {
            let dir = tempfile::tempdir().unwrap();
            write(
                dir.path(),
                "channels.xml",
                r#"<channels>
  <channel site="freetv.tv" site_id="1" xmltv_id="A.il">A</channel>
</channels>"#,
            );
            let config_path = write(
                dir.path(),
                "config.toml",
                r#"
[guide]
catalog = "channels.xml"

[[channels]]
id = "B.il"
variants = [ { site = "yes.co.il", site_id = "b" } ]
"#,
            );

            let config = AppConfig::load_from(&config_path).unwrap();
            let catalog = config.load_catalog().unwrap();
            let ids: Vec<&str> = catalog.channels().iter().map(|c| c.id.as_str()).collect();
            assert_eq!(ids, vec!["A.il", "B.il"]);
        }

        #[test]
        fn toml_catalog_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = write(
                dir.path(),
                "channels.toml",
                r#"
[[channels]]
id = "C.il"
variants = [ { site = "partner.co.il", site_id = "c" } ]
"#,
            );
            let mut config = AppConfig::default();
            config.guide.catalog = Some(path);
            assert_eq!(config.load_catalog().unwrap().len(), 1);
        }

        #[test]
        fn missing_file_names_the_path() {
            let mut config = AppConfig::default();
            config.guide.catalog = Some(PathBuf::from("/nonexistent/proxyepg/channels.xml"));
            let err = config.load_catalog().unwrap_err();
            assert!(err.to_string().contains("/nonexistent/proxyepg/channels.xml"));
        }

        #[test]
        fn no_channels_at_all_is_an_error() {
            let err = AppConfig::default().load_catalog().unwrap_err();
            assert!(err.to_string().contains("no channels configured"));
        }
    }
}
