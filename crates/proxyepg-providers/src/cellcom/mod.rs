//! Cellcom TV adapter (Kaltura OTT backend).
//!
//! An anonymous session token (`ks`) is obtained once per adapter instance and
//! shared by every channel fetched through it. Assets are then listed per
//! channel, either all at once and filtered locally (the default) or with a
//! backend date filter that may need a quoted-timestamp retry.

mod query;

use proxyepg_core::{Provider, TimeWindow};
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::http::{self, HttpSettings};
use crate::provider::{BoxFuture, ScheduleProvider};
use crate::raw::{CellcomRecord, RawRecord, parse_items};
use crate::single_flight::SharedSlot;

pub use query::CellcomStrategy;
use query::{AssetPage, TimestampForm};

/// Configuration for the Cellcom adapter.
#[derive(Debug, Clone)]
pub struct CellcomConfig {
    /// Kaltura service root, e.g. `https://api.frp1.ott.kaltura.com/api_v3/service`.
    pub service_url: String,
    pub partner_id: String,
    pub api_version: String,
    pub client_tag: String,
    pub strategy: CellcomStrategy,
    /// API error code meaning "timestamps must be quoted".
    pub quoted_timestamp_code: String,
    pub page_size: u32,
    /// Device id sent at login; random when not set.
    pub udid: Option<String>,
}

impl CellcomConfig {
    pub const DEFAULT_SERVICE_URL: &'static str =
        "https://api.frp1.ott.kaltura.com/api_v3/service";
    pub const DEFAULT_PARTNER_ID: &'static str = "3197";
    pub const DEFAULT_API_VERSION: &'static str = "5.4.0.28193";
    pub const DEFAULT_CLIENT_TAG: &'static str = "2500009-Android";
    pub const DEFAULT_QUOTED_TIMESTAMP_CODE: &'static str = "4004";
    pub const DEFAULT_PAGE_SIZE: u32 = 1000;

    pub fn with_strategy(mut self, strategy: CellcomStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_partner_id(mut self, partner_id: impl Into<String>) -> Self {
        self.partner_id = partner_id.into();
        self
    }

    pub fn with_udid(mut self, udid: impl Into<String>) -> Self {
        self.udid = Some(udid.into());
        self
    }

    fn login_url(&self) -> String {
        format!(
            "{}/OTTUser/action/anonymousLogin",
            self.service_url.trim_end_matches('/')
        )
    }

    fn list_url(&self) -> String {
        format!("{}/asset/action/list", self.service_url.trim_end_matches('/'))
    }
}

impl Default for CellcomConfig {
    fn default() -> Self {
        Self {
            service_url: Self::DEFAULT_SERVICE_URL.to_string(),
            partner_id: Self::DEFAULT_PARTNER_ID.to_string(),
            api_version: Self::DEFAULT_API_VERSION.to_string(),
            client_tag: Self::DEFAULT_CLIENT_TAG.to_string(),
            strategy: CellcomStrategy::default(),
            quoted_timestamp_code: Self::DEFAULT_QUOTED_TIMESTAMP_CODE.to_string(),
            page_size: Self::DEFAULT_PAGE_SIZE,
            udid: None,
        }
    }
}

/// Cellcom schedule provider.
pub struct CellcomProvider {
    client: Client,
    config: CellcomConfig,
    udid: String,
    session: SharedSlot<String>,
}

impl CellcomProvider {
    pub fn new(config: CellcomConfig, http: &HttpSettings) -> ProviderResult<Self> {
        let udid = config
            .udid
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(Self {
            client: http.build_client()?,
            config,
            udid,
            session: SharedSlot::new(),
        })
    }

    async fn post(&self, url: &str, body: &Value) -> ProviderResult<Value> {
        debug!(url = %url, "posting Kaltura request");
        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(http::send_error)?;
        http::read_json(response).await
    }

    async fn login(&self) -> ProviderResult<String> {
        let payload =
            query::login_payload(&self.config.api_version, &self.config.partner_id, &self.udid);
        let body = self
            .post(&self.config.login_url(), &payload)
            .await
            .map_err(|e| {
                ProviderError::authentication(format!("anonymous login failed: {}", e.message()))
            })?;
        let ks = query::parse_login(&body)?;
        info!(partner_id = %self.config.partner_id, "Cellcom session established");
        Ok(ks)
    }

    async fn list(&self, ks: &str, ksql: &str) -> ProviderResult<AssetPage> {
        let payload = query::list_payload(
            ks,
            ksql,
            &self.config.api_version,
            &self.config.client_tag,
            self.config.page_size,
        );
        let body = self.post(&self.config.list_url(), &payload).await?;
        Ok(AssetPage::from_body(body))
    }

    async fn fetch_records(&self, site_id: &str, window: &TimeWindow) -> ProviderResult<Vec<CellcomRecord>> {
        let ks = self.session.get_or_fetch(|| self.login()).await?;
        let channel = query::channel_key(site_id);

        let objects = match self.config.strategy {
            CellcomStrategy::FullListing => {
                let ksql = query::ksql(channel, None);
                query::expect_objects(self.list(ks, &ksql).await?)?
            }
            CellcomStrategy::TimeRange => {
                query::run_with_quote_fallback(
                    |form: TimestampForm| {
                        let ksql = query::ksql(channel, Some((window, form)));
                        async move { self.list(ks, &ksql).await }
                    },
                    &self.config.quoted_timestamp_code,
                )
                .await?
            }
        };

        let total = objects.len();
        let records = query::retain_overlapping(parse_items(objects, Provider::Cellcom), window);
        debug!(channel = %channel, listed = total, kept = records.len(), "Cellcom assets filtered");
        Ok(records)
    }
}

impl ScheduleProvider for CellcomProvider {
    fn provider(&self) -> Provider {
        Provider::Cellcom
    }

    fn fetch<'a>(
        &'a self,
        channel_id: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawRecord>>> {
        Box::pin(async move {
            let records = self
                .fetch_records(channel_id, window)
                .await
                .map_err(|e| e.with_provider(Provider::Cellcom))?;
            Ok(records.into_iter().map(RawRecord::Cellcom).collect())
        })
    }
}
