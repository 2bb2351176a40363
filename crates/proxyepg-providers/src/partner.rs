//! Partner TV adapter.
//!
//! One `GetEpg` call per local calendar day. The response nests event lists
//! under channel entries; only the entry whose id matches is kept.

use chrono::NaiveDate;
use proxyepg_core::{Provider, ReferenceZone, TimeWindow};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{self, HttpSettings};
use crate::provider::{BoxFuture, ScheduleProvider};
use crate::raw::{PartnerRecord, RawRecord, parse_items};

/// Configuration for the Partner adapter.
#[derive(Debug, Clone)]
pub struct PartnerConfig {
    pub epg_url: String,
    /// Value of the `brand` header.
    pub brand: String,
}

impl PartnerConfig {
    pub const DEFAULT_EPG_URL: &'static str =
        "https://my.partner.co.il/TV.Services/MyTvSrv.svc/SeaChange/GetEpg";
    pub const DEFAULT_BRAND: &'static str = "orange";
}

impl Default for PartnerConfig {
    fn default() -> Self {
        Self {
            epg_url: Self::DEFAULT_EPG_URL.to_string(),
            brand: Self::DEFAULT_BRAND.to_string(),
        }
    }
}

/// Partner schedule provider.
pub struct PartnerProvider {
    client: Client,
    config: PartnerConfig,
    headers: HeaderMap,
    zone: ReferenceZone,
}

impl PartnerProvider {
    pub fn new(config: PartnerConfig, http: &HttpSettings, zone: ReferenceZone) -> ProviderResult<Self> {
        let headers = site_headers(&config.brand)?;
        Ok(Self {
            client: http.build_client()?,
            config,
            headers,
            zone,
        })
    }

    async fn fetch_day(&self, channel_id: &str, day: NaiveDate) -> ProviderResult<Vec<Value>> {
        let body = request_body(channel_id, day);
        debug!(url = %self.config.epg_url, channel = %channel_id, day = %day, "requesting Partner EPG");
        let response = self
            .client
            .post(&self.config.epg_url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(http::send_error)?;
        let body = http::read_json(response).await?;
        Ok(extract_channel_events(body, channel_id))
    }
}

impl ScheduleProvider for PartnerProvider {
    fn provider(&self) -> Provider {
        Provider::Partner
    }

    fn fetch<'a>(
        &'a self,
        channel_id: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawRecord>>> {
        Box::pin(async move {
            let channel_id = channel_id.trim();
            let mut records = Vec::new();
            for day in window.local_days(&self.zone) {
                let events = self
                    .fetch_day(channel_id, day)
                    .await
                    .map_err(|e| e.with_provider(Provider::Partner))?;
                let parsed: Vec<PartnerRecord> = parse_items(events, Provider::Partner);
                debug!(channel = %channel_id, day = %day, count = parsed.len(), "Partner day fetched");
                records.extend(parsed.into_iter().map(RawRecord::Partner));
            }
            Ok(records)
        })
    }
}

fn site_headers(brand: &str) -> ProviderResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    let brand = HeaderValue::from_str(brand)
        .map_err(|e| ProviderError::configuration(format!("invalid Partner brand: {e}")))?;
    headers.insert(HeaderName::from_static("brand"), brand);
    for (name, value) in [
        ("category", "TV"),
        ("platform", "WEB"),
        ("subcategory", "EPG"),
        ("lang", "he-il"),
    ] {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    Ok(headers)
}

/// `{"_keys":["param"],"_values":["<id>|<date>|UTC"],"param":"<id>|<date>|UTC"}`
fn request_body(channel_id: &str, day: NaiveDate) -> Value {
    let param = format!("{channel_id}|{}|UTC", day.format("%Y-%m-%d"));
    json!({
        "_keys": ["param"],
        "_values": [param],
        "param": param,
    })
}

/// Returns the `events` of the `data[]` entry whose `id` is `channel_id`.
pub(crate) fn extract_channel_events(body: Value, channel_id: &str) -> Vec<Value> {
    http::array_at(body, "data")
        .into_iter()
        .find(|entry| match entry.get("id") {
            Some(Value::String(id)) => id.trim() == channel_id,
            Some(Value::Number(id)) => id.to_string() == channel_id,
            _ => false,
        })
        .map(|entry| http::array_at(entry, "events"))
        .unwrap_or_default()
}
