//! Yes adapter: one broadcast-schedule request per channel per local day.

use chrono::NaiveDate;
use proxyepg_core::{Provider, ReferenceZone, TimeWindow};
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use tracing::debug;
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{self, HttpSettings};
use crate::provider::{BoxFuture, ScheduleProvider};
use crate::raw::{RawRecord, YesRecord, parse_items};

#[derive(Debug, Clone)]
pub struct YesConfig {
    /// Base of the per-channel schedule endpoint.
    pub schedule_url: String,
}

impl YesConfig {
    pub const DEFAULT_SCHEDULE_URL: &'static str =
        "https://svc.yes.co.il/api/content/broadcast-schedule/channels";
}

impl Default for YesConfig {
    fn default() -> Self {
        Self {
            schedule_url: Self::DEFAULT_SCHEDULE_URL.to_string(),
        }
    }
}

/// Yes schedule provider.
pub struct YesProvider {
    client: Client,
    config: YesConfig,
    zone: ReferenceZone,
}

impl YesProvider {
    pub fn new(config: YesConfig, http: &HttpSettings, zone: ReferenceZone) -> ProviderResult<Self> {
        Url::parse(&config.schedule_url)
            .map_err(|e| ProviderError::configuration(format!("invalid Yes schedule url: {e}")))?;
        Ok(Self {
            client: http.build_client()?,
            config,
            zone,
        })
    }

    fn day_url(&self, channel_id: &str, day: NaiveDate) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.config.schedule_url)
            .map_err(|e| ProviderError::configuration(format!("invalid Yes schedule url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::configuration("Yes schedule url cannot be a base"))?
            .pop_if_empty()
            .push(channel_id);
        url.query_pairs_mut()
            .append_pair("date", &day.format("%Y-%m-%d").to_string())
            .append_pair("ignorePastItems", "false");
        Ok(url)
    }

    async fn fetch_day(&self, channel_id: &str, day: NaiveDate) -> ProviderResult<Vec<YesRecord>> {
        let url = self.day_url(channel_id, day)?;
        debug!(url = %url, "requesting Yes schedule");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(ACCEPT_LANGUAGE, "he-IL")
            .header(REFERER, "https://www.yes.co.il/")
            .header(ORIGIN, "https://www.yes.co.il")
            .send()
            .await
            .map_err(http::send_error)?;
        let body = http::read_json(response).await?;
        Ok(parse_items(http::array_at(body, "items"), Provider::Yes))
    }
}

impl ScheduleProvider for YesProvider {
    fn provider(&self) -> Provider {
        Provider::Yes
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
                let items = self
                    .fetch_day(channel_id, day)
                    .await
                    .map_err(|e| e.with_provider(Provider::Yes))?;
                debug!(channel = %channel_id, day = %day, count = items.len(), "Yes day fetched");
                records.extend(items.into_iter().map(RawRecord::Yes));
            }
            Ok(records)
        })
    }
}
