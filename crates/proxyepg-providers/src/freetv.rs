//! FreeTV adapter.
//!
//! The FreeTV web API sits behind a bot challenge. A first request may be
//! answered with `403`; visiting the site home page once establishes the
//! session cookies and the request is then retried exactly once.
//!
//! Windows longer than one local day are requested day by day.

use std::future::Future;

use proxyepg_core::{Provider, ReferenceZone, TimeWindow};
use reqwest::Client;
use reqwest::header::{ACCEPT, COOKIE, ORIGIN, REFERER};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::http::{self, HttpSettings};
use crate::provider::{BoxFuture, ScheduleProvider};
use crate::raw::{FreeTvRecord, RawRecord, parse_items};

/// Query timestamp format, local time with a colon-less offset.
const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M%z";

/// Configuration for the FreeTV adapter.
#[derive(Debug, Clone)]
pub struct FreeTvConfig {
    /// Programme listing endpoint.
    pub api_url: String,
    /// Page visited to clear the bot challenge.
    pub home_url: String,
    /// Value of the `lang` query parameter.
    pub lang: String,
    /// Raw `Cookie` header captured from a browser session, if any.
    pub cookies: Option<String>,
}

impl FreeTvConfig {
    pub const DEFAULT_API_URL: &'static str =
        "https://web.freetv.tv/api/products/lives/programmes";
    pub const DEFAULT_HOME_URL: &'static str = "https://web.freetv.tv/";
    pub const DEFAULT_LANG: &'static str = "HEB";

    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = Some(cookies.into());
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

impl Default for FreeTvConfig {
    fn default() -> Self {
        Self {
            api_url: Self::DEFAULT_API_URL.to_string(),
            home_url: Self::DEFAULT_HOME_URL.to_string(),
            lang: Self::DEFAULT_LANG.to_string(),
            cookies: None,
        }
    }
}

/// FreeTV schedule provider.
pub struct FreeTvProvider {
    client: Client,
    config: FreeTvConfig,
    zone: ReferenceZone,
}

impl FreeTvProvider {
    pub fn new(config: FreeTvConfig, http: &HttpSettings, zone: ReferenceZone) -> ProviderResult<Self> {
        Url::parse(&config.api_url)
            .map_err(|e| ProviderError::configuration(format!("invalid FreeTV api url: {e}")))?;
        Ok(Self {
            client: http.build_client()?,
            config,
            zone,
        })
    }

    /// Builds the listing URL for one channel and one slice of the window.
    fn programmes_url(&self, channel_id: &str, slice: &TimeWindow) -> ProviderResult<Url> {
        let since = self.zone.to_local(slice.start).format(QUERY_TIME_FORMAT).to_string();
        let till = self.zone.to_local(slice.end).format(QUERY_TIME_FORMAT).to_string();
        Url::parse_with_params(
            &self.config.api_url,
            &[
                ("liveId[]", channel_id),
                ("since", since.as_str()),
                ("till", till.as_str()),
                ("lang", self.config.lang.as_str()),
                ("platform", "BROWSER"),
            ],
        )
        .map_err(|e| ProviderError::configuration(format!("invalid FreeTV api url: {e}")))
    }

    async fn request_programmes(&self, url: &Url) -> ProviderResult<Value> {
        debug!(url = %url, "requesting FreeTV programmes");
        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(ORIGIN, "https://web.freetv.tv")
            .header(REFERER, &self.config.home_url);
        if let Some(cookies) = &self.config.cookies {
            request = request.header(COOKIE, cookies);
        }
        let response = request.send().await.map_err(http::send_error)?;
        http::read_json(response).await
    }

    async fn warm_up(&self) -> ProviderResult<()> {
        debug!(url = %self.config.home_url, "visiting FreeTV home page");
        let response = self
            .client
            .get(&self.config.home_url)
            .send()
            .await
            .map_err(http::send_error)?;
        http::check_status(response).await.map(|_| ())
    }

    async fn fetch_slice(&self, channel_id: &str, slice: &TimeWindow) -> ProviderResult<Vec<FreeTvRecord>> {
        let url = self.programmes_url(channel_id, slice)?;
        let body =
            with_challenge_recovery(|| self.request_programmes(&url), || self.warm_up()).await?;
        Ok(parse_items(http::array_at(body, "data"), Provider::FreeTv))
    }
}

impl ScheduleProvider for FreeTvProvider {
    fn provider(&self) -> Provider {
        Provider::FreeTv
    }

    fn fetch<'a>(
        &'a self,
        channel_id: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawRecord>>> {
        Box::pin(async move {
            let mut records = Vec::new();
            for (day, slice) in window.split_by_local_day(&self.zone) {
                let day_records = self
                    .fetch_slice(channel_id, &slice)
                    .await
                    .map_err(|e| e.with_provider(Provider::FreeTv))?;
                debug!(channel = %channel_id, day = %day, count = day_records.len(), "FreeTV day fetched");
                records.extend(day_records.into_iter().map(RawRecord::FreeTv));
            }
            Ok(records)
        })
    }
}

/// Runs `request`; on an access-denied failure runs `warm_up` once and
/// retries `request` exactly once.
///
/// A failed warm-up is logged and the retry still happens, so the caller
/// sees the retry's own outcome.
pub(crate) async fn with_challenge_recovery<T, Req, ReqFut, Warm, WarmFut>(
    mut request: Req,
    warm_up: Warm,
) -> ProviderResult<T>
where
    Req: FnMut() -> ReqFut,
    ReqFut: Future<Output = ProviderResult<T>>,
    Warm: FnOnce() -> WarmFut,
    WarmFut: Future<Output = ProviderResult<()>>,
{
    match request().await {
        Err(e) if e.code() == ProviderErrorCode::AccessDenied => {
            debug!(error = %e, "challenge encountered, warming up session");
            if let Err(warm) = warm_up().await {
                warn!(error = %warm, "warm-up request failed");
            }
            request().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn provider() -> FreeTvProvider {
        FreeTvProvider::new(FreeTvConfig::default(), &HttpSettings::default(), ReferenceZone::default())
            .unwrap()
    }

    mod challenge {
        use super::*;

        #[tokio::test]
        async fn success_needs_no_warm_up() {
            let warmups = AtomicUsize::new(0);
            let result = with_challenge_recovery(
                || async { Ok::<_, ProviderError>(1) },
                || async {
                    warmups.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
            )
            .await;
            assert_eq!(result.unwrap(), 1);
            assert_eq!(warmups.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn forbidden_then_ok_retries_once() {
            let attempts = AtomicUsize::new(0);
            let warmups = AtomicUsize::new(0);
            let result = with_challenge_recovery(
                || async {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ProviderError::access_denied("403"))
                    } else {
                        Ok(vec!["record"])
                    }
                },
                || async {
                    warmups.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
            )
            .await;
            assert_eq!(result.unwrap(), vec!["record"]);
            assert_eq!(attempts.load(Ordering::SeqCst), 2);
            assert_eq!(warmups.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn forbidden_twice_surfaces_error() {
            let attempts = AtomicUsize::new(0);
            let result: ProviderResult<()> = with_challenge_recovery(
                || async {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::access_denied("403"))
                },
                || async { Ok(()) },
            )
            .await;
            assert_eq!(result.unwrap_err().code(), ProviderErrorCode::AccessDenied);
            assert_eq!(attempts.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn other_errors_are_not_retried() {
            let attempts = AtomicUsize::new(0);
            let result: ProviderResult<()> = with_challenge_recovery(
                || async {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::server("502"))
                },
                || async { Ok(()) },
            )
            .await;
            assert_eq!(result.unwrap_err().code(), ProviderErrorCode::ServerError);
            assert_eq!(attempts.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn failed_warm_up_still_retries() {
            let attempts = AtomicUsize::new(0);
            let result = with_challenge_recovery(
                || async {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ProviderError::access_denied("403"))
                    } else {
                        Ok(7)
                    }
                },
                || async { Err(ProviderError::network("home unreachable")) },
            )
            .await;
            assert_eq!(result.unwrap(), 7);
        }
    }

    mod request {
        use super::*;

        #[test]
        fn url_carries_local_times_and_channel() {
            let zone = ReferenceZone::default();
            let day = NaiveDate::from_ymd_opt(2025, 6, 26).unwrap();
            let slice = TimeWindow::for_date(day, &zone);
            let url = provider().programmes_url("3359448", &slice).unwrap();
            let pairs: Vec<(String, String)> = url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            assert_eq!(pairs[0], ("liveId[]".into(), "3359448".into()));
            assert_eq!(pairs[1], ("since".into(), "2025-06-26T00:00+0300".into()));
            assert_eq!(pairs[2], ("till".into(), "2025-06-27T00:00+0300".into()));
            assert_eq!(pairs[3], ("lang".into(), "HEB".into()));
            assert_eq!(pairs[4], ("platform".into(), "BROWSER".into()));
        }

        #[test]
        fn rejects_invalid_api_url() {
            let config = FreeTvConfig::default().with_api_url("not a url");
            assert!(
                FreeTvProvider::new(config, &HttpSettings::default(), ReferenceZone::default())
                    .is_err()
            );
        }
    }

    mod body {
        use super::*;
        use serde_json::json;

        #[test]
        fn accepts_wrapped_and_bare_lists() {
            let item = json!({"since": "2025-06-26T20:30:00Z", "till": "2025-06-26T21:00:00Z", "title": "A"});
            let wrapped: Vec<FreeTvRecord> =
                parse_items(http::array_at(json!({"data": [item.clone()]}), "data"), Provider::FreeTv);
            let bare: Vec<FreeTvRecord> =
                parse_items(http::array_at(json!([item]), "data"), Provider::FreeTv);
            assert_eq!(wrapped, bare);
            assert_eq!(wrapped[0].title.as_deref(), Some("A"));
        }
    }
}
