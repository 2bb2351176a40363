//! HOT adapter.
//!
//! The HOT schedule API cannot filter by channel: one request returns a whole
//! local day for every channel. Each day is downloaded at most once per
//! adapter instance and partitioned by channel id; every channel fetched
//! through the adapter reads from that partition.
//!
//! Channel ids are compared zero-padded to three digits, so `7` and `007`
//! name the same channel.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use proxyepg_core::{Provider, ReferenceZone, TimeWindow};
use reqwest::Client;
use reqwest::header::{ACCEPT, ORIGIN, REFERER};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::ProviderResult;
use crate::http::{self, HttpSettings};
use crate::provider::{BoxFuture, ScheduleProvider};
use crate::raw::{HotRecord, RawRecord, parse_items};
use crate::single_flight::KeyedSlots;

/// One day of HOT data, keyed by padded channel id.
pub type DayPartition = Arc<HashMap<String, Vec<HotRecord>>>;

#[derive(Debug, Clone)]
pub struct HotConfig {
    pub schedule_url: String,
    /// Bulk days are large; this overrides the shared request timeout.
    pub timeout: Duration,
}

impl HotConfig {
    pub const DEFAULT_SCHEDULE_URL: &'static str =
        "https://www.hot.net.il/HotCmsApiFront/api/ProgramsSchedual/GetProgramsSchedual";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
}

impl Default for HotConfig {
    fn default() -> Self {
        Self {
            schedule_url: Self::DEFAULT_SCHEDULE_URL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Per-day partitions of a bulk-only provider, filled at most once per day.
#[derive(Debug, Default)]
pub struct BulkDayCache {
    days: KeyedSlots<NaiveDate, DayPartition>,
}

impl BulkDayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the records of `channel_key` for every local day of `window`,
    /// calling `download` for days not cached yet.
    pub async fn records_for<F, Fut>(
        &self,
        channel_key: &str,
        window: &TimeWindow,
        zone: &ReferenceZone,
        download: F,
    ) -> ProviderResult<Vec<HotRecord>>
    where
        F: Fn(NaiveDate) -> Fut,
        Fut: Future<Output = ProviderResult<DayPartition>>,
    {
        let mut records = Vec::new();
        for day in window.local_days(zone) {
            let partition = self.days.get_or_fetch(&day, || download(day)).await?;
            if let Some(items) = partition.get(channel_key) {
                records.extend(items.iter().cloned());
            }
        }
        Ok(records)
    }

    /// Number of distinct days requested so far.
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Downloads one whole local day for every channel.
type DaySource = Box<dyn Fn(NaiveDate) -> BoxFuture<'static, ProviderResult<DayPartition>> + Send + Sync>;

/// HOT schedule provider with its bulk day cache.
pub struct HotProvider {
    zone: ReferenceZone,
    cache: BulkDayCache,
    source: DaySource,
}

impl HotProvider {
    pub fn new(config: HotConfig, http: &HttpSettings, zone: ReferenceZone) -> ProviderResult<Self> {
        let client = http.build_client()?;
        let config = Arc::new(config);
        Ok(Self::with_source(zone, move |day| {
            download_day(client.clone(), Arc::clone(&config), day)
        }))
    }

    fn with_source<F, Fut>(zone: ReferenceZone, download: F) -> Self
    where
        F: Fn(NaiveDate) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ProviderResult<DayPartition>> + Send + 'static,
    {
        let source: DaySource =
            Box::new(move |day| -> BoxFuture<'static, ProviderResult<DayPartition>> {
                Box::pin(download(day))
            });
        Self {
            zone,
            cache: BulkDayCache::new(),
            source,
        }
    }
}

async fn download_day(
    client: Client,
    config: Arc<HotConfig>,
    day: NaiveDate,
) -> ProviderResult<DayPartition> {
    debug!(url = %config.schedule_url, day = %day, "downloading HOT day");
    let response = client
        .post(&config.schedule_url)
        .timeout(config.timeout)
        .header(ACCEPT, "application/json, text/plain, */*")
        .header(ORIGIN, "https://www.hot.net.il")
        .header(REFERER, "https://www.hot.net.il/heb/tv/tvguide/")
        .json(&day_payload(day))
        .send()
        .await
        .map_err(http::send_error)?;
    let body = http::read_json(response).await?;
    let partition = partition_by_channel(programs_details(body));
    info!(day = %day, channels = partition.len(), "HOT day cached");
    Ok(Arc::new(partition))
}

impl ScheduleProvider for HotProvider {
    fn provider(&self) -> Provider {
        Provider::Hot
    }

    fn fetch<'a>(
        &'a self,
        channel_id: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawRecord>>> {
        Box::pin(async move {
            let key = pad_channel_id(channel_id);
            let records = self
                .cache
                .records_for(&key, window, &self.zone, |day| (self.source)(day))
                .await
                .map_err(|e| e.with_provider(Provider::Hot))?;
            debug!(channel = %key, count = records.len(), "HOT records selected");
            Ok(records.into_iter().map(RawRecord::Hot).collect())
        })
    }
}

/// Request body covering one whole local day for all channels.
fn day_payload(day: NaiveDate) -> Value {
    json!({
        "ChannelId": "0",
        "ProgramsStartDateTime": day.format("%Y-%m-%dT00:00:00").to_string(),
        "ProgramsEndDateTime": day.format("%Y-%m-%dT23:59:59").to_string(),
        "Hour": 0,
    })
}

fn programs_details(body: Value) -> Vec<Value> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => http::array_at(data, "programsDetails"),
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// `7` -> `007`; longer ids are kept as they are.
pub(crate) fn pad_channel_id(id: &str) -> String {
    format!("{:0>3}", id.trim())
}

/// Groups one day's rows by padded channel id, keeping row order.
pub(crate) fn partition_by_channel(rows: Vec<Value>) -> HashMap<String, Vec<HotRecord>> {
    let mut by_channel: HashMap<String, Vec<HotRecord>> = HashMap::new();
    for record in parse_items::<HotRecord>(rows, Provider::Hot) {
        let key = pad_channel_id(record.channel_id.as_deref().unwrap_or_default());
        by_channel.entry(key).or_default().push(record);
    }
    by_channel
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn pads_to_three_digits() {
        assert_eq!(pad_channel_id("7"), "007");
        assert_eq!(pad_channel_id("13"), "013");
        assert_eq!(pad_channel_id("007"), "007");
        assert_eq!(pad_channel_id("1234"), "1234");
    }

    #[test]
    fn payload_covers_whole_day() {
        let payload = day_payload(NaiveDate::from_ymd_opt(2025, 6, 26).unwrap());
        assert_eq!(payload["ChannelId"], "0");
        assert_eq!(payload["ProgramsStartDateTime"], "2025-06-26T00:00:00");
        assert_eq!(payload["ProgramsEndDateTime"], "2025-06-26T23:59:59");
    }

    #[test]
    fn partitions_numeric_and_string_ids_together() {
        let body = json!({"data": {"programsDetails": [
            {"channelID": 7, "programTitle": "A"},
            {"channelID": "007", "programTitle": "B"},
            {"channelID": 13, "programTitle": "C"},
            "garbage",
        ]}});
        let partition = partition_by_channel(programs_details(body));
        assert_eq!(partition.len(), 2);
        let seven: Vec<_> = partition["007"]
            .iter()
            .map(|r| r.program_title.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(seven, vec!["A", "B"]);
        assert_eq!(partition["013"].len(), 1);
    }

    #[test]
    fn missing_data_is_empty() {
        assert!(programs_details(json!({"data": null})).is_empty());
        assert!(programs_details(json!([])).is_empty());
    }

    mod bulk_cache {
        use super::*;
        use chrono::Duration as ChronoDuration;

        fn zone() -> ReferenceZone {
            ReferenceZone::default()
        }

        fn day_of_rows() -> DayPartition {
            Arc::new(partition_by_channel(vec![
                json!({"channelID": 7, "programTitle": "seven"}),
                json!({"channelID": 13, "programTitle": "thirteen"}),
                json!({"channelID": 22, "programTitle": "twenty-two"}),
            ]))
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn many_channels_one_download_per_day() {
            let cache = Arc::new(BulkDayCache::new());
            let downloads = Arc::new(AtomicUsize::new(0));
            let day = NaiveDate::from_ymd_opt(2025, 6, 26).unwrap();
            let window = TimeWindow::for_date(day, &zone());

            let tasks: Vec<_> = ["7", "13", "22", "007", "99"]
                .into_iter()
                .map(|channel| {
                    let cache = Arc::clone(&cache);
                    let downloads = Arc::clone(&downloads);
                    let window = window.clone();
                    tokio::spawn(async move {
                        cache
                            .records_for(&pad_channel_id(channel), &window, &zone(), |_| {
                                let downloads = Arc::clone(&downloads);
                                async move {
                                    downloads.fetch_add(1, Ordering::SeqCst);
                                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                                    Ok(day_of_rows())
                                }
                            })
                            .await
                    })
                })
                .collect();

            let mut counts = Vec::new();
            for task in tasks {
                counts.push(task.await.unwrap().unwrap().len());
            }
            assert_eq!(counts, vec![1, 1, 1, 1, 0]);
            assert_eq!(downloads.load(Ordering::SeqCst), 1);
            assert_eq!(cache.len(), 1);
        }

        #[tokio::test]
        async fn window_spanning_days_fills_each_day() {
            let cache = BulkDayCache::new();
            let downloads = AtomicUsize::new(0);
            let first = NaiveDate::from_ymd_opt(2025, 6, 22).unwrap();
            let window = TimeWindow::for_days(first, 3, &zone());

            let records = cache
                .records_for("007", &window, &zone(), |_| {
                    downloads.fetch_add(1, Ordering::SeqCst);
                    async { Ok(day_of_rows()) }
                })
                .await
                .unwrap();
            assert_eq!(records.len(), 3);
            assert_eq!(downloads.load(Ordering::SeqCst), 3);

            // A second channel over an overlapping range reuses the cached days.
            let later = TimeWindow::new(window.start + ChronoDuration::days(1), window.end);
            cache
                .records_for("013", &later, &zone(), |_| {
                    downloads.fetch_add(1, Ordering::SeqCst);
                    async { Ok(day_of_rows()) }
                })
                .await
                .unwrap();
            assert_eq!(downloads.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn failed_day_is_remembered() {
            let cache = BulkDayCache::new();
            let downloads = AtomicUsize::new(0);
            let window =
                TimeWindow::for_date(NaiveDate::from_ymd_opt(2025, 6, 26).unwrap(), &zone());
            for channel in ["007", "013"] {
                let result = cache
                    .records_for(channel, &window, &zone(), |_| {
                        downloads.fetch_add(1, Ordering::SeqCst);
                        async { Err(crate::ProviderError::server("502")) }
                    })
                    .await;
                assert!(result.is_err());
            }
            assert_eq!(downloads.load(Ordering::SeqCst), 1);
        }
    }

    mod provider {
        use super::*;

        fn stub(downloads: Arc<AtomicUsize>) -> HotProvider {
            HotProvider::with_source(
                ReferenceZone::default(),
                move |day| {
                    downloads.fetch_add(1, Ordering::SeqCst);
                    async move {
                        Ok(Arc::new(partition_by_channel(vec![
                            json!({"channelID": "007", "programTitle": format!("seven {day}")}),
                            json!({"channelID": 13, "programTitle": format!("thirteen {day}")}),
                        ])))
                    }
                },
            )
        }

        fn titles(records: &[RawRecord]) -> Vec<String> {
            records
                .iter()
                .map(|r| match r {
                    RawRecord::Hot(hot) => hot.program_title.clone().unwrap_or_default(),
                    other => panic!("unexpected record {other:?}"),
                })
                .collect()
        }

        #[tokio::test]
        async fn unpadded_id_reads_padded_partition_across_days() {
            let downloads = Arc::new(AtomicUsize::new(0));
            let hot = stub(Arc::clone(&downloads));
            let first = NaiveDate::from_ymd_opt(2025, 6, 26).unwrap();
            let window = TimeWindow::for_days(first, 2, &ReferenceZone::default());

            let records = hot.fetch("7", &window).await.unwrap();

            assert_eq!(titles(&records), vec!["seven 2025-06-26", "seven 2025-06-27"]);
            assert_eq!(downloads.load(Ordering::SeqCst), 2);
            assert_eq!(hot.cache.len(), 2);
        }

        #[tokio::test]
        async fn later_channels_reuse_downloaded_days() {
            let downloads = Arc::new(AtomicUsize::new(0));
            let hot = stub(Arc::clone(&downloads));
            let first = NaiveDate::from_ymd_opt(2025, 6, 26).unwrap();
            let window = TimeWindow::for_days(first, 2, &ReferenceZone::default());

            hot.fetch("007", &window).await.unwrap();
            let thirteen = hot.fetch("13", &window).await.unwrap();
            let missing = hot.fetch("99", &window).await.unwrap();

            assert_eq!(titles(&thirteen), vec!["thirteen 2025-06-26", "thirteen 2025-06-27"]);
            assert!(missing.is_empty());
            assert_eq!(downloads.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn download_failure_is_tagged_hot() {
            let hot = HotProvider::with_source(
                ReferenceZone::default(),
                |_| async { Err(crate::ProviderError::server("502")) },
            );
            let window = TimeWindow::for_date(
                NaiveDate::from_ymd_opt(2025, 6, 26).unwrap(),
                &ReferenceZone::default(),
            );
            let err = hot.fetch("7", &window).await.unwrap_err();
            assert_eq!(err.provider(), Some(Provider::Hot));
        }
    }
}
