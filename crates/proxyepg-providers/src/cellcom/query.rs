//! Kaltura OTT request bodies and response shapes.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use proxyepg_core::TimeWindow;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::raw::CellcomRecord;

/// Separator between the EPG channel id and the catalog id in a site id.
const SITE_ID_SEPARATOR: &str = "##";

/// How the adapter asks for a channel's assets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellcomStrategy {
    /// List every EPG asset of the channel and filter by the window locally.
    #[default]
    FullListing,
    /// Let the backend filter by start and end date.
    TimeRange,
}

impl FromStr for CellcomStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full_listing" | "full" => Ok(Self::FullListing),
            "time_range" | "range" => Ok(Self::TimeRange),
            other => Err(format!("unknown cellcom strategy: {other}")),
        }
    }
}

/// How epoch seconds are written inside a KSQL filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimestampForm {
    /// `start_date<1750969800`
    Numeric,
    /// `start_date<'1750969800'`
    Quoted,
}

impl fmt::Display for TimestampForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Numeric => "numeric",
            Self::Quoted => "quoted",
        })
    }
}

/// Returns the EPG channel id part of a Cellcom site id.
pub(crate) fn channel_key(site_id: &str) -> &str {
    site_id
        .split(SITE_ID_SEPARATOR)
        .next()
        .unwrap_or(site_id)
        .trim()
}

/// Builds the KSQL filter for a channel, optionally bounded by `range`.
pub(crate) fn ksql(channel: &str, range: Option<(&TimeWindow, TimestampForm)>) -> String {
    let base = format!("epg_channel_id='{channel}' asset_type='epg'");
    match range {
        None => format!("(and {base})"),
        Some((window, form)) => {
            let (start, end) = (window.start.timestamp(), window.end.timestamp());
            let bounds = match form {
                TimestampForm::Numeric => format!("start_date<{end} end_date>{start}"),
                TimestampForm::Quoted => format!("start_date<'{end}' end_date>'{start}'"),
            };
            format!("(and {base} {bounds})")
        }
    }
}

/// Request body for `asset/action/list`.
pub(crate) fn list_payload(
    ks: &str,
    ksql: &str,
    api_version: &str,
    client_tag: &str,
    page_size: u32,
) -> Value {
    json!({
        "apiVersion": api_version,
        "clientTag": client_tag,
        "filter": {
            "kSql": ksql,
            "objectType": "KalturaSearchAssetFilter",
            "orderBy": "START_DATE_ASC",
        },
        "ks": ks,
        "pager": {
            "objectType": "KalturaFilterPager",
            "pageIndex": 1,
            "pageSize": page_size,
        },
    })
}

/// Request body for `OTTUser/action/anonymousLogin`.
pub(crate) fn login_payload(api_version: &str, partner_id: &str, udid: &str) -> Value {
    json!({
        "apiVersion": api_version,
        "partnerId": partner_id,
        "udid": udid,
    })
}

/// Extracts the session token from a login response.
pub(crate) fn parse_login(body: &Value) -> ProviderResult<String> {
    if let Some((code, message)) = api_error(body) {
        return Err(ProviderError::authentication(format!(
            "anonymous login rejected ({code}): {message}"
        )));
    }
    body.get("ks")
        .or_else(|| body.get("result").and_then(|r| r.get("ks")))
        .and_then(Value::as_str)
        .filter(|ks| !ks.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::authentication("login response has no ks"))
}

/// A decoded `asset/action/list` response.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AssetPage {
    Objects(Vec<Value>),
    ApiError { code: String, message: String },
}

impl AssetPage {
    pub(crate) fn from_body(body: Value) -> Self {
        if let Some((code, message)) = api_error(&body) {
            return Self::ApiError { code, message };
        }
        let objects = match body {
            Value::Object(mut map) => match map.remove("objects") {
                Some(Value::Array(items)) => items,
                _ => match map.remove("result") {
                    Some(Value::Object(mut result)) => match result.remove("objects") {
                        Some(Value::Array(items)) => items,
                        _ => Vec::new(),
                    },
                    _ => Vec::new(),
                },
            },
            _ => Vec::new(),
        };
        Self::Objects(objects)
    }

    fn into_objects(self) -> ProviderResult<Vec<Value>> {
        match self {
            Self::Objects(objects) => Ok(objects),
            Self::ApiError { code, message } => Err(ProviderError::bad_request(format!(
                "asset list rejected ({code}): {message}"
            ))),
        }
    }
}

/// Reads `result.error.{code,message}` (or a top-level `error`).
fn api_error(body: &Value) -> Option<(String, String)> {
    let error = body
        .get("result")
        .and_then(|r| r.get("error"))
        .or_else(|| body.get("error"))?;
    let code = match error.get("code")? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((code, message))
}

/// Issues the numeric-timestamp query and, if the backend answers with
/// `quoted_code`, repeats it once with quoted timestamps.
pub(crate) async fn run_with_quote_fallback<F, Fut>(
    mut query: F,
    quoted_code: &str,
) -> ProviderResult<Vec<Value>>
where
    F: FnMut(TimestampForm) -> Fut,
    Fut: Future<Output = ProviderResult<AssetPage>>,
{
    match query(TimestampForm::Numeric).await? {
        AssetPage::ApiError { code, message } if code == quoted_code => {
            debug!(code = %code, message = %message, "numeric timestamps rejected, retrying quoted");
            query(TimestampForm::Quoted).await?.into_objects()
        }
        page => page.into_objects(),
    }
}

/// Expects a plain listing; any API error fails the fetch.
pub(crate) fn expect_objects(page: AssetPage) -> ProviderResult<Vec<Value>> {
    page.into_objects()
}

/// Keeps records whose `[start, end)` overlaps `window`.
///
/// Records without both dates cannot be placed and are dropped.
pub(crate) fn retain_overlapping(records: Vec<CellcomRecord>, window: &TimeWindow) -> Vec<CellcomRecord> {
    let (start, end) = (window.start.timestamp(), window.end.timestamp());
    records
        .into_iter()
        .filter(|r| match (r.start_date, r.end_date) {
            (Some(s), Some(e)) => e > start && s < end,
            _ => false,
        })
        .collect()
}
