//! Provider-native record shapes.
//!
//! Each provider publishes its own record layout. [`RawRecord`] is the closed
//! union over them; only the owning adapter builds a variant and only
//! [`crate::normalize`] looks inside one.

use proxyepg_core::Provider;
use proxyepg_core::timestamp::TimestampEncoding;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// FreeTV programme.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FreeTvRecord {
    pub since: Option<String>,
    pub till: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub lead: Option<String>,
}

/// Cellcom (Kaltura) EPG asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellcomRecord {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub start_date: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub end_date: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Partner EPG event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerRecord {
    pub start: Option<String>,
    pub end: Option<String>,
    pub name: Option<String>,
    pub short_synopsis: Option<String>,
}

/// Yes broadcast schedule item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct YesRecord {
    pub starts: Option<String>,
    pub ends: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// HOT schedule entry, tagged with its own channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotRecord {
    #[serde(rename = "channelID", default, deserialize_with = "lenient_string")]
    pub channel_id: Option<String>,
    pub program_start_time: Option<String>,
    pub program_end_time: Option<String>,
    pub program_title: Option<String>,
    pub program_name: Option<String>,
    pub program_name_he: Option<String>,
    pub synopsis: Option<String>,
    pub short_description: Option<String>,
}

/// One upstream record, tagged with the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    FreeTv(FreeTvRecord),
    Cellcom(CellcomRecord),
    Partner(PartnerRecord),
    Yes(YesRecord),
    Hot(HotRecord),
}

impl RawRecord {
    pub fn provider(&self) -> Provider {
        match self {
            Self::FreeTv(_) => Provider::FreeTv,
            Self::Cellcom(_) => Provider::Cellcom,
            Self::Partner(_) => Provider::Partner,
            Self::Yes(_) => Provider::Yes,
            Self::Hot(_) => Provider::Hot,
        }
    }

    /// Extracts the fields the normalizer needs, in provider-neutral form.
    pub(crate) fn fields(&self) -> RecordFields<'_> {
        match self {
            Self::FreeTv(r) => RecordFields {
                start: text(&r.since, TimestampEncoding::Iso8601),
                end: text(&r.till, TimestampEncoding::Iso8601),
                title: first_present([&r.title]),
                description: first_present([&r.description, &r.summary, &r.lead]),
            },
            Self::Cellcom(r) => RecordFields {
                start: r.start_date.map(RecordInstant::Epoch),
                end: r.end_date.map(RecordInstant::Epoch),
                title: first_present([&r.name]),
                description: first_present([&r.description]),
            },
            Self::Partner(r) => RecordFields {
                start: text(&r.start, TimestampEncoding::DayFirstLocal),
                end: text(&r.end, TimestampEncoding::DayFirstLocal),
                title: first_present([&r.name]),
                description: first_present([&r.short_synopsis]),
            },
            Self::Yes(r) => RecordFields {
                start: text(&r.starts, TimestampEncoding::Iso8601),
                end: text(&r.ends, TimestampEncoding::Iso8601),
                title: first_present([&r.title]),
                description: first_present([&r.description]),
            },
            Self::Hot(r) => RecordFields {
                start: text(&r.program_start_time, TimestampEncoding::YearFirstLocal),
                end: text(&r.program_end_time, TimestampEncoding::YearFirstLocal),
                title: first_present([&r.program_title, &r.program_name, &r.program_name_he]),
                description: first_present([&r.synopsis, &r.short_description]),
            },
        }
    }
}

/// A boundary instant as the provider wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordInstant<'a> {
    Epoch(i64),
    Text(&'a str, TimestampEncoding),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordFields<'a> {
    pub start: Option<RecordInstant<'a>>,
    pub end: Option<RecordInstant<'a>>,
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
}

fn text(value: &Option<String>, encoding: TimestampEncoding) -> Option<RecordInstant<'_>> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(|v| RecordInstant::Text(v, encoding))
}

/// Returns the first candidate that is present and not blank.
fn first_present<'a, const N: usize>(candidates: [&'a Option<String>; N]) -> Option<&'a str> {
    candidates
        .into_iter()
        .filter_map(|c| c.as_deref())
        .find(|c| !c.trim().is_empty())
}

/// Deserializes each element of `items` on its own, skipping the ones that
/// do not fit `T`.
pub(crate) fn parse_items<T: DeserializeOwned>(items: Vec<Value>, provider: Provider) -> Vec<T> {
    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(provider = %provider, error = %e, "skipping malformed record");
                None
            }
        })
        .collect();
    if parsed.len() < total {
        debug!(
            provider = %provider,
            skipped = total - parsed.len(),
            kept = parsed.len(),
            "some records could not be parsed"
        );
    }
    parsed
}

/// Whole seconds as an integer, a whole float (`1750969800.0`) or a string.
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().and_then(whole_f64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_f64))
        }
        _ => None,
    })
}

fn whole_f64(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hot_channel_id_accepts_numbers_and_strings() {
        let records: Vec<HotRecord> = parse_items(
            vec![
                json!({"channelID": 13, "programTitle": "A"}),
                json!({"channelID": "007", "programTitle": "B"}),
            ],
            Provider::Hot,
        );
        assert_eq!(records[0].channel_id.as_deref(), Some("13"));
        assert_eq!(records[1].channel_id.as_deref(), Some("007"));
    }

    #[test]
    fn cellcom_epoch_accepts_numeric_strings() {
        let records: Vec<CellcomRecord> = parse_items(
            vec![json!({"startDate": "1750969800", "endDate": 1750973400, "name": "N"})],
            Provider::Cellcom,
        );
        assert_eq!(records[0].start_date, Some(1_750_969_800));
        assert_eq!(records[0].end_date, Some(1_750_973_400));
    }

    #[test]
    fn cellcom_epoch_accepts_whole_floats() {
        let records: Vec<CellcomRecord> = parse_items(
            vec![
                json!({"startDate": 1750969800.0, "endDate": "1750973400.0", "name": "N"}),
                json!({"startDate": 1750969800.5, "endDate": 1750973400, "name": "half"}),
            ],
            Provider::Cellcom,
        );
        assert_eq!(records[0].start_date, Some(1_750_969_800));
        assert_eq!(records[0].end_date, Some(1_750_973_400));
        assert_eq!(records[1].start_date, None);
    }

    #[test]
    fn malformed_items_are_skipped() {
        let records: Vec<YesRecord> = parse_items(
            vec![
                json!({"starts": "2025-06-26T20:30:00Z", "title": "ok"}),
                json!("not an object"),
                json!({"starts": 12, "title": "wrong type"}),
            ],
            Provider::Yes,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title.as_deref(), Some("ok"));
    }

    #[test]
    fn title_falls_through_blank_candidates() {
        let record = RawRecord::Hot(HotRecord {
            channel_id: Some("13".into()),
            program_start_time: None,
            program_end_time: None,
            program_title: Some("  ".into()),
            program_name: None,
            program_name_he: Some("חדשות".into()),
            synopsis: None,
            short_description: Some("desc".into()),
        });
        let fields = record.fields();
        assert_eq!(fields.title, Some("חדשות"));
        assert_eq!(fields.description, Some("desc"));
        assert!(fields.start.is_none());
    }

    #[test]
    fn freetv_description_prefers_description_then_summary_then_lead() {
        let record = RawRecord::FreeTv(FreeTvRecord {
            since: Some("2025-06-26T20:30:00Z".into()),
            till: None,
            title: Some("T".into()),
            description: None,
            summary: Some("".into()),
            lead: Some("Lead".into()),
        });
        assert_eq!(record.fields().description, Some("Lead"));
        assert_eq!(record.provider(), Provider::FreeTv);
    }
}
