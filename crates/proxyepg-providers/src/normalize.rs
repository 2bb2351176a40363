//! Record normalization.
//!
//! Turns provider-tagged [`RawRecord`]s into [`Programme`]s. The provider tag
//! decides which fields hold the title and description and how the start and
//! end are encoded; local-time encodings are read in the [`ReferenceZone`].
//!
//! A record that cannot be normalized is dropped and logged at `debug`. It
//! never fails the batch it came with.

use chrono::{DateTime, Utc};
use proxyepg_core::timestamp::{self, TimestampError};
use proxyepg_core::{Programme, ProgrammeError, ReferenceZone};
use thiserror::Error;
use tracing::debug;

use crate::raw::{RawRecord, RecordInstant};

/// Why one record was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("record has no {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
    #[error(transparent)]
    Programme(#[from] ProgrammeError),
}

/// Converts one record into a programme for `channel_id`.
pub fn normalize_record(
    record: &RawRecord,
    channel_id: &str,
    zone: &ReferenceZone,
) -> Result<Programme, NormalizeError> {
    let fields = record.fields();
    let title = fields.title.ok_or(NormalizeError::MissingField("title"))?;
    let start = decode_instant(fields.start.ok_or(NormalizeError::MissingField("start"))?, zone)?;
    let end = decode_instant(fields.end.ok_or(NormalizeError::MissingField("end"))?, zone)?;

    Ok(Programme::new(channel_id, start, end, title)?.with_description(fields.description))
}

fn decode_instant(
    instant: RecordInstant<'_>,
    zone: &ReferenceZone,
) -> Result<DateTime<Utc>, TimestampError> {
    match instant {
        RecordInstant::Epoch(secs) => timestamp::decode_epoch_seconds(secs).ok_or_else(|| {
            TimestampError {
                value: secs.to_string(),
                encoding: timestamp::TimestampEncoding::EpochSeconds,
            }
        }),
        RecordInstant::Text(value, encoding) => timestamp::decode(value, encoding, zone),
    }
}

/// Programmes produced from one record batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedBatch {
    pub programmes: Vec<Programme>,
    /// Records that could not be normalized.
    pub dropped: usize,
}

/// Normalizes every record, keeping provider order and dropping failures.
pub fn normalize_records(
    records: &[RawRecord],
    channel_id: &str,
    zone: &ReferenceZone,
) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for record in records {
        match normalize_record(record, channel_id, zone) {
            Ok(programme) => batch.programmes.push(programme),
            Err(e) => {
                debug!(
                    channel = %channel_id,
                    provider = %record.provider(),
                    error = %e,
                    "dropping record"
                );
                batch.dropped += 1;
            }
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{CellcomRecord, FreeTvRecord, HotRecord, PartnerRecord, YesRecord};
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn zone() -> ReferenceZone {
        ReferenceZone::default()
    }

    fn partner(start: &str, end: &str, name: Option<&str>) -> RawRecord {
        RawRecord::Partner(PartnerRecord {
            start: Some(start.into()),
            end: Some(end.into()),
            name: name.map(Into::into),
            short_synopsis: Some("Synopsis".into()),
        })
    }

    mod per_provider {
        use super::*;

        #[test]
        fn partner_local_day_first() {
            let p = normalize_record(
                &partner("26/06/2025 23:30", "27/06/2025 00:30", Some("Late")),
                "c",
                &zone(),
            )
            .unwrap();
            assert_eq!(p.start, utc(2025, 6, 26, 20, 30));
            assert_eq!(p.end, utc(2025, 6, 26, 21, 30));
            assert_eq!(p.description.as_deref(), Some("Synopsis"));
        }

        #[test]
        fn cellcom_epoch() {
            let record = RawRecord::Cellcom(CellcomRecord {
                start_date: Some(1_750_969_800),
                end_date: Some(1_750_973_400),
                name: Some("News".into()),
                description: None,
            });
            let p = normalize_record(&record, "c", &zone()).unwrap();
            assert_eq!(p.start, utc(2025, 6, 26, 20, 30));
            assert!(p.description.is_none());
        }

        #[test]
        fn freetv_iso_with_offset() {
            let record = RawRecord::FreeTv(FreeTvRecord {
                since: Some("2025-06-26T23:30:00+03:00".into()),
                till: Some("2025-06-27T00:30:00+03:00".into()),
                title: Some("Show".into()),
                description: None,
                summary: Some("Summary".into()),
                lead: None,
            });
            let p = normalize_record(&record, "c", &zone()).unwrap();
            assert_eq!(p.start, utc(2025, 6, 26, 20, 30));
            assert_eq!(p.description.as_deref(), Some("Summary"));
        }

        #[test]
        fn yes_iso_z() {
            let record = RawRecord::Yes(YesRecord {
                starts: Some("2025-06-26T20:30:00Z".into()),
                ends: Some("2025-06-26T21:00:00Z".into()),
                title: Some("Yes Show".into()),
                description: Some("".into()),
            });
            let p = normalize_record(&record, "c", &zone()).unwrap();
            assert_eq!(p.end, utc(2025, 6, 26, 21, 0));
            assert!(p.description.is_none());
        }

        #[test]
        fn hot_local_year_first_in_winter() {
            let record = RawRecord::Hot(HotRecord {
                channel_id: Some("13".into()),
                program_start_time: Some("2025/01/15 06:00:00".into()),
                program_end_time: Some("2025/01/15 07:00:00".into()),
                program_title: None,
                program_name: Some("Morning".into()),
                program_name_he: None,
                synopsis: None,
                short_description: None,
            });
            let p = normalize_record(&record, "c", &zone()).unwrap();
            assert_eq!(p.start, utc(2025, 1, 15, 4, 0));
            assert_eq!(p.title, "Morning");
        }
    }

    mod rejects {
        use super::*;

        #[test]
        fn missing_title() {
            let err = normalize_record(
                &partner("26/06/2025 23:30", "27/06/2025 00:30", None),
                "c",
                &zone(),
            )
            .unwrap_err();
            assert_eq!(err, NormalizeError::MissingField("title"));
        }

        #[test]
        fn blank_title() {
            let err = normalize_record(
                &partner("26/06/2025 23:30", "27/06/2025 00:30", Some("  ")),
                "c",
                &zone(),
            )
            .unwrap_err();
            assert_eq!(err, NormalizeError::MissingField("title"));
        }

        #[test]
        fn bad_timestamp() {
            let err = normalize_record(
                &partner("26-06-2025", "27/06/2025 00:30", Some("T")),
                "c",
                &zone(),
            )
            .unwrap_err();
            assert!(matches!(err, NormalizeError::Timestamp(_)));
        }

        #[test]
        fn end_before_start() {
            let err = normalize_record(
                &partner("26/06/2025 23:30", "26/06/2025 22:30", Some("T")),
                "c",
                &zone(),
            )
            .unwrap_err();
            assert!(matches!(
                err,
                NormalizeError::Programme(ProgrammeError::EmptyInterval { .. })
            ));
        }
    }

    #[test]
    fn batch_keeps_order_and_counts_drops() {
        let records = vec![
            partner("26/06/2025 22:00", "26/06/2025 23:00", Some("First")),
            partner("bad", "26/06/2025 23:30", Some("Broken")),
            partner("26/06/2025 21:00", "26/06/2025 22:00", Some("Earlier")),
        ];
        let batch = normalize_records(&records, "Channel14.il", &zone());
        assert_eq!(batch.dropped, 1);
        let titles: Vec<_> = batch.programmes.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Earlier"]);
        assert!(batch.programmes.iter().all(|p| p.channel_id == "Channel14.il"));
    }
}
