//! Upstream timestamp decoding.
//!
//! Providers publish programme boundaries in four shapes. Each one decodes to
//! an absolute UTC instant; the two local-time shapes carry no offset of their
//! own and are always read in the [`ReferenceZone`].

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::time::ReferenceZone;

/// `26/06/2025 23:30`
pub const DAY_FIRST_FORMAT: &str = "%d/%m/%Y %H:%M";
/// `2025/06/26 23:30:00`
pub const YEAR_FIRST_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// The timestamp shapes seen upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampEncoding {
    /// Whole seconds since the Unix epoch.
    EpochSeconds,
    /// ISO-8601 / RFC 3339; without an offset it is read in the reference zone.
    Iso8601,
    /// `DD/MM/YYYY HH:MM` in the reference zone.
    DayFirstLocal,
    /// `YYYY/MM/DD HH:MM:SS` in the reference zone.
    YearFirstLocal,
}

impl TimestampEncoding {
    /// Returns a short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EpochSeconds => "epoch_seconds",
            Self::Iso8601 => "iso8601",
            Self::DayFirstLocal => "dd/mm/yyyy hh:mm",
            Self::YearFirstLocal => "yyyy/mm/dd hh:mm:ss",
        }
    }
}

/// A timestamp that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot decode {value:?} as {}", .encoding.as_str())]
pub struct TimestampError {
    /// The offending input.
    pub value: String,
    /// The encoding it was decoded as.
    pub encoding: TimestampEncoding,
}

impl TimestampError {
    fn new(value: &str, encoding: TimestampEncoding) -> Self {
        Self {
            value: value.to_string(),
            encoding,
        }
    }
}

/// Decodes a textual timestamp with a known encoding.
pub fn decode(
    value: &str,
    encoding: TimestampEncoding,
    zone: &ReferenceZone,
) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = value.trim();
    let err = || TimestampError::new(value, encoding);
    match encoding {
        TimestampEncoding::EpochSeconds => {
            let secs: i64 = trimmed.parse().map_err(|_| err())?;
            decode_epoch_seconds(secs).ok_or_else(err)
        }
        TimestampEncoding::Iso8601 => decode_iso8601(trimmed, zone).ok_or_else(err),
        TimestampEncoding::DayFirstLocal => decode_local(trimmed, DAY_FIRST_FORMAT, zone).ok_or_else(err),
        TimestampEncoding::YearFirstLocal => {
            decode_local(trimmed, YEAR_FIRST_FORMAT, zone).ok_or_else(err)
        }
    }
}

/// Converts epoch seconds to an instant.
pub fn decode_epoch_seconds(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Parses ISO-8601.
///
/// Accepts RFC 3339 (`2025-06-26T20:30:00Z`, `…+03:00`) as well as the
/// colon-less offset and minute-precision forms some APIs emit
/// (`2025-06-26T23:30+0300`). A value with no offset at all
/// (`2025-06-26T23:30:00`) is local time in `zone`.
fn decode_iso8601(value: &str, zone: &ReferenceZone) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%dT%H:%M%z",
        "%Y-%m-%d %H:%M:%S%z",
    ];
    let normalized = match value.strip_suffix('Z') {
        Some(rest) => format!("{rest}+0000"),
        None => value.to_string(),
    };
    if let Some(dt) = FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&normalized, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .and_then(|naive| zone.localize(naive))
}

fn decode_local(value: &str, format: &str, zone: &ReferenceZone) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, format).ok()?;
    zone.localize(naive)
}

/// Formats an instant the way XMLTV expects: `YYYYMMDDHHMMSS +0000`.
pub fn format_xmltv(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%d%H%M%S +0000").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn israel() -> ReferenceZone {
        ReferenceZone::default()
    }

    #[test]
    fn day_first_local_in_summer() {
        // IDT (UTC+3) on 2025-06-26.
        let instant = decode("26/06/2025 23:30", TimestampEncoding::DayFirstLocal, &israel());
        assert_eq!(instant.unwrap(), utc(2025, 6, 26, 20, 30, 0));
    }

    #[test]
    fn day_first_local_in_winter() {
        // IST (UTC+2) on 2025-01-15.
        let instant = decode("15/01/2025 23:30", TimestampEncoding::DayFirstLocal, &israel());
        assert_eq!(instant.unwrap(), utc(2025, 1, 15, 21, 30, 0));
    }

    #[test]
    fn year_first_local() {
        let instant = decode(
            "2025/06/26 06:00:00",
            TimestampEncoding::YearFirstLocal,
            &israel(),
        );
        assert_eq!(instant.unwrap(), utc(2025, 6, 26, 3, 0, 0));
    }

    #[test]
    fn epoch_seconds() {
        let instant = decode("1750969800", TimestampEncoding::EpochSeconds, &israel());
        assert_eq!(instant.unwrap(), utc(2025, 6, 26, 20, 30, 0));
    }

    #[test]
    fn iso8601_variants() {
        let zone = israel();
        let expected = utc(2025, 6, 26, 20, 30, 0);
        for value in [
            "2025-06-26T20:30:00Z",
            "2025-06-26T23:30:00+03:00",
            "2025-06-26T23:30:00.000+03:00",
            "2025-06-26T23:30+0300",
            "2025-06-26T20:30:00.000Z",
        ] {
            assert_eq!(
                decode(value, TimestampEncoding::Iso8601, &zone).unwrap(),
                expected,
                "{value}"
            );
        }
    }

    #[test]
    fn iso8601_ignores_reference_zone() {
        let berlin: ReferenceZone = "Europe/Berlin".parse().unwrap();
        assert_eq!(
            decode("2025-06-26T20:30:00Z", TimestampEncoding::Iso8601, &berlin).unwrap(),
            utc(2025, 6, 26, 20, 30, 0)
        );
    }

    #[test]
    fn rejects_garbage() {
        let zone = israel();
        assert!(decode("yesterday", TimestampEncoding::Iso8601, &zone).is_err());
        assert!(decode("32/13/2025 25:00", TimestampEncoding::DayFirstLocal, &zone).is_err());
        assert!(decode("abc", TimestampEncoding::EpochSeconds, &zone).is_err());
        let err = decode("2025-13-01", TimestampEncoding::Iso8601, &zone).unwrap_err();
        assert_eq!(err.value, "2025-13-01");
    }

    #[test]
    fn iso8601_without_offset_is_reference_local() {
        let zone = israel();
        for value in ["2025-06-26T23:30:00", "2025-06-26T23:30", "2025-06-26T23:30:00.000"] {
            assert_eq!(
                decode(value, TimestampEncoding::Iso8601, &zone).unwrap(),
                utc(2025, 6, 26, 20, 30, 0),
                "{value}"
            );
        }
        let berlin: ReferenceZone = "Europe/Berlin".parse().unwrap();
        assert_eq!(
            decode("2025-06-26T23:30:00", TimestampEncoding::Iso8601, &berlin).unwrap(),
            utc(2025, 6, 26, 21, 30, 0)
        );
    }

    #[test]
    fn xmltv_format() {
        assert_eq!(
            format_xmltv(utc(2025, 6, 26, 20, 30, 0)),
            "20250626203000 +0000"
        );
    }
}
