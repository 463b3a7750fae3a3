//! Data models for plant-height measurements and node locations.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;

// ---

/// Placeholder written to both coordinates of a newly seen node.
pub const UNSET_COORDINATE: &str = "empty";

/// One plant-height observation reported by a node.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Measurement {
    // ---
    pub node: String,
    pub height: f64,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_addr: Option<String>,
}

/// Operator-maintained coordinates for a node.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Location {
    // ---
    pub node: String,
    pub latitude: String,
    pub longitude: String,
}

impl Location {
    // ---
    /// Parsed `(latitude, longitude)`, or `None` while the row is unset or
    /// holds anything that is not a valid WGS-84 coordinate.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        // ---
        let lat = parse_coordinate(&self.latitude)?;
        let lon = parse_coordinate(&self.longitude)?;

        if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
            Some((lat, lon))
        } else {
            None
        }
    }
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    // ---
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case(UNSET_COORDINATE) {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a reported height, rejecting blanks and non-finite values.
pub fn parse_height(raw: &str) -> Option<f64> {
    // ---
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Render a UTC instant in the stored timestamp format.
///
/// Fixed microsecond precision keeps lexical order equal to time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Normalize a caller-supplied timestamp.
///
/// Accepts RFC 3339 with any offset, or a naive ISO-8601 value taken as UTC.
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    // ---
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(format_timestamp(ts.with_timezone(&Utc)));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| format_timestamp(naive.and_utc()))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn location(lat: &str, lon: &str) -> Location {
        // ---
        Location {
            node: "A1".to_string(),
            latitude: lat.to_string(),
            longitude: lon.to_string(),
        }
    }

    #[test]
    fn test_sentinel_location_is_unset() {
        // ---
        assert!(location(UNSET_COORDINATE, UNSET_COORDINATE).coordinates().is_none());
        assert!(location("pls set the value", "pls set the value").coordinates().is_none());
        assert!(location("19.07", UNSET_COORDINATE).coordinates().is_none());
        assert!(location("", "").coordinates().is_none());
    }

    #[test]
    fn test_numeric_location_parses() {
        // ---
        assert_eq!(location("19.07", "72.87").coordinates(), Some((19.07, 72.87)));
        assert_eq!(location(" -33.9 ", "18.4").coordinates(), Some((-33.9, 18.4)));
    }

    #[test]
    fn test_out_of_range_or_non_finite_is_unset() {
        // ---
        assert!(location("91", "10").coordinates().is_none());
        assert!(location("10", "-181").coordinates().is_none());
        assert!(location("NaN", "10").coordinates().is_none());
        assert!(location("inf", "10").coordinates().is_none());
    }

    #[test]
    fn test_parse_height() {
        // ---
        assert_eq!(parse_height("12.5"), Some(12.5));
        assert_eq!(parse_height(" 7 "), Some(7.0));
        assert_eq!(parse_height("tall"), None);
        assert_eq!(parse_height("inf"), None);
        assert_eq!(parse_height(""), None);
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        // ---
        let ts = Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, 0).unwrap();
        assert_eq!(format_timestamp(ts), "2025-03-26T18:45:00.000000Z");
    }

    #[test]
    fn test_normalize_timestamp() {
        // ---
        assert_eq!(
            normalize_timestamp("2025-03-26T20:45:00+02:00").as_deref(),
            Some("2025-03-26T18:45:00.000000Z")
        );
        assert_eq!(
            normalize_timestamp("2025-03-26T18:45:00.5").as_deref(),
            Some("2025-03-26T18:45:00.500000Z")
        );
        assert_eq!(
            normalize_timestamp("2025-03-26 18:45:00").as_deref(),
            Some("2025-03-26T18:45:00.000000Z")
        );
        assert_eq!(normalize_timestamp("yesterday"), None);
    }
}
