//! Lenient date parsing for order timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Sort key used for missing or unparsable dates.
pub const EPOCH: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Parses an order date as WooCommerce or the CRM tables produce it.
///
/// Accepts RFC 3339 (`2024-03-01T10:00:00Z`), WooCommerce's offset-less
/// `2024-03-01T10:00:00` (read as UTC), a space-separated variant, and a bare
/// `2024-03-01` (midnight UTC). Returns `None` for anything else.
#[must_use]
pub fn parse_order_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_woocommerce_local_timestamp() {
        assert_eq!(
            parse_order_date("2024-03-01T10:15:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap())
        );
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        assert_eq!(
            parse_order_date("2024-03-01T10:15:00+01:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap())
        );
    }

    #[test]
    fn parses_bare_date_as_midnight() {
        assert_eq!(
            parse_order_date("2024-01-01"),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn rejects_garbage_and_empty() {
        assert_eq!(parse_order_date(""), None);
        assert_eq!(parse_order_date("next tuesday"), None);
        assert_eq!(parse_order_date("2024-13-45"), None);
    }
}
