//! RFC 822 date formatting for the `Date:` header.

use chrono::{DateTime, Utc};

/// Formats a Unix timestamp as an RFC 822 date in UTC.
///
/// Timestamp `0` renders as `01 Jan 1970 00:00:00 +0000`. Out-of-range
/// timestamps clamp to the epoch rather than failing; the `Date:` header
/// is informational and must not abort a send.
#[must_use]
pub fn format_rfc822(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .format("%d %b %Y %H:%M:%S +0000")
        .to_string()
}

/// Current wall clock as seconds since the Unix epoch.
#[must_use]
pub fn now() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch() {
        assert_eq!(format_rfc822(0), "01 Jan 1970 00:00:00 +0000");
    }

    #[test]
    fn test_last_second_of_epoch_day() {
        assert_eq!(format_rfc822(86399), "01 Jan 1970 23:59:59 +0000");
    }

    #[test]
    fn test_leap_day() {
        // 2000-01-01 plus 59 days lands on the Feb 29 leap day.
        let timestamp = 946684800 + 86400 * 59;
        assert_eq!(format_rfc822(timestamp), "29 Feb 2000 00:00:00 +0000");
    }

    #[test]
    fn test_now_is_recent() {
        // 2023-01-01 as a sanity floor.
        assert!(now() > 1672531200);
    }
}
