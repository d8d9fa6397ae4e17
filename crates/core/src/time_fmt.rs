// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared human-readable duration formatting and timestamp conversion.

use chrono::{DateTime, Utc};

/// Format seconds as a short human-readable duration: `"5s"`, `"2m"`, `"1h30m"`, `"3d"`.
///
/// For the hours range, minutes are included when non-zero (e.g. `"1h"` vs `"1h5m"`).
pub fn format_elapsed(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        if m > 0 {
            format!("{}h{}m", h, m)
        } else {
            format!("{}h", h)
        }
    } else {
        format!("{}d", secs / 86400)
    }
}

/// Format milliseconds as a short human-readable duration.
pub fn format_elapsed_ms(ms: u64) -> String {
    format_elapsed(ms / 1000)
}

/// Render an epoch-millisecond timestamp as an ISO-8601 / RFC 3339 string
/// (UTC), the wire format every timestamp field in the queue document uses.
pub fn iso8601(epoch_ms: u64) -> String {
    let secs = (epoch_ms / 1000) as i64;
    let nanos = ((epoch_ms % 1000) * 1_000_000) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap())
        .to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_seconds() {
        assert_eq!(format_elapsed(5), "5s");
        assert_eq!(format_elapsed(125), "2m");
        assert_eq!(format_elapsed(3605), "1h");
        assert_eq!(format_elapsed(3900), "1h5m");
        assert_eq!(format_elapsed(172_800), "2d");
    }

    #[test]
    fn iso8601_roundtrips_through_parse() {
        let s = iso8601(1_700_000_000_000);
        let parsed = DateTime::parse_from_rfc3339(&s).unwrap();
        assert_eq!(parsed.timestamp(), 1_700_000_000);
    }
}
