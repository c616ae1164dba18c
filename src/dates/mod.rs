//! Date normalization and civil-time helpers
//!
//! The source site publishes dates in several raw shapes (`YYYY-MM-DD`,
//! `YYYY/MM/DD`, bracket-wrapped variants, bare `MM-DD`). This module folds
//! them into canonical calendar dates, and pins "today" to the site's civil
//! timezone (UTC+8) so runs behave the same regardless of host timezone.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, SecondsFormat, Utc};

const CIVIL_OFFSET_SECONDS: i32 = 8 * 3600;

fn civil_offset() -> FixedOffset {
    // Valid by construction; +08:00 is within chrono's offset range.
    FixedOffset::east_opt(CIVIL_OFFSET_SECONDS).unwrap()
}

/// Current moment in the site's civil timezone
pub fn civil_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&civil_offset())
}

/// Today's calendar date in the site's civil timezone
pub fn civil_today() -> NaiveDate {
    civil_now().date_naive()
}

/// Current civil time as an ISO-8601 string with seconds precision
pub fn now_iso() -> String {
    civil_now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Normalizes a raw date string into a canonical calendar date
///
/// Supported shapes: `YYYY-MM-DD`, `YYYY/MM/DD`, either of those wrapped in
/// square brackets, and bare `MM-DD` (assumed to belong to the reference
/// date's year). Anything else yields `None`; callers drop such items.
pub fn normalize_date(raw: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let s = raw.trim().trim_matches(['[', ']']).trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y/%m/%d") {
        return Some(d);
    }

    // Bare MM-DD: adopt the reference year.
    let with_year = format!("{:04}-{}", reference.year(), s);
    NaiveDate::parse_from_str(&with_year, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn test_iso_date_passes_through() {
        assert_eq!(
            normalize_date("2025-03-09", reference()),
            NaiveDate::from_ymd_opt(2025, 3, 9)
        );
    }

    #[test]
    fn test_slash_date_redelimited() {
        assert_eq!(
            normalize_date("2025/03/09", reference()),
            NaiveDate::from_ymd_opt(2025, 3, 9)
        );
    }

    #[test]
    fn test_bracket_wrapped_date() {
        assert_eq!(
            normalize_date("[2025-03-05]", reference()),
            NaiveDate::from_ymd_opt(2025, 3, 5)
        );
        assert_eq!(
            normalize_date("[2025/03/05]", reference()),
            NaiveDate::from_ymd_opt(2025, 3, 5)
        );
    }

    #[test]
    fn test_bare_month_day_adopts_reference_year() {
        assert_eq!(
            normalize_date("03-01", reference()),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(
            normalize_date("  2025-03-09 ", reference()),
            NaiveDate::from_ymd_opt(2025, 3, 9)
        );
    }

    #[test]
    fn test_unrecognized_shapes_dropped() {
        assert_eq!(normalize_date("", reference()), None);
        assert_eq!(normalize_date("2025.03.09", reference()), None);
        assert_eq!(normalize_date("昨天", reference()), None);
        assert_eq!(normalize_date("2025-13-40", reference()), None);
    }

    #[test]
    fn test_now_iso_has_offset() {
        assert!(now_iso().ends_with("+08:00"));
    }
}
