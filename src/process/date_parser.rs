use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::process::utils::clean_str;

/// Date + time layouts tried after the date-only fast paths, month-first where ambiguous.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Fast strict parse of `"YYYY-MM-DD"`.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let b = s.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return None;
    }
    let year: i32 = s[0..4].parse().ok()?;
    let month: u32 = s[5..7].parse().ok()?;
    let day: u32 = s[8..10].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Strict parse of `"YYYY-MM-DD HH:MM:SS[.fff]"`, the layout the CSV writer emits.
pub fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    let b = s.as_bytes();
    if b.len() < 19 || b[10] != b' ' || b[13] != b':' || b[16] != b':' {
        return None;
    }
    let date = parse_iso_date(&s[..10])?;
    let time = NaiveTime::parse_from_str(&s[11..], "%H:%M:%S%.f").ok()?;
    Some(date.and_time(time))
}

/// Compact `"YYYYMMDD"`.
fn parse_compact_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = s[0..4].parse().ok()?;
    let month: u32 = s[4..6].parse().ok()?;
    let day: u32 = s[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a free-text date cell into a naive timestamp.
///
/// Date-only inputs land on midnight. RFC 3339 values with an offset are
/// converted to UTC. Returns `None` for anything unrecognised.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = clean_str(raw);
    if s.is_empty() {
        return None;
    }

    if let Some(d) = parse_iso_date(&s).or_else(|| parse_compact_date(&s)) {
        return d.and_hms_opt(0, 0, 0);
    }
    if let Some(dt) = parse_iso_datetime(&s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn parses_common_date_layouts() {
        let want = ymd(2019, 5, 21);
        for s in [
            "2019-05-21",
            "2019/05/21",
            "20190521",
            "05/21/2019",
            "5/21/2019",
            " \"2019-05-21\" ",
        ] {
            assert_eq!(parse_datetime(s), Some(want), "input {s:?}");
        }
    }

    #[test]
    fn parses_datetimes_and_offsets() {
        let want = NaiveDate::from_ymd_opt(2019, 5, 21)
            .unwrap()
            .and_hms_opt(10, 30, 15)
            .unwrap();
        assert_eq!(parse_datetime("2019-05-21 10:30:15"), Some(want));
        assert_eq!(parse_datetime("2019-05-21T10:30:15"), Some(want));
        assert_eq!(parse_datetime("2019/05/21 10:30:15"), Some(want));
        assert_eq!(parse_datetime("2019-05-21T12:30:15+02:00"), Some(want));
        assert_eq!(
            parse_datetime("2019-05-21 10:30"),
            Some(want - chrono::Duration::seconds(15))
        );
    }

    #[test]
    fn rejects_garbage_and_impossible_dates() {
        assert_eq!(parse_datetime("not-a-date"), None);
        assert_eq!(parse_datetime("bogus"), None);
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("2019-02-30"), None);
        assert_eq!(parse_datetime("20191341"), None);
    }

    #[test]
    fn strict_iso_helpers() {
        assert!(parse_iso_date("2019-05-21").is_some());
        assert!(parse_iso_date("2019-5-21").is_none());
        assert!(parse_iso_date("05/21/2019").is_none());
        assert!(parse_iso_datetime("2019-05-21 10:00:00").is_some());
        assert!(parse_iso_datetime("2019-05-21 10:00:00.250").is_some());
        assert!(parse_iso_datetime("2019-05-21T10:00:00").is_none());
        assert!(parse_iso_datetime("2019-05-21").is_none());
    }
}
