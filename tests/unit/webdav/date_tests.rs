use chrono::{NaiveDate, NaiveDateTime};
use fast_webdav_client::parse_http_date;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

#[test]
fn test_rfc822_with_weekday() {
    assert_eq!(
        parse_http_date("Mon, 12 Jan 2024 10:00:00 GMT"),
        Some(at(2024, 1, 12, 10, 0, 0))
    );
}

#[test]
fn test_rfc822_without_weekday() {
    assert_eq!(
        parse_http_date("12 Jan 2024 10:00:00 GMT"),
        Some(at(2024, 1, 12, 10, 0, 0))
    );
    assert_eq!(
        parse_http_date("12 Jan 2024 10:00:00"),
        Some(at(2024, 1, 12, 10, 0, 0))
    );
}

#[test]
fn test_rfc850_with_weekday() {
    assert_eq!(
        parse_http_date("Monday, 12-Jan-24 10:00:00 GMT"),
        Some(at(2024, 1, 12, 10, 0, 0))
    );
}

#[test]
fn test_rfc850_without_weekday() {
    assert_eq!(
        parse_http_date("12-Jan-24 10:00:00 GMT"),
        Some(at(2024, 1, 12, 10, 0, 0))
    );
}

#[test]
fn test_asctime() {
    assert_eq!(
        parse_http_date("Mon Jan 12 10:00:00 2024"),
        Some(at(2024, 1, 12, 10, 0, 0))
    );
}

#[test]
fn test_asctime_space_padded_day() {
    assert_eq!(
        parse_http_date("Tue Jan  2 10:00:00 2024"),
        Some(at(2024, 1, 2, 10, 0, 0))
    );
}

#[test]
fn test_zone_is_stripped_not_applied() {
    assert_eq!(
        parse_http_date("Fri, 12 Jan 2024 10:00:00 Europe/Paris"),
        Some(at(2024, 1, 12, 10, 0, 0))
    );
    assert_eq!(
        parse_http_date("Fri, 12 Jan 2024 10:00:00 UTC"),
        parse_http_date("Fri, 12 Jan 2024 10:00:00 GMT")
    );
}

#[test]
fn test_junk_is_rejected() {
    assert_eq!(parse_http_date(""), None);
    assert_eq!(parse_http_date("yesterday"), None);
    assert_eq!(parse_http_date("Foo, 12 Jan 2024 10:00:00 GMT"), None);
    assert_eq!(parse_http_date("32 Jan 2024 10:00:00 GMT"), None);
    assert_eq!(parse_http_date("2024-01-12 10:00:00"), None);
}
