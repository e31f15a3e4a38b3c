//! HTTP-date parsing for `getlastmodified` / `creationdate`.
//!
//! Results are zone-naive. A trailing zone name (`GMT`, `UTC`, `Europe/Paris`, ...)
//! is recognized and stripped but its offset is not applied; callers that care
//! about the zone must track it themselves.

use chrono::{NaiveDateTime, Weekday};
use chrono_tz::Tz;

struct DateFormat {
    /// Leading weekday token and the separator that follows it.
    weekday: Option<&'static str>,
    pattern: &'static str,
}

/// Tried in this order; the first format matching the whole string wins.
const FORMATS: [DateFormat; 6] = [
    // RFC 822 / 1123, with weekday
    DateFormat {
        weekday: Some(", "),
        pattern: "%d %b %Y %H:%M:%S",
    },
    // RFC 822 / 1123, without weekday
    DateFormat {
        weekday: None,
        pattern: "%d %b %Y %H:%M:%S",
    },
    // RFC 850, with weekday
    DateFormat {
        weekday: Some(", "),
        pattern: "%d-%b-%y %H:%M:%S",
    },
    // RFC 850, without weekday
    DateFormat {
        weekday: None,
        pattern: "%d-%b-%y %H:%M:%S",
    },
    // asctime
    DateFormat {
        weekday: Some(" "),
        pattern: "%b %d %H:%M:%S %Y",
    },
    // asctime, space-padded day
    DateFormat {
        weekday: Some(" "),
        pattern: "%b  %d %H:%M:%S %Y",
    },
];

/// Parse an HTTP-date in any of the RFC 2616 forms.
///
/// The weekday must be a valid name but is not checked against the date.
pub fn parse_http_date(input: &str) -> Option<NaiveDateTime> {
    let input = strip_zone(input.trim());
    FORMATS.iter().find_map(|format| format.parse(input))
}

impl DateFormat {
    fn parse(&self, input: &str) -> Option<NaiveDateTime> {
        let rest = match self.weekday {
            Some(separator) => {
                let (day, rest) = input.split_once(separator)?;
                day.parse::<Weekday>().ok()?;
                rest
            }
            None => input,
        };
        NaiveDateTime::parse_from_str(rest, self.pattern).ok()
    }
}

/// Drop the text after the last space when it names a known time zone.
fn strip_zone(input: &str) -> &str {
    let Some((head, tail)) = input.rsplit_once(' ') else {
        return input;
    };
    if tail.parse::<Tz>().is_ok() {
        head.trim_end()
    } else {
        input
    }
}
