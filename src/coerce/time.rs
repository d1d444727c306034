//! Timestamp parsing against a fixed list of well-known layouts.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// How a layout carries its zone information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    /// No numeric offset; the result is read as UTC. Zone abbreviations
    /// (`%Z`) are skipped by the parser.
    Utc,
    /// The layout contains a numeric offset (`%z`).
    Offset,
    /// RFC 3339, handled by chrono's dedicated parser.
    Rfc3339,
    /// Time of day only; the date is 0000-01-01.
    Clock,
}

struct Layout {
    name: &'static str,
    format: &'static str,
    zone: Zone,
}

const LAYOUTS: &[Layout] = &[
    Layout { name: "ANSI C", format: "%a %b %e %H:%M:%S %Y", zone: Zone::Utc },
    Layout { name: "Unix date", format: "%a %b %e %H:%M:%S %Z %Y", zone: Zone::Utc },
    Layout { name: "Ruby date", format: "%a %b %d %H:%M:%S %z %Y", zone: Zone::Offset },
    Layout { name: "RFC 822", format: "%d %b %y %H:%M %Z", zone: Zone::Utc },
    Layout { name: "RFC 822Z", format: "%d %b %y %H:%M %z", zone: Zone::Offset },
    Layout { name: "RFC 850", format: "%A, %d-%b-%y %H:%M:%S %Z", zone: Zone::Utc },
    Layout { name: "RFC 1123", format: "%a, %d %b %Y %H:%M:%S %Z", zone: Zone::Utc },
    Layout { name: "RFC 1123Z", format: "%a, %d %b %Y %H:%M:%S %z", zone: Zone::Offset },
    Layout { name: "RFC 3339", format: "", zone: Zone::Rfc3339 },
    Layout { name: "kitchen", format: "%I:%M%p", zone: Zone::Clock },
    Layout { name: "date time", format: "%Y-%m-%d %H:%M:%S", zone: Zone::Utc },
    Layout { name: "dotted date time", format: "%d.%m.%Y %H:%M:%S", zone: Zone::Utc },
    Layout { name: "time dotted date", format: "%H:%M:%S %d.%m.%Y", zone: Zone::Utc },
    Layout { name: "date time zone", format: "%Y-%m-%d %H:%M:%S %Z", zone: Zone::Utc },
    Layout { name: "date time offset", format: "%Y-%m-%d %H:%M:%S %z", zone: Zone::Offset },
    Layout { name: "date time offset zone", format: "%Y-%m-%d %H:%M:%S %z %Z", zone: Zone::Offset },
];

/// Parse `literal` as a timestamp.
///
/// Known layouts are tried in order against the untrimmed literal, then the
/// caller's `custom` layout (a chrono `strftime` string). If none match, the
/// trimmed literal is read as integer and then fractional Unix seconds.
pub(crate) fn parse_timestamp(
    literal: &str,
    trimmed: &str,
    custom: Option<&str>,
) -> Option<DateTime<FixedOffset>> {
    for layout in LAYOUTS {
        if let Some(t) = parse_with(literal, layout.format, layout.zone) {
            tracing::trace!(layout = layout.name, literal, "timestamp layout matched");
            return Some(t);
        }
    }
    if let Some(format) = custom {
        let parsed = parse_with(literal, format, Zone::Offset)
            .or_else(|| parse_with(literal, format, Zone::Utc));
        if parsed.is_some() {
            return parsed;
        }
    }
    unix_seconds(trimmed)
}

fn parse_with(literal: &str, format: &str, zone: Zone) -> Option<DateTime<FixedOffset>> {
    match zone {
        Zone::Rfc3339 => DateTime::parse_from_rfc3339(literal).ok(),
        Zone::Offset => DateTime::parse_from_str(literal, format).ok(),
        // `%Z` swallows any word, so a numeric offset must be left to the
        // `%z` layouts.
        Zone::Utc if format.contains("%Z") && has_numeric_offset(literal) => None,
        Zone::Utc => NaiveDateTime::parse_from_str(literal, format)
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset()),
        Zone::Clock => {
            let time = NaiveTime::parse_from_str(literal, format).ok()?;
            let date = NaiveDate::from_ymd_opt(0, 1, 1)?;
            Some(Utc.from_utc_datetime(&date.and_time(time)).fixed_offset())
        }
    }
}

/// Whether a whitespace-separated word of `literal` reads like `-0700` or
/// `+03:00`.
fn has_numeric_offset(literal: &str) -> bool {
    literal.split_whitespace().any(|word| {
        word.strip_prefix(['+', '-']).is_some_and(|rest| {
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit() || c == ':')
        })
    })
}

fn unix_seconds(trimmed: &str) -> Option<DateTime<FixedOffset>> {
    let secs = match trimmed.parse::<i64>() {
        Ok(secs) => secs,
        Err(_) => {
            let secs = trimmed.parse::<f64>().ok().filter(|s| s.is_finite())?;
            secs.trunc() as i64
        }
    };
    DateTime::from_timestamp(secs, 0).map(|t| t.fixed_offset())
}
