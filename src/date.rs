//! Normalization of `Date` header values
//!
//! Servers disagree on the layout of the `Date` header: some include a
//! weekday, some pad single-digit days with an extra space, and some
//! append commentary such as `(CEST)` or `(added by postmaster@...)`.
//! Each layout is matched by a regex anchored at the start of the value
//! and only the matched prefix is handed to chrono.

use chrono::{DateTime, FixedOffset, Utc};
use regex::Regex;
use std::sync::LazyLock;

struct DateLayout {
    pattern: Regex,
    format: &'static str,
}

/// Tried top to bottom; the more specific layout comes first.
static DATE_LAYOUTS: LazyLock<Vec<DateLayout>> = LazyLock::new(|| {
    [
        // Tue, 21 Jul 2020 21:23:00 +0200
        // Sun,  7 Jun 2020 05:10:08 +0200 (CEST)
        (
            r"^\w{3},.{1,2}\d{1,2} \w{3} \d{4} ..:..:.. .\w{4}",
            "%a, %d %b %Y %H:%M:%S %z",
        ),
        // 21 Jul 2020 21:23:00 +0200
        (
            r"^\d{1,2} \w{3} \w{4} ..:..:.. .\w{4}",
            "%d %b %Y %H:%M:%S %z",
        ),
    ]
    .into_iter()
    .map(|(pattern, format)| DateLayout {
        pattern: Regex::new(pattern).expect("date layout regex"),
        format,
    })
    .collect()
});

/// Parse a `Date` header value.
///
/// Returns `None` when no known layout matches, or when the matched
/// text is not a real date.
#[must_use]
pub fn parse(value: &str) -> Option<DateTime<FixedOffset>> {
    let layout = DATE_LAYOUTS
        .iter()
        .find(|layout| layout.pattern.is_match(value))?;
    let matched = layout.pattern.find(value)?.as_str();
    // "Sun,  7 Jun" pads the day with a second space.
    let compact = matched.split_whitespace().collect::<Vec<_>>().join(" ");
    DateTime::parse_from_str(&compact, layout.format).ok()
}

/// Parse a `Date` header value, falling back to the current UTC time.
#[must_use]
pub fn parse_or_now(value: Option<&str>) -> DateTime<FixedOffset> {
    value.and_then(parse).unwrap_or_else(|| {
        tracing::debug!("Unusable date {:?}, substituting now", value);
        Utc::now().fixed_offset()
    })
}
