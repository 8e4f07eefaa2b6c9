//! Normalization of upstream field formats into display-ready values.
//!
//! Every function here is total: malformed or absent input yields a safe
//! default instead of an error.

use chrono::{DateTime, Utc};

use crate::models::RawVideoId;

const MILLIS_PER_DAY: i64 = 1000 * 60 * 60 * 24;

pub const CATEGORIES: &[(&str, &str)] = &[
    ("1", "Film & Animation"),
    ("2", "Autos & Vehicles"),
    ("10", "Music"),
    ("15", "Pets & Animals"),
    ("17", "Sports"),
    ("18", "Short Movies"),
    ("19", "Travel & Events"),
    ("20", "Gaming"),
    ("21", "Videoblogging"),
    ("22", "People & Blogs"),
    ("23", "Comedy"),
    ("24", "Entertainment"),
    ("25", "News & Politics"),
    ("26", "Howto & Style"),
    ("27", "Education"),
    ("28", "Science & Technology"),
    ("29", "Nonprofits & Activism"),
    ("30", "Movies"),
];

pub fn category_label(category_id: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(id, _)| *id == category_id)
        .map(|(_, label)| *label)
}

/// Parses the `PT#H#M#S` subset of ISO-8601 durations into seconds.
///
/// Only the first `PT` marker is considered and each component is optional,
/// but they must appear in H, M, S order. Anything else counts as zero.
pub fn parse_duration(duration: Option<&str>) -> u64 {
    let Some(duration) = duration else { return 0 };
    let Some(start) = duration.find("PT") else { return 0 };

    let mut rest = &duration[start + 2..];
    let mut total: u64 = 0;

    for (unit, factor) in [('H', 3600u64), ('M', 60), ('S', 1)] {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || !rest[digits..].starts_with(unit) {
            continue;
        }
        let value = rest[..digits]
            .bytes()
            .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add(u64::from(d - b'0')));
        total = total.saturating_add(value.saturating_mul(factor));
        rest = &rest[digits + 1..];
    }

    total
}

/// Formats seconds as `"1h 2m 3s"`, dropping zero units. Zero is `"0s"`.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut parts = Vec::with_capacity(3);
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{}s", seconds));
    }
    parts.join(" ")
}

pub fn format_duration_str(duration: Option<&str>) -> String {
    match duration {
        Some(raw) if !raw.is_empty() => format_duration(parse_duration(Some(raw))),
        _ => "0s".to_string(),
    }
}

pub fn format_views(views: u64) -> String {
    if views == 0 {
        return "0".to_string();
    }
    if views >= 1_000_000 {
        format!("{}M", one_decimal(views, 1_000_000))
    } else if views >= 1000 {
        format!("{}K", one_decimal(views, 1000))
    } else {
        views.to_string()
    }
}

// `value / divisor` to one decimal place, ties rounding up. Exact ties only
// happen at quarters (x.25, x.75), where float formatting would round to even.
fn one_decimal(value: u64, divisor: u64) -> String {
    if value % (divisor / 2) == divisor / 4 {
        let tenths = (u128::from(value) * 10 + u128::from(divisor / 2)) / u128::from(divisor);
        return format!("{}.{}", tenths / 10, tenths % 10);
    }
    format!("{:.1}", value as f64 / divisor as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayOneLabel {
    DayAgo,
    Yesterday,
}

fn elapsed_days(at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - at).num_milliseconds().abs() / MILLIS_PER_DAY
}

fn relative_label(days: i64, day_one: DayOneLabel) -> String {
    match days {
        0 => "Today".to_string(),
        1 => match day_one {
            DayOneLabel::DayAgo => "1 day ago".to_string(),
            DayOneLabel::Yesterday => "Yesterday".to_string(),
        },
        2..=6 => format!("{} days ago", days),
        7..=29 => format!("{} weeks ago", days / 7),
        30..=364 => format!("{} months ago", days / 30),
        _ => format!("{} years ago", days / 365),
    }
}

/// Relative upload label for video cards. One day back reads `"1 day ago"`.
pub fn format_time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    relative_label(elapsed_days(at, now), DayOneLabel::DayAgo)
}

/// Relative upload label for the detail view. One day back reads `"Yesterday"`.
pub fn format_upload_date(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    relative_label(elapsed_days(at, now), DayOneLabel::Yesterday)
}

/// Resolves either id shape to the canonical string id, or `None` for "no id".
pub fn resolve_video_id(id: Option<&RawVideoId>) -> Option<String> {
    match id? {
        RawVideoId::Plain(id) => Some(id.clone()),
        RawVideoId::Resource { video_id, .. } => video_id.clone(),
    }
}

/// Parses an RFC 3339 timestamp, the format every upstream date field uses.
pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|dt| DateTime::parse_from_rfc3339(dt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
