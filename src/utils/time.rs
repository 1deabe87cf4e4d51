use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};

/// Renders seconds as zero padded `HH:MM:SS`. Hours are not wrapped, so 100 hours prints as
/// `100:00:00`.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Wall clock `HH:MM` of a stored timestamp in the given time zone.
pub fn format_clock_time<Tz: TimeZone>(time: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    time.with_timezone(tz).format("%H:%M").to_string()
}

/// Checks whether `time` falls on the same calendar day as `now`, as seen in the time zone of
/// `now`.
pub fn is_same_day<Tz: TimeZone>(time: DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    time.with_timezone(&now.timezone()).date_naive() == now.date_naive()
}
