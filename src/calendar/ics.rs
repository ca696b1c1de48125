//! iCalendar (RFC 5545) encoding of a weekly plan

use super::event::CalendarEvent;
use chrono::{DateTime, Datelike, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};

pub const DEFAULT_TIMEZONE: &str = "Europe/Paris";

/// Content lines longer than this many octets are folded.
const MAX_LINE_OCTETS: usize = 75;

/// Start hours are clamped to one week either side of Monday midnight.
const MAX_START_HOURS: f64 = 24.0 * 7.0;

const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Calendar-level properties written into every document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarProfile {
    pub name: String,
    pub product_id: String,
    /// TZID attached to every DTSTART/DTEND
    pub timezone: String,
    /// Right-hand side of generated UIDs
    pub uid_domain: String,
}

impl Default for CalendarProfile {
    fn default() -> Self {
        Self {
            name: "Bob Planning".to_string(),
            product_id: "-//Bob Planning//FR".to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            uid_domain: "bob-planning".to_string(),
        }
    }
}

impl CalendarProfile {
    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }
}

/// Turns weekday-relative events into an importable VCALENDAR document
#[derive(Debug, Clone, Default)]
pub struct IcsEncoder {
    profile: CalendarProfile,
}

impl IcsEncoder {
    pub fn new(profile: CalendarProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &CalendarProfile {
        &self.profile
    }

    /// Encode against the current local time.
    pub fn encode(&self, events: &[CalendarEvent]) -> String {
        self.encode_at(events, &Local::now())
    }

    /// Encode with `now` anchoring "this week".
    ///
    /// The week and the event times are computed on `now`'s wall clock;
    /// DTSTAMP is `now` in UTC and also seeds the UIDs, so the output is
    /// fully determined by `events` and `now`.
    pub fn encode_at<Tz: TimeZone>(&self, events: &[CalendarEvent], now: &DateTime<Tz>) -> String {
        let monday = week_start(now.naive_local());
        let stamp = now.with_timezone(&Utc);
        let dtstamp = stamp.format(UTC_FORMAT).to_string();
        let nonce = stamp.timestamp_millis();
        let profile = &self.profile;

        let mut lines = vec![
            "BEGIN:VCALENDAR".to_string(),
            "VERSION:2.0".to_string(),
            format!("PRODID:{}", profile.product_id),
            "CALSCALE:GREGORIAN".to_string(),
            "METHOD:PUBLISH".to_string(),
            format!("X-WR-CALNAME:{}", escape_text(&profile.name)),
            format!("X-WR-TIMEZONE:{}", profile.timezone),
        ];

        for (index, event) in events.iter().enumerate() {
            let (start, end) = event_span(event, monday);
            lines.push("BEGIN:VEVENT".to_string());
            lines.push(format!("UID:event-{index}-{nonce}@{}", profile.uid_domain));
            lines.push(format!("DTSTAMP:{dtstamp}"));
            lines.push(format!(
                "DTSTART;TZID={}:{}",
                profile.timezone,
                start.format(LOCAL_FORMAT)
            ));
            lines.push(format!(
                "DTEND;TZID={}:{}",
                profile.timezone,
                end.format(LOCAL_FORMAT)
            ));
            lines.push(format!("SUMMARY:{}", escape_text(&event.title)));
            if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
                lines.push(format!("DESCRIPTION:{}", escape_text(description)));
            }
            lines.push("END:VEVENT".to_string());
        }

        lines.push("END:VCALENDAR".to_string());

        let mut document = String::with_capacity(lines.iter().map(|l| l.len() + 2).sum());
        for line in &lines {
            push_folded(&mut document, line);
        }
        document
    }
}

/// Monday 00:00 of the week containing `reference`.
pub fn week_start(reference: NaiveDateTime) -> NaiveDateTime {
    let date = reference.date();
    let back = i64::from(date.weekday().num_days_from_monday());
    (date - Duration::days(back)).and_time(NaiveTime::MIN)
}

/// Absolute start and end of `event` in the week beginning at `monday`.
///
/// The end is plain date-carrying addition, so long or late events roll
/// into the following day, month or year.
pub fn event_span(event: &CalendarEvent, monday: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let (hour, minute) = split_start_hour(event.start_hour);
    let start = monday
        + Duration::days(i64::from(event.day.offset()))
        + Duration::hours(hour)
        + Duration::minutes(minute);
    let end = start + Duration::minutes(i64::from(event.duration));
    (start, end)
}

#[allow(clippy::cast_possible_truncation)] // clamped to a small range first
fn split_start_hour(start_hour: f64) -> (i64, i64) {
    if !start_hour.is_finite() {
        return (0, 0);
    }
    let clamped = start_hour.clamp(-MAX_START_HOURS, MAX_START_HOURS);
    let hour = clamped.floor();
    let minute = ((clamped - hour) * 60.0).round();
    (hour as i64, minute as i64)
}

/// Escape a TEXT value: backslash, semicolon, comma and line breaks.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                escaped.push_str("\\n");
            }
            other => escaped.push(other),
        }
    }
    escaped
}

/// Append `line` folded at 75 octets, each physical line ending in CRLF.
fn push_folded(out: &mut String, line: &str) {
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += len;
    }
    out.push_str("\r\n");
}
