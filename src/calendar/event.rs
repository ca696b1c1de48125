//! Calendar event value types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Day of the week, carried on the wire as a short French label
///
/// Labels the remote service does not use are kept verbatim in
/// `Unrecognized` so that a bad label never fails deserialization; such
/// events are exported on Monday.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeekDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    Unrecognized(String),
}

impl WeekDay {
    pub const ALL: [WeekDay; 7] = [
        WeekDay::Monday,
        WeekDay::Tuesday,
        WeekDay::Wednesday,
        WeekDay::Thursday,
        WeekDay::Friday,
        WeekDay::Saturday,
        WeekDay::Sunday,
    ];

    pub fn parse(label: &str) -> Self {
        match label {
            "Lun" => WeekDay::Monday,
            "Mar" => WeekDay::Tuesday,
            "Mer" => WeekDay::Wednesday,
            "Jeu" => WeekDay::Thursday,
            "Ven" => WeekDay::Friday,
            "Sam" => WeekDay::Saturday,
            "Dim" => WeekDay::Sunday,
            other => WeekDay::Unrecognized(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            WeekDay::Monday => "Lun",
            WeekDay::Tuesday => "Mar",
            WeekDay::Wednesday => "Mer",
            WeekDay::Thursday => "Jeu",
            WeekDay::Friday => "Ven",
            WeekDay::Saturday => "Sam",
            WeekDay::Sunday => "Dim",
            WeekDay::Unrecognized(label) => label,
        }
    }

    /// Days after Monday. Unrecognized labels fall back to 0.
    pub fn offset(&self) -> u32 {
        match self {
            WeekDay::Monday | WeekDay::Unrecognized(_) => 0,
            WeekDay::Tuesday => 1,
            WeekDay::Wednesday => 2,
            WeekDay::Thursday => 3,
            WeekDay::Friday => 4,
            WeekDay::Saturday => 5,
            WeekDay::Sunday => 6,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, WeekDay::Unrecognized(_))
    }
}

impl From<String> for WeekDay {
    fn from(label: String) -> Self {
        WeekDay::parse(&label)
    }
}

impl From<WeekDay> for String {
    fn from(day: WeekDay) -> Self {
        match day {
            WeekDay::Unrecognized(label) => label,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for WeekDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One scheduled item of the weekly plan
///
/// `start_hour` may be fractional: 14.5 means 14:30. `duration` is in
/// minutes and may push the end past midnight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub day: WeekDay,
    pub start_hour: f64,
    pub duration: u32,
}

impl CalendarEvent {
    pub fn new(title: impl Into<String>, day: WeekDay, start_hour: f64, duration: u32) -> Self {
        Self {
            title: title.into(),
            description: None,
            day,
            start_hour,
            duration,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
