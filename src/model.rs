//! Entities served by the task service, decoded from its REST payloads.

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Urgency stored the way the service stores it: 4 is the most urgent.
///
/// Users see the inverted form, so `Priority(4)` renders as `P1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    pub const LOWEST: Priority = Priority(1);
    pub const HIGHEST: Priority = Priority(4);

    /// Builds a priority from the displayed `P1..P4` number.
    pub fn from_display(level: u8) -> Option<Self> {
        match level {
            1..=4 => Some(Priority(5 - level)),
            _ => None,
        }
    }

    pub fn from_raw(raw: u8) -> Self {
        Priority(raw.clamp(1, 4))
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn display_level(self) -> u8 {
        5 - self.0.clamp(1, 4)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::LOWEST
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.display_level())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DueWire {
    date: String,
    #[serde(default)]
    datetime: Option<String>,
    #[serde(default)]
    is_recurring: bool,
    #[serde(default)]
    string: Option<String>,
}

/// A due value: calendar date, optional wall-clock time, recurrence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "DueWire")]
pub struct Due {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub recurring: bool,
    pub text: Option<String>,
}

impl Due {
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date,
            time: None,
            recurring: false,
            text: None,
        }
    }

    pub fn at(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            time: Some(time),
            ..Self::on(date)
        }
    }

    /// Sort key: an untimed due sorts as the start of its day.
    pub fn sort_key(&self) -> (NaiveDate, NaiveTime) {
        (self.date, self.time.unwrap_or(NaiveTime::MIN))
    }

    pub fn label(&self) -> String {
        let mut out = match self.time {
            Some(time) => format!("{} {}", self.date.format("%Y-%m-%d"), time.format("%H:%M")),
            None => self.date.format("%Y-%m-%d").to_string(),
        };
        if self.recurring {
            out.push_str(" (repeats)");
        }
        out
    }
}

impl TryFrom<DueWire> for Due {
    type Error = String;

    fn try_from(wire: DueWire) -> Result<Self, Self::Error> {
        let date_part = wire.date.get(..10).unwrap_or(&wire.date);
        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|err| format!("invalid due date {:?}: {err}", wire.date))?;

        // Fixed-zone datetimes are shown in local time; floating ones are taken as-is.
        let time = match wire.datetime.as_deref() {
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(dt) => Some(dt.with_timezone(&Local).time()),
                Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                    .ok()
                    .map(|dt| dt.time()),
            },
            None => NaiveDateTime::parse_from_str(&wire.date, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.time()),
        };

        Ok(Self {
            date,
            time,
            recurring: wire.is_recurring,
            text: wire.string,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Item {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due: Option<Due>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default, alias = "is_completed")]
    pub checked: bool,
    #[serde(default, alias = "is_deleted")]
    pub deleted: bool,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default)]
    pub order: i64,
}

impl Item {
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due.as_ref().map(|due| due.date)
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|label| label.eq_ignore_ascii_case(name))
    }

    /// Text the fuzzy search runs against.
    pub fn search_blob(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.content.to_lowercase(),
            self.description.to_lowercase(),
            self.labels.join(" ").to_lowercase()
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, alias = "is_favorite")]
    pub favorite: bool,
    #[serde(default, alias = "is_inbox_project")]
    pub inbox: bool,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default, alias = "is_favorite")]
    pub favorite: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default, alias = "task_id")]
    pub item_id: String,
    #[serde(alias = "content")]
    pub text: String,
    #[serde(default, alias = "posted_at")]
    pub posted: String,
}

/// Everything a full fetch returns, swapped into the caches in one step.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub items: Vec<Item>,
    pub projects: Vec<Project>,
    pub sections: Vec<Section>,
    pub labels: Vec<Label>,
}

/// Fields a create request carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewItem {
    pub content: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_datetime: Option<String>,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// Partial update; only populated fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_datetime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
