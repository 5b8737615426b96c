//! Source-neutral event types.
//!
//! Every source (remind, the task tool) converts its own records into these
//! types. The schedule engine and the controller work exclusively with them.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// Importance used by remind when a reminder carries no PRIORITY clause.
pub const DEFAULT_IMPORTANCE: i64 = 5000;

/// An event (source-neutral)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    /// Civil date at local midnight.
    pub date: NaiveDate,
    /// Wall-clock time on `date`. `None` means untimed.
    pub time: Option<NaiveTime>,
    /// Only meaningful when `time` is set.
    pub duration: Option<Duration>,
    pub description: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub event_type: EventType,
    pub source_file: Option<String>,
    pub source_line: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Timed reminder
    Reminder,
    /// Untimed reminder
    Note,
    /// Work period from the task tool
    Todo,
}

/// Which adapter produced an event; selects the id scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Remind,
    Task,
}

impl Priority {
    /// Map remind's numeric PRIORITY (0-9999, default 5000).
    pub fn from_importance(p: i64) -> Self {
        if p >= 7000 {
            Priority::High
        } else if p >= 6000 {
            Priority::Medium
        } else if p > 5000 {
            Priority::Low
        } else {
            Priority::None
        }
    }

    /// Trailing marker written after a description for this priority.
    pub fn marker(&self) -> &'static str {
        match self {
            Priority::None => "",
            Priority::Low => "!",
            Priority::Medium => "!!",
            Priority::High => "!!!",
        }
    }
}

impl Event {
    /// A timed reminder; `date` is taken from `start`.
    pub fn timed(
        id: impl Into<String>,
        start: NaiveDateTime,
        duration: Option<Duration>,
        description: impl Into<String>,
    ) -> Self {
        Event {
            id: id.into(),
            date: start.date(),
            time: Some(start.time()),
            duration,
            description: description.into(),
            priority: Priority::None,
            tags: Vec::new(),
            event_type: EventType::Reminder,
            source_file: None,
            source_line: None,
        }
    }

    /// An untimed note on `date`.
    pub fn untimed(id: impl Into<String>, date: NaiveDate, description: impl Into<String>) -> Self {
        Event {
            id: id.into(),
            date,
            time: None,
            duration: None,
            description: description.into(),
            priority: Priority::None,
            tags: Vec::new(),
            event_type: EventType::Note,
            source_file: None,
            source_line: None,
        }
    }

    pub fn is_timed(&self) -> bool {
        self.time.is_some()
    }

    /// Start as a local date-time; untimed events start at midnight.
    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(NaiveTime::MIN))
    }

    /// Duration in whole minutes, if any.
    pub fn duration_minutes(&self) -> Option<i64> {
        self.duration.map(|d| d.num_minutes())
    }

    /// Case-insensitive match against the description and every tag.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        self.description.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

/// Split priority markers and `@tags` out of a description.
///
/// Returns the cleaned description, the priority from trailing `!` markers
/// (longest run wins, capped at three) and the tags without their `@`.
pub fn extract(description: &str) -> (String, Priority, Vec<String>) {
    let mut tags: Vec<String> = Vec::new();
    let mut words: Vec<String> = Vec::new();

    for word in description.split_whitespace() {
        match tag_token(word) {
            Some((tag, rest)) => {
                if !tags.iter().any(|t| t == tag) {
                    tags.push(tag.to_string());
                }
                // Punctuation after the tag stays with the text before it.
                if !rest.is_empty() {
                    match words.last_mut() {
                        Some(last) => last.push_str(rest),
                        None => words.push(rest.to_string()),
                    }
                }
            }
            None => words.push(word.to_string()),
        }
    }

    let joined = words.join(" ");
    let trimmed = joined.trim_end_matches('!');
    let bangs = joined.len() - trimmed.len();
    let priority = match bangs {
        0 => Priority::None,
        1 => Priority::Low,
        2 => Priority::Medium,
        _ => Priority::High,
    };

    let clean = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    (clean, priority, tags)
}

/// Split `@word...` into the tag and whatever trails it; `None` unless at
/// least one word character follows the `@`.
fn tag_token(word: &str) -> Option<(&str, &str)> {
    let rest = word.strip_prefix('@')?;
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some(rest.split_at(end))
}

/// Deterministic event id for a source record.
pub fn id_for(kind: SourceKind, key: &str, start: NaiveDateTime, line: Option<u32>) -> String {
    match kind {
        SourceKind::Remind => format!(
            "evt-{}-{}",
            start.date().format("%Y-%m-%d"),
            line.unwrap_or(0)
        ),
        SourceKind::Task => format!("p2-{}-{}", key, start.format("%Y%m%d-%H%M%S")),
    }
}
