//! remind's JSON calendar output (`-ppp`).
//!
//! One array element per month; every triggered reminder is an entry.

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::event::{self, DEFAULT_IMPORTANCE, Event, EventType, Priority, SourceKind};

fn default_importance() -> i64 {
    DEFAULT_IMPORTANCE
}

#[derive(Debug, Deserialize)]
pub struct RemindMonth {
    #[serde(default)]
    pub monthname: String,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub daysinmonth: u32,
    #[serde(default)]
    pub firstwkday: u32,
    #[serde(default)]
    pub mondayfirst: u32,
    #[serde(default)]
    pub daynames: Vec<String>,
    #[serde(default)]
    pub entries: Vec<RemindEntry>,
}

/// remind emits TAG values either as an array or a comma-joined string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Tags {
    List(Vec<String>),
    Joined(String),
}

impl Tags {
    fn into_vec(self) -> Vec<String> {
        match self {
            Tags::List(tags) => tags,
            Tags::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RemindEntry {
    pub date: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub lineno: Option<u32>,
    #[serde(default = "default_importance")]
    pub priority: i64,
    #[serde(default)]
    pub rawbody: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Option<Tags>,
    /// Minutes since midnight.
    #[serde(default)]
    pub time: Option<i64>,
    /// Minutes.
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub eventstart: Option<String>,
    #[serde(default)]
    pub eventduration: Option<i64>,
    #[serde(default)]
    pub skip: Option<String>,
    #[serde(default)]
    pub until: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub passthru: Option<String>,
}

pub fn parse(stdout: &str) -> Result<Vec<RemindMonth>, serde_json::Error> {
    serde_json::from_str(stdout)
}

/// Minutes since midnight as a wall-clock time.
pub fn minutes_to_time(minutes: i64) -> Option<NaiveTime> {
    if !(0..24 * 60).contains(&minutes) {
        return None;
    }
    NaiveTime::from_hms_opt((minutes / 60) as u32, (minutes % 60) as u32, 0)
}

/// Strip the `r g b` prefix remind leaves on COLOR bodies.
pub(super) fn strip_color(body: &str) -> &str {
    let mut rest = body.trim_start();
    for _ in 0..3 {
        let Some((head, tail)) = rest.split_once(char::is_whitespace) else {
            return rest;
        };
        if head.parse::<u8>().is_err() {
            return body;
        }
        rest = tail.trim_start();
    }
    rest
}

/// Build an event from the fields every remind output format carries.
pub fn build_event(
    date: NaiveDate,
    time: Option<NaiveTime>,
    duration_minutes: Option<i64>,
    body: &str,
    importance: i64,
    mut tags: Vec<String>,
    file: Option<String>,
    line: Option<u32>,
) -> Event {
    let (description, marked, extracted) = event::extract(body);
    let priority = if marked != Priority::None {
        marked
    } else {
        Priority::from_importance(importance)
    };
    for tag in extracted {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    let start = date.and_time(time.unwrap_or(NaiveTime::MIN));
    Event {
        id: event::id_for(SourceKind::Remind, "", start, line),
        date,
        time,
        duration: time
            .and(duration_minutes)
            .filter(|m| *m > 0)
            .map(Duration::minutes),
        description,
        priority,
        tags,
        event_type: if time.is_some() {
            EventType::Reminder
        } else {
            EventType::Note
        },
        source_file: file,
        source_line: line,
    }
}

impl RemindEntry {
    /// `None` for entries that are not reminders (moon phases, shading, ...).
    pub fn into_event(self) -> Option<Event> {
        let body = match self.passthru.as_deref() {
            None => self.body.as_str(),
            Some(kind) if kind.eq_ignore_ascii_case("COLOR") || kind.eq_ignore_ascii_case("COLOUR") => {
                strip_color(&self.body)
            }
            Some(_) => return None,
        };

        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()?;
        let time = self.time.and_then(minutes_to_time);
        let tags = self.tags.map(Tags::into_vec).unwrap_or_default();

        Some(build_event(
            date,
            time,
            self.duration,
            body,
            self.priority,
            tags,
            self.filename,
            self.lineno,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONTH: &str = r#"[
      {
        "monthname": "March", "year": 2024, "daysinmonth": 31, "firstwkday": 5,
        "mondayfirst": 0,
        "daynames": ["Sunday","Monday","Tuesday","Wednesday","Thursday","Friday","Saturday"],
        "entries": [
          {"date":"2024-03-15","filename":"/home/me/.reminders","lineno":3,
           "passthru":null,"priority":5000,"rawbody":"Standup @work","body":"Standup @work",
           "time":540,"duration":60,"eventstart":"2024-03-15T09:00","eventduration":60},
          {"date":"2024-03-15","filename":"/home/me/.reminders","lineno":7,
           "priority":7500,"body":"Pay rent","tags":"finance,home"},
          {"date":"2024-03-16","passthru":"MOON","body":"0 -1 -1 Full moon"},
          {"date":"2024-03-17","filename":"/home/me/.reminders","lineno":9,
           "passthru":"COLOR","body":"255 0 0 Birthday!!"}
        ]
      }
    ]"#;

    #[test]
    fn entries_become_events() {
        let months = parse(MONTH).unwrap();
        assert_eq!(months[0].monthname, "March");
        let events: Vec<Event> = months
            .into_iter()
            .flat_map(|m| m.entries)
            .filter_map(RemindEntry::into_event)
            .collect();
        assert_eq!(events.len(), 3);

        let standup = &events[0];
        assert_eq!(standup.id, "evt-2024-03-15-3");
        assert_eq!(standup.time, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(standup.duration, Some(Duration::minutes(60)));
        assert_eq!(standup.description, "Standup");
        assert_eq!(standup.tags, vec!["work".to_string()]);
        assert_eq!(standup.event_type, EventType::Reminder);
        assert_eq!(standup.source_line, Some(3));

        let rent = &events[1];
        assert_eq!(rent.time, None);
        assert_eq!(rent.event_type, EventType::Note);
        assert_eq!(rent.priority, Priority::High);
        assert_eq!(rent.tags, vec!["finance".to_string(), "home".to_string()]);

        let birthday = &events[2];
        assert_eq!(birthday.description, "Birthday");
        assert_eq!(birthday.priority, Priority::Medium);
    }

    #[test]
    fn leading_numbers_are_only_stripped_for_color() {
        let plain: RemindEntry =
            serde_json::from_str(r#"{"date":"2024-03-15","lineno":2,"body":"1 2 3 go"}"#).unwrap();
        assert_eq!(plain.into_event().unwrap().description, "1 2 3 go");

        let colored: RemindEntry = serde_json::from_str(
            r#"{"date":"2024-03-15","lineno":2,"passthru":"colour","body":"1 2 3 go"}"#,
        )
        .unwrap();
        assert_eq!(colored.into_event().unwrap().description, "go");
    }

    #[test]
    fn out_of_range_minutes_are_untimed() {
        assert_eq!(minutes_to_time(1440), None);
        assert_eq!(minutes_to_time(-5), None);
        assert_eq!(minutes_to_time(75), NaiveTime::from_hms_opt(1, 15, 0));
    }

    #[test]
    fn duration_without_time_is_dropped() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let event = build_event(date, None, Some(30), "Note", 5000, vec![], None, Some(1));
        assert_eq!(event.duration, None);
    }
}
