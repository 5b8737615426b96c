//! Task tool adapter.
//!
//! `<task> work --json [file]` prints one work period per line. Each period
//! becomes a Todo event.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{EventSource, SourceChange, SourceFuture, WatchSlot, process};
use crate::config::UrdConfig;
use crate::date_range::DateRange;
use crate::error::{UrdError, UrdResult};
use crate::event::{self, Event, EventType, Priority, SourceKind};

/// Tag added to periods that cover only part of a task.
pub const PARTIAL_TAG: &str = "PARTIAL";

const DEFAULT_PACKAGE: &str = "default";

/// Task ids are strings in newer releases and integers in older ones.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Text(String),
    Number(i64),
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TaskId::Text(s) => write!(f, "{s}"),
            TaskId::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkPeriod {
    pub task_id: TaskId,
    pub task_name: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub package_id: Option<String>,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    #[serde(default)]
    pub hours: f64,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub total_hours: Option<f64>,
}

impl WorkPeriod {
    /// Partial periods are worth flagging only when the task's total is known.
    fn partial_of(&self) -> Option<f64> {
        if self.is_complete {
            return None;
        }
        self.total_hours.filter(|total| *total > 0.0)
    }

    pub fn into_event(self) -> Event {
        let start = self.start.naive_local();
        let mut description = self.task_name.clone();
        let mut tags = Vec::new();

        if let Some(package) = self.package_id.as_deref() {
            if !package.is_empty() && package != DEFAULT_PACKAGE {
                tags.push(package.to_string());
            }
        }
        if let Some(user) = self.user.as_deref().filter(|u| !u.is_empty()) {
            tags.push(format!("@{user}"));
        }
        if let Some(total) = self.partial_of() {
            description.push_str(&format!(" ({}/{}h)", hours(self.hours), hours(total)));
            tags.push(PARTIAL_TAG.to_string());
        }

        Event {
            id: event::id_for(SourceKind::Task, &self.task_id.to_string(), start, None),
            date: start.date(),
            time: Some(start.time()),
            duration: Some(self.end - self.start).filter(|d| *d > chrono::Duration::zero()),
            description,
            priority: Priority::None,
            tags,
            event_type: EventType::Todo,
            source_file: None,
            source_line: None,
        }
    }
}

/// `1.5` stays `1.5`, `2.0` becomes `2`.
fn hours(value: f64) -> String {
    let text = format!("{value:.1}");
    text.strip_suffix(".0").map(String::from).unwrap_or(text)
}

/// Parse NDJSON output, skipping lines that are not work periods.
pub fn parse_periods(output: &str) -> Vec<WorkPeriod> {
    output.lines().filter_map(parse_period).collect()
}

fn parse_period(line: &str) -> Option<WorkPeriod> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(period) => Some(period),
        Err(e) => {
            debug!(error = %e, "skipping malformed work period");
            None
        }
    }
}

pub struct TaskSource {
    command: String,
    file: Option<PathBuf>,
    watch: WatchSlot,
}

impl TaskSource {
    pub fn new(command: impl Into<String>, file: Option<PathBuf>) -> Self {
        TaskSource {
            command: command.into(),
            file,
            watch: WatchSlot::default(),
        }
    }

    /// `None` when no task command is configured.
    pub fn from_config(config: &UrdConfig) -> Option<Self> {
        config
            .task_command
            .as_ref()
            .map(|command| TaskSource::new(command.clone(), config.task_path()))
    }

    fn work_args(&self) -> Vec<String> {
        let mut args = vec!["work".to_string(), "--json".to_string()];
        if let Some(file) = &self.file {
            args.push(file.display().to_string());
        }
        args
    }

    /// Stream stdout line by line while draining stderr.
    async fn read_periods(&self) -> UrdResult<Vec<WorkPeriod>> {
        let binary = process::binary_path(&self.command)?;
        let args = self.work_args();
        debug!(binary = %binary.display(), ?args, "running task tool");

        let mut child = process::command(&binary, &args).spawn().map_err(|e| {
            UrdError::CommandFailure(format!("Failed to spawn {}: {}", binary.display(), e))
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| UrdError::CommandFailure("task stdout unavailable".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| UrdError::CommandFailure("task stderr unavailable".into()))?;

        let collect = async move {
            let mut periods = Vec::new();
            let mut lines = BufReader::new(stdout).lines();
            let mut errors = String::new();

            let (read_out, read_err) = tokio::join!(
                async {
                    while let Some(line) = lines.next_line().await? {
                        periods.extend(parse_period(&line));
                    }
                    Ok::<_, std::io::Error>(())
                },
                stderr.read_to_string(&mut errors),
            );
            read_out?;
            read_err?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((periods, errors, status))
        };

        let (periods, errors, status) = timeout(process::COMMAND_TIMEOUT, collect)
            .await
            .map_err(|_| UrdError::Timeout(process::COMMAND_TIMEOUT.as_secs()))??;

        if !status.success() {
            let message = errors.trim();
            return Err(UrdError::CommandFailure(if message.is_empty() {
                format!("{} exited with {}", self.command, status)
            } else {
                message.to_string()
            }));
        }
        if !errors.trim().is_empty() {
            warn!(stderr = %errors.trim(), "task tool wrote to stderr");
        }
        Ok(periods)
    }

    async fn load(&self, range: DateRange) -> UrdResult<Vec<Event>> {
        let events: Vec<Event> = self
            .read_periods()
            .await?
            .into_iter()
            .map(WorkPeriod::into_event)
            .filter(|e| range.contains(e.date))
            .collect();
        debug!(count = events.len(), "loaded work periods");
        Ok(events)
    }
}

impl EventSource for TaskSource {
    fn name(&self) -> &str {
        "task"
    }

    fn get_events(&self, range: DateRange) -> SourceFuture<'_, Vec<Event>> {
        Box::pin(self.load(range))
    }

    fn test_connection(&self) -> SourceFuture<'_, ()> {
        Box::pin(async move {
            let output = process::run(&self.command, &["--version".to_string()]).await?;
            if output.status.success() {
                Ok(())
            } else {
                Err(UrdError::CommandFailure(format!(
                    "{} --version exited with {}",
                    self.command, output.status
                )))
            }
        })
    }

    fn watch_files(&self) -> UrdResult<mpsc::Receiver<SourceChange>> {
        let paths: Vec<&Path> = self.file.iter().map(PathBuf::as_path).collect();
        self.watch.start(self.name(), &paths)
    }

    fn stop_watching(&self) {
        self.watch.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    const OUTPUT: &str = r#"{"task_id":"T-1","task_name":"Write report","user":"ana","package_id":"work","start":"2025-08-19T09:00:00+02:00","end":"2025-08-19T10:30:00+02:00","hours":1.5,"is_complete":false,"total_hours":4.0}
not json at all
{"task_id":7,"task_name":"Inbox","user":"","package_id":"default","start":"2025-08-20T14:00:00-05:00","end":"2025-08-20T15:00:00-05:00","hours":1.0,"is_complete":true,"total_hours":1.0}
"#;

    #[test]
    fn malformed_lines_are_skipped() {
        assert_eq!(parse_periods(OUTPUT).len(), 2);
    }

    #[test]
    fn partial_period_gets_suffix_and_tags() {
        let event = parse_periods(OUTPUT).remove(0).into_event();
        assert_eq!(event.id, "p2-T-1-20250819-090000");
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2025, 8, 19).unwrap());
        assert_eq!(event.time, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(event.duration_minutes(), Some(90));
        assert_eq!(event.description, "Write report (1.5/4h)");
        assert_eq!(event.tags, vec!["work", "@ana", PARTIAL_TAG]);
        assert_eq!(event.event_type, EventType::Todo);
    }

    #[test]
    fn complete_period_in_default_package() {
        let event = parse_periods(OUTPUT).remove(1).into_event();
        assert_eq!(event.id, "p2-7-20250820-140000");
        assert_eq!(event.time, NaiveTime::from_hms_opt(14, 0, 0));
        assert_eq!(event.description, "Inbox");
        assert!(event.tags.is_empty());
    }

    #[test]
    fn hour_formatting() {
        assert_eq!(hours(2.0), "2");
        assert_eq!(hours(0.3), "0.3");
        assert_eq!(hours(1.5), "1.5");
    }

    #[test]
    fn work_args_include_file() {
        let source = TaskSource::new("task", Some(PathBuf::from("/tmp/tasks.db")));
        assert_eq!(source.work_args(), vec!["work", "--json", "/tmp/tasks.db"]);
        assert_eq!(TaskSource::new("task", None).work_args(), vec!["work", "--json"]);
    }
}
