//! remind adapter.
//!
//! Events are read one month at a time through remind's JSON calendar mode
//! (`-ppp`), falling back to the simple-calendar text format for older
//! builds. New reminders are appended to the first configured file.

pub mod json;
pub mod legacy;
pub mod writer;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Output;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{EventSource, SourceChange, SourceFuture, WatchSlot, process};
use crate::config::UrdConfig;
use crate::date_range::DateRange;
use crate::error::{UrdError, UrdResult};
use crate::event::{DEFAULT_IMPORTANCE, Event};

pub use writer::QuickEntry;

/// stderr fragments remind uses for problems in a reminder file.
const SYNTAX_TOKENS: [&str; 4] = ["parse error", "unknown", "expecting", "invalid"];

pub struct RemindSource {
    command: String,
    files: Vec<PathBuf>,
    add_template: String,
    add_timed_template: String,
    watch: WatchSlot,
}

impl RemindSource {
    pub fn new(command: impl Into<String>, files: Vec<PathBuf>) -> Self {
        let defaults = UrdConfig::default();
        RemindSource {
            command: command.into(),
            files,
            add_template: defaults.add_template,
            add_timed_template: defaults.add_timed_template,
            watch: WatchSlot::default(),
        }
    }

    pub fn from_config(config: &UrdConfig) -> Self {
        RemindSource {
            command: config.remind_command.clone(),
            files: config.reminder_paths(),
            add_template: config.add_template.clone(),
            add_timed_template: config.add_timed_template.clone(),
            watch: WatchSlot::default(),
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// The file new reminders are written to.
    pub fn primary_file(&self) -> UrdResult<&Path> {
        self.files
            .first()
            .map(PathBuf::as_path)
            .ok_or_else(|| UrdError::Config("no reminder files configured".into()))
    }

    fn files_args(&self) -> Vec<String> {
        let mut args = vec!["-q".to_string()];
        args.extend(self.files.iter().map(|f| f.display().to_string()));
        args
    }

    fn anchored_args(&self, flags: &[&str], anchor: NaiveDate) -> Vec<String> {
        let mut args: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
        args.extend(self.files.iter().map(|f| f.display().to_string()));
        args.push(anchor.format("%b").to_string());
        args.push(anchor.day().to_string());
        args.push(anchor.year().to_string());
        args
    }

    async fn month_events(&self, anchor: NaiveDate) -> UrdResult<Vec<Event>> {
        let args = self.anchored_args(&["-pppq", "-l", "-g", "-b2"], anchor);
        let output = process::run(&self.command, &args).await?;
        let stdout = checked_stdout(&output)?;
        parse_output(&stdout)
    }

    async fn load(&self, range: DateRange) -> UrdResult<Vec<Event>> {
        let mut seen = HashSet::new();
        let mut events = Vec::new();

        for anchor in range.month_anchors() {
            for event in self.month_events(anchor).await? {
                if seen.insert(event.id.clone()) {
                    events.push(event);
                }
            }
        }

        events.retain(|e| range.contains(e.date));
        debug!(count = events.len(), start = %range.start, end = %range.end, "loaded reminders");
        Ok(events)
    }

    /// Next reminder after `after` whose description or a tag contains `term`.
    pub async fn find_next(&self, term: &str, after: NaiveDateTime) -> UrdResult<Option<Event>> {
        let mut events = Vec::new();
        for anchor in [after.date(), after.date() + Duration::days(1)] {
            let args = self.anchored_args(&["-n", "-b1"], anchor);
            let output = process::run(&self.command, &args).await?;
            let stdout = checked_stdout(&output)?;
            events.extend(stdout.lines().filter_map(parse_next_line));
        }

        events.sort_by(|a, b| a.start().cmp(&b.start()));
        Ok(events.into_iter().find(|e| {
            let later = match e.time {
                Some(_) => e.start() > after,
                None => e.date > after.date(),
            };
            later && e.matches(term)
        }))
    }

    /// Append a line from the untimed template; returns its line number.
    pub fn add_event_from_template(&self, date: NaiveDate) -> UrdResult<(PathBuf, u32)> {
        let line = writer::expand_template(&self.add_template, date, None, None);
        self.append(&line)
    }

    pub fn add_timed_event_from_template(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        duration: Option<Duration>,
    ) -> UrdResult<(PathBuf, u32)> {
        let line = writer::expand_template(&self.add_timed_template, date, Some(time), duration);
        self.append(&line)
    }

    pub fn add_quick_event(&self, entry: &QuickEntry) -> UrdResult<(PathBuf, u32)> {
        self.append(&writer::quick_line(entry))
    }

    /// Write `event` back as a REM line, e.g. when pasting.
    pub fn add_event_struct(&self, event: &Event) -> UrdResult<(PathBuf, u32)> {
        self.append(&writer::event_line(event))
    }

    /// Remove the line an event was read from.
    pub fn remove_event(&self, event: &Event) -> UrdResult<()> {
        let (Some(file), Some(line)) = (event.source_file.as_deref(), event.source_line) else {
            return Err(UrdError::NotFound(format!(
                "no source location for '{}'",
                event.description
            )));
        };
        let removed = writer::remove_line(Path::new(file), line)?;
        info!(file, line, removed = %removed, "removed reminder");
        Ok(())
    }

    /// Remove line `line` (1-indexed) of the primary file, returning its text.
    pub fn remove_at(&self, line: u32) -> UrdResult<String> {
        let path = self.primary_file()?;
        let removed = writer::remove_line(path, line)?;
        info!(file = %path.display(), line, "removed reminder");
        Ok(removed)
    }

    /// Remove the first line in the primary file containing `pattern`.
    pub fn remove_matching(&self, pattern: &str) -> UrdResult<(PathBuf, u32)> {
        let path = self.primary_file()?;
        let line = writer::remove_matching(path, pattern)?;
        info!(file = %path.display(), line, "removed reminder");
        Ok((path.to_path_buf(), line))
    }

    fn append(&self, line: &str) -> UrdResult<(PathBuf, u32)> {
        let path = self.primary_file()?;
        let line_no = writer::append_line(path, line)?;
        info!(file = %path.display(), line = line_no, "added reminder");
        Ok((path.to_path_buf(), line_no))
    }
}

impl EventSource for RemindSource {
    fn name(&self) -> &str {
        "remind"
    }

    fn get_events(&self, range: DateRange) -> SourceFuture<'_, Vec<Event>> {
        Box::pin(self.load(range))
    }

    fn test_connection(&self) -> SourceFuture<'_, ()> {
        Box::pin(async move {
            let output = process::run(&self.command, &self.files_args()).await?;
            let stdout = String::from_utf8_lossy(&output.stdout);
            if output.status.success() || stdout.to_lowercase().contains("no reminders") {
                return Ok(());
            }
            Err(UrdError::CommandFailure(failure_message(&output)))
        })
    }

    fn watch_files(&self) -> UrdResult<mpsc::Receiver<SourceChange>> {
        let paths: Vec<&Path> = self.files.iter().map(PathBuf::as_path).collect();
        self.watch.start(self.name(), &paths)
    }

    fn stop_watching(&self) {
        self.watch.stop();
    }
}

/// Turn a finished invocation into its stdout, or the error it reported.
fn checked_stdout(output: &Output) -> UrdResult<String> {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if let Some(err) = classify_stderr(&stderr) {
        return Err(err);
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() && stdout.trim().is_empty() {
        return Err(UrdError::CommandFailure(failure_message(output)));
    }
    if !stderr.trim().is_empty() {
        warn!(stderr = %stderr.trim(), "remind wrote to stderr");
    }
    Ok(stdout)
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("remind exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

/// Find a reminder-file error in remind's stderr.
pub fn classify_stderr(stderr: &str) -> Option<UrdError> {
    for line in stderr.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some((file, line_no, message)) = parse_location(line) {
            return Some(UrdError::syntax(Some(file), Some(line_no), message));
        }
    }

    let lower = stderr.to_lowercase();
    if SYNTAX_TOKENS.iter().any(|token| lower.contains(token)) {
        return Some(UrdError::syntax(None, None, stderr.trim()));
    }
    None
}

/// `/path/to/file(12): message`
fn parse_location(line: &str) -> Option<(String, u32, String)> {
    let (head, message) = line.split_once("): ")?;
    let (file, line_no) = head.rsplit_once('(')?;
    if file.is_empty() {
        return None;
    }
    Some((
        file.to_string(),
        line_no.trim().parse().ok()?,
        message.trim().to_string(),
    ))
}

/// JSON first, then the simple-calendar format.
pub fn parse_output(stdout: &str) -> UrdResult<Vec<Event>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    match json::parse(stdout) {
        Ok(months) => Ok(months
            .into_iter()
            .flat_map(|m| m.entries)
            .filter_map(json::RemindEntry::into_event)
            .collect()),
        Err(err) => {
            debug!(error = %err, "remind output is not JSON, trying simple calendar format");
            let events = legacy::parse(stdout);
            if events.is_empty() {
                Err(UrdError::ParseFailure(format!(
                    "unrecognised remind output: {err}"
                )))
            } else {
                Ok(events)
            }
        }
    }
}

/// One line of `remind -n`: `YYYY/MM/DD [HH:MM] description`.
fn parse_next_line(line: &str) -> Option<Event> {
    let (date, rest) = line.trim().split_once(' ')?;
    let date = NaiveDate::parse_from_str(date, "%Y/%m/%d").ok()?;

    let (time, body) = match rest.split_once(' ') {
        Some((first, body)) => match NaiveTime::parse_from_str(first, "%H:%M") {
            Ok(time) => (Some(time), body),
            Err(_) => (None, rest),
        },
        None => (None, rest),
    };

    Some(json::build_event(
        date,
        time,
        None,
        body,
        DEFAULT_IMPORTANCE,
        Vec::new(),
        None,
        None,
    ))
}
