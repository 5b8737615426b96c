pub mod add;
pub mod check;
pub mod edit;
pub mod events;
pub mod remove;
pub mod search;
pub mod view;
pub mod watch;

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use owo_colors::OwoColorize;
use urd_core::config::UrdConfig;
use urd_core::schedule::{Focus, Viewport};
use urd_core::source::{CompositeSource, EventSource, RemindSource, TaskSource};

use crate::app::App;
use crate::render;

/// The configured sources. remind is always present; task only when
/// `task_command` is set.
pub struct Sources {
    pub remind: Arc<RemindSource>,
    pub all: CompositeSource,
}

impl Sources {
    pub fn from_config(config: &UrdConfig) -> Self {
        let remind = Arc::new(RemindSource::from_config(config));
        let mut all: Vec<Box<dyn EventSource>> = vec![Box::new(remind.clone())];
        if let Some(task) = TaskSource::from_config(config) {
            all.push(Box::new(task));
        }
        Sources {
            remind,
            all: CompositeSource::new(all),
        }
    }
}

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn viewport(config: &UrdConfig, rows: u16, width: u16) -> Viewport {
    Viewport {
        rows,
        time_col_width: config.time_column_width,
        event_area_width: width.saturating_sub(config.time_column_width),
    }
}

/// Grid, untimed sidebar and status line for the current state.
pub fn screen(app: &App, now: NaiveDateTime) -> Vec<String> {
    let mut lines = render::compose(&app.layout(now), &app.viewport);

    let day = app.cursor.selected_date();
    let untimed = app.sidebar();
    lines.push(String::new());
    lines.push(format!(
        "{} {}",
        day.format("%a %b %-d").to_string().bold(),
        format!("({})", render::pluralize("untimed event", untimed.len())).dimmed()
    ));
    let selected = (app.cursor.focus == Focus::Untimed).then_some(app.cursor.untimed_index);
    lines.extend(render::sidebar(&untimed, selected));

    if let Some(status) = app.status() {
        lines.push(String::new());
        lines.push(status.yellow().to_string());
    }
    lines
}
