//! Core library for urd.
//!
//! - `event`: the source-neutral `Event` and description normalization
//! - `source`: remind and task adapters, the composite source
//! - `watcher`: debounced file change notifications
//! - `schedule`: slot model, cursor, layout engine and forward search

pub mod config;
pub mod date_range;
pub mod error;
pub mod event;
pub mod schedule;
pub mod source;
pub mod watcher;

pub use error::{UrdError, UrdResult};
pub use event::{Event, EventType, Priority};
