//! Slot model, cursor, layout engine and search.

pub mod cursor;
pub mod layout;
pub mod search;
pub mod slot;

pub use cursor::{Cursor, Focus};
pub use layout::{
    Drawable, DrawableKind, Placement, Schedule, StyleHint, Viewport, layout, untimed_for_day,
};
pub use search::{Found, apply_found, find_next, find_next_widening};
pub use slot::Increment;
