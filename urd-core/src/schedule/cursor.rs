//! Cursor state over the slot grid.

use chrono::{Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};

use super::slot::{self, Increment};

/// Whether the cursor addresses timed slots or the untimed sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Timed,
    Untimed,
}

/// Cursor position.
///
/// `selected_slot` and `top_slot` are global slots relative to
/// `reference_date`, expressed in the current `increment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub reference_date: NaiveDate,
    pub selected_slot: i64,
    pub top_slot: i64,
    pub increment: Increment,
    pub focus: Focus,
    pub untimed_index: usize,
}

impl Cursor {
    pub fn new(reference_date: NaiveDate, increment: Increment) -> Self {
        Cursor {
            reference_date,
            selected_slot: 0,
            top_slot: 0,
            increment,
            focus: Focus::Timed,
            untimed_index: 0,
        }
    }

    /// Initial cursor on the slot containing `now`, centered in the viewport
    /// without scrolling above midnight.
    pub fn at(now: NaiveDateTime, increment: Increment, visible_slots: i64) -> Self {
        let mut cursor = Cursor::new(now.date(), increment);
        cursor.selected_slot = slot::time_to_slot(now.time(), increment);
        if cursor.selected_slot >= visible_slots {
            cursor.top_slot = (cursor.selected_slot - visible_slots / 2).max(0);
        }
        cursor
    }

    pub fn slots_per_day(&self) -> i64 {
        self.increment.slots_per_day()
    }

    pub fn selected_date(&self) -> NaiveDate {
        slot::slot_date(self.selected_slot, self.reference_date, self.increment)
    }

    pub fn selected_time(&self) -> NaiveTime {
        slot::slot_time(self.selected_slot, self.increment)
    }

    /// Fold a selected slot that left the reference day back into `[0, slots_per_day)`,
    /// moving `reference_date` and `top_slot` along with it.
    pub fn update_selected_date_from_slot(&mut self) {
        let offset = slot::day_offset(self.selected_slot, self.increment);
        if offset == 0 {
            return;
        }
        let shift = offset * self.slots_per_day();
        self.reference_date += Duration::days(offset);
        self.selected_slot -= shift;
        self.top_slot -= shift;
    }

    pub fn ensure_selected_slot_visible(&mut self, visible_slots: i64) {
        if self.selected_slot < self.top_slot {
            self.top_slot = self.selected_slot;
        } else if self.selected_slot >= self.top_slot + visible_slots {
            self.top_slot = self.selected_slot - visible_slots / 2;
        }
    }

    fn center_on_selected(&mut self, visible_slots: i64) {
        self.top_slot = self.selected_slot - visible_slots / 2;
    }

    pub fn move_down(&mut self, visible_slots: i64) {
        self.focus = Focus::Timed;
        self.selected_slot += 1;
        if self.selected_slot >= self.top_slot + visible_slots {
            self.top_slot += 1;
        }
        self.update_selected_date_from_slot();
        self.ensure_selected_slot_visible(visible_slots);
    }

    pub fn move_up(&mut self, visible_slots: i64) {
        self.focus = Focus::Timed;
        self.selected_slot -= 1;
        if self.selected_slot < self.top_slot {
            self.top_slot -= 1;
        }
        self.update_selected_date_from_slot();
        self.ensure_selected_slot_visible(visible_slots);
    }

    /// Step through the untimed list of the selected day, clamped to `count` items.
    pub fn move_untimed(&mut self, delta: i64, count: usize) {
        if count == 0 {
            self.focus = Focus::Timed;
            self.untimed_index = 0;
            return;
        }
        self.focus = Focus::Untimed;
        let index = (self.untimed_index as i64 + delta).clamp(0, count as i64 - 1);
        self.untimed_index = index as usize;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Timed => Focus::Untimed,
            Focus::Untimed => Focus::Timed,
        };
        self.untimed_index = 0;
    }

    pub fn next_day(&mut self) {
        self.shift_days(1);
    }

    pub fn prev_day(&mut self) {
        self.shift_days(-1);
    }

    pub fn next_week(&mut self) {
        self.shift_days(7);
    }

    pub fn prev_week(&mut self) {
        self.shift_days(-7);
    }

    pub fn next_month(&mut self) {
        if let Some(date) = self.reference_date.checked_add_months(Months::new(1)) {
            self.reference_date = date;
            self.untimed_index = 0;
        }
    }

    pub fn prev_month(&mut self) {
        if let Some(date) = self.reference_date.checked_sub_months(Months::new(1)) {
            self.reference_date = date;
            self.untimed_index = 0;
        }
    }

    fn shift_days(&mut self, days: i64) {
        self.reference_date += Duration::days(days);
        self.untimed_index = 0;
    }

    /// Jump to `date`, keeping the time of day.
    pub fn goto_date(&mut self, date: NaiveDate) {
        self.update_selected_date_from_slot();
        self.reference_date = date;
        self.untimed_index = 0;
    }

    pub fn goto_now(&mut self, now: NaiveDateTime, visible_slots: i64) {
        self.reference_date = now.date();
        self.selected_slot = slot::time_to_slot(now.time(), self.increment);
        self.focus = Focus::Timed;
        self.untimed_index = 0;
        self.center_on_selected(visible_slots);
    }

    /// Change the increment, keeping the displayed time at the cursor.
    pub fn set_increment(&mut self, increment: Increment, visible_slots: i64) {
        if increment == self.increment {
            return;
        }
        let old = self.increment;
        let (day, hour, minute) = slot::slot_to_coords(self.selected_slot, old);

        self.selected_slot = slot::coords_to_slot(day, hour, minute, increment);
        self.top_slot = (self.top_slot * increment.slots_per_day()).div_euclid(old.slots_per_day());
        self.increment = increment;
        self.ensure_selected_slot_visible(visible_slots);
    }

    /// Slot containing `now`, relative to the reference date.
    pub fn current_time_slot(&self, now: NaiveDateTime) -> i64 {
        slot::global_slot(now.date(), now.time(), self.reference_date, self.increment)
    }

    /// Move the cursor along with the clock after a period of inactivity.
    ///
    /// Advances only when the selection sits on the slot just before the
    /// current one, on today. Returns whether the cursor moved.
    pub fn auto_advance(
        &mut self,
        now: NaiveDateTime,
        idle: Duration,
        threshold: Duration,
        visible_slots: i64,
    ) -> bool {
        if idle <= threshold {
            return false;
        }
        let current = self.current_time_slot(now);
        if self.selected_slot != current - 1 || self.selected_date() != now.date() {
            return false;
        }
        self.selected_slot = current;
        self.update_selected_date_from_slot();
        self.ensure_selected_slot_visible(visible_slots);
        true
    }

    /// Select a timed slot on `date` and center the viewport on it.
    pub fn select_timed(&mut self, date: NaiveDate, time: NaiveTime, visible_slots: i64) {
        self.reference_date = date;
        self.selected_slot = slot::time_to_slot(time, self.increment);
        self.focus = Focus::Timed;
        self.untimed_index = 0;
        self.center_on_selected(visible_slots);
    }

    /// Select the `index`-th untimed event of `date`.
    pub fn select_untimed(&mut self, date: NaiveDate, index: usize) {
        self.update_selected_date_from_slot();
        self.reference_date = date;
        self.focus = Focus::Untimed;
        self.untimed_index = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn crossing_midnight_moves_the_reference_date() {
        let mut cursor = Cursor::new(d(2024, 3, 15), Increment::Sixty);
        cursor.selected_slot = 25;
        cursor.top_slot = 20;

        cursor.update_selected_date_from_slot();

        assert_eq!(cursor.reference_date, d(2024, 3, 16));
        assert_eq!(cursor.selected_slot, 1);
        assert_eq!(cursor.top_slot, -4);
    }

    #[test]
    fn crossing_backwards_moves_to_previous_day() {
        let mut cursor = Cursor::new(d(2024, 3, 15), Increment::Thirty);
        cursor.selected_slot = -1;
        cursor.top_slot = -1;

        cursor.update_selected_date_from_slot();

        assert_eq!(cursor.reference_date, d(2024, 3, 14));
        assert_eq!(cursor.selected_slot, 47);
        assert_eq!(cursor.top_slot, 47);
    }

    #[test]
    fn day_jumps_keep_time_of_day() {
        let mut cursor = Cursor::new(d(2024, 1, 31), Increment::Thirty);
        cursor.selected_slot = 19;
        cursor.top_slot = 12;

        cursor.next_day();
        assert_eq!(cursor.reference_date, d(2024, 2, 1));
        cursor.prev_week();
        assert_eq!(cursor.reference_date, d(2024, 1, 25));
        cursor.next_month();
        assert_eq!(cursor.reference_date, d(2024, 2, 25));
        assert_eq!((cursor.selected_slot, cursor.top_slot), (19, 12));
    }

    #[test]
    fn stepping_down_scrolls_by_one() {
        let mut cursor = Cursor::new(d(2024, 3, 15), Increment::Sixty);
        cursor.selected_slot = 9;
        cursor.top_slot = 2;

        cursor.move_down(8);
        assert_eq!((cursor.selected_slot, cursor.top_slot), (10, 3));
        cursor.move_up(8);
        assert_eq!((cursor.selected_slot, cursor.top_slot), (9, 3));
    }

    #[test]
    fn stepping_down_from_offscreen_brings_the_selection_back() {
        let mut cursor = Cursor::new(d(2024, 3, 15), Increment::Sixty);
        cursor.selected_slot = 14;
        cursor.top_slot = 2;

        cursor.move_down(8);
        assert_eq!(cursor.selected_slot, 15);
        assert_eq!(cursor.top_slot, 11);

        cursor.selected_slot = 0;
        cursor.top_slot = 6;
        cursor.move_down(8);
        assert_eq!((cursor.selected_slot, cursor.top_slot), (1, 1));
    }

    #[test]
    fn stepping_past_midnight_canonicalizes() {
        let mut cursor = Cursor::new(d(2024, 3, 15), Increment::Sixty);
        cursor.selected_slot = 23;
        cursor.top_slot = 16;

        cursor.move_down(8);

        assert_eq!(cursor.reference_date, d(2024, 3, 16));
        assert_eq!(cursor.selected_slot, 0);
        assert_eq!(cursor.top_slot, -7);
    }

    #[test]
    fn far_selection_recenters() {
        let mut cursor = Cursor::new(d(2024, 3, 15), Increment::Sixty);
        cursor.selected_slot = 30;
        cursor.ensure_selected_slot_visible(10);
        assert_eq!(cursor.top_slot, 25);

        cursor.selected_slot = 3;
        cursor.ensure_selected_slot_visible(10);
        assert_eq!(cursor.top_slot, 3);
    }

    #[test]
    fn zoom_keeps_displayed_time() {
        let mut cursor = Cursor::new(d(2024, 3, 15), Increment::Thirty);
        cursor.selected_slot = 19; // 09:30
        cursor.top_slot = 16;

        cursor.set_increment(Increment::Fifteen, 20);
        assert_eq!(cursor.selected_slot, 38);
        assert_eq!(cursor.top_slot, 32);
        assert_eq!(cursor.selected_time(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());

        cursor.set_increment(Increment::Sixty, 20);
        assert_eq!(cursor.selected_slot, 9);
        assert_eq!(cursor.top_slot, 8);
    }

    #[test]
    fn initial_position_never_scrolls_above_midnight() {
        let cursor = Cursor::at(at(d(2024, 3, 15), 2, 10), Increment::Sixty, 10);
        assert_eq!(cursor.selected_slot, 2);
        assert_eq!(cursor.top_slot, 0);

        let cursor = Cursor::at(at(d(2024, 3, 15), 14, 10), Increment::Sixty, 10);
        assert_eq!(cursor.top_slot, 9);
    }

    #[test]
    fn auto_advance_follows_the_clock_when_idle() {
        let today = d(2024, 3, 15);
        let mut cursor = Cursor::new(today, Increment::Thirty);
        cursor.selected_slot = 19; // 09:30
        cursor.top_slot = 12;
        let now = at(today, 10, 0);
        let threshold = Duration::minutes(5);

        assert!(!cursor.auto_advance(now, Duration::minutes(2), threshold, 16));
        assert_eq!(cursor.selected_slot, 19);

        assert!(cursor.auto_advance(now, Duration::minutes(6), threshold, 16));
        assert_eq!(cursor.selected_slot, 20);
    }

    #[test]
    fn auto_advance_moves_the_slot_while_the_sidebar_has_focus() {
        let today = d(2024, 3, 15);
        let mut cursor = Cursor::new(today, Increment::Thirty);
        cursor.selected_slot = 19;
        cursor.top_slot = 12;
        cursor.move_untimed(1, 2);
        assert_eq!(cursor.focus, Focus::Untimed);

        assert!(cursor.auto_advance(at(today, 10, 0), Duration::minutes(6), Duration::minutes(5), 16));
        assert_eq!(cursor.selected_slot, 20);
        assert_eq!(cursor.focus, Focus::Untimed);
    }

    #[test]
    fn auto_advance_ignores_other_slots_and_days() {
        let today = d(2024, 3, 15);
        let mut cursor = Cursor::new(today, Increment::Thirty);
        cursor.selected_slot = 15;
        let idle = Duration::minutes(10);
        let threshold = Duration::minutes(5);

        assert!(!cursor.auto_advance(at(today, 10, 0), idle, threshold, 16));

        cursor.reference_date = d(2024, 3, 14);
        cursor.selected_slot = 19;
        assert!(!cursor.auto_advance(at(today, 10, 0), idle, threshold, 16));
    }

    #[test]
    fn untimed_navigation_is_clamped() {
        let mut cursor = Cursor::new(d(2024, 3, 15), Increment::Sixty);
        cursor.move_untimed(1, 3);
        cursor.move_untimed(5, 3);
        assert_eq!(cursor.focus, Focus::Untimed);
        assert_eq!(cursor.untimed_index, 2);
        cursor.move_untimed(-9, 3);
        assert_eq!(cursor.untimed_index, 0);
        cursor.move_untimed(1, 0);
        assert_eq!(cursor.focus, Focus::Timed);
    }
}
