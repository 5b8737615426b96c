//! Global slot coordinates.
//!
//! Slot 0 is midnight of the reference date. Slots are signed so negative
//! values address earlier days. All day arithmetic uses floor (Euclidean)
//! division, so `-slots_per_day` is midnight of the previous day.

use chrono::{NaiveDate, NaiveTime, Timelike};

/// Width of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Increment {
    #[default]
    Sixty,
    Thirty,
    Fifteen,
}

impl Increment {
    pub const ALL: [Increment; 3] = [Increment::Sixty, Increment::Thirty, Increment::Fifteen];

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        match minutes {
            60 => Some(Increment::Sixty),
            30 => Some(Increment::Thirty),
            15 => Some(Increment::Fifteen),
            _ => None,
        }
    }

    pub fn minutes(self) -> i64 {
        match self {
            Increment::Sixty => 60,
            Increment::Thirty => 30,
            Increment::Fifteen => 15,
        }
    }

    pub fn slots_per_hour(self) -> i64 {
        60 / self.minutes()
    }

    /// 24, 48 or 96.
    pub fn slots_per_day(self) -> i64 {
        24 * self.slots_per_hour()
    }

    /// Next finer increment, if any.
    pub fn zoom_in(self) -> Self {
        match self {
            Increment::Sixty => Increment::Thirty,
            _ => Increment::Fifteen,
        }
    }

    /// Next coarser increment, if any.
    pub fn zoom_out(self) -> Self {
        match self {
            Increment::Fifteen => Increment::Thirty,
            _ => Increment::Sixty,
        }
    }
}

/// Day offset of a global slot relative to the reference date.
pub fn day_offset(slot: i64, increment: Increment) -> i64 {
    slot.div_euclid(increment.slots_per_day())
}

/// Slot within its day, always in `[0, slots_per_day)`.
pub fn local_slot(slot: i64, increment: Increment) -> i64 {
    slot.rem_euclid(increment.slots_per_day())
}

/// `(day_offset, hour, minute)` addressed by a global slot.
pub fn slot_to_coords(slot: i64, increment: Increment) -> (i64, u32, u32) {
    let local = local_slot(slot, increment);
    let per_hour = increment.slots_per_hour();
    let hour = (local / per_hour) as u32;
    let minute = ((local % per_hour) * increment.minutes()) as u32;
    (day_offset(slot, increment), hour, minute)
}

/// Global slot for `(day_offset, hour, minute)`; minutes are floored to the increment.
pub fn coords_to_slot(day_offset: i64, hour: u32, minute: u32, increment: Increment) -> i64 {
    day_offset * increment.slots_per_day()
        + i64::from(hour) * increment.slots_per_hour()
        + i64::from(minute) / increment.minutes()
}

/// Slot within the day containing `time`.
pub fn time_to_slot(time: NaiveTime, increment: Increment) -> i64 {
    coords_to_slot(0, time.hour(), time.minute(), increment)
}

/// Wall-clock time at the start of a global slot.
pub fn slot_time(slot: i64, increment: Increment) -> NaiveTime {
    let (_, hour, minute) = slot_to_coords(slot, increment);
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Civil date of a global slot.
pub fn slot_date(slot: i64, reference: NaiveDate, increment: Increment) -> NaiveDate {
    reference + chrono::Duration::days(day_offset(slot, increment))
}

/// Global slot of a date and time relative to `reference`.
pub fn global_slot(date: NaiveDate, time: NaiveTime, reference: NaiveDate, increment: Increment) -> i64 {
    (date - reference).num_days() * increment.slots_per_day() + time_to_slot(time, increment)
}

/// Number of slots a duration covers, rounded up. Missing or empty durations cover one slot.
pub fn span_slots(duration_minutes: Option<i64>, increment: Increment) -> i64 {
    match duration_minutes {
        Some(minutes) if minutes > 0 => (minutes + increment.minutes() - 1) / increment.minutes(),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_slots_belong_to_the_previous_day() {
        let inc = Increment::Sixty;
        assert_eq!(day_offset(-2, inc), -1);
        assert_eq!(local_slot(-2, inc), 22);
        assert_eq!(day_offset(-24, inc), -1);
        assert_eq!(local_slot(-24, inc), 0);
        assert_eq!(day_offset(-25, inc), -2);
    }

    #[test]
    fn coordinates_at_quarter_hours() {
        assert_eq!(slot_to_coords(37, Increment::Fifteen), (0, 9, 15));
        assert_eq!(slot_to_coords(19, Increment::Thirty), (0, 9, 30));
        assert_eq!(slot_to_coords(-1, Increment::Thirty), (-1, 23, 30));
    }

    #[test]
    fn minutes_floor_to_the_increment() {
        let time = NaiveTime::from_hms_opt(9, 50, 0).unwrap();
        assert_eq!(time_to_slot(time, Increment::Sixty), 9);
        assert_eq!(time_to_slot(time, Increment::Thirty), 19);
        assert_eq!(time_to_slot(time, Increment::Fifteen), 39);
    }

    #[test]
    fn spans_round_up() {
        assert_eq!(span_slots(Some(60), Increment::Thirty), 2);
        assert_eq!(span_slots(Some(61), Increment::Thirty), 3);
        assert_eq!(span_slots(Some(10), Increment::Sixty), 1);
        assert_eq!(span_slots(None, Increment::Fifteen), 1);
        assert_eq!(span_slots(Some(0), Increment::Fifteen), 1);
    }

    #[test]
    fn global_slot_counts_days_from_reference() {
        let reference = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let next = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();
        let time = NaiveTime::from_hms_opt(1, 0, 0).unwrap();
        assert_eq!(global_slot(next, time, reference, Increment::Sixty), 25);
        assert_eq!(slot_date(25, reference, Increment::Sixty), next);
    }
}
