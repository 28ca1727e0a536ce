//! Weekly time slots and overlap detection.
//!
//! Lessons repeat weekly on a single day. Two slots conflict when they share
//! a day and their half-open `[start, end)` intervals intersect, so a lesson
//! ending at 11:00 does not conflict with one starting at 11:00.

use std::fmt;

use chrono::NaiveTime;

use crate::entities::Schedule;
use crate::enums::DayOfWeek;
use crate::errors::CoreError;

const TIME_FORMAT: &str = "%H:%M";

/// A parsed weekly meeting slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub day: DayOfWeek,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    /// Build a slot, rejecting empty or inverted intervals.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if `end <= start`.
    pub fn new(day: DayOfWeek, start: NaiveTime, end: NaiveTime) -> Result<Self, CoreError> {
        if end <= start {
            return Err(CoreError::Validation(format!(
                "lesson end time {} must be after start time {}",
                end.format(TIME_FORMAT),
                start.format(TIME_FORMAT)
            )));
        }
        Ok(Self { day, start, end })
    }

    /// Parse a lesson schedule.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if either time is not `HH:MM` or the
    /// interval is empty.
    pub fn from_schedule(schedule: &Schedule) -> Result<Self, CoreError> {
        let start = parse_time(&schedule.start_time)?;
        let end = parse_time(&schedule.end_time)?;
        Self::new(schedule.day_of_week, start, end)
    }

    /// Same day and `start1 < end2 && start2 < end1`.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.day == other.day && self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.day,
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT)
        )
    }
}

/// Parse a wall-clock `HH:MM` time.
///
/// # Errors
///
/// Returns `CoreError::Validation` if the string is not a valid time.
pub fn parse_time(s: &str) -> Result<NaiveTime, CoreError> {
    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
        .map_err(|e| CoreError::Validation(format!("invalid lesson time '{s}': {e}")))
}
