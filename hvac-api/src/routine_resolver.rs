//! Weekly schedules overlaid with calendar exceptions.
//!
//! A time routine is a set of opening slots per weekday. Exceptions replace
//! the weekday slots for one date: either the location is closed all day or
//! it runs on a single custom slot. An exception is either one-off (a full
//! calendar date) or recurring every year on the same month and day.
//!
//! When several exceptions fall on the same date, a one-off exception beats a
//! recurring one, a `closed` exception beats `custom_hours` of the same kind,
//! and remaining ties go to the lowest exception id.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("slot start {start} must be before end {end}")]
    EmptySlot { start: NaiveTime, end: NaiveTime },
    #[error("invalid exception date '{0}', expected YYYY-MM-DD or MM-DD")]
    InvalidDate(String),
    #[error("a month-day exception date ('{0}') must be recurring")]
    MonthDayNotRecurring(String),
    #[error("custom_hours exceptions need both a start and an end time")]
    MissingCustomHours,
    #[error("invalid exception type '{0}'")]
    InvalidExceptionType(String),
    #[error("invalid day of week '{0}'")]
    InvalidWeekday(String),
}

/// A half-open opening window `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TimeSlot {
    #[ts(type = "string")]
    pub start: NaiveTime,
    #[ts(type = "string")]
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ScheduleError> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(ScheduleError::EmptySlot { start, end })
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }
}

/// Sorts slots by start and merges overlapping or touching ones.
pub fn merge_slots(mut slots: Vec<TimeSlot>) -> Vec<TimeSlot> {
    slots.sort();
    let mut merged: Vec<TimeSlot> = Vec::with_capacity(slots.len());
    for slot in slots {
        match merged.last_mut() {
            Some(last) if slot.start <= last.end => {
                if slot.end > last.end {
                    last.end = slot.end;
                }
            }
            _ => merged.push(slot),
        }
    }
    merged
}

/// Parses a lowercase English weekday name as stored in `routine_schedules`.
pub fn parse_weekday(s: &str) -> Result<Weekday, ScheduleError> {
    match s.to_lowercase().as_str() {
        "monday" => Ok(Weekday::Mon),
        "tuesday" => Ok(Weekday::Tue),
        "wednesday" => Ok(Weekday::Wed),
        "thursday" => Ok(Weekday::Thu),
        "friday" => Ok(Weekday::Fri),
        "saturday" => Ok(Weekday::Sat),
        "sunday" => Ok(Weekday::Sun),
        _ => Err(ScheduleError::InvalidWeekday(s.to_string())),
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// When an exception applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionDate {
    On(NaiveDate),
    Annually { month: u32, day: u32 },
}

impl ExceptionDate {
    /// Interprets a stored date string. Recurring exceptions may be stored as
    /// `MM-DD` or as a full date whose year is ignored.
    pub fn parse(raw: &str, is_recurring: bool) -> Result<Self, ScheduleError> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Ok(if is_recurring {
                ExceptionDate::Annually { month: date.month(), day: date.day() }
            } else {
                ExceptionDate::On(date)
            });
        }

        let (month, day) = parse_month_day(raw)?;
        if !is_recurring {
            return Err(ScheduleError::MonthDayNotRecurring(raw.to_string()));
        }
        Ok(ExceptionDate::Annually { month, day })
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        match *self {
            ExceptionDate::On(d) => d == date,
            ExceptionDate::Annually { month, day } => date.month() == month && date.day() == day,
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, ExceptionDate::Annually { .. })
    }
}

impl fmt::Display for ExceptionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionDate::On(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            ExceptionDate::Annually { month, day } => write!(f, "{:02}-{:02}", month, day),
        }
    }
}

fn parse_month_day(raw: &str) -> Result<(u32, u32), ScheduleError> {
    let invalid = || ScheduleError::InvalidDate(raw.to_string());
    let (m, d) = raw.split_once('-').ok_or_else(invalid)?;
    if m.len() != 2 || d.len() != 2 {
        return Err(invalid());
    }
    let month: u32 = m.parse().map_err(|_| invalid())?;
    let day: u32 = d.parse().map_err(|_| invalid())?;
    // 2024 is a leap year, so 02-29 is accepted here.
    NaiveDate::from_ymd_opt(2024, month, day).ok_or_else(invalid)?;
    Ok((month, day))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    Closed,
    CustomHours(TimeSlot),
}

impl ExceptionKind {
    /// Builds the kind from its stored columns.
    pub fn from_parts(
        exception_type: &str,
        start: Option<NaiveTime>,
        end: Option<NaiveTime>,
    ) -> Result<Self, ScheduleError> {
        match exception_type {
            "closed" => Ok(ExceptionKind::Closed),
            "custom_hours" => match (start, end) {
                (Some(s), Some(e)) => Ok(ExceptionKind::CustomHours(TimeSlot::new(s, e)?)),
                _ => Err(ScheduleError::MissingCustomHours),
            },
            other => Err(ScheduleError::InvalidExceptionType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleException {
    pub id: i32,
    pub date: ExceptionDate,
    pub kind: ExceptionKind,
}

impl ScheduleException {
    // Lower sorts first: one-off before recurring, closed before custom hours.
    fn precedence(&self) -> (bool, bool, i32) {
        (
            self.date.is_recurring(),
            !matches!(self.kind, ExceptionKind::Closed),
            self.id,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklySchedule {
    days: HashMap<Weekday, Vec<TimeSlot>>,
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_slot(&mut self, day: Weekday, slot: TimeSlot) {
        self.days.entry(day).or_default().push(slot);
    }

    pub fn slots_for(&self, day: Weekday) -> &[TimeSlot] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "exception_id", rename_all = "snake_case")]
#[ts(export)]
pub enum HoursSource {
    Weekly,
    Exception(i32),
}

/// Resolved opening hours for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EffectiveHours {
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
    pub source: HoursSource,
}

impl EffectiveHours {
    pub fn is_closed(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.slots.iter().any(|s| s.contains(time))
    }
}

/// Picks the exception that governs `date`, if any.
pub fn matching_exception(
    date: NaiveDate,
    exceptions: &[ScheduleException],
) -> Option<&ScheduleException> {
    exceptions
        .iter()
        .filter(|e| e.date.matches(date))
        .min_by_key(|e| e.precedence())
}

pub fn effective_hours(
    date: NaiveDate,
    schedule: &WeeklySchedule,
    exceptions: &[ScheduleException],
) -> EffectiveHours {
    match matching_exception(date, exceptions) {
        Some(exception) => {
            let slots = match exception.kind {
                ExceptionKind::Closed => Vec::new(),
                ExceptionKind::CustomHours(slot) => vec![slot],
            };
            EffectiveHours { date, slots, source: HoursSource::Exception(exception.id) }
        }
        None => EffectiveHours {
            date,
            slots: merge_slots(schedule.slots_for(date.weekday()).to_vec()),
            source: HoursSource::Weekly,
        },
    }
}

pub fn is_open_at(
    at: NaiveDateTime,
    schedule: &WeeklySchedule,
    exceptions: &[ScheduleException],
) -> bool {
    effective_hours(at.date(), schedule, exceptions).contains(at.time())
}

impl FromStr for ExceptionKind {
    type Err = ScheduleError;

    /// Parses a bare `closed`; custom hours need their times, see
    /// [`ExceptionKind::from_parts`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExceptionKind::from_parts(s, None, None)
    }
}
