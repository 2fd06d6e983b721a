use chrono::{NaiveDateTime, NaiveTime};
use diesel::{Associations, Identifiable, Insertable, Queryable, QueryableByName, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::routine_resolver::{
    ExceptionDate, ExceptionKind, ScheduleError, ScheduleException, TimeSlot,
};
use crate::schema::{routine_environments, routine_exceptions, routine_schedules, time_routines};

#[derive(
    Queryable,
    Selectable,
    Identifiable,
    Associations,
    QueryableByName,
    Debug,
    Clone,
    Serialize,
    Deserialize,
    TS,
)]
#[diesel(belongs_to(crate::models::workspace::Workspace))]
#[diesel(table_name = time_routines)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct TimeRoutine {
    pub id: i32,
    pub workspace_id: i32,
    pub name: String,
    pub is_active: bool,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = time_routines)]
pub struct NewTimeRoutine {
    pub workspace_id: i32,
    pub name: String,
    pub is_active: bool,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, TS)]
#[diesel(belongs_to(TimeRoutine, foreign_key = routine_id))]
#[diesel(table_name = routine_schedules)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct RoutineSchedule {
    pub id: i32,
    pub routine_id: i32,
    pub day_of_week: String,
    #[ts(type = "string")]
    pub start_time: NaiveTime,
    #[ts(type = "string")]
    pub end_time: NaiveTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = routine_schedules)]
pub struct NewRoutineSchedule {
    pub routine_id: i32,
    pub day_of_week: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy)]
#[diesel(table_name = routine_environments)]
pub struct RoutineEnvironment {
    pub routine_id: i32,
    pub environment_id: i32,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, TS)]
#[diesel(belongs_to(TimeRoutine, foreign_key = routine_id))]
#[diesel(table_name = routine_exceptions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct RoutineException {
    pub id: i32,
    pub routine_id: i32,
    pub exception_date: String,
    pub is_recurring: bool,
    pub exception_type: String,
    #[ts(type = "string | null")]
    pub custom_start_time: Option<NaiveTime>,
    #[ts(type = "string | null")]
    pub custom_end_time: Option<NaiveTime>,
    pub description: Option<String>,
}

impl RoutineException {
    /// Converts the stored row into the form the resolver works with.
    pub fn to_schedule_exception(&self) -> Result<ScheduleException, ScheduleError> {
        Ok(ScheduleException {
            id: self.id,
            date: ExceptionDate::parse(&self.exception_date, self.is_recurring)?,
            kind: ExceptionKind::from_parts(
                &self.exception_type,
                self.custom_start_time,
                self.custom_end_time,
            )?,
        })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = routine_exceptions)]
pub struct NewRoutineException {
    pub routine_id: i32,
    pub exception_date: String,
    pub is_recurring: bool,
    pub exception_type: String,
    pub custom_start_time: Option<NaiveTime>,
    pub custom_end_time: Option<NaiveTime>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct SlotInput {
    #[ts(type = "string")]
    pub start_time: NaiveTime,
    #[ts(type = "string")]
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct DayScheduleInput {
    pub day_of_week: String,
    pub slots: Vec<SlotInput>,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct ExceptionInput {
    /// `YYYY-MM-DD`, or `MM-DD` for recurring exceptions.
    pub exception_date: String,
    #[serde(default)]
    pub is_recurring: bool,
    /// `closed` or `custom_hours`.
    pub exception_type: String,
    #[ts(type = "string | null")]
    pub custom_start_time: Option<NaiveTime>,
    #[ts(type = "string | null")]
    pub custom_end_time: Option<NaiveTime>,
    pub description: Option<String>,
}

impl ExceptionInput {
    /// Validates the exception and returns the row to insert.
    pub fn validate(&self, routine_id: i32) -> Result<NewRoutineException, ScheduleError> {
        let date = ExceptionDate::parse(&self.exception_date, self.is_recurring)?;
        let kind = ExceptionKind::from_parts(
            &self.exception_type,
            self.custom_start_time,
            self.custom_end_time,
        )?;
        let (custom_start_time, custom_end_time) = match kind {
            ExceptionKind::Closed => (None, None),
            ExceptionKind::CustomHours(slot) => (Some(slot.start), Some(slot.end)),
        };
        Ok(NewRoutineException {
            routine_id,
            // Stored normalized so recurring dates always read back as MM-DD.
            exception_date: date.to_string(),
            is_recurring: date.is_recurring(),
            exception_type: self.exception_type.clone(),
            custom_start_time,
            custom_end_time,
            description: self.description.clone(),
        })
    }
}

/// Full routine definition, used for both create and replace.
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct TimeRoutineInput {
    pub name: String,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub schedules: Vec<DayScheduleInput>,
    #[serde(default)]
    pub environment_ids: Vec<i32>,
    #[serde(default)]
    pub exceptions: Vec<ExceptionInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct DaySchedule {
    pub day_of_week: String,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct TimeRoutineDetail {
    pub id: i32,
    pub workspace_id: i32,
    pub name: String,
    pub is_active: bool,
    pub schedules: Vec<DaySchedule>,
    pub environment_ids: Vec<i32>,
    pub exceptions: Vec<RoutineException>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}
