//! Time routines: weekly schedules, linked environments and exceptions.
//!
//! A routine and all of its child rows are always written in one
//! transaction, so a rejected slot or exception leaves nothing behind.

use chrono::{NaiveDate, Weekday};
use diesel::prelude::*;
use thiserror::Error;

use crate::models::{
    DaySchedule, ExceptionInput, NewRoutineSchedule, NewTimeRoutine, RoutineEnvironment,
    RoutineException, RoutineSchedule, TimeRoutine, TimeRoutineDetail, TimeRoutineInput,
};
use crate::orm::db::{enforce_foreign_keys, last_insert_rowid};
use crate::orm::entity_activity::{get_timestamps, update_latest_activity_user};
use crate::orm::environment::filter_workspace_environments;
use crate::routine_resolver::{
    EffectiveHours, ScheduleError, ScheduleException, TimeSlot, WeeklySchedule, effective_hours,
    parse_weekday, weekday_name,
};

#[derive(Debug, Error)]
pub enum RoutineWriteError {
    #[error(transparent)]
    Invalid(#[from] ScheduleError),
    #[error("environment {0} does not belong to this workspace")]
    ForeignEnvironment(i32),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Validated weekly slots, as (day name, slot) pairs ready to insert.
fn validated_slots(input: &TimeRoutineInput) -> Result<Vec<(String, TimeSlot)>, ScheduleError> {
    let mut slots = Vec::new();
    for day in &input.schedules {
        let weekday = parse_weekday(&day.day_of_week)?;
        for slot in &day.slots {
            let slot = TimeSlot::new(slot.start_time, slot.end_time)?;
            slots.push((weekday_name(weekday).to_string(), slot));
        }
    }
    Ok(slots)
}

fn check_environments(
    conn: &mut SqliteConnection,
    ws_id: i32,
    environment_ids: &[i32],
) -> Result<(), RoutineWriteError> {
    let owned = filter_workspace_environments(conn, ws_id, environment_ids)?;
    match environment_ids.iter().find(|e| !owned.contains(e)) {
        Some(foreign) => Err(RoutineWriteError::ForeignEnvironment(*foreign)),
        None => Ok(()),
    }
}

/// Inserts schedules, environment links and exceptions for a routine.
fn write_children(
    conn: &mut SqliteConnection,
    routine: i32,
    input: &TimeRoutineInput,
) -> Result<(), RoutineWriteError> {
    use crate::schema::{routine_environments, routine_exceptions, routine_schedules};

    let schedules: Vec<NewRoutineSchedule> = validated_slots(input)?
        .into_iter()
        .map(|(day, slot)| NewRoutineSchedule {
            routine_id: routine,
            day_of_week: day,
            start_time: slot.start,
            end_time: slot.end,
        })
        .collect();
    if !schedules.is_empty() {
        diesel::insert_into(routine_schedules::table).values(&schedules).execute(conn)?;
    }

    let mut environment_ids = input.environment_ids.clone();
    environment_ids.sort_unstable();
    environment_ids.dedup();
    let links: Vec<RoutineEnvironment> = environment_ids
        .into_iter()
        .map(|environment_id| RoutineEnvironment { routine_id: routine, environment_id })
        .collect();
    if !links.is_empty() {
        diesel::insert_into(routine_environments::table).values(&links).execute(conn)?;
    }

    for exception in &input.exceptions {
        let row = exception.validate(routine)?;
        diesel::insert_into(routine_exceptions::table).values(&row).execute(conn)?;
    }

    Ok(())
}

/// Creates a routine with all its child rows.
pub fn insert_time_routine(
    conn: &mut SqliteConnection,
    ws_id: i32,
    input: &TimeRoutineInput,
    acting_user_id: Option<i32>,
) -> Result<TimeRoutine, RoutineWriteError> {
    use crate::schema::time_routines::dsl::*;

    conn.transaction(|conn| {
        check_environments(conn, ws_id, &input.environment_ids)?;

        let new_routine = NewTimeRoutine {
            workspace_id: ws_id,
            name: input.name.trim().to_string(),
            is_active: input.is_active.unwrap_or(true),
        };
        diesel::insert_into(time_routines).values(&new_routine).execute(conn)?;
        let routine_id = last_insert_rowid(conn)?;

        write_children(conn, routine_id, input)?;

        if let Some(user_id) = acting_user_id {
            update_latest_activity_user(conn, "time_routines", routine_id, "create", user_id)?;
        }

        Ok(time_routines.find(routine_id).select(TimeRoutine::as_select()).first(conn)?)
    })
}

/// Replaces a routine's name, state, schedules, links and exceptions.
pub fn replace_time_routine(
    conn: &mut SqliteConnection,
    routine_id: i32,
    input: &TimeRoutineInput,
    acting_user_id: Option<i32>,
) -> Result<TimeRoutine, RoutineWriteError> {
    use crate::schema::time_routines::dsl::*;
    use crate::schema::{routine_environments, routine_exceptions, routine_schedules};

    conn.transaction(|conn| {
        let current = time_routines.find(routine_id).select(TimeRoutine::as_select()).first(conn)?;
        check_environments(conn, current.workspace_id, &input.environment_ids)?;

        diesel::update(time_routines.find(routine_id))
            .set((
                name.eq(input.name.trim()),
                is_active.eq(input.is_active.unwrap_or(current.is_active)),
            ))
            .execute(conn)?;

        diesel::delete(routine_schedules::table.filter(routine_schedules::routine_id.eq(routine_id)))
            .execute(conn)?;
        diesel::delete(
            routine_environments::table.filter(routine_environments::routine_id.eq(routine_id)),
        )
        .execute(conn)?;
        diesel::delete(
            routine_exceptions::table.filter(routine_exceptions::routine_id.eq(routine_id)),
        )
        .execute(conn)?;

        write_children(conn, routine_id, input)?;

        if let Some(user_id) = acting_user_id {
            update_latest_activity_user(conn, "time_routines", routine_id, "update", user_id)?;
        }

        Ok(time_routines.find(routine_id).select(TimeRoutine::as_select()).first(conn)?)
    })
}

pub fn get_time_routine(
    conn: &mut SqliteConnection,
    routine_id: i32,
) -> Result<Option<TimeRoutine>, diesel::result::Error> {
    use crate::schema::time_routines::dsl::*;
    time_routines.find(routine_id).select(TimeRoutine::as_select()).first(conn).optional()
}

pub fn list_time_routines(
    conn: &mut SqliteConnection,
    ws_id: i32,
) -> Result<Vec<TimeRoutine>, diesel::result::Error> {
    use crate::schema::time_routines::dsl::*;
    time_routines
        .filter(workspace_id.eq(ws_id))
        .order(id.asc())
        .select(TimeRoutine::as_select())
        .load(conn)
}

fn load_schedules(
    conn: &mut SqliteConnection,
    routine: i32,
) -> Result<Vec<RoutineSchedule>, diesel::result::Error> {
    use crate::schema::routine_schedules::dsl::*;
    routine_schedules
        .filter(routine_id.eq(routine))
        .order((start_time.asc(), id.asc()))
        .select(RoutineSchedule::as_select())
        .load(conn)
}

pub fn list_exceptions(
    conn: &mut SqliteConnection,
    routine: i32,
) -> Result<Vec<RoutineException>, diesel::result::Error> {
    use crate::schema::routine_exceptions::dsl::*;
    routine_exceptions
        .filter(routine_id.eq(routine))
        .order(id.asc())
        .select(RoutineException::as_select())
        .load(conn)
}

pub fn get_routine_environment_ids(
    conn: &mut SqliteConnection,
    routine: i32,
) -> Result<Vec<i32>, diesel::result::Error> {
    use crate::schema::routine_environments::dsl::*;
    routine_environments
        .filter(routine_id.eq(routine))
        .order(environment_id.asc())
        .select(environment_id)
        .load(conn)
}

/// Groups stored slots by weekday, Monday first, earliest slot first.
fn group_by_day(rows: Vec<RoutineSchedule>) -> Vec<DaySchedule> {
    WEEK.iter()
        .filter_map(|day| {
            let label = weekday_name(*day);
            let slots: Vec<TimeSlot> = rows
                .iter()
                .filter(|r| r.day_of_week == label)
                .map(|r| TimeSlot { start: r.start_time, end: r.end_time })
                .collect();
            if slots.is_empty() {
                None
            } else {
                Some(DaySchedule { day_of_week: label.to_string(), slots })
            }
        })
        .collect()
}

pub fn get_time_routine_detail(
    conn: &mut SqliteConnection,
    routine_id: i32,
) -> Result<Option<TimeRoutineDetail>, diesel::result::Error> {
    let routine = match get_time_routine(conn, routine_id)? {
        Some(r) => r,
        None => return Ok(None),
    };
    let schedules = group_by_day(load_schedules(conn, routine_id)?);
    let environment_ids = get_routine_environment_ids(conn, routine_id)?;
    let exceptions = list_exceptions(conn, routine_id)?;
    let (created_at, updated_at) = get_timestamps(conn, "time_routines", routine_id)?;

    Ok(Some(TimeRoutineDetail {
        id: routine.id,
        workspace_id: routine.workspace_id,
        name: routine.name,
        is_active: routine.is_active,
        schedules,
        environment_ids,
        exceptions,
        created_at,
        updated_at,
    }))
}

pub fn add_exception(
    conn: &mut SqliteConnection,
    routine: i32,
    input: &ExceptionInput,
    acting_user_id: Option<i32>,
) -> Result<RoutineException, RoutineWriteError> {
    use crate::schema::routine_exceptions::dsl::*;

    let row = input.validate(routine)?;
    conn.transaction(|conn| {
        diesel::insert_into(routine_exceptions).values(&row).execute(conn)?;
        let exception_id = last_insert_rowid(conn)?;

        if let Some(user_id) = acting_user_id {
            // An exception change is an update of its routine.
            touch_routine(conn, routine, user_id)?;
        }

        Ok(routine_exceptions
            .find(exception_id)
            .select(RoutineException::as_select())
            .first(conn)?)
    })
}

pub fn delete_exception(
    conn: &mut SqliteConnection,
    routine: i32,
    exception_id: i32,
    acting_user_id: Option<i32>,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::routine_exceptions::dsl::*;

    conn.transaction(|conn| {
        let deleted = diesel::delete(
            routine_exceptions.filter(id.eq(exception_id)).filter(routine_id.eq(routine)),
        )
        .execute(conn)?;

        if deleted > 0 {
            if let Some(user_id) = acting_user_id {
                touch_routine(conn, routine, user_id)?;
            }
        }

        Ok(deleted)
    })
}

/// Records an update of the routine attributed to `user_id`.
fn touch_routine(
    conn: &mut SqliteConnection,
    routine: i32,
    user_id: i32,
) -> Result<(), diesel::result::Error> {
    use crate::schema::time_routines::dsl::*;

    // Rewriting the name fires the update trigger without changing data.
    diesel::update(time_routines.find(routine)).set(name.eq(name)).execute(conn)?;
    update_latest_activity_user(conn, "time_routines", routine, "update", user_id)?;
    Ok(())
}

pub fn delete_time_routine(
    conn: &mut SqliteConnection,
    routine_id: i32,
    acting_user_id: Option<i32>,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::time_routines::dsl::*;

    enforce_foreign_keys(conn)?;
    let deleted = diesel::delete(time_routines.find(routine_id)).execute(conn)?;

    if deleted > 0 {
        if let Some(user_id) = acting_user_id {
            update_latest_activity_user(conn, "time_routines", routine_id, "delete", user_id)?;
        }
    }

    Ok(deleted)
}

/// Loads a routine's weekly schedule and exceptions in resolver form.
///
/// Stored rows that no longer parse are skipped with a warning.
pub fn load_calendar(
    conn: &mut SqliteConnection,
    routine: i32,
) -> Result<(WeeklySchedule, Vec<ScheduleException>), diesel::result::Error> {
    let mut schedule = WeeklySchedule::new();
    for row in load_schedules(conn, routine)? {
        let parsed = parse_weekday(&row.day_of_week)
            .and_then(|day| TimeSlot::new(row.start_time, row.end_time).map(|slot| (day, slot)));
        match parsed {
            Ok((day, slot)) => schedule.add_slot(day, slot),
            Err(e) => warn!("Skipping schedule row {} of routine {}: {}", row.id, routine, e),
        }
    }

    let mut exceptions = Vec::new();
    for row in list_exceptions(conn, routine)? {
        match row.to_schedule_exception() {
            Ok(exception) => exceptions.push(exception),
            Err(e) => warn!("Skipping exception {} of routine {}: {}", row.id, routine, e),
        }
    }

    Ok((schedule, exceptions))
}

pub fn effective_hours_for(
    conn: &mut SqliteConnection,
    routine: i32,
    date: NaiveDate,
) -> Result<EffectiveHours, diesel::result::Error> {
    let (schedule, exceptions) = load_calendar(conn, routine)?;
    Ok(effective_hours(date, &schedule, &exceptions))
}

/// Active routines that constrain the environment.
pub fn active_routines_for_environment(
    conn: &mut SqliteConnection,
    env_id: i32,
) -> Result<Vec<TimeRoutine>, diesel::result::Error> {
    use crate::schema::{routine_environments, time_routines};

    time_routines::table
        .inner_join(routine_environments::table)
        .filter(routine_environments::environment_id.eq(env_id))
        .filter(time_routines::is_active.eq(true))
        .order(time_routines::id.asc())
        .select(TimeRoutine::as_select())
        .load(conn)
}
