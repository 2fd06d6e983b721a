//! Time routines: weekly operating hours with dated exceptions.
//!
//! Slots and exceptions are validated before anything is written. Invalid
//! definitions answer `422 Unprocessable Entity`; environments from another
//! workspace answer 400.

use chrono::NaiveDate;
use diesel::SqliteConnection;
use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use serde::Serialize;
use ts_rs::TS;

use crate::DbConn;
use crate::api::{ApiError, api_error, collection_denied, db_error, resource_denied};
use crate::logged_json::LoggedJson;
use crate::models::{
    ExceptionInput, RoutineException, TimeRoutine, TimeRoutineDetail, TimeRoutineInput,
};
use crate::orm::time_routine::{
    RoutineWriteError, add_exception, delete_exception, delete_time_routine, effective_hours_for,
    get_time_routine, get_time_routine_detail, insert_time_routine, list_time_routines,
    replace_time_routine,
};
use crate::routine_resolver::EffectiveHours;
use crate::session_guards::{Access, Actor, AuthenticatedUser, authorize};

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct EffectiveHoursResponse {
    pub routine_id: i32,
    pub open: bool,
    pub hours: EffectiveHours,
}

fn write_error(context: &str, e: RoutineWriteError) -> ApiError {
    match e {
        RoutineWriteError::Invalid(reason) => {
            api_error(Status::UnprocessableEntity, reason.to_string())
        }
        RoutineWriteError::ForeignEnvironment(env_id) => api_error(
            Status::BadRequest,
            format!("Environment {} does not belong to this workspace", env_id),
        ),
        RoutineWriteError::Database(e) => db_error(context, e),
    }
}

fn validated_name(input: &TimeRoutineInput) -> Result<(), ApiError> {
    if input.name.trim().is_empty() {
        return Err(api_error(Status::BadRequest, "Routine name must not be empty"));
    }
    Ok(())
}

fn load_authorized(
    conn: &mut SqliteConnection,
    actor: Actor,
    routine_id: i32,
    access: Access,
) -> Result<TimeRoutine, ApiError> {
    let routine = match get_time_routine(conn, routine_id) {
        Ok(Some(r)) => r,
        Ok(None) => return Err(api_error(Status::NotFound, "Not found")),
        Err(e) => return Err(db_error("loading time routine", e)),
    };
    authorize(conn, actor, routine.workspace_id, access).map_err(resource_denied)?;
    Ok(routine)
}

fn respond(conn: &mut SqliteConnection, routine_id: i32) -> Result<Json<TimeRoutineDetail>, ApiError> {
    match get_time_routine_detail(conn, routine_id) {
        Ok(Some(detail)) => Ok(Json(detail)),
        Ok(None) => Err(api_error(Status::NotFound, "Not found")),
        Err(e) => Err(db_error("loading time routine", e)),
    }
}

/// - **URL:** `/api/1/Workspaces/<workspace_id>/TimeRoutines`
/// - **Method:** `POST`
///
/// ```json
/// {
///   "name": "Office hours",
///   "schedules": [
///     { "day_of_week": "monday", "slots": [{ "start_time": "08:00:00", "end_time": "18:00:00" }] }
///   ],
///   "environment_ids": [1],
///   "exceptions": [
///     { "exception_date": "12-25", "is_recurring": true, "exception_type": "closed" }
///   ]
/// }
/// ```
#[post("/1/Workspaces/<workspace_id>/TimeRoutines", data = "<input>")]
pub async fn create_time_routine(
    db: DbConn,
    workspace_id: i32,
    input: LoggedJson<TimeRoutineInput>,
    auth_user: AuthenticatedUser,
) -> Result<status::Created<Json<TimeRoutineDetail>>, ApiError> {
    let input = input.into_inner();
    validated_name(&input)?;

    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Write).map_err(collection_denied)?;
        let routine = insert_time_routine(conn, workspace_id, &input, Some(actor.user_id))
            .map_err(|e| write_error("creating time routine", e))?;
        let location = format!("/api/1/TimeRoutines/{}", routine.id);
        respond(conn, routine.id).map(|body| status::Created::new(location).body(body))
    })
    .await
}

#[get("/1/Workspaces/<workspace_id>/TimeRoutines")]
pub async fn list_time_routines_endpoint(
    db: DbConn,
    workspace_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<Vec<TimeRoutine>>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Read).map_err(collection_denied)?;
        list_time_routines(conn, workspace_id)
            .map(Json)
            .map_err(|e| db_error("listing time routines", e))
    })
    .await
}

#[get("/1/TimeRoutines/<routine_id>")]
pub async fn get_time_routine_endpoint(
    db: DbConn,
    routine_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<TimeRoutineDetail>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, routine_id, Access::Read)?;
        respond(conn, routine_id)
    })
    .await
}

/// Replaces the whole definition: slots, linked environments and
/// exceptions are rewritten from the body.
#[put("/1/TimeRoutines/<routine_id>", data = "<input>")]
pub async fn replace_time_routine_endpoint(
    db: DbConn,
    routine_id: i32,
    input: LoggedJson<TimeRoutineInput>,
    auth_user: AuthenticatedUser,
) -> Result<Json<TimeRoutineDetail>, ApiError> {
    let input = input.into_inner();
    validated_name(&input)?;

    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, routine_id, Access::Write)?;
        replace_time_routine(conn, routine_id, &input, Some(actor.user_id))
            .map_err(|e| write_error("updating time routine", e))?;
        respond(conn, routine_id)
    })
    .await
}

#[delete("/1/TimeRoutines/<routine_id>")]
pub async fn delete_time_routine_endpoint(
    db: DbConn,
    routine_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Status, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, routine_id, Access::Write)?;
        match delete_time_routine(conn, routine_id, Some(actor.user_id)) {
            Ok(0) => Err(api_error(Status::NotFound, "Not found")),
            Ok(_) => Ok(Status::NoContent),
            Err(e) => Err(db_error("deleting time routine", e)),
        }
    })
    .await
}

/// - **URL:** `/api/1/TimeRoutines/<routine_id>/Exceptions`
/// - **Method:** `POST`
///
/// ```json
/// {
///   "exception_date": "2025-12-24",
///   "exception_type": "custom_hours",
///   "custom_start_time": "09:00:00",
///   "custom_end_time": "13:00:00",
///   "description": "Christmas Eve"
/// }
/// ```
#[post("/1/TimeRoutines/<routine_id>/Exceptions", data = "<input>")]
pub async fn add_exception_endpoint(
    db: DbConn,
    routine_id: i32,
    input: LoggedJson<ExceptionInput>,
    auth_user: AuthenticatedUser,
) -> Result<status::Created<Json<RoutineException>>, ApiError> {
    let input = input.into_inner();
    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, routine_id, Access::Write)?;
        let exception = add_exception(conn, routine_id, &input, Some(actor.user_id))
            .map_err(|e| write_error("adding exception", e))?;
        let location = format!("/api/1/TimeRoutines/{}", routine_id);
        Ok(status::Created::new(location).body(Json(exception)))
    })
    .await
}

#[delete("/1/TimeRoutines/<routine_id>/Exceptions/<exception_id>")]
pub async fn delete_exception_endpoint(
    db: DbConn,
    routine_id: i32,
    exception_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Status, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, routine_id, Access::Write)?;
        match delete_exception(conn, routine_id, exception_id, Some(actor.user_id)) {
            Ok(0) => Err(api_error(Status::NotFound, "Exception not found")),
            Ok(_) => Ok(Status::NoContent),
            Err(e) => Err(db_error("deleting exception", e)),
        }
    })
    .await
}

/// - **URL:** `/api/1/TimeRoutines/<routine_id>/EffectiveHours?date=2025-12-24`
/// - **Method:** `GET`
///
/// Hours that apply on the date after exceptions are taken into account.
/// `date` defaults to today (UTC).
///
/// ```json
/// {
///   "routine_id": 1,
///   "open": true,
///   "hours": {
///     "date": "2025-12-24",
///     "slots": [{ "start": "09:00:00", "end": "13:00:00" }],
///     "source": { "kind": "exception", "exception_id": 4 }
///   }
/// }
/// ```
#[get("/1/TimeRoutines/<routine_id>/EffectiveHours?<date>")]
pub async fn effective_hours_endpoint(
    db: DbConn,
    routine_id: i32,
    date: Option<String>,
    auth_user: AuthenticatedUser,
) -> Result<Json<EffectiveHoursResponse>, ApiError> {
    let date = match date.as_deref() {
        Some(raw) => raw
            .parse::<NaiveDate>()
            .map_err(|_| api_error(Status::BadRequest, "date must look like 2025-06-04"))?,
        None => chrono::Utc::now().date_naive(),
    };

    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, routine_id, Access::Read)?;
        effective_hours_for(conn, routine_id, date)
            .map(|hours| Json(EffectiveHoursResponse { routine_id, open: !hours.is_closed(), hours }))
            .map_err(|e| db_error("resolving effective hours", e))
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        create_time_routine,
        list_time_routines_endpoint,
        get_time_routine_endpoint,
        replace_time_routine_endpoint,
        delete_time_routine_endpoint,
        add_exception_endpoint,
        delete_exception_endpoint,
        effective_hours_endpoint
    ]
}
