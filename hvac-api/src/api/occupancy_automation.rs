//! Occupancy automations: turn environments off when nobody is around.

use diesel::SqliteConnection;
use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::DbConn;
use crate::api::{ApiError, api_error, collection_denied, db_error, resource_denied};
use crate::logged_json::LoggedJson;
use crate::models::{
    MAX_INACTIVITY_TIMEOUT, MIN_INACTIVITY_TIMEOUT, OccupancyAutomation, OccupancyAutomationDetail,
    OccupancyAutomationInput,
};
use crate::orm::environment::filter_workspace_environments;
use crate::orm::occupancy_automation::{
    delete_occupancy_automation, get_occupancy_automation, get_occupancy_automation_detail,
    insert_occupancy_automation, list_occupancy_automations, replace_occupancy_automation,
};
use crate::session_guards::{Access, Actor, AuthenticatedUser, authorize};

fn validate_input(input: &OccupancyAutomationInput) -> Result<(), ApiError> {
    if input.name.trim().is_empty() {
        return Err(api_error(Status::BadRequest, "Automation name must not be empty"));
    }
    if !input.timeout_is_valid() {
        return Err(api_error(
            Status::BadRequest,
            format!(
                "inactivity_timeout_minutes must be between {} and {}",
                MIN_INACTIVITY_TIMEOUT, MAX_INACTIVITY_TIMEOUT
            ),
        ));
    }
    Ok(())
}

fn check_environments(conn: &mut SqliteConnection, ws_id: i32, ids: &[i32]) -> Result<(), ApiError> {
    let owned = filter_workspace_environments(conn, ws_id, ids)
        .map_err(|e| db_error("checking environments", e))?;
    match ids.iter().find(|id| !owned.contains(id)) {
        Some(foreign) => Err(api_error(
            Status::BadRequest,
            format!("Environment {} does not belong to this workspace", foreign),
        )),
        None => Ok(()),
    }
}

fn load_authorized(
    conn: &mut SqliteConnection,
    actor: Actor,
    automation_id: i32,
    access: Access,
) -> Result<OccupancyAutomation, ApiError> {
    let automation = match get_occupancy_automation(conn, automation_id) {
        Ok(Some(a)) => a,
        Ok(None) => return Err(api_error(Status::NotFound, "Not found")),
        Err(e) => return Err(db_error("loading automation", e)),
    };
    authorize(conn, actor, automation.workspace_id, access).map_err(resource_denied)?;
    Ok(automation)
}

fn respond(
    conn: &mut SqliteConnection,
    automation_id: i32,
) -> Result<Json<OccupancyAutomationDetail>, ApiError> {
    match get_occupancy_automation_detail(conn, automation_id) {
        Ok(Some(detail)) => Ok(Json(detail)),
        Ok(None) => Err(api_error(Status::NotFound, "Not found")),
        Err(e) => Err(db_error("loading automation", e)),
    }
}

/// - **URL:** `/api/1/Workspaces/<workspace_id>/OccupancyAutomations`
/// - **Method:** `POST`
///
/// ```json
/// {
///   "name": "Meeting rooms",
///   "inactivity_timeout_minutes": 15,
///   "reactivate_on_presence": true,
///   "respect_time_routines": true,
///   "environment_ids": [1, 2]
/// }
/// ```
///
/// The three flags default to `true` when omitted.
#[post("/1/Workspaces/<workspace_id>/OccupancyAutomations", data = "<input>")]
pub async fn create_occupancy_automation(
    db: DbConn,
    workspace_id: i32,
    input: LoggedJson<OccupancyAutomationInput>,
    auth_user: AuthenticatedUser,
) -> Result<status::Created<Json<OccupancyAutomationDetail>>, ApiError> {
    let input = input.into_inner();
    validate_input(&input)?;

    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Write).map_err(collection_denied)?;
        check_environments(conn, workspace_id, &input.environment_ids)?;
        let automation =
            insert_occupancy_automation(conn, workspace_id, &input, Some(actor.user_id))
                .map_err(|e| db_error("creating automation", e))?;
        let location = format!("/api/1/OccupancyAutomations/{}", automation.id);
        respond(conn, automation.id).map(|body| status::Created::new(location).body(body))
    })
    .await
}

#[get("/1/Workspaces/<workspace_id>/OccupancyAutomations")]
pub async fn list_occupancy_automations_endpoint(
    db: DbConn,
    workspace_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<Vec<OccupancyAutomation>>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Read).map_err(collection_denied)?;
        list_occupancy_automations(conn, workspace_id)
            .map(Json)
            .map_err(|e| db_error("listing automations", e))
    })
    .await
}

#[get("/1/OccupancyAutomations/<automation_id>")]
pub async fn get_occupancy_automation_endpoint(
    db: DbConn,
    automation_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<OccupancyAutomationDetail>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, automation_id, Access::Read)?;
        respond(conn, automation_id)
    })
    .await
}

#[put("/1/OccupancyAutomations/<automation_id>", data = "<input>")]
pub async fn replace_occupancy_automation_endpoint(
    db: DbConn,
    automation_id: i32,
    input: LoggedJson<OccupancyAutomationInput>,
    auth_user: AuthenticatedUser,
) -> Result<Json<OccupancyAutomationDetail>, ApiError> {
    let input = input.into_inner();
    validate_input(&input)?;

    let actor = auth_user.actor();
    db.run(move |conn| {
        let current = load_authorized(conn, actor, automation_id, Access::Write)?;
        check_environments(conn, current.workspace_id, &input.environment_ids)?;
        replace_occupancy_automation(conn, automation_id, &input, Some(actor.user_id))
            .map_err(|e| db_error("updating automation", e))?;
        respond(conn, automation_id)
    })
    .await
}

#[delete("/1/OccupancyAutomations/<automation_id>")]
pub async fn delete_occupancy_automation_endpoint(
    db: DbConn,
    automation_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Status, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, automation_id, Access::Write)?;
        match delete_occupancy_automation(conn, automation_id, Some(actor.user_id)) {
            Ok(0) => Err(api_error(Status::NotFound, "Not found")),
            Ok(_) => Ok(Status::NoContent),
            Err(e) => Err(db_error("deleting automation", e)),
        }
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        create_occupancy_automation,
        list_occupancy_automations_endpoint,
        get_occupancy_automation_endpoint,
        replace_occupancy_automation_endpoint,
        delete_occupancy_automation_endpoint
    ]
}
