//! Environments: groups of equipment sharing comfort setpoints.
//!
//! Setpoint writes are validated by [`crate::comfort`]; a rejected change
//! leaves the stored setpoints untouched and answers
//! `422 Unprocessable Entity` with the reason.

use diesel::SqliteConnection;
use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::DbConn;
use crate::api::{
    ApiError, api_error, collection_denied, db_error, parse_instant, resource_denied,
};
use crate::automation::{ControlDecision, ControlInputs, ControlService};
use crate::comfort::{HvacDemand, SetpointChange, SetpointRejection};
use crate::logged_json::LoggedJson;
use crate::models::{
    Environment, EnvironmentInput, EnvironmentWithTimestamps, NewEnvironment, SetpointsInput,
    UpdateEnvironmentRequest,
};
use crate::orm::environment::{
    SetpointWriteError, adjust_setpoints as adjust_setpoints_orm, delete_environment,
    get_environment, insert_environment, list_environments, update_environment, update_setpoints,
    with_timestamps,
};
use crate::orm::equipment::filter_workspace_equipment;
use crate::session_guards::{Access, Actor, AuthenticatedUser, authorize};

fn rejected(reason: SetpointRejection) -> ApiError {
    api_error(Status::UnprocessableEntity, reason.to_string())
}

/// Loads an environment the actor may access; non-members get 404.
fn load_authorized(
    conn: &mut SqliteConnection,
    actor: Actor,
    environment_id: i32,
    access: Access,
) -> Result<Environment, ApiError> {
    let environment = match get_environment(conn, environment_id) {
        Ok(Some(env)) => env,
        Ok(None) => return Err(api_error(Status::NotFound, "Not found")),
        Err(e) => return Err(db_error("loading environment", e)),
    };
    authorize(conn, actor, environment.workspace_id, access).map_err(resource_denied)?;
    Ok(environment)
}

/// Rejects equipment ids from other workspaces (or that do not exist).
fn check_equipment(conn: &mut SqliteConnection, ws_id: i32, ids: &[i32]) -> Result<(), ApiError> {
    let owned = filter_workspace_equipment(conn, ws_id, ids)
        .map_err(|e| db_error("checking equipment", e))?;
    match ids.iter().find(|id| !owned.contains(id)) {
        Some(foreign) => Err(api_error(
            Status::BadRequest,
            format!("Equipment {} does not belong to this workspace", foreign),
        )),
        None => Ok(()),
    }
}

fn respond(conn: &mut SqliteConnection, environment: Environment) -> Result<Json<EnvironmentWithTimestamps>, ApiError> {
    with_timestamps(conn, environment).map(Json).map_err(|e| db_error("loading environment", e))
}

/// - **URL:** `/api/1/Workspaces/<workspace_id>/Environments`
/// - **Method:** `POST`
/// - **Authorization:** workspace owner or admin
///
/// ```json
/// {
///   "name": "Meeting room",
///   "equipment_ids": [3, 4],
///   "automatic": true,
///   "setpoints": {
///     "cooling_enabled": true, "heating_enabled": false,
///     "cool_trigger_temp": 26, "cool_target_temp": 24,
///     "heat_trigger_temp": 18, "heat_target_temp": 20
///   }
/// }
/// ```
#[post("/1/Workspaces/<workspace_id>/Environments", data = "<input>")]
pub async fn create_environment(
    db: DbConn,
    workspace_id: i32,
    input: LoggedJson<EnvironmentInput>,
    auth_user: AuthenticatedUser,
) -> Result<status::Created<Json<EnvironmentWithTimestamps>>, ApiError> {
    let input = input.into_inner();
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(api_error(Status::BadRequest, "Environment name must not be empty"));
    }
    let bands = input.setpoints.unwrap_or_default();
    bands.validate().map_err(rejected)?;

    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Write).map_err(collection_denied)?;
        check_equipment(conn, workspace_id, &input.equipment_ids)?;

        let new_environment =
            NewEnvironment::new(workspace_id, name, input.automatic.unwrap_or(false), bands);
        let environment =
            insert_environment(conn, new_environment, &input.equipment_ids, Some(actor.user_id))
                .map_err(|e| db_error("creating environment", e))?;
        let location = format!("/api/1/Environments/{}", environment.id);
        respond(conn, environment).map(|body| status::Created::new(location).body(body))
    })
    .await
}

#[get("/1/Workspaces/<workspace_id>/Environments")]
pub async fn list_environments_endpoint(
    db: DbConn,
    workspace_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<Vec<EnvironmentWithTimestamps>>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Read).map_err(collection_denied)?;
        let environments =
            list_environments(conn, workspace_id).map_err(|e| db_error("listing environments", e))?;
        environments
            .into_iter()
            .map(|env| with_timestamps(conn, env))
            .collect::<Result<Vec<_>, _>>()
            .map(Json)
            .map_err(|e| db_error("listing environments", e))
    })
    .await
}

#[get("/1/Environments/<environment_id>")]
pub async fn get_environment_endpoint(
    db: DbConn,
    environment_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<EnvironmentWithTimestamps>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        let environment = load_authorized(conn, actor, environment_id, Access::Read)?;
        respond(conn, environment)
    })
    .await
}

/// Updates the name, the equipment set and/or the automatic flag. Omitted
/// fields keep their value; `equipment_ids` replaces the whole set.
#[put("/1/Environments/<environment_id>", data = "<input>")]
pub async fn update_environment_endpoint(
    db: DbConn,
    environment_id: i32,
    input: LoggedJson<UpdateEnvironmentRequest>,
    auth_user: AuthenticatedUser,
) -> Result<Json<EnvironmentWithTimestamps>, ApiError> {
    let input = input.into_inner();
    let name = input.name.map(|n| n.trim().to_string());
    if name.as_deref() == Some("") {
        return Err(api_error(Status::BadRequest, "Environment name must not be empty"));
    }

    let actor = auth_user.actor();
    db.run(move |conn| {
        let current = load_authorized(conn, actor, environment_id, Access::Write)?;
        if let Some(ids) = &input.equipment_ids {
            check_equipment(conn, current.workspace_id, ids)?;
        }
        let environment = update_environment(
            conn,
            environment_id,
            name,
            input.equipment_ids,
            input.automatic,
            Some(actor.user_id),
        )
        .map_err(|e| db_error("updating environment", e))?;
        respond(conn, environment)
    })
    .await
}

#[delete("/1/Environments/<environment_id>")]
pub async fn delete_environment_endpoint(
    db: DbConn,
    environment_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Status, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, environment_id, Access::Write)?;
        match delete_environment(conn, environment_id, Some(actor.user_id)) {
            Ok(0) => Err(api_error(Status::NotFound, "Not found")),
            Ok(_) => Ok(Status::NoContent),
            Err(e) => Err(db_error("deleting environment", e)),
        }
    })
    .await
}

/// - **URL:** `/api/1/Environments/<environment_id>/Setpoints`
/// - **Method:** `PUT`
///
/// Replaces all setpoints at once. The whole set must satisfy the comfort
/// invariants.
///
/// ```json
/// {
///   "automatic": true,
///   "cooling_enabled": true, "heating_enabled": true,
///   "cool_trigger_temp": 26, "cool_target_temp": 24,
///   "heat_trigger_temp": 18, "heat_target_temp": 20
/// }
/// ```
#[put("/1/Environments/<environment_id>/Setpoints", data = "<input>")]
pub async fn replace_setpoints(
    db: DbConn,
    environment_id: i32,
    input: LoggedJson<SetpointsInput>,
    auth_user: AuthenticatedUser,
) -> Result<Json<EnvironmentWithTimestamps>, ApiError> {
    let input = input.into_inner();
    input.bands.validate().map_err(rejected)?;

    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, environment_id, Access::Write)?;
        let environment =
            update_setpoints(conn, environment_id, input.automatic, input.bands, Some(actor.user_id))
                .map_err(|e| db_error("updating setpoints", e))?;
        respond(conn, environment)
    })
    .await
}

/// - **URL:** `/api/1/Environments/<environment_id>/Setpoints/adjust`
/// - **Method:** `POST`
///
/// Applies one control change, e.g. `{"change": "cool_target", "value": 23}`
/// or `{"change": "cooling_enabled", "value": true}`. Enabling a band may
/// move the other band's values out of the way.
#[post("/1/Environments/<environment_id>/Setpoints/adjust", data = "<change>")]
pub async fn adjust_setpoints(
    db: DbConn,
    environment_id: i32,
    change: LoggedJson<SetpointChange>,
    auth_user: AuthenticatedUser,
) -> Result<Json<EnvironmentWithTimestamps>, ApiError> {
    let change = change.into_inner();
    let actor = auth_user.actor();

    db.run(move |conn| {
        load_authorized(conn, actor, environment_id, Access::Write)?;
        let environment = match adjust_setpoints_orm(conn, environment_id, change, Some(actor.user_id)) {
            Ok(env) => env,
            Err(SetpointWriteError::Rejected(reason)) => return Err(rejected(reason)),
            Err(SetpointWriteError::Database(diesel::result::Error::NotFound)) => {
                return Err(api_error(Status::NotFound, "Not found"));
            }
            Err(SetpointWriteError::Database(e)) => return Err(db_error("updating setpoints", e)),
        };
        respond(conn, environment)
    })
    .await
}

/// - **URL:** `/api/1/Environments/<environment_id>/ControlState`
/// - **Method:** `GET`
///
/// Evaluates what the environment should be doing. All query parameters are
/// optional: `at` (defaults to now, UTC), `temperature`, `last_presence`,
/// `vacated_at` and `demand` (`idle`, `cooling` or `heating`). Nothing is
/// written.
#[get("/1/Environments/<environment_id>/ControlState?<at>&<temperature>&<last_presence>&<vacated_at>&<demand>")]
pub async fn control_state(
    db: DbConn,
    environment_id: i32,
    at: Option<String>,
    temperature: Option<f64>,
    last_presence: Option<String>,
    vacated_at: Option<String>,
    demand: Option<String>,
    auth_user: AuthenticatedUser,
) -> Result<Json<ControlDecision>, ApiError> {
    let at = parse_instant("at", at.as_deref())?.unwrap_or_else(|| chrono::Utc::now().naive_utc());
    let inputs = ControlInputs {
        temperature,
        last_presence: parse_instant("last_presence", last_presence.as_deref())?,
        vacated_at: parse_instant("vacated_at", vacated_at.as_deref())?,
        current_demand: match demand.as_deref() {
            Some(raw) => raw.parse::<HvacDemand>().map_err(|e| api_error(Status::BadRequest, e))?,
            None => HvacDemand::Idle,
        },
    };

    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, environment_id, Access::Read)?;
        match ControlService::new().get_control_state(conn, environment_id, at, &inputs) {
            Ok(Some(decision)) => Ok(Json(decision)),
            Ok(None) => Err(api_error(Status::NotFound, "Not found")),
            Err(e) => Err(db_error("evaluating control state", e)),
        }
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        create_environment,
        list_environments_endpoint,
        get_environment_endpoint,
        update_environment_endpoint,
        delete_environment_endpoint,
        replace_setpoints,
        adjust_setpoints,
        control_state
    ]
}
