//! Equipment: individual HVAC units of a workspace.

use diesel::SqliteConnection;
use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::DbConn;
use crate::api::{ApiError, api_error, collection_denied, db_error, resource_denied};
use crate::logged_json::LoggedJson;
use crate::models::{
    Equipment, EquipmentControl, EquipmentInput, EquipmentWithTimestamps, UpdateEquipmentRequest,
};
use crate::orm::equipment::{
    control_equipment, delete_equipment, get_equipment, get_equipment_with_timestamps,
    insert_equipment, list_equipment, update_equipment, validate_equipment_fields,
};
use crate::session_guards::{Access, Actor, AuthenticatedUser, authorize};

/// Loads a unit the actor may access; non-members get 404.
pub(crate) fn load_authorized(
    conn: &mut SqliteConnection,
    actor: Actor,
    equipment_id: i32,
    access: Access,
) -> Result<Equipment, ApiError> {
    let equipment = match get_equipment(conn, equipment_id) {
        Ok(Some(eq)) => eq,
        Ok(None) => return Err(api_error(Status::NotFound, "Not found")),
        Err(e) => return Err(db_error("loading equipment", e)),
    };
    authorize(conn, actor, equipment.workspace_id, access).map_err(resource_denied)?;
    Ok(equipment)
}

fn respond(conn: &mut SqliteConnection, equipment_id: i32) -> Result<Json<EquipmentWithTimestamps>, ApiError> {
    match get_equipment_with_timestamps(conn, equipment_id) {
        Ok(Some(eq)) => Ok(Json(eq)),
        Ok(None) => Err(api_error(Status::NotFound, "Not found")),
        Err(e) => Err(db_error("loading equipment", e)),
    }
}

/// - **URL:** `/api/1/Workspaces/<workspace_id>/Equipments`
/// - **Method:** `POST`
///
/// ```json
/// { "name": "Split 1", "integration": "smartthings", "external_id": "a1b2", "mode": "cool" }
/// ```
///
/// Integrations other than `manual` require `external_id`.
#[post("/1/Workspaces/<workspace_id>/Equipments", data = "<input>")]
pub async fn create_equipment(
    db: DbConn,
    workspace_id: i32,
    input: LoggedJson<EquipmentInput>,
    auth_user: AuthenticatedUser,
) -> Result<status::Created<Json<EquipmentWithTimestamps>>, ApiError> {
    let input = input.into_inner();
    if input.name.trim().is_empty() {
        return Err(api_error(Status::BadRequest, "Equipment name must not be empty"));
    }
    validate_equipment_fields(
        input.integration.as_deref(),
        input.external_id.as_deref(),
        input.mode.as_deref(),
        input.target_temp,
    )
    .map_err(|e| api_error(Status::BadRequest, e))?;

    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Write).map_err(collection_denied)?;
        let equipment = insert_equipment(conn, workspace_id, &input, Some(actor.user_id))
            .map_err(|e| db_error("creating equipment", e))?;
        let location = format!("/api/1/Equipments/{}", equipment.id);
        respond(conn, equipment.id).map(|body| status::Created::new(location).body(body))
    })
    .await
}

#[get("/1/Workspaces/<workspace_id>/Equipments")]
pub async fn list_equipment_endpoint(
    db: DbConn,
    workspace_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<Vec<Equipment>>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Read).map_err(collection_denied)?;
        list_equipment(conn, workspace_id).map(Json).map_err(|e| db_error("listing equipment", e))
    })
    .await
}

#[get("/1/Equipments/<equipment_id>")]
pub async fn get_equipment_endpoint(
    db: DbConn,
    equipment_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<EquipmentWithTimestamps>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, equipment_id, Access::Read)?;
        respond(conn, equipment_id)
    })
    .await
}

/// Updates name, integration and external id. Switching to a vendor
/// integration still requires an external id, either given now or already
/// stored.
#[put("/1/Equipments/<equipment_id>", data = "<input>")]
pub async fn update_equipment_endpoint(
    db: DbConn,
    equipment_id: i32,
    input: LoggedJson<UpdateEquipmentRequest>,
    auth_user: AuthenticatedUser,
) -> Result<Json<EquipmentWithTimestamps>, ApiError> {
    let input = input.into_inner();
    if input.name.as_deref().map(|n| n.trim().is_empty()).unwrap_or(false) {
        return Err(api_error(Status::BadRequest, "Equipment name must not be empty"));
    }

    let actor = auth_user.actor();
    db.run(move |conn| {
        let current = load_authorized(conn, actor, equipment_id, Access::Write)?;
        let integration = input.integration.as_deref().unwrap_or(&current.integration);
        let external_id = input.external_id.as_deref().or(current.external_id.as_deref());
        validate_equipment_fields(Some(integration), external_id, None, None)
            .map_err(|e| api_error(Status::BadRequest, e))?;

        update_equipment(conn, equipment_id, &input, Some(actor.user_id))
            .map_err(|e| db_error("updating equipment", e))?;
        respond(conn, equipment_id)
    })
    .await
}

#[delete("/1/Equipments/<equipment_id>")]
pub async fn delete_equipment_endpoint(
    db: DbConn,
    equipment_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Status, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, equipment_id, Access::Write)?;
        match delete_equipment(conn, equipment_id, Some(actor.user_id)) {
            Ok(0) => Err(api_error(Status::NotFound, "Not found")),
            Ok(_) => Ok(Status::NoContent),
            Err(e) => Err(db_error("deleting equipment", e)),
        }
    })
    .await
}

/// - **URL:** `/api/1/Equipments/<equipment_id>/control`
/// - **Method:** `POST`
///
/// ```json
/// { "is_on": true, "mode": "heat", "target_temp": 21 }
/// ```
#[post("/1/Equipments/<equipment_id>/control", data = "<control>")]
pub async fn control_equipment_endpoint(
    db: DbConn,
    equipment_id: i32,
    control: LoggedJson<EquipmentControl>,
    auth_user: AuthenticatedUser,
) -> Result<Json<EquipmentWithTimestamps>, ApiError> {
    let control = control.into_inner();
    validate_equipment_fields(None, None, control.mode.as_deref(), control.target_temp)
        .map_err(|e| api_error(Status::BadRequest, e))?;

    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, equipment_id, Access::Write)?;
        control_equipment(conn, equipment_id, &control, Some(actor.user_id))
            .map_err(|e| db_error("controlling equipment", e))?;
        respond(conn, equipment_id)
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        create_equipment,
        list_equipment_endpoint,
        get_equipment_endpoint,
        update_equipment_endpoint,
        delete_equipment_endpoint,
        control_equipment_endpoint
    ]
}
