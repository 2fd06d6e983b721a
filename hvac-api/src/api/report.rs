//! Consumption estimates and the energy/expense report.

use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::DbConn;
use crate::api::equipment::load_authorized;
use crate::api::{ApiError, api_error, collection_denied, db_error, parse_instant};
use crate::logged_json::LoggedJson;
use crate::models::{EnergyReading, EnergyReadingInput, EnergyReport};
use crate::orm::energy::{energy_report, insert_reading};
use crate::session_guards::{Access, AuthenticatedUser, authorize};

/// - **URL:** `/api/1/Equipments/<equipment_id>/EnergyReadings`
/// - **Method:** `POST`
///
/// ```json
/// { "recorded_at": "2025-06-04T12:00:00", "consumption_kwh": 1.25 }
/// ```
#[post("/1/Equipments/<equipment_id>/EnergyReadings", data = "<input>")]
pub async fn record_reading(
    db: DbConn,
    equipment_id: i32,
    input: LoggedJson<EnergyReadingInput>,
    auth_user: AuthenticatedUser,
) -> Result<status::Created<Json<EnergyReading>>, ApiError> {
    let input = input.into_inner();
    if !input.consumption_kwh.is_finite() || input.consumption_kwh < 0.0 {
        return Err(api_error(Status::BadRequest, "consumption_kwh must be a non-negative number"));
    }
    let recorded_at = input.recorded_at.unwrap_or_else(|| chrono::Utc::now().naive_utc());

    let actor = auth_user.actor();
    db.run(move |conn| {
        load_authorized(conn, actor, equipment_id, Access::Write)?;
        let reading = insert_reading(conn, equipment_id, recorded_at, input.consumption_kwh)
            .map_err(|e| db_error("recording energy reading", e))?;
        let location = format!("/api/1/Equipments/{}", equipment_id);
        Ok(status::Created::new(location).body(Json(reading)))
    })
    .await
}

/// - **URL:** `/api/1/Workspaces/<workspace_id>/EnergyReport?from=..&to=..&tariff=0.25`
/// - **Method:** `GET`
///
/// Readings are summed over `[from, to)`. `tariff` is the price per kWh and
/// defaults to 0. Every unit of the workspace gets a line, even without
/// readings.
#[get("/1/Workspaces/<workspace_id>/EnergyReport?<from>&<to>&<tariff>")]
pub async fn energy_report_endpoint(
    db: DbConn,
    workspace_id: i32,
    from: Option<String>,
    to: Option<String>,
    tariff: Option<f64>,
    auth_user: AuthenticatedUser,
) -> Result<Json<EnergyReport>, ApiError> {
    let from = parse_instant("from", from.as_deref())?
        .ok_or_else(|| api_error(Status::BadRequest, "from is required"))?;
    let to = parse_instant("to", to.as_deref())?
        .ok_or_else(|| api_error(Status::BadRequest, "to is required"))?;
    if from >= to {
        return Err(api_error(Status::BadRequest, "from must be before to"));
    }
    let tariff = tariff.unwrap_or(0.0);
    if !tariff.is_finite() || tariff < 0.0 {
        return Err(api_error(Status::BadRequest, "tariff must be a non-negative number"));
    }

    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Read).map_err(collection_denied)?;
        energy_report(conn, workspace_id, from, to, tariff)
            .map(Json)
            .map_err(|e| db_error("building energy report", e))
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![record_reading, energy_report_endpoint]
}
