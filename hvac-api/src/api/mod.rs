pub mod alert;
pub mod environment;
pub mod equipment;
pub mod login;
pub mod occupancy_automation;
pub mod report;
pub mod status;
pub mod time_routine;
pub mod workspace;

use chrono::NaiveDateTime;
use rocket::Route;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Serialize;
use ts_rs::TS;

use crate::session_guards::AccessDenied;

/// Body of every handled API error.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = Custom<Json<ErrorResponse>>;

pub fn api_error(code: Status, message: impl Into<String>) -> ApiError {
    Custom(code, Json(ErrorResponse { error: message.into() }))
}

/// Logs a database failure and hides its details from the client.
pub fn db_error(context: &str, e: diesel::result::Error) -> ApiError {
    error!("Database error while {}: {:?}", context, e);
    api_error(Status::InternalServerError, format!("Internal server error while {}", context))
}

/// Denied access to a single resource.
pub fn resource_denied(e: AccessDenied) -> ApiError {
    let code = e.resource_status();
    match e {
        AccessDenied::NotMember => api_error(code, "Not found"),
        AccessDenied::InsufficientRole => api_error(code, "Forbidden: insufficient workspace role"),
        AccessDenied::Database(e) => db_error("checking workspace access", e),
    }
}

/// Denied access to a workspace-scoped collection.
pub fn collection_denied(e: AccessDenied) -> ApiError {
    let code = e.collection_status();
    match e {
        AccessDenied::NotMember => api_error(code, "Forbidden: not a member of this workspace"),
        AccessDenied::InsufficientRole => api_error(code, "Forbidden: insufficient workspace role"),
        AccessDenied::Database(e) => db_error("checking workspace access", e),
    }
}

/// Parses an optional `YYYY-MM-DDTHH:MM:SS` query parameter.
pub fn parse_instant(field: &str, raw: Option<&str>) -> Result<Option<NaiveDateTime>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) => s.parse::<NaiveDateTime>().map(Some).map_err(|_| {
            api_error(
                Status::BadRequest,
                format!("{} must look like 2025-06-04T12:00:00", field),
            )
        }),
    }
}

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(alert::routes());
    routes.extend(environment::routes());
    routes.extend(equipment::routes());
    routes.extend(login::routes());
    routes.extend(occupancy_automation::routes());
    routes.extend(report::routes());
    routes.extend(status::routes());
    routes.extend(time_routine::routes());
    routes.extend(workspace::routes());
    routes
}
