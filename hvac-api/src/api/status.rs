//! Health check with build information.

use diesel::connection::SimpleConnection;
use rocket::{Route, serde::json::Json};
use serde::Serialize;
use ts_rs::TS;

use crate::DbConn;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct HealthStatus {
    status: &'static str,
    database: &'static str,
    version: &'static str,
    built: &'static str,
    git_commit: Option<&'static str>,
}

/// - **URL:** `/api/1/status`
/// - **Method:** `GET`
/// - **Authentication:** None
///
/// ```json
/// {
///   "status": "running",
///   "database": "ok",
///   "version": "0.1.0",
///   "built": "Mon, 06 Oct 2025 09:12:01 +0000",
///   "git_commit": null
/// }
/// ```
#[get("/1/status")]
pub async fn health_status(db: DbConn) -> Json<HealthStatus> {
    let database = match db.run(|conn| conn.batch_execute("SELECT 1")).await {
        Ok(()) => "ok",
        Err(e) => {
            warn!("Health check could not reach the database: {}", e);
            "unavailable"
        }
    };

    Json(HealthStatus {
        status: "running",
        database,
        version: env!("CARGO_PKG_VERSION"),
        built: built_info::BUILT_TIME_UTC,
        git_commit: built_info::GIT_COMMIT_HASH,
    })
}

pub fn routes() -> Vec<Route> {
    routes![health_status]
}
