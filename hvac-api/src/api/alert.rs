//! Workspace alerts about equipment or environments.

use rocket::http::Status;
use rocket::response::status;
use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::tokio::select;
use rocket::tokio::sync::broadcast::error::RecvError;
use rocket::{Route, Shutdown, State};

use crate::DbConn;
use crate::alert_feed::AlertFeed;
use crate::api::{ApiError, api_error, collection_denied, db_error, resource_denied};
use crate::logged_json::LoggedJson;
use crate::models::{Alert, AlertInput, Severity};
use crate::orm::alert::{get_alert, insert_alert, list_alerts, mark_alert_read};
use crate::orm::equipment::get_equipment;
use crate::session_guards::{Access, AuthenticatedUser, authorize};

/// - **URL:** `/api/1/Workspaces/<workspace_id>/Alerts`
/// - **Method:** `POST`
///
/// ```json
/// { "equipment_id": 3, "severity": "warning", "message": "Filter needs cleaning" }
/// ```
#[post("/1/Workspaces/<workspace_id>/Alerts", data = "<input>")]
pub async fn raise_alert(
    db: DbConn,
    workspace_id: i32,
    input: LoggedJson<AlertInput>,
    auth_user: AuthenticatedUser,
    feed: &State<AlertFeed>,
) -> Result<status::Created<Json<Alert>>, ApiError> {
    let input = input.into_inner();
    let severity = input
        .severity
        .parse::<Severity>()
        .map_err(|e| api_error(Status::BadRequest, e))?;
    let message = input.message.trim().to_string();
    if message.is_empty() {
        return Err(api_error(Status::BadRequest, "Alert message must not be empty"));
    }

    let actor = auth_user.actor();
    let alert = db
        .run(move |conn| {
            authorize(conn, actor, workspace_id, Access::Write).map_err(collection_denied)?;
            if let Some(equipment_id) = input.equipment_id {
                match get_equipment(conn, equipment_id) {
                    Ok(Some(eq)) if eq.workspace_id == workspace_id => {}
                    Ok(_) => {
                        return Err(api_error(
                            Status::BadRequest,
                            format!("Equipment {} does not belong to this workspace", equipment_id),
                        ));
                    }
                    Err(e) => return Err(db_error("loading equipment", e)),
                }
            }

            insert_alert(conn, workspace_id, input.equipment_id, severity, &message)
                .map_err(|e| db_error("raising alert", e))
        })
        .await?;

    let listeners = feed.publish(alert.clone());
    info!(
        "Alert {} ({}) raised in workspace {}, {} live listener(s)",
        alert.id, alert.severity, workspace_id, listeners
    );
    let location = format!("/api/1/Workspaces/{}/Alerts", workspace_id);
    Ok(status::Created::new(location).body(Json(alert)))
}

/// - **URL:** `/api/1/Workspaces/<workspace_id>/Alerts?unread=true`
/// - **Method:** `GET`
///
/// Newest first.
#[get("/1/Workspaces/<workspace_id>/Alerts?<unread>")]
pub async fn list_alerts_endpoint(
    db: DbConn,
    workspace_id: i32,
    unread: Option<bool>,
    auth_user: AuthenticatedUser,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Read).map_err(collection_denied)?;
        list_alerts(conn, workspace_id, unread.unwrap_or(false))
            .map(Json)
            .map_err(|e| db_error("listing alerts", e))
    })
    .await
}

/// - **URL:** `/api/1/Workspaces/<workspace_id>/Alerts/stream`
/// - **Method:** `GET`
///
/// Server-sent events, one `data:` frame per alert raised in the workspace
/// after the stream was opened. Ends when the server shuts down.
#[get("/1/Workspaces/<workspace_id>/Alerts/stream")]
pub async fn stream_alerts(
    db: DbConn,
    workspace_id: i32,
    auth_user: AuthenticatedUser,
    feed: &State<AlertFeed>,
    mut shutdown: Shutdown,
) -> Result<EventStream![], ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Read).map_err(collection_denied)
    })
    .await?;

    let mut rx = feed.subscribe();
    Ok(EventStream! {
        loop {
            let alert = select! {
                received = rx.recv() => match received {
                    Ok(alert) => alert,
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Alert stream for workspace {} skipped {} alert(s)", workspace_id, skipped);
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };
            if alert.workspace_id == workspace_id {
                yield Event::json(&alert);
            }
        }
    })
}

/// Any member may acknowledge an alert.
#[post("/1/Alerts/<alert_id>/read")]
pub async fn mark_alert_read_endpoint(
    db: DbConn,
    alert_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<Alert>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        let alert = match get_alert(conn, alert_id) {
            Ok(Some(a)) => a,
            Ok(None) => return Err(api_error(Status::NotFound, "Not found")),
            Err(e) => return Err(db_error("loading alert", e)),
        };
        authorize(conn, actor, alert.workspace_id, Access::Read).map_err(resource_denied)?;
        match mark_alert_read(conn, alert_id) {
            Ok(alert) => Ok(Json(alert)),
            Err(diesel::result::Error::NotFound) => Err(api_error(Status::NotFound, "Not found")),
            Err(e) => Err(db_error("marking alert read", e)),
        }
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![raise_alert, list_alerts_endpoint, stream_alerts, mark_alert_read_endpoint]
}
