use diesel::prelude::*;

use crate::models::{Alert, NewAlert, Severity};
use crate::orm::db::last_insert_rowid;

pub fn insert_alert(
    conn: &mut SqliteConnection,
    ws_id: i32,
    equipment: Option<i32>,
    level: Severity,
    text: &str,
) -> Result<Alert, diesel::result::Error> {
    use crate::schema::alerts::dsl::*;

    let new_alert = NewAlert {
        workspace_id: ws_id,
        equipment_id: equipment,
        severity: level.as_str().to_string(),
        message: text.to_string(),
        is_read: false,
        created_at: chrono::Utc::now().naive_utc(),
    };

    diesel::insert_into(alerts).values(&new_alert).execute(conn)?;
    let alert_id = last_insert_rowid(conn)?;
    alerts.find(alert_id).select(Alert::as_select()).first(conn)
}

pub fn get_alert(
    conn: &mut SqliteConnection,
    alert_id: i32,
) -> Result<Option<Alert>, diesel::result::Error> {
    use crate::schema::alerts::dsl::*;
    alerts.find(alert_id).select(Alert::as_select()).first(conn).optional()
}

/// Alerts of a workspace, newest first.
pub fn list_alerts(
    conn: &mut SqliteConnection,
    ws_id: i32,
    unread_only: bool,
) -> Result<Vec<Alert>, diesel::result::Error> {
    use crate::schema::alerts::dsl::*;

    let mut query = alerts.filter(workspace_id.eq(ws_id)).into_boxed();
    if unread_only {
        query = query.filter(is_read.eq(false));
    }
    query
        .order((created_at.desc(), id.desc()))
        .select(Alert::as_select())
        .load(conn)
}

pub fn mark_alert_read(
    conn: &mut SqliteConnection,
    alert_id: i32,
) -> Result<Alert, diesel::result::Error> {
    use crate::schema::alerts::dsl::*;

    let updated = diesel::update(alerts.find(alert_id)).set(is_read.eq(true)).execute(conn)?;
    if updated == 0 {
        return Err(diesel::result::Error::NotFound);
    }
    alerts.find(alert_id).select(Alert::as_select()).first(conn)
}
