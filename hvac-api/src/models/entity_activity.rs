use crate::schema::entity_activity;
use chrono::NaiveDateTime;
use diesel::{Identifiable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One row written by the activity triggers for every insert, update or
/// delete on a tracked table.
#[derive(Queryable, Identifiable, QueryableByName, Debug, Serialize, Deserialize, TS)]
#[diesel(table_name = entity_activity)]
#[ts(export)]
pub struct EntityActivity {
    pub id: i32,
    pub table_name: String,
    pub entity_id: i32,
    pub operation_type: String, // 'create', 'update', 'delete'
    #[ts(type = "string")]
    pub timestamp: NaiveDateTime,
    pub user_id: Option<i32>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ActivityLogEntry {
    pub operation_type: String,
    #[ts(type = "string")]
    pub timestamp: NaiveDateTime,
    pub user_id: Option<i32>,
}

impl From<EntityActivity> for ActivityLogEntry {
    fn from(activity: EntityActivity) -> Self {
        ActivityLogEntry {
            operation_type: activity.operation_type,
            timestamp: activity.timestamp,
            user_id: activity.user_id,
        }
    }
}
