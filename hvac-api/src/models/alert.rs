use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::alerts;

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, TS)]
#[diesel(belongs_to(crate::models::workspace::Workspace))]
#[diesel(table_name = alerts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Alert {
    pub id: i32,
    pub workspace_id: i32,
    pub equipment_id: Option<i32>,
    pub severity: String,
    pub message: String,
    pub is_read: bool,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = alerts)]
pub struct NewAlert {
    pub workspace_id: i32,
    pub equipment_id: Option<i32>,
    pub severity: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("Invalid severity: {}", s)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct AlertInput {
    pub equipment_id: Option<i32>,
    pub severity: String,
    pub message: String,
}
