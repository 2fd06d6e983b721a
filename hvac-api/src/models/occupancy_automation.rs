use chrono::NaiveDateTime;
use diesel::{
    AsChangeset, Associations, Identifiable, Insertable, Queryable, QueryableByName, Selectable,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::{occupancy_automation_environments, occupancy_automations};

pub const MIN_INACTIVITY_TIMEOUT: i32 = 1;
pub const MAX_INACTIVITY_TIMEOUT: i32 = 1440;

/// Turns environments off after a period without detected presence.
#[derive(
    Queryable,
    Selectable,
    Identifiable,
    Associations,
    QueryableByName,
    Debug,
    Clone,
    Serialize,
    Deserialize,
    TS,
)]
#[diesel(belongs_to(crate::models::workspace::Workspace))]
#[diesel(table_name = occupancy_automations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct OccupancyAutomation {
    pub id: i32,
    pub workspace_id: i32,
    pub name: String,
    pub inactivity_timeout_minutes: i32,
    pub reactivate_on_presence: bool,
    pub respect_time_routines: bool,
    pub is_active: bool,
}

#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = occupancy_automations)]
pub struct NewOccupancyAutomation {
    pub workspace_id: i32,
    pub name: String,
    pub inactivity_timeout_minutes: i32,
    pub reactivate_on_presence: bool,
    pub respect_time_routines: bool,
    pub is_active: bool,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy)]
#[diesel(table_name = occupancy_automation_environments)]
pub struct OccupancyAutomationEnvironment {
    pub automation_id: i32,
    pub environment_id: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct OccupancyAutomationInput {
    pub name: String,
    pub inactivity_timeout_minutes: i32,
    pub reactivate_on_presence: Option<bool>,
    pub respect_time_routines: Option<bool>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub environment_ids: Vec<i32>,
}

impl OccupancyAutomationInput {
    pub fn timeout_is_valid(&self) -> bool {
        (MIN_INACTIVITY_TIMEOUT..=MAX_INACTIVITY_TIMEOUT).contains(&self.inactivity_timeout_minutes)
    }

    pub fn to_new(&self, workspace_id: i32) -> NewOccupancyAutomation {
        NewOccupancyAutomation {
            workspace_id,
            name: self.name.clone(),
            inactivity_timeout_minutes: self.inactivity_timeout_minutes,
            reactivate_on_presence: self.reactivate_on_presence.unwrap_or(true),
            respect_time_routines: self.respect_time_routines.unwrap_or(true),
            is_active: self.is_active.unwrap_or(true),
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct OccupancyAutomationDetail {
    pub id: i32,
    pub workspace_id: i32,
    pub name: String,
    pub inactivity_timeout_minutes: i32,
    pub reactivate_on_presence: bool,
    pub respect_time_routines: bool,
    pub is_active: bool,
    pub environment_ids: Vec<i32>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}
