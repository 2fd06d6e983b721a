use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, QueryableByName, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::comfort::ComfortBands;
use crate::schema::{environment_equipments, environments};

/// A group of equipment controlled together, with its comfort setpoints.
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
#[diesel(table_name = environments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Environment {
    pub id: i32,
    pub workspace_id: i32,
    pub name: String,
    pub automatic: bool,
    pub cooling_enabled: bool,
    pub heating_enabled: bool,
    pub cool_trigger_temp: i32,
    pub cool_target_temp: i32,
    pub heat_trigger_temp: i32,
    pub heat_target_temp: i32,
}

impl Environment {
    pub fn bands(&self) -> ComfortBands {
        ComfortBands {
            cooling_enabled: self.cooling_enabled,
            heating_enabled: self.heating_enabled,
            cool_trigger_temp: self.cool_trigger_temp,
            cool_target_temp: self.cool_target_temp,
            heat_trigger_temp: self.heat_trigger_temp,
            heat_target_temp: self.heat_target_temp,
        }
    }

    /// Automatic control is on only when requested and at least one band is
    /// enabled.
    pub fn under_automatic_control(&self) -> bool {
        self.automatic && self.bands().is_automatic()
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = environments)]
pub struct NewEnvironment {
    pub workspace_id: i32,
    pub name: String,
    pub automatic: bool,
    pub cooling_enabled: bool,
    pub heating_enabled: bool,
    pub cool_trigger_temp: i32,
    pub cool_target_temp: i32,
    pub heat_trigger_temp: i32,
    pub heat_target_temp: i32,
}

impl NewEnvironment {
    pub fn new(workspace_id: i32, name: String, automatic: bool, bands: ComfortBands) -> Self {
        Self {
            workspace_id,
            name,
            automatic,
            cooling_enabled: bands.cooling_enabled,
            heating_enabled: bands.heating_enabled,
            cool_trigger_temp: bands.cool_trigger_temp,
            cool_target_temp: bands.cool_target_temp,
            heat_trigger_temp: bands.heat_trigger_temp,
            heat_target_temp: bands.heat_target_temp,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy)]
#[diesel(table_name = environment_equipments)]
pub struct EnvironmentEquipment {
    pub environment_id: i32,
    pub equipment_id: i32,
}

// For API inputs and validation
#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct EnvironmentInput {
    pub name: String,
    #[serde(default)]
    pub equipment_ids: Vec<i32>,
    pub automatic: Option<bool>,
    /// Initial setpoints; defaults apply when omitted.
    pub setpoints: Option<ComfortBands>,
}

#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UpdateEnvironmentRequest {
    pub name: Option<String>,
    pub equipment_ids: Option<Vec<i32>>,
    pub automatic: Option<bool>,
}

/// Whole-object replacement of the setpoints.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct SetpointsInput {
    pub automatic: bool,
    #[serde(flatten)]
    pub bands: ComfortBands,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct EnvironmentWithTimestamps {
    pub id: i32,
    pub workspace_id: i32,
    pub name: String,
    pub automatic: bool,
    pub setpoints: ComfortBands,
    pub equipment_ids: Vec<i32>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}
