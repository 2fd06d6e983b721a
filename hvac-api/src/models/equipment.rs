use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, QueryableByName, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::equipments;

/// An air-conditioning unit registered in a workspace.
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
#[diesel(table_name = equipments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Equipment {
    pub id: i32,
    pub workspace_id: i32,
    pub name: String,
    pub is_on: bool,
    pub current_temp: Option<f64>,
    pub target_temp: i32,
    pub mode: String,
    pub integration: String,
    pub external_id: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = equipments)]
pub struct NewEquipment {
    pub workspace_id: i32,
    pub name: String,
    pub is_on: bool,
    pub current_temp: Option<f64>,
    pub target_temp: i32,
    pub mode: String,
    pub integration: String,
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum EquipmentMode {
    Cool,
    Heat,
    Auto,
    Fan,
}

impl EquipmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentMode::Cool => "cool",
            EquipmentMode::Heat => "heat",
            EquipmentMode::Auto => "auto",
            EquipmentMode::Fan => "fan",
        }
    }
}

impl std::str::FromStr for EquipmentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cool" => Ok(EquipmentMode::Cool),
            "heat" => Ok(EquipmentMode::Heat),
            "auto" => Ok(EquipmentMode::Auto),
            "fan" => Ok(EquipmentMode::Fan),
            _ => Err(format!("Invalid equipment mode: {}", s)),
        }
    }
}

/// How the unit is driven. Anything but `manual` is backed by an external
/// vendor service and needs that service's device id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Integration {
    Manual,
    Brise,
    Smart,
    Smartthings,
}

impl Integration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Integration::Manual => "manual",
            Integration::Brise => "brise",
            Integration::Smart => "smart",
            Integration::Smartthings => "smartthings",
        }
    }

    pub fn requires_external_id(&self) -> bool {
        !matches!(self, Integration::Manual)
    }
}

impl std::str::FromStr for Integration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Integration::Manual),
            "brise" => Ok(Integration::Brise),
            "smart" => Ok(Integration::Smart),
            "smartthings" => Ok(Integration::Smartthings),
            _ => Err(format!("Invalid integration: {}", s)),
        }
    }
}

// For API inputs and validation
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct EquipmentInput {
    pub name: String,
    pub integration: Option<String>,
    pub external_id: Option<String>,
    pub mode: Option<String>,
    pub target_temp: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UpdateEquipmentRequest {
    pub name: Option<String>,
    pub integration: Option<String>,
    pub external_id: Option<String>,
}

/// Runtime control of a unit: power, mode and target temperature, plus an
/// optional temperature reading reported by the unit.
#[derive(Debug, Clone, Default, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct EquipmentControl {
    pub is_on: Option<bool>,
    pub mode: Option<String>,
    pub target_temp: Option<i32>,
    pub current_temp: Option<f64>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct EquipmentWithTimestamps {
    pub id: i32,
    pub workspace_id: i32,
    pub name: String,
    pub is_on: bool,
    pub current_temp: Option<f64>,
    pub target_temp: i32,
    pub mode: String,
    pub integration: String,
    pub external_id: Option<String>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}
