use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::energy_readings;

/// Estimated consumption of one unit over the period ending at
/// `recorded_at`.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, TS)]
#[diesel(belongs_to(crate::models::equipment::Equipment))]
#[diesel(table_name = energy_readings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct EnergyReading {
    pub id: i32,
    pub equipment_id: i32,
    #[ts(type = "string")]
    pub recorded_at: NaiveDateTime,
    pub consumption_kwh: f64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = energy_readings)]
pub struct NewEnergyReading {
    pub equipment_id: i32,
    pub recorded_at: NaiveDateTime,
    pub consumption_kwh: f64,
}

#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct EnergyReadingInput {
    /// Defaults to the time the reading is received.
    #[ts(type = "string | null")]
    pub recorded_at: Option<NaiveDateTime>,
    pub consumption_kwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct EnergyReportLine {
    pub equipment_id: i32,
    pub equipment_name: String,
    pub consumption_kwh: f64,
    pub expense: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct EnergyReport {
    pub workspace_id: i32,
    #[ts(type = "string")]
    pub from: NaiveDateTime,
    #[ts(type = "string")]
    pub to: NaiveDateTime,
    pub tariff: f64,
    pub lines: Vec<EnergyReportLine>,
    pub total_kwh: f64,
    pub total_expense: f64,
}
