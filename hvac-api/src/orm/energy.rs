//! Consumption estimates and the per-equipment expense report.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::dsl::sum;
use diesel::prelude::*;

use crate::models::{EnergyReading, EnergyReport, EnergyReportLine, NewEnergyReading};
use crate::orm::db::last_insert_rowid;

pub fn insert_reading(
    conn: &mut SqliteConnection,
    equipment: i32,
    at: NaiveDateTime,
    kwh: f64,
) -> Result<EnergyReading, diesel::result::Error> {
    use crate::schema::energy_readings::dsl::*;

    let reading = NewEnergyReading { equipment_id: equipment, recorded_at: at, consumption_kwh: kwh };
    diesel::insert_into(energy_readings).values(&reading).execute(conn)?;
    let reading_id = last_insert_rowid(conn)?;
    energy_readings.find(reading_id).select(EnergyReading::as_select()).first(conn)
}

/// Sums readings per equipment over `[from, to)` and prices them at
/// `tariff` per kWh. Every unit of the workspace gets a line.
pub fn energy_report(
    conn: &mut SqliteConnection,
    ws_id: i32,
    from: NaiveDateTime,
    to: NaiveDateTime,
    tariff: f64,
) -> Result<EnergyReport, diesel::result::Error> {
    use crate::schema::{energy_readings, equipments};

    let units: Vec<(i32, String)> = equipments::table
        .filter(equipments::workspace_id.eq(ws_id))
        .order(equipments::id.asc())
        .select((equipments::id, equipments::name))
        .load(conn)?;

    let totals: HashMap<i32, f64> = energy_readings::table
        .inner_join(equipments::table)
        .filter(equipments::workspace_id.eq(ws_id))
        .filter(energy_readings::recorded_at.ge(from))
        .filter(energy_readings::recorded_at.lt(to))
        .group_by(energy_readings::equipment_id)
        .select((energy_readings::equipment_id, sum(energy_readings::consumption_kwh)))
        .load::<(i32, Option<f64>)>(conn)?
        .into_iter()
        .map(|(eq_id, kwh)| (eq_id, kwh.unwrap_or(0.0)))
        .collect();

    let lines: Vec<EnergyReportLine> = units
        .into_iter()
        .map(|(eq_id, name)| {
            let kwh = totals.get(&eq_id).copied().unwrap_or(0.0);
            EnergyReportLine {
                equipment_id: eq_id,
                equipment_name: name,
                consumption_kwh: kwh,
                expense: kwh * tariff,
            }
        })
        .collect();

    let total_kwh = lines.iter().map(|l| l.consumption_kwh).sum();
    let total_expense = lines.iter().map(|l| l.expense).sum();

    Ok(EnergyReport { workspace_id: ws_id, from, to, tariff, lines, total_kwh, total_expense })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::EquipmentInput;
    use crate::orm::equipment::insert_equipment;
    use crate::orm::testing::{insert_test_user, setup_test_db};
    use crate::orm::workspace::insert_workspace;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    fn unit(name: &str) -> EquipmentInput {
        EquipmentInput {
            name: name.to_string(),
            integration: None,
            external_id: None,
            mode: None,
            target_temp: None,
        }
    }

    #[test]
    fn test_report_sums_within_window() {
        let mut conn = setup_test_db();
        let owner = insert_test_user(&mut conn, "owner@example.com");
        let ws = insert_workspace(&mut conn, "Office", owner.id, None).unwrap();
        let split = insert_equipment(&mut conn, ws.id, &unit("Split A"), None).unwrap();
        let idle = insert_equipment(&mut conn, ws.id, &unit("Split B"), None).unwrap();

        insert_reading(&mut conn, split.id, at(1, 0), 2.5).unwrap();
        insert_reading(&mut conn, split.id, at(2, 12), 1.5).unwrap();
        // Upper bound is exclusive.
        insert_reading(&mut conn, split.id, at(3, 0), 100.0).unwrap();

        let report = energy_report(&mut conn, ws.id, at(1, 0), at(3, 0), 0.5).unwrap();

        assert_eq!(report.lines.len(), 2);
        assert_eq!(report.lines[0].equipment_id, split.id);
        assert_eq!(report.lines[0].consumption_kwh, 4.0);
        assert_eq!(report.lines[0].expense, 2.0);
        assert_eq!(report.lines[1].equipment_id, idle.id);
        assert_eq!(report.lines[1].consumption_kwh, 0.0);
        assert_eq!(report.total_kwh, 4.0);
        assert_eq!(report.total_expense, 2.0);
    }

    #[test]
    fn test_report_ignores_other_workspaces() {
        let mut conn = setup_test_db();
        let owner = insert_test_user(&mut conn, "owner@example.com");
        let ws = insert_workspace(&mut conn, "Office", owner.id, None).unwrap();
        let other = insert_workspace(&mut conn, "Depot", owner.id, None).unwrap();
        let theirs = insert_equipment(&mut conn, other.id, &unit("Chiller"), None).unwrap();
        insert_reading(&mut conn, theirs.id, at(1, 6), 9.0).unwrap();

        let report = energy_report(&mut conn, ws.id, at(1, 0), at(2, 0), 1.0).unwrap();
        assert!(report.lines.is_empty());
        assert_eq!(report.total_kwh, 0.0);
    }
}
