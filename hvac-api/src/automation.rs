//! Read-only control evaluation for an environment.
//!
//! Nothing here writes to the database or drives equipment; callers get a
//! [`ControlDecision`] describing what the environment should be doing at a
//! given instant and why.

use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::comfort::HvacDemand;
use crate::models::{Environment, OccupancyAutomation};
use crate::orm::environment::get_environment;
use crate::orm::occupancy_automation::active_automations_for_environment;
use crate::orm::time_routine::{active_routines_for_environment, load_calendar};
use crate::routine_resolver::is_open_at;

/// Observations the evaluation is based on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlInputs {
    pub temperature: Option<f64>,
    /// Last time presence was detected in the environment.
    pub last_presence: Option<NaiveDateTime>,
    /// When an occupancy automation last switched the environment off.
    pub vacated_at: Option<NaiveDateTime>,
    pub current_demand: HvacDemand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ControlReason {
    /// Not under automatic control.
    Manual,
    OutsideRoutineHours,
    Vacant,
    /// Presence returned but the automation does not reactivate.
    HeldOff,
    NoTemperature,
    /// Demand follows the comfort bands.
    Comfort,
}

/// Occupancy verdict of one automation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct OccupancyVerdict {
    pub automation_id: i32,
    pub vacant: bool,
    /// Vacant while the routine window is closed, for an automation that
    /// respects routines.
    pub outside_routine_hours: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct ControlDecision {
    pub environment_id: i32,
    #[ts(type = "string")]
    pub at: NaiveDateTime,
    pub automatic: bool,
    /// `None` when no active routine is linked to the environment.
    pub within_routine_hours: Option<bool>,
    pub vacant: bool,
    pub occupancy: Vec<OccupancyVerdict>,
    pub demand: HvacDemand,
    pub reason: ControlReason,
}

/// Judges one automation against the presence observations.
///
/// Without any presence information the automation has nothing to act on
/// and the environment counts as occupied.
pub fn occupancy_verdict(
    automation: &OccupancyAutomation,
    at: NaiveDateTime,
    inputs: &ControlInputs,
    within_routine_hours: Option<bool>,
) -> (OccupancyVerdict, bool) {
    let timeout = Duration::minutes(i64::from(automation.inactivity_timeout_minutes));
    let routine_closed = within_routine_hours == Some(false);

    let (vacant, held_off) = match inputs.last_presence {
        None => (false, false),
        Some(seen) if at - seen >= timeout => (true, false),
        Some(seen) => match inputs.vacated_at {
            // Presence came back after the automation switched things off.
            Some(off) if seen > off => {
                let may_reactivate = automation.reactivate_on_presence
                    && !(automation.respect_time_routines && routine_closed);
                (!may_reactivate, !may_reactivate)
            }
            _ => (false, false),
        },
    };

    let verdict = OccupancyVerdict {
        automation_id: automation.id,
        vacant,
        outside_routine_hours: vacant && automation.respect_time_routines && routine_closed,
    };
    (verdict, held_off)
}

/// Resolution order:
/// 1. manual environments are left alone
/// 2. a closed routine window forces idle
/// 3. presence that may not reactivate keeps it off
/// 4. a vacant environment is idle
/// 5. otherwise the comfort bands decide from the temperature
pub fn decide(
    environment: &Environment,
    at: NaiveDateTime,
    within_routine_hours: Option<bool>,
    automations: &[OccupancyAutomation],
    inputs: &ControlInputs,
) -> ControlDecision {
    let mut vacant = false;
    let mut held_off = false;
    let mut occupancy = Vec::with_capacity(automations.len());
    for automation in automations {
        let (verdict, held) = occupancy_verdict(automation, at, inputs, within_routine_hours);
        vacant |= verdict.vacant;
        held_off |= held;
        occupancy.push(verdict);
    }

    let automatic = environment.under_automatic_control();
    let (demand, reason) = if !automatic {
        (HvacDemand::Idle, ControlReason::Manual)
    } else if within_routine_hours == Some(false) {
        (HvacDemand::Idle, ControlReason::OutsideRoutineHours)
    } else if held_off {
        (HvacDemand::Idle, ControlReason::HeldOff)
    } else if vacant {
        (HvacDemand::Idle, ControlReason::Vacant)
    } else {
        match inputs.temperature {
            Some(t) => (environment.bands().demand(t, inputs.current_demand), ControlReason::Comfort),
            None => (HvacDemand::Idle, ControlReason::NoTemperature),
        }
    };

    ControlDecision {
        environment_id: environment.id,
        at,
        automatic,
        within_routine_hours,
        vacant,
        occupancy,
        demand,
        reason,
    }
}

/// Loads what an environment's evaluation depends on and runs [`decide`].
#[derive(Debug, Default)]
pub struct ControlService;

impl ControlService {
    pub fn new() -> Self {
        Self
    }

    /// `None` without linked active routines, otherwise whether any of them
    /// is open at `at`.
    pub fn routine_window(
        &self,
        conn: &mut SqliteConnection,
        env_id: i32,
        at: NaiveDateTime,
    ) -> Result<Option<bool>, diesel::result::Error> {
        let routines = active_routines_for_environment(conn, env_id)?;
        if routines.is_empty() {
            return Ok(None);
        }
        for routine in routines {
            let (schedule, exceptions) = load_calendar(conn, routine.id)?;
            if is_open_at(at, &schedule, &exceptions) {
                return Ok(Some(true));
            }
        }
        Ok(Some(false))
    }

    pub fn get_control_state(
        &self,
        conn: &mut SqliteConnection,
        env_id: i32,
        at: NaiveDateTime,
        inputs: &ControlInputs,
    ) -> Result<Option<ControlDecision>, diesel::result::Error> {
        let environment = match get_environment(conn, env_id)? {
            Some(env) => env,
            None => return Ok(None),
        };
        let within_routine_hours = self.routine_window(conn, env_id, at)?;
        let automations = active_automations_for_environment(conn, env_id)?;

        Ok(Some(decide(&environment, at, within_routine_hours, &automations, inputs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    use crate::comfort::ComfortBands;
    use crate::models::{DayScheduleInput, NewEnvironment, SlotInput, TimeRoutineInput};
    use crate::orm::environment::insert_environment;
    use crate::orm::testing::{insert_test_user, setup_test_db};
    use crate::orm::time_routine::insert_time_routine;
    use crate::orm::workspace::insert_workspace;

    fn noon() -> NaiveDateTime {
        // A Wednesday.
        NaiveDate::from_ymd_opt(2025, 6, 4).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn cooling_env(automatic: bool) -> Environment {
        let bands = ComfortBands { cooling_enabled: true, ..ComfortBands::default() };
        Environment {
            id: 1,
            workspace_id: 1,
            name: "Lab".to_string(),
            automatic,
            cooling_enabled: bands.cooling_enabled,
            heating_enabled: bands.heating_enabled,
            cool_trigger_temp: bands.cool_trigger_temp,
            cool_target_temp: bands.cool_target_temp,
            heat_trigger_temp: bands.heat_trigger_temp,
            heat_target_temp: bands.heat_target_temp,
        }
    }

    fn automation(timeout: i32, reactivate: bool, respect: bool) -> OccupancyAutomation {
        OccupancyAutomation {
            id: 7,
            workspace_id: 1,
            name: "Auto off".to_string(),
            inactivity_timeout_minutes: timeout,
            reactivate_on_presence: reactivate,
            respect_time_routines: respect,
            is_active: true,
        }
    }

    fn hot() -> ControlInputs {
        ControlInputs { temperature: Some(27.0), ..ControlInputs::default() }
    }

    #[test]
    fn test_comfort_demand_when_unconstrained() {
        let decision = decide(&cooling_env(true), noon(), None, &[], &hot());
        assert_eq!(decision.demand, HvacDemand::Cooling);
        assert_eq!(decision.reason, ControlReason::Comfort);
    }

    #[test]
    fn test_manual_environment_stays_idle() {
        let decision = decide(&cooling_env(false), noon(), Some(true), &[], &hot());
        assert_eq!(decision.demand, HvacDemand::Idle);
        assert_eq!(decision.reason, ControlReason::Manual);
        assert!(!decision.automatic);
    }

    #[test]
    fn test_closed_routine_forces_idle() {
        let decision = decide(&cooling_env(true), noon(), Some(false), &[], &hot());
        assert_eq!(decision.reason, ControlReason::OutsideRoutineHours);
    }

    #[test]
    fn test_missing_temperature() {
        let decision = decide(&cooling_env(true), noon(), None, &[], &ControlInputs::default());
        assert_eq!(decision.reason, ControlReason::NoTemperature);
    }

    #[test]
    fn test_vacancy_after_timeout() {
        let inputs = ControlInputs { last_presence: Some(noon() - Duration::minutes(30)), ..hot() };

        let decision = decide(&cooling_env(true), noon(), None, &[automation(30, true, true)], &inputs);
        assert!(decision.vacant);
        assert_eq!(decision.reason, ControlReason::Vacant);

        let decision = decide(&cooling_env(true), noon(), None, &[automation(31, true, true)], &inputs);
        assert!(!decision.vacant);
        assert_eq!(decision.demand, HvacDemand::Cooling);
    }

    #[test]
    fn test_no_presence_data_is_not_vacancy() {
        let decision = decide(&cooling_env(true), noon(), None, &[automation(1, true, true)], &hot());
        assert!(!decision.vacant);
    }

    #[test]
    fn test_presence_after_vacancy_respects_reactivation() {
        let inputs = ControlInputs {
            last_presence: Some(noon() - Duration::minutes(1)),
            vacated_at: Some(noon() - Duration::minutes(10)),
            ..hot()
        };

        let reactivates = decide(&cooling_env(true), noon(), None, &[automation(30, true, false)], &inputs);
        assert_eq!(reactivates.reason, ControlReason::Comfort);

        let stays_off = decide(&cooling_env(true), noon(), None, &[automation(30, false, false)], &inputs);
        assert_eq!(stays_off.reason, ControlReason::HeldOff);
        assert!(stays_off.vacant);
    }

    #[test]
    fn test_vacant_outside_routine_hours_is_reported() {
        let inputs = ControlInputs { last_presence: Some(noon() - Duration::hours(2)), ..hot() };
        let decision =
            decide(&cooling_env(true), noon(), Some(false), &[automation(30, true, true)], &inputs);

        assert!(decision.occupancy[0].outside_routine_hours);
        assert_eq!(decision.reason, ControlReason::OutsideRoutineHours);
    }

    #[test]
    fn test_service_reads_routine_window() {
        let mut conn = setup_test_db();
        let owner = insert_test_user(&mut conn, "owner@example.com");
        let ws = insert_workspace(&mut conn, "Office", owner.id, None).unwrap();
        let bands = ComfortBands { cooling_enabled: true, ..ComfortBands::default() };
        let env = insert_environment(
            &mut conn,
            NewEnvironment::new(ws.id, "Lab".to_string(), true, bands),
            &[],
            None,
        )
        .unwrap();

        let service = ControlService::new();
        assert_eq!(service.routine_window(&mut conn, env.id, noon()).unwrap(), None);

        let routine = TimeRoutineInput {
            name: "Mornings".to_string(),
            is_active: None,
            schedules: vec![DayScheduleInput {
                day_of_week: "wednesday".to_string(),
                slots: vec![SlotInput {
                    start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                }],
            }],
            environment_ids: vec![env.id],
            exceptions: vec![],
        };
        insert_time_routine(&mut conn, ws.id, &routine, None).unwrap();

        // Slot end is exclusive.
        let decision = service.get_control_state(&mut conn, env.id, noon(), &hot()).unwrap().unwrap();
        assert_eq!(decision.within_routine_hours, Some(false));
        assert_eq!(decision.demand, HvacDemand::Idle);

        let morning = noon() - Duration::hours(1);
        let decision = service.get_control_state(&mut conn, env.id, morning, &hot()).unwrap().unwrap();
        assert_eq!(decision.within_routine_hours, Some(true));
        assert_eq!(decision.demand, HvacDemand::Cooling);

        assert!(service.get_control_state(&mut conn, 999, noon(), &hot()).unwrap().is_none());
    }
}
