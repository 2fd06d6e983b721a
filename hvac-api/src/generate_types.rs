//! TypeScript type generation module.
//!
//! Exports TypeScript definitions for the API payloads annotated with
//! `#[ts(export)]`. Runs as a test so the bindings are refreshed on every
//! `cargo test`.

#[cfg(test)]
mod tests {
    use std::{env, path::Path};

    use ts_rs::TS;

    #[test]
    fn generate_typescript_types() {
        // Output directory in order of preference:
        // 1. Environment variable HVAC_TS_OUTPUT_DIR
        // 2. ../../web/src/types/generated (if the web project exists)
        // 3. ../ts-bindings
        let output_dir_str = if let Ok(env_dir) = env::var("HVAC_TS_OUTPUT_DIR") {
            println!("Using TypeScript output directory from HVAC_TS_OUTPUT_DIR: {}", env_dir);
            env_dir
        } else {
            let web_dir = "../../web/src/types/generated";
            let fallback_dir = "../ts-bindings";

            if Path::new(web_dir).parent().unwrap_or(Path::new("")).exists() {
                println!("Using web project directory: {}", web_dir);
                web_dir.to_string()
            } else {
                println!("Using fallback directory: {}", fallback_dir);
                fallback_dir.to_string()
            }
        };

        let output_dir = Path::new(&output_dir_str);
        std::fs::create_dir_all(output_dir).expect("Failed to create output directory");

        // Remove stale definitions so renamed types do not linger
        for entry in std::fs::read_dir(output_dir).expect("Failed to read output directory") {
            let path = entry.expect("Failed to read directory entry").path();
            if path.extension().and_then(|s| s.to_str()) == Some("ts") {
                std::fs::remove_file(&path)
                    .unwrap_or_else(|e| panic!("Failed to remove {:?}: {}", path, e));
            }
        }

        unsafe {
            env::set_var("TS_RS_EXPORT_DIR", output_dir);
        }

        use crate::api::ErrorResponse;
        use crate::api::login::{LoginRequest, LoginSuccessResponse, WorkspaceSummary};
        use crate::api::status::HealthStatus;
        use crate::api::time_routine::EffectiveHoursResponse;
        use crate::automation::{ControlDecision, ControlReason, OccupancyVerdict};
        use crate::comfort::{Band, ComfortBands, HvacDemand, SetpointChange, SetpointField};
        use crate::models::*;
        use crate::routine_resolver::{EffectiveHours, HoursSource, TimeSlot};

        // Accounts
        User::export().expect("Failed to export User type");
        UserWithRoles::export().expect("Failed to export UserWithRoles type");
        Role::export().expect("Failed to export Role type");
        EntityActivity::export().expect("Failed to export EntityActivity type");
        ActivityLogEntry::export().expect("Failed to export ActivityLogEntry type");

        // Workspaces
        Workspace::export().expect("Failed to export Workspace type");
        WorkspaceInput::export().expect("Failed to export WorkspaceInput type");
        WorkspaceWithTimestamps::export().expect("Failed to export WorkspaceWithTimestamps type");
        MemberRole::export().expect("Failed to export MemberRole type");
        WorkspaceMember::export().expect("Failed to export WorkspaceMember type");
        MemberWithUser::export().expect("Failed to export MemberWithUser type");
        WorkspaceInvitation::export().expect("Failed to export WorkspaceInvitation type");
        InvitationInput::export().expect("Failed to export InvitationInput type");

        // Equipment and environments
        Equipment::export().expect("Failed to export Equipment type");
        EquipmentMode::export().expect("Failed to export EquipmentMode type");
        Integration::export().expect("Failed to export Integration type");
        EquipmentInput::export().expect("Failed to export EquipmentInput type");
        UpdateEquipmentRequest::export().expect("Failed to export UpdateEquipmentRequest type");
        EquipmentControl::export().expect("Failed to export EquipmentControl type");
        EquipmentWithTimestamps::export().expect("Failed to export EquipmentWithTimestamps type");
        Environment::export().expect("Failed to export Environment type");
        EnvironmentInput::export().expect("Failed to export EnvironmentInput type");
        UpdateEnvironmentRequest::export().expect("Failed to export UpdateEnvironmentRequest type");
        SetpointsInput::export().expect("Failed to export SetpointsInput type");
        EnvironmentWithTimestamps::export()
            .expect("Failed to export EnvironmentWithTimestamps type");

        // Comfort and control
        ComfortBands::export().expect("Failed to export ComfortBands type");
        SetpointChange::export().expect("Failed to export SetpointChange type");
        SetpointField::export().expect("Failed to export SetpointField type");
        Band::export().expect("Failed to export Band type");
        HvacDemand::export().expect("Failed to export HvacDemand type");
        ControlDecision::export().expect("Failed to export ControlDecision type");
        ControlReason::export().expect("Failed to export ControlReason type");
        OccupancyVerdict::export().expect("Failed to export OccupancyVerdict type");

        // Time routines
        TimeRoutine::export().expect("Failed to export TimeRoutine type");
        RoutineSchedule::export().expect("Failed to export RoutineSchedule type");
        RoutineException::export().expect("Failed to export RoutineException type");
        SlotInput::export().expect("Failed to export SlotInput type");
        DayScheduleInput::export().expect("Failed to export DayScheduleInput type");
        ExceptionInput::export().expect("Failed to export ExceptionInput type");
        TimeRoutineInput::export().expect("Failed to export TimeRoutineInput type");
        DaySchedule::export().expect("Failed to export DaySchedule type");
        TimeRoutineDetail::export().expect("Failed to export TimeRoutineDetail type");
        TimeSlot::export().expect("Failed to export TimeSlot type");
        HoursSource::export().expect("Failed to export HoursSource type");
        EffectiveHours::export().expect("Failed to export EffectiveHours type");
        EffectiveHoursResponse::export().expect("Failed to export EffectiveHoursResponse type");

        // Occupancy automations
        OccupancyAutomation::export().expect("Failed to export OccupancyAutomation type");
        OccupancyAutomationInput::export().expect("Failed to export OccupancyAutomationInput type");
        OccupancyAutomationDetail::export()
            .expect("Failed to export OccupancyAutomationDetail type");

        // Alerts and energy
        Alert::export().expect("Failed to export Alert type");
        AlertInput::export().expect("Failed to export AlertInput type");
        Severity::export().expect("Failed to export Severity type");
        EnergyReading::export().expect("Failed to export EnergyReading type");
        EnergyReadingInput::export().expect("Failed to export EnergyReadingInput type");
        EnergyReportLine::export().expect("Failed to export EnergyReportLine type");
        EnergyReport::export().expect("Failed to export EnergyReport type");

        // API envelopes
        ErrorResponse::export().expect("Failed to export ErrorResponse type");
        LoginRequest::export().expect("Failed to export LoginRequest type");
        WorkspaceSummary::export().expect("Failed to export WorkspaceSummary type");
        LoginSuccessResponse::export().expect("Failed to export LoginSuccessResponse type");
        HealthStatus::export().expect("Failed to export HealthStatus type");

        println!("TypeScript types generated successfully in {:?}", output_dir);
    }
}
