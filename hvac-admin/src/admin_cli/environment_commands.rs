use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use hvac_api::comfort::{ComfortBands, HvacDemand};
use hvac_api::orm::{
    environment::{get_environment, get_environment_equipment_ids, list_environments},
    occupancy_automation::active_automations_for_environment,
    time_routine::active_routines_for_environment,
};

use super::utils::resolve_workspace_id;

#[derive(Subcommand)]
pub enum EnvironmentAction {
    #[command(about = "List the environments of a workspace")]
    Ls {
        #[arg(short, long, help = "Workspace ID or name")]
        workspace: String,
    },
    #[command(about = "Validate an environment's setpoints and show what governs it")]
    Check {
        #[arg(short, long, help = "Environment ID")]
        id: i32,
        #[arg(short, long, help = "Room temperature to evaluate the comfort bands against")]
        temperature: Option<f64>,
    },
}

pub fn handle_environment_command_with_conn(
    conn: &mut SqliteConnection,
    action: EnvironmentAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        EnvironmentAction::Ls { workspace } => {
            environment_ls_impl(conn, &workspace)?;
        }
        EnvironmentAction::Check { id, temperature } => {
            environment_check_impl(conn, id, temperature)?;
        }
    }
    Ok(())
}

fn format_bands(bands: &ComfortBands) -> String {
    let cooling = if bands.cooling_enabled { "on" } else { "off" };
    let heating = if bands.heating_enabled { "on" } else { "off" };
    format!(
        "cooling {} ({} -> {}), heating {} ({} -> {})",
        cooling,
        bands.cool_trigger_temp,
        bands.cool_target_temp,
        heating,
        bands.heat_trigger_temp,
        bands.heat_target_temp
    )
}

pub fn environment_ls_impl(
    conn: &mut SqliteConnection,
    workspace: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace_id = resolve_workspace_id(conn, workspace)?;
    let environments = list_environments(conn, workspace_id)?;

    if environments.is_empty() {
        println!("No environments found.");
        return Ok(());
    }

    println!("Environments:");
    for env in environments {
        let equipment = get_environment_equipment_ids(conn, env.id)?;
        println!(
            "  ID: {}, Name: {}, Automatic: {}, Equipment: {:?}, Setpoints: {}",
            env.id,
            env.name,
            env.under_automatic_control(),
            equipment,
            format_bands(&env.bands())
        );
    }

    Ok(())
}

/// Prints the environment's state. Fails when the stored setpoints break the
/// comfort invariants, so scripts can detect bad rows.
pub fn environment_check_impl(
    conn: &mut SqliteConnection,
    environment_id: i32,
    temperature: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let env = get_environment(conn, environment_id)?
        .ok_or_else(|| format!("Environment with ID {} does not exist", environment_id))?;
    let bands = env.bands();

    println!("Environment: {} (ID: {}, workspace {})", env.name, env.id, env.workspace_id);
    println!("Setpoints: {}", format_bands(&bands));
    println!("Automatic control: {}", env.under_automatic_control());

    let routines = active_routines_for_environment(conn, env.id)?;
    let names: Vec<&str> = routines.iter().map(|r| r.name.as_str()).collect();
    println!("Time routines: {}", if names.is_empty() { "none".to_string() } else { names.join(", ") });

    let automations = active_automations_for_environment(conn, env.id)?;
    for automation in &automations {
        println!(
            "Occupancy automation: {} (off after {} min idle)",
            automation.name, automation.inactivity_timeout_minutes
        );
    }

    if let Some(temperature) = temperature {
        let demand = bands.demand(temperature, HvacDemand::Idle);
        println!("Demand at {:.1} degrees: {:?}", temperature, demand);
    }

    match bands.validate() {
        Ok(()) => {
            println!("Setpoints: OK");
            Ok(())
        }
        Err(rejection) => Err(format!("Setpoints are invalid: {}", rejection).into()),
    }
}
