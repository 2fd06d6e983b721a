use chrono::NaiveDate;
use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use hvac_api::orm::time_routine::{
    effective_hours_for, get_routine_environment_ids, get_time_routine, list_exceptions,
    list_time_routines,
};
use hvac_api::routine_resolver::{EffectiveHours, HoursSource};

use super::utils::resolve_workspace_id;

#[derive(Subcommand)]
pub enum RoutineAction {
    #[command(about = "List the time routines of a workspace")]
    Ls {
        #[arg(short, long, help = "Workspace ID or name")]
        workspace: String,
    },
    #[command(about = "Show the opening hours a routine resolves to on a date")]
    Hours {
        #[arg(short, long, help = "Routine ID")]
        routine: i32,
        #[arg(short, long, help = "Date as YYYY-MM-DD (defaults to today, UTC)")]
        date: Option<String>,
    },
}

pub fn handle_routine_command_with_conn(
    conn: &mut SqliteConnection,
    action: RoutineAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        RoutineAction::Ls { workspace } => {
            routine_ls_impl(conn, &workspace)?;
        }
        RoutineAction::Hours { routine, date } => {
            let date = match date {
                Some(raw) => raw
                    .parse::<NaiveDate>()
                    .map_err(|e| format!("Invalid date '{}': {}", raw, e))?,
                None => chrono::Utc::now().date_naive(),
            };
            println!("{}", routine_hours_impl(conn, routine, date)?);
        }
    }
    Ok(())
}

pub fn routine_ls_impl(
    conn: &mut SqliteConnection,
    workspace: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace_id = resolve_workspace_id(conn, workspace)?;
    let routines = list_time_routines(conn, workspace_id)?;

    if routines.is_empty() {
        println!("No time routines found.");
        return Ok(());
    }

    println!("Time routines:");
    for routine in routines {
        let environments = get_routine_environment_ids(conn, routine.id)?;
        let exceptions = list_exceptions(conn, routine.id)?;
        println!(
            "  ID: {}, Name: {}, Active: {}, Environments: {:?}, Exceptions: {}",
            routine.id,
            routine.name,
            routine.is_active,
            environments,
            exceptions.len()
        );
    }

    Ok(())
}

/// Resolves the routine's hours on `date` and renders them for the terminal.
pub fn routine_hours_impl(
    conn: &mut SqliteConnection,
    routine_id: i32,
    date: NaiveDate,
) -> Result<String, Box<dyn std::error::Error>> {
    let routine = get_time_routine(conn, routine_id)?
        .ok_or_else(|| format!("Time routine with ID {} does not exist", routine_id))?;
    let hours = effective_hours_for(conn, routine.id, date)?;
    Ok(format!("{} on {} ({}): {}", routine.name, date, date.format("%A"), describe(&hours)))
}

fn describe(hours: &EffectiveHours) -> String {
    let source = match hours.source {
        HoursSource::Weekly => "weekly schedule".to_string(),
        HoursSource::Exception(id) => format!("exception {}", id),
    };
    if hours.is_closed() {
        return format!("closed, from {}", source);
    }
    let slots: Vec<String> = hours
        .slots
        .iter()
        .map(|slot| format!("{}-{}", slot.start.format("%H:%M"), slot.end.format("%H:%M")))
        .collect();
    format!("{}, from {}", slots.join(", "), source)
}
