/*!
 * HVAC Administrative CLI Utility
 *
 * Operator tooling that works directly on an hvac-api SQLite database. It
 * goes through the same ORM functions as the API, so activity tracking and
 * cascading deletes behave the same way.
 *
 * - Workspace management (list, create with an owner, remove with cascade)
 * - Account management (create with a securely prompted password, list)
 * - Time routine inspection (list, effective hours for a date)
 * - Environment inspection (list, setpoint validation)
 *
 * Run with --help for the available commands.
 */

mod admin_cli;

use clap::{Parser, Subcommand};

use admin_cli::{
    environment_commands::{EnvironmentAction, handle_environment_command_with_conn},
    routine_commands::{RoutineAction, handle_routine_command_with_conn},
    user_commands::{UserAction, handle_user_command_with_conn},
    utils::{establish_connection, get_or_create_admin_user},
    workspace_commands::{WorkspaceAction, handle_workspace_command_with_conn},
};

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[command(name = "hvac-admin")]
#[command(about = "Administrative CLI for HVAC fleet databases")]
#[command(version)]
struct Cli {
    /// Show detailed version information
    #[arg(long = "version-info")]
    version_info: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Workspace {
        #[command(subcommand)]
        action: WorkspaceAction,
    },
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    Routine {
        #[command(subcommand)]
        action: RoutineAction,
    },
    Environment {
        #[command(subcommand)]
        action: EnvironmentAction,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.version_info {
        println!("hvac-admin {}", built_info::PKG_VERSION);
        println!("Built: {}", built_info::BUILT_TIME_UTC);
        if let Some(commit) = built_info::GIT_COMMIT_HASH {
            println!("Commit: {}", commit);
        }
        return Ok(());
    }

    let Some(command) = cli.command else {
        return Err("No command given, see --help".into());
    };

    let mut conn = establish_connection()?;
    match command {
        Commands::Workspace { action } => {
            let admin_user_id = get_or_create_admin_user(&mut conn)?;
            handle_workspace_command_with_conn(&mut conn, action, admin_user_id)?
        }
        Commands::User { action } => handle_user_command_with_conn(&mut conn, action)?,
        Commands::Routine { action } => handle_routine_command_with_conn(&mut conn, action)?,
        Commands::Environment { action } => {
            handle_environment_command_with_conn(&mut conn, action)?
        }
    }

    Ok(())
}
