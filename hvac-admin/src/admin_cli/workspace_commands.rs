use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use hvac_api::orm::{
    entity_activity::get_created_at,
    environment::list_environments,
    equipment::list_equipment,
    user::get_user_by_email,
    workspace::{delete_workspace, insert_workspace, list_all_workspaces, list_members},
};

use super::utils::{confirm, filter_by_term};

#[derive(Subcommand)]
pub enum WorkspaceAction {
    #[command(about = "List workspaces, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(
            short = 'F',
            long = "fixed-string",
            help = "Treat search term as fixed string instead of regex"
        )]
        fixed_string: bool,
    },
    #[command(about = "Add a new workspace")]
    Add {
        #[arg(short, long, help = "Workspace name")]
        name: String,
        #[arg(short, long, help = "Email of the owning account")]
        owner: String,
    },
    #[command(about = "Remove workspaces matching search term, with everything inside them")]
    Rm {
        #[arg(
            help = "Search term to match workspaces for removal (regex by default, use -F for fixed string)"
        )]
        search_term: String,
        #[arg(
            short = 'F',
            long = "fixed-string",
            help = "Treat search term as fixed string instead of regex"
        )]
        fixed_string: bool,
        #[arg(short = 'y', long = "yes", help = "Skip confirmation prompt")]
        yes: bool,
    },
}

pub fn handle_workspace_command_with_conn(
    conn: &mut SqliteConnection,
    action: WorkspaceAction,
    admin_user_id: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        WorkspaceAction::Ls { search_term, fixed_string } => {
            workspace_ls_impl(conn, search_term, fixed_string)?;
        }
        WorkspaceAction::Add { name, owner } => {
            workspace_add_impl(conn, &name, &owner, admin_user_id)?;
        }
        WorkspaceAction::Rm { search_term, fixed_string, yes } => {
            workspace_rm_impl(conn, search_term, fixed_string, yes, admin_user_id)?;
        }
    }
    Ok(())
}

pub fn workspace_ls_impl(
    conn: &mut SqliteConnection,
    search_term: Option<String>,
    fixed_string: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspaces = filter_by_term(
        list_all_workspaces(conn)?,
        search_term.as_deref(),
        fixed_string,
        |ws| ws.name.as_str(),
    )?;

    if workspaces.is_empty() {
        println!("No workspaces found.");
        return Ok(());
    }

    println!("Workspaces:");
    for ws in workspaces {
        let members = list_members(conn, ws.id)?;
        let created_at = get_created_at(conn, "workspaces", ws.id)
            .map(|dt| dt.to_string())
            .unwrap_or_else(|_| "Unknown".to_string());
        println!(
            "  ID: {}, Name: {}, Owner ID: {}, Members: {}, Created: {}",
            ws.id,
            ws.name,
            ws.owner_id,
            members.len(),
            created_at
        );
    }

    Ok(())
}

pub fn workspace_add_impl(
    conn: &mut SqliteConnection,
    name: &str,
    owner_email: &str,
    admin_user_id: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    if name.trim().is_empty() {
        return Err("Workspace name must not be empty".into());
    }
    let owner = get_user_by_email(conn, owner_email)?
        .ok_or_else(|| format!("No account with email '{}'", owner_email))?;

    let created = insert_workspace(conn, name, owner.id, Some(admin_user_id))?;

    println!("Workspace created successfully!");
    println!("ID: {}", created.id);
    println!("Name: {}", created.name);
    println!("Owner: {} (ID: {})", owner.email, owner.id);

    Ok(())
}

pub fn workspace_rm_impl(
    conn: &mut SqliteConnection,
    search_term: String,
    fixed_string: bool,
    yes: bool,
    admin_user_id: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    let matching = filter_by_term(
        list_all_workspaces(conn)?,
        Some(&search_term),
        fixed_string,
        |ws| ws.name.as_str(),
    )?;

    if matching.is_empty() {
        println!("No workspaces found matching the search term.");
        return Ok(());
    }

    println!("Found {} workspace(s) matching the search term:", matching.len());
    for ws in &matching {
        let environments = list_environments(conn, ws.id)?;
        let equipment = list_equipment(conn, ws.id)?;
        println!(
            "  ID: {}, Name: {}, Environments: {}, Equipment: {}",
            ws.id,
            ws.name,
            environments.len(),
            equipment.len()
        );
    }

    if !yes
        && !confirm(&format!(
            "Are you sure you want to delete these {} workspace(s) and everything in them?",
            matching.len()
        ))?
    {
        println!("Operation cancelled.");
        return Ok(());
    }

    let mut deleted_count = 0;
    let mut errors = Vec::new();

    for ws in matching {
        match delete_workspace(conn, ws.id, Some(admin_user_id)) {
            Ok(rows) if rows > 0 => {
                deleted_count += 1;
                println!("Deleted workspace: {} (ID: {})", ws.name, ws.id);
            }
            Ok(_) => {}
            Err(e) => {
                errors.push(format!("Failed to delete workspace {} (ID: {}): {}", ws.name, ws.id, e));
            }
        }
    }

    println!("Successfully deleted {} workspace(s).", deleted_count);

    if !errors.is_empty() {
        println!("Errors encountered:");
        for error in errors {
            println!("  {}", error);
        }
        return Err("Some deletions failed".into());
    }

    Ok(())
}

#[cfg(all(test, feature = "test-staging"))]
mod tests {
    use super::*;
    use hvac_api::orm::testing::{insert_test_user, setup_test_db};
    use hvac_api::orm::workspace::get_workspace_by_name;

    #[test]
    fn test_add_requires_existing_owner() {
        let mut conn = setup_test_db();
        let admin = insert_test_user(&mut conn, "ops@localhost");

        assert!(workspace_add_impl(&mut conn, "Depot", "ghost@example.com", admin.id).is_err());
        assert!(workspace_add_impl(&mut conn, "  ", "ops@localhost", admin.id).is_err());

        workspace_add_impl(&mut conn, "Depot", "ops@localhost", admin.id).unwrap();
        let ws = get_workspace_by_name(&mut conn, "Depot").unwrap().unwrap();
        assert_eq!(ws.owner_id, admin.id);
        assert_eq!(list_members(&mut conn, ws.id).unwrap().len(), 1);
    }

    #[test]
    fn test_rm_deletes_only_matches() {
        let mut conn = setup_test_db();
        let admin = insert_test_user(&mut conn, "ops@localhost");
        insert_workspace(&mut conn, "Depot North", admin.id, None).unwrap();
        insert_workspace(&mut conn, "Depot South", admin.id, None).unwrap();
        insert_workspace(&mut conn, "Head Office", admin.id, None).unwrap();

        workspace_rm_impl(&mut conn, "^Depot".to_string(), false, true, admin.id).unwrap();

        let remaining: Vec<String> =
            list_all_workspaces(&mut conn).unwrap().into_iter().map(|w| w.name).collect();
        assert_eq!(remaining, vec!["Head Office".to_string()]);
    }
}
