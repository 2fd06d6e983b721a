use std::io::{self, Write};

use diesel::{prelude::*, sqlite::SqliteConnection};
use dotenvy::dotenv;
use hvac_api::orm::{
    login::hash_password,
    role::USER_ROLE,
    user::{get_user_by_email, insert_user},
    user_role::assign_user_role_by_name,
    workspace::{get_workspace, get_workspace_by_name},
};
use regex::Regex;

pub fn establish_connection() -> Result<SqliteConnection, Box<dyn std::error::Error>> {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let conn = SqliteConnection::establish(&database_url)?;
    Ok(conn)
}

/// Get or create an account for the current system user.
/// Changes made from the CLI are recorded against this account.
pub fn get_or_create_admin_user(
    conn: &mut SqliteConnection,
) -> Result<i32, Box<dyn std::error::Error>> {
    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "admin".to_string());

    let email = format!("{}@localhost", username);

    if let Some(existing_user) = get_user_by_email(conn, &email)? {
        return Ok(existing_user.id);
    }

    // Nobody knows this password, the account only attributes activity
    let password_hash = hash_password(&uuid::Uuid::new_v4().to_string());
    let created_user = insert_user(conn, &email, password_hash, Some(username))?;
    assign_user_role_by_name(conn, created_user.id, USER_ROLE)?;

    println!("Created admin user: {} (ID: {})", email, created_user.id);

    Ok(created_user.id)
}

/// Resolve a workspace identifier (either ID or name) to a workspace ID.
/// Numbers are treated as IDs and checked for existence; anything else is
/// looked up by name, case-insensitively.
pub fn resolve_workspace_id(
    conn: &mut SqliteConnection,
    workspace_identifier: &str,
) -> Result<i32, Box<dyn std::error::Error>> {
    if let Ok(id) = workspace_identifier.parse::<i32>() {
        match get_workspace(conn, id)? {
            Some(_workspace) => Ok(id),
            None => Err(format!("Workspace with ID {} does not exist", id).into()),
        }
    } else {
        match get_workspace_by_name(conn, workspace_identifier)? {
            Some(workspace) => Ok(workspace.id),
            None => {
                Err(format!("Workspace with name '{}' does not exist", workspace_identifier).into())
            }
        }
    }
}

/// Keeps the items whose key matches `term`, as a regex unless
/// `fixed_string` is set.
pub fn filter_by_term<T>(
    items: Vec<T>,
    term: Option<&str>,
    fixed_string: bool,
    key: impl Fn(&T) -> &str,
) -> Result<Vec<T>, Box<dyn std::error::Error>> {
    let Some(term) = term else {
        return Ok(items);
    };

    if fixed_string {
        Ok(items.into_iter().filter(|item| key(item).contains(term)).collect())
    } else {
        let regex =
            Regex::new(term).map_err(|e| format!("Invalid regex pattern '{}': {}", term, e))?;
        Ok(items.into_iter().filter(|item| regex.is_match(key(item))).collect())
    }
}

/// Asks a yes/no question on stdin, defaulting to no.
pub fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_lowercase();

    Ok(input == "y" || input == "yes")
}

#[cfg(all(test, feature = "test-staging"))]
mod tests {
    use super::*;
    use hvac_api::orm::testing::{insert_test_user, setup_test_db};
    use hvac_api::orm::workspace::insert_workspace;

    #[test]
    fn test_resolve_workspace_by_id_or_name() {
        let mut conn = setup_test_db();
        let owner = insert_test_user(&mut conn, "owner@example.com");
        let ws = insert_workspace(&mut conn, "Plant Floor", owner.id, None).unwrap();

        assert_eq!(resolve_workspace_id(&mut conn, &ws.id.to_string()).unwrap(), ws.id);
        assert_eq!(resolve_workspace_id(&mut conn, "plant floor").unwrap(), ws.id);
        assert!(resolve_workspace_id(&mut conn, "999").is_err());
        assert!(resolve_workspace_id(&mut conn, "Nowhere").is_err());
    }

    #[test]
    fn test_admin_user_is_created_once() {
        let mut conn = setup_test_db();
        let first = get_or_create_admin_user(&mut conn).unwrap();
        let second = get_or_create_admin_user(&mut conn).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_filter_by_term() {
        let names = vec!["Lobby".to_string(), "Server room".to_string(), "Lab".to_string()];

        let regex = filter_by_term(names.clone(), Some("^L"), false, |s| s.as_str()).unwrap();
        assert_eq!(regex, vec!["Lobby".to_string(), "Lab".to_string()]);

        let fixed = filter_by_term(names.clone(), Some("room"), true, |s| s.as_str()).unwrap();
        assert_eq!(fixed, vec!["Server room".to_string()]);

        assert_eq!(filter_by_term(names.clone(), None, false, |s| s.as_str()).unwrap().len(), 3);
        assert!(filter_by_term(names, Some("("), false, |s| s.as_str()).is_err());
    }
}
