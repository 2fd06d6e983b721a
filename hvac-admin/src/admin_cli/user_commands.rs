use std::io::{self, Write};

use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use hvac_api::orm::{
    login::hash_password,
    role::{PLATFORM_ADMIN_ROLE, USER_ROLE},
    user::{get_user_by_email, insert_user, list_all_users},
    user_role::{assign_user_role_by_name, get_user_roles},
    workspace::list_workspaces_for_user,
};
use regex::Regex;
use rpassword::read_password;

use super::utils::filter_by_term;

#[derive(Subcommand)]
pub enum UserAction {
    #[command(about = "Add a new user")]
    Add {
        #[arg(short, long, help = "Email address")]
        email: String,
        #[arg(short, long, help = "Password (will be prompted securely if not provided)")]
        password: Option<String>,
        #[arg(short, long, help = "Display name")]
        display_name: Option<String>,
        #[arg(long, help = "Grant access to every workspace")]
        platform_admin: bool,
    },
    #[command(about = "List users, optionally filtered by search term")]
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
}

pub fn handle_user_command_with_conn(
    conn: &mut SqliteConnection,
    action: UserAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        UserAction::Add { email, password, display_name, platform_admin } => {
            let password = match password {
                Some(p) => p,
                None => prompt_for_password()?,
            };
            add_user_impl(conn, &email, &password, display_name, platform_admin)?;
        }
        UserAction::Ls { search_term, fixed_string } => {
            list_users_impl(conn, search_term, fixed_string)?;
        }
    }
    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+$").map(|re| re.is_match(email)).unwrap_or(false)
}

pub fn add_user_impl(
    conn: &mut SqliteConnection,
    email: &str,
    password: &str,
    display_name: Option<String>,
    platform_admin: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(format!("'{}' is not a valid email address", email).into());
    }
    if password.is_empty() {
        return Err("Password cannot be empty".into());
    }
    if get_user_by_email(conn, email)?.is_some() {
        return Err(format!("A user with email '{}' already exists", email).into());
    }

    let created_user = insert_user(conn, email, hash_password(password), display_name)?;
    assign_user_role_by_name(conn, created_user.id, USER_ROLE)?;
    if platform_admin {
        assign_user_role_by_name(conn, created_user.id, PLATFORM_ADMIN_ROLE)?;
    }

    println!("User created successfully!");
    println!("ID: {}", created_user.id);
    println!("Email: {}", created_user.email);
    if platform_admin {
        println!("Role: {}", PLATFORM_ADMIN_ROLE);
    }

    Ok(())
}

pub fn list_users_impl(
    conn: &mut SqliteConnection,
    search_term: Option<String>,
    fixed_string: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let users =
        filter_by_term(list_all_users(conn)?, search_term.as_deref(), fixed_string, |user| {
            user.email.as_str()
        })?;

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!("Users:");
    for user in users {
        let roles: Vec<String> =
            get_user_roles(conn, user.id)?.into_iter().map(|role| role.name).collect();
        let workspaces = list_workspaces_for_user(conn, user.id)?;
        println!(
            "  ID: {}, Email: {}, Name: {}, Roles: [{}], Workspaces: {}",
            user.id,
            user.email,
            user.display_name.as_deref().unwrap_or("-"),
            roles.join(", "),
            workspaces.len()
        );
    }

    Ok(())
}

pub fn prompt_for_password() -> Result<String, Box<dyn std::error::Error>> {
    print!("Enter new password: ");
    io::stdout().flush()?;
    let password = read_password()?;

    if password.is_empty() {
        return Err("Password cannot be empty".into());
    }

    print!("Confirm new password: ");
    io::stdout().flush()?;
    let confirm_password = read_password()?;

    if password != confirm_password {
        return Err("Passwords do not match".into());
    }

    Ok(password)
}
