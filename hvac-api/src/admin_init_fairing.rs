use diesel::prelude::*;
use dotenvy::dotenv;
use rocket::fairing::AdHoc;

use crate::models::{NewRole, Role, User};
use crate::orm::DbConn;
use crate::orm::login::hash_password;
use crate::orm::role::{PLATFORM_ADMIN_ROLE, USER_ROLE, get_role_by_name, insert_role};
use crate::orm::user::{get_user_by_email, insert_user};
use crate::orm::user_role::{assign_user_role, user_has_role};

/// Makes sure a platform administrator account exists.
///
/// The account comes from `HVAC_DEFAULT_EMAIL` / `HVAC_DEFAULT_PASSWORD`
/// (defaults `superadmin@example.com` / `admin`). An existing account keeps
/// its password but is granted any missing role.
pub fn admin_init_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Admin User Initialization", |rocket| async {
        dotenv().ok();

        let conn = match DbConn::get_one(&rocket).await {
            Some(conn) => conn,
            None => {
                error!("[admin-init] ERROR: Could not get DB connection.");
                return Err(rocket);
            }
        };

        let admin_email = admin_email();
        let result = conn.run(move |c| ensure_platform_admin(c, &admin_email)).await;

        match result {
            Ok(user) => {
                info!("[admin-init] Platform admin is '{}'", user.email);
                Ok(rocket)
            }
            Err(e) => {
                error!("[admin-init] FATAL: Admin user setup failed: {:?}", e);
                Err(rocket)
            }
        }
    })
}

fn admin_email() -> String {
    std::env::var("HVAC_DEFAULT_EMAIL").unwrap_or_else(|_| "superadmin@example.com".to_string())
}

fn admin_password() -> String {
    std::env::var("HVAC_DEFAULT_PASSWORD").unwrap_or_else(|_| "admin".to_string())
}

fn ensure_platform_admin(
    c: &mut SqliteConnection,
    admin_email: &str,
) -> Result<User, diesel::result::Error> {
    c.transaction(|c| {
        let user = match get_user_by_email(c, admin_email)? {
            Some(existing) => existing,
            None => {
                let user = insert_user(c, admin_email, hash_password(&admin_password()), None)?;
                info!("[admin-init] Created admin user: '{}'", admin_email);
                user
            }
        };

        for role_name in [PLATFORM_ADMIN_ROLE, USER_ROLE] {
            let role = find_or_create_role(c, role_name)?;
            if !user_has_role(c, user.id, role_name)? {
                assign_user_role(c, user.id, role.id)?;
                info!("[admin-init] Assigned role '{}' to user '{}'", role_name, admin_email);
            }
        }

        Ok(user)
    })
}

fn find_or_create_role(c: &mut SqliteConnection, role_name: &str) -> Result<Role, diesel::result::Error> {
    match get_role_by_name(c, role_name)? {
        Some(role) => Ok(role),
        None => {
            info!("[admin-init] Creating role: '{}'", role_name);
            insert_role(c, NewRole { name: role_name.to_string(), description: None })
        }
    }
}
