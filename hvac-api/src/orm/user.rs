use diesel::prelude::*;

use crate::models::{NewUser, User, UserWithRoles};
use crate::orm::db::last_insert_rowid;
use crate::orm::user_role::get_user_roles;

/// Inserts a new user. The email is stored lowercased.
pub fn insert_user(
    conn: &mut SqliteConnection,
    user_email: &str,
    user_password_hash: String,
    user_display_name: Option<String>,
) -> Result<User, diesel::result::Error> {
    use crate::schema::users::dsl::*;

    let new_user = NewUser {
        email: user_email.trim().to_lowercase(),
        password_hash: user_password_hash,
        display_name: user_display_name,
    };

    diesel::insert_into(users).values(&new_user).execute(conn)?;
    let last_id = last_insert_rowid(conn)?;

    users.filter(id.eq(last_id)).select(User::as_select()).first(conn)
}

/// Returns all users in ascending order by id.
pub fn list_all_users(conn: &mut SqliteConnection) -> Result<Vec<User>, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    users.order(id.asc()).select(User::as_select()).load(conn)
}

/// Gets a single user by ID.
pub fn get_user(
    conn: &mut SqliteConnection,
    user_id: i32,
) -> Result<Option<User>, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    users.filter(id.eq(user_id)).select(User::as_select()).first(conn).optional()
}

/// Gets a single user by email (case-insensitive).
pub fn get_user_by_email(
    conn: &mut SqliteConnection,
    user_email: &str,
) -> Result<Option<User>, diesel::result::Error> {
    diesel::sql_query(
        "SELECT id, email, password_hash, display_name FROM users WHERE LOWER(email) = LOWER(?)",
    )
    .bind::<diesel::sql_types::Text, _>(user_email.trim())
    .get_result::<User>(conn)
    .optional()
}

pub fn get_user_with_roles(
    conn: &mut SqliteConnection,
    user_id: i32,
) -> Result<Option<UserWithRoles>, diesel::result::Error> {
    let user = match get_user(conn, user_id)? {
        Some(u) => u,
        None => return Ok(None),
    };
    let roles = get_user_roles(conn, user.id)?;

    Ok(Some(UserWithRoles {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
        roles,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::setup_test_db;

    #[test]
    fn test_insert_user_lowercases_email() {
        let mut conn = setup_test_db();
        let user = insert_user(&mut conn, " Tech@Example.com ", "hash".to_string(), None).unwrap();
        assert_eq!(user.email, "tech@example.com");
    }

    #[test]
    fn test_get_user_by_email_is_case_insensitive() {
        let mut conn = setup_test_db();
        let user = insert_user(
            &mut conn,
            "tech@example.com",
            "hash".to_string(),
            Some("Tech".to_string()),
        )
        .unwrap();

        let found = get_user_by_email(&mut conn, "TECH@example.COM").unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(get_user_by_email(&mut conn, "nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let mut conn = setup_test_db();
        insert_user(&mut conn, "dup@example.com", "hash".to_string(), None).unwrap();
        assert!(insert_user(&mut conn, "DUP@example.com", "hash".to_string(), None).is_err());
    }
}
