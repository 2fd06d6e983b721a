use diesel::prelude::*;

use crate::models::{NewUserRole, Role};

/// Assigns a role to a user
pub fn assign_user_role(
    conn: &mut SqliteConnection,
    user_id_param: i32,
    role_id_param: i32,
) -> Result<(), diesel::result::Error> {
    use crate::schema::user_roles::dsl::*;

    let new_user_role = NewUserRole { user_id: user_id_param, role_id: role_id_param };

    diesel::insert_into(user_roles).values(&new_user_role).execute(conn)?;

    Ok(())
}

/// Gets all roles for a specific user
pub fn get_user_roles(
    conn: &mut SqliteConnection,
    user_id_param: i32,
) -> Result<Vec<Role>, diesel::result::Error> {
    use crate::schema::roles::dsl::*;
    use crate::schema::user_roles;

    roles
        .inner_join(user_roles::table.on(id.eq(user_roles::role_id)))
        .filter(user_roles::user_id.eq(user_id_param))
        .order(id.asc())
        .select(Role::as_select())
        .load(conn)
}

/// Checks if a user has a specific role by role name
pub fn user_has_role(
    conn: &mut SqliteConnection,
    user_id_param: i32,
    role_name: &str,
) -> Result<bool, diesel::result::Error> {
    use crate::schema::roles::dsl::*;
    use crate::schema::user_roles;

    let count: i64 = roles
        .inner_join(user_roles::table.on(id.eq(user_roles::role_id)))
        .filter(user_roles::user_id.eq(user_id_param))
        .filter(name.eq(role_name))
        .count()
        .get_result(conn)?;

    Ok(count > 0)
}

/// Assigns a role to a user by role name
pub fn assign_user_role_by_name(
    conn: &mut SqliteConnection,
    user_id_param: i32,
    role_name: &str,
) -> Result<(), diesel::result::Error> {
    use crate::schema::roles::dsl::*;

    let role = roles.filter(name.eq(role_name)).select(Role::as_select()).first(conn)?;

    assign_user_role(conn, user_id_param, role.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::role::{PLATFORM_ADMIN_ROLE, USER_ROLE};
    use crate::orm::testing::setup_test_db;
    use crate::orm::user::insert_user;

    #[test]
    fn test_assign_and_get_user_roles() {
        let mut conn = setup_test_db();
        let user = insert_user(&mut conn, "ops@example.com", "hash".to_string(), None).unwrap();

        assert!(!user_has_role(&mut conn, user.id, PLATFORM_ADMIN_ROLE).unwrap());

        assign_user_role_by_name(&mut conn, user.id, USER_ROLE).unwrap();
        assign_user_role_by_name(&mut conn, user.id, PLATFORM_ADMIN_ROLE).unwrap();

        let assigned = get_user_roles(&mut conn, user.id).unwrap();
        assert_eq!(assigned.len(), 2);
        assert!(user_has_role(&mut conn, user.id, PLATFORM_ADMIN_ROLE).unwrap());
    }

    #[test]
    fn test_assign_unknown_role_fails() {
        let mut conn = setup_test_db();
        let user = insert_user(&mut conn, "ops@example.com", "hash".to_string(), None).unwrap();
        assert!(assign_user_role_by_name(&mut conn, user.id, "wizard").is_err());
    }
}
