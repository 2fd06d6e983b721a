use crate::models::Role;
use crate::schema::users;
use diesel::{Identifiable, Insertable, Queryable, QueryableByName, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(
    Queryable, Selectable, Identifiable, QueryableByName, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct User {
    pub id: i32,
    pub email: String, // unique, matched case-insensitively at login
    #[serde(skip_serializing)]
    #[ts(skip)]
    pub password_hash: String,
    pub display_name: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct UserWithRoles {
    pub id: i32,
    pub email: String,
    pub display_name: Option<String>,
    pub roles: Vec<Role>,
}
