use crate::schema::roles;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Global role, independent of any workspace.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = roles)]
#[ts(export)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Insertable, Debug, Deserialize)]
#[diesel(table_name = roles)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
}
