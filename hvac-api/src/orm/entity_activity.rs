use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::models::EntityActivity;

/// Get the creation timestamp for an entity (first 'create' operation)
pub fn get_created_at(
    conn: &mut SqliteConnection,
    table_name_val: &str,
    entity_id_val: i32,
) -> Result<NaiveDateTime, diesel::result::Error> {
    use crate::schema::entity_activity::dsl::*;

    entity_activity
        .filter(table_name.eq(table_name_val))
        .filter(entity_id.eq(entity_id_val))
        .filter(operation_type.eq("create"))
        .order((timestamp.asc(), id.asc()))
        .select(timestamp)
        .first::<NaiveDateTime>(conn)
}

/// Get the last update timestamp for an entity (most recent operation)
pub fn get_updated_at(
    conn: &mut SqliteConnection,
    table_name_val: &str,
    entity_id_val: i32,
) -> Result<NaiveDateTime, diesel::result::Error> {
    use crate::schema::entity_activity::dsl::*;

    entity_activity
        .filter(table_name.eq(table_name_val))
        .filter(entity_id.eq(entity_id_val))
        .order((timestamp.desc(), id.desc()))
        .select(timestamp)
        .first::<NaiveDateTime>(conn)
}

/// Both timestamps at once, falling back to `now` for rows that predate the
/// activity triggers.
pub fn get_timestamps(
    conn: &mut SqliteConnection,
    table_name_val: &str,
    entity_id_val: i32,
) -> Result<(NaiveDateTime, NaiveDateTime), diesel::result::Error> {
    let now = chrono::Utc::now().naive_utc();
    let created = get_created_at(conn, table_name_val, entity_id_val)
        .optional()?
        .unwrap_or(now);
    let updated = get_updated_at(conn, table_name_val, entity_id_val)
        .optional()?
        .unwrap_or(created);
    Ok((created, updated))
}

/// Get full activity history for an entity
pub fn get_activity_history(
    conn: &mut SqliteConnection,
    table_name_val: &str,
    entity_id_val: i32,
) -> Result<Vec<EntityActivity>, diesel::result::Error> {
    use crate::schema::entity_activity::dsl::*;

    entity_activity
        .filter(table_name.eq(table_name_val))
        .filter(entity_id.eq(entity_id_val))
        .order((timestamp.asc(), id.asc()))
        .load::<EntityActivity>(conn)
}

/// Attributes the trigger-written activity row for an operation to a user.
///
/// Triggers cannot see who made the change, so writers call this right after
/// the statement that fired the trigger.
pub fn update_latest_activity_user(
    conn: &mut SqliteConnection,
    table_name_val: &str,
    entity_id_val: i32,
    operation_type_val: &str,
    user_id_val: i32,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::entity_activity::dsl::*;

    let latest = entity_activity
        .filter(table_name.eq(table_name_val))
        .filter(entity_id.eq(entity_id_val))
        .filter(operation_type.eq(operation_type_val))
        .order(id.desc())
        .select(id)
        .first::<i32>(conn)
        .optional()?;

    match latest {
        Some(activity_id) => diesel::update(entity_activity.find(activity_id))
            .set(user_id.eq(Some(user_id_val)))
            .execute(conn),
        None => Ok(0),
    }
}
