use diesel::prelude::*;

use crate::comfort::{ComfortBands, SetpointChange, SetpointRejection};
use crate::models::{Environment, EnvironmentEquipment, EnvironmentWithTimestamps, NewEnvironment};
use crate::orm::db::{enforce_foreign_keys, last_insert_rowid};
use crate::orm::entity_activity::{get_timestamps, update_latest_activity_user};

/// Creates an environment and links its equipment in one transaction.
///
/// Setpoints are stored as given; callers validate them first.
pub fn insert_environment(
    conn: &mut SqliteConnection,
    new_environment: NewEnvironment,
    equipment: &[i32],
    acting_user_id: Option<i32>,
) -> Result<Environment, diesel::result::Error> {
    use crate::schema::environments::dsl::*;

    conn.transaction(|conn| {
        diesel::insert_into(environments).values(&new_environment).execute(conn)?;
        let environment_id = last_insert_rowid(conn)?;

        link_equipment(conn, environment_id, equipment)?;

        if let Some(user_id) = acting_user_id {
            update_latest_activity_user(conn, "environments", environment_id, "create", user_id)?;
        }

        environments.find(environment_id).select(Environment::as_select()).first(conn)
    })
}

fn link_equipment(
    conn: &mut SqliteConnection,
    env_id: i32,
    equipment: &[i32],
) -> Result<(), diesel::result::Error> {
    use crate::schema::environment_equipments::dsl::*;

    let mut ids = equipment.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let links: Vec<EnvironmentEquipment> = ids
        .into_iter()
        .map(|eq_id| EnvironmentEquipment { environment_id: env_id, equipment_id: eq_id })
        .collect();
    if !links.is_empty() {
        diesel::insert_into(environment_equipments).values(&links).execute(conn)?;
    }
    Ok(())
}

pub fn get_environment(
    conn: &mut SqliteConnection,
    environment_id: i32,
) -> Result<Option<Environment>, diesel::result::Error> {
    use crate::schema::environments::dsl::*;
    environments.find(environment_id).select(Environment::as_select()).first(conn).optional()
}

pub fn list_environments(
    conn: &mut SqliteConnection,
    ws_id: i32,
) -> Result<Vec<Environment>, diesel::result::Error> {
    use crate::schema::environments::dsl::*;
    environments
        .filter(workspace_id.eq(ws_id))
        .order(id.asc())
        .select(Environment::as_select())
        .load(conn)
}

pub fn get_environment_equipment_ids(
    conn: &mut SqliteConnection,
    env_id: i32,
) -> Result<Vec<i32>, diesel::result::Error> {
    use crate::schema::environment_equipments::dsl::*;
    environment_equipments
        .filter(environment_id.eq(env_id))
        .order(equipment_id.asc())
        .select(equipment_id)
        .load(conn)
}

/// Returns those of `ids` that belong to the workspace.
pub fn filter_workspace_environments(
    conn: &mut SqliteConnection,
    ws_id: i32,
    ids: &[i32],
) -> Result<Vec<i32>, diesel::result::Error> {
    use crate::schema::environments::dsl::*;
    environments
        .filter(workspace_id.eq(ws_id))
        .filter(id.eq_any(ids))
        .select(id)
        .load(conn)
}

/// Renames, relinks equipment and toggles automatic control. Fields left as
/// `None` keep their current value.
pub fn update_environment(
    conn: &mut SqliteConnection,
    environment_id: i32,
    new_name: Option<String>,
    new_equipment: Option<Vec<i32>>,
    new_automatic: Option<bool>,
    acting_user_id: Option<i32>,
) -> Result<Environment, diesel::result::Error> {
    use crate::schema::environment_equipments;
    use crate::schema::environments::dsl::*;

    conn.transaction(|conn| {
        let current = environments.find(environment_id).select(Environment::as_select()).first(conn)?;

        diesel::update(environments.find(environment_id))
            .set((
                name.eq(new_name.unwrap_or(current.name)),
                automatic.eq(new_automatic.unwrap_or(current.automatic)),
            ))
            .execute(conn)?;

        if let Some(equipment) = new_equipment {
            diesel::delete(
                environment_equipments::table
                    .filter(environment_equipments::environment_id.eq(environment_id)),
            )
            .execute(conn)?;
            link_equipment(conn, environment_id, &equipment)?;
        }

        if let Some(user_id) = acting_user_id {
            update_latest_activity_user(conn, "environments", environment_id, "update", user_id)?;
        }

        environments.find(environment_id).select(Environment::as_select()).first(conn)
    })
}

/// Stores already validated setpoints.
pub fn update_setpoints(
    conn: &mut SqliteConnection,
    environment_id: i32,
    new_automatic: bool,
    bands: ComfortBands,
    acting_user_id: Option<i32>,
) -> Result<Environment, diesel::result::Error> {
    use crate::schema::environments::dsl::*;

    conn.transaction(|conn| {
        diesel::update(environments.find(environment_id))
            .set((
                automatic.eq(new_automatic),
                cooling_enabled.eq(bands.cooling_enabled),
                heating_enabled.eq(bands.heating_enabled),
                cool_trigger_temp.eq(bands.cool_trigger_temp),
                cool_target_temp.eq(bands.cool_target_temp),
                heat_trigger_temp.eq(bands.heat_trigger_temp),
                heat_target_temp.eq(bands.heat_target_temp),
            ))
            .execute(conn)?;

        if let Some(user_id) = acting_user_id {
            update_latest_activity_user(conn, "environments", environment_id, "update", user_id)?;
        }

        environments.find(environment_id).select(Environment::as_select()).first(conn)
    })
}

#[derive(Debug, thiserror::Error)]
pub enum SetpointWriteError {
    #[error(transparent)]
    Rejected(#[from] SetpointRejection),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Applies one change to the stored setpoints.
///
/// Reading, validating and writing share a `BEGIN IMMEDIATE` transaction, so
/// concurrent adjusts serialize and each one starts from the last committed
/// bands. A change that leaves the bands as they were writes nothing.
pub fn adjust_setpoints(
    conn: &mut SqliteConnection,
    environment_id: i32,
    change: SetpointChange,
    acting_user_id: Option<i32>,
) -> Result<Environment, SetpointWriteError> {
    use crate::schema::environments::dsl::*;

    conn.immediate_transaction(|conn| {
        let current: Environment =
            environments.find(environment_id).select(Environment::as_select()).first(conn)?;
        let mut bands = current.bands();
        bands.apply(change)?;

        if bands == current.bands() {
            return Ok(current);
        }
        Ok(update_setpoints(conn, environment_id, current.automatic, bands, acting_user_id)?)
    })
}

pub fn delete_environment(
    conn: &mut SqliteConnection,
    environment_id: i32,
    acting_user_id: Option<i32>,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::environments::dsl::*;

    enforce_foreign_keys(conn)?;
    let deleted = diesel::delete(environments.find(environment_id)).execute(conn)?;

    if deleted > 0 {
        if let Some(user_id) = acting_user_id {
            update_latest_activity_user(conn, "environments", environment_id, "delete", user_id)?;
        }
    }

    Ok(deleted)
}

pub fn get_environment_with_timestamps(
    conn: &mut SqliteConnection,
    environment_id: i32,
) -> Result<Option<EnvironmentWithTimestamps>, diesel::result::Error> {
    let environment = match get_environment(conn, environment_id)? {
        Some(e) => e,
        None => return Ok(None),
    };
    Ok(Some(with_timestamps(conn, environment)?))
}

pub fn with_timestamps(
    conn: &mut SqliteConnection,
    environment: Environment,
) -> Result<EnvironmentWithTimestamps, diesel::result::Error> {
    let equipment_ids = get_environment_equipment_ids(conn, environment.id)?;
    let (created_at, updated_at) = get_timestamps(conn, "environments", environment.id)?;

    Ok(EnvironmentWithTimestamps {
        id: environment.id,
        workspace_id: environment.workspace_id,
        setpoints: environment.bands(),
        automatic: environment.automatic,
        name: environment.name,
        equipment_ids,
        created_at,
        updated_at,
    })
}
