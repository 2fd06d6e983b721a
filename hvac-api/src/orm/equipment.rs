use diesel::prelude::*;

use crate::comfort::{MAX_TEMP, MIN_TEMP};
use crate::models::{
    Equipment, EquipmentControl, EquipmentInput, EquipmentMode, EquipmentWithTimestamps,
    Integration, NewEquipment, UpdateEquipmentRequest,
};
use crate::orm::db::{enforce_foreign_keys, last_insert_rowid};
use crate::orm::entity_activity::{get_timestamps, update_latest_activity_user};

pub const DEFAULT_TARGET_TEMP: i32 = 24;

/// Checks the integration/external id pairing, the mode and the target
/// temperature. Returns a message suitable for a 400 response.
pub fn validate_equipment_fields(
    integration: Option<&str>,
    external_id: Option<&str>,
    mode: Option<&str>,
    target_temp: Option<i32>,
) -> Result<(), String> {
    if let Some(raw) = integration {
        let parsed: Integration = raw.parse()?;
        let has_external_id = external_id.map(|s| !s.trim().is_empty()).unwrap_or(false);
        if parsed.requires_external_id() && !has_external_id {
            return Err(format!("Integration '{}' requires an external_id", parsed.as_str()));
        }
    }
    if let Some(raw) = mode {
        raw.parse::<EquipmentMode>()?;
    }
    if let Some(t) = target_temp {
        if !(MIN_TEMP..=MAX_TEMP).contains(&t) {
            return Err(format!("target_temp must be between {} and {}", MIN_TEMP, MAX_TEMP));
        }
    }
    Ok(())
}

pub fn insert_equipment(
    conn: &mut SqliteConnection,
    ws_id: i32,
    input: &EquipmentInput,
    acting_user_id: Option<i32>,
) -> Result<Equipment, diesel::result::Error> {
    use crate::schema::equipments::dsl::*;

    let new_equipment = NewEquipment {
        workspace_id: ws_id,
        name: input.name.trim().to_string(),
        is_on: false,
        current_temp: None,
        target_temp: input.target_temp.unwrap_or(DEFAULT_TARGET_TEMP),
        mode: input.mode.as_deref().unwrap_or("cool").to_lowercase(),
        integration: input.integration.as_deref().unwrap_or("manual").to_lowercase(),
        external_id: input.external_id.clone().filter(|s| !s.trim().is_empty()),
    };

    diesel::insert_into(equipments).values(&new_equipment).execute(conn)?;
    let equipment_id = last_insert_rowid(conn)?;

    if let Some(user_id) = acting_user_id {
        update_latest_activity_user(conn, "equipments", equipment_id, "create", user_id)?;
    }

    equipments.find(equipment_id).select(Equipment::as_select()).first(conn)
}

pub fn get_equipment(
    conn: &mut SqliteConnection,
    equipment_id: i32,
) -> Result<Option<Equipment>, diesel::result::Error> {
    use crate::schema::equipments::dsl::*;
    equipments.find(equipment_id).select(Equipment::as_select()).first(conn).optional()
}

pub fn list_equipment(
    conn: &mut SqliteConnection,
    ws_id: i32,
) -> Result<Vec<Equipment>, diesel::result::Error> {
    use crate::schema::equipments::dsl::*;
    equipments
        .filter(workspace_id.eq(ws_id))
        .order(id.asc())
        .select(Equipment::as_select())
        .load(conn)
}

/// Returns those of `ids` that belong to the workspace.
pub fn filter_workspace_equipment(
    conn: &mut SqliteConnection,
    ws_id: i32,
    ids: &[i32],
) -> Result<Vec<i32>, diesel::result::Error> {
    use crate::schema::equipments::dsl::*;
    equipments
        .filter(workspace_id.eq(ws_id))
        .filter(id.eq_any(ids))
        .select(id)
        .load(conn)
}

pub fn update_equipment(
    conn: &mut SqliteConnection,
    equipment_id: i32,
    request: &UpdateEquipmentRequest,
    acting_user_id: Option<i32>,
) -> Result<Equipment, diesel::result::Error> {
    use crate::schema::equipments::dsl::*;

    let current = equipments.find(equipment_id).select(Equipment::as_select()).first(conn)?;

    diesel::update(equipments.find(equipment_id))
        .set((
            name.eq(request.name.as_deref().map(|n| n.trim().to_string()).unwrap_or(current.name)),
            integration.eq(request
                .integration
                .as_deref()
                .map(str::to_lowercase)
                .unwrap_or(current.integration)),
            external_id.eq(request.external_id.clone().or(current.external_id)),
        ))
        .execute(conn)?;

    if let Some(user_id) = acting_user_id {
        update_latest_activity_user(conn, "equipments", equipment_id, "update", user_id)?;
    }

    equipments.find(equipment_id).select(Equipment::as_select()).first(conn)
}

/// Applies a runtime control command. Only the fields present change.
pub fn control_equipment(
    conn: &mut SqliteConnection,
    equipment_id: i32,
    control: &EquipmentControl,
    acting_user_id: Option<i32>,
) -> Result<Equipment, diesel::result::Error> {
    use crate::schema::equipments::dsl::*;

    let current = equipments.find(equipment_id).select(Equipment::as_select()).first(conn)?;

    diesel::update(equipments.find(equipment_id))
        .set((
            is_on.eq(control.is_on.unwrap_or(current.is_on)),
            mode.eq(control.mode.as_deref().map(str::to_lowercase).unwrap_or(current.mode)),
            target_temp.eq(control.target_temp.unwrap_or(current.target_temp)),
            current_temp.eq(control.current_temp.or(current.current_temp)),
        ))
        .execute(conn)?;

    if let Some(user_id) = acting_user_id {
        update_latest_activity_user(conn, "equipments", equipment_id, "update", user_id)?;
    }

    equipments.find(equipment_id).select(Equipment::as_select()).first(conn)
}

pub fn delete_equipment(
    conn: &mut SqliteConnection,
    equipment_id: i32,
    acting_user_id: Option<i32>,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::equipments::dsl::*;

    enforce_foreign_keys(conn)?;
    let deleted = diesel::delete(equipments.find(equipment_id)).execute(conn)?;

    if deleted > 0 {
        if let Some(user_id) = acting_user_id {
            update_latest_activity_user(conn, "equipments", equipment_id, "delete", user_id)?;
        }
    }

    Ok(deleted)
}

pub fn get_equipment_with_timestamps(
    conn: &mut SqliteConnection,
    equipment_id: i32,
) -> Result<Option<EquipmentWithTimestamps>, diesel::result::Error> {
    let equipment = match get_equipment(conn, equipment_id)? {
        Some(e) => e,
        None => return Ok(None),
    };
    let (created_at, updated_at) = get_timestamps(conn, "equipments", equipment_id)?;

    Ok(Some(EquipmentWithTimestamps {
        id: equipment.id,
        workspace_id: equipment.workspace_id,
        name: equipment.name,
        is_on: equipment.is_on,
        current_temp: equipment.current_temp,
        target_temp: equipment.target_temp,
        mode: equipment.mode,
        integration: equipment.integration,
        external_id: equipment.external_id,
        created_at,
        updated_at,
    }))
}
