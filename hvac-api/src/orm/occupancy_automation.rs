use diesel::prelude::*;

use crate::models::{
    OccupancyAutomation, OccupancyAutomationDetail, OccupancyAutomationEnvironment,
    OccupancyAutomationInput,
};
use crate::orm::db::{enforce_foreign_keys, last_insert_rowid};
use crate::orm::entity_activity::{get_timestamps, update_latest_activity_user};

fn link_environments(
    conn: &mut SqliteConnection,
    automation: i32,
    environment_ids: &[i32],
) -> Result<(), diesel::result::Error> {
    use crate::schema::occupancy_automation_environments::dsl::*;

    let mut ids = environment_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let links: Vec<OccupancyAutomationEnvironment> = ids
        .into_iter()
        .map(|env_id| OccupancyAutomationEnvironment { automation_id: automation, environment_id: env_id })
        .collect();
    if !links.is_empty() {
        diesel::insert_into(occupancy_automation_environments).values(&links).execute(conn)?;
    }
    Ok(())
}

/// Creates an automation and its environment links.
///
/// The timeout and environment ownership are checked by the caller.
pub fn insert_occupancy_automation(
    conn: &mut SqliteConnection,
    ws_id: i32,
    input: &OccupancyAutomationInput,
    acting_user_id: Option<i32>,
) -> Result<OccupancyAutomation, diesel::result::Error> {
    use crate::schema::occupancy_automations::dsl::*;

    conn.transaction(|conn| {
        diesel::insert_into(occupancy_automations).values(&input.to_new(ws_id)).execute(conn)?;
        let automation_id = last_insert_rowid(conn)?;

        link_environments(conn, automation_id, &input.environment_ids)?;

        if let Some(user_id) = acting_user_id {
            update_latest_activity_user(
                conn,
                "occupancy_automations",
                automation_id,
                "create",
                user_id,
            )?;
        }

        occupancy_automations
            .find(automation_id)
            .select(OccupancyAutomation::as_select())
            .first(conn)
    })
}

pub fn get_occupancy_automation(
    conn: &mut SqliteConnection,
    automation_id: i32,
) -> Result<Option<OccupancyAutomation>, diesel::result::Error> {
    use crate::schema::occupancy_automations::dsl::*;
    occupancy_automations
        .find(automation_id)
        .select(OccupancyAutomation::as_select())
        .first(conn)
        .optional()
}

pub fn list_occupancy_automations(
    conn: &mut SqliteConnection,
    ws_id: i32,
) -> Result<Vec<OccupancyAutomation>, diesel::result::Error> {
    use crate::schema::occupancy_automations::dsl::*;
    occupancy_automations
        .filter(workspace_id.eq(ws_id))
        .order(id.asc())
        .select(OccupancyAutomation::as_select())
        .load(conn)
}

pub fn get_automation_environment_ids(
    conn: &mut SqliteConnection,
    automation: i32,
) -> Result<Vec<i32>, diesel::result::Error> {
    use crate::schema::occupancy_automation_environments::dsl::*;
    occupancy_automation_environments
        .filter(automation_id.eq(automation))
        .order(environment_id.asc())
        .select(environment_id)
        .load(conn)
}

pub fn get_occupancy_automation_detail(
    conn: &mut SqliteConnection,
    automation_id: i32,
) -> Result<Option<OccupancyAutomationDetail>, diesel::result::Error> {
    match get_occupancy_automation(conn, automation_id)? {
        Some(automation) => Ok(Some(with_environments(conn, automation)?)),
        None => Ok(None),
    }
}

pub fn with_environments(
    conn: &mut SqliteConnection,
    automation: OccupancyAutomation,
) -> Result<OccupancyAutomationDetail, diesel::result::Error> {
    let environment_ids = get_automation_environment_ids(conn, automation.id)?;
    let (created_at, updated_at) = get_timestamps(conn, "occupancy_automations", automation.id)?;

    Ok(OccupancyAutomationDetail {
        id: automation.id,
        workspace_id: automation.workspace_id,
        name: automation.name,
        inactivity_timeout_minutes: automation.inactivity_timeout_minutes,
        reactivate_on_presence: automation.reactivate_on_presence,
        respect_time_routines: automation.respect_time_routines,
        is_active: automation.is_active,
        environment_ids,
        created_at,
        updated_at,
    })
}

/// Replaces every attribute and the environment set of an automation.
pub fn replace_occupancy_automation(
    conn: &mut SqliteConnection,
    automation_id: i32,
    input: &OccupancyAutomationInput,
    acting_user_id: Option<i32>,
) -> Result<OccupancyAutomation, diesel::result::Error> {
    use crate::schema::occupancy_automation_environments;
    use crate::schema::occupancy_automations::dsl::*;

    conn.transaction(|conn| {
        let current = occupancy_automations
            .find(automation_id)
            .select(OccupancyAutomation::as_select())
            .first(conn)?;

        diesel::update(occupancy_automations.find(automation_id))
            .set(&input.to_new(current.workspace_id))
            .execute(conn)?;

        diesel::delete(
            occupancy_automation_environments::table
                .filter(occupancy_automation_environments::automation_id.eq(automation_id)),
        )
        .execute(conn)?;
        link_environments(conn, automation_id, &input.environment_ids)?;

        if let Some(user_id) = acting_user_id {
            update_latest_activity_user(
                conn,
                "occupancy_automations",
                automation_id,
                "update",
                user_id,
            )?;
        }

        occupancy_automations
            .find(automation_id)
            .select(OccupancyAutomation::as_select())
            .first(conn)
    })
}

pub fn delete_occupancy_automation(
    conn: &mut SqliteConnection,
    automation_id: i32,
    acting_user_id: Option<i32>,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::occupancy_automations::dsl::*;

    enforce_foreign_keys(conn)?;
    let deleted = diesel::delete(occupancy_automations.find(automation_id)).execute(conn)?;

    if deleted > 0 {
        if let Some(user_id) = acting_user_id {
            update_latest_activity_user(
                conn,
                "occupancy_automations",
                automation_id,
                "delete",
                user_id,
            )?;
        }
    }

    Ok(deleted)
}

/// Active automations that manage the environment.
pub fn active_automations_for_environment(
    conn: &mut SqliteConnection,
    env_id: i32,
) -> Result<Vec<OccupancyAutomation>, diesel::result::Error> {
    use crate::schema::{occupancy_automation_environments, occupancy_automations};

    occupancy_automations::table
        .inner_join(occupancy_automation_environments::table)
        .filter(occupancy_automation_environments::environment_id.eq(env_id))
        .filter(occupancy_automations::is_active.eq(true))
        .order(occupancy_automations::id.asc())
        .select(OccupancyAutomation::as_select())
        .load(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comfort::ComfortBands;
    use crate::models::NewEnvironment;
    use crate::orm::environment::insert_environment;
    use crate::orm::testing::{insert_test_user, setup_test_db};
    use crate::orm::workspace::insert_workspace;

    fn night_shutdown(environment_ids: Vec<i32>) -> OccupancyAutomationInput {
        OccupancyAutomationInput {
            name: "Night shutdown".to_string(),
            inactivity_timeout_minutes: 30,
            reactivate_on_presence: None,
            respect_time_routines: Some(false),
            is_active: None,
            environment_ids,
        }
    }

    fn setup(conn: &mut SqliteConnection) -> (i32, i32) {
        let owner = insert_test_user(conn, "owner@example.com");
        let ws = insert_workspace(conn, "Warehouse", owner.id, None).unwrap();
        let env = insert_environment(
            conn,
            NewEnvironment::new(ws.id, "Dock".to_string(), false, ComfortBands::default()),
            &[],
            None,
        )
        .unwrap();
        (ws.id, env.id)
    }

    #[test]
    fn test_insert_applies_defaults() {
        let mut conn = setup_test_db();
        let (ws, env) = setup(&mut conn);

        let automation =
            insert_occupancy_automation(&mut conn, ws, &night_shutdown(vec![env, env]), None)
                .unwrap();

        assert!(automation.reactivate_on_presence);
        assert!(!automation.respect_time_routines);
        assert!(automation.is_active);
        let detail = get_occupancy_automation_detail(&mut conn, automation.id).unwrap().unwrap();
        assert_eq!(detail.environment_ids, vec![env]);
    }

    #[test]
    fn test_replace_swaps_environments() {
        let mut conn = setup_test_db();
        let (ws, env) = setup(&mut conn);
        let automation =
            insert_occupancy_automation(&mut conn, ws, &night_shutdown(vec![env]), None).unwrap();

        let mut input = night_shutdown(vec![]);
        input.inactivity_timeout_minutes = 90;
        input.is_active = Some(false);
        let updated = replace_occupancy_automation(&mut conn, automation.id, &input, None).unwrap();

        assert_eq!(updated.inactivity_timeout_minutes, 90);
        assert!(!updated.is_active);
        assert!(get_automation_environment_ids(&mut conn, automation.id).unwrap().is_empty());
    }

    #[test]
    fn test_only_active_automations_apply() {
        let mut conn = setup_test_db();
        let (ws, env) = setup(&mut conn);
        insert_occupancy_automation(&mut conn, ws, &night_shutdown(vec![env]), None).unwrap();
        let mut paused = night_shutdown(vec![env]);
        paused.is_active = Some(false);
        insert_occupancy_automation(&mut conn, ws, &paused, None).unwrap();

        assert_eq!(active_automations_for_environment(&mut conn, env).unwrap().len(), 1);
    }

    #[test]
    fn test_delete() {
        let mut conn = setup_test_db();
        let (ws, env) = setup(&mut conn);
        let automation =
            insert_occupancy_automation(&mut conn, ws, &night_shutdown(vec![env]), None).unwrap();

        assert_eq!(delete_occupancy_automation(&mut conn, automation.id, None).unwrap(), 1);
        assert!(get_occupancy_automation(&mut conn, automation.id).unwrap().is_none());
        assert!(active_automations_for_environment(&mut conn, env).unwrap().is_empty());
    }
}
