//! Workspaces, their members and pending invitations.

use diesel::prelude::*;
use uuid::Uuid;

use crate::models::{
    MemberRole, MemberWithUser, NewWorkspace, NewWorkspaceInvitation, NewWorkspaceMember,
    Workspace, WorkspaceInvitation, WorkspaceMember, WorkspaceWithTimestamps,
};
use crate::orm::db::{enforce_foreign_keys, last_insert_rowid};
use crate::orm::entity_activity::{get_timestamps, update_latest_activity_user};

/// Creates a workspace and makes `owner` its owner member in one transaction.
pub fn insert_workspace(
    conn: &mut SqliteConnection,
    workspace_name: &str,
    owner: i32,
    acting_user_id: Option<i32>,
) -> Result<Workspace, diesel::result::Error> {
    use crate::schema::workspace_members;
    use crate::schema::workspaces::dsl::*;

    conn.transaction(|conn| {
        let new_workspace = NewWorkspace { name: workspace_name.trim().to_string(), owner_id: owner };
        diesel::insert_into(workspaces).values(&new_workspace).execute(conn)?;
        let workspace_id = last_insert_rowid(conn)?;

        diesel::insert_into(workspace_members::table)
            .values(&NewWorkspaceMember {
                workspace_id,
                user_id: owner,
                role: MemberRole::Owner.as_str().to_string(),
            })
            .execute(conn)?;

        if let Some(user_id) = acting_user_id {
            update_latest_activity_user(conn, "workspaces", workspace_id, "create", user_id)?;
        }

        workspaces.find(workspace_id).select(Workspace::as_select()).first(conn)
    })
}

pub fn get_workspace(
    conn: &mut SqliteConnection,
    workspace_id: i32,
) -> Result<Option<Workspace>, diesel::result::Error> {
    use crate::schema::workspaces::dsl::*;
    workspaces.find(workspace_id).select(Workspace::as_select()).first(conn).optional()
}

/// Gets a workspace by name (case-insensitive).
pub fn get_workspace_by_name(
    conn: &mut SqliteConnection,
    workspace_name: &str,
) -> Result<Option<Workspace>, diesel::result::Error> {
    diesel::sql_query(
        "SELECT id, name, owner_id FROM workspaces WHERE LOWER(name) = LOWER(?) ORDER BY id LIMIT 1",
    )
    .bind::<diesel::sql_types::Text, _>(workspace_name.trim())
    .get_result::<Workspace>(conn)
    .optional()
}

pub fn list_all_workspaces(
    conn: &mut SqliteConnection,
) -> Result<Vec<Workspace>, diesel::result::Error> {
    use crate::schema::workspaces::dsl::*;
    workspaces.order(id.asc()).select(Workspace::as_select()).load(conn)
}

/// Workspaces the user belongs to, in any role.
pub fn list_workspaces_for_user(
    conn: &mut SqliteConnection,
    member_user_id: i32,
) -> Result<Vec<Workspace>, diesel::result::Error> {
    use crate::schema::{workspace_members, workspaces};

    workspaces::table
        .inner_join(workspace_members::table)
        .filter(workspace_members::user_id.eq(member_user_id))
        .order(workspaces::id.asc())
        .select(Workspace::as_select())
        .load(conn)
}

pub fn rename_workspace(
    conn: &mut SqliteConnection,
    workspace_id: i32,
    new_name: &str,
    acting_user_id: Option<i32>,
) -> Result<Workspace, diesel::result::Error> {
    use crate::schema::workspaces::dsl::*;

    diesel::update(workspaces.find(workspace_id))
        .set(name.eq(new_name.trim()))
        .execute(conn)?;

    if let Some(user_id) = acting_user_id {
        update_latest_activity_user(conn, "workspaces", workspace_id, "update", user_id)?;
    }

    workspaces.find(workspace_id).select(Workspace::as_select()).first(conn)
}

/// Deletes a workspace and, through cascades, everything it contains.
pub fn delete_workspace(
    conn: &mut SqliteConnection,
    workspace_id: i32,
    acting_user_id: Option<i32>,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::workspaces::dsl::*;

    enforce_foreign_keys(conn)?;
    let deleted = diesel::delete(workspaces.find(workspace_id)).execute(conn)?;

    if deleted > 0 {
        if let Some(user_id) = acting_user_id {
            update_latest_activity_user(conn, "workspaces", workspace_id, "delete", user_id)?;
        }
    }

    Ok(deleted)
}

pub fn get_workspace_with_timestamps(
    conn: &mut SqliteConnection,
    workspace_id: i32,
) -> Result<Option<WorkspaceWithTimestamps>, diesel::result::Error> {
    let workspace = match get_workspace(conn, workspace_id)? {
        Some(w) => w,
        None => return Ok(None),
    };
    let (created_at, updated_at) = get_timestamps(conn, "workspaces", workspace_id)?;

    Ok(Some(WorkspaceWithTimestamps {
        id: workspace.id,
        name: workspace.name,
        owner_id: workspace.owner_id,
        created_at,
        updated_at,
    }))
}

pub fn get_membership(
    conn: &mut SqliteConnection,
    ws_id: i32,
    member_user_id: i32,
) -> Result<Option<WorkspaceMember>, diesel::result::Error> {
    use crate::schema::workspace_members::dsl::*;

    workspace_members
        .filter(workspace_id.eq(ws_id))
        .filter(user_id.eq(member_user_id))
        .select(WorkspaceMember::as_select())
        .first(conn)
        .optional()
}

/// Adds a user to a workspace, or changes the role of an existing member.
pub fn upsert_member(
    conn: &mut SqliteConnection,
    ws_id: i32,
    member_user_id: i32,
    member_role: MemberRole,
) -> Result<WorkspaceMember, diesel::result::Error> {
    use crate::schema::workspace_members::dsl::*;

    diesel::insert_into(workspace_members)
        .values(&NewWorkspaceMember {
            workspace_id: ws_id,
            user_id: member_user_id,
            role: member_role.as_str().to_string(),
        })
        .on_conflict((workspace_id, user_id))
        .do_update()
        .set(role.eq(member_role.as_str()))
        .execute(conn)?;

    workspace_members
        .filter(workspace_id.eq(ws_id))
        .filter(user_id.eq(member_user_id))
        .select(WorkspaceMember::as_select())
        .first(conn)
}

pub fn list_members(
    conn: &mut SqliteConnection,
    ws_id: i32,
) -> Result<Vec<MemberWithUser>, diesel::result::Error> {
    use crate::schema::{users, workspace_members};

    let rows = workspace_members::table
        .inner_join(users::table)
        .filter(workspace_members::workspace_id.eq(ws_id))
        .order(users::id.asc())
        .select((users::id, users::email, users::display_name, workspace_members::role))
        .load::<(i32, String, Option<String>, String)>(conn)?;

    Ok(rows
        .into_iter()
        .map(|(user_id, email, display_name, role)| MemberWithUser {
            user_id,
            email,
            display_name,
            role,
        })
        .collect())
}

pub fn remove_member(
    conn: &mut SqliteConnection,
    ws_id: i32,
    member_user_id: i32,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::workspace_members::dsl::*;

    diesel::delete(
        workspace_members.filter(workspace_id.eq(ws_id)).filter(user_id.eq(member_user_id)),
    )
    .execute(conn)
}

/// Creates an invitation with a fresh random token.
pub fn create_invitation(
    conn: &mut SqliteConnection,
    ws_id: i32,
    invitee_email: &str,
    invitee_role: MemberRole,
) -> Result<WorkspaceInvitation, diesel::result::Error> {
    use crate::schema::workspace_invitations::dsl::*;

    let new_invitation = NewWorkspaceInvitation {
        workspace_id: ws_id,
        email: invitee_email.trim().to_lowercase(),
        role: invitee_role.as_str().to_string(),
        token: Uuid::new_v4().to_string(),
    };
    diesel::insert_into(workspace_invitations).values(&new_invitation).execute(conn)?;
    let invitation_id = last_insert_rowid(conn)?;

    workspace_invitations
        .find(invitation_id)
        .select(WorkspaceInvitation::as_select())
        .first(conn)
}

pub fn list_invitations(
    conn: &mut SqliteConnection,
    ws_id: i32,
) -> Result<Vec<WorkspaceInvitation>, diesel::result::Error> {
    use crate::schema::workspace_invitations::dsl::*;

    workspace_invitations
        .filter(workspace_id.eq(ws_id))
        .order(id.asc())
        .select(WorkspaceInvitation::as_select())
        .load(conn)
}

/// Result of trying to accept an invitation.
#[derive(Debug)]
pub enum InvitationOutcome {
    Accepted(WorkspaceMember),
    NotFound,
    AlreadyAccepted,
    /// The invitation was addressed to another email.
    WrongRecipient,
}

/// Accepts an invitation on behalf of `user`, creating the membership.
///
/// An existing member keeps the higher of their current role and the
/// invited role.
pub fn accept_invitation(
    conn: &mut SqliteConnection,
    invitation_token: &str,
    accepting_user_id: i32,
    accepting_email: &str,
) -> Result<InvitationOutcome, diesel::result::Error> {
    use crate::schema::workspace_invitations::dsl::*;

    conn.transaction(|conn| {
        let invitation = match workspace_invitations
            .filter(token.eq(invitation_token))
            .select(WorkspaceInvitation::as_select())
            .first(conn)
            .optional()?
        {
            Some(inv) => inv,
            None => return Ok(InvitationOutcome::NotFound),
        };

        if invitation.accepted {
            return Ok(InvitationOutcome::AlreadyAccepted);
        }
        if !invitation.email.eq_ignore_ascii_case(accepting_email.trim()) {
            return Ok(InvitationOutcome::WrongRecipient);
        }

        let invited_role = invitation.role.parse::<MemberRole>().unwrap_or(MemberRole::Member);
        let current_role = get_membership(conn, invitation.workspace_id, accepting_user_id)?
            .and_then(|m| m.member_role());
        let granted = match current_role {
            Some(existing) if existing > invited_role => existing,
            _ => invited_role,
        };

        let membership =
            upsert_member(conn, invitation.workspace_id, accepting_user_id, granted)?;

        diesel::update(workspace_invitations.find(invitation.id))
            .set(accepted.eq(true))
            .execute(conn)?;

        Ok(InvitationOutcome::Accepted(membership))
    })
}
