//! Workspaces, their members and invitations.
//!
//! # Authorization
//! - any member may read a workspace and list its members
//! - owners and admins manage members and invitations
//! - only the owner renames or deletes the workspace
//! - platform admins may do everything

use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::DbConn;
use crate::api::{ApiError, api_error, collection_denied, db_error, resource_denied};
use crate::logged_json::LoggedJson;
use crate::models::{
    InvitationInput, MemberRole, MemberWithUser, Workspace, WorkspaceInput, WorkspaceInvitation,
    WorkspaceMember, WorkspaceWithTimestamps,
};
use crate::orm::workspace::{
    InvitationOutcome, accept_invitation, create_invitation, delete_workspace, get_membership,
    get_workspace, get_workspace_with_timestamps, insert_workspace, list_all_workspaces,
    list_invitations, list_members, list_workspaces_for_user, remove_member, rename_workspace,
};
use crate::session_guards::{Access, AuthenticatedUser, authorize};

fn validated_name(input: &WorkspaceInput) -> Result<&str, ApiError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(api_error(Status::BadRequest, "Workspace name must not be empty"));
    }
    Ok(name)
}

/// - **URL:** `/api/1/Workspaces`
/// - **Method:** `POST`
///
/// The caller becomes the owner of the new workspace.
///
/// ```json
/// { "name": "Main Office" }
/// ```
#[post("/1/Workspaces", data = "<input>")]
pub async fn create_workspace(
    db: DbConn,
    input: LoggedJson<WorkspaceInput>,
    auth_user: AuthenticatedUser,
) -> Result<status::Created<Json<WorkspaceWithTimestamps>>, ApiError> {
    let name = validated_name(&input)?.to_string();
    let owner = auth_user.user.id;

    db.run(move |conn| {
        let workspace = insert_workspace(conn, &name, owner, Some(owner))
            .map_err(|e| db_error("creating workspace", e))?;
        let location = format!("/api/1/Workspaces/{}", workspace.id);
        match get_workspace_with_timestamps(conn, workspace.id) {
            Ok(Some(body)) => Ok(status::Created::new(location).body(Json(body))),
            Ok(None) => Err(api_error(Status::InternalServerError, "Workspace vanished after creation")),
            Err(e) => Err(db_error("loading workspace", e)),
        }
    })
    .await
}

/// - **URL:** `/api/1/Workspaces`
/// - **Method:** `GET`
///
/// Workspaces the caller belongs to; every workspace for platform admins.
#[get("/1/Workspaces")]
pub async fn list_workspaces(
    db: DbConn,
    auth_user: AuthenticatedUser,
) -> Result<Json<Vec<Workspace>>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        let found = if actor.platform_admin {
            list_all_workspaces(conn)
        } else {
            list_workspaces_for_user(conn, actor.user_id)
        };
        found.map(Json).map_err(|e| db_error("listing workspaces", e))
    })
    .await
}

#[get("/1/Workspaces/<workspace_id>")]
pub async fn get_workspace_endpoint(
    db: DbConn,
    workspace_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<WorkspaceWithTimestamps>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Read).map_err(resource_denied)?;
        match get_workspace_with_timestamps(conn, workspace_id) {
            Ok(Some(workspace)) => Ok(Json(workspace)),
            Ok(None) => Err(api_error(Status::NotFound, "Not found")),
            Err(e) => Err(db_error("loading workspace", e)),
        }
    })
    .await
}

#[put("/1/Workspaces/<workspace_id>", data = "<input>")]
pub async fn rename_workspace_endpoint(
    db: DbConn,
    workspace_id: i32,
    input: LoggedJson<WorkspaceInput>,
    auth_user: AuthenticatedUser,
) -> Result<Json<WorkspaceWithTimestamps>, ApiError> {
    let name = validated_name(&input)?.to_string();
    let actor = auth_user.actor();

    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Own).map_err(resource_denied)?;
        match get_workspace(conn, workspace_id) {
            Ok(Some(_)) => {}
            Ok(None) => return Err(api_error(Status::NotFound, "Not found")),
            Err(e) => return Err(db_error("loading workspace", e)),
        }
        rename_workspace(conn, workspace_id, &name, Some(actor.user_id))
            .map_err(|e| db_error("renaming workspace", e))?;
        match get_workspace_with_timestamps(conn, workspace_id) {
            Ok(Some(workspace)) => Ok(Json(workspace)),
            Ok(None) => Err(api_error(Status::NotFound, "Not found")),
            Err(e) => Err(db_error("loading workspace", e)),
        }
    })
    .await
}

/// Deletes the workspace with all its environments, equipment, routines,
/// automations, alerts and readings.
#[delete("/1/Workspaces/<workspace_id>")]
pub async fn delete_workspace_endpoint(
    db: DbConn,
    workspace_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Status, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Own).map_err(resource_denied)?;
        match delete_workspace(conn, workspace_id, Some(actor.user_id)) {
            Ok(0) => Err(api_error(Status::NotFound, "Not found")),
            Ok(_) => Ok(Status::NoContent),
            Err(e) => Err(db_error("deleting workspace", e)),
        }
    })
    .await
}

#[get("/1/Workspaces/<workspace_id>/Members")]
pub async fn list_members_endpoint(
    db: DbConn,
    workspace_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<Vec<MemberWithUser>>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Read).map_err(collection_denied)?;
        list_members(conn, workspace_id).map(Json).map_err(|e| db_error("listing members", e))
    })
    .await
}

/// Owners and admins remove members; any member may remove themselves.
/// The owner cannot be removed.
#[delete("/1/Workspaces/<workspace_id>/Members/<user_id>")]
pub async fn remove_member_endpoint(
    db: DbConn,
    workspace_id: i32,
    user_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Status, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        let access = if actor.user_id == user_id { Access::Read } else { Access::Write };
        authorize(conn, actor, workspace_id, access).map_err(collection_denied)?;

        let membership = match get_membership(conn, workspace_id, user_id) {
            Ok(Some(m)) => m,
            Ok(None) => return Err(api_error(Status::NotFound, "Member not found")),
            Err(e) => return Err(db_error("loading membership", e)),
        };
        if membership.member_role() == Some(MemberRole::Owner) {
            return Err(api_error(Status::Conflict, "The workspace owner cannot be removed"));
        }

        remove_member(conn, workspace_id, user_id)
            .map(|_| Status::NoContent)
            .map_err(|e| db_error("removing member", e))
    })
    .await
}

/// - **URL:** `/api/1/Workspaces/<workspace_id>/Invitations`
/// - **Method:** `POST`
///
/// ```json
/// { "email": "tech@example.com", "role": "admin" }
/// ```
#[post("/1/Workspaces/<workspace_id>/Invitations", data = "<input>")]
pub async fn create_invitation_endpoint(
    db: DbConn,
    workspace_id: i32,
    input: LoggedJson<InvitationInput>,
    auth_user: AuthenticatedUser,
) -> Result<status::Created<Json<WorkspaceInvitation>>, ApiError> {
    let email = input.email.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err(api_error(Status::BadRequest, "A valid email is required"));
    }
    let role = match input.role.as_deref() {
        None => MemberRole::Member,
        Some(raw) => raw.parse::<MemberRole>().map_err(|e| api_error(Status::BadRequest, e))?,
    };
    if role == MemberRole::Owner {
        return Err(api_error(Status::BadRequest, "Invitations cannot grant ownership"));
    }

    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Write).map_err(collection_denied)?;
        create_invitation(conn, workspace_id, &email, role)
            .map(|inv| status::Created::new("/").body(Json(inv)))
            .map_err(|e| db_error("creating invitation", e))
    })
    .await
}

#[get("/1/Workspaces/<workspace_id>/Invitations")]
pub async fn list_invitations_endpoint(
    db: DbConn,
    workspace_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<Vec<WorkspaceInvitation>>, ApiError> {
    let actor = auth_user.actor();
    db.run(move |conn| {
        authorize(conn, actor, workspace_id, Access::Write).map_err(collection_denied)?;
        list_invitations(conn, workspace_id)
            .map(Json)
            .map_err(|e| db_error("listing invitations", e))
    })
    .await
}

/// - **URL:** `/api/1/Invitations/<token>/accept`
/// - **Method:** `POST`
///
/// Only the invited email may accept. Answers 404 for unknown tokens and
/// 409 for invitations already used.
#[post("/1/Invitations/<token>/accept")]
pub async fn accept_invitation_endpoint(
    db: DbConn,
    token: String,
    auth_user: AuthenticatedUser,
) -> Result<Json<WorkspaceMember>, ApiError> {
    let user_id = auth_user.user.id;
    let email = auth_user.user.email.clone();

    db.run(move |conn| match accept_invitation(conn, &token, user_id, &email) {
        Ok(InvitationOutcome::Accepted(membership)) => Ok(Json(membership)),
        Ok(InvitationOutcome::NotFound) => Err(api_error(Status::NotFound, "Invitation not found")),
        Ok(InvitationOutcome::AlreadyAccepted) => {
            Err(api_error(Status::Conflict, "Invitation was already accepted"))
        }
        Ok(InvitationOutcome::WrongRecipient) => {
            Err(api_error(Status::Forbidden, "Invitation was sent to another email"))
        }
        Err(e) => Err(db_error("accepting invitation", e)),
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        create_workspace,
        list_workspaces,
        get_workspace_endpoint,
        rename_workspace_endpoint,
        delete_workspace_endpoint,
        list_members_endpoint,
        remove_member_endpoint,
        create_invitation_endpoint,
        list_invitations_endpoint,
        accept_invitation_endpoint
    ]
}
