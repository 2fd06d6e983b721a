use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, QueryableByName, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::{workspace_invitations, workspace_members, workspaces};

#[derive(
    Queryable, Selectable, Identifiable, QueryableByName, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(table_name = workspaces)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Workspace {
    pub id: i32,
    pub name: String,
    pub owner_id: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = workspaces)]
pub struct NewWorkspace {
    pub name: String,
    pub owner_id: i32,
}

// For API inputs and validation
#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct WorkspaceInput {
    pub name: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct WorkspaceWithTimestamps {
    pub id: i32,
    pub name: String,
    pub owner_id: i32,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

/// Role of a user inside one workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MemberRole {
    Member,
    Admin,
    Owner,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Admin => "admin",
            MemberRole::Member => "member",
        }
    }

    /// Owners and admins may change workspace resources.
    pub fn can_write(&self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}

impl std::str::FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(MemberRole::Owner),
            "admin" => Ok(MemberRole::Admin),
            "member" => Ok(MemberRole::Member),
            _ => Err(format!("Invalid member role: {}", s)),
        }
    }
}

#[derive(Queryable, Selectable, Associations, Debug, Clone, Serialize, TS)]
#[diesel(belongs_to(Workspace))]
#[diesel(table_name = workspace_members)]
#[diesel(primary_key(workspace_id, user_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct WorkspaceMember {
    pub workspace_id: i32,
    pub user_id: i32,
    pub role: String,
}

impl WorkspaceMember {
    pub fn member_role(&self) -> Option<MemberRole> {
        self.role.parse().ok()
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = workspace_members)]
pub struct NewWorkspaceMember {
    pub workspace_id: i32,
    pub user_id: i32,
    pub role: String,
}

/// Membership joined with the user's identity, for member listings.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct MemberWithUser {
    pub user_id: i32,
    pub email: String,
    pub display_name: Option<String>,
    pub role: String,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, TS)]
#[diesel(belongs_to(Workspace))]
#[diesel(table_name = workspace_invitations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct WorkspaceInvitation {
    pub id: i32,
    pub workspace_id: i32,
    pub email: String,
    pub role: String,
    pub token: String,
    pub accepted: bool,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = workspace_invitations)]
pub struct NewWorkspaceInvitation {
    pub workspace_id: i32,
    pub email: String,
    pub role: String,
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct InvitationInput {
    pub email: String,
    /// `admin` or `member`; defaults to `member`.
    pub role: Option<String>,
}
