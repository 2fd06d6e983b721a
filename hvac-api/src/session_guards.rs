//! Session authentication and workspace authorization.
//!
//! [`AuthenticatedUser`] validates the `session` cookie. Workspace-scoped
//! checks go through [`authorize`], which runs inside `db.run` closures and
//! therefore works on the plain, `Copy` [`Actor`] rather than the guard.
//!
//! ```rust,ignore
//! #[get("/1/Workspaces/<id>/Environments")]
//! async fn list(db: DbConn, user: AuthenticatedUser, id: i32) -> Result<..> {
//!     let actor = user.actor();
//!     db.run(move |conn| {
//!         authorize(conn, actor, id, Access::Read)?;
//!         ...
//!     }).await
//! }
//! ```

use chrono::Utc;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use thiserror::Error;

use crate::DbConn;
use crate::models::{MemberRole, Role, Session, User};
use crate::orm::role::PLATFORM_ADMIN_ROLE;
use crate::orm::user_role::get_user_roles;
use crate::orm::workspace::get_membership;
use crate::schema::{sessions, users};

/// A logged-in user with the platform roles they carry.
///
/// The guard fails with `401 Unauthorized` when the cookie is missing, the
/// session is unknown, revoked or expired, or the user has no roles.
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub user: User,
    pub roles: Vec<Role>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = match request.guard::<DbConn>().await {
            Outcome::Success(db) => db,
            _ => return Outcome::Error((Status::InternalServerError, ())),
        };

        let session_id = match request.cookies().get("session") {
            Some(cookie) => cookie.value().to_string(),
            None => return Outcome::Error((Status::Unauthorized, ())),
        };

        let lookup = db
            .run(move |conn| -> Result<Option<(User, Vec<Role>)>, diesel::result::Error> {
                let session = sessions::table
                    .filter(sessions::id.eq(&session_id))
                    .filter(sessions::revoked.eq(false))
                    .filter(
                        sessions::expires_at
                            .is_null()
                            .or(sessions::expires_at.gt(Utc::now().naive_utc())),
                    )
                    .select(Session::as_select())
                    .first(conn)
                    .optional()?;
                let session = match session {
                    Some(s) => s,
                    None => return Ok(None),
                };

                let user = users::table
                    .find(session.user_id)
                    .select(User::as_select())
                    .first(conn)
                    .optional()?;
                match user {
                    Some(user) => {
                        let roles = get_user_roles(conn, user.id)?;
                        Ok(Some((user, roles)))
                    }
                    None => Ok(None),
                }
            })
            .await;

        match lookup {
            Ok(Some((user, roles))) if !roles.is_empty() => {
                Outcome::Success(AuthenticatedUser { user, roles })
            }
            Ok(_) => Outcome::Error((Status::Unauthorized, ())),
            Err(e) => {
                error!("Database error authenticating session: {:?}", e);
                Outcome::Error((Status::Unauthorized, ()))
            }
        }
    }
}

impl AuthenticatedUser {
    pub fn has_role(&self, role_name: &str) -> bool {
        self.roles.iter().any(|r| r.name == role_name)
    }

    pub fn has_any_role(&self, role_names: &[&str]) -> bool {
        role_names.iter().any(|required| self.has_role(required))
    }

    pub fn is_platform_admin(&self) -> bool {
        self.has_role(PLATFORM_ADMIN_ROLE)
    }

    pub fn actor(&self) -> Actor {
        Actor { user_id: self.user.id, platform_admin: self.is_platform_admin() }
    }
}

macro_rules! create_role_guard {
    ($name:ident, $role:expr) => {
        #[derive(Debug)]
        pub struct $name {
            pub user: User,
            pub roles: Vec<Role>,
        }

        #[rocket::async_trait]
        impl<'r> FromRequest<'r> for $name {
            type Error = ();

            async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
                let auth_user = match AuthenticatedUser::from_request(request).await {
                    Outcome::Success(user) => user,
                    Outcome::Error(e) => return Outcome::Error(e),
                    Outcome::Forward(f) => return Outcome::Forward(f),
                };

                if auth_user.has_role($role) {
                    Outcome::Success($name { user: auth_user.user, roles: auth_user.roles })
                } else {
                    Outcome::Error((Status::Forbidden, ()))
                }
            }
        }
    };
}

// Requires the "platform-admin" role; 403 otherwise.
create_role_guard!(PlatformAdminUser, "platform-admin");

/// Who is acting, reduced to what authorization needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub platform_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    /// Create, update and delete inside the workspace.
    Write,
    /// Rename or delete the workspace itself.
    Own,
}

#[derive(Debug, Error)]
pub enum AccessDenied {
    #[error("not a member of this workspace")]
    NotMember,
    #[error("insufficient workspace role")]
    InsufficientRole,
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl AccessDenied {
    /// Status for a single resource: non-members learn nothing about its
    /// existence.
    pub fn resource_status(&self) -> Status {
        match self {
            AccessDenied::NotMember => Status::NotFound,
            AccessDenied::InsufficientRole => Status::Forbidden,
            AccessDenied::Database(_) => Status::InternalServerError,
        }
    }

    /// Status for workspace-scoped collections.
    pub fn collection_status(&self) -> Status {
        match self {
            AccessDenied::NotMember | AccessDenied::InsufficientRole => Status::Forbidden,
            AccessDenied::Database(_) => Status::InternalServerError,
        }
    }
}

/// Effective role of the actor in a workspace. Platform admins act as owners
/// everywhere.
pub fn workspace_role(
    conn: &mut SqliteConnection,
    actor: Actor,
    ws_id: i32,
) -> Result<Option<MemberRole>, diesel::result::Error> {
    if actor.platform_admin {
        return Ok(Some(MemberRole::Owner));
    }
    Ok(get_membership(conn, ws_id, actor.user_id)?.and_then(|m| m.member_role()))
}

pub fn authorize(
    conn: &mut SqliteConnection,
    actor: Actor,
    ws_id: i32,
    access: Access,
) -> Result<MemberRole, AccessDenied> {
    let role = workspace_role(conn, actor, ws_id)?.ok_or(AccessDenied::NotMember)?;
    let allowed = match access {
        Access::Read => true,
        Access::Write => role.can_write(),
        Access::Own => role == MemberRole::Owner,
    };
    if allowed { Ok(role) } else { Err(AccessDenied::InsufficientRole) }
}
