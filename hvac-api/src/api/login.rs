//! Login, logout and the session check endpoint.

use rocket::Route;
use rocket::http::{Cookie, CookieJar, Status};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::api::{ApiError, api_error, db_error};
use crate::models::User;
use crate::orm::login::process_login;
use crate::orm::logout::revoke_session;
use crate::orm::user_role::get_user_roles;
use crate::orm::workspace::{get_membership, list_workspaces_for_user};

#[derive(Clone, Deserialize, TS)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct WorkspaceSummary {
    pub id: i32,
    pub name: String,
    pub role: String,
}

/// Returned by both `login` and `hello`.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct LoginSuccessResponse {
    pub user_id: i32,
    pub email: String,
    pub display_name: Option<String>,
    pub roles: Vec<String>,
    pub workspaces: Vec<WorkspaceSummary>,
}

async fn build_user_response(db: &DbConn, user: User) -> Result<LoginSuccessResponse, ApiError> {
    let user_id = user.id;
    let (roles, workspaces) = db
        .run(move |conn| -> Result<_, diesel::result::Error> {
            let roles = get_user_roles(conn, user_id)?;
            let mut workspaces = Vec::new();
            for workspace in list_workspaces_for_user(conn, user_id)? {
                let role = get_membership(conn, workspace.id, user_id)?
                    .map(|m| m.role)
                    .unwrap_or_default();
                workspaces.push(WorkspaceSummary { id: workspace.id, name: workspace.name, role });
            }
            Ok((roles, workspaces))
        })
        .await
        .map_err(|e| db_error("loading user profile", e))?;

    Ok(LoginSuccessResponse {
        user_id: user.id,
        email: user.email,
        display_name: user.display_name,
        roles: roles.into_iter().map(|r| r.name).collect(),
        workspaces,
    })
}

/// - **URL:** `/api/1/login`
/// - **Method:** `POST`
/// - **Authentication:** None
///
/// Sets an HTTP-only `session` cookie on success. Unknown emails and wrong
/// passwords both answer `401 {"error": "Invalid credentials"}`; blank
/// fields answer 400.
#[post("/1/login", data = "<login>")]
pub async fn login(
    db: DbConn,
    cookies: &CookieJar<'_>,
    login: Json<LoginRequest>,
) -> Result<Json<LoginSuccessResponse>, ApiError> {
    match process_login(&db, cookies, &login).await {
        Ok(user) => build_user_response(&db, user).await.map(Json),
        Err(status) if status == Status::BadRequest => Err(api_error(Status::BadRequest, "Email and password are required")),
        Err(status) => Err(api_error(status, "Invalid credentials")),
    }
}

/// - **URL:** `/api/1/logout`
/// - **Method:** `POST`
///
/// Revokes the current session and clears the cookie. Always answers 200.
#[post("/1/logout")]
pub async fn logout(db: DbConn, cookies: &CookieJar<'_>) -> Status {
    let session_id = cookies.get("session").map(|c| c.value().to_string());

    if let Some(session_id) = session_id {
        match revoke_session(&db, &session_id).await {
            Ok(true) => {}
            Ok(false) => info!("Logout with an unknown or already revoked session"),
            Err(e) => error!("Failed to revoke session: {:?}", e),
        }
        cookies.remove(Cookie::from("session"));
    }
    Status::Ok
}

/// - **URL:** `/api/1/hello`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// Same body as `login`; handy for checking whether a session is alive.
#[get("/1/hello")]
pub async fn secure_hello(
    auth_user: crate::session_guards::AuthenticatedUser,
    db: DbConn,
) -> Result<Json<LoginSuccessResponse>, ApiError> {
    build_user_response(&db, auth_user.user).await.map(Json)
}

pub fn routes() -> Vec<Route> {
    routes![login, logout, secure_hello]
}
