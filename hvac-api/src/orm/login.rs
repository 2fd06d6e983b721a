//! Database operations for user authentication and session management.
//!
//! Functions here are generic over [`DbRunner`] so they run against both the
//! pooled `DbConn` and the in-memory test connection.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use uuid::Uuid;

use crate::DbConn;
use crate::models::{NewSession, User};
#[cfg(any(test, feature = "test-staging"))]
use crate::orm::testing::FakeDbConn;
use crate::orm::user::get_user_by_email;
use crate::schema::sessions;

/// How long a session stays valid after login.
pub const SESSION_LIFETIME_DAYS: i64 = 30;

/// Runs a closure against a database connection, sync-pool style.
pub trait DbRunner {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static;
}

impl DbRunner for DbConn {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        DbConn::run(self, f)
    }
}

#[cfg(any(test, feature = "test-staging"))]
impl DbRunner for FakeDbConn {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        FakeDbConn::run(self, f)
    }
}

fn generate_session_token() -> String {
    Uuid::new_v4().to_string()
}

/// Finds a user by email address (case-insensitive).
///
/// # Returns
/// * `Ok(Some(User))` - User found with matching email
/// * `Ok(None)` - No user found with that email
/// * `Err(Status::InternalServerError)` - Database query failed
pub async fn find_user_by_email<D: DbRunner>(db: &D, email: &str) -> Result<Option<User>, Status> {
    let email = email.to_owned();
    db.run(move |conn| get_user_by_email(conn, &email))
        .await
        .map_err(|e| {
            error!("Database error looking up user: {:?}", e);
            Status::InternalServerError
        })
}

/// Verifies a password against a stored Argon2 hash. A malformed hash never
/// verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash could not be parsed: {}", e);
            false
        }
    }
}

/// Creates a new session row and returns its token.
pub async fn create_and_store_session<D: DbRunner>(db: &D, user_id: i32) -> Result<String, Status> {
    let session_token = generate_session_token();
    let now = Utc::now().naive_utc();

    let new_session = NewSession {
        id: session_token.clone(),
        user_id,
        created_at: now,
        expires_at: Some(now + Duration::days(SESSION_LIFETIME_DAYS)),
        revoked: false,
    };

    db.run(move |conn| {
        diesel::insert_into(sessions::table)
            .values(&new_session)
            .execute(conn)
    })
    .await
    .map_err(|e| {
        error!("Failed to store session: {:?}", e);
        Status::InternalServerError
    })?;

    Ok(session_token)
}

fn session_cookie(session_token: &str) -> Cookie<'static> {
    Cookie::build(("session", session_token.to_string()))
        .http_only(true)
        .secure(!cfg!(test))
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn set_session_cookie(cookies: &CookieJar<'_>, session_token: &str) {
    cookies.add(session_cookie(session_token));
}

/// Full login: validates input, checks the password, stores a session and
/// sets the session cookie.
///
/// Unknown users and wrong passwords both yield `Unauthorized`.
pub async fn process_login<D: DbRunner>(
    db: &D,
    cookies: &CookieJar<'_>,
    login: &crate::api::login::LoginRequest,
) -> Result<User, Status> {
    if login.email.trim().is_empty() || login.password.trim().is_empty() {
        return Err(Status::BadRequest);
    }

    let user = match find_user_by_email(db, &login.email).await? {
        Some(user) => user,
        None => return Err(Status::Unauthorized),
    };

    if !verify_password(&login.password, &user.password_hash) {
        return Err(Status::Unauthorized);
    }

    let session_token = create_and_store_session(db, user.id).await?;
    set_session_cookie(cookies, &session_token);

    Ok(user)
}

/// Hashes a password using Argon2 with a random salt.
///
/// # Panics
/// Panics if hashing fails, which does not happen with default parameters.
pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("Hashing should succeed")
        .to_string()
}
