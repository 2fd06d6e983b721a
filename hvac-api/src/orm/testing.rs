//! Test harness: in-memory databases and a fully wired Rocket instance.
//!
//! Only compiled for unit tests and with the `test-staging` feature, which the
//! integration tests in `tests/` require.

use std::sync::Mutex;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rocket::figment::{
    util::map,
    value::{Map, Value},
};
use rocket::{Build, Rocket, fairing::AdHoc};

use super::db::{DbConn, run_pending_migrations, set_foreign_keys};
use crate::admin_init_fairing::admin_init_fairing;
use crate::models::{MemberRole, User};
use crate::orm::login::hash_password;
use crate::orm::role::USER_ROLE;
use crate::orm::user::{get_user_by_email, insert_user};
use crate::orm::user_role::assign_user_role_by_name;
use crate::orm::workspace::{get_workspace_by_name, insert_workspace, upsert_member};

/// Seeded workspace shared by owner/admin/member test accounts.
pub const TEST_WORKSPACE: &str = "Acme HQ";
/// Seeded workspace owned by the outsider account.
pub const OTHER_WORKSPACE: &str = "Globex Plant";

/// Test accounts as (email, password).
pub const OWNER: (&str, &str) = ("owner@acme.test", "ownerpass");
pub const WORKSPACE_ADMIN: (&str, &str) = ("admin@acme.test", "adminpass");
pub const MEMBER: (&str, &str) = ("member@acme.test", "memberpass");
pub const OUTSIDER: (&str, &str) = ("owner@globex.test", "outsiderpass");
/// Bootstrap platform admin created by the admin init fairing.
pub const PLATFORM_ADMIN: (&str, &str) = ("superadmin@example.com", "admin");

/// Configures SQLite for faster, non-durable operation in tests.
///
/// # Panics
/// Panics if the PRAGMA commands fail to execute
fn set_sqlite_test_pragmas(conn: &mut SqliteConnection) {
    conn.batch_execute(
        r#"
        PRAGMA synchronous = OFF;
        PRAGMA journal_mode = OFF;
        "#,
    )
    .expect("Failed to set SQLite PRAGMAs");
}

fn set_sqlite_test_pragmas_fairing() -> AdHoc {
    AdHoc::on_ignite("Set SQLite Test Pragmas", |rocket| async {
        let conn = DbConn::get_one(&rocket).await.expect("database connection for pragmas");
        conn.run(|c| {
            set_sqlite_test_pragmas(c);
        })
        .await;
        rocket
    })
}

/// Seeds the accounts and workspaces every integration test relies on.
fn test_data_init_fairing() -> AdHoc {
    AdHoc::on_ignite("Test Data Initialization", |rocket| async {
        let conn = DbConn::get_one(&rocket)
            .await
            .expect("database connection for test data initialization");

        conn.run(|c| match create_test_data(c) {
            Ok(()) => info!("[test-data-init] Test data initialization completed"),
            Err(e) => error!("[test-data-init] ERROR: Failed to create test data: {:?}", e),
        })
        .await;

        rocket
    })
}

fn create_test_data(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    let owner = create_test_user(conn, OWNER.0, OWNER.1)?;
    let admin = create_test_user(conn, WORKSPACE_ADMIN.0, WORKSPACE_ADMIN.1)?;
    let member = create_test_user(conn, MEMBER.0, MEMBER.1)?;
    let outsider = create_test_user(conn, OUTSIDER.0, OUTSIDER.1)?;

    if get_workspace_by_name(conn, TEST_WORKSPACE)?.is_none() {
        let acme = insert_workspace(conn, TEST_WORKSPACE, owner.id, None)?;
        upsert_member(conn, acme.id, admin.id, MemberRole::Admin)?;
        upsert_member(conn, acme.id, member.id, MemberRole::Member)?;
    }
    if get_workspace_by_name(conn, OTHER_WORKSPACE)?.is_none() {
        insert_workspace(conn, OTHER_WORKSPACE, outsider.id, None)?;
    }

    Ok(())
}

fn create_test_user(
    conn: &mut SqliteConnection,
    email: &str,
    password: &str,
) -> Result<User, diesel::result::Error> {
    if let Some(existing) = get_user_by_email(conn, email)? {
        return Ok(existing);
    }
    let user = insert_user(conn, email, hash_password(password), None)?;
    assign_user_role_by_name(conn, user.id, USER_ROLE)?;
    Ok(user)
}

/// Creates a Rocket instance backed by a unique in-memory SQLite database.
///
/// The returned instance has migrations applied, the platform admin
/// bootstrapped, the test accounts and workspaces seeded and all API routes
/// mounted.
pub fn test_rocket() -> Rocket<Build> {
    use uuid::Uuid;

    let unique_db_name = format!("file:test_db_{}?mode=memory&cache=shared", Uuid::new_v4());

    let db_config: Map<_, Value> = map! {
        "url" => unique_db_name.into(),
        "pool_size" => 5.into(),
        "timeout" => 5.into(),
    };
    let databases = map!["sqlite_db" => db_config];

    let figment = rocket::Config::figment().merge(("databases", databases));

    let rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(super::db::set_foreign_keys_fairing())
        .attach(set_sqlite_test_pragmas_fairing())
        .attach(super::db::run_migrations_fairing())
        .attach(admin_init_fairing())
        .attach(test_data_init_fairing());

    crate::mount_api_routes(rocket)
}

/// Creates an in-memory SQLite connection with all migrations applied.
///
/// Each call returns a new, independent database.
pub fn setup_test_db() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:")
        .expect("Failed to create in-memory SQLite database");
    set_foreign_keys(&mut conn);
    run_pending_migrations(&mut conn);
    conn
}

/// Inserts a user with the `user` role and a throwaway password.
pub fn insert_test_user(conn: &mut SqliteConnection, email: &str) -> User {
    create_test_user(conn, email, "password").expect("insert test user")
}

/// Async wrapper around a test connection, mirroring `DbConn::run`.
pub struct FakeDbConn(Mutex<SqliteConnection>);

impl FakeDbConn {
    pub fn new(conn: SqliteConnection) -> Self {
        FakeDbConn(Mutex::new(conn))
    }

    pub async fn run<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut conn = self.0.lock().expect("test connection lock poisoned");
        f(&mut conn)
    }
}

/// Fresh migrated database behind a [`FakeDbConn`].
pub fn setup_test_dbconn() -> FakeDbConn {
    FakeDbConn::new(setup_test_db())
}
