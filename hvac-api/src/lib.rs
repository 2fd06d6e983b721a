#[macro_use]
extern crate rocket;

use rocket::figment::value::Map;
use rocket::figment::{Figment, providers::{Env, Format, Toml}};
use rocket::fs::FileServer;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::status;
use rocket::serde::json::{Json, Value, json};
use rocket::{Build, Rocket};

pub mod admin_init_fairing;
pub mod alert_feed;
pub mod api;
pub mod automation;
pub mod comfort;
pub mod logged_json;
pub mod models;
pub mod orm;
pub use orm::DbConn;
pub mod routine_resolver;
pub mod schema;
pub mod session_guards;

#[cfg(test)]
pub mod generate_types;

pub use orm::MIGRATIONS;

/// Renders every error status as `{ "error", "path", "status" }`, so API
/// clients never receive Rocket's HTML error pages.
#[catch(default)]
fn json_catcher(code: Status, req: &Request) -> status::Custom<Json<Value>> {
    let body = json!({
        "error": code.reason().unwrap_or("Unknown Error"),
        "path": req.uri().path().to_string(),
        "status": code.code
    });
    status::Custom(code, Json(body))
}

/// Mounts every API route under `/api`, registers the JSON catcher and the
/// alert feed.
pub fn mount_api_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .manage(alert_feed::AlertFeed::new())
        .mount("/api", api::routes())
        .register("/", catchers![json_catcher])
}

fn log_rocket_info(rocket: &Rocket<Build>) {
    let figment = rocket.figment();

    if let Ok(address) = figment.extract_inner::<String>("address") {
        info!("Rocket is running at: {}", address);
    }

    if let Ok(port) = figment.extract_inner::<u16>("port") {
        info!("Rocket is listening on port: {}", port);
    }

    match figment.extract_inner::<Map<String, Value>>("databases.sqlite_db") {
        Ok(db_config) => {
            if let Some(Value::String(url)) = db_config.get("url") {
                info!("Database URL: {}", url);
            } else {
                warn!("Database URL not found in configuration");
            }
        }
        Err(e) => {
            warn!("Failed to extract database configuration: {}", e);
        }
    }
}

/// Not exercised by the tests, which build their own in-memory instance
/// with [`orm::testing::test_rocket`].
#[launch]
pub fn rocket() -> Rocket<Build> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let figment = Figment::from(rocket::Config::default())
        .merge(Toml::file("Rocket.toml").nested())
        .merge(Env::prefixed("ROCKET_").global())
        .merge(("databases.sqlite_db.url", database_url));

    let rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(orm::set_foreign_keys_fairing())
        .attach(orm::run_migrations_fairing())
        .attach(admin_init_fairing::admin_init_fairing());

    log_rocket_info(&rocket);

    let static_dir = std::env::var("HVAC_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
    mount_api_routes(rocket).mount("/", FileServer::from(static_dir).rank(10))
}
