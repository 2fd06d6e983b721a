pub mod alert;
mod db;
pub mod energy;
pub mod entity_activity;
pub mod environment;
pub mod equipment;
pub mod login;
pub mod logout;
pub mod occupancy_automation;
pub mod role;
#[cfg(any(test, feature = "test-staging"))]
pub mod testing;
pub mod time_routine;
pub mod user;
pub mod user_role;
pub mod workspace;

pub use db::*;
