pub mod alert;
pub mod energy_reading;
pub mod entity_activity;
pub mod environment;
pub mod equipment;
pub mod occupancy_automation;
pub mod role;
pub mod session;
pub mod time_routine;
pub mod user;
pub mod user_role;
pub mod workspace;

// Re-export models for easier access
pub use alert::*;
pub use energy_reading::*;
pub use entity_activity::*;
pub use environment::*;
pub use equipment::*;
pub use occupancy_automation::*;
pub use role::*;
pub use session::*;
pub use time_routine::*;
pub use user::*;
pub use user_role::*;
pub use workspace::*;
