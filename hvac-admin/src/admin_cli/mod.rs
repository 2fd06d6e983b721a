pub mod environment_commands;
pub mod routine_commands;
pub mod user_commands;
pub mod utils;
pub mod workspace_commands;
