//! CLI command implementations

pub mod run;
pub mod secrets;
pub mod status;

pub use run::{OnceArgs, RunArgs, SeedArgs};
pub use secrets::SecretsCommand;
pub use status::StatusArgs;
