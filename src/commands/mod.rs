// ABOUTME: Command module aggregator for the skiff CLI.
// ABOUTME: Re-exports the deploy, redeploy, restart, delete, and status handlers.

mod delete;
mod deploy;
mod restart;
mod runtime_connection;
mod status;

pub use delete::delete;
pub use deploy::{deploy, redeploy};
pub use restart::restart;
pub use status::status;
