// ABOUTME: Library root for skiff - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod build;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod output;
pub mod runtime;
pub mod source;
pub mod store;
pub mod types;
