//! CLI commands for tagbot
//!
//! - **run**: find newly registered versions and release them (the action's entrypoint)
//! - **manifest**: print the canonical `action.yml` or check one against it

pub mod manifest;
pub mod run;

pub use manifest::run_manifest;
pub use run::{RunArgs, run_action};
