//! Core building blocks shared by every tagbot command
//!
//! - **config**: Action inputs resolved from `INPUT_*` variables
//! - **context**: Inputs plus runner environment, built once per run
//! - **error**: Error types with contextual help messages and exit codes
//! - **manifest**: The `action.yml` interface as data
//! - **vcs**: Git operations on the cloned repository (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod manifest;
pub mod vcs;
