//! Run context - inputs plus runner environment, built once in main
//!
//! ```text
//! main.rs:
//!   ActionContext::build() -> &ActionContext
//!   |
//!   v
//! commands/run.rs:
//!   fn run(ctx: &ActionContext)
//! ```

use crate::core::config::Inputs;
use crate::core::error::{ConfigError, TagBotError, TagBotResult};
use crate::core::manifest;

/// Default REST endpoint when `GITHUB_API_URL` is unset
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default web host when `GITHUB_SERVER_URL` is unset
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Everything a run needs to know before touching the network
#[derive(Debug, Clone)]
pub struct ActionContext {
  /// Repository being released (`owner/name`)
  pub repository: String,

  /// GitHub REST API base URL, without trailing slash
  pub api_url: String,

  /// GitHub web host, without trailing slash
  pub server_url: String,

  /// Log what would happen without creating anything
  pub dry_run: bool,

  /// Resolved action inputs
  pub inputs: Inputs,
}

impl ActionContext {
  /// Combine resolved inputs with the runner environment
  pub fn build(
    inputs: Inputs,
    repository: Option<String>,
    api_url: &str,
    server_url: &str,
    dry_run: bool,
  ) -> TagBotResult<Self> {
    let repository = repository.filter(|r| !r.trim().is_empty()).ok_or_else(|| {
      TagBotError::Config(ConfigError::MissingEnv {
        name: "GITHUB_REPOSITORY".to_string(),
      })
    })?;

    if !manifest::is_repository_name(&repository) {
      return Err(TagBotError::Config(ConfigError::InvalidInput {
        name: "repository".to_string(),
        value: repository,
        expected: "a repository in the form owner/name".to_string(),
      }));
    }

    Ok(Self {
      repository,
      api_url: api_url.trim_end_matches('/').to_string(),
      server_url: server_url.trim_end_matches('/').to_string(),
      dry_run,
      inputs,
    })
  }

  /// Token-authenticated HTTPS clone URL for a repository
  pub fn clone_url(&self, repo: &str) -> String {
    let token = self.inputs.token.expose();
    match self.server_url.split_once("://") {
      Some((scheme, host)) => format!("{}://oauth2:{}@{}/{}", scheme, token, host, repo),
      None => format!("https://oauth2:{}@{}/{}", token, self.server_url, repo),
    }
  }

  /// Host name used for `ssh-keyscan`
  pub fn ssh_host(&self) -> &str {
    let host = self
      .server_url
      .split_once("://")
      .map(|(_, rest)| rest)
      .unwrap_or(&self.server_url);
    host.split(['/', ':']).next().unwrap_or(host)
  }
}
