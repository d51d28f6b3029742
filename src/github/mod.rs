//! GitHub access
//!
//! Release logic talks to GitHub only through [`GitHubApi`], so tests can swap the
//! REST client for an in-memory fake.

pub mod client;
pub mod models;

#[cfg(test)]
pub mod fake;

pub use client::GitHubClient;
pub use models::{DispatchEvent, Issue, NewPull, NewRelease, PullRequest, Release, Repository, User};

use crate::core::error::TagBotResult;
use chrono::{DateTime, Utc};

/// The slice of the GitHub REST API tagbot uses
pub trait GitHubApi {
  /// Repository metadata
  fn repository(&self, repo: &str) -> TagBotResult<Repository>;

  /// Decoded text of a file, at `git_ref` or the default branch; `None` if absent
  fn file_contents(&self, repo: &str, path: &str, git_ref: Option<&str>) -> TagBotResult<Option<String>>;

  /// SHA of the newest commit on the default branch made before `until`
  fn latest_commit_before(&self, repo: &str, until: DateTime<Utc>) -> TagBotResult<Option<String>>;

  /// Committer date of a commit
  fn commit_date(&self, repo: &str, sha: &str) -> TagBotResult<DateTime<Utc>>;

  /// Whether a release exists for a tag
  fn release_exists(&self, repo: &str, tag: &str) -> TagBotResult<bool>;

  /// All releases
  fn releases(&self, repo: &str) -> TagBotResult<Vec<Release>>;

  fn create_release(&self, repo: &str, release: &NewRelease) -> TagBotResult<()>;

  fn create_pull(&self, repo: &str, pull: &NewPull) -> TagBotResult<()>;

  /// Send a repository dispatch event; returns the HTTP status
  fn create_dispatch(&self, repo: &str, event: &DispatchEvent) -> TagBotResult<u16>;

  /// Closed issues and pull requests updated since `since`
  fn closed_issues(&self, repo: &str, since: DateTime<Utc>) -> TagBotResult<Vec<Issue>>;

  /// A single issue, including `closed_by`
  fn issue(&self, repo: &str, number: u64) -> TagBotResult<Issue>;

  fn pull(&self, repo: &str, number: u64) -> TagBotResult<PullRequest>;

  /// A user's profile, including the display name
  fn user(&self, login: &str) -> TagBotResult<User>;

  /// Issue search (`/search/issues`)
  fn search_issues(&self, query: &str) -> TagBotResult<Vec<Issue>>;
}
