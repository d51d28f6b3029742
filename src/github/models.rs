//! GitHub REST payloads (only the fields tagbot reads)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Repository {
  pub full_name: String,
  pub default_branch: String,
  pub html_url: String,
  pub ssh_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
  pub login: String,
  #[serde(default)]
  pub name: Option<String>,
  pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Label {
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
  pub tag_name: String,
  pub created_at: DateTime<Utc>,
}

/// Marker present on issues that are really pull requests
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestRef {
  #[serde(default)]
  pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
  pub number: u64,
  pub title: String,
  #[serde(default)]
  pub body: Option<String>,
  pub html_url: String,
  pub user: User,
  #[serde(default)]
  pub labels: Vec<Label>,
  #[serde(default)]
  pub closed_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub closed_by: Option<User>,
  #[serde(default)]
  pub pull_request: Option<PullRequestRef>,
}

impl Issue {
  pub fn is_pull_request(&self) -> bool {
    self.pull_request.is_some()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
  pub number: u64,
  pub title: String,
  #[serde(default)]
  pub body: Option<String>,
  pub html_url: String,
  pub user: User,
  #[serde(default)]
  pub labels: Vec<Label>,
  #[serde(default)]
  pub merged_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub merged_by: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommitEntry {
  pub sha: String,
  pub commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommitDetail {
  pub committer: Signature,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Signature {
  pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Contents {
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub encoding: String,
  #[serde(default)]
  pub size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResults {
  pub items: Vec<Issue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRelease {
  pub tag_name: String,
  pub name: String,
  pub body: String,
  pub target_commitish: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPull {
  pub title: String,
  pub body: String,
  pub head: String,
  pub base: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchEvent {
  pub event_type: String,
  pub client_payload: serde_json::Value,
}
