//! In-memory GitHub for unit tests

use super::GitHubApi;
use super::models::{DispatchEvent, Issue, NewPull, NewRelease, PullRequest, Release, Repository, User};
use crate::core::error::{ApiError, TagBotError, TagBotResult};
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::HashMap;

/// Canned responses plus a record of every write
#[derive(Default)]
pub struct FakeGitHub {
  pub repositories: HashMap<String, Repository>,
  /// (repo, path, ref) -> content; a `None` ref is the default branch
  pub files: HashMap<(String, String, Option<String>), String>,
  /// repo -> (commit date, sha)
  pub commits: HashMap<String, Vec<(DateTime<Utc>, String)>>,
  pub releases: HashMap<String, Vec<Release>>,
  pub issues: HashMap<String, Vec<Issue>>,
  pub pulls: HashMap<(String, u64), PullRequest>,
  pub search_results: HashMap<String, Vec<Issue>>,
  /// Profiles by login; unknown logins have no display name
  pub users: HashMap<String, User>,
  pub dispatch_status: Option<u16>,

  pub created_releases: RefCell<Vec<(String, NewRelease)>>,
  pub created_pulls: RefCell<Vec<(String, NewPull)>>,
  pub dispatches: RefCell<Vec<(String, DispatchEvent)>>,
  pub searches: RefCell<Vec<String>>,
  pub user_lookups: RefCell<Vec<String>>,
}

impl FakeGitHub {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_repository(&mut self, name: &str, default_branch: &str) {
    self.repositories.insert(
      name.to_string(),
      Repository {
        full_name: name.to_string(),
        default_branch: default_branch.to_string(),
        html_url: format!("https://github.com/{}", name),
        ssh_url: format!("git@github.com:{}.git", name),
      },
    );
  }

  pub fn add_file(&mut self, repo: &str, path: &str, git_ref: Option<&str>, content: &str) {
    self.files.insert(
      (repo.to_string(), path.to_string(), git_ref.map(String::from)),
      content.to_string(),
    );
  }

  pub fn add_commit(&mut self, repo: &str, date: DateTime<Utc>, sha: &str) {
    self.commits.entry(repo.to_string()).or_default().push((date, sha.to_string()));
  }

  pub fn add_release(&mut self, repo: &str, tag: &str, created_at: DateTime<Utc>) {
    self.releases.entry(repo.to_string()).or_default().push(Release {
      tag_name: tag.to_string(),
      created_at,
    });
  }

  fn not_found(what: String) -> TagBotError {
    TagBotError::Api(ApiError::Status {
      status: 404,
      url: what,
      body: "Not Found".to_string(),
    })
  }
}

impl GitHubApi for FakeGitHub {
  fn repository(&self, repo: &str) -> TagBotResult<Repository> {
    self
      .repositories
      .get(repo)
      .cloned()
      .ok_or_else(|| Self::not_found(format!("repos/{}", repo)))
  }

  fn file_contents(&self, repo: &str, path: &str, git_ref: Option<&str>) -> TagBotResult<Option<String>> {
    let key = (repo.to_string(), path.to_string(), git_ref.map(String::from));
    Ok(self.files.get(&key).cloned())
  }

  fn latest_commit_before(&self, repo: &str, until: DateTime<Utc>) -> TagBotResult<Option<String>> {
    Ok(
      self
        .commits
        .get(repo)
        .into_iter()
        .flatten()
        .filter(|(date, _)| *date <= until)
        .max_by_key(|(date, _)| *date)
        .map(|(_, sha)| sha.clone()),
    )
  }

  fn commit_date(&self, repo: &str, sha: &str) -> TagBotResult<DateTime<Utc>> {
    self
      .commits
      .get(repo)
      .into_iter()
      .flatten()
      .find(|(_, s)| s == sha)
      .map(|(date, _)| *date)
      .ok_or_else(|| Self::not_found(format!("repos/{}/commits/{}", repo, sha)))
  }

  fn release_exists(&self, repo: &str, tag: &str) -> TagBotResult<bool> {
    let existing = self.releases.get(repo).into_iter().flatten().any(|r| r.tag_name == tag);
    let created = self
      .created_releases
      .borrow()
      .iter()
      .any(|(r, release)| r == repo && release.tag_name == tag);
    Ok(existing || created)
  }

  fn releases(&self, repo: &str) -> TagBotResult<Vec<Release>> {
    Ok(self.releases.get(repo).cloned().unwrap_or_default())
  }

  fn create_release(&self, repo: &str, release: &NewRelease) -> TagBotResult<()> {
    self.created_releases.borrow_mut().push((repo.to_string(), release.clone()));
    Ok(())
  }

  fn create_pull(&self, repo: &str, pull: &NewPull) -> TagBotResult<()> {
    self.created_pulls.borrow_mut().push((repo.to_string(), pull.clone()));
    Ok(())
  }

  fn create_dispatch(&self, repo: &str, event: &DispatchEvent) -> TagBotResult<u16> {
    self.dispatches.borrow_mut().push((repo.to_string(), event.clone()));
    Ok(self.dispatch_status.unwrap_or(204))
  }

  fn closed_issues(&self, repo: &str, since: DateTime<Utc>) -> TagBotResult<Vec<Issue>> {
    Ok(
      self
        .issues
        .get(repo)
        .into_iter()
        .flatten()
        .filter(|i| i.closed_at.is_none_or(|c| c >= since))
        // Lists omit `closed_by`, as the real endpoint does
        .map(|i| Issue {
          closed_by: None,
          ..i.clone()
        })
        .collect(),
    )
  }

  fn issue(&self, repo: &str, number: u64) -> TagBotResult<Issue> {
    self
      .issues
      .get(repo)
      .into_iter()
      .flatten()
      .find(|i| i.number == number)
      .cloned()
      .ok_or_else(|| Self::not_found(format!("repos/{}/issues/{}", repo, number)))
  }

  fn pull(&self, repo: &str, number: u64) -> TagBotResult<PullRequest> {
    self
      .pulls
      .get(&(repo.to_string(), number))
      .cloned()
      .ok_or_else(|| Self::not_found(format!("repos/{}/pulls/{}", repo, number)))
  }

  fn user(&self, login: &str) -> TagBotResult<User> {
    self.user_lookups.borrow_mut().push(login.to_string());
    Ok(self.users.get(login).cloned().unwrap_or_else(|| User {
      login: login.to_string(),
      name: None,
      html_url: format!("https://github.com/{}", login),
    }))
  }

  fn search_issues(&self, query: &str) -> TagBotResult<Vec<Issue>> {
    self.searches.borrow_mut().push(query.to_string());
    Ok(self.search_results.get(query).cloned().unwrap_or_default())
  }
}
