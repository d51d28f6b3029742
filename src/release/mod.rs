//! Releasing newly registered versions
//!
//! A [`Releaser`] owns the checkout of the repository being released and talks
//! to GitHub through [`GitHubApi`]. A run goes:
//!
//! 1. Find versions registered within the lookback window ([`Releaser::new_versions`])
//! 2. Optionally announce them with a repository dispatch event
//! 3. Optionally set up SSH and GPG keys
//! 4. For each version: merge its release branch, tag it, create the GitHub release
//!
//! Every lookup that costs a request or a file read is cached for the run.

pub mod changelog;
pub mod lookback;
pub mod versions;

pub use changelog::Changelog;
pub use versions::NewVersion;

use crate::core::context::ActionContext;
use crate::core::error::{TagBotError, TagBotResult};
use crate::core::vcs::SystemGit;
use crate::github::{DispatchEvent, GitHubApi, NewPull, NewRelease, Repository};
use crate::keys::{GpgSetup, SshSetup};
use crate::registry::{self, Project};
use chrono::{DateTime, TimeDelta, Utc};
use std::cell::OnceCell;
use std::collections::BTreeMap;

/// Event type of the repository dispatch sent before releasing
pub const DISPATCH_EVENT: &str = "TagBot";

/// Release driver for one repository
pub struct Releaser<'a> {
  api: &'a dyn GitHubApi,
  ctx: &'a ActionContext,
  git: SystemGit,
  now: DateTime<Utc>,

  repository: OnceCell<Repository>,
  project: OnceCell<Project>,
  registry_path: OnceCell<Option<String>>,
  lookback: OnceCell<TimeDelta>,

  ssh: Option<SshSetup>,
  gpg: Option<GpgSetup>,
}

impl<'a> Releaser<'a> {
  pub fn new(api: &'a dyn GitHubApi, ctx: &'a ActionContext, git: SystemGit) -> Self {
    Self {
      api,
      ctx,
      git,
      now: Utc::now(),
      repository: OnceCell::new(),
      project: OnceCell::new(),
      registry_path: OnceCell::new(),
      lookback: OnceCell::new(),
      ssh: None,
      gpg: None,
    }
  }

  /// Pin the clock (registry history is read relative to it)
  pub fn at(mut self, now: DateTime<Utc>) -> Self {
    self.now = now;
    self
  }

  pub fn git(&self) -> &SystemGit {
    &self.git
  }

  /// Repository metadata from GitHub
  pub fn repository(&self) -> TagBotResult<&Repository> {
    if let Some(repo) = self.repository.get() {
      return Ok(repo);
    }
    let repo = self.api.repository(&self.ctx.repository)?;
    Ok(self.repository.get_or_init(|| repo))
  }

  /// The package's project file
  pub fn project(&self) -> TagBotResult<&Project> {
    if let Some(project) = self.project.get() {
      return Ok(project);
    }
    let project = Project::load(self.git.work_tree())?;
    tracing::debug!("Package {} ({})", project.name, project.uuid);
    Ok(self.project.get_or_init(|| project))
  }

  /// Directory of the package in the registry, `None` if it is not registered
  pub fn registry_path(&self) -> TagBotResult<Option<&str>> {
    if let Some(path) = self.registry_path.get() {
      return Ok(path.as_deref());
    }
    let registry = &self.ctx.inputs.registry;
    let content = self.api.file_contents(registry, "Registry.toml", None)?.ok_or_else(|| {
      TagBotError::with_help(
        format!("Registry.toml was not found in {}", registry),
        "The `registry` input must name a Julia package registry repository.",
      )
    })?;
    let path = registry::package_path(&content, &self.project()?.uuid)?;
    tracing::debug!("Registry path: {:?}", path);
    Ok(self.registry_path.get_or_init(|| path).as_deref())
  }

  pub fn is_registered(&self) -> TagBotResult<bool> {
    Ok(self.registry_path()?.is_some())
  }

  /// How far back a version must have been missing to count as new
  pub fn lookback(&self) -> TimeDelta {
    *self
      .lookback
      .get_or_init(|| lookback::lookback(&self.git.path([".github", "workflows"]), self.now))
  }

  /// Version -> tree SHA, as the registry has it now or as of `min_age` ago
  fn versions(&self, min_age: Option<TimeDelta>) -> TagBotResult<BTreeMap<String, String>> {
    let Some(root) = self.registry_path()? else {
      return Ok(BTreeMap::new());
    };
    let registry = &self.ctx.inputs.registry;

    let git_ref = match min_age {
      Some(age) => match self.api.latest_commit_before(registry, self.now - age)? {
        Some(sha) => Some(sha),
        None => {
          tracing::debug!("No registry commits were found");
          return Ok(BTreeMap::new());
        }
      },
      None => None,
    };

    let path = format!("{}/Versions.toml", root);
    match self.api.file_contents(registry, &path, git_ref.as_deref())? {
      Some(content) => registry::parse_versions(&content),
      None => {
        tracing::debug!("Versions.toml was not found (ref: {:?})", git_ref);
        Ok(BTreeMap::new())
      }
    }
  }

  /// Versions registered within the lookback window that still need a release
  pub fn new_versions(&self) -> TagBotResult<Vec<NewVersion>> {
    let lookback = self.lookback();
    tracing::debug!("Looking back {} hours", lookback.num_hours());

    let current = self.versions(None)?;
    let old = self.versions(Some(lookback))?;
    tracing::debug!("Versions now: {}, versions then: {}", current.len(), old.len());

    let added = versions::added_versions(&current, &old);
    tracing::debug!("Candidate versions: {:?}", added.keys().collect::<Vec<_>>());
    self.filter_map_versions(&added)
  }

  /// Map tree SHAs to commits and drop versions that cannot or need not be released
  pub fn filter_map_versions(&self, candidates: &BTreeMap<String, String>) -> TagBotResult<Vec<NewVersion>> {
    let mut valid = Vec::new();

    for (version, tree) in candidates {
      let version = versions::tag_name(version);
      let Some(sha) = self.git.commit_sha_of_tree(tree)? else {
        tracing::warn!("No matching commit was found for version {} ({})", version, tree);
        continue;
      };
      if self.git.invalid_tag_exists(&version, &sha)? {
        tracing::error!("Existing tag {} points at the wrong commit (expected {})", version, sha);
        continue;
      }
      if self.api.release_exists(&self.ctx.repository, &version)? {
        tracing::info!("Release {} already exists", version);
        continue;
      }
      valid.push(NewVersion { version, sha });
    }

    versions::sort(&mut valid);
    Ok(valid)
  }

  /// Announce new versions with a repository dispatch event
  pub fn create_dispatch_event(&self, new: &[NewVersion]) -> TagBotResult<()> {
    let payload: serde_json::Map<String, serde_json::Value> = new
      .iter()
      .map(|v| (v.version.clone(), serde_json::Value::String(v.sha.clone())))
      .collect();
    let event = DispatchEvent {
      event_type: DISPATCH_EVENT.to_string(),
      client_payload: serde_json::Value::Object(payload),
    };
    let status = self.api.create_dispatch(&self.ctx.repository, &event)?;
    tracing::debug!("Dispatch response status: {}", status);
    Ok(())
  }

  /// Push over SSH with a deploy key
  pub fn configure_ssh(&mut self, key: &str, password: Option<&str>) -> TagBotResult<()> {
    let ssh_url = self.repository()?.ssh_url.clone();
    let host = self.ctx.ssh_host().to_string();
    self.ssh = Some(SshSetup::configure(&mut self.git, &ssh_url, &host, key, password)?);
    Ok(())
  }

  /// Sign tags with a GPG key
  pub fn configure_gpg(&mut self, key: &str, password: Option<&str>) -> TagBotResult<()> {
    self.gpg = Some(GpgSetup::configure(&mut self.git, key, password)?);
    Ok(())
  }

  /// Merge `release-X.Y.Z` into the default branch, or open a pull request for it
  pub fn handle_release_branch(&self, version: &str) -> TagBotResult<()> {
    let branch = versions::release_branch(version);
    if !self.git.fetch_branch(&branch)? {
      tracing::info!("Release branch {} does not exist", branch);
      return Ok(());
    }

    if self.git.can_fast_forward(&branch) {
      tracing::info!("Release branch can be fast-forwarded");
      self.git.merge_and_delete_branch(&branch)
    } else {
      tracing::info!("Release branch cannot be fast-forwarded, creating pull request");
      let pull = NewPull {
        title: format!("Merge release branch for {}", version),
        body: String::new(),
        head: branch,
        base: self.git.default_branch(),
      };
      self.api.create_pull(&self.ctx.repository, &pull)
    }
  }

  /// Release notes for a version
  pub fn release_notes(&self, version: &str, sha: &str) -> TagBotResult<String> {
    let inputs = &self.ctx.inputs;
    let changelog = Changelog::new(
      self.api,
      &self.ctx.repository,
      &inputs.registry,
      &inputs.changelog,
      &inputs.changelog_ignore,
    );
    changelog.get(&self.project()?.name, &self.repository()?.html_url, version, sha)
  }

  /// Branch name when it points at `sha`, so the release page shows the branch
  fn release_target(&self, sha: &str) -> TagBotResult<String> {
    if self.git.commit_sha_of_default()? == sha {
      Ok(self.git.default_branch())
    } else {
      Ok(sha.to_string())
    }
  }

  /// Tag (when keys are configured) and create the GitHub release
  pub fn create_release(&self, version: &str, sha: &str) -> TagBotResult<()> {
    let target = self.release_target(sha)?;
    tracing::debug!("Release {} target: {}", version, target);
    let body = self.release_notes(version, sha)?;

    let inputs = &self.ctx.inputs;
    if inputs.ssh.is_some() || inputs.gpg.is_some() {
      tracing::debug!("Creating tag via Git");
      self.git.create_tag(version, sha, inputs.gpg.is_some())?;
    }

    let release = NewRelease {
      tag_name: version.to_string(),
      name: version.to_string(),
      body,
      target_commitish: target,
    };
    self.api.create_release(&self.ctx.repository, &release)?;
    tracing::info!("Created release {}", version);
    Ok(())
  }

  /// Log what [`Releaser::create_release`] would do; returns the notes
  pub fn preview_release(&self, version: &str, sha: &str) -> TagBotResult<String> {
    let target = self.release_target(sha)?;
    let body = self.release_notes(version, sha)?;
    tracing::info!("Would create release {} targeting {}", version, target);
    tracing::info!("Release notes:\n{}", body);
    Ok(body)
  }
}
