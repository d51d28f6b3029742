//! System git backend
//!
//! Every operation shells out to `git` against a working copy that tagbot owns
//! (normally a fresh clone in a temporary directory). Commands run with an
//! isolated environment; the only variables passed through are PATH, HOME and
//! whatever key setup registered with [`SystemGit::set_env`].

use crate::core::error::{GitError, TagBotError, TagBotResult, ResultExt};
use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Git backend using system git
pub struct SystemGit {
  /// Working tree root
  pub(crate) work_tree: PathBuf,

  /// Value scrubbed from logged commands and output
  secret: Option<String>,

  /// Extra environment for git subprocesses (ssh-agent socket, GNUPGHOME)
  env: Vec<(String, String)>,

  /// Default branch, looked up on first use
  pub(crate) default_branch: OnceCell<String>,

  /// Keeps a temporary clone alive for as long as the backend
  _checkout: Option<TempDir>,
}

impl SystemGit {
  /// Open an existing working copy
  pub fn open(path: &Path) -> TagBotResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(TagBotError::message(format!(
        "Failed to open git repository at {}: {}",
        path.display(),
        stderr.trim()
      )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);

    Ok(Self {
      work_tree: PathBuf::from(stdout.trim()),
      secret: None,
      env: Vec::new(),
      default_branch: OnceCell::new(),
      _checkout: None,
    })
  }

  /// Clone `url` into a temporary directory
  ///
  /// `secret` is scrubbed from anything logged, including git's own error output
  /// (which echoes the credential-bearing URL).
  pub fn clone_repo(url: &str, secret: Option<&str>) -> TagBotResult<Self> {
    let dir = tempfile::Builder::new()
      .prefix("tagbot_repo_")
      .tempdir()
      .context("Failed to create clone directory")?;

    let mut git = Self {
      work_tree: dir.path().to_path_buf(),
      secret: secret.filter(|s| !s.is_empty()).map(String::from),
      env: Vec::new(),
      default_branch: OnceCell::new(),
      _checkout: None,
    };

    tracing::debug!("Running '{}'", git.sanitize(&format!("git clone {} {}", url, dir.path().display())));

    let output = git
      .base_cmd()
      .arg("clone")
      .arg(url)
      .arg(dir.path())
      .output()
      .context("Failed to execute git clone")?;

    if !output.status.success() {
      return Err(TagBotError::Git(GitError::CloneFailed {
        repo: git.sanitize(url),
        reason: git.sanitize(String::from_utf8_lossy(&output.stderr).trim()),
      }));
    }

    git._checkout = Some(dir);
    Ok(git)
  }

  /// Working tree root
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Path of a file inside the working tree
  pub fn path<I, P>(&self, parts: I) -> PathBuf
  where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
  {
    parts.into_iter().fold(self.work_tree.clone(), |acc, p| acc.join(p))
  }

  /// Pass an environment variable to every later git subprocess
  pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
    let key = key.into();
    self.env.retain(|(k, _)| *k != key);
    self.env.push((key, value.into()));
  }

  /// Environment registered with [`SystemGit::set_env`]
  pub fn env(&self) -> &[(String, String)] {
    &self.env
  }

  /// Replace the secret with `***`
  pub fn sanitize(&self, text: &str) -> String {
    match &self.secret {
      Some(secret) => text.replace(secret.as_str(), "***"),
      None => text.to_string(),
    }
  }

  /// Run a git command in the working tree, returning trimmed stdout
  pub fn command(&self, args: &[&str]) -> TagBotResult<String> {
    let display_cmd = self.sanitize(&format!("git {}", args.join(" ")));
    tracing::debug!("Running '{}'", display_cmd);

    let output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute {}", display_cmd))?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let details: Vec<String> = [stdout.as_str(), stderr.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| self.sanitize(s))
        .collect();
      return Err(TagBotError::Git(GitError::CommandFailed {
        command: display_cmd,
        stderr: details.join("\n"),
      }));
    }

    Ok(stdout)
  }

  /// Run a git command, reporting only whether it succeeded
  pub fn check(&self, args: &[&str]) -> bool {
    tracing::debug!("Running '{}'", self.sanitize(&format!("git {}", args.join(" "))));
    self
      .git_cmd()
      .args(args)
      .output()
      .map(|o| o.status.success())
      .unwrap_or(false)
  }

  /// Git command with isolated environment, not bound to a working tree
  fn base_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    // Isolated environment (don't trust the runner's variables)
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    for (key, value) in &self.env {
      cmd.env(key, value);
    }

    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");

    cmd
  }

  /// Create a safe git command running in the working tree
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = self.base_cmd();
    cmd.arg("-C").arg(&self.work_tree);
    cmd
  }
}
