//! Scratch repositories for unit tests
//!
//! Layout: a bare `origin`, a `seed` working copy used to author commits and push
//! them, and a `clone` of origin that plays the part of tagbot's checkout.

use super::SystemGit;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub struct Fixture {
  _root: TempDir,
  pub origin: PathBuf,
  pub seed: PathBuf,
  pub clone: PathBuf,
}

impl Fixture {
  /// Origin with one commit on `main`, already cloned
  pub fn new() -> Self {
    let root = TempDir::new().unwrap();
    let origin = root.path().join("origin.git");
    let seed = root.path().join("seed");
    let clone = root.path().join("clone");

    git(root.path(), &["init", "--bare", "--initial-branch=main", origin.to_str().unwrap()]);
    git(root.path(), &["init", "--initial-branch=main", seed.to_str().unwrap()]);
    git(&seed, &["remote", "add", "origin", origin.to_str().unwrap()]);

    let fx = Self {
      _root: root,
      origin,
      seed,
      clone,
    };
    fx.commit_file("README.md", "# Example.jl\n", "Initial commit");
    git(fx._root.path(), &["clone", fx.origin.to_str().unwrap(), fx.clone.to_str().unwrap()]);
    fx
  }

  /// Commit a file in the seed repository and push it to origin; returns the commit SHA
  pub fn commit_file(&self, name: &str, content: &str, message: &str) -> String {
    let path = self.seed.join(name);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
    git(&self.seed, &["add", "."]);
    git(&self.seed, &["commit", "-m", message]);
    let branch = git(&self.seed, &["rev-parse", "--abbrev-ref", "HEAD"]);
    git(&self.seed, &["push", "origin", &branch]);
    git(&self.seed, &["rev-parse", "HEAD"])
  }

  /// Tree SHA of a commit in the seed repository
  pub fn tree_of(&self, commit: &str) -> String {
    git(&self.seed, &["rev-parse", &format!("{}^{{tree}}", commit)])
  }

  /// Run git in the seed repository
  pub fn seed_git(&self, args: &[&str]) -> String {
    git(&self.seed, args)
  }

  /// Backend over the clone
  pub fn open(&self) -> SystemGit {
    SystemGit::open(&self.clone).unwrap()
  }
}

/// Run git with a fixed identity, panicking on failure
pub fn git(cwd: &Path, args: &[&str]) -> String {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(["-c", "user.name=Test User", "-c", "user.email=test@example.com"])
    .args(["-c", "commit.gpgSign=false", "-c", "tag.gpgSign=false"])
    .args(args)
    .output()
    .expect("Failed to run git command");

  assert!(
    output.status.success(),
    "git {} failed: {}",
    args.join(" "),
    String::from_utf8_lossy(&output.stderr)
  );

  String::from_utf8_lossy(&output.stdout).trim().to_string()
}
