//! Release-oriented operations for SystemGit (trees, tags, release branches)

use super::system_git::SystemGit;
use crate::core::error::TagBotResult;

impl SystemGit {
  /// Name of the default branch
  ///
  /// Read from `origin/HEAD`, which a clone always sets; falls back to asking the
  /// remote, then to `master`.
  pub fn default_branch(&self) -> String {
    if let Some(branch) = self.default_branch.get() {
      return branch.clone();
    }

    let branch = self
      .command(&["symbolic-ref", "--short", "refs/remotes/origin/HEAD"])
      .ok()
      .and_then(|r| r.strip_prefix("origin/").map(String::from))
      .or_else(|| {
        self
          .command(&["remote", "show", "origin"])
          .ok()
          .and_then(|out| parse_head_branch(&out))
      })
      .unwrap_or_else(|| {
        tracing::warn!("Looking up default branch name failed");
        "master".to_string()
      });

    tracing::debug!("Default branch: {}", branch);
    let _ = self.default_branch.set(branch.clone());
    branch
  }

  /// Commit SHA at the head of the default branch
  pub fn commit_sha_of_default(&self) -> TagBotResult<String> {
    self.command(&["rev-parse", &self.default_branch()])
  }

  /// Find a commit whose tree matches `tree`
  pub fn commit_sha_of_tree(&self, tree: &str) -> TagBotResult<Option<String>> {
    let log = self.command(&["log", "--all", "--format=%H %T"])?;
    Ok(find_commit_for_tree(&log, tree))
  }

  /// Point `origin` somewhere else (used to switch to SSH)
  pub fn set_remote_url(&self, url: &str) -> TagBotResult<()> {
    self.command(&["remote", "set-url", "origin", url]).map(|_| ())
  }

  /// Set a repository-local config value
  pub fn config(&self, key: &str, value: &str) -> TagBotResult<()> {
    self.command(&["config", key, value]).map(|_| ())
  }

  /// Create a tag at `sha` and push it
  ///
  /// Annotated tags are needed for signing: with `tag.gpgSign` set, git signs them.
  pub fn create_tag(&self, version: &str, sha: &str, annotate: bool) -> TagBotResult<()> {
    if annotate {
      self.command(&["tag", "-m", version, version, sha])?;
    } else {
      self.command(&["tag", version, sha])?;
    }
    self.command(&["push", "origin", version]).map(|_| ())
  }

  /// Check out a remote branch locally; false if it does not exist
  ///
  /// Leaves the default branch checked out.
  pub fn fetch_branch(&self, branch: &str) -> TagBotResult<bool> {
    if !self.check(&["checkout", branch]) {
      return Ok(false);
    }
    self.command(&["checkout", &self.default_branch()])?;
    Ok(true)
  }

  /// Whether the default branch can be fast-forwarded to `origin/<branch>`
  pub fn can_fast_forward(&self, branch: &str) -> bool {
    self.check(&[
      "merge-base",
      "--is-ancestor",
      &self.default_branch(),
      &format!("origin/{}", branch),
    ])
  }

  /// Merge a branch into the default branch, push, and delete the remote branch
  pub fn merge_and_delete_branch(&self, branch: &str) -> TagBotResult<()> {
    let default = self.default_branch();
    self.command(&["checkout", &default])?;
    self.command(&["merge", branch])?;
    self.command(&["push", "origin", &default])?;
    self.command(&["push", "-d", "origin", branch])?;
    Ok(())
  }

  /// Whether `origin` already has tag `version` pointing at something other than `sha`
  pub fn invalid_tag_exists(&self, version: &str, sha: &str) -> TagBotResult<bool> {
    // A bare tag name as pattern omits the peeled `^{}` line; the glob keeps it
    let pattern = format!("refs/tags/{}*", version);
    let remote = self.command(&["ls-remote", "--tags", "origin", &pattern])?;
    Ok(match tagged_commit(&remote, version) {
      Some(commit) => commit != sha,
      None => false,
    })
  }
}

/// Parse `HEAD branch: main` out of `git remote show`
fn parse_head_branch(output: &str) -> Option<String> {
  output
    .lines()
    .find_map(|line| line.trim().strip_prefix("HEAD branch:"))
    .map(|b| b.trim().to_string())
    .filter(|b| !b.is_empty() && b != "(unknown)")
}

/// Scan `%H %T` log lines for a tree
fn find_commit_for_tree(log: &str, tree: &str) -> Option<String> {
  log.lines().find_map(|line| {
    let (commit, t) = line.trim().split_once(' ')?;
    (t == tree).then(|| commit.to_string())
  })
}

/// Commit a remote tag resolves to, from `git ls-remote --tags` output
///
/// Annotated tags list the tag object and a peeled `^{}` entry; the peeled entry wins.
fn tagged_commit(ls_remote: &str, version: &str) -> Option<String> {
  let tag_ref = format!("refs/tags/{}", version);
  let peeled_ref = format!("{}^{{}}", tag_ref);
  let mut direct = None;

  for line in ls_remote.lines() {
    let mut parts = line.split_whitespace();
    let (Some(sha), Some(name)) = (parts.next(), parts.next()) else {
      continue;
    };
    if name == peeled_ref {
      return Some(sha.to_string());
    }
    if name == tag_ref {
      direct = Some(sha.to_string());
    }
  }

  direct
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::vcs::fixtures::{self, Fixture};

  #[test]
  fn test_parse_head_branch() {
    let out = "* remote origin\n  Fetch URL: x\n  HEAD branch: trunk\n  Remote branches:\n";
    assert_eq!(parse_head_branch(out), Some("trunk".to_string()));
    assert_eq!(parse_head_branch("  HEAD branch: (unknown)\n"), None);
    assert_eq!(parse_head_branch(""), None);
  }

  #[test]
  fn test_find_commit_for_tree() {
    let log = "c1 t1\nc2 t2\nc3 t2\n";
    assert_eq!(find_commit_for_tree(log, "t2"), Some("c2".to_string()));
    assert_eq!(find_commit_for_tree(log, "t9"), None);
    assert_eq!(find_commit_for_tree("", "t1"), None);
  }

  #[test]
  fn test_tagged_commit() {
    let lightweight = "abc\trefs/tags/v1.0.0\n";
    assert_eq!(tagged_commit(lightweight, "v1.0.0"), Some("abc".to_string()));

    let annotated = "tagobj\trefs/tags/v1.0.0\ncommit\trefs/tags/v1.0.0^{}\n";
    assert_eq!(tagged_commit(annotated, "v1.0.0"), Some("commit".to_string()));

    assert_eq!(tagged_commit("abc\trefs/tags/v1.0.0-rc\n", "v1.0.0"), None);
    assert_eq!(tagged_commit("", "v1.0.0"), None);
  }

  #[test]
  fn test_default_branch_and_trees() {
    let fx = Fixture::new();
    let sha = fx.commit_file("src/Example.jl", "module Example end\n", "Add module");
    let tree = fx.tree_of(&sha);
    let git = fx.open();
    git.command(&["fetch", "origin"]).unwrap();
    git.command(&["merge", "--ff-only", "origin/main"]).unwrap();

    assert_eq!(git.default_branch(), "main");
    assert_eq!(git.commit_sha_of_default().unwrap(), sha);
    assert_eq!(git.commit_sha_of_tree(&tree).unwrap(), Some(sha));
    assert_eq!(git.commit_sha_of_tree("0000000000000000000000000000000000000000").unwrap(), None);
  }

  #[test]
  fn test_tags() {
    let fx = Fixture::new();
    let first = fx.seed_git(&["rev-parse", "HEAD"]);
    let second = fx.commit_file("a.txt", "a", "Second");
    let git = fx.open();
    git.command(&["fetch", "origin"]).unwrap();

    assert!(!git.invalid_tag_exists("v1.0.0", &first).unwrap());

    git.create_tag("v1.0.0", &first, false).unwrap();
    assert!(!git.invalid_tag_exists("v1.0.0", &first).unwrap());
    assert!(git.invalid_tag_exists("v1.0.0", &second).unwrap());

    git.config("user.name", "Test User").unwrap();
    git.config("user.email", "test@example.com").unwrap();
    git.create_tag("v2.0.0", &second, true).unwrap();
    assert!(!git.invalid_tag_exists("v2.0.0", &second).unwrap());
    assert!(git.invalid_tag_exists("v2.0.0", &first).unwrap());

    // A longer tag sharing the prefix does not shadow the exact one
    git.create_tag("v2.0.0-rc1", &first, true).unwrap();
    assert!(!git.invalid_tag_exists("v2.0.0", &second).unwrap());
    assert!(!git.invalid_tag_exists("v3.0.0", &second).unwrap());

    let kind = fixtures::git(&fx.origin, &["cat-file", "-t", "v2.0.0"]);
    assert_eq!(kind, "tag");
  }

  #[test]
  fn test_release_branches() {
    let fx = Fixture::new();
    let git = fx.open();
    assert!(!git.fetch_branch("release-1.0.0").unwrap());

    fx.seed_git(&["checkout", "-b", "release-1.0.0"]);
    fx.commit_file("Project.toml", "version = \"1.0.0\"\n", "Bump version");
    fx.seed_git(&["checkout", "main"]);
    git.command(&["fetch", "origin"]).unwrap();

    assert!(git.fetch_branch("release-1.0.0").unwrap());
    assert_eq!(git.command(&["rev-parse", "--abbrev-ref", "HEAD"]).unwrap(), "main");
    assert!(git.can_fast_forward("release-1.0.0"));

    git.merge_and_delete_branch("release-1.0.0").unwrap();
    let branches = fx.seed_git(&["ls-remote", "--heads", "origin"]);
    assert!(!branches.contains("release-1.0.0"));
    assert_eq!(
      fx.seed_git(&["ls-remote", "origin", "refs/heads/main"]).split_whitespace().next(),
      Some(git.command(&["rev-parse", "HEAD"]).unwrap().as_str())
    );
  }

  #[test]
  fn test_diverged_release_branch_cannot_fast_forward() {
    let fx = Fixture::new();
    fx.seed_git(&["checkout", "-b", "release-2.0.0"]);
    fx.commit_file("b.txt", "b", "On branch");
    fx.seed_git(&["checkout", "main"]);
    fx.commit_file("c.txt", "c", "On main");

    let git = fx.open();
    git.command(&["fetch", "origin"]).unwrap();
    git.command(&["merge", "--ff-only", "origin/main"]).unwrap();
    assert!(git.fetch_branch("release-2.0.0").unwrap());
    assert!(!git.can_fast_forward("release-2.0.0"));
  }
}
