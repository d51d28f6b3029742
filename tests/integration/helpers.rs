//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Run the tagbot binary with only the given environment (plus PATH)
pub fn run_tagbot(cwd: &Path, args: &[&str], env: &[(&str, &str)]) -> Result<Output> {
  let tagbot_bin = env!("CARGO_BIN_EXE_tagbot");

  let mut cmd = Command::new(tagbot_bin);
  cmd.current_dir(cwd).args(args).env_clear();
  if let Ok(path) = std::env::var("PATH") {
    cmd.env("PATH", path);
  }
  cmd.envs(env.iter().copied());

  cmd.output().context("Failed to run tagbot")
}

/// Run tagbot and require success
pub fn run_tagbot_ok(cwd: &Path, args: &[&str], env: &[(&str, &str)]) -> Result<Output> {
  let output = run_tagbot(cwd, args, env)?;

  if !output.status.success() {
    anyhow::bail!(
      "tagbot command failed: tagbot {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout(&output),
      String::from_utf8_lossy(&output.stderr)
    );
  }

  Ok(output)
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}

/// The action.yml shipped at the repository root
pub fn shipped_manifest() -> PathBuf {
  Path::new(env!("CARGO_MANIFEST_DIR")).join("action.yml")
}
