//! SSH deploy keys
//!
//! Pushing tags with a deploy key lets them trigger other workflows, which
//! pushes made with the default token do not.

use super::{maybe_b64, run_tool};
use crate::core::error::{KeyError, ResultExt, TagBotError, TagBotResult};
use crate::core::vcs::SystemGit;
use regex::Regex;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use tempfile::TempDir;

static AGENT_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*([A-Za-z_][A-Za-z0-9_]*)=([^;]+);").unwrap());

const ASKPASS_VAR: &str = "TAGBOT_SSH_PASSPHRASE";

/// Files and agent behind an SSH setup; removed/stopped on drop
pub struct SshSetup {
  dir: TempDir,
  pub key_path: PathBuf,
  pub hosts_path: PathBuf,
  agent: Vec<(String, String)>,
}

impl SshSetup {
  /// Switch `git` to SSH with `key`
  pub fn configure(
    git: &mut SystemGit,
    ssh_url: &str,
    host: &str,
    key: &str,
    password: Option<&str>,
  ) -> TagBotResult<Self> {
    tracing::debug!("Configuring SSH key");
    git.set_remote_url(ssh_url)?;

    let dir = tempfile::Builder::new()
      .prefix("tagbot_ssh_")
      .tempdir()
      .context("Failed to create SSH directory")?;

    let key_path = dir.path().join("key");
    std::fs::write(&key_path, format!("{}\n", maybe_b64(key).trim())).context("Failed to write SSH key")?;
    std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o400))?;

    // Known hosts up front so pushing never asks for confirmation
    let hosts_path = dir.path().join("known_hosts");
    let scan = run_tool("ssh-keyscan", Command::new("ssh-keyscan").args(["-t", "rsa", host]), None)?;
    std::fs::write(&hosts_path, &scan.stdout).context("Failed to write known hosts")?;

    git.config("core.sshCommand", &ssh_command(&key_path, &hosts_path))?;

    let mut setup = Self {
      dir,
      key_path,
      hosts_path,
      agent: Vec::new(),
    };
    if let Some(password) = password {
      setup.start_agent(git, password)?;
    }
    Ok(setup)
  }

  /// Start ssh-agent and unlock the key in it so git never needs the passphrase
  fn start_agent(&mut self, git: &mut SystemGit, password: &str) -> TagBotResult<()> {
    let output = run_tool("ssh-agent", Command::new("ssh-agent").arg("-s"), None)?;
    self.agent = parse_agent_env(&String::from_utf8_lossy(&output.stdout));
    if !self.agent.iter().any(|(k, _)| k == "SSH_AUTH_SOCK") {
      return Err(TagBotError::Keys(KeyError::Agent {
        message: "ssh-agent did not report a socket".to_string(),
      }));
    }

    let askpass = self.dir.path().join("askpass");
    std::fs::write(&askpass, format!("#!/bin/sh\nprintf '%s\\n' \"${}\"\n", ASKPASS_VAR))
      .context("Failed to write askpass helper")?;
    std::fs::set_permissions(&askpass, std::fs::Permissions::from_mode(0o700))?;

    let mut add = Command::new("ssh-add");
    add
      .arg(&self.key_path)
      .envs(self.agent.iter().map(|(k, v)| (k.as_str(), v.as_str())))
      .env("SSH_ASKPASS", &askpass)
      .env("SSH_ASKPASS_REQUIRE", "force")
      .env("DISPLAY", ":0")
      .env(ASKPASS_VAR, password);
    let output = run_tool("ssh-add", &mut add, None).map_err(|e| match e {
      TagBotError::Keys(KeyError::Tool { stderr, .. }) => TagBotError::Keys(KeyError::Agent { message: stderr }),
      other => other,
    })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.contains("Identity added") {
      return Err(TagBotError::Keys(KeyError::Agent {
        message: stderr.trim().to_string(),
      }));
    }

    for (key, value) in &self.agent {
      git.set_env(key.clone(), value.clone());
    }
    Ok(())
  }
}

impl Drop for SshSetup {
  fn drop(&mut self) {
    if self.agent.is_empty() {
      return;
    }
    let _ = Command::new("ssh-agent")
      .arg("-k")
      .envs(self.agent.iter().map(|(k, v)| (k.as_str(), v.as_str())))
      .output();
  }
}

/// `core.sshCommand` value using a key and known hosts file
pub fn ssh_command(key: &Path, hosts: &Path) -> String {
  format!("ssh -i {} -o UserKnownHostsFile={}", key.display(), hosts.display())
}

/// Variables exported by `ssh-agent -s`
pub fn parse_agent_env(output: &str) -> Vec<(String, String)> {
  AGENT_VAR
    .captures_iter(output)
    .map(|c| (c[1].to_string(), c[2].trim().to_string()))
    .collect()
}
