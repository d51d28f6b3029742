//! GPG tag signing

use super::{maybe_b64, run_tool};
use crate::core::error::{KeyError, ResultExt, TagBotError, TagBotResult};
use crate::core::vcs::SystemGit;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Identity used for signed tags
pub const BOT_NAME: &str = "github-actions[bot]";
pub const BOT_EMAIL: &str = "actions@github.com";

/// A temporary GNUPGHOME holding the imported key; the agent is stopped on drop
pub struct GpgSetup {
  home: TempDir,
  pub fingerprint: String,
}

/// Counts and fingerprints from `gpg --import --status-fd`
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportStatus {
  pub secret_imported: u32,
  pub fingerprints: Vec<String>,
}

impl GpgSetup {
  /// Import `key` and make git sign tags with it
  pub fn configure(git: &mut SystemGit, key: &str, password: Option<&str>) -> TagBotResult<Self> {
    tracing::debug!("Configuring GPG key");
    let home = tempfile::Builder::new()
      .prefix("tagbot_gpg_")
      .tempdir()
      .context("Failed to create GNUPGHOME")?;
    std::fs::set_permissions(home.path(), std::fs::Permissions::from_mode(0o700))?;

    let output = run_tool("gpg", gpg(home.path()).arg("--import"), Some(&maybe_b64(key)))
      .map_err(|e| match e {
        TagBotError::Keys(KeyError::Tool { stderr, .. }) => TagBotError::Keys(KeyError::Import { stderr }),
        other => other,
      })?;
    let status = parse_import_status(&String::from_utf8_lossy(&output.stdout));
    let fingerprint = match (status.secret_imported, status.fingerprints.first()) {
      (1, Some(fpr)) => fpr.clone(),
      _ => {
        return Err(TagBotError::Keys(KeyError::Import {
          stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }));
      }
    };
    tracing::debug!("Imported GPG key {}", fingerprint);

    let setup = Self { home, fingerprint };
    if let Some(password) = password {
      setup.unlock(password)?;
    }

    git.set_env("GNUPGHOME", setup.home.path().to_string_lossy());
    git.config("user.signingKey", &setup.fingerprint)?;
    git.config("user.name", BOT_NAME)?;
    git.config("user.email", BOT_EMAIL)?;
    git.config("tag.gpgSign", "true")?;
    Ok(setup)
  }

  /// Sign dummy data so the agent caches the passphrase for later tag signing
  fn unlock(&self, password: &str) -> TagBotResult<()> {
    let data = self.home.path().join("test.txt");
    let signature = self.home.path().join("test.txt.sig");
    std::fs::write(&data, "test").context("Failed to write GPG test data")?;

    let mut cmd = gpg(self.home.path());
    cmd
      .args(["--pinentry-mode", "loopback", "--passphrase-fd", "0"])
      .args(["--local-user", &self.fingerprint, "--output"])
      .arg(&signature)
      .arg("--sign")
      .arg(&data);

    let output = run_tool("gpg", &mut cmd, Some(&format!("{}\n", password))).map_err(|e| match e {
      TagBotError::Keys(KeyError::Tool { stderr, .. }) => TagBotError::Keys(KeyError::Sign { stderr }),
      other => other,
    })?;
    if !String::from_utf8_lossy(&output.stdout).contains("SIG_CREATED") {
      return Err(TagBotError::Keys(KeyError::Sign {
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }
    Ok(())
  }
}

impl Drop for GpgSetup {
  fn drop(&mut self) {
    let _ = Command::new("gpgconf")
      .args(["--kill", "gpg-agent"])
      .env("GNUPGHOME", self.home.path())
      .output();
  }
}

/// Batch-mode gpg bound to a home directory, with machine-readable status on stdout
fn gpg(home: &Path) -> Command {
  let mut cmd = Command::new("gpg");
  cmd.env("GNUPGHOME", home).args(["--batch", "--yes", "--status-fd", "1"]);
  cmd
}

/// Parse `[GNUPG:] IMPORT_RES` and `IMPORT_OK` status lines
pub fn parse_import_status(status: &str) -> ImportStatus {
  let mut result = ImportStatus::default();
  for line in status.lines() {
    let mut fields = line.split_whitespace();
    if fields.next() != Some("[GNUPG:]") {
      continue;
    }
    match fields.next() {
      Some("IMPORT_OK") => {
        if let Some(fpr) = fields.nth(1)
          && !result.fingerprints.iter().any(|f| f == fpr)
        {
          result.fingerprints.push(fpr.to_string());
        }
      }
      // count no_user_id imported imported_rsa unchanged n_uids n_subk n_sigs n_revoc sec_read sec_imported
      Some("IMPORT_RES") => {
        result.secret_imported = fields.nth(10).and_then(|n| n.parse().ok()).unwrap_or(0);
      }
      _ => {}
    }
  }
  result
}
