//! `tagbot manifest`: print or check the action manifest

use crate::core::error::{TagBotError, TagBotResult};
use crate::core::manifest::ActionManifest;
use std::path::Path;

/// Print the canonical `action.yml`, or check an existing one against it
pub fn run_manifest(check: Option<&Path>) -> TagBotResult<()> {
  let Some(path) = check else {
    print!("{}", ActionManifest::tagbot().to_yaml()?);
    return Ok(());
  };

  let manifest = ActionManifest::load(path)?;
  let issues = manifest.validate();
  if issues.is_empty() {
    tracing::info!("{} declares every input tagbot reads", path.display());
    return Ok(());
  }

  for issue in &issues {
    tracing::error!("{}: {}", path.display(), issue);
  }
  Err(TagBotError::with_help(
    format!("{} does not match the inputs tagbot reads ({} problems)", path.display(), issues.len()),
    "Regenerate it with `tagbot manifest > action.yml`.",
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_check_passes_for_canonical_manifest() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("action.yml");
    std::fs::write(&path, ActionManifest::tagbot().to_yaml().unwrap()).unwrap();
    assert!(run_manifest(Some(&path)).is_ok());
  }

  #[test]
  fn test_check_reports_drift() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("action.yml");
    let mut manifest = ActionManifest::tagbot();
    manifest.inputs.retain(|i| i.name != "dispatch");
    std::fs::write(&path, manifest.to_yaml().unwrap()).unwrap();

    let err = run_manifest(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("1 problems"));
  }

  #[test]
  fn test_check_missing_file() {
    assert!(run_manifest(Some(Path::new("/no/such/action.yml"))).is_err());
  }
}
