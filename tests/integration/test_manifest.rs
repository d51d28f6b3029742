//! Tests for the `manifest` command

use crate::helpers::*;
use anyhow::Result;
use tempfile::TempDir;

#[test]
fn test_printed_manifest_declares_inputs() -> Result<()> {
  let temp = TempDir::new()?;
  let output = run_tagbot_ok(temp.path(), &["manifest"], &[])?;
  let manifest: serde_yaml::Value = serde_yaml::from_str(&stdout(&output))?;

  assert_eq!(manifest["name"].as_str(), Some("Julia TagBot"));
  assert_eq!(manifest["runs"]["using"].as_str(), Some("docker"));

  let inputs = &manifest["inputs"];
  assert_eq!(inputs["token"]["required"].as_bool(), Some(true));
  assert!(inputs["token"].get("default").is_none());
  assert_eq!(inputs["registry"]["default"].as_str(), Some("JuliaRegistries/General"));
  assert_eq!(inputs["branches"]["default"].as_str(), Some("false"));
  assert_eq!(inputs["dispatch"]["default"].as_str(), Some("false"));
  assert_eq!(inputs["dispatch_delay"]["default"].as_str(), Some("5"));
  assert!(
    inputs["changelog"]["default"]
      .as_str()
      .is_some_and(|t| t.contains("{{ package }} {{ version }}"))
  );

  let required: Vec<_> = inputs
    .as_mapping()
    .map(|m| {
      m.iter()
        .filter(|(_, v)| v["required"].as_bool() == Some(true))
        .filter_map(|(k, _)| k.as_str())
        .collect()
    })
    .unwrap_or_default();
  assert_eq!(required, ["token"]);

  Ok(())
}

#[test]
fn test_shipped_manifest_passes_check() -> Result<()> {
  let temp = TempDir::new()?;
  let path = shipped_manifest();
  run_tagbot_ok(temp.path(), &["manifest", "--check", path.to_str().unwrap()], &[])?;
  Ok(())
}

#[test]
fn test_check_rejects_unbalanced_template() -> Result<()> {
  let temp = TempDir::new()?;
  let shipped = std::fs::read_to_string(shipped_manifest())?;
  let broken = shipped.replacen("{% endfor %}", "", 1);
  assert_ne!(broken, shipped);

  let path = temp.path().join("action.yml");
  std::fs::write(&path, broken)?;

  let output = run_tagbot(temp.path(), &["manifest", "--check", "action.yml"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stdout(&output).contains("::error ::"));

  Ok(())
}
