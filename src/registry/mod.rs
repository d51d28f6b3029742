//! Julia package and registry files
//!
//! Three TOML files matter: the package's own `Project.toml` (for its name and
//! UUID), the registry's `Registry.toml` (UUID to package directory) and the
//! package's `Versions.toml` inside the registry (version to git tree SHA).

use crate::core::error::{ConfigError, ResultExt, TagBotError, TagBotResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Project file names, in lookup order
pub const PROJECT_FILES: &[&str] = &["Project.toml", "JuliaProject.toml"];

/// The fields of a project file tagbot needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
  pub name: String,
  pub uuid: String,
}

#[derive(Debug, Deserialize)]
struct ProjectFile {
  name: Option<String>,
  uuid: Option<String>,
}

impl Project {
  /// Read the first project file found in `root`
  pub fn load(root: &Path) -> TagBotResult<Self> {
    for file in PROJECT_FILES {
      let path = root.join(file);
      if path.is_file() {
        let content =
          std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        return Self::parse(&content).with_context(|| format!("Failed to parse {}", file));
      }
    }
    Err(TagBotError::Config(ConfigError::ProjectNotFound))
  }

  pub fn parse(content: &str) -> TagBotResult<Self> {
    let file: ProjectFile = toml_edit::de::from_str(content)?;
    let field = |value: Option<String>, field: &str| {
      value.ok_or_else(|| TagBotError::Config(ConfigError::ProjectField { field: field.to_string() }))
    };
    Ok(Self {
      name: field(file.name, "name")?,
      uuid: field(file.uuid, "uuid")?.to_lowercase(),
    })
  }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
  #[serde(default)]
  packages: BTreeMap<String, RegistryEntry>,
}

#[derive(Debug, Deserialize)]
struct RegistryEntry {
  path: String,
}

/// Directory of a package inside the registry, by UUID
pub fn package_path(registry_toml: &str, uuid: &str) -> TagBotResult<Option<String>> {
  let registry: RegistryFile = toml_edit::de::from_str(registry_toml).context("Failed to parse Registry.toml")?;
  let uuid = uuid.to_lowercase();
  Ok(
    registry
      .packages
      .into_iter()
      .find(|(key, _)| key.to_lowercase() == uuid)
      .map(|(_, entry)| entry.path),
  )
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
  #[serde(rename = "git-tree-sha1")]
  git_tree_sha1: String,
}

/// Version -> tree SHA map read from `Versions.toml`
pub fn parse_versions(versions_toml: &str) -> TagBotResult<BTreeMap<String, String>> {
  let versions: BTreeMap<String, VersionEntry> =
    toml_edit::de::from_str(versions_toml).context("Failed to parse Versions.toml")?;
  Ok(versions.into_iter().map(|(v, e)| (v, e.git_tree_sha1)).collect())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  const REGISTRY: &str = r#"
name = "General"
uuid = "23338594-aafe-5451-b93e-139f81909106"
repo = "https://github.com/JuliaRegistries/General.git"

[packages]
00701ae9-d1dc-5365-b64a-a3a3ebf5695e = { name = "BinaryProvider", path = "B/BinaryProvider" }
7876af07-990d-54b4-ab0e-23690620f79a = { name = "Example", path = "E/Example" }
"#;

  #[test]
  fn test_project_parse() {
    let project = Project::parse(
      "name = \"Example\"\nuuid = \"7876AF07-990D-54B4-AB0E-23690620F79A\"\nversion = \"0.5.3\"\n\n[deps]\n",
    )
    .unwrap();
    assert_eq!(project.name, "Example");
    assert_eq!(project.uuid, "7876af07-990d-54b4-ab0e-23690620f79a");

    let err = Project::parse("name = \"Example\"\n").unwrap_err();
    assert!(err.to_string().contains("uuid"));
  }

  #[test]
  fn test_project_load_order() {
    let dir = TempDir::new().unwrap();
    assert_eq!(
      Project::load(dir.path()).unwrap_err().to_string(),
      "Project file was not found"
    );

    std::fs::write(dir.path().join("JuliaProject.toml"), "name = \"B\"\nuuid = \"2\"\n").unwrap();
    assert_eq!(Project::load(dir.path()).unwrap().name, "B");

    std::fs::write(dir.path().join("Project.toml"), "name = \"A\"\nuuid = \"1\"\n").unwrap();
    assert_eq!(Project::load(dir.path()).unwrap().name, "A");
  }

  #[test]
  fn test_package_path() {
    assert_eq!(
      package_path(REGISTRY, "7876af07-990d-54b4-ab0e-23690620f79a").unwrap(),
      Some("E/Example".to_string())
    );
    assert_eq!(
      package_path(REGISTRY, "00701AE9-D1DC-5365-B64A-A3A3EBF5695E").unwrap(),
      Some("B/BinaryProvider".to_string())
    );
    assert_eq!(package_path(REGISTRY, "abc").unwrap(), None);
    assert_eq!(package_path("name = \"Empty\"\n", "abc").unwrap(), None);
  }

  #[test]
  fn test_parse_versions() {
    let content = r#"
["0.1.0"]
git-tree-sha1 = "aaa"

["0.2.0"]
git-tree-sha1 = "bbb"
yanked = true
"#;
    let versions = parse_versions(content).unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions["0.1.0"], "aaa");
    assert_eq!(versions["0.2.0"], "bbb");
    assert!(parse_versions("[\"0.1.0\"]\n").is_err());
  }
}
