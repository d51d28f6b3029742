//! The action manifest (`action.yml`)
//!
//! The manifest is the only interface the Actions runner sees: named inputs with
//! requiredness and defaults, a container image to run, and branding. The canonical
//! manifest lives here as data so that the shipped `action.yml`, the defaults applied
//! by [`crate::core::config::Inputs::resolve`] and the inputs the engine reads all come
//! from one table.

use crate::core::error::{ResultExt, TagBotResult};
use crate::release::changelog;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Default registry for the `registry` input
pub const DEFAULT_REGISTRY: &str = "JuliaRegistries/General";

/// Default for the `dispatch_delay` input, in minutes
pub const DEFAULT_DISPATCH_DELAY: &str = "5";

/// Container image the action runs
pub const IMAGE: &str = "docker://ghcr.io/juliaregistries/tagbot:1";

/// Semantic type of an input; the YAML manifest itself only carries strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
  /// Credential, never logged
  Secret,
  /// `owner/name`
  Repository,
  /// `true` / `false`
  Boolean,
  /// Non-negative integer number of minutes
  Minutes,
  /// Changelog template
  Template,
  /// Comma-delimited list
  List,
}

impl fmt::Display for InputKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      InputKind::Secret => "a secret",
      InputKind::Repository => "a repository in the form owner/name",
      InputKind::Boolean => "true or false",
      InputKind::Minutes => "a whole number of minutes",
      InputKind::Template => "a changelog template",
      InputKind::List => "a comma-delimited list",
    };
    f.write_str(name)
  }
}

/// One declared input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
  #[serde(skip)]
  pub name: String,
  pub description: String,
  #[serde(default)]
  pub required: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<String>,
  #[serde(skip, default = "unknown_kind")]
  pub kind: InputKind,
}

fn unknown_kind() -> InputKind {
  InputKind::Secret
}

impl InputSpec {
  fn new(name: &str, kind: InputKind, description: &str) -> Self {
    Self {
      name: name.to_string(),
      description: description.to_string(),
      required: false,
      default: None,
      kind,
    }
  }

  fn required(mut self) -> Self {
    self.required = true;
    self
  }

  fn default_value(mut self, value: &str) -> Self {
    self.default = Some(value.to_string());
    self
  }

  /// Environment variable the runner uses to pass this input
  pub fn env_var(&self) -> String {
    format!("INPUT_{}", self.name.replace(' ', "_").to_uppercase())
  }
}

/// Execution directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runs {
  pub using: String,
  pub image: String,
}

/// Marketplace branding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branding {
  pub icon: String,
  pub color: String,
}

/// A complete action manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionManifest {
  pub name: String,
  pub author: String,
  pub description: String,
  #[serde(serialize_with = "serialize_inputs", deserialize_with = "deserialize_inputs")]
  pub inputs: Vec<InputSpec>,
  pub runs: Runs,
  pub branding: Branding,
}

fn serialize_inputs<S>(inputs: &[InputSpec], s: S) -> Result<S::Ok, S::Error>
where
  S: Serializer,
{
  s.collect_map(inputs.iter().map(|input| (&input.name, input)))
}

fn deserialize_inputs<'de, D>(d: D) -> Result<Vec<InputSpec>, D::Error>
where
  D: Deserializer<'de>,
{
  // Mapping keeps declaration order
  let mapping = serde_yaml::Mapping::deserialize(d)?;
  let mut inputs = Vec::with_capacity(mapping.len());
  for (key, value) in mapping {
    let name = key
      .as_str()
      .ok_or_else(|| D::Error::custom("input names must be strings"))?
      .to_string();
    let mut input: InputSpec = serde_yaml::from_value(value).map_err(D::Error::custom)?;
    input.kind = kind_of(&name).unwrap_or(InputKind::Secret);
    input.name = name;
    inputs.push(input);
  }
  Ok(inputs)
}

fn kind_of(name: &str) -> Option<InputKind> {
  ActionManifest::tagbot()
    .inputs
    .into_iter()
    .find(|i| i.name == name)
    .map(|i| i.kind)
}

impl ActionManifest {
  /// The manifest this program implements
  pub fn tagbot() -> Self {
    Self {
      name: "Julia TagBot".to_string(),
      author: "JuliaRegistries".to_string(),
      description: "Creates tags, releases, and changelogs for your Julia packages when they're registered"
        .to_string(),
      inputs: vec![
        InputSpec::new("token", InputKind::Secret, "GitHub API token").required(),
        InputSpec::new("registry", InputKind::Repository, "Owner/name of the registry repository")
          .default_value(DEFAULT_REGISTRY),
        InputSpec::new("branches", InputKind::Boolean, "Whether or not to merge release branches")
          .default_value("false"),
        InputSpec::new(
          "dispatch",
          InputKind::Boolean,
          "Whether or not to create a repository dispatch event prior to making releases",
        )
        .default_value("false"),
        InputSpec::new(
          "dispatch_delay",
          InputKind::Minutes,
          "Number of minutes to wait after creating a repository dispatch event",
        )
        .default_value(DEFAULT_DISPATCH_DELAY),
        InputSpec::new("ssh", InputKind::Secret, "SSH private key for pushing tags"),
        InputSpec::new("ssh_password", InputKind::Secret, "Password for the SSH key"),
        InputSpec::new("gpg", InputKind::Secret, "GPG key for signing tags"),
        InputSpec::new("gpg_password", InputKind::Secret, "Password for the GPG key"),
        InputSpec::new("changelog", InputKind::Template, "Changelog template")
          .default_value(changelog::DEFAULT_TEMPLATE),
        InputSpec::new(
          "changelog_ignore",
          InputKind::List,
          "Labels for issues and pull requests to be ignored (comma-delimited)",
        ),
      ],
      runs: Runs {
        using: "docker".to_string(),
        image: IMAGE.to_string(),
      },
      branding: Branding {
        icon: "tag".to_string(),
        color: "purple".to_string(),
      },
    }
  }

  /// Look up an input by name
  pub fn input(&self, name: &str) -> Option<&InputSpec> {
    self.inputs.iter().find(|i| i.name == name)
  }

  /// Render as YAML
  pub fn to_yaml(&self) -> TagBotResult<String> {
    Ok(serde_yaml::to_string(self)?)
  }

  /// Parse from YAML
  pub fn from_yaml(content: &str) -> TagBotResult<Self> {
    Ok(serde_yaml::from_str(content)?)
  }

  /// Load a manifest file
  pub fn load(path: &Path) -> TagBotResult<Self> {
    let content =
      std::fs::read_to_string(path).with_context(|| format!("Failed to read manifest {}", path.display()))?;
    Self::from_yaml(&content).with_context(|| format!("Failed to parse manifest {}", path.display()))
  }

  /// Compare this manifest against the canonical one
  ///
  /// Returns every problem found; an empty list means the manifest matches what the
  /// engine reads.
  pub fn validate(&self) -> Vec<ManifestIssue> {
    let canonical = Self::tagbot();
    let mut issues = Vec::new();

    for expected in &canonical.inputs {
      let Some(actual) = self.input(&expected.name) else {
        issues.push(ManifestIssue::new(&expected.name, "input is not declared"));
        continue;
      };

      if actual.required != expected.required {
        issues.push(ManifestIssue::new(
          &actual.name,
          format!("required should be {}", expected.required),
        ));
      }
      if actual.required && actual.default.is_some() {
        issues.push(ManifestIssue::new(&actual.name, "required input declares a default"));
      }
      if actual.default != expected.default {
        issues.push(ManifestIssue::new(
          &actual.name,
          format!(
            "default should be {}",
            expected.default.as_deref().map(|d| format!("{:?}", d)).unwrap_or("absent".into())
          ),
        ));
      }
      if let Some(default) = &actual.default
        && let Err(reason) = check_value(expected.kind, default)
      {
        issues.push(ManifestIssue::new(&actual.name, format!("default is not {}: {}", expected.kind, reason)));
      }
    }

    for actual in &self.inputs {
      if canonical.input(&actual.name).is_none() {
        issues.push(ManifestIssue::new(&actual.name, "input is not read by tagbot"));
      }
    }

    if self.runs.using != "docker" {
      issues.push(ManifestIssue::new("runs", "action must run using docker"));
    }
    if self.runs.image.trim().is_empty() {
      issues.push(ManifestIssue::new("runs", "no image declared"));
    }

    issues
  }
}

/// Check that a literal value is acceptable for an input kind
pub fn check_value(kind: InputKind, value: &str) -> Result<(), String> {
  match kind {
    InputKind::Secret | InputKind::List => Ok(()),
    InputKind::Boolean => parse_bool(value).map(|_| ()).ok_or_else(|| format!("{:?}", value)),
    InputKind::Minutes => value.trim().parse::<u64>().map(|_| ()).map_err(|e| e.to_string()),
    InputKind::Repository => {
      if is_repository_name(value) {
        Ok(())
      } else {
        Err(format!("{:?}", value))
      }
    }
    InputKind::Template => changelog::validate_template(value).map_err(|e| e.to_string()),
  }
}

/// Parse an Actions boolean
pub fn parse_bool(value: &str) -> Option<bool> {
  match value.trim().to_ascii_lowercase().as_str() {
    "true" => Some(true),
    "false" => Some(false),
    _ => None,
  }
}

/// `owner/name` with both halves non-empty
pub fn is_repository_name(value: &str) -> bool {
  match value.split_once('/') {
    Some((owner, name)) => !owner.is_empty() && !name.is_empty() && !name.contains('/') && !value.contains(' '),
    None => false,
  }
}

/// A single manifest validation finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestIssue {
  pub input: String,
  pub message: String,
}

impl ManifestIssue {
  fn new(input: &str, message: impl Into<String>) -> Self {
    Self {
      input: input.to_string(),
      message: message.into(),
    }
  }
}

impl fmt::Display for ManifestIssue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.input, self.message)
  }
}
