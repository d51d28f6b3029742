use crate::core::error::{ConfigError, TagBotError, TagBotResult};
use crate::core::manifest::{self, ActionManifest, InputKind};
use std::collections::HashMap;
use std::fmt;

/// Labels ignored by the changelog when `changelog_ignore` is not supplied
pub const DEFAULT_IGNORE: &[&str] = &[
  "changelog skip",
  "duplicate",
  "exclude from changelog",
  "invalid",
  "no changelog",
  "question",
  "wont fix",
];

/// A credential that never appears in `Debug` output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  /// The secret value
  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for Secret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Secret(***)")
  }
}

/// Action inputs, resolved against the manifest and parsed into their types
#[derive(Debug, Clone)]
pub struct Inputs {
  pub token: Secret,
  pub registry: String,
  pub branches: bool,
  pub dispatch: bool,
  /// Minutes to wait after a dispatch event
  pub dispatch_delay: u64,
  pub ssh: Option<Secret>,
  pub ssh_password: Option<Secret>,
  pub gpg: Option<Secret>,
  pub gpg_password: Option<Secret>,
  pub changelog: String,
  pub changelog_ignore: Vec<String>,
}

impl Inputs {
  /// Read inputs from the process environment (`INPUT_*`)
  pub fn from_env() -> TagBotResult<Self> {
    Self::resolve(&ActionManifest::tagbot(), |var| std::env::var(var).ok())
  }

  /// Resolve every declared input through `lookup`
  ///
  /// The runner passes unset inputs as empty strings, so blank values count as absent.
  /// Absent inputs take their declared default; a required input with neither fails
  /// before anything else happens.
  pub fn resolve<F>(manifest: &ActionManifest, lookup: F) -> TagBotResult<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut raw: HashMap<&str, String> = HashMap::new();

    for input in &manifest.inputs {
      let supplied = lookup(&input.env_var())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
      match supplied.or_else(|| input.default.clone()) {
        Some(value) => {
          manifest::check_value(input.kind, &value).map_err(|_| invalid(&input.name, &value, input.kind))?;
          raw.insert(input.name.as_str(), value);
        }
        None if input.required => {
          return Err(TagBotError::Config(ConfigError::MissingInput {
            name: input.name.clone(),
          }));
        }
        None => {}
      }
    }

    let text = |name: &str| raw.get(name).cloned();
    let flag = |name: &str| raw.get(name).and_then(|v| manifest::parse_bool(v)).unwrap_or(false);

    let token = text("token").map(Secret::new).ok_or_else(|| {
      TagBotError::Config(ConfigError::MissingInput {
        name: "token".to_string(),
      })
    })?;

    let dispatch_delay = match text("dispatch_delay") {
      Some(v) => v
        .parse::<u64>()
        .map_err(|_| invalid("dispatch_delay", &v, InputKind::Minutes))?,
      None => 0,
    };

    let changelog_ignore = match text("changelog_ignore") {
      Some(list) => split_list(&list),
      None => DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
    };

    Ok(Self {
      token,
      registry: text("registry").unwrap_or_else(|| manifest::DEFAULT_REGISTRY.to_string()),
      branches: flag("branches"),
      dispatch: flag("dispatch"),
      dispatch_delay,
      ssh: text("ssh").map(Secret::new),
      ssh_password: text("ssh_password").map(Secret::new),
      gpg: text("gpg").map(Secret::new),
      gpg_password: text("gpg_password").map(Secret::new),
      changelog: text("changelog").unwrap_or_default(),
      changelog_ignore,
    })
  }
}

fn invalid(name: &str, value: &str, kind: InputKind) -> TagBotError {
  TagBotError::Config(ConfigError::InvalidInput {
    name: name.to_string(),
    value: if kind == InputKind::Secret {
      "***".to_string()
    } else {
      value.to_string()
    },
    expected: kind.to_string(),
  })
}

/// Split a comma-delimited input, dropping blank entries
pub fn split_list(list: &str) -> Vec<String> {
  list
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(String::from)
    .collect()
}
