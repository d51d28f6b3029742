//! Version bookkeeping

use semver::Version;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A version to release and the commit it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
  /// Tag name, always `v`-prefixed
  pub version: String,
  pub sha: String,
}

impl fmt::Display for NewVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.version, self.sha)
  }
}

/// Versions in `current` that are missing from `previous`
pub fn added_versions(current: &BTreeMap<String, String>, previous: &BTreeMap<String, String>) -> BTreeMap<String, String> {
  current
    .iter()
    .filter(|(v, _)| !previous.contains_key(*v))
    .map(|(v, tree)| (v.clone(), tree.clone()))
    .collect()
}

/// `1.2.3` -> `v1.2.3`
pub fn tag_name(version: &str) -> String {
  if version.starts_with('v') {
    version.to_string()
  } else {
    format!("v{}", version)
  }
}

/// Parse a tag or registry version, with or without the `v`
pub fn parse(version: &str) -> Option<Version> {
  Version::parse(version.strip_prefix('v').unwrap_or(version)).ok()
}

/// Semver order; unparsable versions sort last, by name
pub fn compare(a: &str, b: &str) -> Ordering {
  match (parse(a), parse(b)) {
    (Some(x), Some(y)) => x.cmp(&y),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => a.cmp(b),
  }
}

/// Sort new versions ascending
pub fn sort(versions: &mut [NewVersion]) {
  versions.sort_by(|a, b| compare(&a.version, &b.version));
}

/// Release branch for a version: `v1.2.3` -> `release-1.2.3`
pub fn release_branch(version: &str) -> String {
  format!("release-{}", version.strip_prefix('v').unwrap_or(version))
}
