//! How far back in registry history to look for new versions
//!
//! A version counts as new when the registry has it now but did not have it
//! one lookback ago. When TagBot runs on a cron schedule, the lookback covers
//! three schedule intervals so that a few failed runs do not lose a release.

use crate::core::error::{TagBotError, TagBotResult};
use chrono::{DateTime, TimeDelta, Utc};
use croner::Cron;
use serde_yaml::Value;
use std::path::Path;

/// Lookback used when no scheduled TagBot workflow is found
pub fn default_lookback() -> TimeDelta {
  TimeDelta::days(3) + TimeDelta::hours(1)
}

/// Lookback for a repository, from the workflows in `workflows_dir`
///
/// Files that are unreadable, not YAML, or not TagBot workflows are skipped.
pub fn lookback(workflows_dir: &Path, now: DateTime<Utc>) -> TimeDelta {
  let default = default_lookback();

  let Ok(entries) = std::fs::read_dir(workflows_dir) else {
    tracing::debug!("No workflows directory found");
    return default;
  };
  let mut files: Vec<_> = entries
    .filter_map(|e| e.ok())
    .map(|e| e.path())
    .filter(|p| p.is_file())
    .collect();
  files.sort();

  for file in files {
    let Ok(content) = std::fs::read_to_string(&file) else {
      continue;
    };
    let Some(cron) = tagbot_cron(&content) else {
      continue;
    };
    match cron_interval(&cron, now) {
      Ok(interval) => {
        let scheduled = interval * 3 + TimeDelta::hours(1);
        tracing::debug!("Found TagBot schedule '{}' in {}", cron, file.display());
        return scheduled.max(default);
      }
      Err(e) => tracing::debug!("Ignoring schedule '{}' in {}: {}", cron, file.display(), e),
    }
  }

  default
}

/// First cron schedule of a workflow that runs TagBot
fn tagbot_cron(workflow: &str) -> Option<String> {
  let doc: Value = serde_yaml::from_str(workflow).ok()?;
  if !uses_tagbot(&doc) {
    return None;
  }

  // YAML 1.1 parsers read a bare `on` key as `true`
  let on = doc.get("on").or_else(|| doc.as_mapping()?.get(Value::Bool(true)))?;
  on.get("schedule")?
    .get(0)?
    .get("cron")?
    .as_str()
    .map(String::from)
}

fn uses_tagbot(doc: &Value) -> bool {
  let Some(jobs) = doc.get("jobs").and_then(Value::as_mapping) else {
    return false;
  };
  jobs
    .values()
    .filter_map(|job| job.get("steps")?.as_sequence())
    .flatten()
    .filter_map(|step| step.get("uses")?.as_str())
    .any(|uses| uses.contains("TagBot"))
}

/// Gap between the occurrences of a cron expression on either side of `now`
pub fn cron_interval(expr: &str, now: DateTime<Utc>) -> TagBotResult<TimeDelta> {
  let cron = Cron::new(expr).parse()?;
  let next = cron.find_next_occurrence(&now, false)?;
  let prev = previous_occurrence(&cron, next)
    .ok_or_else(|| TagBotError::message(format!("Schedule '{}' has no occurrence before {}", expr, next)))?;
  Ok(next - prev)
}

/// Latest occurrence strictly before `before`, searching forward from ever earlier starts
fn previous_occurrence(cron: &Cron, before: DateTime<Utc>) -> Option<DateTime<Utc>> {
  let mut window = TimeDelta::hours(1);
  while window <= TimeDelta::days(366 * 8) {
    let found = cron.iter_from(before - window).take_while(|t| *t < before).last();
    if found.is_some() {
      return found;
    }
    window = window * 2;
  }
  None
}
