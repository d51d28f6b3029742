//! Small text helpers shared by the changelog and key setup

use regex::Regex;
use std::sync::LazyLock;

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Normalize a label for comparison
///
/// Case-folds and drops whitespace, `_` and `-`, so "Won't Fix", "wont-fix"
/// and "WONT_FIX" differ only by the apostrophe.
pub fn slug(s: &str) -> String {
  s.chars()
    .flat_map(char::to_lowercase)
    .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
    .collect()
}

/// Collapse runs of blank lines to a single blank line and trim
pub fn collapse_blank_lines(text: &str) -> String {
  BLANK_RUNS.replace_all(text, "\n\n").trim().to_string()
}

/// Strip a `> ` quote marker from the start of each line
pub fn unquote(text: &str) -> String {
  text
    .lines()
    .map(|line| line.strip_prefix("> ").or_else(|| line.strip_prefix('>')).unwrap_or(line))
    .collect::<Vec<_>>()
    .join("\n")
}

/// `n unit`, pluralized
pub fn plural(n: u64, unit: &str) -> String {
  if n == 1 {
    format!("{} {}", n, unit)
  } else {
    format!("{} {}s", n, unit)
  }
}
