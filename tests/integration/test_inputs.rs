//! Tests for input handling of `tagbot run`
//!
//! Every case here fails before any network access or clone happens.

use crate::helpers::*;
use anyhow::Result;
use tempfile::TempDir;

#[test]
fn test_missing_token_fails_before_clone() -> Result<()> {
  let temp = TempDir::new()?;
  let output = run_tagbot(temp.path(), &["run"], &[("GITHUB_REPOSITORY", "Foo/Bar.jl")])?;

  assert_eq!(output.status.code(), Some(1));
  let out = stdout(&output);
  assert!(out.contains("::error ::Input required and not supplied: token"), "{}", out);
  assert!(!out.contains("git clone"));

  Ok(())
}

#[test]
fn test_blank_token_counts_as_missing() -> Result<()> {
  let temp = TempDir::new()?;
  let output = run_tagbot(
    temp.path(),
    &["run"],
    &[("GITHUB_REPOSITORY", "Foo/Bar.jl"), ("INPUT_TOKEN", "  ")],
  )?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stdout(&output).contains("not supplied: token"));

  Ok(())
}

#[test]
fn test_missing_repository() -> Result<()> {
  let temp = TempDir::new()?;
  let output = run_tagbot(temp.path(), &["run"], &[("INPUT_TOKEN", "x")])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stdout(&output).contains("GITHUB_REPOSITORY"));

  Ok(())
}

#[test]
fn test_invalid_typed_inputs() -> Result<()> {
  let temp = TempDir::new()?;
  let cases = [
    ("INPUT_DISPATCH_DELAY", "soon"),
    ("INPUT_BRANCHES", "yes"),
    ("INPUT_REGISTRY", "General"),
  ];

  for (name, value) in cases {
    let output = run_tagbot(
      temp.path(),
      &["run"],
      &[("GITHUB_REPOSITORY", "Foo/Bar.jl"), ("INPUT_TOKEN", "x"), (name, value)],
    )?;
    assert_eq!(output.status.code(), Some(1), "{}={}", name, value);
    assert!(stdout(&output).contains("Invalid value for input"), "{}={}", name, value);
  }

  Ok(())
}

#[test]
fn test_token_never_logged() -> Result<()> {
  let temp = TempDir::new()?;
  let output = run_tagbot(
    temp.path(),
    &["run"],
    &[("INPUT_TOKEN", "sup3r-s3cret"), ("INPUT_DISPATCH_DELAY", "later")],
  )?;

  assert!(!output.status.success());
  assert!(!stdout(&output).contains("sup3r-s3cret"));
  assert!(!String::from_utf8_lossy(&output.stderr).contains("sup3r-s3cret"));

  Ok(())
}
