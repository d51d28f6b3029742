//! `tagbot run`: release every newly registered version

use crate::core::config::Inputs;
use crate::core::context::ActionContext;
use crate::core::error::TagBotResult;
use crate::core::vcs::SystemGit;
use crate::github::GitHubClient;
use crate::release::Releaser;
use crate::utils;
use std::time::Duration;

/// Runner-provided settings (flags fall back to `GITHUB_*` variables)
pub struct RunArgs {
  pub repository: Option<String>,
  pub api_url: String,
  pub server_url: String,
  pub dry_run: bool,
}

/// Run the action
pub fn run_action(args: RunArgs) -> TagBotResult<()> {
  // Inputs first: a missing token must fail before anything touches the network
  let inputs = Inputs::from_env()?;
  let ctx = ActionContext::build(inputs, args.repository, &args.api_url, &args.server_url, args.dry_run)?;

  let token = ctx.inputs.token.expose();
  let api = GitHubClient::new(&ctx.api_url, token)?;
  let git = SystemGit::clone_repo(&ctx.clone_url(&ctx.repository), Some(token))?;

  let mut releaser = Releaser::new(&api, &ctx, git);
  execute(&mut releaser, &ctx)
}

/// The release pipeline over an already-cloned repository
pub fn execute(releaser: &mut Releaser<'_>, ctx: &ActionContext) -> TagBotResult<()> {
  let inputs = &ctx.inputs;

  if !releaser.is_registered()? {
    tracing::info!("This package is not registered, skipping");
    tracing::info!("If this repository is not going to be registered, then remove TagBot");
    return Ok(());
  }

  let versions = releaser.new_versions()?;
  if versions.is_empty() {
    tracing::info!("No new versions to release");
    return Ok(());
  }

  if ctx.dry_run {
    for v in &versions {
      tracing::info!("Dry run: would process version {}", v);
      releaser.preview_release(&v.version, &v.sha)?;
    }
    return Ok(());
  }

  if inputs.dispatch {
    releaser.create_dispatch_event(&versions)?;
    let minutes = inputs.dispatch_delay;
    tracing::info!("Waiting {} for any dispatch handlers", utils::plural(minutes, "minute"));
    std::thread::sleep(dispatch_wait(minutes));
  }

  if let Some(ssh) = &inputs.ssh {
    releaser.configure_ssh(ssh.expose(), inputs.ssh_password.as_ref().map(|p| p.expose()))?;
  }
  if let Some(gpg) = &inputs.gpg {
    releaser.configure_gpg(gpg.expose(), inputs.gpg_password.as_ref().map(|p| p.expose()))?;
  }

  for v in &versions {
    tracing::info!("Processing version {}", v);
    if inputs.branches {
      releaser.handle_release_branch(&v.version)?;
    }
    releaser.create_release(&v.version, &v.sha)?;
  }

  Ok(())
}

/// Wait after a dispatch event; saturates instead of overflowing
fn dispatch_wait(minutes: u64) -> Duration {
  Duration::from_secs(minutes.saturating_mul(60))
}
