mod commands;
mod core;
mod github;
mod keys;
mod registry;
mod release;
mod ui;
mod utils;

use clap::{Parser, Subcommand};
use core::context::{DEFAULT_API_URL, DEFAULT_SERVER_URL};
use core::error::{TagBotError, print_error};
use std::path::PathBuf;

/// Create GitHub releases for newly registered Julia package versions
#[derive(Parser)]
#[command(name = "tagbot")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Release new versions of the package in this repository (the action entrypoint)
  Run {
    /// Repository to release (owner/name)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,
    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
    /// GitHub web URL (used for cloning and SSH host keys)
    #[arg(long, env = "GITHUB_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,
    /// Log the releases that would be created without creating anything
    #[arg(long)]
    dry_run: bool,
  },

  /// Print the action manifest (action.yml)
  Manifest {
    /// Check an existing manifest instead of printing one
    #[arg(long, value_name = "PATH")]
    check: Option<PathBuf>,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Magenta))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Magenta))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();
  let errors = ui::log::init();

  let result = match cli.command {
    Commands::Run {
      repository,
      api_url,
      server_url,
      dry_run,
    } => commands::run_action(commands::RunArgs {
      repository,
      api_url,
      server_url,
      dry_run,
    }),
    Commands::Manifest { check } => commands::run_manifest(check.as_deref()),
  };

  if let Err(err) = result {
    handle_error(err);
  }

  // Non-fatal problems were logged as errors; the run still fails
  if errors.raised() {
    std::process::exit(1);
  }
}

fn handle_error(err: TagBotError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
