//! Logging as GitHub Actions workflow commands
//!
//! Events go to stdout, where the runner turns `::debug ::`, `::warning ::` and
//! `::error ::` lines into log annotations. Error events also raise an
//! [`ErrorFlag`] so the run can finish its remaining work and still exit non-zero.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "tagbot=debug";

/// Prefix every line of `message` with the workflow command for `level`
pub fn workflow_command(level: Level, message: &str) -> String {
  let prefix = match level {
    Level::ERROR => "::error ::",
    Level::WARN => "::warning ::",
    Level::INFO => "",
    _ => "::debug ::",
  };
  if message.is_empty() {
    return prefix.to_string();
  }
  message
    .lines()
    .map(|line| format!("{}{}", prefix, line))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Event formatter producing workflow commands
pub struct WorkflowCommands;

impl<S, N> FormatEvent<S, N> for WorkflowCommands
where
  S: Subscriber + for<'a> LookupSpan<'a>,
  N: for<'a> FormatFields<'a> + 'static,
{
  fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
    let mut message = String::new();
    ctx.format_fields(Writer::new(&mut message), event)?;
    writeln!(writer, "{}", workflow_command(*event.metadata().level(), &message))
  }
}

/// Set once any error event has been logged
#[derive(Debug, Clone, Default)]
pub struct ErrorFlag(Arc<AtomicBool>);

impl ErrorFlag {
  pub fn raised(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

/// Layer that raises an [`ErrorFlag`] on error events
pub struct ErrorLayer(ErrorFlag);

impl ErrorLayer {
  pub fn new(flag: ErrorFlag) -> Self {
    Self(flag)
  }
}

impl<S: Subscriber> Layer<S> for ErrorLayer {
  fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
    if *event.metadata().level() == Level::ERROR {
      self.0.0.store(true, Ordering::SeqCst);
    }
  }
}

/// Workflow-command output behind `filter`, plus an unfiltered [`ErrorLayer`]
///
/// The filter applies to the output layer only: an error hidden by `RUST_LOG` still
/// raises the flag.
pub fn subscriber<W>(filter: EnvFilter, writer: W, flag: ErrorFlag) -> impl Subscriber + Send + Sync + 'static
where
  W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::fmt::layer()
        .event_format(WorkflowCommands)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter),
    )
    .with(ErrorLayer::new(flag))
}

/// Install the global subscriber; the returned flag reports whether errors were logged
pub fn init() -> ErrorFlag {
  let flag = ErrorFlag::default();
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
  let _ = subscriber(filter, std::io::stdout, flag.clone()).try_init();
  flag
}
