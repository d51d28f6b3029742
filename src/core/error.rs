//! Error types for tagbot with contextual messages and exit codes
//!
//! Every fatal problem surfaces as a `TagBotError`. The variants categorize the
//! failure so the run can exit with a meaningful code and print a hint that
//! points the user at the input or permission that needs fixing.

use std::fmt;
use std::io;

/// Exit codes for tagbot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (inputs, project file, template)
  User = 1,
  /// System error (git, network, I/O)
  System = 2,
  /// Key setup failure (SSH, GPG)
  Keys = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for tagbot
#[derive(Debug)]
pub enum TagBotError {
  /// Input and environment errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// GitHub API errors
  Api(ApiError),

  /// SSH/GPG setup errors
  Keys(KeyError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl TagBotError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    TagBotError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    TagBotError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      TagBotError::Message { message, context, help } => TagBotError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      TagBotError::Io(e) => TagBotError::Message {
        message: ctx_str,
        context: Some(format!("I/O error: {}", e)),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      TagBotError::Config(_) => ExitCode::User,
      TagBotError::Git(_) => ExitCode::System,
      TagBotError::Api(_) => ExitCode::System,
      TagBotError::Keys(_) => ExitCode::Keys,
      TagBotError::Io(_) => ExitCode::System,
      TagBotError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      TagBotError::Config(e) => e.help_message(),
      TagBotError::Git(e) => e.help_message(),
      TagBotError::Api(e) => e.help_message(),
      TagBotError::Keys(e) => e.help_message(),
      TagBotError::Message { help, .. } => help.clone(),
      TagBotError::Io(_) => None,
    }
  }
}

impl fmt::Display for TagBotError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TagBotError::Config(e) => write!(f, "{}", e),
      TagBotError::Git(e) => write!(f, "{}", e),
      TagBotError::Api(e) => write!(f, "{}", e),
      TagBotError::Keys(e) => write!(f, "{}", e),
      TagBotError::Io(e) => write!(f, "I/O error: {}", e),
      TagBotError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for TagBotError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      TagBotError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for TagBotError {
  fn from(err: io::Error) -> Self {
    TagBotError::Io(err)
  }
}

impl From<String> for TagBotError {
  fn from(msg: String) -> Self {
    TagBotError::message(msg)
  }
}

impl From<&str> for TagBotError {
  fn from(msg: &str) -> Self {
    TagBotError::message(msg)
  }
}

impl From<toml_edit::de::Error> for TagBotError {
  fn from(err: toml_edit::de::Error) -> Self {
    TagBotError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for TagBotError {
  fn from(err: serde_json::Error) -> Self {
    TagBotError::message(format!("JSON error: {}", err))
  }
}

impl From<serde_yaml::Error> for TagBotError {
  fn from(err: serde_yaml::Error) -> Self {
    TagBotError::message(format!("YAML error: {}", err))
  }
}

impl From<minijinja::Error> for TagBotError {
  fn from(err: minijinja::Error) -> Self {
    TagBotError::with_help(
      format!("Changelog template error: {}", err),
      "Check that every {% if %} and {% for %} block in the `changelog` input is closed.",
    )
  }
}

impl From<croner::errors::CronError> for TagBotError {
  fn from(err: croner::errors::CronError) -> Self {
    TagBotError::message(format!("Cron expression error: {}", err))
  }
}

impl From<reqwest::Error> for TagBotError {
  fn from(err: reqwest::Error) -> Self {
    TagBotError::Api(ApiError::Transport {
      url: err.url().map(|u| u.to_string()).unwrap_or_default(),
      reason: err.to_string(),
    })
  }
}

impl From<std::string::FromUtf8Error> for TagBotError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    TagBotError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<tempfile::PersistError> for TagBotError {
  fn from(err: tempfile::PersistError) -> Self {
    TagBotError::Io(err.error)
  }
}

/// Input and environment errors
#[derive(Debug)]
pub enum ConfigError {
  /// A required action input was not supplied
  MissingInput { name: String },

  /// An action input could not be parsed as its declared type
  InvalidInput { name: String, value: String, expected: String },

  /// A runner environment variable is missing
  MissingEnv { name: String },

  /// Neither Project.toml nor JuliaProject.toml exists
  ProjectNotFound,

  /// The project file lacks a field
  ProjectField { field: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::MissingInput { name } => Some(format!(
        "Add `{}: ...` under `with:` in the workflow step that uses TagBot.",
        name
      )),
      ConfigError::InvalidInput { name, expected, .. } => {
        Some(format!("The `{}` input must be {}.", name, expected))
      }
      ConfigError::MissingEnv { name } => Some(format!(
        "{} is set by the GitHub Actions runner. Pass it explicitly when running outside Actions.",
        name
      )),
      ConfigError::ProjectNotFound => {
        Some("TagBot must run in a repository containing a Julia package.".to_string())
      }
      ConfigError::ProjectField { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::MissingInput { name } => write!(f, "Input required and not supplied: {}", name),
      ConfigError::InvalidInput { name, value, .. } => {
        write!(f, "Invalid value for input {}: {:?}", name, value)
      }
      ConfigError::MissingEnv { name } => write!(f, "Environment variable {} is not set", name),
      ConfigError::ProjectNotFound => write!(f, "Project file was not found"),
      ConfigError::ProjectField { field } => write!(f, "Project file has no `{}` field", field),
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed (command and stderr are already scrubbed of secrets)
  CommandFailed { command: String, stderr: String },

  /// Cloning the repository failed
  CloneFailed { repo: String, reason: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::CommandFailed { stderr, .. } => {
        if stderr.contains("Permission denied") || stderr.contains("403") {
          Some("Check that the token (or SSH deploy key) has write access to the repository.".to_string())
        } else {
          None
        }
      }
      GitError::CloneFailed { .. } => {
        Some("Check that the token can read the repository.".to_string())
      }
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command '{}' failed", command)?;
        if !stderr.is_empty() {
          write!(f, "\n{}", stderr)?;
        }
        Ok(())
      }
      GitError::CloneFailed { repo, reason } => write!(f, "Cloning {} failed: {}", repo, reason),
    }
  }
}

/// GitHub API errors
#[derive(Debug)]
pub enum ApiError {
  /// The API answered with a non-success status
  Status { status: u16, url: String, body: String },

  /// The request never completed
  Transport { url: String, reason: String },
}

impl ApiError {
  /// HTTP status, when the API answered at all
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Status { status, .. } => Some(*status),
      ApiError::Transport { .. } => None,
    }
  }

  fn help_message(&self) -> Option<String> {
    match self.status() {
      Some(401) => Some("The `token` input is invalid or expired.".to_string()),
      Some(403) => Some("The token lacks permission, or the API rate limit was hit.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for ApiError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ApiError::Status { status, url, body } => write!(f, "GitHub API error ({}) for {}: {}", status, url, body),
      ApiError::Transport { url, reason } => write!(f, "GitHub API request to {} failed: {}", url, reason),
    }
  }
}

/// SSH/GPG setup errors
#[derive(Debug)]
pub enum KeyError {
  /// GPG key import failed
  Import { stderr: String },

  /// Signing test data with the GPG key failed
  Sign { stderr: String },

  /// ssh-agent / ssh-add failed
  Agent { message: String },

  /// A required tool is missing or failed
  Tool { tool: String, stderr: String },
}

impl KeyError {
  fn help_message(&self) -> Option<String> {
    match self {
      KeyError::Import { .. } => {
        Some("The `gpg` input must be an ASCII-armored private key, optionally Base64-encoded.".to_string())
      }
      KeyError::Sign { .. } => Some("Check the `gpg_password` input.".to_string()),
      KeyError::Agent { .. } => Some("Check the `ssh_password` input.".to_string()),
      KeyError::Tool { tool, .. } => Some(format!("Make sure `{}` is installed in the image.", tool)),
    }
  }
}

impl fmt::Display for KeyError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KeyError::Import { stderr } => write!(f, "Importing key failed\n{}", stderr),
      KeyError::Sign { stderr } => write!(f, "Testing GPG key failed\n{}", stderr),
      KeyError::Agent { message } => write!(f, "SSH agent setup failed: {}", message),
      KeyError::Tool { tool, stderr } => write!(f, "{} failed: {}", tool, stderr),
    }
  }
}

/// Result type alias for tagbot
pub type TagBotResult<T> = Result<T, TagBotError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> TagBotResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> TagBotResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<TagBotError>,
{
  fn context(self, ctx: impl Into<String>) -> TagBotResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> TagBotResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Log an error as a workflow `::error` annotation, followed by its help text
pub fn print_error(error: &TagBotError) {
  tracing::error!("{}", error);

  if let Some(help) = error.help_message() {
    tracing::info!("Help: {}", help);
  }
}

impl From<anyhow::Error> for TagBotError {
  fn from(err: anyhow::Error) -> Self {
    TagBotError::message(format!("{:#}", err))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exit_codes() {
    let missing = TagBotError::Config(ConfigError::MissingInput { name: "token".into() });
    assert_eq!(missing.exit_code(), ExitCode::User);
    assert_eq!(missing.exit_code().as_i32(), 1);

    let git = TagBotError::Git(GitError::CommandFailed {
      command: "git push".into(),
      stderr: String::new(),
    });
    assert_eq!(git.exit_code(), ExitCode::System);

    let keys = TagBotError::Keys(KeyError::Import { stderr: "bad".into() });
    assert_eq!(keys.exit_code().as_i32(), 3);
  }

  #[test]
  fn test_context_chains_messages() {
    let err = TagBotError::message("inner").context("middle").context("outer");
    assert_eq!(err.to_string(), "inner\nouter\nmiddle");
  }

  #[test]
  fn test_io_context_becomes_message() {
    let io = io::Error::new(io::ErrorKind::NotFound, "gone");
    let err: TagBotResult<()> = Err(io).context("Failed to read Versions.toml");
    let err = err.unwrap_err();
    assert!(err.to_string().starts_with("Failed to read Versions.toml"));
    assert!(err.to_string().contains("gone"));
  }

  #[test]
  fn test_missing_input_help() {
    let err = TagBotError::Config(ConfigError::MissingInput { name: "token".into() });
    assert_eq!(err.to_string(), "Input required and not supplied: token");
    assert!(err.help_message().unwrap().contains("token:"));
  }

  #[test]
  fn test_api_error_help_by_status() {
    let unauthorized = ApiError::Status {
      status: 401,
      url: "https://api.github.com/repos/Foo/Bar".into(),
      body: "Bad credentials".into(),
    };
    assert_eq!(unauthorized.status(), Some(401));
    assert!(TagBotError::Api(unauthorized).help_message().is_some());

    let transport = ApiError::Transport {
      url: String::new(),
      reason: "timeout".into(),
    };
    assert_eq!(transport.status(), None);
    assert!(TagBotError::Api(transport).help_message().is_none());
  }

  #[test]
  fn test_import_error_message() {
    let err = TagBotError::Keys(KeyError::Import { stderr: "no key".into() });
    assert!(err.to_string().starts_with("Importing key failed"));
  }
}
