//! Error types raised while building and rendering script references.

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by [`crate::ScriptReference`] and its collaborators.
#[derive(Debug, Error)]
pub enum ScriptError {
  /// No application was supplied and none could be read from the current context.
  #[error("no application supplied and no current application is set")]
  MissingContext,
  /// The reference was built without collaborators, so URLs and timestamps are unavailable.
  #[error("script reference has no context attached")]
  Detached,
  /// Priority value outside the five defined levels.
  #[error("invalid script priority {0}, expected a value between 1 and 5")]
  InvalidPriority(i64),
  /// The stat provider could not find the resource.
  #[error("script resource not found: {path}")]
  ResourceNotFound {
    /// Absolute script path that was looked up.
    path: String,
  },
  /// The stat provider found the resource but could not read its metadata.
  #[error("failed to stat {}: {source}", path.display())]
  Stat {
    /// Filesystem path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// Opaque failure reported by a URL resolver.
  #[error(transparent)]
  Resolver(Box<dyn std::error::Error + Send + Sync>),
  /// Property lookup by a name outside the known property set.
  #[error("unknown script property `{0}`")]
  UnknownProperty(String),
}

impl ScriptError {
  /// Wrap an arbitrary resolver failure without altering its message.
  pub fn resolver<E>(err: E) -> Self
  where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
  {
    Self::Resolver(err.into())
  }
}

/// Result alias used throughout the crate.
pub type ScriptResult<T> = Result<T, ScriptError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resolver_errors_keep_their_message() {
    let err = ScriptError::resolver("no route for /missing.js");
    assert_eq!(err.to_string(), "no route for /missing.js");
  }

  #[test]
  fn invalid_priority_reports_value() {
    let err = ScriptError::InvalidPriority(6);
    assert!(err.to_string().contains('6'));
  }
}
