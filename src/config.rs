//! Project configuration describing where scripts live and how they are served.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::context::{
  DEFAULT_BASE_PATH, FilesystemStat, FixedApplication, ScriptContext, WebrootResolver,
};
use crate::script::DEFAULT_CACHE_PARTITION;

/// File name searched for by [`ScriptConfig::discover`].
pub const DEFAULT_CONFIG_FILE: &str = "scripts.config.json";

/// Discoverable configuration for script resolution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
  /// Path prepended to every script file.
  pub base_path: String,
  /// URL scheme used for full URLs.
  pub scheme: String,
  /// Host used for full URLs.
  pub host: String,
  /// Optional port used for full URLs.
  pub port: Option<u16>,
  /// Filesystem directory that script paths are resolved against for timestamps.
  pub document_root: String,
  /// Application used for scripts registered without one.
  pub default_application: Option<String>,
  /// Cache partition assigned to new references.
  pub default_cache_partition: String,
}

impl Default for ScriptConfig {
  fn default() -> Self {
    Self {
      base_path: DEFAULT_BASE_PATH.into(),
      scheme: "http".into(),
      host: "localhost".into(),
      port: None,
      document_root: ".".into(),
      default_application: None,
      default_cache_partition: DEFAULT_CACHE_PARTITION.into(),
    }
  }
}

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// Failed to read the configuration file.
  #[error("failed to read {}: {source}", path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// Failed to parse the configuration JSON.
  #[error("failed to parse {}: {source}", path.display())]
  Parse {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    source: serde_json::Error,
  },
}

impl ScriptConfig {
  /// Load configuration from `dir`, falling back to defaults.
  ///
  /// A missing or unreadable file is not an error here; callers that need to know should
  /// use [`ScriptConfig::from_path`].
  pub fn discover(dir: &Path) -> Self {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    if !candidate.exists() {
      return Self::default();
    }

    match Self::from_path(&candidate) {
      Ok(config) => config,
      Err(err) => {
        warn!(%err, "ignoring script configuration");
        Self::default()
      }
    }
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Document root resolved against `dir` when relative.
  pub fn document_root_path(&self, dir: &Path) -> PathBuf {
    dir.join(&self.document_root)
  }

  /// Build collaborators for scripts served according to this configuration.
  pub fn to_context(&self, dir: &Path) -> ScriptContext {
    let resolver = WebrootResolver::new(&self.scheme, &self.host).with_port(self.port);
    let stat = FilesystemStat::new(self.document_root_path(dir));
    let context = ScriptContext::new(stat, resolver)
      .with_base_path(&self.base_path)
      .with_cache_partition(&self.default_cache_partition);

    match &self.default_application {
      Some(app) if !app.is_empty() => context.with_application(FixedApplication(app.clone())),
      _ => context,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::script::ScriptReference;
  use std::time::{Duration, SystemTime};
  use tempfile::tempdir;

  #[test]
  fn discover_returns_defaults_for_missing_file() {
    let temp = tempdir().expect("failed to create temp dir");
    assert_eq!(ScriptConfig::discover(temp.path()), ScriptConfig::default());
  }

  #[test]
  fn discover_ignores_invalid_json() {
    let temp = tempdir().expect("failed to create temp dir");
    fs::write(temp.path().join(DEFAULT_CONFIG_FILE), "{ not json").unwrap();

    assert_eq!(ScriptConfig::discover(temp.path()), ScriptConfig::default());
    assert!(matches!(
      ScriptConfig::from_path(&temp.path().join(DEFAULT_CONFIG_FILE)),
      Err(ConfigError::Parse { .. })
    ));
  }

  #[test]
  fn from_path_reports_missing_files() {
    let temp = tempdir().expect("failed to create temp dir");
    let err = ScriptConfig::from_path(&temp.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
  }

  #[test]
  fn partial_files_keep_defaults() {
    let temp = tempdir().expect("failed to create temp dir");
    fs::write(
      temp.path().join(DEFAULT_CONFIG_FILE),
      r#"{"host": "mail.example.com", "scheme": "https"}"#,
    )
    .unwrap();

    let config = ScriptConfig::discover(temp.path());
    assert_eq!(config.host, "mail.example.com");
    assert_eq!(config.scheme, "https");
    assert_eq!(config.base_path, "/");
    assert_eq!(config.default_cache_partition, "default");
  }

  #[test]
  fn context_uses_configured_application_and_host() {
    let temp = tempdir().expect("failed to create temp dir");
    fs::create_dir_all(temp.path().join("public/js")).unwrap();
    let file = temp.path().join("public/js/app.js");
    fs::write(&file, "void 0;").unwrap();
    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    fs::File::options()
      .write(true)
      .open(&file)
      .unwrap()
      .set_modified(mtime)
      .unwrap();

    let config = ScriptConfig {
      host: "mail.example.com".into(),
      scheme: "https".into(),
      port: Some(8443),
      document_root: "public".into(),
      default_application: Some("mail".into()),
      ..ScriptConfig::default()
    };
    let context = config.to_context(temp.path());

    let script = ScriptReference::new("js/app.js", None, &context).unwrap();
    assert_eq!(script.application(), "mail");
    assert_eq!(
      script.url_full().unwrap(),
      "https://mail.example.com:8443/js/app.js"
    );
    assert_eq!(script.last_modified().unwrap(), mtime);
    assert_eq!(script.property_by_name("modified").unwrap(), "1700000000");
    assert_eq!(script.cache_partition(), "default");
  }
}
