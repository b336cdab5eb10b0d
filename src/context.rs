//! Collaborators consulted by script references.
//!
//! A reference never reaches for global state. Instead it is handed a [`ScriptContext`]
//! bundling three read-only providers: the current application, a stat provider for
//! modification times and a URL resolver. Each provider is a small trait so that callers
//! can plug in their routing layer, and tests can plug in fixed values.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tracing::debug;

use crate::error::{ScriptError, ScriptResult};
use crate::script::DEFAULT_CACHE_PARTITION;

/// Base path prepended to every script file when none is configured.
pub const DEFAULT_BASE_PATH: &str = "/";

/// Supplies the application that owns scripts registered without an explicit one.
pub trait CurrentApplication {
  /// Returns the active application, if any.
  fn current_application(&self) -> Option<String>;
}

/// Looks up modification timestamps for script resources.
pub trait ResourceStat {
  /// Returns the last modification time of the resource at `absolute_path`.
  ///
  /// Fails with [`ScriptError::ResourceNotFound`] when the resource does not exist.
  fn stat(&self, absolute_path: &str) -> ScriptResult<SystemTime>;
}

/// Maps script paths to URLs.
pub trait UrlResolver {
  /// Resolve `path` into a URL, including scheme and host when `full` is set.
  fn resolve(&self, path: &str, full: bool) -> ScriptResult<String>;
}

/// Shared set of collaborators handed to script references.
#[derive(Clone)]
pub struct ScriptContext {
  base_path: String,
  cache_partition: String,
  application: Option<Arc<dyn CurrentApplication + Send + Sync>>,
  stat: Arc<dyn ResourceStat + Send + Sync>,
  resolver: Arc<dyn UrlResolver + Send + Sync>,
}

impl ScriptContext {
  /// Create a context from a stat provider and a URL resolver.
  pub fn new<S, R>(stat: S, resolver: R) -> Self
  where
    S: ResourceStat + Send + Sync + 'static,
    R: UrlResolver + Send + Sync + 'static,
  {
    Self {
      base_path: DEFAULT_BASE_PATH.to_string(),
      cache_partition: DEFAULT_CACHE_PARTITION.to_string(),
      application: None,
      stat: Arc::new(stat),
      resolver: Arc::new(resolver),
    }
  }

  /// Attach a current-application provider.
  pub fn with_application<A>(mut self, application: A) -> Self
  where
    A: CurrentApplication + Send + Sync + 'static,
  {
    self.application = Some(Arc::new(application));
    self
  }

  /// Override the base path prepended to script files.
  pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
    self.base_path = base_path.into();
    self
  }

  /// Cache partition assigned to references created from this context.
  pub fn with_cache_partition(mut self, partition: impl Into<String>) -> Self {
    self.cache_partition = partition.into();
    self
  }

  /// Base path prepended to script files.
  pub fn base_path(&self) -> &str {
    &self.base_path
  }

  /// Cache partition assigned to new references.
  pub fn cache_partition(&self) -> &str {
    &self.cache_partition
  }

  /// The application currently reported by the provider, if one is attached.
  pub fn current_application(&self) -> Option<String> {
    self
      .application
      .as_ref()
      .and_then(|provider| provider.current_application())
      .filter(|app| !app.is_empty())
  }

  pub(crate) fn stat(&self, absolute_path: &str) -> ScriptResult<SystemTime> {
    self.stat.stat(absolute_path)
  }

  pub(crate) fn resolve(&self, path: &str, full: bool) -> ScriptResult<String> {
    let url = self.resolver.resolve(path, full)?;
    debug!(path, full, %url, "resolved script url");
    Ok(url)
  }
}

impl std::fmt::Debug for ScriptContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ScriptContext")
      .field("base_path", &self.base_path)
      .field("cache_partition", &self.cache_partition)
      .field("has_application", &self.application.is_some())
      .finish_non_exhaustive()
  }
}

/// Provider that always reports the same application.
#[derive(Debug, Clone)]
pub struct FixedApplication(pub String);

impl CurrentApplication for FixedApplication {
  fn current_application(&self) -> Option<String> {
    Some(self.0.clone())
  }
}

/// Stack of active applications, the innermost push being current.
#[derive(Debug, Default)]
pub struct ApplicationStack {
  stack: Mutex<Vec<String>>,
}

impl ApplicationStack {
  /// Create an empty stack.
  pub fn new() -> Self {
    Self::default()
  }

  /// Make `application` current until the matching [`ApplicationStack::pop`].
  pub fn push(&self, application: impl Into<String>) {
    let application = application.into();
    debug!(%application, "entering application");
    self.lock().push(application);
  }

  /// Leave the innermost application, returning it.
  pub fn pop(&self) -> Option<String> {
    let popped = self.lock().pop();
    if let Some(application) = &popped {
      debug!(%application, "leaving application");
    }
    popped
  }

  /// Number of applications currently pushed.
  pub fn depth(&self) -> usize {
    self.lock().len()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
    // The stack holds plain strings, so a poisoned lock still has usable contents.
    self.stack.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl CurrentApplication for ApplicationStack {
  fn current_application(&self) -> Option<String> {
    self.lock().last().cloned()
  }
}

impl<T: CurrentApplication + ?Sized> CurrentApplication for Arc<T> {
  fn current_application(&self) -> Option<String> {
    (**self).current_application()
  }
}

/// Stat provider reading modification times below a document root.
#[derive(Debug, Clone)]
pub struct FilesystemStat {
  root: PathBuf,
}

impl FilesystemStat {
  /// Resolve script paths relative to `root`.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Filesystem location for an absolute script path.
  pub fn locate(&self, absolute_path: &str) -> PathBuf {
    let relative = absolute_path.trim_start_matches('/');
    if relative.is_empty() {
      self.root.clone()
    } else {
      self.root.join(Path::new(relative))
    }
  }
}

impl ResourceStat for FilesystemStat {
  fn stat(&self, absolute_path: &str) -> ScriptResult<SystemTime> {
    let location = self.locate(absolute_path);
    let metadata = match fs::metadata(&location) {
      Ok(metadata) => metadata,
      Err(err) if err.kind() == ErrorKind::NotFound => {
        return Err(ScriptError::ResourceNotFound {
          path: absolute_path.to_string(),
        });
      }
      Err(err) => {
        return Err(ScriptError::Stat {
          path: location,
          source: err,
        });
      }
    };

    metadata.modified().map_err(|err| ScriptError::Stat {
      path: location,
      source: err,
    })
  }
}

/// URL resolver serving scripts from a single web root.
///
/// Relative URLs are the script path itself; full URLs prefix scheme, host and the
/// optional port.
#[derive(Debug, Clone)]
pub struct WebrootResolver {
  scheme: String,
  host: String,
  port: Option<u16>,
}

impl WebrootResolver {
  /// Create a resolver for `scheme://host`.
  pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
    Self {
      scheme: scheme.into(),
      host: host.into(),
      port: None,
    }
  }

  /// Serve from a non-default port.
  pub fn with_port(mut self, port: Option<u16>) -> Self {
    self.port = port;
    self
  }

  fn origin(&self) -> String {
    match self.port {
      Some(port) => format!("{}://{}:{}", self.scheme, self.host, port),
      None => format!("{}://{}", self.scheme, self.host),
    }
  }
}

impl UrlResolver for WebrootResolver {
  fn resolve(&self, path: &str, full: bool) -> ScriptResult<String> {
    if self.host.is_empty() && full {
      return Err(ScriptError::resolver(format!(
        "cannot build a full URL for {path}: no host configured"
      )));
    }

    let path = if path.starts_with('/') {
      path.to_string()
    } else {
      format!("/{path}")
    };

    if full {
      Ok(format!("{}{}", self.origin(), path))
    } else {
      Ok(path)
    }
  }
}

/// Resolver backed by an explicit path to URL table.
///
/// Paths without an entry fail with a resolver error.
#[derive(Debug, Clone, Default)]
pub struct StaticUrlMap {
  relative: BTreeMap<String, String>,
  full: BTreeMap<String, String>,
}

impl StaticUrlMap {
  /// Create an empty table.
  pub fn new() -> Self {
    Self::default()
  }

  /// Register the relative and full URL for `path`.
  pub fn insert(
    &mut self,
    path: impl Into<String>,
    relative: impl Into<String>,
    full: impl Into<String>,
  ) -> &mut Self {
    let path = path.into();
    self.relative.insert(path.clone(), relative.into());
    self.full.insert(path, full.into());
    self
  }
}

impl UrlResolver for StaticUrlMap {
  fn resolve(&self, path: &str, full: bool) -> ScriptResult<String> {
    let table = if full { &self.full } else { &self.relative };
    table
      .get(path)
      .cloned()
      .ok_or_else(|| ScriptError::resolver(format!("no URL registered for {path}")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;
  use tempfile::tempdir;

  #[test]
  fn application_stack_reports_innermost_push() {
    let stack = ApplicationStack::new();
    assert_eq!(stack.current_application(), None);

    stack.push("horde");
    stack.push("mail");
    assert_eq!(stack.current_application().as_deref(), Some("mail"));
    assert_eq!(stack.depth(), 2);

    assert_eq!(stack.pop().as_deref(), Some("mail"));
    assert_eq!(stack.current_application().as_deref(), Some("horde"));
  }

  #[test]
  fn context_ignores_empty_application_names() {
    let context = ScriptContext::new(FilesystemStat::new("."), WebrootResolver::new("http", "h"))
      .with_application(FixedApplication(String::new()));
    assert_eq!(context.current_application(), None);
  }

  #[test]
  fn filesystem_stat_reads_modification_time() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("js")).unwrap();
    let file = dir.path().join("js/app.js");
    fs::write(&file, "void 0;").unwrap();
    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    fs::File::options()
      .write(true)
      .open(&file)
      .unwrap()
      .set_modified(mtime)
      .unwrap();

    let stat = FilesystemStat::new(dir.path());
    assert_eq!(stat.stat("/js/app.js").unwrap(), mtime);
  }

  #[test]
  fn filesystem_stat_reports_missing_resources() {
    let dir = tempdir().unwrap();
    let stat = FilesystemStat::new(dir.path());

    match stat.stat("/missing.js") {
      Err(ScriptError::ResourceNotFound { path }) => assert_eq!(path, "/missing.js"),
      other => panic!("unexpected result: {other:?}"),
    }
  }

  #[test]
  fn webroot_resolver_builds_relative_and_full_urls() {
    let resolver = WebrootResolver::new("https", "example.com");
    assert_eq!(resolver.resolve("/js/app.js", false).unwrap(), "/js/app.js");
    assert_eq!(
      resolver.resolve("/js/app.js", true).unwrap(),
      "https://example.com/js/app.js"
    );

    let with_port = resolver.with_port(Some(8080));
    assert_eq!(
      with_port.resolve("js/app.js", true).unwrap(),
      "https://example.com:8080/js/app.js"
    );
  }

  #[test]
  fn webroot_resolver_rejects_full_urls_without_host() {
    let resolver = WebrootResolver::new("https", "");
    assert!(resolver.resolve("/app.js", false).is_ok());
    assert!(matches!(
      resolver.resolve("/app.js", true),
      Err(ScriptError::Resolver(_))
    ));
  }

  #[test]
  fn static_map_fails_for_unknown_paths() {
    let mut map = StaticUrlMap::new();
    map.insert("/a.js", "/static/a.js?v=1", "https://cdn.test/a.js?v=1");

    assert_eq!(map.resolve("/a.js", false).unwrap(), "/static/a.js?v=1");
    assert_eq!(map.resolve("/a.js", true).unwrap(), "https://cdn.test/a.js?v=1");
    let err = map.resolve("/b.js", false).unwrap_err();
    assert_eq!(err.to_string(), "no URL registered for /b.js");
  }
}
