//! A single client-side script registered for inclusion in a rendered page.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::context::ScriptContext;
use crate::error::{ScriptError, ScriptResult};
use crate::markup::script_tag;

/// Cache partition assigned to new references.
pub const DEFAULT_CACHE_PARTITION: &str = "default";

/// Load-order rank of a script; lower values are emitted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Priority {
  /// Reserved for framework-level scripts.
  VeryHigh = 1,
  /// Loaded before ordinary application scripts.
  High = 2,
  /// Ordinary priority.
  Normal = 3,
  /// Default for newly registered scripts.
  #[default]
  Low = 4,
  /// Loaded last.
  VeryLow = 5,
}

impl Priority {
  /// All levels, highest precedence first.
  pub const ALL: [Priority; 5] = [
    Priority::VeryHigh,
    Priority::High,
    Priority::Normal,
    Priority::Low,
    Priority::VeryLow,
  ];

  /// Numeric rank of the level.
  pub fn level(self) -> i64 {
    self as i64
  }
}

impl TryFrom<i64> for Priority {
  type Error = ScriptError;

  fn try_from(value: i64) -> Result<Self, Self::Error> {
    Priority::ALL
      .into_iter()
      .find(|priority| priority.level() == value)
      .ok_or(ScriptError::InvalidPriority(value))
  }
}

impl From<Priority> for i64 {
  fn from(priority: Priority) -> Self {
    priority.level()
  }
}

/// Named properties exposed by a [`ScriptReference`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptProperty {
  /// Owning application.
  App,
  /// Application-relative file path.
  File,
  /// Base path joined with the file path.
  FullPath,
  /// Identity hash.
  Hash,
  /// Modification time in seconds since the Unix epoch, negative before it.
  Modified,
  /// Base path.
  Path,
  /// Script tag using the relative URL.
  Tag,
  /// Script tag using the full URL.
  TagFull,
  /// Relative URL.
  Url,
  /// URL including scheme and host.
  UrlFull,
}

impl ScriptProperty {
  /// Every property, in name order.
  pub const ALL: [ScriptProperty; 10] = [
    ScriptProperty::App,
    ScriptProperty::File,
    ScriptProperty::FullPath,
    ScriptProperty::Hash,
    ScriptProperty::Modified,
    ScriptProperty::Path,
    ScriptProperty::Tag,
    ScriptProperty::TagFull,
    ScriptProperty::Url,
    ScriptProperty::UrlFull,
  ];

  /// Lookup name of the property.
  pub fn name(self) -> &'static str {
    match self {
      ScriptProperty::App => "app",
      ScriptProperty::File => "file",
      ScriptProperty::FullPath => "full_path",
      ScriptProperty::Hash => "hash",
      ScriptProperty::Modified => "modified",
      ScriptProperty::Path => "path",
      ScriptProperty::Tag => "tag",
      ScriptProperty::TagFull => "tag_full",
      ScriptProperty::Url => "url",
      ScriptProperty::UrlFull => "url_full",
    }
  }
}

impl FromStr for ScriptProperty {
  type Err = ScriptError;

  fn from_str(name: &str) -> Result<Self, Self::Err> {
    ScriptProperty::ALL
      .into_iter()
      .find(|property| property.name() == name)
      .ok_or_else(|| ScriptError::UnknownProperty(name.to_string()))
  }
}

impl fmt::Display for ScriptProperty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Serializable snapshot of a reference and its rendered output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSummary {
  /// Owning application.
  pub app: String,
  /// Application-relative file path.
  pub file: String,
  /// Identity hash.
  pub hash: String,
  /// Load priority.
  pub priority: Priority,
  /// Cache partition label.
  pub cache: String,
  /// Resolved URL.
  pub url: String,
  /// Rendered script tag.
  pub tag: String,
  /// Variables output alongside the script.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub variables: BTreeMap<String, Value>,
}

/// A script file registered for output, bound to its owning application.
#[derive(Debug, Clone)]
pub struct ScriptReference {
  application: String,
  file_path: String,
  base_path: String,
  context: Option<ScriptContext>,
  priority: Priority,
  cache_partition: String,
  variables: BTreeMap<String, Value>,
}

impl ScriptReference {
  /// Register `file_path` for `application`, or for the context's current application.
  ///
  /// The current application is read once, here; later changes to the context do not
  /// move an existing reference.
  pub fn new(
    file_path: impl Into<String>,
    application: Option<&str>,
    context: &ScriptContext,
  ) -> ScriptResult<Self> {
    let application = match application {
      Some(app) => app.to_string(),
      None => context
        .current_application()
        .ok_or(ScriptError::MissingContext)?,
    };

    Ok(Self {
      application,
      file_path: file_path.into(),
      base_path: context.base_path().to_string(),
      context: Some(context.clone()),
      priority: Priority::default(),
      cache_partition: context.cache_partition().to_string(),
      variables: BTreeMap::new(),
    })
  }

  /// Register `file_path` for an explicit application with no collaborators attached.
  ///
  /// Identity and path properties work immediately; URL and stat lookups need a context
  /// from [`ScriptReference::attach`].
  pub fn for_application(file_path: impl Into<String>, application: impl Into<String>) -> Self {
    Self {
      application: application.into(),
      file_path: file_path.into(),
      base_path: crate::context::DEFAULT_BASE_PATH.to_string(),
      context: None,
      priority: Priority::default(),
      cache_partition: DEFAULT_CACHE_PARTITION.to_string(),
      variables: BTreeMap::new(),
    }
  }

  /// Bind the reference to a set of collaborators, adopting its base path.
  ///
  /// The cache partition is left as it is.
  pub fn attach(mut self, context: &ScriptContext) -> Self {
    self.base_path = context.base_path().to_string();
    self.context = Some(context.clone());
    self
  }

  /// Owning application.
  pub fn application(&self) -> &str {
    &self.application
  }

  /// Application-relative file path.
  pub fn file_path(&self) -> &str {
    &self.file_path
  }

  /// Base path prepended to the file path.
  pub fn base_path(&self) -> &str {
    &self.base_path
  }

  /// Base path joined with the file path.
  pub fn absolute_path(&self) -> String {
    format!("{}{}", self.base_path, self.file_path)
  }

  /// Lowercase hex SHA-1 of the application and file path.
  ///
  /// The NUL separator keeps `("ab", "c")` and `("a", "bc")` apart.
  pub fn identity_hash(&self) -> String {
    let mut hasher = Sha1::new();
    hasher.update(self.application.as_bytes());
    hasher.update([0u8]);
    hasher.update(self.file_path.as_bytes());
    format!("{:x}", hasher.finalize())
  }

  /// Modification time of the script resource.
  pub fn last_modified(&self) -> ScriptResult<SystemTime> {
    self.context()?.stat(&self.absolute_path())
  }

  /// URL of the script without scheme or host.
  pub fn url(&self) -> ScriptResult<String> {
    self.context()?.resolve(&self.absolute_path(), false)
  }

  /// URL of the script including scheme and host.
  pub fn url_full(&self) -> ScriptResult<String> {
    self.context()?.resolve(&self.absolute_path(), true)
  }

  /// Script element loading [`ScriptReference::url`].
  pub fn tag(&self) -> ScriptResult<String> {
    Ok(script_tag(&self.url()?))
  }

  /// Script element loading [`ScriptReference::url_full`].
  pub fn tag_full(&self) -> ScriptResult<String> {
    Ok(script_tag(&self.url_full()?))
  }

  /// Text form of the reference: always identical to [`ScriptReference::tag`].
  pub fn render(&self) -> ScriptResult<String> {
    self.tag()
  }

  /// Textual value of a named property.
  pub fn property(&self, property: ScriptProperty) -> ScriptResult<String> {
    match property {
      ScriptProperty::App => Ok(self.application.clone()),
      ScriptProperty::File => Ok(self.file_path.clone()),
      ScriptProperty::FullPath => Ok(self.absolute_path()),
      ScriptProperty::Hash => Ok(self.identity_hash()),
      ScriptProperty::Modified => {
        let modified = self.last_modified()?;
        let seconds = match modified.duration_since(SystemTime::UNIX_EPOCH) {
          Ok(elapsed) => elapsed.as_secs().to_string(),
          Err(before) => format!("-{}", before.duration().as_secs()),
        };
        Ok(seconds)
      }
      ScriptProperty::Path => Ok(self.base_path.clone()),
      ScriptProperty::Tag => self.tag(),
      ScriptProperty::TagFull => self.tag_full(),
      ScriptProperty::Url => self.url(),
      ScriptProperty::UrlFull => self.url_full(),
    }
  }

  /// Textual value of a property looked up by name.
  pub fn property_by_name(&self, name: &str) -> ScriptResult<String> {
    self.property(name.parse()?)
  }

  /// Load priority.
  pub fn priority(&self) -> Priority {
    self.priority
  }

  /// Change the load priority.
  pub fn set_priority(&mut self, priority: Priority) {
    self.priority = priority;
  }

  /// Change the load priority from its numeric rank.
  pub fn set_priority_level(&mut self, level: i64) -> ScriptResult<()> {
    self.priority = Priority::try_from(level)?;
    Ok(())
  }

  /// Cache partition label.
  pub fn cache_partition(&self) -> &str {
    &self.cache_partition
  }

  /// Move the reference into another cache partition.
  pub fn set_cache_partition(&mut self, partition: impl Into<String>) {
    self.cache_partition = partition.into();
  }

  /// Variables output alongside the script.
  pub fn variables(&self) -> &BTreeMap<String, Value> {
    &self.variables
  }

  /// Mutable access to the variables.
  pub fn variables_mut(&mut self) -> &mut BTreeMap<String, Value> {
    &mut self.variables
  }

  /// Set a single variable, returning the previous value.
  pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
    self.variables.insert(name.into(), value.into())
  }

  /// Variables serialized as a JSON object.
  pub fn variables_json(&self) -> String {
    serde_json::to_string(&self.variables).unwrap_or_else(|_| "{}".to_string())
  }

  /// Snapshot of the reference using the relative URL.
  pub fn summary(&self) -> ScriptResult<ScriptSummary> {
    let url = self.url()?;
    Ok(ScriptSummary {
      app: self.application.clone(),
      file: self.file_path.clone(),
      hash: self.identity_hash(),
      priority: self.priority,
      cache: self.cache_partition.clone(),
      tag: script_tag(&url),
      url,
      variables: self.variables.clone(),
    })
  }

  fn context(&self) -> ScriptResult<&ScriptContext> {
    self.context.as_ref().ok_or(ScriptError::Detached)
  }
}
