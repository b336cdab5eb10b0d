#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod markup;
pub mod ordering;
pub mod script;

pub use config::{ConfigError, ScriptConfig};
pub use context::{
  ApplicationStack, CurrentApplication, FilesystemStat, FixedApplication, ResourceStat,
  ScriptContext, StaticUrlMap, UrlResolver, WebrootResolver,
};
pub use error::{ScriptError, ScriptResult};
pub use ordering::{by_priority, group_by_cache_partition, sort_for_output};
pub use script::{Priority, ScriptProperty, ScriptReference, ScriptSummary};
