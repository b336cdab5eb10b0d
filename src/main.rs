//! Command line front-end printing the rendered form of a script reference.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use script_ref::{ScriptConfig, ScriptReference};

#[derive(Debug, Parser)]
#[command(name = "script-ref", version, about = "Render a page script reference")]
struct Cli {
  /// Application-relative script path.
  file: String,
  /// Owning application; defaults to `default_application` from the configuration.
  #[arg(long)]
  app: Option<String>,
  /// Directory containing `scripts.config.json`.
  #[arg(long, default_value = ".")]
  config: PathBuf,
  /// Render the tag with scheme and host.
  #[arg(long)]
  full: bool,
  /// Priority rank between 1 (very high) and 5 (very low).
  #[arg(long)]
  priority: Option<i64>,
  /// Cache partition label.
  #[arg(long)]
  cache: Option<String>,
  /// Print the reference summary as JSON instead of the tag.
  #[arg(long)]
  json: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .init();

  println!("{}", run(Cli::parse())?);
  Ok(())
}

fn run(cli: Cli) -> Result<String> {
  let config = ScriptConfig::discover(&cli.config);
  let context = config.to_context(&cli.config);

  let mut script = ScriptReference::new(&cli.file, cli.app.as_deref(), &context)
    .context("failed to register script")?;
  if let Some(level) = cli.priority {
    script.set_priority_level(level)?;
  }
  if let Some(cache) = cli.cache {
    script.set_cache_partition(cache);
  }

  let output = if cli.json {
    script
      .summary()
      .map_err(anyhow::Error::from)
      .and_then(|summary| Ok(serde_json::to_string_pretty(&summary)?))
  } else if cli.full {
    script.tag_full().map_err(anyhow::Error::from)
  } else {
    script.render().map_err(anyhow::Error::from)
  };

  output.with_context(|| format!("failed to resolve {}", script.absolute_path()))
}
