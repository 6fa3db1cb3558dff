mod app;
mod config;
mod event;
mod logging;
mod posts;
mod query;
mod router;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "postq")]
#[command(about = "Browse REST posts with stale-while-revalidate query caching")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./postq.yaml or $XDG_CONFIG_HOME/postq/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the posts API
  #[arg(short, long)]
  base_url: Option<String>,

  /// Milliseconds before cached data is refetched in the background
  #[arg(short, long)]
  stale_time_ms: Option<u64>,

  /// Start with the query devtools panel closed
  #[arg(long)]
  no_devtools: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration, then apply command line overrides
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
  }
  if let Some(stale_time_ms) = args.stale_time_ms {
    config.query.stale_time_ms = stale_time_ms;
  }
  if args.no_devtools {
    config.ui.devtools_open = false;
  }
  config.validate()?;

  let _log_guard = logging::init(&config.log)?;
  info!(version = env!("CARGO_PKG_VERSION"), "postq starting");

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
