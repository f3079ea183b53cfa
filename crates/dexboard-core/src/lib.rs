pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod render;
pub mod store;
pub mod table;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting dexboard"
  );
  debug!(?cli.rc_overrides, "rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )?;

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let repo =
    datastore::JsonFileRepository::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open task store at \
         {}",
        data_dir.display()
      )
    })?;
  let mut store =
    store::TaskStore::open(repo)?;

  let renderer =
    render::Renderer::new(&cfg);
  let command =
    cli.command.unwrap_or_else(|| {
      cli::Command::List(
        cli::ListArgs::default()
      )
    });

  let stdout = std::io::stdout();
  let mut out = stdout.lock();
  commands::dispatch(
    &mut store,
    &cfg,
    &renderer,
    &mut out,
    command,
    chrono::Utc::now()
  )?;

  info!("done");
  Ok(())
}
