pub mod blob;
pub mod cli;
mod collection;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod error;
pub mod general;
pub mod render;
pub mod schedule;
pub mod task;

use std::ffi::OsString;
use std::io;

use anyhow::Context;
use tracing::{debug, info};

pub use error::TaskError;
pub use general::GeneralList;
pub use schedule::Schedule;
pub use task::{DateId, Task, TaskId};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let line = cli::CommandLine::parse_from(raw_args)?;
    cli::init_tracing(line.verbosity);

    info!(
        verbose = line.verbosity.verbose,
        quiet = line.verbosity.quiet,
        "starting emma CLI"
    );
    debug!(overrides = ?line.overrides, "rc overrides");

    let mut cfg = config::Config::load(line.emmarc.as_deref())?;
    cfg.apply_overrides(&line.overrides)?;

    let data_dir = cfg
        .data_dir(line.data.as_deref())
        .context("failed to resolve data directory")?;

    let blobs = blob::FileBlobStore::open(&data_dir)
        .with_context(|| format!("failed to open task storage at {}", data_dir.display()))?;

    let mut session = commands::Session::load(blobs);
    let calendar = datetime::LocalCalendar::from_config(&cfg);
    let renderer = render::Renderer::new(&cfg);
    let inv = cli::Invocation::parse(&cfg, line.words)?;

    let mut out = io::stdout().lock();
    commands::dispatch(&mut session, &calendar, &renderer, &mut out, inv)?;

    info!("done");
    Ok(())
}
