pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod projector;
pub mod render;
pub mod roster;
pub mod state;

use std::ffi::OsString;

use anyhow::Context;
use chrono::{Datelike, Local};
use clap::Parser;
use tracing::{debug, info};

use crate::cli::Selection;
use crate::config::Config;
use crate::state::{ViewEvent, ViewState};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting availcal"
    );
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = Config::load(cli.availcalrc.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );

    let roster_path = config::resolve_roster_path(&cfg, cli.data.as_deref());
    let mut renderer = render::Renderer::new(&cfg)?;
    let inv = cli::Invocation::parse(&cfg, cli.rest)?;

    let mut state = initial_state(&cfg, &inv.selection)?;
    state
        .apply(ViewEvent::RosterLoaded(roster::load_roster_or_empty(&roster_path)))
        .context("failed to install roster")?;

    commands::dispatch(&mut state, &cfg, &mut renderer, inv)?;

    info!("done");
    Ok(())
}

/// Today's month, then rc defaults, then command-line selectors.
pub fn initial_state(cfg: &Config, selection: &Selection) -> anyhow::Result<ViewState> {
    let today = Local::now().date_naive();
    let year = cfg
        .get_parsed::<i32>("default.year")?
        .unwrap_or_else(|| today.year());
    let month = cfg
        .get_parsed::<u32>("default.month")?
        .unwrap_or_else(|| today.month());

    let mut state = ViewState::new(year, month)
        .with_context(|| format!("invalid default view {year}-{month}"))?;

    if let Some(filter) = cfg.get("default.filter") {
        state.apply(ViewEvent::SetFilter(filter))?;
    }
    if let Some(year) = selection.year {
        state
            .apply(ViewEvent::SetYear(year))
            .with_context(|| format!("invalid year selector: {year}"))?;
    }
    if let Some(month) = selection.month {
        state
            .apply(ViewEvent::SetMonth(month))
            .with_context(|| format!("invalid month selector: {month}"))?;
    }
    if let Some(name) = &selection.name {
        state.apply(ViewEvent::SetFilter(name.clone()))?;
    }

    debug!(
        year = state.year(),
        month = state.month(),
        filter = %state.filter(),
        "initial view"
    );
    Ok(state)
}
