use std::io::{self, Write};

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument};

use crate::calendar::month_name;
use crate::cli::Invocation;
use crate::config::Config;
use crate::projector;
use crate::render::Renderer;
use crate::state::{ViewEvent, ViewState};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "show", "list", "next", "prev", "days", "columns", "export", "months", "people", "_show",
        "help", "version",
    ]
}

/// Shorter prefixes are left to the name filter.
pub const MIN_ABBREV_LEN: usize = 3;

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }
    if token.chars().count() < MIN_ABBREV_LEN {
        return None;
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(state, cfg, renderer, inv))]
pub fn dispatch(
    state: &mut ViewState,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();

    debug!(
        command,
        year = state.year(),
        month = state.month(),
        filter = %state.filter(),
        "dispatching command"
    );

    match command {
        "show" | "list" => cmd_show(state, renderer),
        "next" => cmd_shift(state, renderer, 1),
        "prev" => cmd_shift(state, renderer, -1),
        "days" => cmd_days(state),
        "columns" => cmd_columns(state),
        "export" => cmd_export(state),
        "months" => cmd_months(),
        "people" => cmd_people(state),
        "_show" => cmd_show_config(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

pub fn view_title(state: &ViewState) -> String {
    let name = month_name(state.month()).unwrap_or("?");
    if state.filter().is_empty() {
        format!("{name} {}", state.year())
    } else {
        format!("{name} {} (name ~ \"{}\")", state.year(), state.filter())
    }
}

#[instrument(skip(state, renderer))]
fn cmd_show(state: &ViewState, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command show");
    let projection = state.projection();
    renderer.print_availability_table(&view_title(state), &projection)
}

#[instrument(skip(state, renderer))]
fn cmd_shift(state: &mut ViewState, renderer: &mut Renderer, delta: i32) -> anyhow::Result<()> {
    info!(delta, "command shift month");
    state
        .apply(ViewEvent::ShiftMonth(delta))
        .context("cannot move to the requested month")?;
    cmd_show(state, renderer)
}

#[instrument(skip(state))]
fn cmd_days(state: &ViewState) -> anyhow::Result<()> {
    info!("command days");
    for day in state.days() {
        println!("{}\t{}", day.key, day.label);
    }
    Ok(())
}

#[instrument(skip(state))]
fn cmd_columns(state: &ViewState) -> anyhow::Result<()> {
    info!("command columns");
    for column in projector::columns(&state.days()) {
        println!("{}\t{}", column.key, column.label);
    }
    Ok(())
}

#[instrument(skip(state))]
fn cmd_export(state: &ViewState) -> anyhow::Result<()> {
    info!("command export");
    write_export(io::stdout().lock(), state)
}

fn write_export<W: Write>(mut writer: W, state: &ViewState) -> anyhow::Result<()> {
    let out = serde_json::to_string(&state.rows())?;
    writeln!(writer, "{out}")?;
    Ok(())
}

fn cmd_months() -> anyhow::Result<()> {
    for month in 1..=12 {
        if let Some(name) = month_name(month) {
            println!("{month}\t{name}");
        }
    }
    Ok(())
}

#[instrument(skip(state))]
fn cmd_people(state: &ViewState) -> anyhow::Result<()> {
    info!("command people");
    write_people(io::stdout().lock(), state)
}

fn write_people<W: Write>(mut writer: W, state: &ViewState) -> anyhow::Result<()> {
    for person in state
        .roster()
        .iter()
        .filter(|person| projector::name_matches(&person.name, state.filter()))
    {
        writeln!(writer, "{}", person.name)?;
    }
    Ok(())
}

fn cmd_show_config(cfg: &Config) -> anyhow::Result<()> {
    let mut pairs: Vec<(&String, &String)> = cfg.iter().collect();
    pairs.sort();
    for (key, value) in pairs {
        println!("{key}={value}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("availcal [selectors] [command] [selectors]");
    println!();
    println!("Selectors:");
    println!("  year:YYYY     month:M|NAME     name:TEXT");
    println!("  Bare terms before the command also filter by name, unless they spell a");
    println!("  command (or a 3+ letter prefix of one); name:TEXT is always a filter.");
    println!();
    println!("Commands:");
    println!("  show      availability table for the selected month (default)");
    println!("  next      move one month forward and show");
    println!("  prev      move one month back and show");
    println!("  days      list the days of the selected month");
    println!("  columns   list table columns as key/label pairs");
    println!("  export    print the table rows as JSON");
    println!("  months    list month picker options");
    println!("  people    list people matching the name filter");
    println!("  _show     print effective configuration");
    Ok(())
}
