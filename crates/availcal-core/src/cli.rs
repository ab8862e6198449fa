use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::calendar::parse_month;
use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "availcal",
    version,
    about = "Monthly availability calendar for a team roster",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "availcalrc")]
    pub availcalrc: Option<PathBuf>,

    /// Roster JSON file.
    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

/// View selections given on the command line, before or after the command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub selection: Selection,
    pub command: String,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();

        let default_command = cfg
            .get("default.command")
            .unwrap_or_else(|| "show".to_string());

        let (mut selectors, command, trailing) = split_selection_command(&tokens);
        let command = command.unwrap_or_else(|| {
            debug!(command = %default_command, "no explicit command, using default");
            default_command
        });

        // no command takes positional arguments; only selectors may follow it
        let (trailing_selectors, unexpected): (Vec<String>, Vec<String>) =
            trailing.into_iter().partition(|token| is_selector(token));
        if !unexpected.is_empty() {
            return Err(anyhow!(
                "unexpected arguments after '{command}': {} (use name:TEXT to filter by name)",
                unexpected.join(" ")
            ));
        }
        selectors.extend(trailing_selectors);
        let selection = parse_selection(&selectors)?;

        Ok(Self { selection, command })
    }
}

fn split_selection_command(tokens: &[String]) -> (Vec<String>, Option<String>, Vec<String>) {
    let known = crate::commands::known_command_names();

    for i in 0..tokens.len() {
        let token = tokens[i].as_str();
        if is_selector(token) {
            continue;
        }
        if let Some(full) = crate::commands::expand_command_abbrev(token, &known) {
            debug!(
                token = %token,
                expanded = %full,
                split_index = i,
                "resolved command token"
            );
            return (
                tokens[..i].to_vec(),
                Some(full.to_string()),
                tokens[i + 1..].to_vec(),
            );
        }
    }

    (tokens.to_vec(), None, vec![])
}

fn is_selector(token: &str) -> bool {
    ["year:", "month:", "name:"]
        .iter()
        .any(|prefix| token.starts_with(prefix))
}

fn parse_selection(tokens: &[String]) -> anyhow::Result<Selection> {
    let mut selection = Selection::default();
    let mut bare: Vec<&str> = Vec::new();

    for token in tokens {
        if let Some(raw) = token.strip_prefix("year:") {
            let year = raw
                .trim()
                .parse::<i32>()
                .map_err(|_| anyhow!("invalid year selector: {token}"))?;
            selection.year = Some(year);
        } else if let Some(raw) = token.strip_prefix("month:") {
            let month =
                parse_month(raw).ok_or_else(|| anyhow!("invalid month selector: {token}"))?;
            selection.month = Some(month);
        } else if let Some(raw) = token.strip_prefix("name:") {
            selection.name = Some(raw.to_string());
        } else {
            bare.push(token.as_str());
        }
    }

    if !bare.is_empty() {
        if selection.name.is_some() {
            warn!(terms = ?bare, "ignoring bare terms; name: selector already given");
        } else {
            selection.name = Some(bare.join(" "));
        }
    }

    Ok(selection)
}
