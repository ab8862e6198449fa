use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::str::FromStr;

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

const RC_ENV_VAR: &str = "AVAILCALRC";
const RC_FILE_NAME: &str = ".availcalrc";
const DEFAULT_ROSTER_PATH: &str =
  "~/.availcal/roster.json";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "data.location".to_string(),
      DEFAULT_ROSTER_PATH.to_string()
    );
    map.insert(
      "default.command".to_string(),
      "show".to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading availcalrc");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no availcalrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  /// Boolean value of `key`; a present
  /// value that is not a recognised
  /// switch is an error.
  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    match self.map.get(key) {
      | None => Ok(None),
      | Some(raw) => {
        parse_bool(raw).map(Some).ok_or_else(
          || {
            anyhow!(
              "invalid boolean for {key}: \
               {raw}"
            )
          }
        )
      }
    }
  }

  /// Parsed value of `key`; a present
  /// but unparseable value is an error.
  pub fn get_parsed<T>(
    &self,
    key: &str
  ) -> anyhow::Result<Option<T>>
  where
    T: FromStr,
    T::Err: std::fmt::Display
  {
    let Some(raw) = self.map.get(key)
    else {
      return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
      return Ok(None);
    }
    raw.parse::<T>().map(Some).map_err(
      |err| {
        anyhow!(
          "invalid value for {key}: \
           {raw} ({err})"
        )
      }
    )
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  #[tracing::instrument(skip(self))]
  pub fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Roster file location: `--data`
/// first, then `data.location`.
#[tracing::instrument(skip(
  cfg,
  override_path
))]
pub fn resolve_roster_path(
  cfg: &Config,
  override_path: Option<&Path>
) -> PathBuf {
  if let Some(path) = override_path {
    return path.to_path_buf();
  }

  let raw = cfg
    .get("data.location")
    .unwrap_or_else(|| {
      DEFAULT_ROSTER_PATH.to_string()
    });
  expand_tilde(Path::new(&raw))
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    debug!(
      "cannot determine home \
       directory; skipping availcalrc"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

pub(crate) fn parse_bool(
  s: &str
) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on" | "true" => {
      Some(true)
    }
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_cover_core_keys() {
    let cfg = Config::default();
    assert_eq!(
      cfg.get("default.command"),
      Some("show".to_string())
    );
    assert_eq!(
      cfg
        .get_bool("color")
        .expect("valid switch"),
      Some(true)
    );
    assert!(
      cfg
        .get_parsed::<i32>("default.year")
        .expect("absent is fine")
        .is_none()
    );
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::default();
    cfg.apply_overrides([
      (
        "rc.default.month".to_string(),
        "7".to_string()
      ),
      (
        "color".to_string(),
        "off".to_string()
      )
    ]);
    assert_eq!(
      cfg
        .get_parsed::<u32>("default.month")
        .expect("parse"),
      Some(7)
    );
    assert_eq!(
      cfg
        .get_bool("color")
        .expect("valid switch"),
      Some(false)
    );
  }

  #[test]
  fn boolean_switches_share_one_vocabulary(
  ) {
    for raw in ["y", "YES", " on ", "1"] {
      assert_eq!(
        parse_bool(raw),
        Some(true),
        "{raw}"
      );
    }
    for raw in ["n", "off", "False", "0"]
    {
      assert_eq!(
        parse_bool(raw),
        Some(false),
        "{raw}"
      );
    }
    assert_eq!(parse_bool("maybe"), None);

    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "color".to_string(),
      "maybe".to_string()
    )]);
    assert!(cfg.get_bool("color").is_err());
    assert!(
      cfg
        .get_bool("absent")
        .expect("absent is fine")
        .is_none()
    );
  }

  #[test]
  fn unparseable_value_is_an_error() {
    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "default.year".to_string(),
      "soon".to_string()
    )]);
    assert!(
      cfg
        .get_parsed::<i32>("default.year")
        .is_err()
    );
  }

  #[test]
  fn roster_path_prefers_override() {
    let cfg = Config::default();
    let explicit = Path::new("/tmp/x.json");
    assert_eq!(
      resolve_roster_path(
        &cfg,
        Some(explicit)
      ),
      explicit.to_path_buf()
    );

    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "data.location".to_string(),
      "/srv/roster.json".to_string()
    )]);
    assert_eq!(
      resolve_roster_path(&cfg, None),
      PathBuf::from("/srv/roster.json")
    );
  }
}
