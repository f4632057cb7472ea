//! Settings for one emma invocation, read
//! from an emmarc file and `rc.` overrides.

use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::str::FromStr;

use anyhow::{
  Context,
  anyhow,
  bail
};
use chrono_tz::Tz;
use tracing::{
  debug,
  info,
  warn
};

use crate::commands::{
  expand_command_abbrev,
  known_command_names
};

const RC_ENV_VAR: &str = "EMMARC";
const RC_FILE_NAME: &str = ".emmarc";
const DATA_DIR_NAME: &str = ".emma";

/// Typed emma settings. Values are
/// validated as they are applied, so
/// consumers never see raw strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  /// `data.location`; `None` means
  /// `~/.emma`.
  pub data_location:   Option<PathBuf>,
  pub default_command: String,
  pub color:           bool,
  /// `None` means the system zone.
  pub timezone:        Option<Tz>,
  pub loaded_files:    Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_location:   None,
      default_command: "overview"
        .to_string(),
      color:           true,
      timezone:        None,
      loaded_files:    Vec::new()
    }
  }
}

/// A single `rc.KEY=VALUE` override. The
/// `rc.` prefix is optional so the same
/// parser serves `--rc KEY=VALUE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
  pub key:   String,
  pub value: String
}

impl FromStr for Override {
  type Err = anyhow::Error;

  fn from_str(
    raw: &str
  ) -> Result<Self, Self::Err> {
    let body = raw
      .strip_prefix("rc.")
      .unwrap_or(raw);
    let (key, value) = body
      .split_once('=')
      .ok_or_else(|| {
        anyhow!(
          "expected rc.KEY=VALUE, got: \
           {raw}"
        )
      })?;

    let key = key.trim();
    if key.is_empty() {
      bail!("override has no key: {raw}");
    }

    Ok(Self {
      key:   key.to_string(),
      value: value.trim().to_string()
    })
  }
}

impl Config {
  /// Defaults, then the emmarc named by
  /// `--emmarc`, `EMMARC` or
  /// `~/.emmarc`, whichever comes first.
  #[tracing::instrument(skip(rc_flag))]
  pub fn load(
    rc_flag: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::default();

    match locate_emmarc(rc_flag) {
      | Some(path) => {
        info!(emmarc = %path.display(), "reading emmarc");
        cfg.read_file(&path)?;
      }
      | None => {
        debug!(
          "no emmarc; built-in \
           settings apply"
        );
      }
    }

    Ok(cfg)
  }

  /// Apply one setting. Unknown keys
  /// are ignored with a warning.
  pub fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    match key {
      | "data.location" => {
        if value.is_empty() {
          bail!(
            "data.location cannot be \
             empty"
          );
        }
        self.data_location =
          Some(expand_home(value));
      }
      | "default.command" => {
        let known =
          known_command_names();
        let command =
          expand_command_abbrev(
            value, &known
          )
          .ok_or_else(|| {
            anyhow!(
              "default.command is not \
               an emma command: {value}"
            )
          })?;
        self.default_command =
          command.to_string();
      }
      | "color" => {
        self.color = parse_switch(value)?;
      }
      | "timezone" if value.is_empty() => {
        self.timezone = None;
      }
      | "timezone" => {
        let tz =
          value.parse::<Tz>().map_err(
            |err| {
              anyhow!(
                "invalid timezone \
                 {value}: {err}"
              )
            }
          )?;
        self.timezone = Some(tz);
      }
      | other => {
        warn!(
          key = other,
          "unknown emmarc key; ignoring"
        );
        return Ok(());
      }
    }

    debug!(key, value, "applied setting");
    Ok(())
  }

  #[tracing::instrument(skip_all, fields(count = overrides.len()))]
  pub fn apply_overrides(
    &mut self,
    overrides: &[Override]
  ) -> anyhow::Result<()> {
    for o in overrides {
      self
        .set(&o.key, &o.value)
        .with_context(|| {
          format!(
            "in override rc.{}={}",
            o.key, o.value
          )
        })?;
    }
    Ok(())
  }

  /// `--data`, then `data.location`,
  /// then `~/.emma`.
  pub fn data_dir(
    &self,
    flag: Option<&Path>
  ) -> anyhow::Result<PathBuf> {
    match (flag, &self.data_location) {
      | (Some(dir), _) => {
        Ok(dir.to_path_buf())
      }
      | (None, Some(dir)) => {
        Ok(dir.clone())
      }
      | (None, None) => {
        dirs::home_dir()
          .map(|home| {
            home.join(DATA_DIR_NAME)
          })
          .ok_or_else(|| {
            anyhow!(
              "cannot determine home \
               directory; set \
               data.location or pass \
               --data"
            )
          })
      }
    }
  }

  fn read_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    if self
      .loaded_files
      .iter()
      .any(|seen| seen == path)
    {
      warn!(file = %path.display(), "emmarc included twice; skipping");
      return Ok(());
    }

    let text = fs::read_to_string(path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    self
      .loaded_files
      .push(path.to_path_buf());

    for (idx, raw) in
      text.lines().enumerate()
    {
      let at = || {
        format!(
          "{}:{}",
          path.display(),
          idx + 1
        )
      };

      match RcLine::parse(raw)
        .with_context(at)?
      {
        | RcLine::Blank => {}
        | RcLine::Include(target) => {
          let target =
            include_target(path, target);
          if target.is_file() {
            self.read_file(&target)?;
          } else {
            warn!(include = %target.display(), "included emmarc not found; skipping");
          }
        }
        | RcLine::Setting {
          key,
          value
        } => {
          self
            .set(key, value)
            .with_context(at)?;
        }
      }
    }

    Ok(())
  }
}

#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
  Blank,
  Include(&'a str),
  Setting {
    key:   &'a str,
    value: &'a str
  }
}

impl<'a> RcLine<'a> {
  fn parse(
    raw: &'a str
  ) -> anyhow::Result<Self> {
    let line = raw
      .split_once('#')
      .map_or(raw, |(before, _)| before)
      .trim();
    if line.is_empty() {
      return Ok(Self::Blank);
    }

    if let Some(target) =
      line.strip_prefix("include ")
    {
      let target = target.trim();
      if target.is_empty() {
        bail!("include needs a path");
      }
      return Ok(Self::Include(target));
    }

    let (key, value) = line
      .split_once('=')
      .ok_or_else(|| {
        anyhow!(
          "expected `key = value`, got: \
           {raw}"
        )
      })?;
    let key = key.trim();
    if key.is_empty() {
      bail!(
        "missing key before `=`: {raw}"
      );
    }

    Ok(Self::Setting {
      key,
      value: value.trim()
    })
  }
}

fn locate_emmarc(
  flag: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = flag {
    return Some(path.to_path_buf());
  }

  match std::env::var_os(RC_ENV_VAR) {
    | Some(value)
      if value == "/dev/null" =>
    {
      None
    }
    | Some(value) => {
      Some(PathBuf::from(value))
    }
    | None => {
      dirs::home_dir()
        .map(|home| {
          home.join(RC_FILE_NAME)
        })
        .filter(|path| path.is_file())
    }
  }
}

fn parse_switch(
  value: &str
) -> anyhow::Result<bool> {
  match value
    .to_ascii_lowercase()
    .as_str()
  {
    | "on" | "yes" | "true" | "1" => {
      Ok(true)
    }
    | "off" | "no" | "false" | "0" => {
      Ok(false)
    }
    | _ => {
      Err(anyhow!(
        "expected on or off, got: \
         {value}"
      ))
    }
  }
}

/// Includes resolve against the
/// including file's directory.
fn include_target(
  from: &Path,
  target: &str
) -> PathBuf {
  let target = expand_home(target);
  if target.is_absolute() {
    return target;
  }
  from
    .parent()
    .unwrap_or_else(|| Path::new("."))
    .join(target)
}

fn expand_home(raw: &str) -> PathBuf {
  match (
    raw.strip_prefix("~/"),
    dirs::home_dir()
  ) {
    | (Some(rest), Some(home)) => {
      home.join(rest)
    }
    | _ => PathBuf::from(raw)
  }
}
