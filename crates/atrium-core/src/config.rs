use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

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

use crate::clock::ClockTime;
use crate::slots::{
  DEFAULT_CLOSING,
  DEFAULT_OPENING,
  DEFAULT_STEP_MINUTES
};

const RC_ENV_VAR: &str = "ATRIUMRC";
const RC_FILE_NAME: &str =
  ".atriumrc";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq
)]
pub struct ScheduleSettings {
  pub opening:      ClockTime,
  pub closing:      ClockTime,
  pub step_minutes: u32
}

impl Default for ScheduleSettings {
  fn default() -> Self {
    Self {
      opening:      DEFAULT_OPENING,
      closing:      DEFAULT_CLOSING,
      step_minutes:
        DEFAULT_STEP_MINUTES
    }
  }
}

impl Config {
  pub fn defaults() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "data.location".to_string(),
      "~/.atrium".to_string()
    );
    map.insert(
      "schedule.opening".to_string(),
      DEFAULT_OPENING.to_string()
    );
    map.insert(
      "schedule.closing".to_string(),
      DEFAULT_CLOSING.to_string()
    );
    map.insert(
      "schedule.step".to_string(),
      DEFAULT_STEP_MINUTES.to_string()
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

  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::defaults();

    let rc =
      resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(atriumrc = %path.display(), "loading atriumrc");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no atriumrc found; using \
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

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  pub fn schedule(
    &self
  ) -> anyhow::Result<ScheduleSettings>
  {
    let defaults =
      ScheduleSettings::default();
    let opening = match self
      .get("schedule.opening")
    {
      | Some(raw) => {
        raw.parse().with_context(|| {
          format!(
            "invalid schedule.opening: \
             {raw}"
          )
        })?
      }
      | None => defaults.opening
    };
    let closing = match self
      .get("schedule.closing")
    {
      | Some(raw) => {
        raw.parse().with_context(|| {
          format!(
            "invalid schedule.closing: \
             {raw}"
          )
        })?
      }
      | None => defaults.closing
    };
    let step_minutes = match self
      .get("schedule.step")
    {
      | Some(raw) => {
        raw
          .trim()
          .parse::<u32>()
          .with_context(|| {
            format!(
              "invalid schedule.step: \
               {raw}"
            )
          })?
      }
      | None => defaults.step_minutes
    };

    Ok(ScheduleSettings {
      opening,
      closing,
      step_minutes
    })
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
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

// Only resolves the path. The data
// directory is opened (and must exist)
// when a command reads the snapshot.
#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir =
    if let Some(path) = override_dir {
      path.to_path_buf()
    } else if let Some(cfg_value) =
      cfg.get("data.location")
    {
      expand_tilde(Path::new(
        &cfg_value
      ))
    } else {
      default_data_dir()?
    };

  debug!(dir = %dir.display(), "resolved data directory");
  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(
      path.to_path_buf()
    ));
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

  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  let candidate =
    home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".atrium"))
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

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
