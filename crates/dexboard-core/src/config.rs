use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::catalog::CATALOG_PAGE_LIMIT;
use crate::table::{
  DEFAULT_PAGE_SIZE,
  PAGE_SIZE_OPTIONS
};

const CONFIG_ENV_VAR: &str =
  "DEXBOARD_CONFIG";
const CONFIG_FILE: &str = "config.toml";
const APP_DIR: &str = "dexboard";

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub data_dir:     Option<PathBuf>,
  pub color:        bool,
  pub table:        TableConfig,
  pub catalog:      CatalogConfig,
  #[serde(skip)]
  pub loaded_files: Vec<PathBuf>
}

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
  pub page_size: usize
}

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
  pub page_limit: u32
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_dir:     None,
      color:        true,
      table:        TableConfig::default(),
      catalog:      CatalogConfig::default(),
      loaded_files: vec![]
    }
  }
}

impl Default for TableConfig {
  fn default() -> Self {
    Self {
      page_size: DEFAULT_PAGE_SIZE
    }
  }
}

impl Default for CatalogConfig {
  fn default() -> Self {
    Self {
      page_limit: CATALOG_PAGE_LIMIT
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let path = resolve_config_path(
      config_override
    )?;
    let Some(path) = path else {
      warn!(
        "no config file found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading config");
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    let mut cfg = Self::from_toml_str(
      &text
    )
    .with_context(|| {
      format!(
        "invalid config {}",
        path.display()
      )
    })?;
    cfg.loaded_files.push(path);
    Ok(cfg)
  }

  pub fn from_toml_str(
    text: &str
  ) -> anyhow::Result<Self> {
    let cfg: Config =
      toml::from_str(text)?;
    cfg.validate()?;
    Ok(cfg)
  }

  /// Applies `key=value` overrides on top of the loaded file. Keys may
  /// carry an `rc.` prefix.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .trim()
        .to_string();
      let value = v.trim();
      debug!(key = %key, value = %value, "applying override");

      match key.as_str() {
        | "data_dir" => {
          self.data_dir =
            Some(PathBuf::from(value));
        }
        | "color" => {
          self.color = parse_bool(value)
            .ok_or_else(|| {
              anyhow!(
                "invalid color setting: \
                 {value}"
              )
            })?;
        }
        | "table.page_size" => {
          self.table.page_size = value
            .parse::<usize>()
            .with_context(|| {
              format!(
                "invalid table.page_size: \
                 {value}"
              )
            })?;
        }
        | "catalog.page_limit" => {
          self.catalog.page_limit =
            value.parse::<u32>().with_context(
              || {
                format!(
                  "invalid \
                   catalog.page_limit: \
                   {value}"
                )
              }
            )?;
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: {other}"
          ));
        }
      }
    }

    self.validate()
  }

  fn validate(
    &self
  ) -> anyhow::Result<()> {
    if !PAGE_SIZE_OPTIONS
      .contains(&self.table.page_size)
    {
      return Err(anyhow!(
        "table.page_size must be one \
         of {PAGE_SIZE_OPTIONS:?}, got \
         {}",
        self.table.page_size
      ));
    }
    if self.catalog.page_limit == 0 {
      return Err(anyhow!(
        "catalog.page_limit must be \
         positive"
      ));
    }
    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.data_dir.as_deref()
  {
    expand_tilde(cfg_value)
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(expand_tilde(path)));
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if env_path == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(expand_tilde(
      Path::new(&env_path)
    )));
  }

  let Some(config_dir) =
    dirs::config_dir()
  else {
    debug!(
      "no platform config directory"
    );
    return Ok(None);
  };
  let candidate = config_dir
    .join(APP_DIR)
    .join(CONFIG_FILE);
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
  Ok(home.join(".dexboard"))
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

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;

  #[test]
  fn defaults_match_the_web_client() {
    let cfg = Config::default();
    assert_eq!(cfg.table.page_size, 10);
    assert_eq!(
      cfg.catalog.page_limit,
      12
    );
    assert!(cfg.color);
    assert!(cfg.data_dir.is_none());
  }

  #[test]
  fn parses_partial_toml() {
    let cfg = Config::from_toml_str(
      "color = false\n[table]\npage_size \
       = 25\n"
    )
    .unwrap();
    assert!(!cfg.color);
    assert_eq!(cfg.table.page_size, 25);
    assert_eq!(
      cfg.catalog.page_limit,
      12
    );
  }

  #[test]
  fn rejects_bad_values_and_unknown_keys()
   {
    assert!(
      Config::from_toml_str(
        "[table]\npage_size = 7\n"
      )
      .is_err()
    );
    assert!(
      Config::from_toml_str(
        "colour = true\n"
      )
      .is_err()
    );
    assert!(
      Config::from_toml_str(
        "[catalog]\npage_limit = 0\n"
      )
      .is_err()
    );
  }

  #[test]
  fn overrides_apply_after_file() {
    let mut cfg = Config::default();
    cfg
      .apply_overrides(vec![
        (
          "rc.table.page_size".to_string(),
          "50".to_string()
        ),
        (
          "color".to_string(),
          "off".to_string()
        ),
        (
          "data_dir".to_string(),
          "/tmp/dex".to_string()
        ),
      ])
      .unwrap();
    assert_eq!(cfg.table.page_size, 50);
    assert!(!cfg.color);
    assert_eq!(
      cfg.data_dir,
      Some(PathBuf::from("/tmp/dex"))
    );

    assert!(
      cfg
        .apply_overrides(vec![(
          "nope".to_string(),
          "1".to_string()
        )])
        .is_err()
    );
    assert!(
      cfg
        .apply_overrides(vec![(
          "table.page_size".to_string(),
          "11".to_string()
        )])
        .is_err()
    );
  }

  #[test]
  fn load_reads_explicit_path() {
    let temp = tempdir().unwrap();
    let path =
      temp.path().join("dex.toml");
    fs::write(
      &path,
      "[catalog]\npage_limit = 20\n"
    )
    .unwrap();
    let cfg =
      Config::load(Some(&path)).unwrap();
    assert_eq!(
      cfg.catalog.page_limit,
      20
    );
    assert_eq!(cfg.loaded_files, vec![
      path
    ]);
  }

  #[test]
  fn data_dir_override_wins_and_is_created()
   {
    let temp = tempdir().unwrap();
    let target =
      temp.path().join("nested/data");
    let mut cfg = Config::default();
    cfg.data_dir =
      Some(PathBuf::from("/unused"));
    let dir = resolve_data_dir(
      &cfg,
      Some(&target)
    )
    .unwrap();
    assert_eq!(dir, target);
    assert!(dir.exists());
  }
}
