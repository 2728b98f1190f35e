// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fs;
use std::path::PathBuf;

use libtrolley::{Config, Error, PagePolicy, Result, Verbosity};
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "trolley.toml";

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TomlConfig {
    snapshot: Option<PathBuf>,
    user: Option<String>,
    token: Option<String>,
    default_page_size: Option<usize>,
    maximum_page_size: Option<usize>,
    bulk_chunk_size: Option<usize>,
    verbosity: Option<String>,
}

/// cli configuration wrapper that combines toml file parsing with the library's config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub inner: Config,
    pub snapshot: Option<PathBuf>,
    pub user: Option<String>,
    pub token: Option<String>,
}

impl std::ops::Deref for CliConfig {
    type Target = Config;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl CliConfig {
    pub fn load() -> Result<Self> {
        let toml_config = match config_path() {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(&path).map_err(|e| {
                    Error::config(format!(
                        "failed to read config file {}: {e}",
                        path.display()
                    ))
                })?;
                log::debug!("**config:** reading {}", path.display());
                Self::parse(&content)?
            }
            _ => TomlConfig::default(),
        };

        Self::from_toml(toml_config)
    }

    fn parse(content: &str) -> Result<TomlConfig> {
        toml::from_str(content).map_err(|e| Error::config(format!("invalid config file: {e}")))
    }

    fn from_toml(toml_config: TomlConfig) -> Result<Self> {
        let verbosity = match toml_config.verbosity.as_deref() {
            Some("quiet") => Verbosity::Quiet,
            Some("verbose") => Verbosity::Verbose,
            _ => Verbosity::Normal,
        };

        let defaults = PagePolicy::default();
        let default_page_size = toml_config
            .default_page_size
            .unwrap_or(defaults.default_page_size);
        let maximum_page_size = toml_config
            .maximum_page_size
            .unwrap_or(defaults.maximum_page_size);

        if default_page_size == 0 || maximum_page_size == 0 {
            return Err(Error::config("page sizes must be greater than zero"));
        }

        let mut inner = Config::new()
            .with_page_policy(default_page_size, maximum_page_size)
            .with_verbosity(verbosity);
        if let Some(chunk_size) = toml_config.bulk_chunk_size {
            inner = inner.with_bulk_chunk_size(chunk_size);
        }

        Ok(Self {
            inner,
            snapshot: toml_config.snapshot,
            user: toml_config.user,
            token: toml_config.token,
        })
    }

    pub fn edit_config() -> Result<()> {
        let Some(path) = config_path() else {
            return Err(Error::config("could not determine config directory"));
        };

        if !path.exists() {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }

            let default_content = r#"# trolley configuration
# snapshot = "/path/to/snapshot.json"
# user = "user-id"
# default_page_size = 10
# maximum_page_size = 1000
# bulk_chunk_size = 100
# verbosity = "normal"  # quiet, normal, verbose
"#;
            fs::write(&path, default_content)?;
        }

        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "nano".to_string());
        std::process::Command::new(&editor)
            .arg(&path)
            .status()
            .map_err(|e| Error::other(format!("failed to open editor {editor}: {e}")))?;

        Ok(())
    }
}
