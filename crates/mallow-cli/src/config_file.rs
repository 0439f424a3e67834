/*!
# Configuration Files

Loads [`MallowConfig`] from TOML and layers command-line overrides on top.

Lookup order when no `--config` is given: `mallow.toml` in the working
directory, then the `[tool.mallow]` table of `pyproject.toml`, then built-in
defaults. A `mallow.toml` looks like:

```toml
exclude = "migrations/|_pb2\\.py$"
format-fields = true

[style]
line-length = 100
mode = "preserve"

[migration]
enabled = true
migrate = ["description", "example"]
```
*/

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use mallow_core::{KeywordSelection, MallowConfig, PrintMode};

pub const CONFIG_FILE: &str = "mallow.toml";
pub const PYPROJECT_FILE: &str = "pyproject.toml";

/// Contents of a configuration file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FileConfig {
    #[serde(flatten)]
    pub config: MallowConfig,
    /// Regex of paths to skip during discovery
    pub exclude: Option<String>,
}

impl FileConfig {
    /// Parse a standalone `mallow.toml`
    pub fn from_mallow_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Parse the `[tool.mallow]` table of a `pyproject.toml`, if it has one
    pub fn from_pyproject(text: &str) -> Result<Option<Self>> {
        let document: toml::Table = toml::from_str(text)?;
        let Some(table) = document.get("tool").and_then(|tool| tool.get("mallow")) else {
            return Ok(None);
        };
        Ok(Some(table.clone().try_into()?))
    }
}

/// Where the configuration of a run came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    MallowToml(PathBuf),
    Pyproject(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::MallowToml(path) => {
                write!(f, "{}", path.display())
            }
            ConfigSource::Pyproject(path) => write!(f, "{} [tool.mallow]", path.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// Find and parse the configuration for a run started in `cwd`
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<(FileConfig, ConfigSource)> {
    if let Some(path) = explicit {
        let text = read(path)?;
        let is_pyproject = path.file_name().is_some_and(|name| name == PYPROJECT_FILE);
        let config = if is_pyproject {
            FileConfig::from_pyproject(&text)
                .with_context(|| format!("invalid configuration in {}", path.display()))?
                .ok_or_else(|| anyhow!("{} has no [tool.mallow] table", path.display()))?
        } else {
            FileConfig::from_mallow_toml(&text)
                .with_context(|| format!("invalid configuration in {}", path.display()))?
        };
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    let mallow = cwd.join(CONFIG_FILE);
    if mallow.is_file() {
        let config = FileConfig::from_mallow_toml(&read(&mallow)?)
            .with_context(|| format!("invalid configuration in {}", mallow.display()))?;
        return Ok((config, ConfigSource::MallowToml(mallow)));
    }

    let pyproject = cwd.join(PYPROJECT_FILE);
    if pyproject.is_file() {
        let parsed = FileConfig::from_pyproject(&read(&pyproject)?)
            .with_context(|| format!("invalid configuration in {}", pyproject.display()))?;
        if let Some(config) = parsed {
            return Ok((config, ConfigSource::Pyproject(pyproject)));
        }
    }

    Ok((FileConfig::default(), ConfigSource::Defaults))
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Command-line settings that win over the configuration file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub line_length: Option<usize>,
    pub indent_size: Option<usize>,
    pub mode: Option<PrintMode>,
    pub only_changed: bool,
    pub migrate_metadata: bool,
    pub migrate: Vec<String>,
    pub destination: Option<String>,
    pub schema_suffix: Option<String>,
    pub fields: Vec<String>,
    pub sort: bool,
    pub no_trailing_commas: bool,
    pub no_string_wrap: bool,
    pub no_normalize_quotes: bool,
    pub exclude: Option<String>,
}

impl Overrides {
    /// Layer these settings over `file` and validate the result
    pub fn apply(&self, mut file: FileConfig) -> Result<FileConfig> {
        let config = &mut file.config;

        if let Some(line_length) = self.line_length {
            config.style.line_length = line_length;
        }
        if let Some(indent_size) = self.indent_size {
            config.style.indent_size = indent_size;
        }
        if let Some(mode) = self.mode {
            config.style.mode = mode;
        }
        // Only-changed output only makes sense when untouched text survives.
        if self.only_changed {
            config.style.mode = PrintMode::Preserve;
            config.format_fields = false;
        }
        if self.sort {
            config.style.sort_keys = true;
        }
        if self.no_trailing_commas {
            config.style.trailing_commas = false;
        }
        if self.no_string_wrap {
            config.style.wrap_strings = false;
        }
        if self.no_normalize_quotes {
            config.style.normalize_quotes = false;
        }

        if self.migrate_metadata || !self.migrate.is_empty() {
            config.migration.enabled = true;
        }
        if !self.migrate.is_empty() {
            config.migration.selection = KeywordSelection::named(self.migrate.iter().cloned());
        }
        if let Some(destination) = &self.destination {
            config.migration.destination = destination.clone();
        }

        if let Some(suffix) = &self.schema_suffix {
            config.detector.schema_suffix = suffix.clone();
        }
        config.detector.extra_fields.extend(self.fields.iter().cloned());

        if let Some(exclude) = &self.exclude {
            file.exclude = Some(exclude.clone());
        }

        file.config.validate()?;
        Ok(file)
    }
}
