//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading fiscal-year
//! configurations from YAML files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::fiscal::FiscalConfig;

use super::types::FiscalYearFile;

/// Loads and provides access to the fiscal configuration of every year.
///
/// # Directory Structure
///
/// ```text
/// config/mx/
/// └── fiscal/
///     ├── 2025.yaml
///     └── 2026.yaml
/// ```
///
/// Each file holds one year. The year is never inferred from dates: callers
/// ask for it explicitly with [`ConfigLoader::fiscal_year`].
///
/// # Example
///
/// ```no_run
/// use nomina_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/mx")?;
/// let fiscal = loader.fiscal_year(2026)?;
/// println!("UMA 2026: {}", fiscal.uma_daily);
/// # Ok::<(), nomina_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    years: BTreeMap<i32, Arc<FiscalConfig>>,
}

impl ConfigLoader {
    /// Loads every `fiscal/*.yaml` file below `path`.
    ///
    /// Fails with `ConfigNotFound` when the directory is missing or empty,
    /// `ConfigParseError` on malformed YAML, a duplicated year or a file
    /// whose name disagrees with its `year`, and with the table or
    /// precision errors of [`FiscalYearFile::into_fiscal_config`].
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let fiscal_dir = path.as_ref().join("fiscal");
        let dir_str = fiscal_dir.display().to_string();

        let entries = fs::read_dir(&fiscal_dir).map_err(|_| EngineError::ConfigNotFound {
            path: dir_str.clone(),
        })?;

        let mut years = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: dir_str.clone(),
            })?;

            let file_path = entry.path();
            if !file_path.extension().is_some_and(|ext| ext == "yaml") {
                continue;
            }

            let config = Self::load_year_file(&file_path)?;
            let path_str = file_path.display().to_string();

            let stem_year = file_path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<i32>().ok());
            if stem_year.is_some_and(|stem| stem != config.year) {
                return Err(EngineError::ConfigParseError {
                    path: path_str,
                    message: format!("file declares year {}", config.year),
                });
            }

            let year = config.year;
            if years.insert(year, Arc::new(config)).is_some() {
                return Err(EngineError::ConfigParseError {
                    path: path_str,
                    message: format!("year {} is configured twice", year),
                });
            }
            debug!(year, path = %path_str, "Loaded fiscal year");
        }

        if years.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no fiscal year files found)", dir_str),
            });
        }

        info!(
            years = ?years.keys().collect::<Vec<_>>(),
            "Fiscal configuration loaded"
        );
        Ok(Self { years })
    }

    /// Builds a loader from YAML text, labelled `source` in errors.
    pub fn from_yaml_str(source: &str, content: &str) -> EngineResult<Self> {
        let config = Self::parse_year(source, content)?;
        let mut years = BTreeMap::new();
        years.insert(config.year, Arc::new(config));
        Ok(Self { years })
    }

    fn load_year_file(path: &Path) -> EngineResult<FiscalConfig> {
        let path_str = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;
        Self::parse_year(&path_str, &content)
    }

    fn parse_year(source: &str, content: &str) -> EngineResult<FiscalConfig> {
        let file: FiscalYearFile =
            serde_yaml::from_str(content).map_err(|e| EngineError::ConfigParseError {
                path: source.to_string(),
                message: e.to_string(),
            })?;
        file.into_fiscal_config()
    }

    /// Returns the configuration for `year`.
    pub fn fiscal_year(&self, year: i32) -> EngineResult<&FiscalConfig> {
        self.years
            .get(&year)
            .map(Arc::as_ref)
            .ok_or(EngineError::FiscalYearNotFound { year })
    }

    /// Returns a shared handle to the configuration for `year`.
    pub fn shared(&self, year: i32) -> EngineResult<Arc<FiscalConfig>> {
        self.years
            .get(&year)
            .cloned()
            .ok_or(EngineError::FiscalYearNotFound { year })
    }

    /// The loaded years, ascending.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }
}
