// Project configuration for Lectern

pub mod error;
pub mod loader;
pub mod manifest;
pub mod validation;

pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use manifest::{CompileOptionsManifest, ExtensionManifest, GetDataManifest};
pub use validation::{ConfigValidator, Validate};

use lectern_log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Template-root directories, relative to the project root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirsConfig {
    pub input: PathBuf,
    pub includes: PathBuf,
    /// Falls back to `includes` when absent
    pub layouts: Option<PathBuf>,
    pub data: PathBuf,
}

impl Default for DirsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            includes: PathBuf::from("_includes"),
            layouts: None,
            data: PathBuf::from("_data"),
        }
    }
}

/// Contents of a `lectern.toml` / `lectern.json` project file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub dirs: DirsConfig,
    pub extensions: Vec<ExtensionManifest>,
}

impl ProjectConfig {
    /// Load and validate a project file, picking the format from its extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let value = ConfigLoader::for_path(path)?.load_file(path)?;
        let config = Self::from_value(value)?;
        debug!(
            "Loaded {} extension manifest(s) from {}",
            config.extensions.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse and validate a project file held in memory
    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        Self::from_value(ConfigLoader::new(format).parse(content)?)
    }

    fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl Validate for ProjectConfig {
    fn validate(&self) -> Result<()> {
        for manifest in &self.extensions {
            manifest.validate()?;
        }
        ConfigValidator::unique_keys(self.extensions.iter().map(|m| m.key.as_str()), "extensions")
    }
}
