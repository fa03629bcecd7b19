// Project file loading

use crate::{ConfigError, Result};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Project file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    /// Format for a file path, by extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("json") {
            Some(FileFormat::Json)
        } else if ext.eq_ignore_ascii_case("toml") {
            Some(FileFormat::Toml)
        } else {
            None
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileFormat::Json => "JSON",
            FileFormat::Toml => "TOML",
        })
    }
}

/// Turns a project file into a JSON value tree, whatever its format
#[derive(Debug, Clone, Copy)]
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Loader for `path`, picked by file extension
    pub fn for_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        FileFormat::from_path(path)
            .map(Self::new)
            .ok_or_else(|| ConfigError::UnknownFormat(path.to_path_buf()))
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&content)
    }

    pub fn parse(&self, content: &str) -> Result<Value> {
        let parsed = match self.format {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            FileFormat::Toml => toml::from_str::<toml::Value>(content)
                .map_err(|e| e.to_string())
                .and_then(|table| serde_json::to_value(table).map_err(|e| e.to_string())),
        };
        parsed.map_err(|message| ConfigError::Parse {
            format: self.format,
            message,
        })
    }
}
