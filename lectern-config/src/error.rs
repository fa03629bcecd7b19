// Error types for project configuration

use crate::loader::FileFormat;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read project file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot tell the format of {0}; expected a .json or .toml project file")]
    UnknownFormat(PathBuf),

    #[error("Invalid {format} in project file: {message}")]
    Parse { format: FileFormat, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Project file has an unexpected shape: {0}")]
    DeserializationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
