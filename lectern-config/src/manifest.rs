//! Declarative extension records.
//!
//! A project file can describe custom template extensions without code. Hooks
//! (`init`, `compile`, `get_instance_from_input_path`, `get_cache_key`) are
//! referenced by name and bound to callbacks when the registry is built.

use crate::validation::{ConfigValidator, Validate};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One custom extension as written in a project file.
///
/// ```toml
/// [[extensions]]
/// key = "scss"
/// output_file_extension = "css"
/// compile = "sass"
///
/// [extensions.compile_options]
/// permalink = "raw"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionManifest {
    /// Engine name, matched case-insensitively
    pub key: String,
    /// File extension handled by this entry; `key` when absent
    pub extension: Option<String>,
    pub read: Option<bool>,
    pub output_file_extension: Option<String>,
    pub get_data: Option<GetDataManifest>,
    pub init: Option<String>,
    pub compile: Option<String>,
    pub get_instance_from_input_path: Option<String>,
    pub compile_options: Option<CompileOptionsManifest>,
}

/// `get_data = true` or `get_data = ["data", "meta"]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GetDataManifest {
    Enabled(bool),
    Keys(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptionsManifest {
    pub cache: Option<bool>,
    /// `false`, `true`, `"raw"` or a permalink template string
    pub permalink: Option<Value>,
    /// Hook name when a string; any other value is kept as-is and reported
    /// as non-callable when a cache key is requested
    pub get_cache_key: Option<Value>,
}

impl ExtensionManifest {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// The file extension this entry handles
    pub fn extension(&self) -> &str {
        self.extension.as_deref().unwrap_or(&self.key)
    }
}

impl Validate for ExtensionManifest {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.key, "extension key")?;
        ConfigValidator::is_bare_extension(self.extension(), &format!("extension of {}", self.key))?;
        if let Some(ext) = &self.output_file_extension {
            ConfigValidator::is_bare_extension(ext, &format!("output_file_extension of {}", self.key))?;
        }
        Ok(())
    }
}
