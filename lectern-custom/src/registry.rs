//! Registered extensions, keyed by lowercased name.

use crate::entry::{ExtensionEntry, GetData};
use lectern_config::ConfigValidator;
use lectern_core::{EngineError, Result};
use lectern_log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    entries: Vec<Arc<ExtensionEntry>>,
    by_key: HashMap<String, usize>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Keys compare case-insensitively and must be unique.
    pub fn register(&mut self, entry: ExtensionEntry) -> Result<()> {
        ConfigValidator::not_empty(&entry.key, "extension key")?;
        let key = entry.key.to_lowercase();
        if self.by_key.contains_key(&key) {
            return Err(EngineError::DuplicateExtension { key: entry.key });
        }

        match &entry.get_data {
            Some(GetData::Enabled(false)) => {
                warn!(
                    "Extension {} sets get_data to false; declare it as true or a list of keys, or leave it out",
                    entry.key
                );
            }
            Some(GetData::Keys(keys)) if keys.is_empty() => {
                warn!(
                    "Extension {} reads no data keys; get_data will fail for its templates",
                    entry.key
                );
            }
            Some(GetData::Enabled(true)) | Some(GetData::Keys(_))
                if entry.get_instance_from_input_path.is_none() =>
            {
                warn!(
                    "Extension {} reads instance data but has no get_instance_from_input_path",
                    entry.key
                );
            }
            _ => {}
        }

        debug!("Registered custom extension {} (.{})", entry.key, entry.extension());
        self.by_key.insert(key, self.entries.len());
        self.entries.push(Arc::new(entry));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<ExtensionEntry>> {
        self.by_key
            .get(&name.to_lowercase())
            .map(|&index| self.entries[index].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_key.contains_key(&name.to_lowercase())
    }

    /// The entry handling files with extension `extension` (no leading dot).
    pub fn by_extension(&self, extension: &str) -> Option<Arc<ExtensionEntry>> {
        let extension = extension.trim_start_matches('.');
        self.entries
            .iter()
            .find(|entry| entry.extension().eq_ignore_ascii_case(extension))
            .cloned()
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ExtensionEntry>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
