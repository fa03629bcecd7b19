//! The configuration store custom engines read from.

use crate::entry::ExtensionEntry;
use crate::hooks::HookTable;
use crate::registry::ExtensionRegistry;
use lectern_config::ProjectConfig;
use lectern_core::{BenchmarkRegistry, BoxError, EngineDirs, HelperFn, Mixins, Result};
use lectern_log::debug;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Project-wide template configuration: registered extensions, helper
/// functions, template directories and the run's benchmarks.
///
/// Extensions are added before the config is shared. Helper functions can be
/// added at any time; readers get a snapshot through
/// [`javascript_functions`](Self::javascript_functions).
pub struct TemplateConfig {
    dirs: EngineDirs,
    extensions: ExtensionRegistry,
    javascript_functions: RwLock<Mixins>,
    bench: BenchmarkRegistry,
}

impl TemplateConfig {
    pub fn new() -> Self {
        Self {
            dirs: EngineDirs::default(),
            extensions: ExtensionRegistry::new(),
            javascript_functions: RwLock::new(Mixins::new()),
            bench: BenchmarkRegistry::new(),
        }
    }

    pub fn with_dirs(mut self, dirs: EngineDirs) -> Self {
        self.dirs = dirs;
        self
    }

    /// Build a config from a loaded project file, binding hook names
    /// through `hooks`.
    pub fn from_project(project: &ProjectConfig, hooks: &HookTable) -> Result<Self> {
        let mut config = Self::new().with_dirs(EngineDirs::from(&project.dirs));
        for manifest in &project.extensions {
            config.add_extension(hooks.resolve(manifest)?)?;
        }
        debug!(
            "Template config ready with {} custom extension(s)",
            config.extensions.len()
        );
        Ok(config)
    }

    pub fn add_extension(&mut self, entry: ExtensionEntry) -> Result<()> {
        self.extensions.register(entry)
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    pub fn dirs(&self) -> &EngineDirs {
        &self.dirs
    }

    pub fn bench(&self) -> &BenchmarkRegistry {
        &self.bench
    }

    pub fn add_javascript_function(&self, name: impl Into<String>, helper: HelperFn) {
        self.javascript_functions.write().insert(name, helper);
    }

    /// Register a helper from a plain closure.
    pub fn add_helper<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.add_javascript_function(name, Arc::new(f));
    }

    /// A snapshot of the helper functions. Later additions are not visible
    /// through it.
    pub fn javascript_functions(&self) -> Mixins {
        self.javascript_functions.read().clone()
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TemplateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateConfig")
            .field("dirs", &self.dirs)
            .field("extensions", &self.extensions.keys().collect::<Vec<_>>())
            .field("javascript_functions", &*self.javascript_functions.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_helper_snapshots_are_isolated() {
        let config = TemplateConfig::new();
        config.add_helper("one", |_| Ok(json!(1)));

        let snapshot = config.javascript_functions();
        config.add_helper("two", |_| Ok(json!(2)));

        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.contains("two"));
        assert_eq!(config.javascript_functions().len(), 2);
        assert_eq!(snapshot.call("one", &[]).unwrap(), json!(1));
    }

    #[test]
    fn test_add_extension_rejects_duplicates() {
        let mut config = TemplateConfig::new();
        config.add_extension(ExtensionEntry::new("txt")).unwrap();
        assert!(config.add_extension(ExtensionEntry::new("Txt")).is_err());
        assert_eq!(config.extensions().len(), 1);
    }

    #[test]
    fn test_dirs() {
        let config = TemplateConfig::new().with_dirs(EngineDirs::new("site"));
        assert_eq!(config.dirs().includes_path(), std::path::PathBuf::from("site/_includes"));
    }
}
