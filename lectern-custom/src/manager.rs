//! Engine lookup for the rendering pipeline.

use crate::config::TemplateConfig;
use crate::engine::CustomEngine;
use lectern_core::{DataExtractor, EngineDirs, EngineError, InstanceDataExtractor, Result, TemplateEngine};
use lectern_log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Hands out engines by name or file extension for one generator run.
///
/// Built-in engines are registered up front. Custom engines are created on
/// first request and reused afterwards; a custom extension whose key matches
/// a built-in engine falls back to that engine.
pub struct EngineManager {
    config: Arc<TemplateConfig>,
    builtins: HashMap<String, Arc<dyn TemplateEngine>>,
    custom: Mutex<HashMap<String, Arc<CustomEngine>>>,
    extractor: Arc<dyn DataExtractor>,
}

impl EngineManager {
    pub fn new(config: Arc<TemplateConfig>) -> Self {
        Self {
            config,
            builtins: HashMap::new(),
            custom: Mutex::new(HashMap::new()),
            extractor: Arc::new(InstanceDataExtractor),
        }
    }

    /// Extractor handed to every custom engine this manager creates.
    pub fn with_extractor(mut self, extractor: Arc<dyn DataExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn register_builtin(&mut self, engine: Arc<dyn TemplateEngine>) {
        let name = engine.name().to_lowercase();
        debug!("Registered built-in engine {}", name);
        self.builtins.insert(name, engine);
    }

    pub fn config(&self) -> &Arc<TemplateConfig> {
        &self.config
    }

    pub fn is_custom(&self, name: &str) -> bool {
        self.config.extensions().contains(name)
    }

    /// The engine registered as `name`. Custom extensions take precedence
    /// over built-in engines of the same name.
    pub fn engine(&self, name: &str) -> Result<Arc<dyn TemplateEngine>> {
        if self.is_custom(name) {
            let engine: Arc<dyn TemplateEngine> = self.custom_engine(name)?;
            return Ok(engine);
        }
        self.builtins
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| EngineError::EngineNotFound { name: name.to_string() })
    }

    /// The custom engine for `name`, created on first use.
    pub fn custom_engine(&self, name: &str) -> Result<Arc<CustomEngine>> {
        let key = name.to_lowercase();
        let mut custom = self.custom.lock();
        if let Some(engine) = custom.get(&key) {
            return Ok(engine.clone());
        }

        let dirs: EngineDirs = self.config.dirs().clone();
        let mut engine =
            CustomEngine::new(name, dirs, self.config.clone())?.with_extractor(self.extractor.clone());
        if let Some(builtin) = self.builtins.get(&key) {
            engine.set_default_engine(builtin.clone());
        }

        let engine = Arc::new(engine);
        custom.insert(key, engine.clone());
        Ok(engine)
    }

    /// The engine for files ending in `.extension`.
    pub fn engine_for_extension(&self, extension: &str) -> Result<Arc<dyn TemplateEngine>> {
        let extension = extension.trim_start_matches('.');
        match self.config.extensions().by_extension(extension) {
            Some(entry) => self.engine(&entry.key),
            None => self.engine(extension),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{CompileOutput, ExtensionEntry};
    use async_trait::async_trait;
    use lectern_core::{Compiled, EngineBase};
    use serde_json::{Value, json};

    struct Plain {
        base: EngineBase,
    }

    #[async_trait]
    impl TemplateEngine for Plain {
        fn name(&self) -> &str {
            self.base.name()
        }

        fn dirs(&self) -> &EngineDirs {
            self.base.dirs()
        }

        async fn compile(&self, source: &str, _input_path: &str, _args: &[Value]) -> Result<Option<Compiled>> {
            Ok(Some(Compiled::Rendered(format!("[{}]", source))))
        }
    }

    fn builtin(name: &str) -> Arc<dyn TemplateEngine> {
        Arc::new(Plain {
            base: EngineBase::new(name, EngineDirs::default()),
        })
    }

    fn manager() -> EngineManager {
        let mut config = TemplateConfig::new();
        config
            .add_extension(ExtensionEntry::new("md").with_output_file_extension("html"))
            .unwrap();
        config
            .add_extension(
                ExtensionEntry::new("clowncar")
                    .with_extension("clown")
                    .with_compile(|_, source, _| async move { Ok(CompileOutput::Rendered(source.repeat(2))) }),
            )
            .unwrap();

        let mut manager = EngineManager::new(Arc::new(config));
        manager.register_builtin(builtin("md"));
        manager.register_builtin(builtin("njk"));
        manager
    }

    #[tokio::test]
    async fn test_custom_engine_falls_back_to_builtin() {
        let manager = manager();
        let engine = manager.engine("md").unwrap();
        assert_eq!(engine.default_template_file_extension(), Some("html"));

        let compiled = engine.compile("hi", "a.md", &[]).await.unwrap().unwrap();
        assert_eq!(compiled.render(json!({})).await.unwrap(), "[hi]");

        let custom = manager.custom_engine("MD").unwrap();
        assert_eq!(custom.default_engine().unwrap().name(), "md");
    }

    #[test]
    fn test_custom_engines_are_cached() {
        let manager = manager();
        let a = manager.custom_engine("clowncar").unwrap();
        let b = manager.custom_engine("ClownCar").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.default_engine().is_none());
    }

    #[tokio::test]
    async fn test_lookup_by_extension() {
        let manager = manager();
        let engine = manager.engine_for_extension(".clown").unwrap();
        assert_eq!(engine.name(), "clowncar");
        let compiled = engine.compile("ha", "a.clown", &[]).await.unwrap().unwrap();
        assert_eq!(compiled.render(json!({})).await.unwrap(), "haha");

        assert_eq!(manager.engine_for_extension("njk").unwrap().name(), "njk");
    }

    #[test]
    fn test_unknown_engine() {
        let manager = manager();
        let err = match manager.engine("liquid") {
            Ok(_) => panic!("liquid is not registered"),
            Err(err) => err,
        };
        assert!(matches!(err, EngineError::EngineNotFound { .. }));
        assert!(!manager.is_custom("njk"));
    }
}
