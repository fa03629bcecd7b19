//! Named callbacks for declaratively configured extensions.
//!
//! A project file refers to hooks by name (`compile = "sass"`); a
//! [`HookTable`] maps those names to code before the registry is built.

use crate::entry::{
    CacheKeyFn, CacheKeyOption, CompileContext, CompileFn, CompileOptions, CompileOutput, ExtensionEntry,
    GetData, InitContext, InitFn, InstanceFn,
};
use futures::future::FutureExt;
use lectern_config::{ExtensionManifest, GetDataManifest};
use lectern_core::{BoxError, EngineError, Permalink, Result, TemplateInstance};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct HookTable {
    init: HashMap<String, InitFn>,
    compile: HashMap<String, CompileFn>,
    instance: HashMap<String, InstanceFn>,
    cache_key: HashMap<String, CacheKeyFn>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_init<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(InitContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        self.init.insert(name.into(), Arc::new(move |context| f(context).boxed()));
        self
    }

    pub fn with_compile<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(CompileContext, String, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<CompileOutput, BoxError>> + Send + 'static,
    {
        self.compile.insert(
            name.into(),
            Arc::new(move |context, source, path| f(context, source, path).boxed()),
        );
        self
    }

    pub fn with_instance<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Arc<dyn TemplateInstance>, BoxError>> + Send + 'static,
    {
        self.instance.insert(name.into(), Arc::new(move |path| f(path).boxed()));
        self
    }

    pub fn with_cache_key<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str, &str) -> std::result::Result<String, BoxError> + Send + Sync + 'static,
    {
        self.cache_key.insert(name.into(), Arc::new(f));
        self
    }

    /// Bind a manifest's hook names, producing a registrable entry.
    pub fn resolve(&self, manifest: &ExtensionManifest) -> Result<ExtensionEntry> {
        let engine = manifest.key.as_str();
        let mut entry = ExtensionEntry::new(engine);
        entry.extension = manifest.extension.clone();
        entry.read = manifest.read;
        entry.output_file_extension = manifest.output_file_extension.clone();

        entry.init = lookup(&self.init, engine, "init", manifest.init.as_deref())?;
        entry.compile = lookup(&self.compile, engine, "compile", manifest.compile.as_deref())?;
        entry.get_instance_from_input_path = lookup(
            &self.instance,
            engine,
            "get_instance_from_input_path",
            manifest.get_instance_from_input_path.as_deref(),
        )?;

        entry.get_data = manifest.get_data.as_ref().map(|get_data| match get_data {
            GetDataManifest::Enabled(enabled) => GetData::Enabled(*enabled),
            GetDataManifest::Keys(keys) => GetData::Keys(keys.clone()),
        });

        if let Some(options) = &manifest.compile_options {
            entry.compile_options = CompileOptions {
                cache: options.cache,
                get_cache_key: match &options.get_cache_key {
                    Some(Value::String(name)) => {
                        lookup(&self.cache_key, engine, "get_cache_key", Some(name.as_str()))?
                            .map(CacheKeyOption::Callback)
                    }
                    Some(other) => Some(CacheKeyOption::Value(other.clone())),
                    None => None,
                },
                permalink: options
                    .permalink
                    .as_ref()
                    .map(|value| {
                        Permalink::from_value(value).ok_or_else(|| EngineError::InvalidPermalink {
                            engine: engine.to_string(),
                            value: value.clone(),
                        })
                    })
                    .transpose()?,
            };
        }

        Ok(entry)
    }
}

fn lookup<T: Clone>(
    table: &HashMap<String, T>,
    engine: &str,
    hook: &'static str,
    name: Option<&str>,
) -> Result<Option<T>> {
    let Some(name) = name else {
        return Ok(None);
    };
    table
        .get(name)
        .cloned()
        .map(Some)
        .ok_or_else(|| EngineError::UnknownHook {
            engine: engine.to_string(),
            hook,
            name: name.to_string(),
        })
}
