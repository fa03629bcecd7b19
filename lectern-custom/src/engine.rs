//! The custom engine adapter.
//!
//! [`CustomEngine`] wraps one registered [`ExtensionEntry`] and drives it
//! through the [`TemplateEngine`] contract: a one-time `init`, per-file data
//! extraction, compilation with an optional fallback engine, cache keys and
//! permalink handling.

use crate::config::TemplateConfig;
use crate::entry::{
    CacheKeyOption, CompileContext, CompileOutput, ExtensionEntry, GetData, GetDataFn, InitContext,
    RenderContext, UserRenderFn,
};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared, try_join_all};
use lectern_core::{
    BenchmarkGroup, CallbackError, Compiled, DEFAULT_DATA_KEY, DataExtractor, DataMap, EngineBase, EngineDirs,
    EngineError, ExtractOptions, InstanceDataExtractor, Permalink, PermalinkCompilation, RenderFn, Result,
    TemplateEngine, render_fn,
};
use lectern_log::debug;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

type SharedInit = Shared<BoxFuture<'static, std::result::Result<(), CallbackError>>>;

/// How per-file data is obtained, fixed when the engine is built.
enum DataPlan {
    Disabled,
    Direct(GetDataFn),
    /// Keys read from each instance, deduplicated in first-occurrence order
    Instance(Vec<String>),
}

impl DataPlan {
    fn for_entry(entry: &ExtensionEntry) -> Self {
        match &entry.get_data {
            None => DataPlan::Disabled,
            Some(GetData::Enabled(true)) => DataPlan::Instance(vec![DEFAULT_DATA_KEY.to_string()]),
            // Declared but off: no keys, so extraction reports the misconfiguration
            Some(GetData::Enabled(false)) => DataPlan::Instance(Vec::new()),
            Some(GetData::Keys(keys)) => DataPlan::Instance(dedupe_keys(keys)),
            Some(GetData::Callback(get_data)) => DataPlan::Direct(get_data.clone()),
        }
    }
}

fn dedupe_keys(keys: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.iter()
        .filter(|key| seen.insert(key.as_str()))
        .cloned()
        .collect()
}

/// A user-registered template engine.
pub struct CustomEngine {
    base: EngineBase,
    config: Arc<TemplateConfig>,
    entry: Arc<ExtensionEntry>,
    cacheable: bool,
    data_plan: DataPlan,
    needs_init: AtomicBool,
    initializing: Mutex<Option<SharedInit>>,
    default_engine: Option<Arc<dyn TemplateEngine>>,
    extractor: Arc<dyn DataExtractor>,
    bench: BenchmarkGroup,
}

impl CustomEngine {
    /// Build the adapter for the extension registered under `name`
    /// (case-insensitive).
    pub fn new(name: impl Into<String>, dirs: EngineDirs, config: Arc<TemplateConfig>) -> Result<Self> {
        let name = name.into();
        let entry = config
            .extensions()
            .get(&name)
            .ok_or_else(|| EngineError::ExtensionNotFound { name: name.clone() })?;

        debug!("Creating custom engine {} for extension {}", name, entry.key);

        Ok(Self {
            cacheable: entry.compile_options.cache.unwrap_or(false),
            data_plan: DataPlan::for_entry(&entry),
            needs_init: AtomicBool::new(entry.init.is_some()),
            initializing: Mutex::new(None),
            default_engine: None,
            extractor: Arc::new(InstanceDataExtractor),
            bench: config.bench().aggregate(),
            base: EngineBase::new(name, dirs),
            config,
            entry,
        })
    }

    /// Replace the extractor used for instance data.
    pub fn with_extractor(mut self, extractor: Arc<dyn DataExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Fallback engine used when the extension has no `compile`, and handed
    /// to render functions as their default renderer.
    pub fn set_default_engine(&mut self, engine: Arc<dyn TemplateEngine>) {
        debug!("Custom engine {} falls back to {}", self.name(), engine.name());
        self.default_engine = Some(engine);
    }

    pub fn default_engine(&self) -> Option<&Arc<dyn TemplateEngine>> {
        self.default_engine.as_ref()
    }

    pub fn entry(&self) -> &ExtensionEntry {
        &self.entry
    }

    pub fn config(&self) -> &Arc<TemplateConfig> {
        &self.config
    }

    /// Whether `init` still has to complete.
    pub fn needs_init(&self) -> bool {
        self.needs_init.load(Ordering::Acquire)
    }

    /// Run the extension's `init` if it has not completed yet.
    ///
    /// Concurrent callers share one invocation. A failed `init` is not
    /// retried: every current and later caller gets the same error.
    pub async fn ensure_initialized(&self) -> Result<()> {
        if !self.needs_init() {
            return Ok(());
        }
        let Some(init) = self.entry.init.clone() else {
            return Ok(());
        };

        let _timer = self.bench.get(&format!("Engine ({}) Init", self.name())).start();

        let pending = {
            let mut slot = self.initializing.lock();
            slot.get_or_insert_with(|| {
                debug!("Initializing custom engine {}", self.name());
                let context = InitContext {
                    config: self.config.clone(),
                    bench: self.bench.clone(),
                };
                async move { init(context).await.map_err(CallbackError::new) }
                    .boxed()
                    .shared()
            })
            .clone()
        };

        pending.await?;

        if self.needs_init.swap(false, Ordering::AcqRel) {
            debug!("Custom engine {} initialized", self.name());
        }
        Ok(())
    }

    async fn extract_instance_data(&self, input_path: &str, keys: &[String]) -> Result<DataMap> {
        let get_instance = self.entry.get_instance_from_input_path.as_ref().ok_or_else(|| {
            EngineError::MissingInstanceCallback {
                engine: self.name().to_string(),
            }
        })?;
        if keys.is_empty() {
            return Err(EngineError::InvalidGetData {
                engine: self.name().to_string(),
            });
        }

        let mixins = self.config.javascript_functions();
        let instance = get_instance(input_path.to_string())
            .await
            .map_err(EngineError::callback)?;

        let keys = match instance.data_key_override() {
            Some(overridden) => dedupe_keys(&overridden),
            None => keys.to_vec(),
        };
        debug!("Reading data keys {:?} from {}", keys, input_path);

        let instance = instance.as_ref();
        let extractions = keys.iter().map(|key| {
            let options = ExtractOptions::for_key(key, mixins.clone());
            async move { self.extractor.extract(instance, input_path, key, &options).await }
        });
        let values = try_join_all(extractions).await?;

        let mut data = DataMap::new();
        for (key, value) in keys.iter().zip(values) {
            match value {
                Some(Value::Object(map)) => data.extend(map),
                Some(other) => debug!(
                    "Ignoring non-object value under {} from {}: {}",
                    key, input_path, other
                ),
                None => {}
            }
        }
        Ok(data)
    }

    /// Compiles through the fallback engine with the same arguments, then
    /// renders the page data.
    fn default_renderer(&self, source: &str, input_path: &str, args: &[Value]) -> Option<RenderFn> {
        let engine = self.default_engine.clone()?;
        let source: Arc<str> = Arc::from(source);
        let input_path: Arc<str> = Arc::from(input_path);
        let args: Arc<[Value]> = Arc::from(args);

        Some(render_fn(move |data| {
            let engine = engine.clone();
            let source = source.clone();
            let input_path = input_path.clone();
            let args = args.clone();
            async move {
                let compiled = engine
                    .compile(&source, &input_path, &args)
                    .await?
                    .ok_or_else(|| EngineError::NotRenderable {
                        engine: engine.name().to_string(),
                        input_path: input_path.to_string(),
                    })?;
                compiled.render(data).await
            }
        }))
    }
}

fn bind_render_context(render: UserRenderFn, default_renderer: Option<RenderFn>) -> RenderFn {
    render_fn(move |data| {
        let context = RenderContext {
            default_renderer: default_renderer.clone(),
        };
        let rendering = render(data, context);
        async move { rendering.await.map_err(EngineError::callback) }
    })
}

#[async_trait]
impl TemplateEngine for CustomEngine {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn dirs(&self) -> &EngineDirs {
        self.base.dirs()
    }

    fn cacheable(&self) -> bool {
        self.cacheable
    }

    fn needs_to_read_file_contents(&self) -> bool {
        self.entry.read.unwrap_or(true)
    }

    async fn get_extra_data_from_file(&self, input_path: &str) -> Result<Option<DataMap>> {
        self.ensure_initialized().await?;

        match &self.data_plan {
            DataPlan::Disabled => Ok(None),
            DataPlan::Direct(get_data) => {
                let _timer = self
                    .bench
                    .get(&format!("Engine ({}) Get Data From File", self.name()))
                    .start();
                get_data(input_path.to_string())
                    .await
                    .map_err(EngineError::callback)
            }
            DataPlan::Instance(keys) => {
                let _timer = self
                    .bench
                    .get(&format!("Engine ({}) Get Data From File", self.name()))
                    .start();
                self.extract_instance_data(input_path, keys).await.map(Some)
            }
        }
    }

    async fn compile(&self, source: &str, input_path: &str, args: &[Value]) -> Result<Option<Compiled>> {
        self.ensure_initialized().await?;

        let default_renderer = self.default_renderer(source, input_path, args);

        let Some(compile) = &self.entry.compile else {
            if default_renderer.is_none() {
                debug!(
                    "Custom engine {} has no compile callback and no default engine for {}",
                    self.name(),
                    input_path
                );
            }
            return Ok(default_renderer.map(Compiled::Render));
        };

        let context = CompileContext {
            config: self.config.clone(),
        };
        let output = compile(context, source.to_string(), input_path.to_string())
            .await
            .map_err(EngineError::callback)?;

        Ok(match output {
            CompileOutput::Render(render) => Some(Compiled::Render(bind_render_context(render, default_renderer))),
            CompileOutput::Rendered(output) => Some(Compiled::Rendered(output)),
            CompileOutput::Nothing => None,
        })
    }

    fn default_template_file_extension(&self) -> Option<&str> {
        self.entry.output_file_extension.as_deref()
    }

    fn get_compile_cache_key(&self, source: &str, input_path: &str) -> Result<String> {
        match &self.entry.compile_options.get_cache_key {
            Some(CacheKeyOption::Callback(get_cache_key)) => {
                get_cache_key(source, input_path).map_err(EngineError::callback)
            }
            Some(CacheKeyOption::Value(_)) => Err(EngineError::InvalidCacheKey {
                engine: self.name().to_string(),
            }),
            None => Ok(self.base.compile_cache_key(source, input_path)),
        }
    }

    fn permalink_needs_compilation(&self, _permalink: &str) -> PermalinkCompilation {
        match &self.entry.compile_options.permalink {
            Some(Permalink::Enabled(false)) => PermalinkCompilation::Skip,
            Some(permalink) if permalink.is_raw() => PermalinkCompilation::Skip,
            Some(permalink) => PermalinkCompilation::Custom(permalink.clone()),
            None => PermalinkCompilation::Compile,
        }
    }
}
