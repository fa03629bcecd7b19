//! Extension entries: one user-registered custom engine each.
//!
//! An [`ExtensionEntry`] is immutable once registered. Every capability is
//! optional; the adapter resolves what is present when it is constructed.

use crate::config::TemplateConfig;
use futures::future::{BoxFuture, FutureExt};
use lectern_core::{BenchmarkGroup, BoxError, DataMap, Permalink, RenderFn, TemplateInstance};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Handed to an extension's `init` callback.
#[derive(Clone)]
pub struct InitContext {
    pub config: Arc<TemplateConfig>,
    /// The group the engine's own timers live in
    pub bench: BenchmarkGroup,
}

/// Handed to an extension's `compile` callback.
#[derive(Clone)]
pub struct CompileContext {
    pub config: Arc<TemplateConfig>,
}

/// Handed to a render function produced by `compile`.
#[derive(Clone, Default)]
pub struct RenderContext {
    /// Renders the same template through the fallback engine, when one is wired.
    pub default_renderer: Option<RenderFn>,
}

impl RenderContext {
    /// Render `data` with the fallback engine.
    pub async fn render_default(&self, data: Value) -> Result<String, BoxError> {
        let render = self
            .default_renderer
            .as_ref()
            .ok_or("no default renderer is available for this template")?;
        Ok(render(data).await?)
    }
}

pub type InitFn = Arc<dyn Fn(InitContext) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

pub type GetDataFn =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<Option<DataMap>, BoxError>> + Send + Sync>;

pub type InstanceFn =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<Arc<dyn TemplateInstance>, BoxError>> + Send + Sync>;

pub type CompileFn = Arc<
    dyn Fn(CompileContext, String, String) -> BoxFuture<'static, Result<CompileOutput, BoxError>>
        + Send
        + Sync,
>;

pub type UserRenderFn =
    Arc<dyn Fn(Value, RenderContext) -> BoxFuture<'static, Result<String, BoxError>> + Send + Sync>;

pub type CacheKeyFn = Arc<dyn Fn(&str, &str) -> Result<String, BoxError> + Send + Sync>;

/// What a `compile` callback produced.
#[derive(Clone)]
pub enum CompileOutput {
    Render(UserRenderFn),
    Rendered(String),
    /// Nothing to render with
    Nothing,
}

impl CompileOutput {
    /// Wrap an async closure as a render function.
    pub fn render<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, RenderContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
    {
        CompileOutput::Render(Arc::new(move |data, context| f(data, context).boxed()))
    }
}

impl fmt::Debug for CompileOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileOutput::Render(_) => f.write_str("Render(..)"),
            CompileOutput::Rendered(output) => f.debug_tuple("Rendered").field(output).finish(),
            CompileOutput::Nothing => f.write_str("Nothing"),
        }
    }
}

/// How an extension supplies per-file data.
#[derive(Clone)]
pub enum GetData {
    /// `true` reads the `data` key of each instance; `false` disables extraction.
    Enabled(bool),
    /// Keys read from each instance, merged in order.
    Keys(Vec<String>),
    /// Produces the data directly from the input path.
    Callback(GetDataFn),
}

impl fmt::Debug for GetData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GetData::Enabled(enabled) => f.debug_tuple("Enabled").field(enabled).finish(),
            GetData::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            GetData::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// `compile_options.get_cache_key`
#[derive(Clone)]
pub enum CacheKeyOption {
    Callback(CacheKeyFn),
    /// A configured value that cannot be called.
    Value(Value),
}

impl fmt::Debug for CacheKeyOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKeyOption::Callback(_) => f.write_str("Callback(..)"),
            CacheKeyOption::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub cache: Option<bool>,
    pub get_cache_key: Option<CacheKeyOption>,
    pub permalink: Option<Permalink>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cache_key<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        self.get_cache_key = Some(CacheKeyOption::Callback(Arc::new(f)));
        self
    }

    pub fn with_permalink(mut self, permalink: Permalink) -> Self {
        self.permalink = Some(permalink);
        self
    }
}

/// A registered custom engine.
///
/// ```ignore
/// let entry = ExtensionEntry::new("txt")
///     .with_output_file_extension("html")
///     .with_compile(|_ctx, source, _path| async move {
///         Ok(CompileOutput::Rendered(source.to_uppercase()))
///     });
/// ```
#[derive(Clone)]
pub struct ExtensionEntry {
    pub key: String,
    pub extension: Option<String>,
    pub read: Option<bool>,
    pub output_file_extension: Option<String>,
    pub init: Option<InitFn>,
    pub get_data: Option<GetData>,
    pub get_instance_from_input_path: Option<InstanceFn>,
    pub compile: Option<CompileFn>,
    pub compile_options: CompileOptions,
}

impl ExtensionEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            extension: None,
            read: None,
            output_file_extension: None,
            init: None,
            get_data: None,
            get_instance_from_input_path: None,
            compile: None,
            compile_options: CompileOptions::default(),
        }
    }

    /// The file extension this entry handles; `key` when unset.
    pub fn extension(&self) -> &str {
        self.extension.as_deref().unwrap_or(&self.key)
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn with_read(mut self, read: bool) -> Self {
        self.read = Some(read);
        self
    }

    pub fn with_output_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.output_file_extension = Some(extension.into());
        self
    }

    pub fn with_init<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(InitContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.init = Some(Arc::new(move |context| f(context).boxed()));
        self
    }

    pub fn with_get_data(mut self, get_data: GetData) -> Self {
        self.get_data = Some(get_data);
        self
    }

    /// Read these keys from each instance.
    pub fn with_data_keys<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_get_data(GetData::Keys(keys.into_iter().map(Into::into).collect()))
    }

    /// Produce the data directly from the input path.
    pub fn with_data_callback<F, Fut>(self, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<DataMap>, BoxError>> + Send + 'static,
    {
        self.with_get_data(GetData::Callback(Arc::new(move |path| f(path).boxed())))
    }

    pub fn with_instance<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn TemplateInstance>, BoxError>> + Send + 'static,
    {
        self.get_instance_from_input_path = Some(Arc::new(move |path| f(path).boxed()));
        self
    }

    pub fn with_compile<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CompileContext, String, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CompileOutput, BoxError>> + Send + 'static,
    {
        self.compile = Some(Arc::new(move |context, source, path| f(context, source, path).boxed()));
        self
    }

    pub fn with_compile_options(mut self, options: CompileOptions) -> Self {
        self.compile_options = options;
        self
    }
}

impl fmt::Debug for ExtensionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionEntry")
            .field("key", &self.key)
            .field("extension", &self.extension())
            .field("read", &self.read)
            .field("output_file_extension", &self.output_file_extension)
            .field("init", &self.init.is_some())
            .field("get_data", &self.get_data)
            .field(
                "get_instance_from_input_path",
                &self.get_instance_from_input_path.is_some(),
            )
            .field("compile", &self.compile.is_some())
            .field("compile_options", &self.compile_options)
            .finish()
    }
}
