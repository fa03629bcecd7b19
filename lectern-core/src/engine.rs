//! The template engine contract.
//!
//! Every engine the rendering pipeline drives, built-in or user supplied,
//! implements [`TemplateEngine`]. [`EngineBase`] carries what all engines
//! share: their name, their template-root directories and the default
//! compile cache key.

use crate::data::DataMap;
use crate::error::{BoxError, Result};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use lectern_config::DirsConfig;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Future returned by a render function.
pub type RenderFuture = BoxFuture<'static, Result<String>>;

/// A compiled template: takes the page data, produces output.
pub type RenderFn = Arc<dyn Fn(Value) -> RenderFuture + Send + Sync>;

/// Wrap an async closure as a [`RenderFn`].
pub fn render_fn<F, Fut>(f: F) -> RenderFn
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    Arc::new(move |data| f(data).boxed())
}

/// Result of compiling a template.
#[derive(Clone)]
pub enum Compiled {
    /// Render on demand with page data.
    Render(RenderFn),
    /// Output produced at compile time.
    Rendered(String),
}

impl Compiled {
    pub async fn render(&self, data: Value) -> Result<String> {
        match self {
            Compiled::Render(render) => render(data).await,
            Compiled::Rendered(output) => Ok(output.clone()),
        }
    }

    pub fn is_render_fn(&self) -> bool {
        matches!(self, Compiled::Render(_))
    }
}

impl fmt::Debug for Compiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compiled::Render(_) => f.write_str("Compiled::Render(..)"),
            Compiled::Rendered(output) => f.debug_tuple("Compiled::Rendered").field(output).finish(),
        }
    }
}

/// Computes a permalink from page data.
pub type PermalinkFn = Arc<dyn Fn(&Value) -> std::result::Result<Option<String>, BoxError> + Send + Sync>;

/// An explicit `permalink` setting of a custom extension.
#[derive(Clone)]
pub enum Permalink {
    Enabled(bool),
    /// The string `"raw"`: use the permalink as written.
    Raw,
    Template(String),
    Callback(PermalinkFn),
}

impl Permalink {
    /// Interpret a configuration value. `None` for anything that is neither
    /// a boolean nor a string.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(enabled) => Some(Permalink::Enabled(*enabled)),
            Value::String(template) => Some(Permalink::template(template.as_str())),
            _ => None,
        }
    }

    /// A permalink template; `"raw"` becomes [`Permalink::Raw`].
    pub fn template(template: impl Into<String>) -> Self {
        let template = template.into();
        if template == "raw" {
            Permalink::Raw
        } else {
            Permalink::Template(template)
        }
    }

    /// Whether the permalink is used as written.
    pub fn is_raw(&self) -> bool {
        match self {
            Permalink::Raw => true,
            Permalink::Template(template) => template == "raw",
            _ => false,
        }
    }
}

impl fmt::Debug for Permalink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permalink::Enabled(enabled) => f.debug_tuple("Enabled").field(enabled).finish(),
            Permalink::Raw => f.write_str("Raw"),
            Permalink::Template(template) => f.debug_tuple("Template").field(template).finish(),
            Permalink::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Answer to "does this permalink need to go through the engine?"
#[derive(Debug, Clone)]
pub enum PermalinkCompilation {
    /// Use the permalink verbatim.
    Skip,
    /// Compile the permalink with the engine.
    Compile,
    /// The extension configured its own permalink handling; the caller decides.
    Custom(Permalink),
}

impl PermalinkCompilation {
    /// Truthiness of the answer: everything except `Skip` and
    /// `Custom(Enabled(false))` asks for compilation.
    pub fn is_required(&self) -> bool {
        match self {
            PermalinkCompilation::Skip => false,
            PermalinkCompilation::Compile => true,
            PermalinkCompilation::Custom(Permalink::Enabled(enabled)) => *enabled,
            PermalinkCompilation::Custom(_) => true,
        }
    }
}

/// Template-root directories an engine resolves includes and layouts against.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineDirs {
    pub input: PathBuf,
    pub includes: PathBuf,
    pub layouts: Option<PathBuf>,
    pub data: PathBuf,
}

impl EngineDirs {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self::from(&DirsConfig {
            input: input.into(),
            ..DirsConfig::default()
        })
    }

    /// Includes directory, joined onto the input directory.
    pub fn includes_path(&self) -> PathBuf {
        self.input.join(&self.includes)
    }

    /// Layouts directory, joined onto the input directory. Falls back to includes.
    pub fn layouts_path(&self) -> PathBuf {
        self.input.join(self.layouts.as_deref().unwrap_or(&self.includes))
    }

    pub fn data_path(&self) -> PathBuf {
        self.input.join(&self.data)
    }
}

impl Default for EngineDirs {
    fn default() -> Self {
        Self::from(&DirsConfig::default())
    }
}

impl From<&DirsConfig> for EngineDirs {
    fn from(config: &DirsConfig) -> Self {
        Self {
            input: config.input.clone(),
            includes: config.includes.clone(),
            layouts: config.layouts.clone(),
            data: config.data.clone(),
        }
    }
}

/// State and defaults shared by all engines.
#[derive(Debug, Clone)]
pub struct EngineBase {
    name: String,
    dirs: EngineDirs,
}

impl EngineBase {
    pub fn new(name: impl Into<String>, dirs: EngineDirs) -> Self {
        Self {
            name: name.into(),
            dirs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dirs(&self) -> &EngineDirs {
        &self.dirs
    }

    /// Default compile cache key: input path followed by the template source.
    ///
    /// Keyed on the path as well so that two files with identical content do
    /// not share a compiled template, and so that an empty template still
    /// gets a non-empty key.
    pub fn compile_cache_key(&self, source: &str, input_path: &str) -> String {
        default_compile_cache_key(source, input_path)
    }
}

pub fn default_compile_cache_key(source: &str, input_path: &str) -> String {
    let mut key = String::with_capacity(input_path.len() + source.len());
    key.push_str(input_path);
    key.push_str(source);
    key
}

/// The contract the rendering pipeline uses to drive an engine.
#[async_trait]
pub trait TemplateEngine: Send + Sync {
    fn name(&self) -> &str;

    fn dirs(&self) -> &EngineDirs;

    /// Whether compiled output may be reused for identical cache keys.
    fn cacheable(&self) -> bool {
        false
    }

    /// Whether the caller must load the raw file before compiling.
    fn needs_to_read_file_contents(&self) -> bool {
        true
    }

    /// Extra front-matter-like data the engine extracts from a template.
    async fn get_extra_data_from_file(&self, _input_path: &str) -> Result<Option<DataMap>> {
        Ok(None)
    }

    /// Compile `source` found at `input_path`. `Ok(None)` means this engine
    /// cannot render the template.
    async fn compile(&self, source: &str, input_path: &str, args: &[Value]) -> Result<Option<Compiled>>;

    fn default_template_file_extension(&self) -> Option<&str> {
        Some("html")
    }

    fn get_compile_cache_key(&self, source: &str, input_path: &str) -> Result<String> {
        Ok(default_compile_cache_key(source, input_path))
    }

    fn permalink_needs_compilation(&self, _permalink: &str) -> PermalinkCompilation {
        PermalinkCompilation::Compile
    }

    /// Whether `input_path` lives in this engine's includes or layouts directory.
    fn is_include_path(&self, input_path: &Path) -> bool {
        let dirs = self.dirs();
        input_path.starts_with(dirs.includes_path()) || input_path.starts_with(dirs.layouts_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo {
        base: EngineBase,
    }

    #[async_trait]
    impl TemplateEngine for Echo {
        fn name(&self) -> &str {
            self.base.name()
        }

        fn dirs(&self) -> &EngineDirs {
            self.base.dirs()
        }

        async fn compile(&self, source: &str, _input_path: &str, _args: &[Value]) -> Result<Option<Compiled>> {
            let source = source.to_string();
            Ok(Some(Compiled::Render(render_fn(move |data: Value| {
                let source = source.clone();
                async move { Ok(format!("{}:{}", source, data["name"].as_str().unwrap_or(""))) }
            }))))
        }
    }

    #[tokio::test]
    async fn test_trait_defaults() {
        let engine = Echo {
            base: EngineBase::new("echo", EngineDirs::new("src")),
        };

        assert!(!engine.cacheable());
        assert!(engine.needs_to_read_file_contents());
        assert_eq!(engine.default_template_file_extension(), Some("html"));
        assert!(engine.get_extra_data_from_file("src/a.echo").await.unwrap().is_none());
        assert!(engine.permalink_needs_compilation("/a/").is_required());
        assert_eq!(
            engine.get_compile_cache_key("body", "src/a.echo").unwrap(),
            "src/a.echobody"
        );

        let compiled = engine.compile("hi", "src/a.echo", &[]).await.unwrap().unwrap();
        assert!(compiled.is_render_fn());
        assert_eq!(compiled.render(json!({"name": "there"})).await.unwrap(), "hi:there");
    }

    #[test]
    fn test_empty_source_still_has_a_key() {
        let base = EngineBase::new("echo", EngineDirs::default());
        assert_eq!(base.compile_cache_key("", "index.echo"), "index.echo");
    }

    #[test]
    fn test_include_paths() {
        let engine = Echo {
            base: EngineBase::new("echo", EngineDirs::new("src")),
        };
        assert!(engine.is_include_path(Path::new("src/_includes/base.echo")));
        assert!(!engine.is_include_path(Path::new("src/posts/a.echo")));
    }

    #[test]
    fn test_permalink_from_value() {
        assert!(matches!(Permalink::from_value(&json!(false)), Some(Permalink::Enabled(false))));
        assert!(matches!(Permalink::from_value(&json!("raw")), Some(Permalink::Raw)));
        assert!(matches!(
            Permalink::from_value(&json!("/{{ slug }}/")),
            Some(Permalink::Template(_))
        ));
        assert!(Permalink::from_value(&json!(3)).is_none());

        assert!(matches!(Permalink::template("raw"), Permalink::Raw));
        assert!(Permalink::Template("raw".into()).is_raw());
        assert!(!Permalink::template("/posts/").is_raw());
        assert!(!Permalink::Enabled(true).is_raw());
    }

    #[test]
    fn test_permalink_compilation_truthiness() {
        assert!(!PermalinkCompilation::Skip.is_required());
        assert!(PermalinkCompilation::Compile.is_required());
        assert!(!PermalinkCompilation::Custom(Permalink::Enabled(false)).is_required());
        assert!(PermalinkCompilation::Custom(Permalink::Template("/x/".into())).is_required());
    }

    #[tokio::test]
    async fn test_rendered_output_ignores_data() {
        let compiled = Compiled::Rendered("static".to_string());
        assert_eq!(compiled.render(json!({"x": 1})).await.unwrap(), "static");
        assert_eq!(format!("{:?}", compiled), "Compiled::Rendered(\"static\")");
    }
}
