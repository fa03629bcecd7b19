//! Integration tests for custom engine workflows.
//!
//! A project file declares extensions, a hook table binds them to code, and
//! the engine manager drives them the way the rendering pipeline does.

use lectern::lectern_config::{FileFormat, ProjectConfig};
use lectern::prelude::*;
use lectern::serde_json::{Value, json};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

const PROJECT_TOML: &str = r#"
[dirs]
input = "site"

[[extensions]]
key = "vue"
get_data = ["data", "meta"]
get_instance_from_input_path = "vue-page"
compile = "vue"
init = "warm"

[extensions.compile_options]
cache = true
permalink = "raw"

[[extensions]]
key = "md"
output_file_extension = "html"

[[extensions]]
key = "legacy"
extension = "lgc"

[extensions.compile_options]
get_cache_key = 12
"#;

struct VuePage {
    path: String,
}

#[async_trait]
impl TemplateInstance for VuePage {
    async fn data(&self, key: &str, mixins: &Mixins) -> std::result::Result<Option<Value>, BoxError> {
        match key {
            "data" => Ok(Some(json!({
                "title": mixins.call("title_case", &[json!("hello world")])?,
                "layout": "base",
            }))),
            "meta" => Ok(Some(json!({ "layout": "post", "source": self.path }))),
            _ => Ok(None),
        }
    }
}

struct Markdown {
    dirs: EngineDirs,
}

#[async_trait]
impl TemplateEngine for Markdown {
    fn name(&self) -> &str {
        "md"
    }

    fn dirs(&self) -> &EngineDirs {
        &self.dirs
    }

    async fn compile(&self, source: &str, _input_path: &str, _args: &[Value]) -> Result<Option<Compiled>> {
        let body = source.trim_start_matches("# ").to_string();
        Ok(Some(Compiled::Rendered(format!("<h1>{}</h1>", body))))
    }
}

fn hooks(init_calls: Arc<AtomicUsize>) -> HookTable {
    HookTable::new()
        .with_init("warm", move |_| {
            let init_calls = init_calls.clone();
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                init_calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .with_instance("vue-page", |path| async move {
            Ok(Arc::new(VuePage { path }) as Arc<dyn TemplateInstance>)
        })
        .with_compile("vue", |_, source, _| async move {
            Ok(CompileOutput::render(move |data: Value, _| {
                let output = source.replace("{{ title }}", data["title"].as_str().unwrap_or_default());
                async move { Ok(output) }
            }))
        })
}

fn manager(init_calls: Arc<AtomicUsize>) -> EngineManager {
    let project = ProjectConfig::parse(PROJECT_TOML, FileFormat::Toml).unwrap();
    let config = TemplateConfig::from_project(&project, &hooks(init_calls)).unwrap();
    config.add_helper("title_case", |args| {
        let text = args.first().and_then(Value::as_str).unwrap_or_default();
        let words: Vec<String> = text
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect();
        Ok(Value::String(words.join(" ")))
    });

    let config = Arc::new(config);
    let mut manager = EngineManager::new(config.clone());
    manager.register_builtin(Arc::new(Markdown {
        dirs: config.dirs().clone(),
    }));
    manager
}

// =============================================================================
// Declarative Extensions
// =============================================================================

#[tokio::test]
async fn test_declared_extension_renders_pages() {
    let init_calls = Arc::new(AtomicUsize::new(0));
    let manager = manager(init_calls.clone());
    let engine = manager.engine_for_extension("vue").unwrap();

    assert!(engine.cacheable());
    assert!(!engine.permalink_needs_compilation("/posts/").is_required());
    assert!(engine.is_include_path(std::path::Path::new("site/_includes/card.vue")));

    let data = assert_ok!(engine.get_extra_data_from_file("site/index.vue").await).unwrap();
    assert_eq!(
        Value::Object(data.clone()),
        json!({"title": "Hello World", "layout": "post", "source": "site/index.vue"})
    );

    let compiled = engine
        .compile("<h1>{{ title }}</h1>", "site/index.vue", &[])
        .await
        .unwrap()
        .unwrap();
    let html = assert_ok!(compiled.render(Value::Object(data)).await);
    assert_eq!(html, "<h1>Hello World</h1>");
    assert_eq!(init_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_declared_extension_without_compile_uses_builtin() {
    let manager = manager(Arc::default());
    let engine = manager.engine("MD").unwrap();

    assert_eq!(engine.default_template_file_extension(), Some("html"));
    assert!(assert_ok!(engine.get_extra_data_from_file("site/a.md").await).is_none());

    let compiled = assert_ok!(engine.compile("# Notes", "site/a.md", &[]).await).unwrap();
    assert_eq!(assert_ok!(compiled.render(json!({})).await), "<h1>Notes</h1>");
}

#[test]
fn test_non_callable_cache_key_fails_on_use() {
    let manager = manager(Arc::default());
    let engine = manager.engine_for_extension(".lgc").unwrap();

    let err = assert_err!(engine.get_compile_cache_key("x", "site/a.lgc"));
    assert!(err.is_configuration());
    assert!(err.to_string().contains("legacy"));

    let md = manager.engine("md").unwrap();
    assert_eq!(assert_ok!(md.get_compile_cache_key("x", "site/a.md")), "site/a.mdx");
}

#[test]
fn test_unknown_hook_fails_the_build() {
    let mut project = ProjectConfig::parse(PROJECT_TOML, FileFormat::Toml).unwrap();
    project.extensions[0].compile = Some("react".to_string());

    let err = TemplateConfig::from_project(&project, &hooks(Arc::default())).unwrap_err();
    assert!(err.to_string().contains("react"));
    assert!(err.to_string().contains("vue"));
}

#[test]
fn test_project_file_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lectern.json");
    fs::write(
        &path,
        r#"{"extensions": [{"key": "txt", "read": false, "get_data": true}]}"#,
    )
    .unwrap();

    let project = ProjectConfig::from_file(&path).unwrap();
    let config = Arc::new(TemplateConfig::from_project(&project, &HookTable::new()).unwrap());
    let engine = CustomEngine::new("txt", EngineDirs::default(), config).unwrap();
    assert!(!engine.needs_to_read_file_contents());
    assert!(matches!(engine.entry().get_data, Some(GetData::Enabled(true))));
}

#[tokio::test]
async fn test_get_data_false_in_project_file_fails_on_use() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lectern.json");
    fs::write(
        &path,
        r#"{"extensions": [{"key": "vue", "get_data": false, "get_instance_from_input_path": "vue-page"}]}"#,
    )
    .unwrap();

    let project = assert_ok!(ProjectConfig::from_file(&path));
    let config = assert_ok!(TemplateConfig::from_project(&project, &hooks(Arc::default())));
    let engine = CustomEngine::new("vue", EngineDirs::default(), Arc::new(config)).unwrap();

    let err = assert_err!(engine.get_extra_data_from_file("site/index.vue").await);
    assert!(matches!(err, EngineError::InvalidGetData { .. }));
    assert!(err.to_string().contains("vue"));
}

// =============================================================================
// Pipeline Concurrency
// =============================================================================

#[tokio::test]
async fn test_init_runs_once_across_spawned_pages() {
    let init_calls = Arc::new(AtomicUsize::new(0));
    let manager = manager(init_calls.clone());
    let engine = manager.engine("vue").unwrap();

    let pages: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let path = format!("site/page-{}.vue", i);
                let data = engine.get_extra_data_from_file(&path).await?;
                let compiled = engine.compile("{{ title }}", &path, &[]).await?;
                Ok::<_, EngineError>((data, compiled))
            })
        })
        .collect();

    for page in pages {
        let (data, compiled) = page.await.unwrap().unwrap();
        assert!(data.is_some());
        assert!(compiled.is_some());
    }
    assert_eq!(init_calls.load(Ordering::SeqCst), 1);

    let summaries = manager.config().bench().aggregate().with_min_percent(0.0).finish(
        std::time::Duration::from_secs(1),
    );
    assert!(summaries.iter().any(|s| s.label == "Engine (vue) Init"));
}

#[test]
fn test_custom_extension_shares_registry_with_code() {
    let mut config = TemplateConfig::new();
    config
        .add_extension(ExtensionEntry::new("txt").with_compile_options(
            CompileOptions::new().with_permalink(Permalink::Template("/{{ slug }}/".into())),
        ))
        .unwrap();
    assert!(config.add_extension(ExtensionEntry::new("TXT")).is_err());

    let manager = EngineManager::new(Arc::new(config));
    let engine = manager.engine("txt").unwrap();
    assert!(matches!(
        engine.permalink_needs_compilation("/a/"),
        PermalinkCompilation::Custom(Permalink::Template(_))
    ));
}
