//! User-registered template engines for Lectern.
//!
//! A project registers custom extensions, either in code with
//! [`ExtensionEntry`] or declaratively in its project file bound through a
//! [`HookTable`]. Each extension is driven by a [`CustomEngine`], which the
//! [`EngineManager`] creates on demand.
//!
//! ```ignore
//! let mut config = TemplateConfig::new();
//! config.add_extension(
//!     ExtensionEntry::new("txt")
//!         .with_compile(|_, source, _| async move {
//!             Ok(CompileOutput::Rendered(source.to_uppercase()))
//!         }),
//! )?;
//!
//! let manager = EngineManager::new(Arc::new(config));
//! let engine = manager.engine_for_extension("txt")?;
//! let page = engine.compile("hello", "index.txt", &[]).await?;
//! ```

pub mod config;
pub mod engine;
pub mod entry;
pub mod hooks;
pub mod manager;
pub mod registry;

pub use config::TemplateConfig;
pub use engine::CustomEngine;
pub use entry::{
    CacheKeyFn, CacheKeyOption, CompileContext, CompileFn, CompileOptions, CompileOutput, ExtensionEntry,
    GetData, GetDataFn, InitContext, InitFn, InstanceFn, RenderContext, UserRenderFn,
};
pub use hooks::HookTable;
pub use manager::EngineManager;
pub use registry::ExtensionRegistry;
