//! Core of the Lectern template layer.
//!
//! - [`engine`]: the [`TemplateEngine`] contract, [`EngineBase`] and render types
//! - [`data`]: template instances, helper functions and the data extractor
//! - [`bench`]: benchmark timers for engine phases
//! - [`error`]: [`EngineError`] and the callback error wrapper

pub mod bench;
pub mod data;
pub mod engine;
pub mod error;

pub use bench::{Benchmark, BenchmarkGroup, BenchmarkGuard, BenchmarkRegistry, BenchmarkSummary};
pub use data::{
    DEFAULT_DATA_KEY, DataExtractor, DataMap, ExtractOptions, HelperFn, InstanceDataExtractor, Mixins,
    TemplateInstance,
};
pub use engine::{
    Compiled, EngineBase, EngineDirs, Permalink, PermalinkCompilation, PermalinkFn, RenderFn, RenderFuture,
    TemplateEngine, default_compile_cache_key, render_fn,
};
pub use error::{BoxError, CallbackError, EngineError, Result};

// Re-exported so implementors of the async traits need no extra dependency.
pub use async_trait::async_trait;
