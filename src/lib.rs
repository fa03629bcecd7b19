// Lectern - the template engine layer of a static-site generator
//
// The core crate defines the engine contract the rendering pipeline drives;
// the custom crate lets a project plug in its own engines through
// configuration.

// Re-export core functionality
pub use lectern_core::*;

// Logging macros and setup
pub use lectern_log as log;

// Re-export optional crates
#[cfg(feature = "config")]
pub use lectern_config;

#[cfg(feature = "custom")]
pub use lectern_custom;

pub use serde_json;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        BoxError, Compiled, DataMap, EngineDirs, EngineError, Mixins, Permalink, PermalinkCompilation,
        Result, TemplateEngine, TemplateInstance, async_trait,
    };

    #[cfg(feature = "config")]
    pub use lectern_config::{ProjectConfig, Validate};

    #[cfg(feature = "custom")]
    pub use lectern_custom::{
        CompileOptions, CompileOutput, CustomEngine, EngineManager, ExtensionEntry, GetData, HookTable,
        RenderContext, TemplateConfig,
    };
}
