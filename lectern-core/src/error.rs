//! Error types shared by every Lectern engine.

use std::sync::Arc;
use thiserror::Error;

/// Error type returned by user-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// A failure raised inside a user callback.
///
/// The original error is kept behind an `Arc` so that one failure can be
/// handed to several waiters. `Display` and `source()` are forwarded
/// unchanged.
#[derive(Debug, Clone, Error)]
#[error(transparent)]
pub struct CallbackError(Arc<dyn std::error::Error + Send + Sync>);

impl CallbackError {
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(Arc::from(err.into()))
    }

    /// The error exactly as the callback returned it.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }

    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    /// Whether two handles point at the same underlying failure.
    pub fn same_as(&self, other: &CallbackError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Errors raised by template engines.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No registered extension matches the requested engine name.
    #[error("Could not find a custom extension for {name}. Did you add it to your config file?")]
    ExtensionNotFound { name: String },

    /// Two extensions were registered under the same key.
    #[error("A custom extension for {key} is already registered")]
    DuplicateExtension { key: String },

    /// `get_data` resolved to an empty key set.
    #[error(
        "get_data must be an array of keys or `true` in your add_extension configuration (engine: {engine})"
    )]
    InvalidGetData { engine: String },

    /// Instance-based data extraction without an instance callback.
    #[error("get_instance_from_input_path callback missing from {engine} template engine plugin.")]
    MissingInstanceCallback { engine: String },

    /// `compile_options.get_cache_key` holds something other than a callback.
    #[error("`compile_options.get_cache_key` must be a function in add_extension for the {engine} type")]
    InvalidCacheKey { engine: String },

    /// `compile_options.permalink` holds a value that is neither a bool nor a string.
    #[error("`compile_options.permalink` for {engine} must be a boolean, \"raw\" or a template string, got {value}")]
    InvalidPermalink { engine: String, value: serde_json::Value },

    /// A declarative extension names a hook that was never registered.
    #[error("Unknown {hook} hook \"{name}\" referenced by the {engine} extension")]
    UnknownHook {
        engine: String,
        hook: &'static str,
        name: String,
    },

    /// A template's data callback returned something other than an object.
    #[error("Invalid data format returned from {input_path}: typeof {found}")]
    InvalidDataFormat { input_path: String, found: String },

    /// The engine produced nothing that can be rendered.
    #[error("The {engine} engine has nothing to render {input_path} with")]
    NotRenderable { engine: String, input_path: String },

    /// No engine is registered under this name or extension.
    #[error("No template engine registered for {name}")]
    EngineNotFound { name: String },

    #[error(transparent)]
    Config(#[from] lectern_config::ConfigError),

    #[error(transparent)]
    Callback(#[from] CallbackError),
}

impl EngineError {
    /// Wrap an error returned by a user callback. Engine errors that travelled
    /// through a callback (for example from a delegated render) come back
    /// out unchanged.
    pub fn callback(err: impl Into<BoxError>) -> Self {
        match err.into().downcast::<EngineError>() {
            Ok(engine) => *engine,
            Err(other) => EngineError::Callback(CallbackError::new(other)),
        }
    }

    /// Whether this is a configuration problem rather than a callback failure.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            EngineError::Callback(_)
                | EngineError::InvalidDataFormat { .. }
                | EngineError::NotRenderable { .. }
        )
    }

    /// The callback failure carried by this error, if any.
    pub fn as_callback(&self) -> Option<&CallbackError> {
        match self {
            EngineError::Callback(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct DiskError;

    #[test]
    fn test_callback_error_is_transparent() {
        let err = EngineError::callback(DiskError);
        assert_eq!(err.to_string(), "disk on fire");
        assert!(!err.is_configuration());

        let callback = err.as_callback().unwrap();
        assert!(callback.downcast_ref::<DiskError>().is_some());
    }

    #[test]
    fn test_engine_errors_pass_back_through_callbacks() {
        let inner = EngineError::MissingInstanceCallback {
            engine: "vue".to_string(),
        };
        let boxed: BoxError = Box::new(inner);

        let err = EngineError::callback(boxed);
        assert!(matches!(err, EngineError::MissingInstanceCallback { .. }));
    }

    #[test]
    fn test_callback_error_clones_share_identity() {
        let original = CallbackError::new("boom");
        let copy = original.clone();
        assert!(original.same_as(&copy));
        assert!(!original.same_as(&CallbackError::new("boom")));
        assert!(copy.source().is_none());
    }

    #[test]
    fn test_configuration_messages_name_the_engine() {
        let err = EngineError::ExtensionNotFound {
            name: "txt".to_string(),
        };
        assert!(err.to_string().contains("txt"));
        assert!(err.is_configuration());

        let err = EngineError::InvalidGetData {
            engine: "vue".to_string(),
        };
        assert!(err.to_string().contains("must be an array of keys or `true`"));
        assert!(err.to_string().contains("vue"));
    }
}
