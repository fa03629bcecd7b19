//! Data extraction from template instances.
//!
//! Some engines produce, for each input file, an *instance*: a user object
//! that exposes data under one or more keys (`data` by default). The
//! [`DataExtractor`] reads one key from an instance, handing it the helper
//! functions ([`Mixins`]) configured for the project.

use crate::error::{BoxError, EngineError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A flat mapping of data keys to values.
pub type DataMap = serde_json::Map<String, Value>;

/// A project-wide helper function callable from data callbacks.
pub type HelperFn = Arc<dyn Fn(&[Value]) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// Key under which instances expose their primary data.
pub const DEFAULT_DATA_KEY: &str = "data";

/// Helper functions made available to instance data callbacks.
///
/// Cloning is cheap and yields an independent table: inserting into one
/// clone is never visible through another.
#[derive(Clone, Default)]
pub struct Mixins {
    helpers: BTreeMap<String, HelperFn>,
}

impl Mixins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, helper: HelperFn) -> Option<HelperFn> {
        self.helpers.insert(name.into(), helper)
    }

    pub fn get(&self, name: &str) -> Option<&HelperFn> {
        self.helpers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    /// Call a helper by name. Unknown names are an error of the calling callback.
    pub fn call(&self, name: &str, args: &[Value]) -> std::result::Result<Value, BoxError> {
        let helper = self
            .helpers
            .get(name)
            .ok_or_else(|| format!("Unknown helper function \"{}\"", name))?;
        helper(args)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }
}

impl fmt::Debug for Mixins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.helpers.keys()).finish()
    }
}

/// A per-file object produced by a custom engine.
#[async_trait]
pub trait TemplateInstance: Send + Sync {
    /// Keys to read instead of the ones configured for the engine.
    fn data_key_override(&self) -> Option<Vec<String>> {
        None
    }

    /// The value stored under `key`, `None` when the instance has no such key.
    async fn data(&self, key: &str, mixins: &Mixins) -> std::result::Result<Option<Value>, BoxError>;
}

/// Options for a single [`DataExtractor::extract`] call.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub mixins: Mixins,
    /// Reject values that are not objects.
    pub is_object_required: bool,
}

impl ExtractOptions {
    pub fn for_key(key: &str, mixins: Mixins) -> Self {
        Self {
            mixins,
            is_object_required: key == DEFAULT_DATA_KEY,
        }
    }
}

/// Reads one data key from a template instance.
#[async_trait]
pub trait DataExtractor: Send + Sync {
    async fn extract(
        &self,
        instance: &dyn TemplateInstance,
        input_path: &str,
        key: &str,
        options: &ExtractOptions,
    ) -> Result<Option<Value>>;
}

/// Default extractor: asks the instance for the key and enforces
/// `is_object_required`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceDataExtractor;

#[async_trait]
impl DataExtractor for InstanceDataExtractor {
    async fn extract(
        &self,
        instance: &dyn TemplateInstance,
        input_path: &str,
        key: &str,
        options: &ExtractOptions,
    ) -> Result<Option<Value>> {
        let value = instance
            .data(key, &options.mixins)
            .await
            .map_err(EngineError::callback)?;

        match value {
            Some(value) if options.is_object_required && !value.is_object() => {
                Err(EngineError::InvalidDataFormat {
                    input_path: input_path.to_string(),
                    found: type_name(&value).to_string(),
                })
            }
            other => Ok(other),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
