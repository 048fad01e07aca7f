//! Type-safe tool implementations with automatic schema generation.
//!
//! A [`TypedTool`] decodes the raw `tools/call` arguments into a parameter
//! struct, runs its `garde` rules and only then calls the handler, so a
//! handler never sees an invalid request.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use async_trait::async_trait;
use garde::Validate;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use super::ToolHandler;
use crate::types::{ToolAnnotations, ToolInfo};
use crate::{Error, Result};

/// Boxed future returned by typed tool handlers.
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// A typed tool implementation with automatic schema generation and validation.
pub struct TypedTool<T, F>
where
    T: DeserializeOwned + Validate<Context = ()> + Send + Sync + 'static,
    F: Fn(T) -> ToolFuture + Send + Sync,
{
    name: String,
    description: Option<String>,
    input_schema: Value,
    annotations: Option<ToolAnnotations>,
    handler: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, F> fmt::Debug for TypedTool<T, F>
where
    T: DeserializeOwned + Validate<Context = ()> + Send + Sync + 'static,
    F: Fn(T) -> ToolFuture + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .field("annotations", &self.annotations)
            .finish()
    }
}

impl<T, F> TypedTool<T, F>
where
    T: DeserializeOwned + Validate<Context = ()> + Send + Sync + 'static,
    F: Fn(T) -> ToolFuture + Send + Sync,
{
    /// Create a new typed tool with a schema generated from `T`.
    pub fn new(name: impl Into<String>, handler: F) -> Self
    where
        T: JsonSchema,
    {
        Self {
            name: name.into(),
            description: None,
            input_schema: generate_schema::<T>(),
            annotations: None,
            handler,
            _phantom: PhantomData,
        }
    }

    /// Set the description for this tool.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set annotations for this tool.
    pub fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = Some(annotations);
        self
    }
}

#[async_trait]
impl<T, F> ToolHandler for TypedTool<T, F>
where
    T: DeserializeOwned + Validate<Context = ()> + Send + Sync + 'static,
    F: Fn(T) -> ToolFuture + Send + Sync,
{
    async fn handle(&self, args: Value) -> Result<Value> {
        debug!(tool = %self.name, "validating arguments");
        let typed_args: T = serde_json::from_value(args).map_err(|e| {
            Error::Validation(format!("Invalid arguments for tool '{}': {}", self.name, e))
        })?;

        typed_args.validate().map_err(|report| {
            Error::Validation(format!(
                "Invalid arguments for tool '{}': {}",
                self.name,
                report.to_string().trim_end()
            ))
        })?;

        (self.handler)(typed_args).await
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            annotations: self.annotations.clone(),
        })
    }
}

/// Generate a JSON schema for a type using schemars.
///
/// MCP clients expect a self-contained object schema, so the `$schema` marker
/// is dropped and `#/$defs/...` references are inlined.
pub fn generate_schema<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);

    let json_schema = serde_json::to_value(&schema).unwrap_or_else(|_| {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": true
        })
    });

    normalize_schema(json_schema)
}

fn normalize_schema(mut schema: Value) -> Value {
    let defs = match schema.as_object_mut() {
        Some(root) => {
            root.remove("$schema");
            root.remove("$defs")
                .and_then(|defs| match defs {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .unwrap_or_default()
        },
        None => return schema,
    };

    inline_refs(&mut schema, &defs, 0);
    schema
}

// Bounded depth guards against self-referential definitions.
fn inline_refs(value: &mut Value, defs: &Map<String, Value>, depth: usize) {
    if depth > 32 {
        return;
    }

    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/$defs/"))
                .and_then(|name| defs.get(name))
                .cloned();

            if let Some(mut resolved) = target {
                inline_refs(&mut resolved, defs, depth + 1);
                map.remove("$ref");
                if let Value::Object(resolved) = resolved {
                    for (key, v) in resolved {
                        map.entry(key).or_insert(v);
                    }
                }
            }

            for v in map.values_mut() {
                inline_refs(v, defs, depth + 1);
            }
        },
        Value::Array(items) => {
            for v in items {
                inline_refs(v, defs, depth + 1);
            }
        },
        _ => {},
    }
}
