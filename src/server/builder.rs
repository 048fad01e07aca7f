//! Builder pattern for constructing `ServerCore` instances.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::server::core::ServerCore;
use crate::server::{ResourceHandler, ToolHandler};
use crate::types::{Implementation, ResourceCapabilities, ServerCapabilities, ToolCapabilities};

/// Builder for constructing a `ServerCore` instance.
///
/// # Examples
///
/// ```rust,no_run
/// use nova_canvas_mcp::server::ServerCoreBuilder;
/// use nova_canvas_mcp::server::ToolHandler;
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct MyTool;
///
/// #[async_trait]
/// impl ToolHandler for MyTool {
///     async fn handle(&self, _args: Value) -> nova_canvas_mcp::Result<Value> {
///         Ok(serde_json::json!({"result": "success"}))
///     }
/// }
///
/// # fn example() -> nova_canvas_mcp::Result<()> {
/// let server = ServerCoreBuilder::new()
///     .name("my-server")
///     .version("1.0.0")
///     .tool("my-tool", MyTool)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ServerCoreBuilder {
    name: Option<String>,
    version: Option<String>,
    capabilities: ServerCapabilities,
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
    resources: Option<Arc<dyn ResourceHandler>>,
    stateless_mode: bool,
}

impl std::fmt::Debug for ServerCoreBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerCoreBuilder")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("stateless_mode", &self.stateless_mode)
            .finish()
    }
}

impl Default for ServerCoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerCoreBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            name: None,
            version: None,
            capabilities: ServerCapabilities::default(),
            tools: BTreeMap::new(),
            resources: None,
            stateless_mode: false,
        }
    }

    /// Set the server name.
    ///
    /// This is a required field that identifies the server implementation.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the server version.
    ///
    /// This is a required field that identifies the server version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the server capabilities.
    pub fn capabilities(mut self, capabilities: ServerCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Add a tool handler.
    pub fn tool(self, name: impl Into<String>, handler: impl ToolHandler + 'static) -> Self {
        self.tool_arc(name, Arc::new(handler))
    }

    /// Add a tool handler with an Arc.
    pub fn tool_arc(mut self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) -> Self {
        self.tools.insert(name.into(), handler);

        // Some(false) rather than None so the field serializes
        if self.capabilities.tools.is_none() {
            self.capabilities.tools = Some(ToolCapabilities {
                list_changed: Some(false),
            });
        }

        self
    }

    /// Set the resource handler.
    pub fn resources(self, handler: impl ResourceHandler + 'static) -> Self {
        self.resources_arc(Arc::new(handler))
    }

    /// Set the resource handler with an Arc.
    pub fn resources_arc(mut self, handler: Arc<dyn ResourceHandler>) -> Self {
        self.resources = Some(handler);

        if self.capabilities.resources.is_none() {
            self.capabilities.resources = Some(ResourceCapabilities {
                subscribe: Some(false),
                list_changed: Some(false),
            });
        }

        self
    }

    /// Skip the `initialize` handshake check.
    ///
    /// Used by the HTTP endpoint, where every POST is independent.
    pub fn stateless_mode(mut self, enabled: bool) -> Self {
        self.stateless_mode = enabled;
        self
    }

    /// Build the `ServerCore` instance.
    pub fn build(self) -> Result<ServerCore> {
        let name = self
            .name
            .ok_or_else(|| Error::Config("Server name is required".to_string()))?;

        let version = self
            .version
            .ok_or_else(|| Error::Config("Server version is required".to_string()))?;

        Ok(ServerCore::new(
            Implementation { name, version },
            self.capabilities,
            self.tools,
            self.resources,
            self.stateless_mode,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    struct TestTool;

    #[async_trait]
    impl ToolHandler for TestTool {
        async fn handle(&self, _args: Value) -> Result<Value> {
            Ok(serde_json::json!({"result": "test"}))
        }
    }

    #[test]
    fn test_builder_required_fields() {
        let result = ServerCoreBuilder::new().version("1.0.0").build();
        assert!(result.is_err());

        let result = ServerCoreBuilder::new().name("test").build();
        assert!(result.is_err());

        let result = ServerCoreBuilder::new()
            .name("test")
            .version("1.0.0")
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_builder_capabilities_serialization() {
        let server = ServerCoreBuilder::new()
            .name("test")
            .version("1.0.0")
            .tool("test-tool", TestTool)
            .build()
            .unwrap();

        let json = serde_json::to_value(server.capabilities()).unwrap();
        assert_eq!(json["tools"]["listChanged"], serde_json::json!(false));
        assert!(json.get("resources").is_none());
    }

    #[test]
    fn test_builder_with_custom_capabilities() {
        let custom_caps = ServerCapabilities::tools_only();

        let server = ServerCoreBuilder::new()
            .name("test")
            .version("1.0.0")
            .capabilities(custom_caps.clone())
            .build()
            .unwrap();

        assert_eq!(server.capabilities().tools, custom_caps.tools);
    }
}
