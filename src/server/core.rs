//! Transport-independent MCP server core implementation.
//!
//! [`ServerCore`] routes decoded JSON-RPC requests to the registered tool and
//! resource handlers. It has no knowledge of stdio or HTTP; the transport
//! loops in [`crate::server`] and [`crate::server::http`] feed it requests.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error};

use super::{ResourceHandler, ToolHandler};
use crate::error::{Error, Result};
use crate::types::{
    CallToolRequest, CallToolResult, ClientNotification, ClientRequest,
    ErrorCode, Implementation, InitializeRequest, InitializeResult, JSONRPCNotification,
    JSONRPCRequest, JSONRPCResponse, ListRequest, ListResourceTemplatesResult,
    ListResourcesResult, ListToolsResult, ProtocolVersion, ReadResourceRequest,
    ReadResourceResult, RequestId, ServerCapabilities, ToolInfo,
};

/// Core server implementation without transport dependencies.
pub struct ServerCore {
    /// Server metadata
    info: Implementation,

    /// Server capabilities
    capabilities: ServerCapabilities,

    /// Registered tool handlers, listed in name order
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,

    /// Resource handler (optional)
    resources: Option<Arc<dyn ResourceHandler>>,

    /// Server initialization state
    initialized: RwLock<bool>,

    /// Skip the initialize handshake check (one request per connection)
    stateless_mode: bool,
}

impl std::fmt::Debug for ServerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerCore")
            .field("info", &self.info)
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("resources", &self.resources.is_some())
            .field("stateless_mode", &self.stateless_mode)
            .finish()
    }
}

impl ServerCore {
    /// Create a new `ServerCore` with the given configuration.
    pub fn new(
        info: Implementation,
        capabilities: ServerCapabilities,
        tools: BTreeMap<String, Arc<dyn ToolHandler>>,
        resources: Option<Arc<dyn ResourceHandler>>,
        stateless_mode: bool,
    ) -> Self {
        Self {
            info,
            capabilities,
            tools,
            resources,
            initialized: RwLock::new(false),
            stateless_mode,
        }
    }

    /// Server capabilities.
    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    /// Check if the server is initialized.
    pub async fn is_initialized(&self) -> bool {
        *self.initialized.read().await
    }

    /// Decode and handle a raw JSON-RPC request.
    pub async fn handle_jsonrpc(&self, request: JSONRPCRequest) -> JSONRPCResponse {
        let id = request.id.clone();
        match ClientRequest::from_jsonrpc(&request) {
            Ok(client_request) => self.handle_request(id, client_request).await,
            Err(e) => {
                debug!(method = %request.method, "rejecting request: {}", e);
                Self::error_response(id, e.code(), e.to_string())
            },
        }
    }

    /// Handle a single typed request and return a response.
    pub async fn handle_request(&self, id: RequestId, request: ClientRequest) -> JSONRPCResponse {
        debug!(%id, method = request.method(), "handling request");

        let handshake = matches!(request, ClientRequest::Initialize(_) | ClientRequest::Ping);
        if !handshake && !self.stateless_mode && !self.is_initialized().await {
            return Self::error_response(
                id,
                ErrorCode::NOT_INITIALIZED,
                "Server not initialized. Call initialize first.".to_string(),
            );
        }

        self.dispatch(id, request).await
    }

    /// Handle a notification (no response expected).
    ///
    /// Client notifications carry nothing this server acts on.
    pub fn handle_notification(&self, notification: &JSONRPCNotification) {
        match ClientNotification::from(notification) {
            ClientNotification::Initialized => debug!("client finished initialization"),
            ClientNotification::Cancelled => debug!("client cancelled a request"),
            ClientNotification::Other(method) => debug!(%method, "ignoring notification"),
        }
    }

    async fn dispatch(&self, id: RequestId, request: ClientRequest) -> JSONRPCResponse {
        match request {
            ClientRequest::Initialize(req) => {
                Self::respond(id, self.handle_initialize(&req).await)
            },
            ClientRequest::Ping => Self::success_response(id, Value::Object(Default::default())),
            ClientRequest::ListTools(req) => Self::respond(id, self.handle_list_tools(&req)),
            ClientRequest::CallTool(req) => Self::respond(id, self.handle_call_tool(req).await),
            ClientRequest::ListResources(req) => {
                Self::respond(id, self.handle_list_resources(&req).await)
            },
            ClientRequest::ListResourceTemplates(_) => {
                Self::respond(id, self.handle_list_resource_templates().await)
            },
            ClientRequest::ReadResource(req) => {
                Self::respond(id, self.handle_read_resource(&req).await)
            },
        }
    }

    /// Handle initialization request.
    async fn handle_initialize(&self, init_req: &InitializeRequest) -> Result<InitializeResult> {
        *self.initialized.write().await = true;

        let negotiated_version =
            if crate::SUPPORTED_PROTOCOL_VERSIONS.contains(&init_req.protocol_version.as_str()) {
                init_req.protocol_version.clone()
            } else {
                crate::DEFAULT_PROTOCOL_VERSION.to_string()
            };

        debug!(
            client = %init_req.client_info.name,
            version = %negotiated_version,
            "client initialized"
        );

        Ok(InitializeResult {
            protocol_version: ProtocolVersion(negotiated_version),
            capabilities: self.capabilities.clone(),
            server_info: self.info.clone(),
            instructions: None,
        })
    }

    /// Handle list tools request.
    fn handle_list_tools(&self, _req: &ListRequest) -> Result<ListToolsResult> {
        let tools = self
            .tools
            .iter()
            .map(|(name, handler)| {
                // Use tool metadata if provided, otherwise use defaults
                if let Some(mut info) = handler.metadata() {
                    info.name.clone_from(name);
                    info
                } else {
                    ToolInfo::new(name.clone(), None, serde_json::json!({"type": "object"}))
                }
            })
            .collect();

        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    /// Handle call tool request.
    ///
    /// A failing tool is still a successful JSON-RPC response: the error text
    /// is returned as content with `isError` set.
    async fn handle_call_tool(&self, req: CallToolRequest) -> Result<CallToolResult> {
        let handler = self.tools.get(&req.name).ok_or_else(|| {
            Error::protocol(
                ErrorCode::INVALID_PARAMS,
                format!("Tool '{}' not found", req.name),
            )
        })?;

        match handler.handle(req.arguments).await {
            Ok(Value::String(text)) => Ok(CallToolResult::text(text)),
            Ok(value) => Ok(CallToolResult::text(serde_json::to_string_pretty(&value)?)),
            Err(e) => {
                error!(tool = %req.name, "tool failed: {}", e);
                Ok(CallToolResult::error_text(e.to_string()))
            },
        }
    }

    /// Handle list resources request.
    async fn handle_list_resources(&self, req: &ListRequest) -> Result<ListResourcesResult> {
        match &self.resources {
            Some(handler) => handler.list(req.cursor.clone()).await,
            None => Ok(ListResourcesResult::default()),
        }
    }

    /// Handle list resource templates request.
    async fn handle_list_resource_templates(&self) -> Result<ListResourceTemplatesResult> {
        match &self.resources {
            Some(handler) => handler.templates().await,
            None => Ok(ListResourceTemplatesResult::default()),
        }
    }

    /// Handle read resource request.
    async fn handle_read_resource(&self, req: &ReadResourceRequest) -> Result<ReadResourceResult> {
        let handler = self.resources.as_ref().ok_or_else(|| {
            Error::protocol(
                ErrorCode::RESOURCE_NOT_FOUND,
                format!("Resource handler not available for '{}'", req.uri),
            )
        })?;
        handler.read(&req.uri).await
    }

    fn respond<R: Serialize>(id: RequestId, result: Result<R>) -> JSONRPCResponse {
        match result.and_then(|r| serde_json::to_value(r).map_err(Error::from)) {
            Ok(value) => Self::success_response(id, value),
            Err(e) => Self::error_response(id, e.code(), e.to_string()),
        }
    }

    /// Create an error response.
    fn error_response(id: RequestId, code: ErrorCode, message: String) -> JSONRPCResponse {
        JSONRPCResponse::error(id, code, message)
    }

    /// Create a success response.
    fn success_response(id: RequestId, result: Value) -> JSONRPCResponse {
        JSONRPCResponse::success(id, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientCapabilities;
    use crate::types::ResponsePayload;
    use async_trait::async_trait;
    use serde_json::json;

    struct TestTool;

    #[async_trait]
    impl ToolHandler for TestTool {
        async fn handle(&self, _args: Value) -> Result<Value> {
            Ok(json!({"result": "success"}))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ToolHandler for FailingTool {
        async fn handle(&self, _args: Value) -> Result<Value> {
            Err(Error::remote("service unavailable"))
        }
    }

    fn server(stateless_mode: bool) -> ServerCore {
        let mut tools: BTreeMap<String, Arc<dyn ToolHandler>> = BTreeMap::new();
        tools.insert("test-tool".to_string(), Arc::new(TestTool));
        tools.insert("failing-tool".to_string(), Arc::new(FailingTool));

        ServerCore::new(
            Implementation {
                name: "test-server".to_string(),
                version: "1.0.0".to_string(),
            },
            ServerCapabilities::tools_only(),
            tools,
            None,
            stateless_mode,
        )
    }

    fn init_request() -> ClientRequest {
        ClientRequest::Initialize(InitializeRequest {
            protocol_version: crate::DEFAULT_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "test-client".to_string(),
                version: "1.0.0".to_string(),
            },
        })
    }

    fn call(name: &str) -> ClientRequest {
        ClientRequest::CallTool(CallToolRequest {
            name: name.to_string(),
            arguments: json!({}),
        })
    }

    #[tokio::test]
    async fn test_server_core_initialization() {
        let server = server(false);
        assert!(!server.is_initialized().await);

        let response = server
            .handle_request(RequestId::from(1i64), init_request())
            .await;

        match response.payload {
            ResponsePayload::Result(result) => {
                assert!(server.is_initialized().await);
                assert_eq!(result["protocolVersion"], crate::DEFAULT_PROTOCOL_VERSION);
                assert_eq!(result["serverInfo"]["name"], "test-server");
            },
            ResponsePayload::Error(e) => panic!("Initialization failed: {}", e.message),
        }
    }

    #[tokio::test]
    async fn unknown_protocol_version_falls_back_to_default() {
        let server = server(false);
        let response = server
            .handle_request(
                RequestId::from(1i64),
                ClientRequest::Initialize(InitializeRequest {
                    protocol_version: "1999-01-01".to_string(),
                    capabilities: ClientCapabilities::default(),
                    client_info: Implementation {
                        name: "old-client".to_string(),
                        version: "0.1.0".to_string(),
                    },
                }),
            )
            .await;

        let result = response.result().expect("initialize result");
        assert_eq!(result["protocolVersion"], crate::DEFAULT_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_server_core_list_tools() {
        let server = server(false);
        server
            .handle_request(RequestId::from(1i64), init_request())
            .await;

        let response = server
            .handle_request(
                RequestId::from(2i64),
                ClientRequest::ListTools(ListRequest::default()),
            )
            .await;

        match response.payload {
            ResponsePayload::Result(result) => {
                let tools_result: ListToolsResult = serde_json::from_value(result).unwrap();
                let names: Vec<_> = tools_result.tools.iter().map(|t| t.name.as_str()).collect();
                assert_eq!(names, vec!["failing-tool", "test-tool"]);
            },
            ResponsePayload::Error(e) => panic!("List tools failed: {}", e.message),
        }
    }

    #[tokio::test]
    async fn test_stateless_mode_allows_requests_without_init() {
        let server = server(true);

        let response = server
            .handle_request(
                RequestId::from(1i64),
                ClientRequest::ListTools(ListRequest::default()),
            )
            .await;

        assert!(
            response.result().is_some(),
            "List tools should succeed in stateless mode without init"
        );
    }

    #[tokio::test]
    async fn test_normal_mode_requires_initialization() {
        let server = server(false);

        let response = server
            .handle_request(
                RequestId::from(1i64),
                ClientRequest::ListTools(ListRequest::default()),
            )
            .await;

        match response.payload {
            ResponsePayload::Result(_) => {
                panic!("List tools should fail in normal mode without initialization")
            },
            ResponsePayload::Error(e) => {
                assert_eq!(e.code, -32002);
                assert!(e.message.contains("not initialized"));
            },
        }
    }

    #[tokio::test]
    async fn ping_is_allowed_before_initialize() {
        let server = server(false);
        let response = server
            .handle_request(RequestId::from(7i64), ClientRequest::Ping)
            .await;
        assert_eq!(response.result(), Some(&json!({})));
    }

    #[tokio::test]
    async fn tool_failure_is_reported_as_error_content() {
        let server = server(true);

        let response = server
            .handle_request(RequestId::from(1i64), call("failing-tool"))
            .await;

        let result: CallToolResult =
            serde_json::from_value(response.result().cloned().unwrap()).unwrap();
        assert!(result.is_error);
        assert!(result.joined_text().contains("service unavailable"));
    }

    #[tokio::test]
    async fn tool_success_is_pretty_printed_json() {
        let server = server(true);

        let response = server
            .handle_request(RequestId::from(1i64), call("test-tool"))
            .await;

        let result: CallToolResult =
            serde_json::from_value(response.result().cloned().unwrap()).unwrap();
        assert!(!result.is_error);
        let text = result.joined_text();
        assert!(text.contains('\n'));
        assert_eq!(
            serde_json::from_str::<Value>(&text).unwrap(),
            json!({"result": "success"})
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_a_protocol_error() {
        let server = server(true);

        let response = server
            .handle_request(RequestId::from(1i64), call("missing"))
            .await;

        let error = response.error_object().expect("error response");
        assert_eq!(error.code, ErrorCode::INVALID_PARAMS.0);
        assert!(error.message.contains("missing"));
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let server = server(true);
        let response = server
            .handle_jsonrpc(JSONRPCRequest::new(
                RequestId::from("a"),
                "prompts/list",
                None,
            ))
            .await;

        assert_eq!(response.id, RequestId::from("a"));
        assert_eq!(
            response.error_object().map(|e| e.code),
            Some(ErrorCode::METHOD_NOT_FOUND.0)
        );
    }

    #[tokio::test]
    async fn resources_without_handler_are_empty() {
        let server = server(true);
        let response = server
            .handle_request(
                RequestId::from(1i64),
                ClientRequest::ListResources(ListRequest::default()),
            )
            .await;
        assert_eq!(response.result(), Some(&json!({"resources": []})));
    }
}
