//! MCP protocol types.

pub mod capabilities;
pub mod jsonrpc;
pub mod protocol;

pub use capabilities::{ClientCapabilities, ResourceCapabilities, ServerCapabilities, ToolCapabilities};
pub use jsonrpc::{
    ErrorCode, JSONRPCError, JSONRPCNotification, JSONRPCRequest, JSONRPCResponse,
    RequestId, ResponsePayload,
};
pub use protocol::{
    CallToolRequest, CallToolResult, ClientNotification, ClientRequest, Content, Implementation,
    InitializeRequest, InitializeResult, ListRequest, ListResourceTemplatesResult,
    ListResourcesResult, ListToolsResult, ProtocolVersion, ReadResourceRequest,
    ReadResourceResult, ResourceContents, ResourceInfo, ResourceTemplate, ToolAnnotations,
    ToolInfo,
};
