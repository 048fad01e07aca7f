//! MCP server: handler traits, request routing and transport loops.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result, TransportError};
use crate::shared::transport::{Transport, TransportMessage};
use crate::types::protocol::Cursor;
use crate::types::{
    ErrorCode, JSONRPCResponse, ListResourceTemplatesResult, ListResourcesResult,
    ReadResourceResult, RequestId, ToolInfo,
};

pub mod builder;
pub mod core;
pub mod http;
pub mod typed_tool;

pub use builder::ServerCoreBuilder;
pub use core::ServerCore;
pub use typed_tool::TypedTool;

/// Handler for tool execution.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Handle a tool call with the given arguments.
    async fn handle(&self, args: Value) -> Result<Value>;

    /// Get tool metadata including description and schema.
    /// Returns None by default for backward compatibility.
    fn metadata(&self) -> Option<ToolInfo> {
        None
    }
}

/// Handler for resource listing and reading.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// List concrete resources.
    async fn list(&self, cursor: Cursor) -> Result<ListResourcesResult>;

    /// List URI templates. Empty unless overridden.
    async fn templates(&self) -> Result<ListResourceTemplatesResult> {
        Ok(ListResourceTemplatesResult::default())
    }

    /// Read a resource by URI.
    async fn read(&self, uri: &str) -> Result<ReadResourceResult>;
}

/// Serve `core` over a message transport until the peer disconnects.
///
/// Each request runs on its own task and its response is sent as soon as it
/// completes, so slow generations do not block `ping` or listing requests.
/// Requests still in flight when the input closes are allowed to finish.
pub async fn serve<T>(core: Arc<ServerCore>, transport: Arc<T>) -> Result<()>
where
    T: Transport + 'static,
{
    info!(transport = transport.transport_type(), "MCP server ready");
    let mut in_flight = JoinSet::new();

    loop {
        while in_flight.try_join_next().is_some() {}

        let message = match transport.receive().await {
            Ok(message) => message,
            Err(Error::Transport(TransportError::ConnectionClosed)) => {
                debug!("transport closed by peer");
                break;
            },
            Err(Error::Transport(TransportError::InvalidMessage(reason))) => {
                warn!(%reason, "discarding unparseable message");
                let response =
                    JSONRPCResponse::error(RequestId::Null, ErrorCode::PARSE_ERROR, reason);
                transport.send(TransportMessage::Response(response)).await?;
                continue;
            },
            Err(e) => return Err(e),
        };

        match message {
            TransportMessage::Request(request) => {
                let core = Arc::clone(&core);
                let transport = Arc::clone(&transport);
                in_flight.spawn(async move {
                    let response = core.handle_jsonrpc(request).await;
                    if let Err(e) = transport.send(TransportMessage::Response(response)).await {
                        error!("failed to send response: {}", e);
                    }
                });
            },
            TransportMessage::Notification(notification) => {
                core.handle_notification(&notification);
            },
            TransportMessage::Response(response) => {
                debug!(id = %response.id, "ignoring response from client");
            },
        }
    }

    while in_flight.join_next().await.is_some() {}
    transport.close().await
}
