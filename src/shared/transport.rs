//! Transport abstraction.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{JSONRPCNotification, JSONRPCRequest, JSONRPCResponse};

/// A decoded message travelling over a transport.
#[derive(Debug, Clone)]
pub enum TransportMessage {
    /// Request expecting a response
    Request(JSONRPCRequest),
    /// One-way notification
    Notification(JSONRPCNotification),
    /// Response to an earlier request
    Response(JSONRPCResponse),
}

/// Bidirectional message transport.
///
/// Methods take `&self` so a single transport can be shared between the
/// reader loop and the tasks answering requests; implementations serialize
/// access internally.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message.
    async fn send(&self, message: TransportMessage) -> Result<()>;

    /// Receive the next message.
    async fn receive(&self) -> Result<TransportMessage>;

    /// Close the transport.
    async fn close(&self) -> Result<()>;

    /// Whether the transport is still usable.
    fn is_connected(&self) -> bool;

    /// Short transport name for logging.
    fn transport_type(&self) -> &'static str;
}
