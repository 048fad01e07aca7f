//! Standard I/O transport implementation.
//!
//! This transport uses stdin/stdout for communication with newline-delimited
//! JSON-RPC messages as per the MCP specification.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::error::{Result, TransportError};
use crate::shared::transport::{Transport, TransportMessage};
use crate::types::{JSONRPCNotification, JSONRPCRequest, JSONRPCResponse};

/// stdio transport for MCP communication.
///
/// Messages are written to stdout and read from stdin, one JSON document per
/// line. The reader and writer are generic so the same framing can run over
/// in-memory pipes.
#[derive(Debug)]
pub struct StdioTransport<R = tokio::io::Stdin, W = tokio::io::Stdout> {
    reader: Mutex<BufReader<R>>,
    writer: Mutex<W>,
    // Input EOF and closing are separate: responses to requests still in
    // flight are written after the peer stops sending.
    input_closed: AtomicBool,
    closed: AtomicBool,
}

impl StdioTransport {
    /// Create a transport over the process stdin/stdout.
    pub fn new() -> Self {
        Self::with_io(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a transport over arbitrary async reader/writer halves.
    pub fn with_io(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(writer),
            input_closed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Write message to the writer with newline delimiter.
    async fn write_message(&self, json_bytes: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(json_bytes)
            .await
            .map_err(TransportError::from)?;
        writer.write_all(b"\n").await.map_err(TransportError::from)?;
        writer.flush().await.map_err(TransportError::from)?;
        Ok(())
    }

    /// Read the next non-empty line.
    async fn read_line(&self) -> Result<String> {
        let mut reader = self.reader.lock().await;
        loop {
            let mut line = String::new();
            let bytes_read = reader
                .read_line(&mut line)
                .await
                .map_err(TransportError::from)?;

            if bytes_read == 0 {
                self.input_closed.store(true, Ordering::Release);
                return Err(TransportError::ConnectionClosed.into());
            }

            let line = line.trim_end_matches('\n').trim_end_matches('\r');
            if !line.is_empty() {
                return Ok(line.to_string());
            }
        }
    }
}

/// Serialize transport message to JSON bytes.
pub fn serialize_message(message: &TransportMessage) -> Result<Vec<u8>> {
    let bytes = match message {
        TransportMessage::Request(request) => serde_json::to_vec(request),
        TransportMessage::Notification(notification) => serde_json::to_vec(notification),
        TransportMessage::Response(response) => serde_json::to_vec(response),
    };
    bytes.map_err(|e| {
        TransportError::InvalidMessage(format!("Failed to serialize message: {}", e)).into()
    })
}

/// Parse JSON message and determine its type.
pub fn parse_message(buffer: &[u8]) -> Result<TransportMessage> {
    let json_value: serde_json::Value = serde_json::from_slice(buffer)
        .map_err(|e| TransportError::InvalidMessage(format!("Invalid JSON: {}", e)))?;

    if json_value.get("method").is_some() {
        if json_value.get("id").is_some() {
            let request: JSONRPCRequest = serde_json::from_value(json_value).map_err(|e| {
                TransportError::InvalidMessage(format!("Invalid request: {}", e))
            })?;
            Ok(TransportMessage::Request(request))
        } else {
            let notification: JSONRPCNotification = serde_json::from_value(json_value)
                .map_err(|e| {
                    TransportError::InvalidMessage(format!("Invalid notification: {}", e))
                })?;
            Ok(TransportMessage::Notification(notification))
        }
    } else if json_value.get("result").is_some() || json_value.get("error").is_some() {
        let response: JSONRPCResponse = serde_json::from_value(json_value)
            .map_err(|e| TransportError::InvalidMessage(format!("Invalid response: {}", e)))?;
        Ok(TransportMessage::Response(response))
    } else {
        Err(TransportError::InvalidMessage("Unknown message type".to_string()).into())
    }
}

#[async_trait]
impl<R, W> Transport for StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, message: TransportMessage) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::ConnectionClosed.into());
        }

        let json_bytes = serialize_message(&message)?;
        self.write_message(&json_bytes).await
    }

    async fn receive(&self) -> Result<TransportMessage> {
        if self.closed.load(Ordering::Acquire) || self.input_closed.load(Ordering::Acquire) {
            return Err(TransportError::ConnectionClosed.into());
        }

        let line = self.read_line().await?;
        parse_message(line.as_bytes())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        let mut writer = self.writer.lock().await;
        writer.flush().await.map_err(TransportError::from)?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn transport_type(&self) -> &'static str {
        "stdio"
    }
}
