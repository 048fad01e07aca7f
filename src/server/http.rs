//! Stateless HTTP endpoint.
//!
//! Every `POST /mcp` carries one JSON-RPC message. Requests are answered in
//! the response body; notifications get `202 Accepted` with no body.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::server::core::ServerCore;
use crate::shared::stdio::parse_message;
use crate::shared::transport::TransportMessage;
use crate::types::{ErrorCode, JSONRPCResponse, RequestId};

/// Build the router serving `POST /mcp`.
pub fn router(core: Arc<ServerCore>) -> Router {
    Router::new()
        .route("/mcp", post(handle_post))
        .with_state(core)
}

/// Bind `127.0.0.1:<port>` and serve until Ctrl+C.
pub async fn serve_http(core: Arc<ServerCore>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(TransportError::from)?;

    info!("MCP HTTP endpoint listening on http://{}/mcp", addr);

    axum::serve(listener, router(core))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(TransportError::from)?;

    Ok(())
}

async fn handle_post(State(core): State<Arc<ServerCore>>, body: Bytes) -> Response {
    match parse_message(&body) {
        Ok(TransportMessage::Request(request)) => {
            Json(core.handle_jsonrpc(request).await).into_response()
        },
        Ok(TransportMessage::Notification(notification)) => {
            core.handle_notification(&notification);
            StatusCode::ACCEPTED.into_response()
        },
        Ok(TransportMessage::Response(response)) => {
            debug!(id = %response.id, "ignoring response from client");
            StatusCode::ACCEPTED.into_response()
        },
        Err(e) => {
            warn!("rejecting HTTP message: {}", e);
            let response =
                JSONRPCResponse::error(RequestId::Null, ErrorCode::PARSE_ERROR, e.to_string());
            (StatusCode::BAD_REQUEST, Json(response)).into_response()
        },
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down HTTP endpoint");
}
