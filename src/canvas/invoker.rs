//! Model invocation.
//!
//! [`Invoker`] serializes a [`TaskRequest`], hands the body to a
//! [`ModelClient`] and decodes the provider response into image bytes. The
//! client trait is the seam between the lifecycle and Bedrock; tests plug in
//! a stub.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::task::TaskRequest;
use crate::error::{Error, Result};

/// Response fields that may carry base64 image data, in lookup order.
pub const IMAGE_FIELDS: &[&str] = &["images", "image"];

/// Opaque remote model: a JSON request body in, a JSON response body out.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Invoke the model with a serialized request body.
    async fn invoke_model(&self, body: Vec<u8>) -> Result<Vec<u8>>;
}

/// [`ModelClient`] backed by Bedrock Runtime `InvokeModel`.
#[derive(Debug, Clone)]
pub struct BedrockClient {
    client: Client,
    model_id: String,
}

impl BedrockClient {
    /// Create a client for `model_id` from a resolved SDK configuration.
    pub fn new(config: &aws_config::SdkConfig, model_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(config),
            model_id: model_id.into(),
        }
    }

    /// Model identifier this client invokes.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[async_trait]
impl ModelClient for BedrockClient {
    async fn invoke_model(&self, body: Vec<u8>) -> Result<Vec<u8>> {
        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| Error::remote(DisplayErrorContext(&e).to_string()))?;

        Ok(output.body.into_inner())
    }
}

/// Runs task requests against a [`ModelClient`].
#[derive(Clone)]
pub struct Invoker {
    client: Arc<dyn ModelClient>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Invoker {
    /// Create an invoker with no timeout.
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Bound each remote call; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Invoke the model and return the first generated image.
    ///
    /// No retries: remote and decoding failures are returned as they occur.
    pub async fn invoke(&self, request: &TaskRequest) -> Result<Vec<u8>> {
        let body = request.to_body()?;
        debug!(task = %request.kind(), body_bytes = body.len(), "invoking model");

        let call = self.client.invoke_model(body);
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                Error::remote(format!("timed out after {}s", limit.as_secs_f64()))
            })??,
            None => call.await?,
        };

        let image = decode_response(&response)?;
        info!(task = %request.kind(), image_bytes = image.len(), "model returned an image");
        Ok(image)
    }
}

/// Decode a provider response body into the bytes of its first image.
///
/// A non-null `error` field is a remote failure. Extra images are dropped
/// with a warning.
pub fn decode_response(body: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(body)
        .map_err(|e| Error::malformed(format!("response is not UTF-8: {}", e)))?;
    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::malformed(format!("response is not JSON: {}", e)))?;

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(Error::remote(format!("Image generation error: {}", message)));
    }

    for field in IMAGE_FIELDS {
        let encoded = match value.get(field) {
            Some(Value::Array(items)) => {
                if items.len() > 1 {
                    warn!(
                        returned = items.len(),
                        "model returned several images; keeping the first"
                    );
                }
                items.first().and_then(Value::as_str)
            },
            Some(Value::String(single)) => Some(single.as_str()),
            _ => None,
        };

        if let Some(encoded) = encoded {
            return STANDARD
                .decode(encoded)
                .map_err(|e| Error::malformed(format!("field '{}' is not base64: {}", field, e)));
        }
    }

    Err(Error::malformed(format!(
        "expected a base64 image under one of: {}",
        IMAGE_FIELDS.join(", ")
    )))
}
