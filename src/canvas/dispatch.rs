//! The request lifecycle shared by every canvas tool.
//!
//! `Validating → ReadingInputs → Invoking → Saving → Succeeded`, where any
//! step may end in failure. Validation happens when the tool arguments are
//! decoded (see [`crate::server::TypedTool`]); [`Canvas::run`] drives the rest.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use tracing::debug;

use super::invoker::Invoker;
use super::storage::ImageStore;
use super::task::TaskRequest;
use crate::error::{Error, Result};

/// Read a local image and base64-encode it.
pub async fn encode_image(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| Error::InputRead {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(STANDARD.encode(bytes))
}

/// Encode several images in order, stopping at the first unreadable one.
pub async fn encode_images(paths: &[PathBuf]) -> Result<Vec<String>> {
    let mut encoded = Vec::with_capacity(paths.len());
    for path in paths {
        encoded.push(encode_image(path).await?);
    }
    Ok(encoded)
}

/// A validated tool invocation that can be turned into a [`TaskRequest`].
#[async_trait]
pub trait CanvasTool: Send + Sized + 'static {
    /// Registered tool name.
    const NAME: &'static str;

    /// Tool description shown to clients.
    const DESCRIPTION: &'static str;

    /// First sentence of the success message.
    const SUCCESS_MESSAGE: &'static str;

    /// Where the generated image should be written.
    fn output_path(&self) -> &Path;

    /// Whether to open the image in the default viewer after saving.
    fn open_after_save(&self) -> bool;

    /// Read referenced input images and assemble the request.
    async fn into_request(self) -> Result<TaskRequest>;
}

/// Result of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOutcome {
    /// Identifier of the saved image
    pub image_id: String,
    /// Absolute path of the saved image
    pub image_path: String,
    /// `file://` locator
    pub uri: String,
    /// Human readable summary
    pub message: String,
}

/// Runs canvas tools: inputs, model call, storage.
#[derive(Debug)]
pub struct Canvas {
    invoker: Invoker,
    store: Arc<ImageStore>,
}

impl Canvas {
    /// Create a canvas from its invocation and storage layers.
    pub fn new(invoker: Invoker, store: Arc<ImageStore>) -> Self {
        Self { invoker, store }
    }

    /// Run one validated tool invocation to completion.
    pub async fn run<T: CanvasTool>(&self, tool: T) -> Result<GenerationOutcome> {
        let output_path = tool.output_path().to_path_buf();
        let open_after_save = tool.open_after_save();

        debug!(tool = T::NAME, "reading inputs");
        let request = tool.into_request().await?;

        debug!(tool = T::NAME, task = %request.kind(), "invoking");
        let image = self.invoker.invoke(&request).await?;

        debug!(tool = T::NAME, "saving");
        let record = self
            .store
            .save(image, Some(&output_path), open_after_save)
            .await?;

        debug!(tool = T::NAME, id = %record.id, "succeeded");
        let image_path = record.path.display().to_string();
        Ok(GenerationOutcome {
            message: format!("{} Saved location: {}", T::SUCCESS_MESSAGE, image_path),
            image_id: record.id,
            image_path,
            uri: record.uri,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encode_image_reads_and_encodes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("in.png");
        std::fs::write(&path, b"hello").unwrap();

        assert_eq!(encode_image(&path).await.unwrap(), "aGVsbG8=");
    }

    #[tokio::test]
    async fn encode_images_stops_at_first_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let present = tmp.path().join("a.png");
        let missing = tmp.path().join("b.png");
        std::fs::write(&present, b"a").unwrap();

        let err = encode_images(&[present, missing.clone()])
            .await
            .unwrap_err();
        match err {
            Error::InputRead { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }
}
