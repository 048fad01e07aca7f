//! Generated images as MCP resources under `image://{image_id}`.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::storage::ImageStore;
use crate::error::{Error, Result};
use crate::server::ResourceHandler;
use crate::types::protocol::Cursor;
use crate::types::{
    ListResourceTemplatesResult, ListResourcesResult, ReadResourceResult, ResourceContents,
    ResourceInfo, ResourceTemplate,
};

/// URI scheme prefix of image resources.
pub const IMAGE_SCHEME: &str = "image://";

const IMAGE_MIME_TYPE: &str = "image/png";

/// Resource handler serving images held by an [`ImageStore`].
#[derive(Debug, Clone)]
pub struct ImageResources {
    store: Arc<ImageStore>,
}

impl ImageResources {
    /// Serve images from `store`.
    pub fn new(store: Arc<ImageStore>) -> Self {
        Self { store }
    }
}

/// `image://<id>` locator for an image identifier.
pub fn image_uri(id: &str) -> String {
    format!("{}{}", IMAGE_SCHEME, id)
}

#[async_trait]
impl ResourceHandler for ImageResources {
    async fn list(&self, _cursor: Cursor) -> Result<ListResourcesResult> {
        let resources = self
            .store
            .cache()
            .ids()
            .into_iter()
            .map(|id| ResourceInfo {
                uri: image_uri(&id),
                description: Some(format!("Generated image {}", id)),
                name: id,
                mime_type: Some(IMAGE_MIME_TYPE.to_string()),
            })
            .collect();

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    async fn templates(&self) -> Result<ListResourceTemplatesResult> {
        Ok(ListResourceTemplatesResult {
            resource_templates: vec![ResourceTemplate {
                uri_template: format!("{}{{image_id}}", IMAGE_SCHEME),
                name: "generated-image".to_string(),
                description: Some("A generated image, by identifier".to_string()),
                mime_type: Some(IMAGE_MIME_TYPE.to_string()),
            }],
            next_cursor: None,
        })
    }

    async fn read(&self, uri: &str) -> Result<ReadResourceResult> {
        let id = uri
            .strip_prefix(IMAGE_SCHEME)
            .ok_or_else(|| Error::ArtifactNotFound(uri.to_string()))?;
        let bytes = self.store.load(id).await?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some(IMAGE_MIME_TYPE.to_string()),
                text: None,
                blob: Some(STANDARD.encode(&*bytes)),
            }],
        })
    }
}
