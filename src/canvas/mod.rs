//! Nova Canvas image tools.
//!
//! [`task`] models the provider request body, [`invoker`] calls the model,
//! [`storage`] persists results, [`dispatch`] ties them into one lifecycle
//! and [`tools`] exposes the seven tools on an MCP server.

use std::sync::Arc;

use crate::server::ServerCoreBuilder;

pub mod dispatch;
pub mod invoker;
pub mod resources;
pub mod storage;
pub mod task;
pub mod tools;

pub use dispatch::{Canvas, CanvasTool, GenerationOutcome};
pub use invoker::{BedrockClient, Invoker, ModelClient};
pub use resources::ImageResources;
pub use storage::{BrowserOpener, ImageCache, ImageRecord, ImageStore, NoopOpener, Opener};

/// Register the canvas tools and the `image://` resources on `builder`.
pub fn register(
    builder: ServerCoreBuilder,
    canvas: Arc<Canvas>,
    store: Arc<ImageStore>,
) -> ServerCoreBuilder {
    tools::register_tools(builder, &canvas).resources(ImageResources::new(store))
}
