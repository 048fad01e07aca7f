//! # nova-canvas-mcp
//!
//! An MCP server exposing Amazon Nova Canvas image generation as tools.
//!
//! Every tool shares one lifecycle: validate parameters into a
//! [`canvas::task::TaskRequest`], invoke the model through
//! [`canvas::invoker::Invoker`], persist the returned bytes with
//! [`canvas::storage::ImageStore`] and report where the image landed.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nova_canvas_mcp::canvas::{self, Canvas, ImageCache, ImageStore, Invoker, NoopOpener};
//! use nova_canvas_mcp::server::ServerCoreBuilder;
//! # use nova_canvas_mcp::canvas::ModelClient;
//! # async fn example(client: Arc<dyn ModelClient>) -> nova_canvas_mcp::Result<()> {
//! let store = Arc::new(ImageStore::new(
//!     "images",
//!     Arc::new(ImageCache::new()),
//!     Arc::new(NoopOpener),
//! ));
//! let canvas = Arc::new(Canvas::new(Invoker::new(client), store.clone()));
//! let builder = ServerCoreBuilder::new().name("nova-canvas").version("0.1.0");
//! let core = canvas::register(builder, canvas, store).build()?;
//! # let _ = core;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod canvas;
pub mod config;
pub mod error;
pub mod server;
pub mod shared;
pub mod types;

pub use error::{Error, Result};

/// Protocol version used when the client asks for one we do not speak.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

/// Protocol versions accepted during `initialize`.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];
