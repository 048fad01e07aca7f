use std::sync::Arc;

use clap::Parser;
use nova_canvas_mcp::canvas::{
    self, BedrockClient, BrowserOpener, Canvas, ImageCache, ImageStore, Invoker, NoopOpener,
    Opener,
};
use nova_canvas_mcp::config::{Config, TransportKind};
use nova_canvas_mcp::server::{self, ServerCoreBuilder};
use nova_canvas_mcp::shared::StdioTransport;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries protocol traffic in stdio mode, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = Config::parse();

    let sdk_config = config.aws_sdk_config().await?;
    let client = BedrockClient::new(&sdk_config, config.model_id.clone());
    info!(
        model = client.model_id(),
        region = %config.region,
        images_dir = %config.images_dir.display(),
        "starting nova-canvas-mcp"
    );
    let invoker = Invoker::new(Arc::new(client)).with_timeout(config.invoke_timeout());

    let opener: Arc<dyn Opener> = if config.no_open {
        Arc::new(NoopOpener)
    } else {
        Arc::new(BrowserOpener)
    };
    let store = Arc::new(ImageStore::new(
        config.images_dir.clone(),
        Arc::new(ImageCache::new()),
        opener,
    ));
    let canvas = Arc::new(Canvas::new(invoker, Arc::clone(&store)));

    let builder = ServerCoreBuilder::new()
        .name("nova-canvas-mcp")
        .version(env!("CARGO_PKG_VERSION"))
        .stateless_mode(config.transport == TransportKind::Http);
    let core = Arc::new(canvas::register(builder, canvas, store).build()?);

    match config.transport {
        TransportKind::Stdio => server::serve(core, Arc::new(StdioTransport::new())).await?,
        TransportKind::Http => server::http::serve_http(core, config.port).await?,
    }

    Ok(())
}
