//! Protocol-level tests: handshake, tool listing, resources and both
//! transports, with the canvas tools registered over a stub model.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use nova_canvas_mcp::canvas::{
    self, Canvas, ImageCache, ImageStore, Invoker, ModelClient, NoopOpener,
};
use nova_canvas_mcp::error::Result;
use nova_canvas_mcp::server::{self, http, ServerCore, ServerCoreBuilder};
use nova_canvas_mcp::shared::StdioTransport;
use nova_canvas_mcp::types::{ErrorCode, JSONRPCRequest, JSONRPCResponse, RequestId};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

struct OneImage;

#[async_trait]
impl ModelClient for OneImage {
    async fn invoke_model(&self, _body: Vec<u8>) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&json!({"images": [STANDARD.encode(b"png")]})).unwrap())
    }
}

struct SlowImage;

#[async_trait]
impl ModelClient for SlowImage {
    async fn invoke_model(&self, _body: Vec<u8>) -> Result<Vec<u8>> {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        OneImage.invoke_model(Vec::new()).await
    }
}

fn core(dir: &std::path::Path, stateless: bool) -> Arc<ServerCore> {
    core_with(dir, stateless, Arc::new(OneImage))
}

fn core_with(dir: &std::path::Path, stateless: bool, model: Arc<dyn ModelClient>) -> Arc<ServerCore> {
    let store = Arc::new(ImageStore::new(
        dir,
        Arc::new(ImageCache::new()),
        Arc::new(NoopOpener),
    ));
    let canvas = Arc::new(Canvas::new(Invoker::new(model), store.clone()));
    let builder = ServerCoreBuilder::new()
        .name("nova-canvas-mcp")
        .version("1.2.3")
        .stateless_mode(stateless);
    Arc::new(canvas::register(builder, canvas, store).build().unwrap())
}

fn request(id: i64, method: &str, params: Value) -> JSONRPCRequest {
    JSONRPCRequest::new(RequestId::from(id), method, Some(params))
}

fn initialize(id: i64) -> JSONRPCRequest {
    request(
        id,
        "initialize",
        json!({
            "protocolVersion": "2025-06-18",
            "capabilities": {},
            "clientInfo": {"name": "test-client", "version": "1.0.0"}
        }),
    )
}

#[tokio::test]
async fn initialize_advertises_tools_and_resources() {
    let tmp = tempfile::tempdir().unwrap();
    let core = core(tmp.path(), false);

    let response = core.handle_jsonrpc(initialize(1)).await;
    let result = response.result().unwrap();

    assert_eq!(result["protocolVersion"], "2025-06-18");
    assert_eq!(result["serverInfo"]["name"], "nova-canvas-mcp");
    assert_eq!(result["serverInfo"]["version"], "1.2.3");
    assert!(result["capabilities"]["tools"].is_object());
    assert!(result["capabilities"]["resources"].is_object());
}

#[tokio::test]
async fn lists_the_seven_tools_with_schemas() {
    let tmp = tempfile::tempdir().unwrap();
    let core = core(tmp.path(), false);
    core.handle_jsonrpc(initialize(1)).await;

    let response = core.handle_jsonrpc(request(2, "tools/list", json!({}))).await;
    let tools = response.result().unwrap()["tools"].as_array().unwrap().clone();

    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            "background_removal",
            "color_guided_generation",
            "image_conditioning",
            "image_variation",
            "inpainting",
            "outpainting",
            "text_to_image",
        ]
    );

    let text_to_image = tools.iter().find(|t| t["name"] == "text_to_image").unwrap();
    let schema = &text_to_image["inputSchema"];
    assert_eq!(schema["type"], "object");
    assert!(schema.get("$schema").is_none());
    let required: Vec<&str> = schema["required"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(required.contains(&"prompt"));
    assert!(required.contains(&"output_path"));
    assert!(!required.contains(&"seed"));

    let outpainting = tools.iter().find(|t| t["name"] == "outpainting").unwrap();
    let mode = &outpainting["inputSchema"]["properties"]["outpainting_mode"];
    assert!(mode.to_string().contains("PRECISE"), "{mode}");
}

#[tokio::test]
async fn tools_require_initialize_in_stateful_mode() {
    let tmp = tempfile::tempdir().unwrap();
    let core = core(tmp.path(), false);

    let response = core.handle_jsonrpc(request(1, "tools/list", json!({}))).await;
    assert_eq!(
        response.error_object().unwrap().code,
        ErrorCode::NOT_INITIALIZED.0
    );
}

#[tokio::test]
async fn generated_image_is_readable_as_resource() {
    let tmp = tempfile::tempdir().unwrap();
    let core = core(tmp.path(), true);
    let out = tmp.path().join("fox.png");

    let response = core
        .handle_jsonrpc(request(
            1,
            "tools/call",
            json!({
                "name": "text_to_image",
                "arguments": {"prompt": "fox", "output_path": out, "open_browser": false}
            }),
        ))
        .await;
    let text = response.result().unwrap()["content"][0]["text"]
        .as_str()
        .unwrap()
        .to_string();
    let outcome: Value = serde_json::from_str(&text).unwrap();
    let uri = format!("image://{}", outcome["image_id"].as_str().unwrap());

    let listed = core
        .handle_jsonrpc(request(2, "resources/list", json!({})))
        .await;
    assert_eq!(listed.result().unwrap()["resources"][0]["uri"], uri.as_str());

    let read = core
        .handle_jsonrpc(request(3, "resources/read", json!({"uri": uri})))
        .await;
    let contents = &read.result().unwrap()["contents"][0];
    assert_eq!(contents["mimeType"], "image/png");
    assert_eq!(contents["blob"], STANDARD.encode(b"png"));

    let missing = core
        .handle_jsonrpc(request(4, "resources/read", json!({"uri": "image://nope"})))
        .await;
    assert_eq!(
        missing.error_object().unwrap().code,
        ErrorCode::RESOURCE_NOT_FOUND.0
    );
}

#[tokio::test]
async fn unknown_tool_is_invalid_params() {
    let tmp = tempfile::tempdir().unwrap();
    let core = core(tmp.path(), true);

    let response = core
        .handle_jsonrpc(request(
            1,
            "tools/call",
            json!({"name": "show_image", "arguments": {}}),
        ))
        .await;
    let error = response.error_object().unwrap();
    assert_eq!(error.code, ErrorCode::INVALID_PARAMS.0);
    assert!(error.message.contains("show_image"));
}

#[tokio::test]
async fn stdio_loop_answers_every_request() {
    let tmp = tempfile::tempdir().unwrap();
    // Requests run concurrently, so tools/list must not depend on initialize.
    let core = core(tmp.path(), true);

    let (mut client_writer, server_reader) = tokio::io::duplex(64 * 1024);
    let (server_writer, mut client_reader) = tokio::io::duplex(64 * 1024);
    let transport = Arc::new(StdioTransport::with_io(server_reader, server_writer));
    let server = tokio::spawn(server::serve(core, transport));

    let mut input = String::new();
    for line in [
        serde_json::to_string(&initialize(1)).unwrap(),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
        "this is not json".to_string(),
        String::new(),
        serde_json::to_string(&request(2, "ping", json!({}))).unwrap(),
        serde_json::to_string(&request(3, "tools/list", json!({}))).unwrap(),
    ] {
        input.push_str(&line);
        input.push('\n');
    }
    client_writer.write_all(input.as_bytes()).await.unwrap();
    drop(client_writer);

    server.await.unwrap().unwrap();

    let mut output = String::new();
    client_reader.read_to_string(&mut output).await.unwrap();
    let responses: Vec<JSONRPCResponse> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(responses.len(), 4);
    let parse_error = responses
        .iter()
        .find(|r| r.id == RequestId::Null)
        .unwrap();
    assert_eq!(
        parse_error.error_object().unwrap().code,
        ErrorCode::PARSE_ERROR.0
    );

    let mut answered: Vec<RequestId> = responses
        .iter()
        .filter(|r| r.result().is_some())
        .map(|r| r.id.clone())
        .collect();
    answered.sort_by_key(|id| id.to_string());
    assert_eq!(
        answered,
        vec![RequestId::from(1), RequestId::from(2), RequestId::from(3)]
    );
}

#[tokio::test]
async fn stdio_answers_requests_still_running_at_input_eof() {
    let tmp = tempfile::tempdir().unwrap();
    let core = core_with(tmp.path(), true, Arc::new(SlowImage));
    let out = tmp.path().join("late.png");

    let (mut client_writer, server_reader) = tokio::io::duplex(64 * 1024);
    let (server_writer, mut client_reader) = tokio::io::duplex(64 * 1024);
    let transport = Arc::new(StdioTransport::with_io(server_reader, server_writer));
    let server = tokio::spawn(server::serve(core, transport));

    let call = request(
        5,
        "tools/call",
        json!({
            "name": "text_to_image",
            "arguments": {"prompt": "fox", "output_path": out, "open_browser": false}
        }),
    );
    let mut line = serde_json::to_string(&call).unwrap();
    line.push('\n');
    client_writer.write_all(line.as_bytes()).await.unwrap();
    drop(client_writer);

    server.await.unwrap().unwrap();

    let mut output = String::new();
    client_reader.read_to_string(&mut output).await.unwrap();
    let responses: Vec<JSONRPCResponse> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].id, RequestId::from(5));
    let result = responses[0].result().unwrap();
    assert_eq!(result["isError"], false);
    assert!(out.exists());
}

async fn post(core: Arc<ServerCore>, body: String) -> (StatusCode, Option<Value>) {
    let response = http::router(core)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = (!bytes.is_empty()).then(|| serde_json::from_slice(&bytes).unwrap());
    (status, value)
}

#[tokio::test]
async fn http_endpoint_is_stateless() {
    let tmp = tempfile::tempdir().unwrap();
    let core = core(tmp.path(), true);

    let (status, body) = post(
        core.clone(),
        serde_json::to_string(&request(7, "tools/list", json!({}))).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["id"], 7);
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 7);

    let (status, body) = post(
        core.clone(),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body.is_none());

    let (status, body) = post(core, "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.unwrap()["error"]["code"], -32700);
}
