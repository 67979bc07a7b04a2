/*!
 * Tests for the HTTP upload front end with fake tools
 */

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use hyper::header::{self, HeaderValue};
use hyper::{Body, Method, Request, Response, StatusCode};
use tokio_util::sync::CancellationToken;

use wordcap::app_config::Config;
use wordcap::app_controller::Controller;
use wordcap::diagnostics::MemorySink;
use wordcap::server::{self, DOWNLOAD_NAME, UploadService};
use wordcap::transcription::StaticEngine;

use crate::common::{self, FakeBehavior, FakeProcessRunner};

const BOUNDARY: &str = "wordcap-test-boundary";
const CAPTIONED_PAYLOAD: &[u8] = b"fake captioned video payload";

fn service(config: Config, runner: &Arc<FakeProcessRunner>) -> Result<UploadService> {
    common::init_test_logger();
    Ok(UploadService::new(
        Controller::with_config(config)?,
        runner.clone(),
        Arc::new(StaticEngine::new(common::hello_transcript())),
        Arc::new(MemorySink::new()),
    ))
}

fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: video/mp4\r\n\r\n",
        BOUNDARY, field, file_name
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(response: Response<Body>) -> Result<String> {
    let bytes = hyper::body::to_bytes(response.into_body()).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn entries(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_upload_withVideo_shouldReturnCaptionedVideoAndCleanUp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let work_root = temp_dir.path().join("runs");
    let runner = Arc::new(FakeProcessRunner::new());
    let service = service(common::test_config(&work_root), &runner)?;

    let request = upload_request(multipart_body("video", "talk.mov", b"not really a video"));
    let response = service.handle(request, &CancellationToken::new()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers().get(header::CONTENT_DISPOSITION).cloned();
    assert!(disposition.is_some_and(|d| d.to_str().unwrap_or_default().contains(DOWNLOAD_NAME)));
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("*"))
    );
    let bytes = hyper::body::to_bytes(response.into_body()).await?;
    assert_eq!(&bytes[..], CAPTIONED_PAYLOAD);

    // extract and burn-in ran on the stored upload, keeping its extension
    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].args[1].ends_with("video.mov"));
    assert!(calls[1].args.last().is_some_and(|out| out.ends_with("output-video.mov")));

    // upload, output and intermediates are gone
    assert_eq!(entries(&work_root), 0);
    Ok(())
}

#[tokio::test]
async fn test_upload_withoutVideoField_shouldRejectWithoutRunning() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let work_root = temp_dir.path().join("runs");
    let runner = Arc::new(FakeProcessRunner::new());
    let service = service(common::test_config(&work_root), &runner)?;

    let request = upload_request(multipart_body("attachment", "talk.mp4", b"data"));
    let response = service.handle(request, &CancellationToken::new()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await?, r#"{"error":"No video file uploaded"}"#);
    assert!(runner.calls().is_empty());
    assert_eq!(entries(&work_root), 0);
    Ok(())
}

#[tokio::test]
async fn test_upload_withEmptyVideo_shouldReject() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let runner = Arc::new(FakeProcessRunner::new());
    let service = service(common::test_config(temp_dir.path()), &runner)?;

    let request = upload_request(multipart_body("video", "talk.mp4", b""));
    let response = service.handle(request, &CancellationToken::new()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(runner.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_upload_withoutMultipartContentType_shouldReject() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let runner = Arc::new(FakeProcessRunner::new());
    let service = service(common::test_config(temp_dir.path()), &runner)?;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = service.handle(request, &CancellationToken::new()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await?.contains("multipart/form-data"));
    Ok(())
}

#[tokio::test]
async fn test_upload_overSizeLimit_shouldReturnPayloadTooLarge() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let work_root = temp_dir.path().join("runs");
    let mut config = common::test_config(&work_root);
    config.server.max_upload_mb = 1;
    let runner = Arc::new(FakeProcessRunner::new());
    let service = service(config, &runner)?;

    let oversized = vec![0u8; 1024 * 1024 + 1];
    let response = service
        .handle(upload_request(multipart_body("video", "big.mp4", &oversized)), &CancellationToken::new())
        .await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(runner.calls().is_empty());
    assert_eq!(entries(&work_root), 0);
    Ok(())
}

#[tokio::test]
async fn test_upload_withPipelineFailure_shouldHideDetailsAndCleanUp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let work_root = temp_dir.path().join("runs");
    let runner = Arc::new(FakeProcessRunner::new().with_extract(FakeBehavior::Fail(1)));
    let service = service(common::test_config(&work_root), &runner)?;

    let request = upload_request(multipart_body("video", "talk.mp4", b"not really a video"));
    let response = service.handle(request, &CancellationToken::new()).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await?, r#"{"error":"Failed to process video"}"#);
    assert_eq!(entries(&work_root), 0);
    Ok(())
}

#[tokio::test]
async fn test_upload_withCancelledServer_shouldBeUnavailable() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let runner = Arc::new(FakeProcessRunner::new());
    let service = service(common::test_config(temp_dir.path()), &runner)?;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let request = upload_request(multipart_body("video", "talk.mp4", b"not really a video"));
    let response = service.handle(request, &cancel).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(runner.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_routes_shouldAnswerPreflightAndRejectUnknown() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let runner = Arc::new(FakeProcessRunner::new());
    let service = service(common::test_config(temp_dir.path()), &runner)?;
    let cancel = CancellationToken::new();

    let preflight = Request::builder().method(Method::OPTIONS).uri("/upload").body(Body::empty())?;
    let response = service.handle(preflight, &cancel).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));

    let wrong_method = Request::builder().method(Method::GET).uri("/upload").body(Body::empty())?;
    assert_eq!(service.handle(wrong_method, &cancel).await.status(), StatusCode::METHOD_NOT_ALLOWED);

    let unknown = Request::builder().method(Method::POST).uri("/nowhere").body(Body::empty())?;
    let response = service.handle(unknown, &cancel).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    Ok(())
}

#[tokio::test]
async fn test_serve_overTcp_shouldCaptionUploadAndStopOnCancel() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path());
    config.server.port = 0;
    let runner = Arc::new(FakeProcessRunner::new());
    let service = Arc::new(service(config.clone(), &runner)?);

    let listener = server::bind(&config.server).await?;
    let address = listener.local_addr()?;
    let cancel = CancellationToken::new();
    let server_task = tokio::spawn(server::serve(service, listener, cancel.clone()));

    let part = reqwest::multipart::Part::bytes(b"not really a video".to_vec()).file_name("talk.mp4");
    let form = reqwest::multipart::Form::new().part("video", part);
    let response = reqwest::Client::new()
        .post(format!("http://{}/upload", address))
        .multipart(form)
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(&response.bytes().await?[..], CAPTIONED_PAYLOAD);

    cancel.cancel();
    server_task.await??;
    Ok(())
}
