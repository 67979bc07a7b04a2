/*!
 * HTTP upload front end.
 *
 * `POST /upload` takes a multipart form whose `video` field carries the
 * file, runs the captioning pipeline on it and answers with the captioned
 * video as an attachment named `captioned_video.mp4`. The upload, the output
 * and the run intermediates are removed before the response is sent.
 *
 * Every response carries `Access-Control-Allow-Origin: *` and `OPTIONS`
 * requests are answered as CORS preflights, so a browser page on another
 * origin can post to the server directly. Errors are JSON `{"error": ...}`.
 */

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hyper::header::{self, HeaderValue};
use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::{Body, Method, Request, Response, StatusCode};
use log::{debug, error, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::app_config::ServerConfig;
use crate::app_controller::Controller;
use crate::diagnostics::{DiagnosticsSink, LogSink};
use crate::errors::{PipelineError, UploadError};
use crate::file_utils::{FileManager, FileType};
use crate::media::{ProcessRunner, TokioProcessRunner};
use crate::pipeline::RunOutcome;
use crate::transcription::{TranscriptionEngine, engine_from_config};

/// Route accepting uploads
pub const UPLOAD_ROUTE: &str = "/upload";

/// Form field holding the video
pub const UPLOAD_FIELD: &str = "video";

/// File name offered to the client for the captioned video
pub const DOWNLOAD_NAME: &str = "captioned_video.mp4";

/// Extension used when the uploaded file name has no usable one
const DEFAULT_EXTENSION: &str = "mp4";

/// Handles upload requests with a shared set of pipeline collaborators
pub struct UploadService {
    controller: Controller,
    runner: Arc<dyn ProcessRunner>,
    engine: Arc<dyn TranscriptionEngine>,
    sink: Arc<dyn DiagnosticsSink>,
    // @field: Limits how many pipeline runs execute at once
    run_slots: Semaphore,
    max_upload_bytes: u64,
}

impl UploadService {
    pub fn new(
        controller: Controller,
        runner: Arc<dyn ProcessRunner>,
        engine: Arc<dyn TranscriptionEngine>,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        let server = &controller.config().server;
        let run_slots = Semaphore::new(server.max_concurrent_runs);
        let max_upload_bytes = server.max_upload_bytes();
        Self {
            controller,
            runner,
            engine,
            sink,
            run_slots,
            max_upload_bytes,
        }
    }

    /// Service with real ffmpeg, the configured engine and log output
    pub fn from_controller(controller: Controller) -> Result<Self, PipelineError> {
        let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner);
        let engine = engine_from_config(&controller.config().transcription, runner.clone())?;
        Ok(Self::new(controller, runner, engine, Arc::new(LogSink)))
    }

    /// Answer one request; never fails at the HTTP level
    pub async fn handle(&self, request: Request<Body>, cancel: &CancellationToken) -> Response<Body> {
        debug!("{} {}", request.method(), request.uri().path());

        let mut response = match (request.method(), request.uri().path()) {
            (&Method::OPTIONS, _) => preflight_response(),
            (&Method::POST, UPLOAD_ROUTE) => {
                info!("Received video upload request");
                match self.caption_upload(request, cancel).await {
                    Ok(video) => {
                        info!("Video processing complete, sending {} bytes", video.len());
                        video_response(video)
                    }
                    Err(e) => {
                        if status_for(&e).is_server_error() {
                            error!("Upload failed: {}", e);
                        } else {
                            warn!("Upload rejected: {}", e);
                        }
                        error_response(&e)
                    }
                }
            }
            (_, UPLOAD_ROUTE) => error_response(&UploadError::MethodNotAllowed),
            _ => error_response(&UploadError::NotFound),
        };

        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        response
    }

    async fn caption_upload(&self, request: Request<Body>, cancel: &CancellationToken) -> Result<Vec<u8>, UploadError> {
        let boundary = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|content_type| multer::parse_boundary(content_type).ok())
            .ok_or(UploadError::NotMultipart)?;

        let work_root = self.controller.config().work_root();
        FileManager::ensure_dir(&work_root).map_err(|e| UploadError::File(format!("{:#}", e)))?;
        let upload_dir = tempfile::Builder::new().prefix("wordcap-upload-").tempdir_in(&work_root)?;

        let mut multipart = multer::Multipart::new(request.into_body(), boundary);
        let input = self
            .store_video(&mut multipart, upload_dir.path())
            .await?
            .ok_or(UploadError::NoVideo)?;
        let output = output_path_for(&input);

        let _slot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UploadError::ShuttingDown),
            slot = self.run_slots.acquire() => slot.map_err(|_| UploadError::ShuttingDown)?,
        };
        debug!("Processing video: {:?} -> {:?}", input, output);

        let outcome = self
            .controller
            .run_with(
                input,
                output.clone(),
                self.runner.clone(),
                self.engine.clone(),
                self.sink.clone(),
                cancel.child_token(),
            )
            .await?;
        if let RunOutcome::Failed { failure, .. } = outcome {
            return Err(UploadError::Failed(failure));
        }

        let video = tokio::fs::read(&output).await?;
        if let Err(e) = upload_dir.close() {
            warn!("Failed to remove upload directory: {}", e);
        }
        Ok(video)
    }

    // @returns: Path of the stored video, None when the form has no video field
    async fn store_video(
        &self,
        multipart: &mut multer::Multipart<'_>,
        dir: &Path,
    ) -> Result<Option<PathBuf>, UploadError> {
        while let Some(mut field) = multipart.next_field().await? {
            if field.name() != Some(UPLOAD_FIELD) {
                debug!("Ignoring form field {:?}", field.name());
                continue;
            }

            let extension = upload_extension(field.file_name());
            let path = dir.join(format!("video.{}", extension));
            let mut file = tokio::fs::File::create(&path).await?;

            let mut received: u64 = 0;
            while let Some(chunk) = field.chunk().await? {
                received += chunk.len() as u64;
                if received > self.max_upload_bytes {
                    return Err(UploadError::TooLarge(self.max_upload_bytes));
                }
                file.write_all(&chunk).await?;
            }
            file.flush().await?;

            if received == 0 {
                return Err(UploadError::NoVideo);
            }
            debug!("Stored upload {:?} ({} bytes)", path, received);
            return Ok(Some(path));
        }
        Ok(None)
    }
}

/// Bind the listener described by the configuration
pub async fn bind(config: &ServerConfig) -> std::io::Result<TcpListener> {
    TcpListener::bind((config.host.as_str(), config.port)).await
}

/// Accept connections until `cancel` fires
///
/// Each connection is served on its own task. Cancelling also cancels the
/// pipeline runs of in-flight uploads.
pub async fn serve(service: Arc<UploadService>, listener: TcpListener, cancel: CancellationToken) -> std::io::Result<()> {
    info!("Server running on http://{}", listener.local_addr()?);

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = cancel.cancelled() => break,
        };
        let (stream, peer) = match accepted {
            Ok(connection) => connection,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };
        debug!("Incoming connection from {}", peer);

        let service = Arc::clone(&service);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let handler = service_fn(move |request| {
                let service = Arc::clone(&service);
                let cancel = cancel.clone();
                async move { Ok::<_, Infallible>(service.handle(request, &cancel).await) }
            });
            if let Err(e) = Http::new().http1_only(true).serve_connection(stream, handler).await {
                debug!("Connection with {} ended: {}", peer, e);
            }
        });
    }

    info!("Upload server stopped");
    Ok(())
}

/// Keep the uploaded extension when it names a video container
fn upload_extension(file_name: Option<&str>) -> String {
    file_name
        .map(Path::new)
        .filter(|path| FileManager::detect_file_type(path) == FileType::Video)
        .and_then(|path| path.extension())
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn output_path_for(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("video.{}", DEFAULT_EXTENSION));
    input.with_file_name(format!("output-{}", name))
}

// @returns: HTTP status matching an upload error
pub fn status_for(error: &UploadError) -> StatusCode {
    match error {
        UploadError::NotMultipart | UploadError::Multipart(_) | UploadError::NoVideo => StatusCode::BAD_REQUEST,
        UploadError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::NotFound => StatusCode::NOT_FOUND,
        UploadError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        UploadError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        UploadError::Failed(failure) if failure.is_cancelled() => StatusCode::SERVICE_UNAVAILABLE,
        UploadError::Pipeline(_) | UploadError::Failed(_) | UploadError::File(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: &UploadError) -> Response<Body> {
    let status = status_for(error);
    // Server-side details stay in the log
    let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
        "Failed to process video".to_string()
    } else {
        error.to_string()
    };
    let body = serde_json::json!({ "error": message }).to_string();

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn video_response(video: Vec<u8>) -> Response<Body> {
    let mut response = Response::new(Body::from(video));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", DOWNLOAD_NAME))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    response
}

fn preflight_response() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("POST, OPTIONS"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    response
}
