/*!
 * Error types for the wordcap application.
 *
 * This module contains custom error types for the different parts of the
 * captioning pipeline, using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;

use thiserror::Error;

use crate::media::ffmpeg::filter_ffmpeg_stderr;
use crate::pipeline::StageFailure;

/// Errors raised while turning word timings into caption entries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptionError {
    /// A negative time cannot be expressed in the subtitle format
    #[error("negative time value: {0}s")]
    NegativeTime(f64),

    /// NaN or infinite time value
    #[error("non-finite time value: {0}")]
    NonFiniteTime(f64),

    /// A word ends before it starts
    #[error("word '{text}' starts at {start}s but ends at {end}s")]
    InvertedRange {
        /// Literal word text
        text: String,
        /// Word start in seconds
        start: f64,
        /// Word end in seconds
        end: f64,
    },
}

/// Errors that can occur while talking to a speech-to-text engine
#[derive(Error, Debug)]
pub enum TranscriptionError {
    /// The engine process could not be launched
    #[error("Failed to launch transcription engine: {0}")]
    Launch(String),

    /// The engine process exited unsuccessfully
    #[error("Transcription engine exited with {}: {}", status_label(.status), stderr_tail(.stderr))]
    EngineFailed {
        /// Exit code, `None` when terminated by a signal
        status: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// The engine output could not be understood
    #[error("Failed to parse transcription output: {0}")]
    ParseError(String),

    /// Reading or writing engine artifacts failed
    #[error("Transcription file error: {0}")]
    File(String),

    /// The operator cancelled the run while the engine was working
    #[error("Transcription cancelled")]
    Cancelled,
}

/// Main pipeline error type
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid command line arguments or configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The input video does not exist
    #[error("Input video does not exist: {0:?}")]
    InputMissing(PathBuf),

    /// An external media tool failed
    #[error("{tool} exited with {}: {}", status_label(.status), filter_ffmpeg_stderr(.stderr))]
    ExternalTool {
        /// Tool name as invoked
        tool: String,
        /// Exit code, `None` when it never ran or was killed by a signal
        status: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// The speech-to-text engine failed
    #[error("Transcription error: {0}")]
    Transcription(#[from] TranscriptionError),

    /// Word timing that cannot be turned into a valid caption
    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(#[from] CaptionError),

    /// A stage reported success but its artifact is missing or empty
    #[error("Expected artifact is missing or empty: {0:?}")]
    MissingArtifact(PathBuf),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// The run was cancelled by the operator
    #[error("Run cancelled")]
    Cancelled,
}

/// Errors answering an HTTP upload
#[derive(Error, Debug)]
pub enum UploadError {
    /// The request is not multipart/form-data or has no boundary
    #[error("Expected a multipart/form-data request")]
    NotMultipart,

    /// The multipart body could not be read
    #[error("Malformed upload: {0}")]
    Multipart(#[from] multer::Error),

    /// No non-empty `video` field in the form
    #[error("No video file uploaded")]
    NoVideo,

    /// The upload went over the configured size limit
    #[error("Upload exceeds the {0} byte limit")]
    TooLarge(u64),

    /// Unknown route
    #[error("Not found")]
    NotFound,

    /// Known route, wrong method
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The server stopped before the upload could be processed
    #[error("Server is shutting down")]
    ShuttingDown,

    /// The pipeline could not be started
    #[error("Failed to process video: {0}")]
    Pipeline(#[from] PipelineError),

    /// The pipeline ran and stopped at a stage
    #[error("Failed to process video: {0}")]
    Failed(StageFailure),

    /// Storing the upload or reading the result failed
    #[error("File error: {0}")]
    File(String),
}

impl From<std::io::Error> for UploadError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<std::io::Error> for TranscriptionError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

/// Lines of engine stderr kept in error messages
const STDERR_TAIL_LINES: usize = 20;

// @returns: The last lines of raw stderr; Python tracebacks end with the cause
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

fn status_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}
