/*!
 * # wordcap - word-level captions burned into video
 *
 * A Rust library that turns a video into a captioned copy of itself, one
 * spoken word at a time.
 *
 * ## Features
 *
 * - Extract the audio track with ffmpeg
 * - Transcribe it with word-level timestamps using:
 *   - the openai-whisper command line tool
 *   - an OpenAI-compatible `/audio/transcriptions` API
 * - Render one ASS dialogue line per word
 * - Burn the captions into the video with ffmpeg
 * - Cancellation at any stage, structured run diagnostics
 * - An HTTP upload endpoint returning the captioned video
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `transcript`: Segments and timestamped words returned by engines
 * - `captions`: Timestamp formatting, caption building and ASS rendering
 * - `transcription`: Speech-to-text engines
 * - `media`: External process execution and ffmpeg argument building
 * - `pipeline`: Run state machine and orchestrator
 * - `diagnostics`: Structured run events and their sinks
 * - `app_controller`: Main application controller
 * - `server`: HTTP upload front end (`POST /upload`)
 * - `cli`: Command line parsing and config loading
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![cfg_attr(test, allow(non_snake_case))]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod captions;
pub mod cli;
pub mod diagnostics;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod media;
pub mod pipeline;
pub mod server;
pub mod transcript;
pub mod transcription;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use captions::{CaptionBuilder, CaptionEntry, SubtitleDocument, TimingPolicy, format_ass_timestamp};
pub use errors::{CaptionError, PipelineError, TranscriptionError, UploadError};
pub use pipeline::{CaptionPipeline, PipelineRun, RunOutcome, RunState, Stage};
pub use transcript::{Segment, TranscriptionResult, Word};
