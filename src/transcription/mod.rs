/*!
 * Speech-to-text engines.
 *
 * This module contains the engines the pipeline can transcribe audio with:
 * - `whisper_cli`: the openai-whisper command line tool, run as an external process
 * - `openai`: the OpenAI-compatible `/audio/transcriptions` HTTP API
 * - `mock`: a static engine returning a fixed transcript
 */

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::app_config::{TranscriptionConfig, TranscriptionEngineKind};
use crate::errors::TranscriptionError;
use crate::media::{ProcessOutput, ProcessRunner};
use crate::transcript::TranscriptionResult;

pub mod mock;
pub mod openai;
pub mod whisper_cli;

pub use mock::StaticEngine;
pub use openai::OpenAiEngine;
pub use whisper_cli::WhisperCliEngine;

/// Common trait for all transcription engines
///
/// An engine receives an audio file and returns segments of timestamped
/// words in chronological order. It is called exactly once per run.
/// Engines that launch external processes push each captured output onto
/// `invocations`, whether the process succeeded or not.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Transcribe the audio file with word-level timestamps
    async fn transcribe(
        &self,
        audio: &Path,
        invocations: &mut Vec<ProcessOutput>,
        cancel: &CancellationToken,
    ) -> Result<TranscriptionResult, TranscriptionError>;
}

/// Create the engine selected by the configuration
pub fn engine_from_config(
    config: &TranscriptionConfig,
    runner: Arc<dyn ProcessRunner>,
) -> Result<Arc<dyn TranscriptionEngine>, TranscriptionError> {
    let engine: Arc<dyn TranscriptionEngine> = match config.engine {
        TranscriptionEngineKind::WhisperCli => Arc::new(WhisperCliEngine::new(
            runner,
            config.whisper_path.clone(),
            config.get_model(),
            config.engine_language(),
            config.device.clone(),
        )),
        TranscriptionEngineKind::OpenAI => Arc::new(OpenAiEngine::new(
            config.endpoint.clone(),
            config.get_api_key(),
            config.get_model(),
            config.engine_language(),
            config.timeout_secs,
        )?),
    };
    Ok(engine)
}
