/*!
 * Static transcription engine.
 *
 * Returns a fixed transcript (or a fixed failure) without touching the audio,
 * which lets the pipeline run end to end without a speech model installed.
 */

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::TranscriptionError;
use crate::media::ProcessOutput;
use crate::transcript::TranscriptionResult;
use crate::transcription::TranscriptionEngine;

/// Engine returning a predetermined result
#[derive(Debug)]
pub struct StaticEngine {
    /// Transcript to return, or the failure message
    outcome: Result<TranscriptionResult, String>,
    /// Number of transcribe calls so far
    calls: AtomicUsize,
}

impl StaticEngine {
    /// Engine that always returns `result`
    pub fn new(result: TranscriptionResult) -> Self {
        Self {
            outcome: Ok(result),
            calls: AtomicUsize::new(0),
        }
    }

    /// Engine that always fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times the engine was asked to transcribe
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionEngine for StaticEngine {
    fn name(&self) -> &str {
        "static"
    }

    async fn transcribe(
        &self,
        _audio: &Path,
        _invocations: &mut Vec<ProcessOutput>,
        cancel: &CancellationToken,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(TranscriptionError::Cancelled);
        }
        match &self.outcome {
            Ok(result) => Ok(result.clone()),
            Err(message) => Err(TranscriptionError::Launch(message.clone())),
        }
    }
}
