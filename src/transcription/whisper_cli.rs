use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::TranscriptionError;
use crate::media::{ProcessError, ProcessOutput, ProcessRunner, ProcessSpec};
use crate::transcript::TranscriptionResult;
use crate::transcription::TranscriptionEngine;

/// Engine that shells out to the openai-whisper CLI
pub struct WhisperCliEngine {
    /// Process runner used to launch whisper
    runner: Arc<dyn ProcessRunner>,
    /// Path or name of the whisper executable
    binary: String,
    /// Model name (tiny, base, small, medium, large...)
    model: String,
    /// Forced language, auto-detected when absent
    language: Option<String>,
    /// Torch device (cpu, cuda)
    device: Option<String>,
}

impl WhisperCliEngine {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        binary: impl Into<String>,
        model: impl Into<String>,
        language: Option<String>,
        device: Option<String>,
    ) -> Self {
        Self {
            runner,
            binary: binary.into(),
            model: model.into(),
            language,
            device,
        }
    }

    /// Directory whisper writes its JSON into: next to the audio file
    fn output_dir(audio: &Path) -> PathBuf {
        match audio.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Whisper names its output after the audio file stem
    pub fn json_output_path(audio: &Path) -> PathBuf {
        let stem = audio.file_stem().unwrap_or_default().to_string_lossy();
        Self::output_dir(audio).join(format!("{}.json", stem))
    }

    pub fn build_spec(&self, audio: &Path) -> ProcessSpec {
        let mut args = vec![
            audio.to_string_lossy().into_owned(),
            "--model".to_string(),
            self.model.clone(),
            "--word_timestamps".to_string(),
            "True".to_string(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            Self::output_dir(audio).to_string_lossy().into_owned(),
            "--verbose".to_string(),
            "False".to_string(),
        ];
        if let Some(language) = &self.language {
            args.push("--language".to_string());
            args.push(language.clone());
        }
        if let Some(device) = &self.device {
            args.push("--device".to_string());
            args.push(device.clone());
        }
        ProcessSpec::new(self.binary.clone(), args)
    }
}

#[async_trait]
impl TranscriptionEngine for WhisperCliEngine {
    fn name(&self) -> &str {
        "whisper-cli"
    }

    async fn transcribe(
        &self,
        audio: &Path,
        invocations: &mut Vec<ProcessOutput>,
        cancel: &CancellationToken,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let spec = self.build_spec(audio);

        let output = self.runner.run(&spec, cancel).await.map_err(|e| match e {
            ProcessError::Cancelled { .. } => TranscriptionError::Cancelled,
            ProcessError::Launch { message, .. } => TranscriptionError::Launch(message),
        })?;
        invocations.push(output.clone());

        if !output.success() {
            return Err(TranscriptionError::EngineFailed {
                status: output.status,
                stderr: output.stderr,
            });
        }

        let json_path = Self::json_output_path(audio);
        let content = tokio::fs::read_to_string(&json_path).await.map_err(|e| {
            TranscriptionError::File(format!("Failed to read whisper output {:?}: {}", json_path, e))
        })?;

        TranscriptionResult::from_whisper_json(&content)
            .map_err(|e| TranscriptionError::ParseError(e.to_string()))
    }
}
