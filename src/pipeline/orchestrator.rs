/*!
 * Pipeline orchestrator for a single captioning run.
 *
 * The orchestrator drives a `PipelineRun` through its states:
 * 1. Audio extraction: ffmpeg demuxes the audio track into the run directory
 * 2. Transcription: the engine returns timestamped words
 * 3. Rendering: word timings become an ASS document on disk
 * 4. Muxing: ffmpeg burns the document into the output video
 *
 * Cancellation is checked before every transition and any failure stops the
 * run at the stage it happened in. Every external invocation is recorded.
 */

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::captions::{CaptionBuilder, SubtitleDocument, TimingPolicy};
use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink, RunWarning};
use crate::errors::{PipelineError, TranscriptionError};
use crate::file_utils::FileManager;
use crate::media::{AudioExtractArgs, BurnInArgs, ProcessError, ProcessOutput, ProcessRunner, ProcessSpec};
use crate::transcript::TranscriptionResult;
use crate::transcription::TranscriptionEngine;

use super::state::{PipelineRun, RunOutcome, RunState, Stage, StageFailure};

/// Settings the orchestrator needs besides its collaborators
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Path or name of the ffmpeg executable
    pub ffmpeg_path: String,
    /// How malformed word timing is handled while rendering
    pub timing_policy: TimingPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            timing_policy: TimingPolicy::default(),
        }
    }
}

impl PipelineOptions {
    /// Set the ffmpeg executable
    pub fn with_ffmpeg_path(mut self, ffmpeg_path: impl Into<String>) -> Self {
        self.ffmpeg_path = ffmpeg_path.into();
        self
    }

    /// Set the timing policy
    pub fn with_timing_policy(mut self, timing_policy: TimingPolicy) -> Self {
        self.timing_policy = timing_policy;
        self
    }
}

/// Runs the extract, transcribe, render and mux stages in order
pub struct CaptionPipeline {
    runner: Arc<dyn ProcessRunner>,
    engine: Arc<dyn TranscriptionEngine>,
    sink: Arc<dyn DiagnosticsSink>,
    options: PipelineOptions,
}

impl CaptionPipeline {
    /// Create a new pipeline from its collaborators
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        engine: Arc<dyn TranscriptionEngine>,
        sink: Arc<dyn DiagnosticsSink>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            runner,
            engine,
            sink,
            options,
        }
    }

    /// Drive the run to a terminal state
    pub async fn run(&self, mut run: PipelineRun, cancel: &CancellationToken) -> RunOutcome {
        let started = Instant::now();
        self.sink.record(&DiagnosticEvent::Note(format!(
            "Input video: {:?}, size: {} bytes",
            run.input_path, run.stats.input_bytes
        )));
        self.sink.record(&DiagnosticEvent::Note(format!(
            "Transcribing with {}",
            self.engine.name()
        )));

        let result = self.drive(&mut run, cancel).await;
        run.stats.elapsed = started.elapsed();

        match result {
            Ok(()) => {
                run.state = RunState::Done;
                self.sink.record(&DiagnosticEvent::Finished {
                    output_bytes: run.stats.output_bytes,
                    elapsed: run.stats.elapsed,
                });
                RunOutcome::Done(run)
            }
            Err(failure) => {
                run.state = RunState::Failed(failure.stage);
                self.sink.record(&DiagnosticEvent::Failed {
                    stage: failure.stage,
                    reason: failure.error.to_string(),
                });
                RunOutcome::Failed { run, failure }
            }
        }
    }

    async fn drive(&self, run: &mut PipelineRun, cancel: &CancellationToken) -> Result<(), StageFailure> {
        let mut transcript = TranscriptionResult::default();

        while let Some(stage) = run.state.next_stage() {
            // Muxed only needs the output verified, it is not a new stage.
            // A cancel landing here is too late: the output is already written.
            if run.state == RunState::Muxed {
                let size = FileManager::non_empty_file_size(&run.output_path)
                    .ok_or_else(|| StageFailure::new(stage, PipelineError::MissingArtifact(run.output_path.clone())))?;
                run.stats.output_bytes = size;
                return Ok(());
            }

            if cancel.is_cancelled() {
                return Err(StageFailure::new(stage, PipelineError::Cancelled));
            }

            self.sink.record(&DiagnosticEvent::StageStarted(stage));
            let stage_started = Instant::now();

            let step = match stage {
                Stage::AudioExtract => self.extract_audio(run, cancel).await,
                Stage::Transcribe => match self.transcribe(run, cancel).await {
                    Ok((result, detail)) => {
                        transcript = result;
                        Ok(detail)
                    }
                    Err(e) => Err(e),
                },
                Stage::Render => self.render(run, &transcript),
                Stage::Mux => self.mux(run, cancel).await,
            };
            let detail = step.map_err(|e| StageFailure::new(stage, e))?;

            run.state = match stage {
                Stage::AudioExtract => RunState::AudioExtracted,
                Stage::Transcribe => RunState::Transcribed,
                Stage::Render => RunState::CaptionsRendered,
                Stage::Mux => RunState::Muxed,
            };
            self.sink.record(&DiagnosticEvent::StageCompleted {
                stage,
                detail,
                elapsed: stage_started.elapsed(),
            });
        }

        Ok(())
    }

    async fn extract_audio(&self, run: &mut PipelineRun, cancel: &CancellationToken) -> Result<String, PipelineError> {
        let spec = AudioExtractArgs::new(&run.input_path, &run.audio_path).to_spec(&self.options.ffmpeg_path);
        self.invoke(run, Stage::AudioExtract, &spec, cancel).await?;

        let size = FileManager::non_empty_file_size(&run.audio_path)
            .ok_or_else(|| PipelineError::MissingArtifact(run.audio_path.clone()))?;
        run.stats.audio_bytes = size;

        Ok(format!("Audio extracted: {:?}, size: {} bytes", run.audio_path, size))
    }

    async fn transcribe(
        &self,
        run: &mut PipelineRun,
        cancel: &CancellationToken,
    ) -> Result<(TranscriptionResult, String), PipelineError> {
        let mut invocations = Vec::new();
        let result = self.engine.transcribe(&run.audio_path, &mut invocations, cancel).await;
        for output in invocations {
            self.record_tool_output(run, Stage::Transcribe, output);
        }
        let result = result.map_err(|e| match e {
            TranscriptionError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Transcription(other),
        })?;

        run.stats.segments = result.segments.len();
        run.stats.words = result.word_count();
        if result.segments.is_empty() {
            self.warn(run, RunWarning::NoSpeechDetected);
        }

        let detail = format!(
            "Transcription complete: {} segments, {} words",
            run.stats.segments, run.stats.words
        );
        Ok((result, detail))
    }

    fn render(&self, run: &mut PipelineRun, transcript: &TranscriptionResult) -> Result<String, PipelineError> {
        let build = CaptionBuilder::new(self.options.timing_policy).build(transcript)?;
        for warning in build.warnings {
            self.warn(run, warning);
        }
        run.stats.captions = build.stats;

        let document = SubtitleDocument::render(&build.entries);
        run.stats.subtitle_bytes = document
            .write_to(&run.subtitle_path)
            .map_err(|e| PipelineError::File(format!("{:#}", e)))?;

        Ok(format!(
            "ASS subtitle file created: {:?}, {} entries",
            run.subtitle_path,
            document.dialogue_count()
        ))
    }

    async fn mux(&self, run: &mut PipelineRun, cancel: &CancellationToken) -> Result<String, PipelineError> {
        let spec = BurnInArgs::new(&run.input_path, &run.subtitle_path, &run.output_path)
            .to_spec(&self.options.ffmpeg_path);
        self.invoke(run, Stage::Mux, &spec, cancel).await?;

        Ok(format!("Captions burned into {:?}", run.output_path))
    }

    // @returns: Output of a successful invocation; anything else is an ExternalTool error
    async fn invoke(
        &self,
        run: &mut PipelineRun,
        stage: Stage,
        spec: &ProcessSpec,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, PipelineError> {
        let output = self.runner.run(spec, cancel).await.map_err(|e| match e {
            ProcessError::Cancelled { .. } => PipelineError::Cancelled,
            ProcessError::Launch { program, message } => PipelineError::ExternalTool {
                tool: program,
                status: None,
                stderr: message,
            },
        })?;

        self.record_tool_output(run, stage, output.clone());

        if !output.success() {
            return Err(PipelineError::ExternalTool {
                tool: output.program,
                status: output.status,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }

    fn record_tool_output(&self, run: &mut PipelineRun, stage: Stage, output: ProcessOutput) {
        self.sink.record(&DiagnosticEvent::ToolOutput {
            stage,
            output: output.clone(),
        });
        run.tool_outputs.push(output);
    }

    fn warn(&self, run: &mut PipelineRun, warning: RunWarning) {
        self.sink.record(&DiagnosticEvent::Warning(warning.clone()));
        run.warnings.push(warning);
    }
}
