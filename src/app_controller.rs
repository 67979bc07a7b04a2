use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::app_config::Config;
use crate::captions::TimingPolicy;
use crate::diagnostics::{DiagnosticsSink, LogSink, ProgressSink};
use crate::errors::PipelineError;
use crate::file_utils::{FileManager, FileType};
use crate::language_utils;
use crate::media::{ProcessRunner, TokioProcessRunner};
use crate::pipeline::{CaptionPipeline, PipelineOptions, PipelineRun, RunOutcome};
use crate::transcription::{TranscriptionEngine, engine_from_config};

// @module: Application controller for captioning runs

/// Main application controller: wires configuration into a pipeline run
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Options handed to the orchestrator
    pub fn pipeline_options(&self) -> PipelineOptions {
        let timing_policy = if self.config.captions.strict_timing {
            TimingPolicy::Strict
        } else {
            TimingPolicy::Lenient
        };
        PipelineOptions::default()
            .with_ffmpeg_path(self.config.media.ffmpeg_path.clone())
            .with_timing_policy(timing_policy)
    }

    /// Run the whole workflow with the configured engine and real ffmpeg
    pub async fn run(
        &self,
        input_file: PathBuf,
        output_file: PathBuf,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, PipelineError> {
        let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner);
        let engine = engine_from_config(&self.config.transcription, runner.clone())?;
        self.log_engine_settings();

        let sink: Arc<dyn DiagnosticsSink> = if self.config.show_progress && std::io::stderr().is_terminal() {
            Arc::new(ProgressSink::new(LogSink))
        } else {
            Arc::new(LogSink)
        };

        self.run_with(input_file, output_file, runner, engine, sink, cancel).await
    }

    fn log_engine_settings(&self) {
        let transcription = &self.config.transcription;
        info!(
            "Using {} engine, model {}",
            transcription.engine.display_name(),
            transcription.get_model()
        );
        if let Some(code) = &transcription.language {
            match language_utils::get_language_name(code) {
                Ok(name) => info!("Spoken language: {} ({})", name, code),
                Err(_) => info!("Spoken language: {}", code),
            }
        }
    }

    /// Run the workflow with explicit collaborators
    pub async fn run_with(
        &self,
        input_file: PathBuf,
        output_file: PathBuf,
        runner: Arc<dyn ProcessRunner>,
        engine: Arc<dyn TranscriptionEngine>,
        sink: Arc<dyn DiagnosticsSink>,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, PipelineError> {
        if !FileManager::file_exists(&input_file) {
            return Err(PipelineError::InputMissing(input_file));
        }
        if FileManager::detect_file_type(&input_file) != FileType::Video {
            warn!("Input does not look like a video file, letting ffmpeg decide: {:?}", input_file);
        }
        if FileManager::detect_file_type(&output_file) == FileType::Subtitle {
            return Err(PipelineError::Config(format!(
                "Output must be a video file, not a subtitle document: {:?}",
                output_file
            )));
        }

        let run_id = Uuid::new_v4();
        let work_root = self.config.work_root();
        FileManager::ensure_dir(&work_root).map_err(|e| PipelineError::File(format!("{:#}", e)))?;

        let work_dir = tempfile::Builder::new()
            .prefix(&format!("wordcap-{}", run_id))
            .rand_bytes(0)
            .tempdir_in(&work_root)?;
        debug!("Run {} working directory: {:?}", run_id, work_dir.path());

        let run = PipelineRun::with_id(
            run_id,
            FileManager::absolute(&input_file),
            FileManager::absolute(&output_file),
            work_dir.path(),
        )?;
        let pipeline = CaptionPipeline::new(runner, engine, sink, self.pipeline_options());
        let outcome = pipeline.run(run, &cancel).await;

        if self.config.keep_intermediates {
            let kept = work_dir.keep();
            info!("Intermediate files kept in {:?}", kept);
        } else if let Err(e) = work_dir.close() {
            warn!("Failed to remove working directory: {}", e);
        }

        match &outcome {
            RunOutcome::Done(run) => info!(
                "Captioned video written to {:?} in {}",
                run.output_path,
                Self::format_duration(run.stats.elapsed)
            ),
            RunOutcome::Failed { .. } => debug!("{}", outcome.summary()),
        }

        Ok(outcome)
    }

    /// Format a duration for humans
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
