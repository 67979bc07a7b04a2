use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use uuid::Uuid;

use crate::captions::CaptionStats;
use crate::diagnostics::RunWarning;
use crate::errors::PipelineError;
use crate::media::ProcessOutput;

/// File name of the extracted audio inside the run directory
pub const AUDIO_FILE_NAME: &str = "audio.mp3";

/// File name of the rendered subtitle document inside the run directory
pub const SUBTITLE_FILE_NAME: &str = "captions.ass";

/// Stages of the captioning pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Demux the audio track with ffmpeg
    AudioExtract,
    /// Run the speech-to-text engine
    Transcribe,
    /// Build captions and write the subtitle document
    Render,
    /// Burn the subtitles into the video with ffmpeg
    Mux,
}

impl Stage {
    /// Stable identifier used in logs and failure reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AudioExtract => "audio-extract",
            Self::Transcribe => "transcribe",
            Self::Render => "render",
            Self::Mux => "mux",
        }
    }

    // @returns: Spinner message while the stage runs
    pub fn progress_label(&self) -> &'static str {
        match self {
            Self::AudioExtract => "Extracting audio...",
            Self::Transcribe => "Transcribing audio...",
            Self::Render => "Rendering captions...",
            Self::Mux => "Burning captions into video...",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    AudioExtracted,
    Transcribed,
    CaptionsRendered,
    Muxed,
    Done,
    Failed(Stage),
}

impl RunState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// Stage that moves the run out of this state
    pub fn next_stage(&self) -> Option<Stage> {
        match self {
            Self::Init => Some(Stage::AudioExtract),
            Self::AudioExtracted => Some(Stage::Transcribe),
            Self::Transcribed => Some(Stage::Render),
            Self::CaptionsRendered | Self::Muxed => Some(Stage::Mux),
            Self::Done | Self::Failed(_) => None,
        }
    }
}

/// Sizes and counts collected while the run progresses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub input_bytes: u64,
    pub audio_bytes: u64,
    pub subtitle_bytes: u64,
    pub output_bytes: u64,
    pub segments: usize,
    pub words: usize,
    pub captions: CaptionStats,
    pub elapsed: Duration,
}

/// Context of a single pipeline run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    // @field: Unique run identifier
    pub id: Uuid,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    // @field: Extracted audio, stable for the whole run
    pub audio_path: PathBuf,
    // @field: Rendered ASS document, stable for the whole run
    pub subtitle_path: PathBuf,
    pub state: RunState,
    pub stats: RunStats,
    pub warnings: Vec<RunWarning>,
    // @field: Every external invocation, successful or not
    pub tool_outputs: Vec<ProcessOutput>,
}

impl PipelineRun {
    /// Create a run with a fresh id; the input must exist
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        work_dir: &Path,
    ) -> Result<Self, PipelineError> {
        Self::with_id(Uuid::new_v4(), input_path, output_path, work_dir)
    }

    pub fn with_id(
        id: Uuid,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        work_dir: &Path,
    ) -> Result<Self, PipelineError> {
        let input_path = input_path.into();
        let metadata = std::fs::metadata(&input_path)
            .map_err(|_| PipelineError::InputMissing(input_path.clone()))?;

        Ok(Self {
            id,
            output_path: output_path.into(),
            audio_path: work_dir.join(AUDIO_FILE_NAME),
            subtitle_path: work_dir.join(SUBTITLE_FILE_NAME),
            state: RunState::Init,
            stats: RunStats {
                input_bytes: metadata.len(),
                ..Default::default()
            },
            warnings: Vec::new(),
            tool_outputs: Vec::new(),
            input_path,
        })
    }
}

/// The stage a run stopped at and why
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: PipelineError,
}

impl StageFailure {
    pub fn new(stage: Stage, error: PipelineError) -> Self {
        Self { stage, error }
    }

    /// True when the operator aborted the run
    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, PipelineError::Cancelled)
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

/// Terminal result of a run
#[derive(Debug)]
pub enum RunOutcome {
    Done(PipelineRun),
    Failed { run: PipelineRun, failure: StageFailure },
}

impl RunOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn run(&self) -> &PipelineRun {
        match self {
            Self::Done(run) | Self::Failed { run, .. } => run,
        }
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            Self::Done(_) => None,
            Self::Failed { failure, .. } => Some(failure),
        }
    }

    /// One-line description of the outcome
    pub fn summary(&self) -> String {
        let run = self.run();
        let mut parts = vec![format!("Duration: {:.2}s", run.stats.elapsed.as_secs_f64())];
        parts.push(format!("Captions: {} entries", run.stats.captions.entries_written));
        if !run.warnings.is_empty() {
            parts.push(format!("Warnings: {}", run.warnings.len()));
        }
        match self {
            Self::Done(run) => parts.push(format!("Output: {} bytes", run.stats.output_bytes)),
            Self::Failed { failure, .. } => parts.push(format!("Error: {}", failure)),
        }
        parts.join(" | ")
    }
}
