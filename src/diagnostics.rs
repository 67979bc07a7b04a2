/*!
 * Diagnostics for pipeline runs.
 *
 * The orchestrator never logs directly. Instead it records structured
 * `DiagnosticEvent`s into an injected `DiagnosticsSink`:
 * - `LogSink` forwards events to the `log` facade
 * - `MemorySink` keeps events in memory, mainly for tests
 * - `ProgressSink` drives an indicatif spinner and forwards to another sink
 */

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::media::ffmpeg::filter_ffmpeg_stderr;
use crate::media::process::ProcessOutput;
use crate::pipeline::Stage;

/// Non-fatal conditions worth surfacing to the operator
#[derive(Debug, Clone, PartialEq)]
pub enum RunWarning {
    /// The engine returned zero segments
    NoSpeechDetected,
    /// Caption building produced zero entries
    NoCaptionEntries,
    /// A segment carried no word timestamps
    SegmentWithoutWords {
        /// Segment start in seconds
        start: f64,
        /// Segment end in seconds
        end: f64,
    },
    /// A word lacked a start or end timestamp
    WordMissingTimestamps {
        /// Literal word text
        text: String,
    },
    /// A word had negative, non-finite or inverted timing and was dropped
    MalformedWordTiming {
        /// Literal word text
        text: String,
        /// What was wrong with it
        detail: String,
    },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSpeechDetected => write!(f, "No speech detected in audio"),
            Self::NoCaptionEntries => write!(f, "No subtitle entries generated"),
            Self::SegmentWithoutWords { start, end } => {
                write!(f, "Segment at {}-{} has no word timestamps", start, end)
            }
            Self::WordMissingTimestamps { text } => {
                write!(f, "Skipping word '{}' due to missing timestamps", text)
            }
            Self::MalformedWordTiming { text, detail } => {
                write!(f, "Skipping word '{}' due to malformed timing: {}", text, detail)
            }
        }
    }
}

/// A single structured event emitted during a run
#[derive(Debug, Clone)]
pub enum DiagnosticEvent {
    /// Informational message not tied to a transition
    Note(String),
    /// A stage is about to run
    StageStarted(Stage),
    /// A stage finished successfully
    StageCompleted {
        stage: Stage,
        detail: String,
        elapsed: Duration,
    },
    /// Captured output of an external process, recorded whatever its outcome
    ToolOutput {
        stage: Stage,
        output: ProcessOutput,
    },
    /// A non-fatal condition
    Warning(RunWarning),
    /// The run stopped at a stage
    Failed { stage: Stage, reason: String },
    /// The run reached `Done`
    Finished { output_bytes: u64, elapsed: Duration },
}

/// Receiver of pipeline events
pub trait DiagnosticsSink: Send + Sync {
    /// Record one event
    fn record(&self, event: &DiagnosticEvent);
}

impl<T: DiagnosticsSink + ?Sized> DiagnosticsSink for Arc<T> {
    fn record(&self, event: &DiagnosticEvent) {
        (**self).record(event)
    }
}

/// Sink that writes events through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn record(&self, event: &DiagnosticEvent) {
        match event {
            DiagnosticEvent::Note(message) => info!("{}", message),
            DiagnosticEvent::StageStarted(stage) => info!("Starting stage {}", stage),
            DiagnosticEvent::StageCompleted { stage, detail, elapsed } => {
                info!("Stage {} complete in {:.2}s: {}", stage, elapsed.as_secs_f64(), detail)
            }
            DiagnosticEvent::ToolOutput { stage, output } => {
                debug!("[{}] {}", stage, output.command_line());
                debug!("[{}] {} exited with {:?}", stage, output.program, output.status);
                if !output.stdout.trim().is_empty() {
                    debug!("[{}] stdout: {}", stage, output.stdout.trim());
                }
                if !output.stderr.trim().is_empty() {
                    if output.success() {
                        debug!("[{}] stderr: {}", stage, output.stderr.trim());
                    } else {
                        error!("[{}] stderr: {}", stage, filter_ffmpeg_stderr(&output.stderr));
                    }
                }
            }
            DiagnosticEvent::Warning(warning) => warn!("{}", warning),
            DiagnosticEvent::Failed { stage, reason } => error!("Stage {} failed: {}", stage, reason),
            DiagnosticEvent::Finished { output_bytes, elapsed } => info!(
                "Video processing complete in {:.2}s, size: {} bytes",
                elapsed.as_secs_f64(),
                output_bytes
            ),
        }
    }
}

/// Sink that stores every event, used to inspect runs in tests
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }

    /// Warnings recorded so far
    pub fn warnings(&self) -> Vec<RunWarning> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DiagnosticEvent::Warning(w) => Some(w.clone()),
                _ => None,
            })
            .collect()
    }

    /// Stages that were started, in order
    pub fn started_stages(&self) -> Vec<Stage> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DiagnosticEvent::StageStarted(stage) => Some(*stage),
                _ => None,
            })
            .collect()
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&self, event: &DiagnosticEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Sink that shows the current stage on a spinner
pub struct ProgressSink<S: DiagnosticsSink> {
    bar: ProgressBar,
    inner: S,
}

impl<S: DiagnosticsSink> ProgressSink<S> {
    pub fn new(inner: S) -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar, inner }
    }
}

impl<S: DiagnosticsSink> DiagnosticsSink for ProgressSink<S> {
    fn record(&self, event: &DiagnosticEvent) {
        self.bar.suspend(|| self.inner.record(event));

        match event {
            DiagnosticEvent::StageStarted(stage) => self.bar.set_message(stage.progress_label()),
            DiagnosticEvent::Failed { stage, .. } => {
                self.bar.abandon_with_message(format!("Failed during {}", stage))
            }
            DiagnosticEvent::Finished { .. } => self.bar.finish_and_clear(),
            _ => {}
        }
    }
}

impl<S: DiagnosticsSink> Drop for ProgressSink<S> {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
