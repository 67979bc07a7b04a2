/*!
 * Captioning pipeline.
 *
 * A run moves through four stages:
 * 1. **Audio extract**: ffmpeg writes the audio track to the run directory
 * 2. **Transcribe**: a speech engine returns word-level timestamps
 * 3. **Render**: one ASS dialogue line per word
 * 4. **Mux**: ffmpeg burns the captions into a copy of the input
 */

pub mod orchestrator;
pub mod state;

pub use orchestrator::{CaptionPipeline, PipelineOptions};
pub use state::{PipelineRun, RunOutcome, RunState, RunStats, Stage, StageFailure};
