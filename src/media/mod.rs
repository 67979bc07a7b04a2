/*!
 * External media tooling.
 *
 * - `process`: the `ProcessRunner` seam and its tokio implementation
 * - `ffmpeg`: typed argument builders for audio extraction and burn-in
 */

pub mod ffmpeg;
pub mod process;

pub use ffmpeg::{AudioExtractArgs, BurnInArgs};
pub use process::{ProcessError, ProcessOutput, ProcessRunner, ProcessSpec, TokioProcessRunner};
