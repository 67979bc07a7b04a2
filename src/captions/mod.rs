/*!
 * Timed caption generation.
 *
 * - `timestamp`: seconds to `H:MM:SS.CC` formatting
 * - `builder`: transcription words to caption entries
 * - `document`: caption entries to a complete ASS document
 */

pub mod builder;
pub mod document;
pub mod timestamp;

pub use builder::{CaptionBuild, CaptionBuilder, CaptionEntry, CaptionStats, TimingPolicy, build_captions};
pub use document::{ASS_HEADER, SubtitleDocument, render};
pub use timestamp::format_ass_timestamp;
