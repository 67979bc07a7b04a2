use crate::captions::timestamp::format_ass_timestamp;
use crate::diagnostics::RunWarning;
use crate::errors::CaptionError;
use crate::transcript::{TranscriptionResult, Word};

// @module: Word-level caption entry generation

/// One timed caption, one per spoken word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionEntry {
    // @field: Start time in ASS format
    pub start_formatted: String,

    // @field: End time in ASS format
    pub end_formatted: String,

    // @field: Word text exactly as transcribed
    pub text: String,
}

impl CaptionEntry {
    pub fn new(start_formatted: impl Into<String>, end_formatted: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            start_formatted: start_formatted.into(),
            end_formatted: end_formatted.into(),
            text: text.into(),
        }
    }
}

/// Counters gathered while building captions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptionStats {
    pub entries_written: usize,
    pub words_skipped: usize,
    pub segments_skipped: usize,
    pub malformed_words: usize,
}

/// How to treat words whose timing is present but invalid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimingPolicy {
    /// Drop the word and record a warning
    #[default]
    Lenient,
    /// Abort caption building
    Strict,
}

/// Output of a caption build
#[derive(Debug, Clone, Default)]
pub struct CaptionBuild {
    pub entries: Vec<CaptionEntry>,
    pub stats: CaptionStats,
    pub warnings: Vec<RunWarning>,
}

impl CaptionBuild {
    /// True when no caption entries were produced
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds caption entries from a transcription
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptionBuilder {
    policy: TimingPolicy,
}

impl CaptionBuilder {
    pub fn new(policy: TimingPolicy) -> Self {
        Self { policy }
    }

    /// Turn every usable word into a caption entry, in source order
    ///
    /// Segments without words and words missing a timestamp are skipped and
    /// reported as warnings. Nothing is re-sorted.
    pub fn build(&self, transcription: &TranscriptionResult) -> Result<CaptionBuild, CaptionError> {
        let mut build = CaptionBuild::default();

        for segment in &transcription.segments {
            if segment.words.is_empty() {
                build.stats.segments_skipped += 1;
                build.warnings.push(RunWarning::SegmentWithoutWords {
                    start: segment.start,
                    end: segment.end,
                });
                continue;
            }

            for word in &segment.words {
                let Some((start, end)) = word.timing() else {
                    build.stats.words_skipped += 1;
                    build.warnings.push(RunWarning::WordMissingTimestamps {
                        text: word.text.clone(),
                    });
                    continue;
                };

                match Self::entry_for(word, start, end) {
                    Ok(entry) => {
                        build.entries.push(entry);
                        build.stats.entries_written += 1;
                    }
                    Err(e) if self.policy == TimingPolicy::Lenient => {
                        build.stats.malformed_words += 1;
                        build.warnings.push(RunWarning::MalformedWordTiming {
                            text: word.text.clone(),
                            detail: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if build.entries.is_empty() {
            build.warnings.push(RunWarning::NoCaptionEntries);
        }

        Ok(build)
    }

    fn entry_for(word: &Word, start: f64, end: f64) -> Result<CaptionEntry, CaptionError> {
        let start_formatted = format_ass_timestamp(start)?;
        let end_formatted = format_ass_timestamp(end)?;
        if start > end {
            return Err(CaptionError::InvertedRange {
                text: word.text.clone(),
                start,
                end,
            });
        }

        Ok(CaptionEntry {
            start_formatted,
            end_formatted,
            text: word.text.clone(),
        })
    }
}

/// Build captions with the default lenient policy
pub fn build_captions(transcription: &TranscriptionResult) -> Result<CaptionBuild, CaptionError> {
    CaptionBuilder::default().build(transcription)
}
