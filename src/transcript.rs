use serde::{Deserialize, Serialize};

// @module: Transcription data model shared by engines and the caption builder

/// A single transcribed word with optional timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    // @field: Literal word text as produced by the engine
    #[serde(rename = "word", alias = "text")]
    pub text: String,

    // @field: Start time in seconds
    #[serde(default)]
    pub start: Option<f64>,

    // @field: End time in seconds
    #[serde(default)]
    pub end: Option<f64>,
}

impl Word {
    /// Create a word with both timestamps present
    pub fn timed(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start: Some(start),
            end: Some(end),
        }
    }

    /// Create a word without timing information
    pub fn untimed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start: None,
            end: None,
        }
    }

    /// Both timestamps when the word is usable for captioning
    pub fn timing(&self) -> Option<(f64, f64)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

/// A contiguous chunk of transcribed speech
///
/// Segment-level start/end are informational; captions are timed from words only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    // @field: Approximate segment start in seconds
    #[serde(default)]
    pub start: f64,

    // @field: Approximate segment end in seconds
    #[serde(default)]
    pub end: f64,

    // @field: Segment text, if the engine reports it
    #[serde(default)]
    pub text: String,

    // @field: Words in spoken order; engines may omit the list entirely
    #[serde(default, deserialize_with = "deserialize_words")]
    pub words: Vec<Word>,
}

impl Segment {
    pub fn new(start: f64, end: f64, words: Vec<Word>) -> Self {
        let text = words.iter().map(|w| w.text.as_str()).collect::<String>();
        Self { start, end, text, words }
    }
}

/// Full output of a transcription engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    // @field: Complete transcript text
    #[serde(rename = "text", default)]
    pub full_text: String,

    // @field: Segments in the order the engine produced them
    #[serde(default)]
    pub segments: Vec<Segment>,

    // @field: Detected or forced language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl TranscriptionResult {
    pub fn new(full_text: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            full_text: full_text.into(),
            segments,
            language: None,
        }
    }

    /// Total number of words across all segments
    pub fn word_count(&self) -> usize {
        self.segments.iter().map(|s| s.words.len()).sum()
    }

    /// Parse the JSON document written by the whisper CLI
    pub fn from_whisper_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}

// Whisper writes `"words": null` for some segments, treat it as absent
fn deserialize_words<'de, D>(deserializer: D) -> Result<Vec<Word>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let words: Option<Vec<Word>> = Option::deserialize(deserializer)?;
    Ok(words.unwrap_or_default())
}
