use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::captions::builder::CaptionEntry;
use crate::file_utils::FileManager;

// @module: ASS subtitle document rendering

// @const: Line breaks that would otherwise end a dialogue record
static LINE_BREAK_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").unwrap());

/// Script info and the single centered style (Alignment 5)
pub const ASS_HEADER: &str = "[Script Info]\n\
Title: Whisper Captions\n\
ScriptType: v4.00+\n\
PlayResX: 1280\n\
PlayResY: 720\n\
WrapStyle: 0\n\
ScaledBorderAndShadow: yes\n\
YCbCr Matrix: TV.601\n\
\n\
[V4+ Styles]\n\
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
Style: Default,Arial,48,&H00FFFFFF,&H000000FF,&H00000000,&H64000000,0,0,0,0,100,100,0,0,1,1,0,5,10,10,10,1\n\
\n\
[Events]\n\
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n";

/// A fully rendered ASS document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleDocument {
    content: String,
    dialogue_count: usize,
}

impl SubtitleDocument {
    /// Render the header plus one dialogue line per entry
    pub fn render(entries: &[CaptionEntry]) -> Self {
        let mut content = String::with_capacity(ASS_HEADER.len() + entries.len() * 48);
        content.push_str(ASS_HEADER);

        for entry in entries {
            // Writing into a String cannot fail
            let _ = writeln!(
                content,
                "Dialogue: 0,{},{},Default,,0,0,0,,{}",
                entry.start_formatted,
                entry.end_formatted,
                escape_dialogue_text(&entry.text)
            );
        }

        Self {
            content,
            dialogue_count: entries.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.content.as_bytes()
    }

    /// Number of dialogue lines in the events section
    pub fn dialogue_count(&self) -> usize {
        self.dialogue_count
    }

    /// Write the whole document in one go, returning bytes written
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        let path = path.as_ref();
        FileManager::write_to_file(path, self.as_bytes())
            .with_context(|| format!("Failed to write subtitle document: {:?}", path))?;
        Ok(self.content.len() as u64)
    }
}

/// Render entries straight to document bytes
pub fn render(entries: &[CaptionEntry]) -> Vec<u8> {
    SubtitleDocument::render(entries).content.into_bytes()
}

/// Text is the final field, so commas pass through; only hard line breaks are rewritten
fn escape_dialogue_text(text: &str) -> std::borrow::Cow<'_, str> {
    LINE_BREAK_REGEX.replace_all(text, "\\N")
}
