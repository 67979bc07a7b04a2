use std::path::{Path, PathBuf};

use crate::media::process::ProcessSpec;

// @module: Typed ffmpeg invocations

/// Strip the video stream and encode audio as MP3
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioExtractArgs {
    pub input: PathBuf,
    pub audio_output: PathBuf,
}

impl AudioExtractArgs {
    pub fn new(input: impl Into<PathBuf>, audio_output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            audio_output: audio_output.into(),
        }
    }

    // @returns: ffmpeg -i <input> -vn -acodec mp3 -y <audio>
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "-i".to_string(),
            path_arg(&self.input),
            "-vn".to_string(),
            "-acodec".to_string(),
            "mp3".to_string(),
            "-y".to_string(),
            path_arg(&self.audio_output),
        ]
    }

    pub fn to_spec(&self, ffmpeg: &str) -> ProcessSpec {
        ProcessSpec::new(ffmpeg, self.to_args())
    }
}

/// Burn an ASS document into the video, copying audio unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnInArgs {
    pub input: PathBuf,
    pub subtitles: PathBuf,
    pub output: PathBuf,
}

impl BurnInArgs {
    pub fn new(input: impl Into<PathBuf>, subtitles: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            subtitles: subtitles.into(),
            output: output.into(),
        }
    }

    // @returns: ffmpeg -i <input> -vf ass=<subs> -c:a copy -y <output>
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "-i".to_string(),
            path_arg(&self.input),
            "-vf".to_string(),
            format!("ass={}", escape_filter_path(&self.subtitles)),
            "-c:a".to_string(),
            "copy".to_string(),
            "-y".to_string(),
            path_arg(&self.output),
        ]
    }

    pub fn to_spec(&self, ffmpeg: &str) -> ProcessSpec {
        ProcessSpec::new(ffmpeg, self.to_args())
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Escape a path for use as a filter option value inside `-vf`
///
/// ffmpeg unescapes twice: once for the option value (`\ ' :`) and once for
/// the filtergraph (`\ ' [ ] , ;`).
pub fn escape_filter_path(path: &Path) -> String {
    let value = escape_chars(&path.to_string_lossy(), &['\\', '\'', ':']);
    escape_chars(&value, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(input: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Filter ffmpeg stderr to only show meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let dominated_prefixes = [
        "ffmpeg version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Chapter",
        "Stream #",
        "title",
        "encoder",
        "handler_name",
        "vendor_id",
        "major_brand",
        "minor_version",
        "compatible_brands",
        "creation_time",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "frame=",
        "size=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return false;
            }
            !dominated_prefixes.iter().any(|p| trimmed.starts_with(p))
        })
        .collect();

    if meaningful.is_empty() {
        "unknown error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
