use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed; existing directories are fine
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))
    }

    // @returns: Size in bytes, None when the file is missing
    pub fn file_size<P: AsRef<Path>>(path: P) -> Option<u64> {
        fs::metadata(path.as_ref()).ok().filter(|m| m.is_file()).map(|m| m.len())
    }

    // @returns: Size in bytes when the file exists and is not empty
    pub fn non_empty_file_size<P: AsRef<Path>>(path: P) -> Option<u64> {
        Self::file_size(path).filter(|size| *size > 0)
    }

    /// Write bytes to a file, creating the parent directory first
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                Self::ensure_dir(parent)?;
            }
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Detect whether a path looks like a video container ffmpeg can read
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> FileType {
        let path = path.as_ref();

        let Some(ext) = path.extension() else {
            return FileType::Unknown;
        };
        let ext_str = ext.to_string_lossy().to_lowercase();

        // Common video file extensions supported by ffmpeg
        let video_extensions = [
            "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v",
            "mpg", "mpeg", "ogv", "ts", "mts", "m2ts",
        ];
        let subtitle_extensions = ["ass", "ssa", "srt", "vtt"];

        if video_extensions.contains(&ext_str.as_str()) {
            FileType::Video
        } else if subtitle_extensions.contains(&ext_str.as_str()) {
            FileType::Subtitle
        } else {
            FileType::Unknown
        }
    }

    /// Absolute form of a path, relative paths resolved against the current directory
    pub fn absolute<P: AsRef<Path>>(path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            return path.to_path_buf();
        }
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Enum representing different file types
#[derive(Debug, PartialEq, Eq)]
pub enum FileType {
    /// Subtitle document
    Subtitle,
    /// Video file supported by ffmpeg
    Video,
    /// Unknown file type
    Unknown,
}
