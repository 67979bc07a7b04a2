use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// External media tool settings
    #[serde(default)]
    pub media: MediaConfig,

    /// Speech-to-text settings
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Caption generation settings
    #[serde(default)]
    pub captions: CaptionConfig,

    /// HTTP upload server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Root directory for per-run intermediate files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    /// Keep the extracted audio and subtitle document after the run
    #[serde(default)]
    pub keep_intermediates: bool,

    /// Show a spinner with the current stage
    #[serde(default = "default_true")]
    pub show_progress: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Transcription engine type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptionEngineKind {
    // @engine: openai-whisper command line tool
    #[default]
    WhisperCli,
    // @engine: OpenAI-compatible HTTP API
    #[serde(rename = "openai")]
    OpenAI,
}

impl TranscriptionEngineKind {
    // @returns: Capitalized engine name
    pub fn display_name(&self) -> &str {
        match self {
            Self::WhisperCli => "Whisper CLI",
            Self::OpenAI => "OpenAI",
        }
    }

    // @returns: Lowercase engine identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::WhisperCli => "whisper-cli".to_string(),
            Self::OpenAI => "openai".to_string(),
        }
    }
}

impl std::fmt::Display for TranscriptionEngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranscriptionEngineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "whisper-cli" | "whisper" => Ok(Self::WhisperCli),
            "openai" => Ok(Self::OpenAI),
            _ => Err(anyhow!("Invalid transcription engine: {}", s)),
        }
    }
}

/// ffmpeg configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MediaConfig {
    /// Path or name of the ffmpeg executable
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

/// Speech-to-text configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranscriptionConfig {
    /// Engine to use
    #[serde(default)]
    pub engine: TranscriptionEngineKind,

    /// Model name, engine default when empty
    #[serde(default = "String::new")]
    pub model: String,

    /// Spoken language (ISO 639 code); auto-detected when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Path or name of the whisper executable
    #[serde(default = "default_whisper_path")]
    pub whisper_path: String,

    /// Torch device for the whisper CLI (cpu, cuda)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Base URL of the HTTP API
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    /// API key; falls back to the OPENAI_API_KEY environment variable
    #[serde(default = "String::new")]
    pub api_key: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            engine: TranscriptionEngineKind::default(),
            model: String::new(),
            language: None,
            whisper_path: default_whisper_path(),
            device: None,
            endpoint: default_openai_endpoint(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TranscriptionConfig {
    /// Get the model for the active engine
    pub fn get_model(&self) -> String {
        if !self.model.trim().is_empty() {
            return self.model.trim().to_string();
        }

        match self.engine {
            TranscriptionEngineKind::WhisperCli => default_whisper_model(),
            TranscriptionEngineKind::OpenAI => default_openai_model(),
        }
    }

    /// Language code in the form the engines expect
    pub fn engine_language(&self) -> Option<String> {
        self.language.as_ref().map(|code| {
            crate::language_utils::whisper_language_code(code).unwrap_or_else(|_| code.trim().to_string())
        })
    }

    /// Get the API key from the config or the environment
    pub fn get_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var("OPENAI_API_KEY").unwrap_or_default()
    }
}

/// Caption generation configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CaptionConfig {
    /// Fail the render stage on malformed word timing instead of skipping the word
    #[serde(default)]
    pub strict_timing: bool,
}

/// HTTP upload server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Largest accepted upload in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,

    /// Pipeline runs allowed at the same time; further uploads wait
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            max_upload_mb: default_max_upload_mb(),
            max_concurrent_runs: default_max_concurrent_runs(),
        }
    }
}

impl ServerConfig {
    // @returns: Upload limit in bytes
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_true() -> bool {
    true
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_whisper_path() -> String {
    "whisper".to_string()
}

fn default_whisper_model() -> String {
    "medium".to_string()
}

fn default_openai_model() -> String {
    "whisper-1".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    5000
}

fn default_max_upload_mb() -> u64 {
    1024
}

fn default_max_concurrent_runs() -> usize {
    1
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.media.ffmpeg_path.trim().is_empty() {
            return Err(anyhow!("ffmpeg path must not be empty"));
        }

        if let Some(language) = &self.transcription.language {
            crate::language_utils::validate_language_code(language)?;
        }

        match self.transcription.engine {
            TranscriptionEngineKind::WhisperCli => {
                if self.transcription.whisper_path.trim().is_empty() {
                    return Err(anyhow!("whisper path must not be empty"));
                }
            }
            TranscriptionEngineKind::OpenAI => {
                if self.transcription.get_api_key().is_empty() {
                    return Err(anyhow!(
                        "API key is required for the OpenAI engine (set transcription.api_key or OPENAI_API_KEY)"
                    ));
                }
                if self.transcription.endpoint.trim().is_empty() {
                    return Err(anyhow!("OpenAI endpoint must not be empty"));
                }
                if self.transcription.timeout_secs == 0 {
                    return Err(anyhow!("Transcription timeout must be greater than zero"));
                }
            }
        }

        if self.server.host.trim().is_empty() {
            return Err(anyhow!("Server host must not be empty"));
        }
        if self.server.max_upload_mb == 0 {
            return Err(anyhow!("Server upload limit must be greater than zero"));
        }
        if self.server.max_concurrent_runs == 0 {
            return Err(anyhow!("Server must allow at least one concurrent run"));
        }

        Ok(())
    }

    /// Root directory under which each run creates its own working directory
    pub fn work_root(&self) -> PathBuf {
        if let Some(dir) = &self.work_dir {
            return dir.clone();
        }
        dirs::cache_dir()
            .map(|dir| dir.join("wordcap"))
            .unwrap_or_else(|| std::env::temp_dir().join("wordcap"))
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            media: MediaConfig::default(),
            transcription: TranscriptionConfig::default(),
            captions: CaptionConfig::default(),
            server: ServerConfig::default(),
            work_dir: None,
            keep_intermediates: false,
            show_progress: true,
            log_level: LogLevel::default(),
        }
    }
}
