/*!
 * Command line surface of the `wordcap` binary.
 *
 * Parsing lives in the library so the argument contract can be exercised
 * with `CommandLineOptions::try_parse_from` without spawning the binary:
 * - `wordcap <INPUT_VIDEO> <OUTPUT_VIDEO> [flags]` captions one video
 * - `wordcap serve [flags]` runs the HTTP upload front end
 * - `wordcap completions <shell>` prints shell completions
 */

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use log::warn;

use crate::app_config::{self, Config, TranscriptionEngineKind};

/// CLI Wrapper for TranscriptionEngineKind to implement ValueEnum
#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum CliEngine {
    #[value(name = "whisper-cli")]
    WhisperCli,
    #[value(name = "openai")]
    OpenAI,
}

impl From<CliEngine> for TranscriptionEngineKind {
    fn from(cli_engine: CliEngine) -> Self {
        match cli_engine {
            CliEngine::WhisperCli => TranscriptionEngineKind::WhisperCli,
            CliEngine::OpenAI => TranscriptionEngineKind::OpenAI,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate shell completions for wordcap
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Accept videos over HTTP (POST /upload) and answer with the captioned copy
    Serve(ServeArgs),
}

/// Options of the `serve` subcommand
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Configuration file path
    #[arg(short, long = "config", default_value = "wordcap.json")]
    pub config_path: String,

    /// Address to listen on
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    pub log_level: Option<CliLogLevel>,
}

impl ServeArgs {
    /// Apply flag values on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone().into();
        }
        // The upload server has no terminal to draw on
        config.show_progress = false;
    }
}

/// wordcap - word-level captions burned into video
///
/// Extracts the audio track of a video, transcribes it with word-level
/// timestamps and burns one caption per spoken word into a copy of the video.
#[derive(Parser, Debug)]
#[command(name = "wordcap")]
#[command(version)]
#[command(about = "Burn word-level captions into a video")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "wordcap extracts the audio of a video, transcribes it word by word and burns the words back in as captions.

EXAMPLES:
    wordcap talk.mp4 talk.captioned.mp4                # Use the default config
    wordcap -e openai talk.mp4 out.mp4                 # Transcribe with the OpenAI API
    wordcap -m small --language en talk.mp4 out.mp4    # Smaller whisper model, forced language
    wordcap -k --log-level debug talk.mp4 out.mp4      # Keep audio.mp3 and captions.ass
    wordcap serve --port 5000                          # Accept uploads on POST /upload
    wordcap completions bash > wordcap.bash            # Generate bash completions

CONFIGURATION:
    Configuration is stored in wordcap.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

ENGINES:
    whisper-cli - openai-whisper command line tool (default model: medium)
    openai      - OpenAI-compatible API (default model: whisper-1, requires API key)")]
pub struct CommandLineOptions {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Video file to caption
    #[arg(value_name = "INPUT_VIDEO")]
    pub input_path: Option<PathBuf>,

    /// Where to write the captioned video
    #[arg(value_name = "OUTPUT_VIDEO")]
    pub output_path: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long = "config", default_value = "wordcap.json")]
    pub config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    pub log_level: Option<CliLogLevel>,

    /// Transcription engine to use
    #[arg(short, long, value_enum)]
    pub engine: Option<CliEngine>,

    /// Model name for the transcription engine
    #[arg(short, long)]
    pub model: Option<String>,

    /// Spoken language code (e.g., 'en', 'fra'); detected when omitted
    #[arg(long)]
    pub language: Option<String>,

    /// Fail instead of skipping words with malformed timing
    #[arg(long)]
    pub strict_timing: bool,

    /// Keep the extracted audio and subtitle file
    #[arg(short, long)]
    pub keep_intermediates: bool,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

impl CommandLineOptions {
    /// Both positionals of a captioning run
    ///
    /// Clap cannot require them because they conflict with the subcommands,
    /// so a missing one is reported here as the same usage error.
    pub fn run_paths(&self) -> Result<(PathBuf, PathBuf), clap::Error> {
        match (&self.input_path, &self.output_path) {
            (Some(input), Some(output)) => Ok((input.clone(), output.clone())),
            _ => Err(Self::command().error(
                ErrorKind::MissingRequiredArgument,
                "INPUT_VIDEO and OUTPUT_VIDEO are required",
            )),
        }
    }

    /// Apply flag values on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(engine) = &self.engine {
            config.transcription.engine = engine.clone().into();
        }
        if let Some(model) = &self.model {
            config.transcription.model = model.clone();
        }
        if let Some(language) = &self.language {
            config.transcription.language = Some(language.clone());
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone().into();
        }
        if self.strict_timing {
            config.captions.strict_timing = true;
        }
        if self.keep_intermediates {
            config.keep_intermediates = true;
        }
        if self.no_progress {
            config.show_progress = false;
        }
    }
}

// @returns: Config from disk, or a freshly written default when the file is absent
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<Config> {
    let config_path = config_path.as_ref();
    if config_path.exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {:?}", config_path))?;
        let reader = BufReader::new(file);
        let config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {:?}", config_path))?;
        return Ok(config);
    }

    warn!("Config file not found at {:?}, creating default config.", config_path);
    let config = Config::default();
    let config_json = serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
    std::fs::write(config_path, config_json)
        .context(format!("Failed to write default config to file: {:?}", config_path))?;
    Ok(config)
}
