/*!
 * Tests for command line parsing and config loading
 */

use std::fs;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;

use wordcap::app_config::{Config, LogLevel, TranscriptionEngineKind};
use wordcap::cli::{CliEngine, CommandLineOptions, Commands, load_config};

use crate::common;

#[test]
fn test_parse_withTwoPositionals_shouldYieldRunPaths() -> Result<()> {
    let options = CommandLineOptions::try_parse_from(["wordcap", "talk.mp4", "out.mp4"])?;

    let (input, output) = options.run_paths()?;
    assert_eq!(input.to_string_lossy(), "talk.mp4");
    assert_eq!(output.to_string_lossy(), "out.mp4");
    assert!(options.command.is_none());
    assert_eq!(options.config_path, "wordcap.json");
    Ok(())
}

#[test]
fn test_runPaths_withNoPositionals_shouldBeUsageError() -> Result<()> {
    let options = CommandLineOptions::try_parse_from(["wordcap"])?;

    let error = options.run_paths().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MissingRequiredArgument);
    assert_eq!(error.exit_code(), 2);
    Ok(())
}

#[test]
fn test_runPaths_withOnePositional_shouldBeUsageError() -> Result<()> {
    let options = CommandLineOptions::try_parse_from(["wordcap", "talk.mp4"])?;

    let error = options.run_paths().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MissingRequiredArgument);
    assert_ne!(error.exit_code(), 0);
    Ok(())
}

#[test]
fn test_parse_withThreePositionals_shouldFail() {
    let error = CommandLineOptions::try_parse_from(["wordcap", "a.mp4", "b.mp4", "c.mp4"]).unwrap_err();
    assert_eq!(error.exit_code(), 2);
}

#[test]
fn test_parse_withUnknownFlag_shouldFail() {
    let error = CommandLineOptions::try_parse_from(["wordcap", "--frobnicate", "a.mp4", "b.mp4"]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnknownArgument);
}

#[test]
fn test_parse_withCompletions_shouldSelectSubcommand() -> Result<()> {
    let options = CommandLineOptions::try_parse_from(["wordcap", "completions", "bash"])?;

    assert!(matches!(options.command, Some(Commands::Completions { .. })));
    assert!(options.input_path.is_none());
    Ok(())
}

#[test]
fn test_parse_withCompletionsAndExtraPositional_shouldFail() {
    assert!(CommandLineOptions::try_parse_from(["wordcap", "completions", "bash", "out.mp4"]).is_err());
}

#[test]
fn test_parse_withServe_shouldReadServerFlags() -> Result<()> {
    let options = CommandLineOptions::try_parse_from(["wordcap", "serve", "--host", "0.0.0.0", "-p", "8080"])?;

    let Some(Commands::Serve(args)) = options.command else {
        panic!("expected the serve subcommand");
    };
    let mut config = Config::default();
    args.apply_overrides(&mut config);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert!(!config.show_progress);
    Ok(())
}

#[test]
fn test_parse_withFlags_shouldMapValueEnums() -> Result<()> {
    let options = CommandLineOptions::try_parse_from([
        "wordcap", "-e", "openai", "-l", "debug", "-m", "small", "in.mp4", "out.mp4",
    ])?;

    assert_eq!(options.engine, Some(CliEngine::OpenAI));
    assert_eq!(options.model.as_deref(), Some("small"));
    assert!(CommandLineOptions::try_parse_from(["wordcap", "-e", "vosk", "in.mp4", "out.mp4"]).is_err());
    Ok(())
}

#[test]
fn test_applyOverrides_shouldTakePrecedenceOverFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = common::create_test_file(
        temp_dir.path(),
        "wordcap.json",
        br#"{
            "transcription": { "engine": "openai", "model": "base", "language": "fr", "api_key": "sk-file" },
            "captions": { "strict_timing": false },
            "show_progress": true,
            "log_level": "warn"
        }"#,
    )?;
    let config_arg = config_path.to_string_lossy().into_owned();
    let options = CommandLineOptions::try_parse_from([
        "wordcap",
        "-c",
        config_arg.as_str(),
        "-m",
        "small",
        "--strict-timing",
        "--no-progress",
        "-k",
        "in.mp4",
        "out.mp4",
    ])?;

    let mut config = load_config(&options.config_path)?;
    options.apply_overrides(&mut config);

    // overridden by flags
    assert_eq!(config.transcription.model, "small");
    assert!(config.captions.strict_timing);
    assert!(!config.show_progress);
    assert!(config.keep_intermediates);
    // untouched file values
    assert_eq!(config.transcription.engine, TranscriptionEngineKind::OpenAI);
    assert_eq!(config.transcription.language.as_deref(), Some("fr"));
    assert_eq!(config.log_level, LogLevel::Warn);
    Ok(())
}

#[test]
fn test_applyOverrides_withoutFlags_shouldKeepFileValues() -> Result<()> {
    let options = CommandLineOptions::try_parse_from(["wordcap", "in.mp4", "out.mp4"])?;
    let mut config = Config::default();
    config.captions.strict_timing = true;
    config.show_progress = true;

    options.apply_overrides(&mut config);

    assert!(config.captions.strict_timing);
    assert!(config.show_progress);
    assert_eq!(config.transcription.engine, TranscriptionEngineKind::WhisperCli);
    Ok(())
}

#[test]
fn test_loadConfig_withMissingFile_shouldWriteDefault() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = temp_dir.path().join("fresh.json");

    let config = load_config(&config_path)?;

    assert!(config_path.exists());
    assert_eq!(config.server.port, 5000);
    let written: Config = serde_json::from_str(&fs::read_to_string(&config_path)?)?;
    assert_eq!(written.media.ffmpeg_path, "ffmpeg");
    Ok(())
}

#[test]
fn test_loadConfig_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = common::create_test_file(temp_dir.path(), "broken.json", b"{ not json")?;

    let error = load_config(&config_path).unwrap_err();
    assert!(format!("{:#}", error).contains("Failed to parse config file"));
    Ok(())
}
