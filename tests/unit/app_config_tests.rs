/*!
 * Tests for application configuration functionality
 */

use std::path::PathBuf;
use std::str::FromStr;

use wordcap::app_config::{Config, LogLevel, TranscriptionEngineKind};

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.media.ffmpeg_path, "ffmpeg");
    assert_eq!(config.transcription.engine, TranscriptionEngineKind::WhisperCli);
    assert_eq!(config.transcription.whisper_path, "whisper");
    assert_eq!(config.transcription.get_model(), "medium");
    assert_eq!(config.transcription.timeout_secs, 600);
    assert!(!config.captions.strict_timing);
    assert!(!config.keep_intermediates);
    assert!(config.show_progress);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_getModel_withOpenAiEngine_shouldDefaultToWhisper1() {
    let mut config = Config::default();
    config.transcription.engine = TranscriptionEngineKind::OpenAI;
    assert_eq!(config.transcription.get_model(), "whisper-1");

    config.transcription.model = "  gpt-4o-transcribe ".to_string();
    assert_eq!(config.transcription.get_model(), "gpt-4o-transcribe");
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.media.ffmpeg_path = " ".to_string();
    assert!(config.validate().is_err());
    config.media.ffmpeg_path = "ffmpeg".to_string();

    config.transcription.language = Some("zzzz".to_string());
    assert!(config.validate().is_err());
    config.transcription.language = Some("fre".to_string());
    assert!(config.validate().is_ok());

    config.transcription.whisper_path = String::new();
    assert!(config.validate().is_err());
    config.transcription.whisper_path = "whisper".to_string();

    config.transcription.engine = TranscriptionEngineKind::OpenAI;
    config.transcription.api_key = "sk-test".to_string();
    assert!(config.validate().is_ok());

    config.transcription.timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_engineLanguage_withBibliographicCode_shouldUseTwoLetterCode() {
    let mut config = Config::default();
    assert_eq!(config.transcription.engine_language(), None);

    config.transcription.language = Some("ger".to_string());
    assert_eq!(config.transcription.engine_language(), Some("de".to_string()));
}

#[test]
fn test_config_deserialize_withPartialJson_shouldFillDefaults() {
    let json = r#"{
        "transcription": { "engine": "openai", "api_key": "sk-test" },
        "captions": { "strict_timing": true },
        "work_dir": "/tmp/wordcap-tests",
        "log_level": "debug"
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.transcription.engine, TranscriptionEngineKind::OpenAI);
    assert_eq!(config.transcription.endpoint, "https://api.openai.com/v1");
    assert!(config.captions.strict_timing);
    assert_eq!(config.media.ffmpeg_path, "ffmpeg");
    assert_eq!(config.work_root(), PathBuf::from("/tmp/wordcap-tests"));
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.show_progress);
}

#[test]
fn test_config_serialize_shouldUseKebabCaseEngineNames() {
    let config = Config::default();
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"engine\":\"whisper-cli\""));

    let roundtrip: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(roundtrip.transcription.engine, TranscriptionEngineKind::WhisperCli);
}

#[test]
fn test_engineKind_fromStr_shouldAcceptKnownNames() {
    assert_eq!(TranscriptionEngineKind::from_str("whisper").unwrap(), TranscriptionEngineKind::WhisperCli);
    assert_eq!(TranscriptionEngineKind::from_str("OpenAI").unwrap(), TranscriptionEngineKind::OpenAI);
    assert!(TranscriptionEngineKind::from_str("deepgram").is_err());
    assert_eq!(TranscriptionEngineKind::OpenAI.display_name(), "OpenAI");
    assert_eq!(TranscriptionEngineKind::WhisperCli.to_string(), "whisper-cli");
}

#[test]
fn test_workRoot_withoutOverride_shouldEndInWordcap() {
    let config = Config::default();
    assert!(config.work_root().ends_with("wordcap"));
}

#[test]
fn test_serverConfig_default_shouldListenLocallyOnPort5000() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 5000);
    assert_eq!(config.server.max_concurrent_runs, 1);
    assert_eq!(config.server.max_upload_bytes(), 1024 * 1024 * 1024);
}

#[test]
fn test_serverConfig_deserialize_withPartialServer_shouldFillDefaults() {
    let config: Config = serde_json::from_str(r#"{ "server": { "port": 8080 } }"#).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.max_upload_mb, 1024);

    let config: Config = serde_json::from_str("{}").unwrap();
    assert_eq!(config.server.port, 5000);
}

#[test]
fn test_serverConfig_validation_withZeroLimits_shouldFail() {
    let mut config = Config::default();
    config.server.max_upload_mb = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.server.max_concurrent_runs = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.server.host = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.server.max_upload_mb = u64::MAX;
    assert_eq!(config.server.max_upload_bytes(), u64::MAX);
}
