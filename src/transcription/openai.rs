use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::errors::TranscriptionError;
use crate::media::ProcessOutput;
use crate::transcript::{Segment, TranscriptionResult, Word};
use crate::transcription::TranscriptionEngine;

/// Client for OpenAI-compatible transcription endpoints
pub struct OpenAiEngine {
    /// HTTP client for API requests
    client: Client,
    /// Base URL, e.g. https://api.openai.com/v1
    endpoint: String,
    /// API key for authentication
    api_key: String,
    /// Model name
    model: String,
    /// Forced language, auto-detected when absent
    language: Option<String>,
}

/// verbose_json response with word and segment granularity
#[derive(Debug, Deserialize)]
pub struct VerboseTranscription {
    /// Full transcript text
    #[serde(default)]
    pub text: String,
    /// Detected language
    #[serde(default)]
    pub language: Option<String>,
    /// Segment timings
    #[serde(default)]
    pub segments: Option<Vec<ApiSegment>>,
    /// Word timings, flat across the whole file
    #[serde(default)]
    pub words: Option<Vec<ApiWord>>,
}

/// Segment entry of a verbose_json response
#[derive(Debug, Deserialize)]
pub struct ApiSegment {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

/// Word entry of a verbose_json response
#[derive(Debug, Deserialize)]
pub struct ApiWord {
    pub word: String,
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl OpenAiEngine {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        language: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, TranscriptionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TranscriptionError::RequestFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            language,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/audio/transcriptions", self.endpoint.trim_end_matches('/'))
    }

    async fn request(&self, audio: &Path) -> Result<TranscriptionResult, TranscriptionError> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| TranscriptionError::RequestFailed(e.to_string()))?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word")
            .text("timestamp_granularities[]", "segment");
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::RequestFailed(format!("Failed to send transcription request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(TranscriptionError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let body = response
            .json::<VerboseTranscription>()
            .await
            .map_err(|e| TranscriptionError::ParseError(e.to_string()))?;

        Ok(Self::into_result(body))
    }

    /// Attach the flat word list to segments by time
    ///
    /// A word belongs to the first segment that ends after it starts; the last
    /// segment takes whatever remains. Without segments all words form one.
    pub fn into_result(body: VerboseTranscription) -> TranscriptionResult {
        let api_words = body.words.unwrap_or_default();
        let api_segments = body.segments.unwrap_or_default();

        let words: Vec<Word> = api_words
            .into_iter()
            .map(|w| Word {
                text: w.word,
                start: w.start,
                end: w.end,
            })
            .collect();

        let segments = if api_segments.is_empty() {
            if words.is_empty() {
                Vec::new()
            } else {
                let start = words.iter().find_map(|w| w.start).unwrap_or(0.0);
                let end = words.iter().rev().find_map(|w| w.end).unwrap_or(start);
                vec![Segment::new(start, end, words)]
            }
        } else {
            let mut segments: Vec<Segment> = api_segments
                .into_iter()
                .map(|s| Segment {
                    start: s.start,
                    end: s.end,
                    text: s.text,
                    words: Vec::new(),
                })
                .collect();

            let last = segments.len() - 1;
            let mut index = 0;
            for word in words {
                if let Some(start) = word.start {
                    while index < last && start >= segments[index].end {
                        index += 1;
                    }
                }
                segments[index].words.push(word);
            }
            segments
        };

        TranscriptionResult {
            full_text: body.text,
            segments,
            language: body.language,
        }
    }
}

#[async_trait]
impl TranscriptionEngine for OpenAiEngine {
    fn name(&self) -> &str {
        "openai"
    }

    async fn transcribe(
        &self,
        audio: &Path,
        _invocations: &mut Vec<ProcessOutput>,
        cancel: &CancellationToken,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        tokio::select! {
            result = self.request(audio) => result,
            _ = cancel.cancelled() => Err(TranscriptionError::Cancelled),
        }
    }
}
