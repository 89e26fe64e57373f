//! Text extraction from photographed word lists.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;

/// Responses longer than this are refused rather than parsed.
pub const MAX_RESPONSE_CHARS: usize = 100_000;

const INSTRUCTION: &str = "Extract every vocabulary pair from this image. \
Write one pair per line as `word: meaning`. Output only the pairs, no commentary.";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OcrError {
    #[error("OCR service is rate limiting requests")]
    RateLimited,
    #[error("OCR service rejected the API key")]
    Unauthorized,
    #[error("OCR service returned status {0}")]
    Status(u16),
    #[error("OCR response had an unexpected shape")]
    MalformedResponse,
    #[error("OCR response was too large")]
    OversizedResponse,
    #[error("OCR service found no text")]
    EmptyResponse,
    #[error(transparent)]
    Network(#[from] reqwest::Error),
}

#[derive(Clone, Debug)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let mime_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            Some("heic") => "image/heic",
            _ => "image/jpeg",
        };
        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image: &ImagePayload) -> Result<String, OcrError>;
}

#[derive(Clone, Debug)]
pub struct OcrConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl OcrConfig {
    /// `FLASHCARDS_API_KEY` wins over the stored key.
    #[must_use]
    pub fn from_env_or(stored_key: Option<String>) -> Option<Self> {
        let api_key = env::var("FLASHCARDS_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or(stored_key)?;
        let base_url = env::var("FLASHCARDS_OCR_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
        let model = env::var("FLASHCARDS_OCR_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

#[derive(Clone)]
pub struct GeminiExtractor {
    client: Client,
    config: OcrConfig,
}

impl GeminiExtractor {
    #[must_use]
    pub fn new(config: OcrConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl TextExtractor for GeminiExtractor {
    async fn extract_text(&self, image: &ImagePayload) -> Result<String, OcrError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let payload = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: INSTRUCTION.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: general_purpose::STANDARD.encode(&image.data),
                        },
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(OcrError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(OcrError::Unauthorized),
            s if !s.is_success() => return Err(OcrError::Status(s.as_u16())),
            _ => {}
        }
        if response
            .content_length()
            .is_some_and(|len| len as usize > MAX_RESPONSE_CHARS * 4)
        {
            return Err(OcrError::OversizedResponse);
        }
        let body = response.text().await?;
        text_from_body(&body)
    }
}

fn text_from_body(body: &str) -> Result<String, OcrError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|_| OcrError::MalformedResponse)?;
    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or(OcrError::EmptyResponse)?;
    let text: String = candidate
        .content
        .ok_or(OcrError::MalformedResponse)?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if text.is_empty() {
        return Err(OcrError::EmptyResponse);
    }
    if text.chars().count() > MAX_RESPONSE_CHARS {
        return Err(OcrError::OversizedResponse);
    }
    Ok(text.to_string())
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_candidate_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"apple: りんご"},{"text":"banana: バナナ\n"}]}}]}"#;
        assert_eq!(
            text_from_body(body).unwrap(),
            "apple: りんご\nbanana: バナナ"
        );
    }

    #[test]
    fn classifies_bad_bodies() {
        assert!(matches!(
            text_from_body("<html>"),
            Err(OcrError::MalformedResponse)
        ));
        assert!(matches!(
            text_from_body(r#"{"candidates":[]}"#),
            Err(OcrError::EmptyResponse)
        ));
        assert!(matches!(
            text_from_body(r#"{"candidates":[{}]}"#),
            Err(OcrError::MalformedResponse)
        ));
        assert!(matches!(
            text_from_body(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#),
            Err(OcrError::EmptyResponse)
        ));
    }

    #[test]
    fn refuses_oversized_text() {
        let big = "x".repeat(MAX_RESPONSE_CHARS + 1);
        let body = serde_json::json!({"candidates":[{"content":{"parts":[{"text": big}]}}]});
        assert!(matches!(
            text_from_body(&body.to_string()),
            Err(OcrError::OversizedResponse)
        ));
    }

    #[test]
    fn mime_type_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("list.PNG");
        std::fs::write(&p, b"img").unwrap();
        let payload = ImagePayload::from_path(&p).unwrap();
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.data, b"img");
    }
}
