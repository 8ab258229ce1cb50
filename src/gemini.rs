//! Gateway to the Gemini `generateContent` endpoint.
//!
//! Two model configurations share one retry policy: the strict-JSON model is
//! tried first, the plain-text model only after the first mode has exhausted
//! its attempts. Attempts are never mixed between modes.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Fixed system instruction shared by both model modes.
const SYSTEM_INSTRUCTION: &str =
    "너는 회의록을 구조적 JSON으로 추출하는 비서이다. 반드시 유효한 JSON만 출력한다.";

const TEMPERATURE: f32 = 0.2;
const MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    system_instruction: RequestContent<'a>,
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    /// `application/json` in strict-JSON mode, absent in plain-text mode.
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

/// The response shapes the backend is known to produce, resolved by explicit
/// pattern match in [`extract_text`] instead of runtime attribute probing.
#[derive(Debug, Default, Deserialize)]
pub struct ModelResponse {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InlineData {
    #[serde(default)]
    pub data: Option<String>,
}

/// Pulls usable text out of a model response, first match wins:
/// a non-empty top-level text field, then per candidate part either the part
/// text or its inline base64 payload decoded lossily as UTF-8. Parts whose
/// payload fails base64 decoding are skipped.
pub fn extract_text(response: &ModelResponse) -> Result<String> {
    if let Some(text) = &response.text {
        if !text.is_empty() {
            return Ok(text.clone());
        }
    }
    for candidate in &response.candidates {
        let Some(content) = &candidate.content else {
            continue;
        };
        for part in &content.parts {
            if let Some(text) = &part.text {
                if !text.is_empty() {
                    return Ok(text.clone());
                }
            }
            if let Some(data) = part.inline_data.as_ref().and_then(|d| d.data.as_deref()) {
                if let Ok(bytes) = BASE64.decode(data) {
                    return Ok(String::from_utf8_lossy(&bytes).into_owned());
                }
            }
        }
    }
    Err(Error::EmptyResponse)
}

/// Wraps the two configured model modes behind one `call` entry point.
pub struct ModelGateway {
    client: Client,
    base_url: String,
    api_key: String,
    json_model: String,
    text_model: String,
}

impl ModelGateway {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: API_BASE.to_string(),
            api_key: config.api_key.clone(),
            json_model: config.json_model.clone(),
            text_model: config.text_model.clone(),
        }
    }

    /// Sends `prompt` to the backend, trying the strict-JSON model up to
    /// `retry_each + 1` times and only then the plain-text model the same
    /// way, with a 1s-times-attempt-number pause between attempts. Fails
    /// with [`Error::Generation`] only when both modes are exhausted.
    pub async fn call(&self, prompt: &str, retry_each: u32) -> Result<String> {
        let json_err = match self.attempt_mode(&self.json_model, true, prompt, retry_each).await {
            Ok(text) => return Ok(text),
            Err(e) => e,
        };
        warn!("strict-JSON mode exhausted ({json_err}), switching to plain-text mode");
        let text_err = match self.attempt_mode(&self.text_model, false, prompt, retry_each).await {
            Ok(text) => return Ok(text),
            Err(e) => e,
        };
        Err(Error::Generation {
            json_mode: json_err,
            text_mode: text_err,
        })
    }

    /// Runs the retry loop for one model mode. Returns the last error message
    /// when every attempt failed.
    async fn attempt_mode(
        &self,
        model: &str,
        strict_json: bool,
        prompt: &str,
        retry_each: u32,
    ) -> std::result::Result<String, String> {
        let mut last_err = String::new();
        for attempt in 0..=retry_each {
            match self.generate(model, strict_json, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(
                        "model {} attempt {}/{} failed: {}",
                        model,
                        attempt + 1,
                        retry_each + 1,
                        e
                    );
                    last_err = e.to_string();
                }
            }
            if attempt < retry_each {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
        }
        Err(last_err)
    }

    /// One HTTP round trip to `generateContent` plus text extraction.
    async fn generate(&self, model: &str, strict_json: bool, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/{model}:generateContent?key={}",
            self.base_url, self.api_key
        );
        let body = GenerateRequest {
            system_instruction: RequestContent {
                role: None,
                parts: vec![RequestPart {
                    text: SYSTEM_INSTRUCTION,
                }],
            },
            contents: vec![RequestContent {
                role: Some("user"),
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: strict_json.then_some("application/json"),
            },
        };

        info!("sending request to model {model} (strict_json={strict_json})");
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(Error::Api(format!("{status}: {detail}")));
        }
        let parsed: ModelResponse = response.json().await?;
        extract_text(&parsed)
    }
}

/// 1 second times the attempt number (1-based) between attempts in a mode.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt) + 1)
}
