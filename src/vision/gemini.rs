//! Gemini price-tag analysis
//!
//! One `generateContent` call per image with a JSON response schema for
//! `{itemName, price, eanCode}`. The call is bounded by the configured
//! timeout.

use super::PreparedImage;
use crate::error::{FloraTrackError, Result};
use flora_track_common::vision::{parse_vision_response, strip_data_url};
use flora_track_common::RawVisionResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const PRICE_TAG_PROMPT: &str = "Analyze this image of a shelf price tag or product label. \
Extract the following information: 1. The specific product name (e.g. 'Orchidea Phalaenopsis', 'Rose Bouquet'). \
2. The price as a number. 3. The Barcode/EAN numbers if clearly visible. \
If you cannot find a field, leave it null.";

#[derive(Serialize)]
pub(crate) struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    InlineData { inline_data: InlineData },
    Text { text: String },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.parts.iter().find_map(|p| p.text.as_deref()))
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, timeout_seconds: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| FloraTrackError::VisionService(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            model,
            timeout: Duration::from_secs(timeout_seconds.max(1)),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.model)
    }

    pub(crate) fn build_request(image: &PreparedImage) -> GeminiRequest {
        GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: strip_data_url(&image.data).to_string(),
                        },
                    },
                    Part::Text {
                        text: PRICE_TAG_PROMPT.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                response_mime_type: "application/json".to_string(),
                response_schema: json!({
                    "type": "OBJECT",
                    "properties": {
                        "itemName": { "type": "STRING", "description": "Name of the plant or flower" },
                        "price": { "type": "NUMBER", "description": "Price value" },
                        "eanCode": { "type": "STRING", "description": "EAN or Barcode numbers" }
                    }
                }),
            },
        }
    }

    /// Send one image. Errors and timeouts are reported, never retried.
    pub async fn analyze(&self, image: &PreparedImage) -> Result<RawVisionResponse> {
        match tokio::time::timeout(self.timeout, self.call(image)).await {
            Ok(result) => result,
            Err(_) => Err(FloraTrackError::VisionTimeout(self.timeout.as_secs())),
        }
    }

    async fn call(&self, image: &PreparedImage) -> Result<RawVisionResponse> {
        let request = Self::build_request(image);
        let url = format!("{}?key={}", self.endpoint(), self.api_key);
        tracing::debug!(model = %self.model, bytes = image.data.len(), "calling vision service");

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| FloraTrackError::VisionService(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FloraTrackError::VisionService(format!(
                "stato HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| FloraTrackError::VisionService(e.without_url().to_string()))?;
        let text = payload
            .first_text()
            .ok_or_else(|| FloraTrackError::VisionService("risposta vuota".into()))?;

        parse_vision_response(text).map_err(|e| FloraTrackError::VisionService(e.to_string()))
    }
}
