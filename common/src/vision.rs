//! Price-tag analysis results
//!
//! The vision service answers with a loosely shaped JSON object. It is
//! parsed into `RawVisionResponse` and then normalized once, here, into a
//! `VisionDetection` that the rest of the code can trust.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Shortest digit string accepted as an EAN
pub const MIN_EAN_LEN: usize = 7;

/// Live scanning only accepts item names longer than this
pub const MIN_FAST_NAME_LEN: usize = 2;

/// Trade-off between latency and thoroughness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Live camera frames: smaller image, stricter acceptance
    Fast,
    #[default]
    Thorough,
}

/// Response as returned by the service; every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawVisionResponse {
    pub item_name: Option<String>,
    pub price: Option<f64>,
    pub ean_code: Option<String>,
}

/// Normalized detection. At least one field is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionDetection {
    pub item_name: Option<String>,
    pub price: Option<f64>,
    pub ean_code: Option<String>,
}

impl RawVisionResponse {
    /// Normalize the raw fields. Returns `None` when nothing usable is left
    /// (or, in fast mode, when the item name is too short to trust).
    pub fn normalize(&self, mode: AnalysisMode) -> Option<VisionDetection> {
        let item_name = self
            .item_name
            .as_deref()
            .map(capitalize_name)
            .filter(|n| !n.is_empty());
        let price = self.price.filter(|p| p.is_finite() && *p > 0.0);
        let ean_code = self.ean_code.as_deref().and_then(normalize_ean);

        if mode == AnalysisMode::Fast
            && !item_name
                .as_ref()
                .is_some_and(|n| n.chars().count() > MIN_FAST_NAME_LEN)
        {
            return None;
        }

        if item_name.is_none() && price.is_none() && ean_code.is_none() {
            return None;
        }

        Some(VisionDetection {
            item_name,
            price,
            ean_code,
        })
    }
}

/// Keep digits only; shorter than `MIN_EAN_LEN` counts as absent.
pub fn normalize_ean(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() >= MIN_EAN_LEN {
        Some(digits)
    } else {
        None
    }
}

/// "  ORCHIDEA phalaenopsis " → "Orchidea phalaenopsis"
pub fn capitalize_name(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Pull the JSON object out of a model reply.
///
/// Extraction order:
/// 1. a ```json ... ``` block
/// 2. the outermost `{...}`
pub fn extract_json_object(response: &str) -> Result<&str> {
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7;
        if let Some(end_offset) = response[start..].find("```") {
            return Ok(response[start..start + end_offset].trim());
        }
    }

    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) {
        if end > start {
            return Ok(&response[start..=end]);
        }
    }

    Err(Error::Parse("JSON non trovato nella risposta".into()))
}

/// Parse a model reply into the raw response shape
pub fn parse_vision_response(response: &str) -> Result<RawVisionResponse> {
    let json = extract_json_object(response)?;
    serde_json::from_str(json).map_err(|e| Error::Parse(format!("risposta analisi non valida: {}", e)))
}

/// Base64 payload of a data URL ("data:image/jpeg;base64,...") or the input
/// unchanged when it is already bare base64.
pub fn strip_data_url(data: &str) -> &str {
    if data.starts_with("data:") {
        data.split_once(',').map(|(_, payload)| payload).unwrap_or(data)
    } else {
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_full_response() {
        let raw = RawVisionResponse {
            item_name: Some("  ORCHIDEA phalaenopsis ".into()),
            price: Some(12.9),
            ean_code: Some("8 010896-000127".into()),
        };
        let detection = raw.normalize(AnalysisMode::Thorough).unwrap();
        assert_eq!(detection.item_name.as_deref(), Some("Orchidea phalaenopsis"));
        assert_eq!(detection.price, Some(12.9));
        assert_eq!(detection.ean_code.as_deref(), Some("8010896000127"));
    }

    #[test]
    fn test_short_ean_is_absent() {
        assert_eq!(normalize_ean("123456"), None);
        assert_eq!(normalize_ean("EAN: 1234567"), Some("1234567".into()));
    }

    #[test]
    fn test_nothing_usable_is_no_detection() {
        let raw = RawVisionResponse {
            item_name: Some("   ".into()),
            price: Some(0.0),
            ean_code: Some("12".into()),
        };
        assert!(raw.normalize(AnalysisMode::Thorough).is_none());
        assert!(RawVisionResponse::default().normalize(AnalysisMode::Thorough).is_none());
    }

    #[test]
    fn test_fast_mode_needs_plausible_name() {
        let raw = RawVisionResponse {
            item_name: Some("ab".into()),
            price: Some(3.5),
            ean_code: None,
        };
        assert!(raw.normalize(AnalysisMode::Fast).is_none());
        assert!(raw.normalize(AnalysisMode::Thorough).is_some());
    }

    #[test]
    fn test_parse_vision_response_plain() {
        let raw = parse_vision_response(r#"{"itemName": "Rose", "price": 9.9}"#).unwrap();
        assert_eq!(raw.item_name.as_deref(), Some("Rose"));
        assert_eq!(raw.price, Some(9.9));
        assert_eq!(raw.ean_code, None);
    }

    #[test]
    fn test_parse_vision_response_code_block() {
        let reply = "Ecco:\n```json\n{\"eanCode\": \"8010896000127\", \"price\": null}\n```";
        let raw = parse_vision_response(reply).unwrap();
        assert_eq!(raw.ean_code.as_deref(), Some("8010896000127"));
        assert_eq!(raw.price, None);
    }

    #[test]
    fn test_parse_vision_response_error() {
        assert!(matches!(parse_vision_response("nessun dato"), Err(Error::Parse(_))));
        assert!(matches!(parse_vision_response("{not json}"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_strip_data_url() {
        assert_eq!(strip_data_url("data:image/jpeg;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url("AAAA"), "AAAA");
    }
}
