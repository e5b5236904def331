//! JSON request body for `/api/analyze`

use base64::{engine::general_purpose, Engine as _};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::analysis::decode_image;
use crate::error::AnalysisError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeImageRequest {
    /// Base64-encoded image, optionally as a `data:` URI
    #[serde(default)]
    pub image: Option<String>,
}

impl AnalyzeImageRequest {
    /// Decode the payload; `Ok(None)` when no image was sent.
    pub fn decode(&self) -> Result<Option<DynamicImage>, AnalysisError> {
        let payload = match self.image.as_deref().map(str::trim) {
            None | Some("") => return Ok(None),
            Some(payload) => payload,
        };

        let bytes = decode_base64_payload(payload)?;
        if bytes.is_empty() {
            return Ok(None);
        }
        decode_image(&bytes).map(Some)
    }
}

/// Strip a `data:<mime>;base64,` prefix if present, then decode
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, AnalysisError> {
    let encoded = match payload.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| AnalysisError::Decode("malformed data URI".to_string()))?,
        None => payload,
    };

    general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| AnalysisError::Decode(format!("invalid base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_data_uri() {
        assert_eq!(decode_base64_payload("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_base64_payload("data:image/png;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(matches!(
            decode_base64_payload("data:image/png;base64"),
            Err(AnalysisError::Decode(_))
        ));
        assert!(matches!(
            decode_base64_payload("!!not base64!!"),
            Err(AnalysisError::Decode(_))
        ));
    }

    #[test]
    fn test_missing_image_is_none() {
        assert!(AnalyzeImageRequest::default().decode().unwrap().is_none());
        let blank = AnalyzeImageRequest {
            image: Some("   ".to_string()),
        };
        assert!(blank.decode().unwrap().is_none());
    }
}
