//! Serializable analysis record

use chrono::Local;
use serde::Serialize;

use super::properties::ImageProperties;

pub const BLIP_MODEL_TYPE: &str = "BLIP (Bootstrapping Language-Image Pre-training)";
pub const BLIP_CAPABILITIES: &str = "Content-aware image captioning";

/// Identity of the captioning model, fixed for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub model_type: String,
    pub capabilities: String,
}

impl ModelInfo {
    pub fn blip(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            model_type: BLIP_MODEL_TYPE.to_string(),
            capabilities: BLIP_CAPABILITIES.to_string(),
        }
    }
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self::blip(crate::config::DEFAULT_MODEL_ID)
    }
}

/// Successful analysis of one image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub blip_caption: String,
    pub image_properties: ImageProperties,
    pub model_info: ModelInfo,
    pub analysis_timestamp: String,
}

impl AnalysisReport {
    pub fn new(caption: String, image_properties: ImageProperties, model_info: ModelInfo) -> Self {
        Self {
            blip_caption: caption,
            image_properties,
            model_info,
            analysis_timestamp: timestamp_now(),
        }
    }
}

/// Local wall-clock time as ISO-8601 with microseconds
pub fn timestamp_now() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_timestamp_is_iso8601() {
        let ts = timestamp_now();
        assert!(NaiveDateTime::parse_from_str(&ts, "%Y-%m-%dT%H:%M:%S%.f").is_ok(), "{ts}");
    }

    #[test]
    fn test_report_shape() {
        let report = AnalysisReport::new(
            "a dog on a beach".to_string(),
            ImageProperties::from_dimensions(640, 480).unwrap(),
            ModelInfo::default(),
        );
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["blip_caption"], "a dog on a beach");
        assert_eq!(value["image_properties"]["dimensions"], "640x480");
        assert_eq!(
            value["model_info"]["model_name"],
            "Salesforce/blip-image-captioning-base"
        );
        assert_eq!(value["model_info"]["model_type"], BLIP_MODEL_TYPE);
        assert_eq!(value["model_info"]["capabilities"], BLIP_CAPABILITIES);
        assert!(value["analysis_timestamp"].is_string());
    }
}
