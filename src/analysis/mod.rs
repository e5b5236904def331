//! Caption plus metadata analysis of a single image
//!
//! [`ImageAnalyzer::analyze`] is the fault boundary: every failure below it
//! is turned into [`AnalysisOutcome::Failure`], so callers only ever see a
//! caption text and a JSON record.

pub mod properties;
pub mod report;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::caption::preprocess::ensure_rgb;
use crate::caption::Captioner;
use crate::error::AnalysisError;

pub use properties::{ImageProperties, ResolutionQuality};
pub use report::{AnalysisReport, ModelInfo};

pub const MISSING_IMAGE_MESSAGE: &str = "Please upload an image first.";
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid analysis data format";

/// Result of one analysis call
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Success {
        caption: String,
        report: AnalysisReport,
    },
    Failure {
        message: String,
    },
}

impl AnalysisOutcome {
    pub fn from_error(err: &AnalysisError) -> Self {
        let message = match err {
            AnalysisError::MissingInput => MISSING_IMAGE_MESSAGE.to_string(),
            AnalysisError::Decode(_) | AnalysisError::Join(_) => {
                format!("Error processing image: {}", err)
            }
            _ => format!("Error analyzing image with BLIP: {}", err),
        };
        Self::Failure { message }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Caption on success, error text otherwise
    pub fn text(&self) -> &str {
        match self {
            Self::Success { caption, .. } => caption,
            Self::Failure { message } => message,
        }
    }

    /// Split into the display text and the structured record.
    ///
    /// A record that does not serialize to a JSON object is replaced with
    /// the invalid-format error record.
    pub fn into_parts(self) -> (String, Value) {
        match self {
            Self::Success { caption, report } => {
                let record = serde_json::to_value(&report);
                checked_record(caption, record)
            }
            Self::Failure { message } => {
                let record = error_record(&message);
                (message, record)
            }
        }
    }
}

/// `{"error": message}`
pub fn error_record(message: &str) -> Value {
    json!({ "error": message })
}

fn checked_record(caption: String, record: serde_json::Result<Value>) -> (String, Value) {
    match record {
        Ok(value @ Value::Object(_)) => (caption, value),
        Ok(other) => {
            warn!("Analysis record is not an object: {}", other);
            (caption, error_record(INVALID_FORMAT_MESSAGE))
        }
        Err(e) => {
            warn!("Analysis record failed to serialize: {}", e);
            (caption, error_record(INVALID_FORMAT_MESSAGE))
        }
    }
}

/// Wire shape returned to the browser form and API clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResponse {
    pub caption: String,
    pub analysis: Value,
}

impl From<AnalysisOutcome> for AnalysisResponse {
    fn from(outcome: AnalysisOutcome) -> Self {
        let (caption, analysis) = outcome.into_parts();
        Self { caption, analysis }
    }
}

/// Decode an uploaded image from encoded bytes
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, AnalysisError> {
    image::load_from_memory(bytes).map_err(|e| AnalysisError::Decode(e.to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Captions images and derives their metadata
pub struct ImageAnalyzer<C> {
    captioner: C,
    model_info: ModelInfo,
}

impl<C: Captioner> ImageAnalyzer<C> {
    pub fn new(captioner: C, model_info: ModelInfo) -> Self {
        Self {
            captioner,
            model_info,
        }
    }

    pub fn model_info(&self) -> &ModelInfo {
        &self.model_info
    }

    /// Analyze an image; `None` reports the missing-input message without
    /// touching the model.
    pub fn analyze(&self, image: Option<&DynamicImage>) -> AnalysisOutcome {
        let Some(image) = image else {
            debug!("Analysis requested without an image");
            return AnalysisOutcome::from_error(&AnalysisError::MissingInput);
        };

        let start = Instant::now();
        match self.try_analyze(image) {
            Ok(report) => {
                info!(
                    "Captioned {} in {} ms: {}",
                    report.image_properties.dimensions,
                    start.elapsed().as_millis(),
                    report.blip_caption
                );
                AnalysisOutcome::Success {
                    caption: report.blip_caption.clone(),
                    report,
                }
            }
            Err(e) => {
                warn!("Image analysis failed: {}", e);
                AnalysisOutcome::from_error(&e)
            }
        }
    }

    /// Read an image file and analyze it
    pub fn analyze_file(&self, path: &Path) -> AnalysisOutcome {
        match image::open(path) {
            Ok(image) => self.analyze(Some(&image)),
            Err(e) => AnalysisOutcome::from_error(&AnalysisError::Decode(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn try_analyze(&self, image: &DynamicImage) -> Result<AnalysisReport, AnalysisError> {
        let (width, height) = image.dimensions();
        debug!("Analyzing {}x{} image ({:?})", width, height, image.color());
        let image_properties = ImageProperties::from_dimensions(width, height)?;

        let rgb = ensure_rgb(image);
        let caption = panic::catch_unwind(AssertUnwindSafe(|| self.captioner.generate(&rgb)))
            .map_err(|payload| AnalysisError::Panicked(panic_message(payload.as_ref())))??;

        Ok(AnalysisReport::new(
            caption,
            image_properties,
            self.model_info.clone(),
        ))
    }
}
