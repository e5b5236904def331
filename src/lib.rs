//! BLIP image captioning with derived image properties.
//!
//! - [`caption`]: the pretrained captioning model behind the [`caption::Captioner`] trait
//! - [`analysis`]: caption plus metadata, with all failures folded into the result
//! - [`web`]: the upload form and HTTP endpoints

pub mod analysis;
pub mod caption;
pub mod config;
pub mod error;
pub mod web;

pub use analysis::{AnalysisOutcome, AnalysisReport, ImageAnalyzer, ModelInfo};
pub use caption::{BlipCaptioner, Captioner};
pub use error::{AnalysisError, CaptionError};
