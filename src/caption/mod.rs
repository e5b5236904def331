//! Image captioning
//!
//! The [`Captioner`] trait is the seam the analyzer depends on;
//! [`BlipCaptioner`] is the production implementation backed by candle.

pub mod beam;
pub mod blip;
pub mod preprocess;

use std::sync::Arc;

use image::DynamicImage;

use crate::error::CaptionResult;

pub use blip::{BlipCaptioner, BlipVariant};

/// Maps an image to a natural-language caption.
///
/// Implementations must not mutate shared state observable across calls.
/// An empty caption is a valid result.
#[cfg_attr(test, mockall::automock)]
pub trait Captioner: Send + Sync {
    fn generate(&self, image: &DynamicImage) -> CaptionResult<String>;
}

impl<T: Captioner + ?Sized> Captioner for Arc<T> {
    fn generate(&self, image: &DynamicImage) -> CaptionResult<String> {
        (**self).generate(image)
    }
}

/// Decoding settings for caption generation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub num_beams: usize,
    /// Maximum output length in tokens, start token included
    pub max_length: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            num_beams: 5,
            max_length: 50,
        }
    }
}
