//! Error types for captioning and analysis

use thiserror::Error;

/// Failures raised while loading or running the captioning model
#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("HuggingFace Hub error: {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),

    #[error("Tensor operation failed: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Decoding failed: {0}")]
    Decoding(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

pub type CaptionResult<T> = Result<T, CaptionError>;

/// Failures surfaced by the analyzer boundary
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("no image provided")]
    MissingInput,

    #[error(transparent)]
    Caption(#[from] CaptionError),

    #[error("image has invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("captioning panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Decode(String),

    #[error("analysis task failed: {0}")]
    Join(String),
}
