//! Image preprocessing for the BLIP vision encoder

use std::borrow::Cow;

use candle_core::{Device, Tensor};
use image::{imageops::FilterType, ColorType, DynamicImage, GenericImageView};

use crate::error::{CaptionError, CaptionResult};

/// Square input size expected by the BLIP vision tower
pub const BLIP_INPUT_SIZE: u32 = 384;

/// CLIP normalization mean used by the BLIP image processor
pub const MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std
pub const STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Borrow the image when it is already RGB8, otherwise convert a copy.
pub fn ensure_rgb(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    if image.color() == ColorType::Rgb8 {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8()))
    }
}

/// Normalized pixel values in CHW order.
///
/// Steps:
/// 1. Convert to RGB
/// 2. Resize to BLIP_INPUT_SIZE x BLIP_INPUT_SIZE (bicubic, no crop)
/// 3. Normalize: (pixel/255 - mean) / std
pub fn pixel_values(image: &DynamicImage) -> CaptionResult<Vec<f32>> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(CaptionError::InvalidImage(format!(
            "cannot preprocess a {width}x{height} image"
        )));
    }

    let rgb = ensure_rgb(image);
    let resized = rgb
        .resize_exact(BLIP_INPUT_SIZE, BLIP_INPUT_SIZE, FilterType::CatmullRom)
        .to_rgb8();

    let size = BLIP_INPUT_SIZE as usize;
    let plane = size * size;
    let mut values = vec![0f32; 3 * plane];

    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = y as usize * size + x as usize;
        for c in 0..3 {
            values[c * plane + offset] = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    Ok(values)
}

/// Build the `[1, 3, 384, 384]` input tensor on `device`.
pub fn to_tensor(image: &DynamicImage, device: &Device) -> CaptionResult<Tensor> {
    let size = BLIP_INPUT_SIZE as usize;
    let values = pixel_values(image)?;
    Ok(Tensor::from_vec(values, (1, 3, size, size), device)?)
}
