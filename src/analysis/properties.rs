//! Deterministic image metadata derived from width and height only

use std::fmt;

use serde::Serialize;

use crate::error::AnalysisError;

/// Qualitative resolution tier, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ResolutionQuality {
    #[serde(rename = "low resolution")]
    Low,
    #[serde(rename = "standard definition")]
    Standard,
    #[serde(rename = "high definition")]
    High,
    #[serde(rename = "ultra-high definition")]
    UltraHigh,
}

impl ResolutionQuality {
    /// Thresholds are strict: exactly 2 MP is still low resolution.
    pub fn from_total_pixels(total_pixels: u64) -> Self {
        if total_pixels > 12_000_000 {
            Self::UltraHigh
        } else if total_pixels > 5_000_000 {
            Self::High
        } else if total_pixels > 2_000_000 {
            Self::Standard
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low resolution",
            Self::Standard => "standard definition",
            Self::High => "high definition",
            Self::UltraHigh => "ultra-high definition",
        }
    }
}

impl fmt::Display for ResolutionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Properties reported alongside the caption
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageProperties {
    /// `WIDTHxHEIGHT`
    pub dimensions: String,
    /// width / height rounded to two decimals
    pub aspect_ratio: f64,
    /// width * height with thousands separators
    pub total_pixels: String,
    pub resolution_quality: ResolutionQuality,
}

impl ImageProperties {
    pub fn from_dimensions(width: u32, height: u32) -> Result<Self, AnalysisError> {
        if width == 0 || height == 0 {
            return Err(AnalysisError::InvalidDimensions { width, height });
        }

        let total_pixels = u64::from(width) * u64::from(height);
        Ok(Self {
            dimensions: format!("{width}x{height}"),
            aspect_ratio: aspect_ratio(width, height),
            total_pixels: group_thousands(total_pixels),
            resolution_quality: ResolutionQuality::from_total_pixels(total_pixels),
        })
    }
}

/// width / height rounded to two decimal places.
///
/// Rounds the exact binary value, so a ratio like 1.125 becomes 1.12.
pub fn aspect_ratio(width: u32, height: u32) -> f64 {
    let ratio = f64::from(width) / f64::from(height);
    format!("{:.2}", ratio).parse().unwrap_or(ratio)
}

/// Format with `,` between groups of three digits
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_thresholds() {
        let cases = [
            (0, ResolutionQuality::Low),
            (2_000_000, ResolutionQuality::Low),
            (2_000_001, ResolutionQuality::Standard),
            (5_000_000, ResolutionQuality::Standard),
            (5_000_001, ResolutionQuality::High),
            (12_000_000, ResolutionQuality::High),
            (12_000_001, ResolutionQuality::UltraHigh),
        ];
        for (pixels, expected) in cases {
            assert_eq!(ResolutionQuality::from_total_pixels(pixels), expected, "{pixels}");
        }
    }

    #[test]
    fn test_tiers_are_ordered() {
        assert!(ResolutionQuality::Low < ResolutionQuality::Standard);
        assert!(ResolutionQuality::High < ResolutionQuality::UltraHigh);
    }

    #[test]
    fn test_aspect_ratio_rounding() {
        assert_eq!(aspect_ratio(1920, 1080), 1.78);
        assert_eq!(aspect_ratio(1080, 1920), 0.56);
        assert_eq!(aspect_ratio(500, 500), 1.0);
        // exact ties round to even
        assert_eq!(aspect_ratio(9, 8), 1.12);
        assert_eq!(aspect_ratio(1, 8), 0.12);
        assert_eq!(aspect_ratio(11, 8), 1.38);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(6_000_000), "6,000,000");
        assert_eq!(group_thousands(1_234_567_890), "1,234,567,890");
    }

    #[test]
    fn test_properties_for_3000x2000() {
        let props = ImageProperties::from_dimensions(3000, 2000).unwrap();
        assert_eq!(props.dimensions, "3000x2000");
        assert_eq!(props.total_pixels, "6,000,000");
        assert_eq!(props.aspect_ratio, 1.5);
        assert_eq!(props.resolution_quality, ResolutionQuality::High);
    }

    #[test]
    fn test_serialized_shape() {
        let props = ImageProperties::from_dimensions(1920, 1080).unwrap();
        let value = serde_json::to_value(&props).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "dimensions": "1920x1080",
                "aspect_ratio": 1.78,
                "total_pixels": "2,073,600",
                "resolution_quality": "standard definition",
            })
        );
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            ImageProperties::from_dimensions(0, 10),
            Err(AnalysisError::InvalidDimensions { width: 0, height: 10 })
        ));
        assert!(ImageProperties::from_dimensions(10, 0).is_err());
    }

    #[test]
    fn test_large_dimensions_do_not_overflow() {
        let props = ImageProperties::from_dimensions(u32::MAX, u32::MAX).unwrap();
        assert_eq!(props.resolution_quality, ResolutionQuality::UltraHigh);
    }
}
