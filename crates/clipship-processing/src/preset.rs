//! Compression presets for network-optimized delivery.

use anyhow::{anyhow, Result};

/// Quality presets for video compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionPreset {
    /// Fastest encode, larger files
    Fast,
    #[default]
    Balanced,
    /// Slowest encode, smallest files at a given quality
    Quality,
}

impl CompressionPreset {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(CompressionPreset::Fast),
            "balanced" => Ok(CompressionPreset::Balanced),
            "quality" => Ok(CompressionPreset::Quality),
            _ => Err(anyhow!("Invalid compression preset: {}", s)),
        }
    }

    /// x264 speed preset
    pub fn x264_preset(self) -> &'static str {
        match self {
            CompressionPreset::Fast => "veryfast",
            CompressionPreset::Balanced => "medium",
            CompressionPreset::Quality => "slow",
        }
    }

    /// Constant rate factor (lower = higher quality)
    pub fn crf(self) -> u8 {
        match self {
            CompressionPreset::Fast => 28,
            CompressionPreset::Balanced => 24,
            CompressionPreset::Quality => 21,
        }
    }

    /// Audio bitrate in kbit/s
    pub fn audio_bitrate_kbps(self) -> u32 {
        match self {
            CompressionPreset::Fast => 96,
            CompressionPreset::Balanced => 128,
            CompressionPreset::Quality => 160,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parse() {
        assert_eq!(
            CompressionPreset::parse("fast").unwrap(),
            CompressionPreset::Fast
        );
        assert_eq!(
            CompressionPreset::parse("BALANCED").unwrap(),
            CompressionPreset::Balanced
        );
        assert_eq!(
            CompressionPreset::parse("quality").unwrap(),
            CompressionPreset::Quality
        );
        assert!(CompressionPreset::parse("invalid").is_err());
    }

    #[test]
    fn test_crf_values() {
        assert_eq!(CompressionPreset::Fast.crf(), 28);
        assert_eq!(CompressionPreset::Balanced.crf(), 24);
        assert_eq!(CompressionPreset::Quality.crf(), 21);
    }

    #[test]
    fn test_x264_presets() {
        assert_eq!(CompressionPreset::Fast.x264_preset(), "veryfast");
        assert_eq!(CompressionPreset::Balanced.x264_preset(), "medium");
        assert_eq!(CompressionPreset::Quality.x264_preset(), "slow");
    }
}
