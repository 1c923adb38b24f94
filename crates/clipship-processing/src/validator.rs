//! Media asset validation.

use clipship_core::{MediaAsset, ValidationError};

/// Validates captured assets against duration and size limits.
///
/// Pure and synchronous. The duration boundary is inclusive: an asset whose
/// duration equals the maximum passes; any strictly greater value fails.
pub struct MediaValidator {
    max_duration_secs: f64,
    max_size_bytes: u64,
}

impl MediaValidator {
    pub fn new(max_duration_secs: f64, max_size_bytes: u64) -> Self {
        Self {
            max_duration_secs,
            max_size_bytes,
        }
    }

    /// Validate duration (pre-compression).
    pub fn validate_duration(&self, duration_secs: f64) -> Result<(), ValidationError> {
        if duration_secs > self.max_duration_secs {
            return Err(ValidationError::DurationExceeded {
                actual: duration_secs,
                max: self.max_duration_secs,
            });
        }
        Ok(())
    }

    /// Validate byte size (post-compression the limit must also hold).
    pub fn validate_size(&self, size_bytes: u64) -> Result<(), ValidationError> {
        if size_bytes > self.max_size_bytes {
            return Err(ValidationError::SizeTooLarge {
                actual: size_bytes,
                max: self.max_size_bytes,
            });
        }
        Ok(())
    }

    /// Validate all aspects of an asset.
    pub fn validate(&self, asset: &MediaAsset) -> Result<(), ValidationError> {
        self.validate_duration(asset.duration_secs)?;
        self.validate_size(asset.size_bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_validator() -> MediaValidator {
        MediaValidator::new(30.0, 50 * 1024 * 1024)
    }

    fn asset(duration: f64, size: u64) -> MediaAsset {
        MediaAsset::new(PathBuf::from("/tmp/clip.mp4"), duration, size)
    }

    #[test]
    fn test_validate_duration_ok() {
        let validator = test_validator();
        assert!(validator.validate_duration(10.0).is_ok());
    }

    #[test]
    fn test_validate_duration_boundary_equal_passes() {
        let validator = test_validator();
        assert!(validator.validate_duration(30.0).is_ok());
    }

    #[test]
    fn test_validate_duration_just_over_fails() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_duration(30.000001),
            Err(ValidationError::DurationExceeded { .. })
        ));
    }

    #[test]
    fn test_validate_duration_carries_values() {
        let validator = test_validator();
        match validator.validate_duration(45.0) {
            Err(ValidationError::DurationExceeded { actual, max }) => {
                assert_eq!(actual, 45.0);
                assert_eq!(max, 30.0);
            }
            other => panic!("Expected DurationExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_size_too_large() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_size(51 * 1024 * 1024),
            Err(ValidationError::SizeTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_size_at_limit_passes() {
        let validator = test_validator();
        assert!(validator.validate_size(50 * 1024 * 1024).is_ok());
    }

    #[test]
    fn test_validate_all() {
        let validator = test_validator();
        assert!(validator.validate(&asset(10.0, 1024)).is_ok());
        assert!(validator.validate(&asset(45.0, 1024)).is_err());
        assert!(validator.validate(&asset(10.0, 60 * 1024 * 1024)).is_err());
    }
}
