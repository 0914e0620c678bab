//! Common validation utilities.

use validator::ValidationError;

/// Alphabet used for pairing codes. Excludes visually ambiguous characters
/// (0, O, 1, I).
pub const LINK_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a pairing code.
pub const LINK_CODE_LEN: usize = 6;

lazy_static::lazy_static! {
    static ref LINK_CODE_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-HJ-NP-Z2-9]{6}$").unwrap();
}

/// Validates that a pairing code has the expected format: 6 characters from
/// the restricted alphabet. Rejected here before any store access.
pub fn validate_link_code(code: &str) -> Result<(), ValidationError> {
    if LINK_CODE_REGEX.is_match(code) {
        Ok(())
    } else {
        let mut err = ValidationError::new("link_code_format");
        err.message = Some("Code must be 6 characters (A-Z and 2-9, no 0/O/1/I)".into());
        Err(err)
    }
}

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates that accuracy is non-negative.
pub fn validate_accuracy(accuracy: f64) -> Result<(), ValidationError> {
    if accuracy >= 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("accuracy_range");
        err.message = Some("Accuracy must be non-negative".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_link_code() {
        assert!(validate_link_code("A7K2M9").is_ok());
        assert!(validate_link_code("ZZZZZZ").is_ok());
        assert!(validate_link_code("234567").is_ok());
    }

    #[test]
    fn test_link_code_wrong_length() {
        assert!(validate_link_code("A7K2M").is_err());
        assert!(validate_link_code("A7K2M9X").is_err());
        assert!(validate_link_code("").is_err());
    }

    #[test]
    fn test_link_code_ambiguous_characters() {
        // 0, O, 1, I are excluded from the alphabet
        assert!(validate_link_code("A7K2M0").is_err());
        assert!(validate_link_code("A7K2MO").is_err());
        assert!(validate_link_code("A7K2M1").is_err());
        assert!(validate_link_code("A7K2MI").is_err());
    }

    #[test]
    fn test_link_code_lowercase_rejected() {
        assert!(validate_link_code("a7k2m9").is_err());
    }

    #[test]
    fn test_latitude_range() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(90.1).is_err());
        assert!(validate_latitude(-90.1).is_err());
    }

    #[test]
    fn test_longitude_range() {
        assert!(validate_longitude(0.0).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(180.1).is_err());
        assert!(validate_longitude(-180.1).is_err());
    }

    #[test]
    fn test_accuracy_range() {
        assert!(validate_accuracy(0.0).is_ok());
        assert!(validate_accuracy(12.5).is_ok());
        assert!(validate_accuracy(-0.1).is_err());
    }
}
