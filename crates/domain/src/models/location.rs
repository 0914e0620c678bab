//! Location domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A position sample produced by the owning account's device.
///
/// Samples are immutable once written; corrections are new rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LocationSample {
    pub id: Uuid,
    pub user_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters, if the device reported one.
    pub accuracy_m: Option<f64>,
    /// When the device captured the sample.
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Request payload for uploading a position sample.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UploadLocationRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(custom(function = "shared::validation::validate_accuracy"))]
    pub accuracy_m: Option<f64>,

    /// Capture time; defaults to the server clock when omitted.
    pub recorded_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_request_validation() {
        let valid = UploadLocationRequest {
            latitude: 40.4168,
            longitude: -3.7038,
            accuracy_m: Some(12.5),
            recorded_at: None,
        };
        assert!(valid.validate().is_ok());

        let bad_lat = UploadLocationRequest {
            latitude: 91.0,
            longitude: 0.0,
            accuracy_m: None,
            recorded_at: None,
        };
        assert!(bad_lat.validate().is_err());

        let bad_accuracy = UploadLocationRequest {
            latitude: 0.0,
            longitude: 0.0,
            accuracy_m: Some(-1.0),
            recorded_at: None,
        };
        assert!(bad_accuracy.validate().is_err());
    }
}
