//! Link-request domain models.
//!
//! A link request is created when a child redeems a valid pairing code and
//! lives until the issuing parent resolves it (or it expires).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle state of a link request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRequestState {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl std::fmt::Display for LinkRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LinkRequestState::Pending => "pending",
            LinkRequestState::Approved => "approved",
            LinkRequestState::Rejected => "rejected",
            LinkRequestState::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// A child's request to be linked to a parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LinkRequest {
    pub id: Uuid,
    pub child_id: Uuid,
    pub parent_id: Uuid,
    pub state: LinkRequestState,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

lazy_static::lazy_static! {
    static ref LINK_CODE_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-HJ-NP-Z2-9]{6}$").unwrap();
}

/// Request payload for redeeming a pairing code.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RedeemCodeRequest {
    /// The 6-character pairing code shown on the parent's device.
    #[validate(regex(
        path = *LINK_CODE_REGEX,
        message = "Invalid code format. Expected 6 characters (A-Z, 2-9)"
    ))]
    pub code: String,
}

/// Result of a successful redemption: the pending request plus the parent's
/// display name so the child UI can confirm without a second round trip.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RedeemOutcome {
    pub request: LinkRequest,
    pub parent_display_name: String,
}

/// A pending request as listed to the issuing parent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PendingRequestSummary {
    pub id: Uuid,
    pub child_id: Uuid,
    pub child_display_name: String,
    pub child_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Link status of a child account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    None,
    Pending,
    Linked,
}

/// Parent info attached to a child's link status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ParentSummary {
    pub id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
}

/// Response for a child's own link status query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ChildLinkStatusResponse {
    pub status: LinkStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeem_request_validation() {
        let valid = RedeemCodeRequest {
            code: "A7K2M9".to_string(),
        };
        assert!(valid.validate().is_ok());

        let too_short = RedeemCodeRequest {
            code: "A7K2M".to_string(),
        };
        assert!(too_short.validate().is_err());

        let ambiguous = RedeemCodeRequest {
            code: "A7K2M0".to_string(),
        };
        assert!(ambiguous.validate().is_err());

        let lowercase = RedeemCodeRequest {
            code: "a7k2m9".to_string(),
        };
        assert!(lowercase.validate().is_err());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(LinkRequestState::Pending.to_string(), "pending");
        assert_eq!(LinkRequestState::Approved.to_string(), "approved");
        assert_eq!(LinkRequestState::Rejected.to_string(), "rejected");
        assert_eq!(LinkRequestState::Expired.to_string(), "expired");
    }

    #[test]
    fn test_status_serialization_omits_absent_parent() {
        let response = ChildLinkStatusResponse {
            status: LinkStatus::None,
            parent: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"status":"none"}"#);
    }
}
