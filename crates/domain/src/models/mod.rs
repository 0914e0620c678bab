//! Domain models.

pub mod account;
pub mod alert;
pub mod family_event;
pub mod link_request;
pub mod link_token;
pub mod location;
pub mod relationship;

pub use account::{AccountRole, AccountSummary};
pub use alert::{AlertEvent, AlertKind, CreateAlertRequest};
pub use family_event::FamilyEvent;
pub use link_request::{
    ChildLinkStatusResponse, LinkRequest, LinkRequestState, LinkStatus, ParentSummary,
    PendingRequestSummary, RedeemCodeRequest, RedeemOutcome,
};
pub use link_token::{generate_link_code, GenerateCodeResponse, LinkToken, LINK_CODE_TTL_MINUTES};
pub use location::{LocationSample, UploadLocationRequest};
pub use relationship::{LinkedChildSummary, Relationship};
