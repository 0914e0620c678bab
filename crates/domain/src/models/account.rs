//! Account domain model.
//!
//! Accounts are provisioned by the external identity provider at sign-up.
//! The role is chosen at registration and is immutable afterward.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of an account: guardian or dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Parent,
    Child,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Parent => "parent",
            AccountRole::Child => "child",
        }
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parent" => Ok(AccountRole::Parent),
            "child" => Ok(AccountRole::Child),
            other => Err(format!("Unknown account role: {}", other)),
        }
    }
}

/// Public summary of an account, used in link-status and request listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AccountSummary {
    pub id: Uuid,
    pub role: AccountRole,
    pub display_name: String,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        assert_eq!("parent".parse::<AccountRole>().unwrap(), AccountRole::Parent);
        assert_eq!("child".parse::<AccountRole>().unwrap(), AccountRole::Child);
        assert_eq!(AccountRole::Parent.to_string(), "parent");
        assert_eq!(AccountRole::Child.to_string(), "child");
    }

    #[test]
    fn test_role_parse_unknown() {
        assert!("admin".parse::<AccountRole>().is_err());
        assert!("".parse::<AccountRole>().is_err());
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&AccountRole::Child).unwrap();
        assert_eq!(json, "\"child\"");
        let role: AccountRole = serde_json::from_str("\"parent\"").unwrap();
        assert_eq!(role, AccountRole::Parent);
    }
}
