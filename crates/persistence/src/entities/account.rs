//! Account entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AccountRole, AccountSummary};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for account_role that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
pub enum AccountRoleDb {
    Parent,
    Child,
}

impl From<AccountRoleDb> for AccountRole {
    fn from(db_role: AccountRoleDb) -> Self {
        match db_role {
            AccountRoleDb::Parent => AccountRole::Parent,
            AccountRoleDb::Child => AccountRole::Child,
        }
    }
}

impl From<AccountRole> for AccountRoleDb {
    fn from(role: AccountRole) -> Self {
        match role {
            AccountRole::Parent => AccountRoleDb::Parent,
            AccountRole::Child => AccountRoleDb::Child,
        }
    }
}

/// Database row mapping for the accounts table.
#[derive(Debug, Clone, FromRow)]
pub struct AccountEntity {
    pub id: Uuid,
    pub role: AccountRoleDb,
    pub display_name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AccountEntity> for AccountSummary {
    fn from(entity: AccountEntity) -> Self {
        Self {
            id: entity.id,
            role: entity.role.into(),
            display_name: entity.display_name,
            email: entity.email,
        }
    }
}
