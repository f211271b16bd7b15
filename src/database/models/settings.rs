use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::user::UserRole;

/// Per-tenant user management policy
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserManagementSettings {
    pub tenant_id: Uuid,
    pub default_role: String,
    pub allow_self_registration: bool,
    pub require_email_verification: bool,
    pub session_timeout_minutes: i32,
    pub password_min_length: i32,
    pub max_export_rows: i32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserManagementSettings {
    /// Settings served to tenants that never saved any
    pub fn defaults_for(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            default_role: UserRole::User.as_str().to_string(),
            allow_self_registration: false,
            require_email_verification: true,
            session_timeout_minutes: 60,
            password_min_length: 12,
            max_export_rows: 10_000,
            updated_at: None,
        }
    }

    pub fn default_role(&self) -> UserRole {
        UserRole::from_str(&self.default_role).unwrap_or(UserRole::User)
    }
}
