use axum::extract::Extension;
use serde::Deserialize;

use crate::database::models::{UserManagementSettings, UserRole};
use crate::database::queries;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser, DbPool, TenantContext};
use crate::permissions::{require_permission, Permission};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub default_role: Option<String>,
    pub allow_self_registration: Option<bool>,
    pub require_email_verification: Option<bool>,
    pub session_timeout_minutes: Option<i64>,
    pub password_min_length: Option<i64>,
    pub max_export_rows: Option<i64>,
}

fn in_range(field: &str, value: i64, min: i64, max: i64) -> Result<i32, ApiError> {
    if (min..=max).contains(&value) {
        Ok(value as i32)
    } else {
        Err(ApiError::invalid_field(field, format!("{} must be between {} and {}", field, min, max)))
    }
}

impl SettingsRequest {
    /// Overlay onto the current settings and check every range
    pub fn apply_to(self, mut current: UserManagementSettings) -> Result<UserManagementSettings, ApiError> {
        if let Some(raw) = self.default_role {
            let role = UserRole::from_str(&raw)
                .ok_or_else(|| ApiError::invalid_field("defaultRole", format!("Unknown role '{}'", raw)))?;
            current.default_role = role.as_str().to_string();
        }
        if let Some(v) = self.allow_self_registration {
            current.allow_self_registration = v;
        }
        if let Some(v) = self.require_email_verification {
            current.require_email_verification = v;
        }
        if let Some(v) = self.session_timeout_minutes {
            current.session_timeout_minutes = in_range("sessionTimeoutMinutes", v, 5, 1440)?;
        }
        if let Some(v) = self.password_min_length {
            current.password_min_length = in_range("passwordMinLength", v, 8, 128)?;
        }
        if let Some(v) = self.max_export_rows {
            current.max_export_rows = in_range("maxExportRows", v, 1, 100_000)?;
        }
        Ok(current)
    }
}

/// GET /api/admin/settings/user-management
pub async fn get(
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<UserManagementSettings> {
    require_permission(&auth_user, Permission::SettingsRead)?;
    let settings = queries::settings::get_or_default(&pool, tenant.id).await?;
    Ok(ApiResponse::success(settings))
}

/// PUT /api/admin/settings/user-management
pub async fn put(
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<SettingsRequest>,
) -> ApiResult<UserManagementSettings> {
    require_permission(&auth_user, Permission::SettingsWrite)?;

    let current = queries::settings::get_or_default(&pool, tenant.id).await?;
    let updated = payload.apply_to(current)?;
    let stored = queries::settings::upsert(&pool, &updated).await?;
    tracing::info!(tenant_id = %tenant.id, updated_by = %auth_user.user_id, "Updated user management settings");

    Ok(ApiResponse::success(stored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn ranges_are_enforced() {
        let base = UserManagementSettings::defaults_for(Uuid::new_v4());
        let too_short = SettingsRequest {
            session_timeout_minutes: Some(4),
            ..Default::default()
        };
        assert!(too_short.apply_to(base.clone()).is_err());

        let too_many = SettingsRequest {
            max_export_rows: Some(100_001),
            ..Default::default()
        };
        assert!(too_many.apply_to(base.clone()).is_err());

        let weak = SettingsRequest {
            password_min_length: Some(7),
            ..Default::default()
        };
        assert!(weak.apply_to(base).is_err());
    }

    #[test]
    fn partial_update_keeps_other_values() {
        let base = UserManagementSettings::defaults_for(Uuid::new_v4());
        let updated = SettingsRequest {
            default_role: Some("viewer".into()),
            session_timeout_minutes: Some(1440),
            ..Default::default()
        }
        .apply_to(base.clone())
        .unwrap();
        assert_eq!(updated.default_role, "VIEWER");
        assert_eq!(updated.session_timeout_minutes, 1440);
        assert_eq!(updated.password_min_length, base.password_min_length);
    }

    #[test]
    fn unknown_default_role_is_rejected() {
        let base = UserManagementSettings::defaults_for(Uuid::new_v4());
        let req = SettingsRequest {
            default_role: Some("OWNER".into()),
            ..Default::default()
        };
        assert!(req.apply_to(base).is_err());
    }
}
