use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::database::models::UserManagementSettings;
use crate::database::DatabaseError;

const SETTINGS_COLUMNS: &str = "tenant_id, default_role, allow_self_registration, require_email_verification, \
                                session_timeout_minutes, password_min_length, max_export_rows, updated_at";

/// Stored settings, falling back to defaults when the tenant has none
#[instrument(skip(pool))]
pub async fn get_or_default(pool: &PgPool, tenant_id: Uuid) -> Result<UserManagementSettings, DatabaseError> {
    let sql = format!("SELECT {} FROM user_management_settings WHERE tenant_id = $1", SETTINGS_COLUMNS);
    let settings = sqlx::query_as::<_, UserManagementSettings>(&sql)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;
    Ok(settings.unwrap_or_else(|| UserManagementSettings::defaults_for(tenant_id)))
}

#[instrument(skip(pool, settings))]
pub async fn upsert(pool: &PgPool, settings: &UserManagementSettings) -> Result<UserManagementSettings, DatabaseError> {
    let sql = format!(
        r#"
        INSERT INTO user_management_settings (
            tenant_id, default_role, allow_self_registration, require_email_verification,
            session_timeout_minutes, password_min_length, max_export_rows, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (tenant_id) DO UPDATE SET
            default_role = EXCLUDED.default_role,
            allow_self_registration = EXCLUDED.allow_self_registration,
            require_email_verification = EXCLUDED.require_email_verification,
            session_timeout_minutes = EXCLUDED.session_timeout_minutes,
            password_min_length = EXCLUDED.password_min_length,
            max_export_rows = EXCLUDED.max_export_rows,
            updated_at = NOW()
        RETURNING {}
        "#,
        SETTINGS_COLUMNS
    );
    let stored = sqlx::query_as::<_, UserManagementSettings>(&sql)
        .bind(settings.tenant_id)
        .bind(&settings.default_role)
        .bind(settings.allow_self_registration)
        .bind(settings.require_email_verification)
        .bind(settings.session_timeout_minutes)
        .bind(settings.password_min_length)
        .bind(settings.max_export_rows)
        .fetch_one(pool)
        .await?;
    Ok(stored)
}
