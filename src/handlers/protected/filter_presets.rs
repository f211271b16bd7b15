use axum::extract::{Extension, Path};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{CreateFilterPreset, FilterPreset, UpdateFilterPreset};
use crate::database::queries;
use crate::error::ApiError;
use crate::filter::UserFilter;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser, DbPool, TenantContext};
use crate::permissions::{require_permission, Permission};

use super::utils::{optional_text, parse_id, required_text};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Parsed leniently: malformed filters become the inactive filter
    pub filters: Option<Value>,
    pub is_public: Option<bool>,
    pub is_default: Option<bool>,
}

impl PresetRequest {
    pub fn into_create(self) -> Result<CreateFilterPreset, ApiError> {
        Ok(CreateFilterPreset {
            name: required_text("name", self.name.as_deref())?,
            description: optional_text(self.description),
            filters: self.filters.as_ref().map(UserFilter::from_value).unwrap_or_default(),
            is_public: self.is_public.unwrap_or(false),
            is_default: self.is_default.unwrap_or(false),
        })
    }

    pub fn into_update(self) -> Result<UpdateFilterPreset, ApiError> {
        let name = match self.name {
            Some(raw) => Some(required_text("name", Some(&raw))?),
            None => None,
        };
        let update = UpdateFilterPreset {
            name,
            description: optional_text(self.description),
            filters: self.filters.as_ref().map(UserFilter::from_value),
            is_public: self.is_public,
            is_default: self.is_default,
        };
        if !update.has_changes() {
            return Err(ApiError::bad_request("No fields to update"));
        }
        Ok(update)
    }
}

/// Readers need the preset to be public or their own
pub fn ensure_readable(preset: &FilterPreset, user_id: Uuid) -> Result<(), ApiError> {
    if preset.is_visible_to(user_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("You do not have access to this filter preset"))
    }
}

/// Writers must own the preset, public or not
pub fn ensure_owner(preset: &FilterPreset, user_id: Uuid) -> Result<(), ApiError> {
    if preset.is_owned_by(user_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only the owner can modify this filter preset"))
    }
}

async fn load(pool: &sqlx::PgPool, tenant: &TenantContext, raw_id: &str) -> Result<FilterPreset, ApiError> {
    let id = parse_id(raw_id, "filter preset")?;
    queries::filter_presets::find(pool, tenant.id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Filter preset not found"))
}

/// GET /api/admin/filter-presets - Own presets plus the tenant's public ones
pub async fn list(
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<FilterPreset>> {
    require_permission(&auth_user, Permission::FilterPresetsRead)?;
    let presets = queries::filter_presets::list_visible(&pool, tenant.id, auth_user.user_id).await?;
    Ok(ApiResponse::success(presets))
}

/// POST /api/admin/filter-presets
pub async fn create(
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<PresetRequest>,
) -> ApiResult<FilterPreset> {
    require_permission(&auth_user, Permission::FilterPresetsWrite)?;
    let input = payload.into_create()?;

    let preset = queries::filter_presets::create(&pool, tenant.id, auth_user.user_id, &input).await?;
    tracing::info!(tenant_id = %tenant.id, preset_id = %preset.id, "Saved filter preset '{}'", preset.name);

    Ok(ApiResponse::created(preset))
}

/// GET /api/admin/filter-presets/:id
pub async fn get(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<FilterPreset> {
    require_permission(&auth_user, Permission::FilterPresetsRead)?;
    let preset = load(&pool, &tenant, &id).await?;
    ensure_readable(&preset, auth_user.user_id)?;
    Ok(ApiResponse::success(preset))
}

/// PATCH /api/admin/filter-presets/:id
pub async fn patch(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<PresetRequest>,
) -> ApiResult<FilterPreset> {
    require_permission(&auth_user, Permission::FilterPresetsWrite)?;
    let update = payload.into_update()?;
    let preset = load(&pool, &tenant, &id).await?;
    ensure_owner(&preset, auth_user.user_id)?;

    let preset = queries::filter_presets::update(&pool, tenant.id, auth_user.user_id, preset.id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Filter preset not found"))?;
    tracing::info!(tenant_id = %tenant.id, preset_id = %preset.id, "Updated filter preset");

    Ok(ApiResponse::success(preset))
}

/// DELETE /api/admin/filter-presets/:id
pub async fn delete(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    require_permission(&auth_user, Permission::FilterPresetsWrite)?;
    let preset = load(&pool, &tenant, &id).await?;
    ensure_owner(&preset, auth_user.user_id)?;

    if !queries::filter_presets::delete(&pool, tenant.id, auth_user.user_id, preset.id).await? {
        return Err(ApiError::not_found("Filter preset not found"));
    }
    tracing::info!(tenant_id = %tenant.id, preset_id = %preset.id, "Deleted filter preset");

    Ok(ApiResponse::success(json!({ "id": preset.id, "deleted": true })))
}
