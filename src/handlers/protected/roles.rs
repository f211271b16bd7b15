use axum::extract::{Extension, Path};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::{CreateRole, Role, UpdateRole};
use crate::database::queries;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser, DbPool, TenantContext};
use crate::permissions::{partition_known, require_permission, Permission};

use super::utils::{optional_text, parse_id, required_text};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// Canonical permission list, or 400 naming every unknown entry
fn checked_permissions(values: &[String]) -> Result<Vec<String>, ApiError> {
    let (known, unknown) = partition_known(values);
    if !unknown.is_empty() {
        return Err(ApiError::invalid_field(
            "permissions",
            format!("Unknown permissions: {}", unknown.join(", ")),
        ));
    }
    Ok(known)
}

impl RoleRequest {
    pub fn into_create(self) -> Result<CreateRole, ApiError> {
        Ok(CreateRole {
            name: required_text("name", self.name.as_deref())?,
            description: optional_text(self.description),
            permissions: checked_permissions(&self.permissions.unwrap_or_default())?,
        })
    }

    pub fn into_update(self) -> Result<UpdateRole, ApiError> {
        let name = match self.name {
            Some(raw) => Some(required_text("name", Some(&raw))?),
            None => None,
        };
        let permissions = match self.permissions {
            Some(values) => Some(checked_permissions(&values)?),
            None => None,
        };
        let update = UpdateRole {
            name,
            description: optional_text(self.description),
            permissions,
        };
        if !update.has_changes() {
            return Err(ApiError::bad_request("No fields to update"));
        }
        Ok(update)
    }
}

/// Load a role for modification; system roles are read-only
async fn editable_role(pool: &sqlx::PgPool, tenant: &TenantContext, id: uuid::Uuid) -> Result<Role, ApiError> {
    let role = queries::roles::find(pool, tenant.id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Role not found"))?;
    if role.is_system {
        return Err(ApiError::forbidden(format!("System role '{}' cannot be modified", role.name)));
    }
    Ok(role)
}

/// GET /api/admin/roles
pub async fn list(
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<Role>> {
    require_permission(&auth_user, Permission::RolesRead)?;
    let roles = queries::roles::list(&pool, tenant.id).await?;
    Ok(ApiResponse::success(roles))
}

/// POST /api/admin/roles
pub async fn create(
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<RoleRequest>,
) -> ApiResult<Role> {
    require_permission(&auth_user, Permission::RolesWrite)?;
    let input = payload.into_create()?;

    let role = queries::roles::create(&pool, tenant.id, &input).await?;
    tracing::info!(tenant_id = %tenant.id, role_id = %role.id, "Created role '{}'", role.name);

    Ok(ApiResponse::created(role))
}

/// GET /api/admin/roles/:id
pub async fn get(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Role> {
    require_permission(&auth_user, Permission::RolesRead)?;
    let id = parse_id(&id, "role")?;

    let role = queries::roles::find(&pool, tenant.id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Role not found"))?;
    Ok(ApiResponse::success(role))
}

/// PATCH /api/admin/roles/:id
pub async fn patch(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<RoleRequest>,
) -> ApiResult<Role> {
    require_permission(&auth_user, Permission::RolesWrite)?;
    let id = parse_id(&id, "role")?;
    let update = payload.into_update()?;
    editable_role(&pool, &tenant, id).await?;

    let role = queries::roles::update(&pool, tenant.id, id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Role not found"))?;
    tracing::info!(tenant_id = %tenant.id, role_id = %role.id, "Updated role");

    Ok(ApiResponse::success(role))
}

/// DELETE /api/admin/roles/:id
pub async fn delete(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    require_permission(&auth_user, Permission::RolesWrite)?;
    let id = parse_id(&id, "role")?;
    editable_role(&pool, &tenant, id).await?;

    if !queries::roles::delete(&pool, tenant.id, id).await? {
        return Err(ApiError::not_found("Role not found"));
    }
    tracing::info!(tenant_id = %tenant.id, role_id = %id, "Deleted role");

    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_permissions_are_listed() {
        let req = RoleRequest {
            name: Some("Auditor".into()),
            permissions: Some(vec!["users:read".into(), "users:fly".into(), "root".into()]),
            ..Default::default()
        };
        match req.into_create() {
            Err(ApiError::ValidationError { field_errors: Some(f), .. }) => {
                assert!(f["permissions"].contains("users:fly"));
                assert!(f["permissions"].contains("root"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn create_dedupes_permissions() {
        let role = RoleRequest {
            name: Some("Auditor".into()),
            permissions: Some(vec!["users:read".into(), "users:read".into(), "reports:read".into()]),
            ..Default::default()
        }
        .into_create()
        .unwrap();
        assert_eq!(role.permissions, vec!["users:read".to_string(), "reports:read".to_string()]);
    }

    #[test]
    fn blank_name_is_rejected() {
        let req = RoleRequest {
            name: Some("  ".into()),
            ..Default::default()
        };
        assert!(req.into_update().is_err());
    }
}
