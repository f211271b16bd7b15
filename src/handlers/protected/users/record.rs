use axum::extract::{Extension, Path};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::{UpdateUser, User, UserRole, UserStatus};
use crate::database::queries;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser, DbPool, TenantContext};
use crate::permissions::{require_permission, Permission};

use super::super::utils::{normalize_email, optional_text, parse_id, required_text};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(self) -> Result<UpdateUser, ApiError> {
        let email = match self.email {
            Some(raw) => Some(normalize_email("email", &raw)?),
            None => None,
        };
        let name = match self.name {
            Some(raw) => Some(required_text("name", Some(&raw))?),
            None => None,
        };
        let role = match optional_text(self.role) {
            Some(raw) => Some(
                UserRole::from_str(&raw).ok_or_else(|| ApiError::invalid_field("role", format!("Unknown role '{}'", raw)))?,
            ),
            None => None,
        };
        let status = match optional_text(self.status) {
            Some(raw) => Some(
                UserStatus::from_str(&raw)
                    .ok_or_else(|| ApiError::invalid_field("status", format!("Unknown status '{}'", raw)))?,
            ),
            None => None,
        };

        let update = UpdateUser {
            email,
            name,
            role,
            status,
            department: self.department.map(|d| d.trim().to_string()),
            phone: self.phone.map(|p| p.trim().to_string()),
        };
        if !update.has_changes() {
            return Err(ApiError::bad_request("No fields to update"));
        }
        Ok(update)
    }
}

/// GET /api/admin/users/:id
pub async fn get(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<User> {
    require_permission(&auth_user, Permission::UsersRead)?;
    let id = parse_id(&id, "user")?;

    let user = queries::users::find(&pool, tenant.id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success(user))
}

/// PATCH /api/admin/users/:id - Update provided fields only
pub async fn patch(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> ApiResult<User> {
    require_permission(&auth_user, Permission::UsersWrite)?;
    let id = parse_id(&id, "user")?;
    let update = payload.validate()?;

    let user = queries::users::update(&pool, tenant.id, id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    tracing::info!(tenant_id = %tenant.id, user_id = %user.id, "Updated user");

    Ok(ApiResponse::success(user))
}

/// DELETE /api/admin/users/:id - Callers cannot delete themselves
pub async fn delete(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    require_permission(&auth_user, Permission::UsersDelete)?;
    let id = parse_id(&id, "user")?;

    if id == auth_user.user_id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    if !queries::users::delete(&pool, tenant.id, id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(tenant_id = %tenant.id, user_id = %id, deleted_by = %auth_user.user_id, "Deleted user");

    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> UpdateUserRequest {
        UpdateUserRequest {
            email: None,
            name: None,
            role: None,
            status: None,
            department: None,
            phone: None,
        }
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert!(empty().validate().is_err());
    }

    #[test]
    fn patch_validates_present_fields_only() {
        let update = UpdateUserRequest {
            status: Some("suspended".into()),
            ..empty()
        }
        .validate()
        .unwrap();
        assert_eq!(update.status, Some(UserStatus::Suspended));
        assert!(update.email.is_none());

        let bad = UpdateUserRequest {
            email: Some("nope".into()),
            ..empty()
        };
        assert!(bad.validate().is_err());
    }
}
