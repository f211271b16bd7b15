use axum::extract::{Extension, Query};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::{CreateUser, User, UserRole, UserStatus};
use crate::database::queries;
use crate::error::ApiError;
use crate::filter::{self, select_view, UserFilter};
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser, DbPool, TenantContext};
use crate::permissions::{require_permission, Permission};

use super::super::utils::{normalize_email, optional_text, page, required_text};

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub q: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    /// View name (`all`, `admins`, ...); overrides `role`
    pub view: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl UserListQuery {
    /// Build the list filter, rejecting unknown role, status or view names
    pub fn to_filter(&self) -> Result<UserFilter, ApiError> {
        let mut role = match self.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => Some(
                UserRole::from_str(raw).ok_or_else(|| ApiError::invalid_field("role", format!("Unknown role '{}'", raw)))?,
            ),
            None => None,
        };
        if let Some(raw) = self.view.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            let (_, view_role) =
                select_view(raw).ok_or_else(|| ApiError::invalid_field("view", format!("Unknown view '{}'", raw)))?;
            role = view_role;
        }
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                UserStatus::from_str(raw)
                    .ok_or_else(|| ApiError::invalid_field("status", format!("Unknown status '{}'", raw)))?,
            ),
            None => None,
        };

        Ok(UserFilter {
            query: self.q.clone(),
            role,
            status,
        }
        .normalized())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
}

impl CreateUserRequest {
    /// Validate everything that needs no store access. A missing role is
    /// resolved later from the tenant's settings.
    pub fn validate(self) -> Result<(CreateUser, bool), ApiError> {
        let email = normalize_email("email", &required_text("email", self.email.as_deref())?)?;
        let name = required_text("name", self.name.as_deref())?;
        let role = match optional_text(self.role) {
            Some(raw) => Some(
                UserRole::from_str(&raw).ok_or_else(|| ApiError::invalid_field("role", format!("Unknown role '{}'", raw)))?,
            ),
            None => None,
        };
        let status = match optional_text(self.status) {
            Some(raw) => UserStatus::from_str(&raw)
                .ok_or_else(|| ApiError::invalid_field("status", format!("Unknown status '{}'", raw)))?,
            None => UserStatus::Active,
        };

        let input = CreateUser {
            email,
            name,
            role: role.unwrap_or(UserRole::User),
            status,
            department: optional_text(self.department),
            phone: optional_text(self.phone),
        };
        Ok((input, role.is_some()))
    }
}

/// GET /api/admin/users - Filtered, paginated user list with counts
pub async fn get(
    Query(query): Query<UserListQuery>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    require_permission(&auth_user, Permission::UsersRead)?;

    let user_filter = query.to_filter()?;
    let (limit, offset) = page(query.limit.as_deref(), query.offset.as_deref())?;

    let users = queries::users::list(&pool, tenant.id).await?;
    let (matching, stats) = filter::apply(&user_filter, &users);
    let items: Vec<_> = matching.into_iter().skip(offset).take(limit).collect();

    Ok(ApiResponse::success(json!({
        "users": items,
        "stats": stats,
        "filters": user_filter,
        "limit": limit,
        "offset": offset,
    })))
}

/// POST /api/admin/users - Create a user in the caller's tenant
pub async fn post(
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> ApiResult<User> {
    require_permission(&auth_user, Permission::UsersWrite)?;

    let (mut input, role_given) = payload.validate()?;
    if !role_given {
        input.role = queries::settings::get_or_default(&pool, tenant.id).await?.default_role();
    }

    let user = queries::users::create(&pool, tenant.id, &input).await?;
    tracing::info!(tenant_id = %tenant.id, user_id = %user.id, "Created user {}", user.email);

    Ok(ApiResponse::created(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: Option<&str>, name: Option<&str>, role: Option<&str>) -> CreateUserRequest {
        CreateUserRequest {
            email: email.map(String::from),
            name: name.map(String::from),
            role: role.map(String::from),
            status: None,
            department: Some("  ".into()),
            phone: None,
        }
    }

    #[test]
    fn create_requires_valid_email_and_name() {
        assert!(request(None, Some("Ada"), None).validate().is_err());
        assert!(request(Some("not-an-email"), Some("Ada"), None).validate().is_err());
        assert!(request(Some("ada@example.com"), Some(" "), None).validate().is_err());
    }

    #[test]
    fn create_normalizes_fields() {
        let (input, role_given) = request(Some(" Ada@Example.com "), Some(" Ada "), Some("manager"))
            .validate()
            .unwrap();
        assert_eq!(input.email, "ada@example.com");
        assert_eq!(input.name, "Ada");
        assert_eq!(input.role, UserRole::Manager);
        assert_eq!(input.status, UserStatus::Active);
        assert_eq!(input.department, None);
        assert!(role_given);
    }

    #[test]
    fn missing_role_is_left_to_settings() {
        let (_, role_given) = request(Some("ada@example.com"), Some("Ada"), None).validate().unwrap();
        assert!(!role_given);
    }

    #[test]
    fn view_overrides_role() {
        let query = UserListQuery {
            role: Some("ADMIN".into()),
            view: Some("viewers".into()),
            ..Default::default()
        };
        assert_eq!(query.to_filter().unwrap().role, Some(UserRole::Viewer));
    }

    #[test]
    fn unknown_list_params_are_rejected() {
        let query = UserListQuery {
            status: Some("retired".into()),
            ..Default::default()
        };
        assert!(query.to_filter().is_err());

        let query = UserListQuery {
            view: Some("owners".into()),
            ..Default::default()
        };
        assert!(query.to_filter().is_err());
    }
}
