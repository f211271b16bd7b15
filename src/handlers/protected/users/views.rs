use axum::extract::{Extension, Query};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::UserStatus;
use crate::database::queries;
use crate::error::ApiError;
use crate::filter::{view_counts, UserFilter};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, DbPool, TenantContext};
use crate::permissions::{require_permission, Permission};

#[derive(Debug, Deserialize)]
pub struct ViewsQuery {
    pub q: Option<String>,
    pub status: Option<String>,
}

/// GET /api/admin/users/views - Per-role view counts under the current search
pub async fn get(
    Query(query): Query<ViewsQuery>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    require_permission(&auth_user, Permission::UsersRead)?;

    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            UserStatus::from_str(raw).ok_or_else(|| ApiError::invalid_field("status", format!("Unknown status '{}'", raw)))?,
        ),
        None => None,
    };
    let base = UserFilter {
        query: query.q,
        role: None,
        status,
    }
    .normalized();

    let users = queries::users::list(&pool, tenant.id).await?;
    let views = view_counts(users, &base);

    Ok(ApiResponse::success(json!({ "views": views })))
}
