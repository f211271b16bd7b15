use axum::extract::Extension;
use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::permissions::{has_permission, require_permission, Permission};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub granted: bool,
}

/// GET /api/admin/permissions - Catalog, flagged with what the caller holds
pub async fn list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Vec<PermissionEntry>> {
    require_permission(&auth_user, Permission::RolesRead)?;

    let entries = Permission::ALL
        .iter()
        .map(|p| PermissionEntry {
            name: p.as_str(),
            description: p.description(),
            granted: has_permission(&auth_user, *p),
        })
        .collect();

    Ok(ApiResponse::success(entries))
}
