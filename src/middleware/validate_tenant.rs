use axum::{extract::Request, middleware::Next, response::Response};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{queries, DatabaseManager};
use crate::error::ApiError;
use super::auth::AuthUser;

/// Shared pool, injected by middleware
#[derive(Clone)]
pub struct DbPool(pub PgPool);

/// Active tenant the caller's session belongs to
#[derive(Clone, Debug)]
pub struct TenantContext {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// Middleware that resolves the tenant named in the JWT claims.
/// Ensures the tenant exists and is active, and expands a custom role
/// claim into the permissions stored on that tenant's role.
pub async fn validate_tenant_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let mut auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before tenant validation"))?;

    let pool = DatabaseManager::pool().await?;

    let tenant = queries::tenants::find_active(&pool, auth_user.tenant_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Tenant validation failed: tenant '{}' not found or inactive", auth_user.tenant_id);
            ApiError::forbidden("Tenant is not active or does not exist")
        })?;

    if auth_user.role().is_none() {
        match queries::roles::find_by_name(&pool, tenant.id, &auth_user.role).await? {
            Some(role) => {
                for permission in role.permissions {
                    if !auth_user.permissions.contains(&permission) {
                        auth_user.permissions.push(permission);
                    }
                }
            }
            None => tracing::debug!("Role '{}' is not defined for tenant {}", auth_user.role, tenant.id),
        }
    }

    tracing::debug!("Tenant validation successful: {} ({})", tenant.name, tenant.slug);

    request.extensions_mut().insert(auth_user);
    request.extensions_mut().insert(TenantContext {
        id: tenant.id,
        name: tenant.name,
        slug: tenant.slug,
    });
    request.extensions_mut().insert(DbPool(pool));

    Ok(next.run(request).await)
}
