use axum::extract::{Extension, Path, Query};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::{Client, ClientStatus, CreateClient, UpdateClient};
use crate::database::queries;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser, DbPool, TenantContext};
use crate::permissions::{require_permission, Permission};

use super::utils::{normalize_email, optional_text, parse_id, required_text};

#[derive(Debug, Deserialize)]
pub struct ClientListQuery {
    pub q: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRequest {
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

fn parse_status(raw: Option<String>) -> Result<Option<ClientStatus>, ApiError> {
    match optional_text(raw) {
        Some(raw) => ClientStatus::from_str(&raw)
            .map(Some)
            .ok_or_else(|| ApiError::invalid_field("status", format!("Unknown status '{}'", raw))),
        None => Ok(None),
    }
}

fn parse_contact_email(raw: Option<String>) -> Result<Option<String>, ApiError> {
    optional_text(raw)
        .map(|email| normalize_email("contactEmail", &email))
        .transpose()
}

impl ClientRequest {
    pub fn into_create(self) -> Result<CreateClient, ApiError> {
        Ok(CreateClient {
            name: required_text("name", self.name.as_deref())?,
            contact_email: parse_contact_email(self.contact_email)?,
            status: parse_status(self.status)?.unwrap_or(ClientStatus::Active),
            contact_name: optional_text(self.contact_name),
            phone: optional_text(self.phone),
            notes: optional_text(self.notes),
        })
    }

    pub fn into_update(self) -> Result<UpdateClient, ApiError> {
        let name = match self.name {
            Some(raw) => Some(required_text("name", Some(&raw))?),
            None => None,
        };
        let update = UpdateClient {
            name,
            contact_email: parse_contact_email(self.contact_email)?,
            status: parse_status(self.status)?,
            contact_name: optional_text(self.contact_name),
            phone: optional_text(self.phone),
            notes: optional_text(self.notes),
        };
        if !update.has_changes() {
            return Err(ApiError::bad_request("No fields to update"));
        }
        Ok(update)
    }
}

/// GET /api/admin/clients
pub async fn list(
    Query(query): Query<ClientListQuery>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<Client>> {
    require_permission(&auth_user, Permission::ClientsRead)?;

    let status = parse_status(query.status)?;
    let needle = optional_text(query.q);
    let clients = queries::clients::list(&pool, tenant.id, needle.as_deref(), status).await?;

    Ok(ApiResponse::success(clients))
}

/// POST /api/admin/clients
pub async fn create(
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<ClientRequest>,
) -> ApiResult<Client> {
    require_permission(&auth_user, Permission::ClientsWrite)?;
    let input = payload.into_create()?;

    let client = queries::clients::create(&pool, tenant.id, auth_user.user_id, &input).await?;
    tracing::info!(tenant_id = %tenant.id, client_id = %client.id, "Created client '{}'", client.name);

    Ok(ApiResponse::created(client))
}

/// GET /api/admin/clients/:id
pub async fn get(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Client> {
    require_permission(&auth_user, Permission::ClientsRead)?;
    let id = parse_id(&id, "client")?;

    let client = queries::clients::find(&pool, tenant.id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Client not found"))?;
    Ok(ApiResponse::success(client))
}

/// PATCH /api/admin/clients/:id
pub async fn patch(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<ClientRequest>,
) -> ApiResult<Client> {
    require_permission(&auth_user, Permission::ClientsWrite)?;
    let id = parse_id(&id, "client")?;
    let update = payload.into_update()?;

    let client = queries::clients::update(&pool, tenant.id, id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Client not found"))?;
    tracing::info!(tenant_id = %tenant.id, client_id = %client.id, "Updated client");

    Ok(ApiResponse::success(client))
}

/// DELETE /api/admin/clients/:id
pub async fn delete(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    require_permission(&auth_user, Permission::ClientsWrite)?;
    let id = parse_id(&id, "client")?;

    if !queries::clients::delete(&pool, tenant.id, id).await? {
        return Err(ApiError::not_found("Client not found"));
    }
    tracing::info!(tenant_id = %tenant.id, client_id = %id, "Deleted client");

    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
