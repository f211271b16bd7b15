use axum::extract::{Extension, Path};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::{CreateReport, Report, UpdateReport};
use crate::database::queries;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser, DbPool, TenantContext};
use crate::permissions::{require_permission, Permission};
use crate::report::{validate_definition, CalculationDescriptor, ColumnDescriptor, DataSource, ReportFilter};

use super::super::utils::{optional_text, parse_id, required_text};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub data_source: Option<String>,
    pub columns: Option<Vec<ColumnDescriptor>>,
    pub calculations: Option<Vec<CalculationDescriptor>>,
    pub filters: Option<Vec<ReportFilter>>,
}

impl ReportRequest {
    pub fn into_create(self) -> Result<CreateReport, ApiError> {
        let name = required_text("name", self.name.as_deref())?;
        let raw_source = required_text("dataSource", self.data_source.as_deref())?;
        let data_source = DataSource::from_str(&raw_source).ok_or_else(|| {
            ApiError::invalid_field("dataSource", format!("Unknown data source '{}' (users, clients)", raw_source))
        })?;
        let columns = self.columns.unwrap_or_default();
        let calculations = self.calculations.unwrap_or_default();
        let filters = self.filters.unwrap_or_default();
        validate_definition(data_source, &columns, &calculations, &filters)?;

        Ok(CreateReport {
            name,
            description: optional_text(self.description),
            data_source,
            columns,
            calculations,
            filters,
        })
    }

    /// Partial update, checked against the stored report's data source
    pub fn into_update(self, existing: &Report) -> Result<UpdateReport, ApiError> {
        if self.data_source.is_some() {
            return Err(ApiError::invalid_field("dataSource", "dataSource cannot be changed"));
        }
        let source = existing
            .data_source()
            .ok_or_else(|| ApiError::internal_server_error("Stored report has an unknown data source"))?;

        let name = match self.name {
            Some(raw) => Some(required_text("name", Some(&raw))?),
            None => None,
        };
        let update = UpdateReport {
            name,
            description: optional_text(self.description),
            columns: self.columns,
            calculations: self.calculations,
            filters: self.filters,
        };
        if !update.has_changes() {
            return Err(ApiError::bad_request("No fields to update"));
        }

        validate_definition(
            source,
            update.columns.as_deref().unwrap_or(&existing.columns.0),
            update.calculations.as_deref().unwrap_or(&existing.calculations.0),
            update.filters.as_deref().unwrap_or(&existing.filters.0),
        )?;
        Ok(update)
    }
}

pub(super) async fn load(pool: &sqlx::PgPool, tenant: &TenantContext, raw_id: &str) -> Result<Report, ApiError> {
    let id = parse_id(raw_id, "report")?;
    queries::reports::find(pool, tenant.id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Report not found"))
}

/// GET /api/admin/reports
pub async fn list(
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<Report>> {
    require_permission(&auth_user, Permission::ReportsRead)?;
    let reports = queries::reports::list(&pool, tenant.id).await?;
    Ok(ApiResponse::success(reports))
}

/// POST /api/admin/reports
pub async fn create(
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<ReportRequest>,
) -> ApiResult<Report> {
    require_permission(&auth_user, Permission::ReportsWrite)?;
    let input = payload.into_create()?;

    let report = queries::reports::create(&pool, tenant.id, auth_user.user_id, &input).await?;
    tracing::info!(tenant_id = %tenant.id, report_id = %report.id, "Created report '{}'", report.name);

    Ok(ApiResponse::created(report))
}

/// GET /api/admin/reports/:id
pub async fn get(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Report> {
    require_permission(&auth_user, Permission::ReportsRead)?;
    let report = load(&pool, &tenant, &id).await?;
    Ok(ApiResponse::success(report))
}

/// PATCH /api/admin/reports/:id
pub async fn patch(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<ReportRequest>,
) -> ApiResult<Report> {
    require_permission(&auth_user, Permission::ReportsWrite)?;
    let existing = load(&pool, &tenant, &id).await?;
    let update = payload.into_update(&existing)?;

    let report = queries::reports::update(&pool, tenant.id, existing.id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Report not found"))?;
    tracing::info!(tenant_id = %tenant.id, report_id = %report.id, "Updated report");

    Ok(ApiResponse::success(report))
}

/// DELETE /api/admin/reports/:id
pub async fn delete(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    require_permission(&auth_user, Permission::ReportsWrite)?;
    let id = parse_id(&id, "report")?;

    if !queries::reports::delete(&pool, tenant.id, id).await? {
        return Err(ApiError::not_found("Report not found"));
    }
    tracing::info!(tenant_id = %tenant.id, report_id = %id, "Deleted report");

    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn columns() -> Vec<ColumnDescriptor> {
        vec![ColumnDescriptor {
            name: "email".into(),
            label: "Email".into(),
        }]
    }

    #[test]
    fn create_validates_source_and_columns() {
        let missing_columns = ReportRequest {
            name: Some("Roster".into()),
            data_source: Some("users".into()),
            ..Default::default()
        };
        assert_eq!(missing_columns.into_create().unwrap_err().status_code(), StatusCode::BAD_REQUEST);

        let bad_source = ReportRequest {
            name: Some("Roster".into()),
            data_source: Some("invoices".into()),
            columns: Some(columns()),
            ..Default::default()
        };
        assert!(bad_source.into_create().is_err());

        let ok = ReportRequest {
            name: Some("Roster".into()),
            data_source: Some("users".into()),
            columns: Some(columns()),
            ..Default::default()
        }
        .into_create()
        .unwrap();
        assert_eq!(ok.data_source, DataSource::Users);
    }

    #[test]
    fn update_checks_against_stored_source() {
        let existing = Report {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            name: "Clients".into(),
            description: None,
            data_source_str: "clients".into(),
            columns: Json(vec![ColumnDescriptor {
                name: "name".into(),
                label: "Name".into(),
            }]),
            calculations: Json(vec![]),
            filters: Json(vec![]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        // `email` belongs to users, not clients
        let req = ReportRequest {
            columns: Some(columns()),
            ..Default::default()
        };
        assert!(req.into_update(&existing).is_err());

        let renamed = ReportRequest {
            name: Some("Accounts".into()),
            ..Default::default()
        }
        .into_update(&existing)
        .unwrap();
        assert_eq!(renamed.name.as_deref(), Some("Accounts"));
    }
}
