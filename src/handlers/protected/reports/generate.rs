use async_trait::async_trait;
use axum::{
    extract::{Extension, Path},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue,
    },
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::database::models::{Report, ReportExecution};
use crate::database::{queries, DatabaseError};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser, DbPool, TenantContext};
use crate::permissions::{require_permission, Permission};
use crate::report::{
    self, filter, render, rows_from, validate_definition, DataSource, RenderedReport, ReportDocument, ReportError,
    ReportFilter, ReportFormat,
};

use super::crud::load;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub format: Option<String>,
    #[serde(default)]
    pub filters: Vec<ReportFilter>,
}

/// `{slug}-{YYYYMMDD}.{ext}` where the slug is the lower-cased report name
/// with runs of other characters collapsed to `-`
pub fn report_filename(name: &str, date: NaiveDate, format: ReportFormat) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "report" } else { slug };
    format!("{}-{}.{}", slug, date.format("%Y%m%d"), format.extension())
}

/// Rows a single run may load: the global cap, lowered by the tenant's own
/// export limit
pub fn row_cap(global_max: i64, tenant_max: i32) -> i64 {
    global_max.min(i64::from(tenant_max)).max(0)
}

/// Load, filter, summarise and render the report's rows
async fn build(
    pool: &PgPool,
    tenant_id: Uuid,
    report: &Report,
    source: DataSource,
    format: ReportFormat,
    request_filters: &[ReportFilter],
) -> Result<(RenderedReport, usize), ReportError> {
    // Stored definitions may predate a field catalog change
    validate_definition(source, &report.columns.0, &report.calculations.0, &report.filters.0)?;

    let settings = queries::settings::get_or_default(pool, tenant_id).await?;
    let max_rows = row_cap(config::config().reports.max_rows, settings.max_export_rows);
    let rows = match source {
        DataSource::Users => rows_from(&queries::users::list_limited(pool, tenant_id, max_rows).await?)?,
        DataSource::Clients => rows_from(&queries::clients::list_limited(pool, tenant_id, max_rows).await?)?,
    };

    let rows = filter::apply(rows, &report.filters.0);
    let rows = filter::apply(rows, request_filters);
    let summary = report::summary::compute(&rows, &report.calculations.0);
    let row_count = rows.len();

    let doc = ReportDocument {
        title: report.name.clone(),
        generated_at: Utc::now(),
        columns: report.columns.0.clone(),
        rows,
        summary,
    };
    Ok((render(format, &doc)?, row_count))
}

/// Where the outcome of a report run is recorded
#[async_trait]
pub trait ExecutionLog: Send + Sync {
    async fn complete(&self, execution_id: Uuid, row_count: i64, content_sha256: &str) -> Result<(), DatabaseError>;
    async fn fail(&self, execution_id: Uuid, message: &str) -> Result<(), DatabaseError>;
}

struct PgExecutionLog<'a>(&'a PgPool);

#[async_trait]
impl<'a> ExecutionLog for PgExecutionLog<'a> {
    async fn complete(&self, execution_id: Uuid, row_count: i64, content_sha256: &str) -> Result<(), DatabaseError> {
        queries::reports::complete_execution(self.0, execution_id, row_count, content_sha256).await
    }

    async fn fail(&self, execution_id: Uuid, message: &str) -> Result<(), DatabaseError> {
        queries::reports::fail_execution(self.0, execution_id, message).await
    }
}

/// Record how a run ended. Every error, including one raised while marking
/// the run completed, leaves the execution `failed` before it is returned.
pub async fn settle<L: ExecutionLog + ?Sized>(
    log: &L,
    execution_id: Uuid,
    built: Result<(RenderedReport, usize), ReportError>,
) -> Result<(RenderedReport, usize), ReportError> {
    let outcome = match built {
        Ok((rendered, row_count)) => {
            let digest = format!("{:x}", Sha256::digest(rendered.body.as_bytes()));
            match log.complete(execution_id, row_count as i64, &digest).await {
                Ok(()) => Ok((rendered, row_count)),
                Err(e) => Err(ReportError::from(e)),
            }
        }
        Err(e) => Err(e),
    };

    if let Err(e) = &outcome {
        tracing::error!(execution_id = %execution_id, "Report generation failed: {}", e);
        if let Err(mark_err) = log.fail(execution_id, &e.to_string()).await {
            tracing::error!(execution_id = %execution_id, "Could not record failed execution: {}", mark_err);
        }
    }
    outcome
}

fn content_disposition(name: &str, format: ReportFormat) -> Result<HeaderValue, ApiError> {
    let filename = report_filename(name, Utc::now().date_naive(), format);
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|_| ApiError::internal_server_error("Invalid report filename"))
}

/// POST /api/admin/reports/:id/generate - Render the report as a download
pub async fn generate(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<GenerateRequest>,
) -> Result<Response, ApiError> {
    require_permission(&auth_user, Permission::ReportsGenerate)?;

    let format = ReportFormat::parse(payload.format.as_deref().unwrap_or("csv"))?;
    let report = load(&pool, &tenant, &id).await?;
    let source = report
        .data_source()
        .ok_or_else(|| ApiError::internal_server_error("Stored report has an unknown data source"))?;
    for f in &payload.filters {
        f.validate(source)?;
    }
    // Everything that can fail after this point goes through `settle`
    let disposition = content_disposition(&report.name, format)?;

    let execution =
        queries::reports::start_execution(&pool, tenant.id, report.id, auth_user.user_id, format).await?;

    let built = build(&pool, tenant.id, &report, source, format, &payload.filters).await;
    let (rendered, row_count) = settle(&PgExecutionLog(&pool), execution.id, built).await?;
    tracing::info!(
        tenant_id = %tenant.id,
        report_id = %report.id,
        execution_id = %execution.id,
        rows = row_count,
        format = format.as_str(),
        "Generated report"
    );

    let mut response = rendered.body.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(rendered.content_type));
    headers.insert(CONTENT_DISPOSITION, disposition);
    if let Ok(value) = HeaderValue::from_str(&execution.id.to_string()) {
        headers.insert("x-report-execution-id", value);
    }
    Ok(response)
}

/// GET /api/admin/reports/:id/executions - Recent runs, newest first
pub async fn executions(
    Path(id): Path<String>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<ReportExecution>> {
    require_permission(&auth_user, Permission::ReportsRead)?;
    let report = load(&pool, &tenant, &id).await?;

    let limit = config::config().reports.execution_history_limit;
    let executions = queries::reports::list_executions(&pool, tenant.id, report.id, limit).await?;
    Ok(ApiResponse::success(executions))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    #[test]
    fn filename_uses_slug_date_and_extension() {
        assert_eq!(
            report_filename("Active Users (Q1)", day(), ReportFormat::Csv),
            "active-users-q1-20260310.csv"
        );
        assert_eq!(report_filename("  ", day(), ReportFormat::Html), "report-20260310.html");
    }

    #[test]
    fn request_filters_default_to_empty() {
        let req: GenerateRequest = serde_json::from_str(r#"{"format": "tsv"}"#).unwrap();
        assert!(req.filters.is_empty());
        assert_eq!(ReportFormat::parse(req.format.as_deref().unwrap()).unwrap(), ReportFormat::Tsv);
    }

    /// Records calls in memory; optionally refuses to mark runs completed
    #[derive(Default)]
    struct MemoryLog {
        refuse_complete: bool,
        completed: std::sync::Mutex<Vec<(Uuid, i64, String)>>,
        failed: std::sync::Mutex<Vec<(Uuid, String)>>,
    }

    #[async_trait]
    impl ExecutionLog for MemoryLog {
        async fn complete(&self, execution_id: Uuid, row_count: i64, content_sha256: &str) -> Result<(), DatabaseError> {
            if self.refuse_complete {
                return Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
            }
            self.completed.lock().unwrap().push((execution_id, row_count, content_sha256.to_string()));
            Ok(())
        }

        async fn fail(&self, execution_id: Uuid, message: &str) -> Result<(), DatabaseError> {
            self.failed.lock().unwrap().push((execution_id, message.to_string()));
            Ok(())
        }
    }

    fn rendered(body: &str) -> RenderedReport {
        RenderedReport {
            body: body.to_string(),
            content_type: ReportFormat::Csv.content_type(),
        }
    }

    #[tokio::test]
    async fn successful_run_is_completed_with_digest() {
        let log = MemoryLog::default();
        let id = Uuid::new_v4();
        let (out, rows) = settle(&log, id, Ok((rendered("a,b\n"), 1))).await.unwrap();
        assert_eq!(out.body, "a,b\n");
        assert_eq!(rows, 1);

        let completed = log.completed.lock().unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].0, id);
        assert_eq!(completed[0].2, format!("{:x}", Sha256::digest(b"a,b\n")));
        assert!(log.failed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn build_error_marks_run_failed() {
        let log = MemoryLog::default();
        let id = Uuid::new_v4();
        let err = settle(&log, id, Err(ReportError::EmptyColumns)).await.unwrap_err();
        assert!(matches!(err, ReportError::EmptyColumns));

        let failed = log.failed.lock().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0], (id, "A report needs at least one column".to_string()));
        assert!(log.completed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn completion_error_marks_run_failed() {
        let log = MemoryLog {
            refuse_complete: true,
            ..Default::default()
        };
        let id = Uuid::new_v4();
        let err = settle(&log, id, Ok((rendered("x"), 1))).await.unwrap_err();

        let api: ApiError = err.into();
        assert_eq!(api.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
        let failed = log.failed.lock().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, id);
        assert!(!failed[0].1.is_empty());
    }

    #[test]
    fn tenant_export_limit_lowers_row_cap() {
        assert_eq!(row_cap(50_000, 100), 100);
        assert_eq!(row_cap(10_000, 100_000), 10_000);
        assert_eq!(row_cap(10_000, 10_000), 10_000);
    }

    #[test]
    fn unknown_format_is_a_bad_request() {
        let err: ApiError = ReportFormat::parse("xlsx").unwrap_err().into();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
