use sqlx::{types::Json, PgPool};
use tracing::instrument;
use uuid::Uuid;

use crate::database::models::{CreateReport, ExecutionStatus, Report, ReportExecution, UpdateReport};
use crate::database::DatabaseError;
use crate::report::ReportFormat;

const REPORT_COLUMNS: &str = "id, tenant_id, created_by, name, description, data_source, columns, calculations, \
                              filters, created_at, updated_at";

const EXECUTION_COLUMNS: &str = "id, tenant_id, report_id, executed_by, format, status, row_count, \
                                 content_sha256, error_message, started_at, completed_at";

#[instrument(skip(pool))]
pub async fn list(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Report>, DatabaseError> {
    let sql = format!("SELECT {} FROM reports WHERE tenant_id = $1 ORDER BY name", REPORT_COLUMNS);
    let reports = sqlx::query_as::<_, Report>(&sql)
        .bind(tenant_id)
        .fetch_all(pool)
        .await?;
    Ok(reports)
}

#[instrument(skip(pool))]
pub async fn find(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<Option<Report>, DatabaseError> {
    let sql = format!("SELECT {} FROM reports WHERE tenant_id = $1 AND id = $2", REPORT_COLUMNS);
    let report = sqlx::query_as::<_, Report>(&sql)
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(report)
}

#[instrument(skip(pool, input))]
pub async fn create(
    pool: &PgPool,
    tenant_id: Uuid,
    created_by: Uuid,
    input: &CreateReport,
) -> Result<Report, DatabaseError> {
    let sql = format!(
        r#"
        INSERT INTO reports (id, tenant_id, created_by, name, description, data_source, columns, calculations, filters)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {}
        "#,
        REPORT_COLUMNS
    );
    let report = sqlx::query_as::<_, Report>(&sql)
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(created_by)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.data_source.as_str())
        .bind(Json(&input.columns))
        .bind(Json(&input.calculations))
        .bind(Json(&input.filters))
        .fetch_one(pool)
        .await?;
    Ok(report)
}

#[instrument(skip(pool, input))]
pub async fn update(
    pool: &PgPool,
    tenant_id: Uuid,
    id: Uuid,
    input: &UpdateReport,
) -> Result<Option<Report>, DatabaseError> {
    if !input.has_changes() {
        return find(pool, tenant_id, id).await;
    }

    let sql = format!(
        r#"
        UPDATE reports SET
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            columns = COALESCE($5, columns),
            calculations = COALESCE($6, calculations),
            filters = COALESCE($7, filters),
            updated_at = NOW()
        WHERE tenant_id = $1 AND id = $2
        RETURNING {}
        "#,
        REPORT_COLUMNS
    );
    let report = sqlx::query_as::<_, Report>(&sql)
        .bind(tenant_id)
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.columns.as_ref().map(Json))
        .bind(input.calculations.as_ref().map(Json))
        .bind(input.filters.as_ref().map(Json))
        .fetch_optional(pool)
        .await?;
    Ok(report)
}

/// Removes the report and, by cascade, its executions
#[instrument(skip(pool))]
pub async fn delete(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM reports WHERE tenant_id = $1 AND id = $2")
        .bind(tenant_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Record the start of a generation with status `running`
#[instrument(skip(pool))]
pub async fn start_execution(
    pool: &PgPool,
    tenant_id: Uuid,
    report_id: Uuid,
    executed_by: Uuid,
    format: ReportFormat,
) -> Result<ReportExecution, DatabaseError> {
    let sql = format!(
        r#"
        INSERT INTO report_executions (id, tenant_id, report_id, executed_by, format, status, started_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        RETURNING {}
        "#,
        EXECUTION_COLUMNS
    );
    let execution = sqlx::query_as::<_, ReportExecution>(&sql)
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(report_id)
        .bind(executed_by)
        .bind(format.as_str())
        .bind(ExecutionStatus::Running.as_str())
        .fetch_one(pool)
        .await?;
    Ok(execution)
}

#[instrument(skip(pool))]
pub async fn complete_execution(
    pool: &PgPool,
    id: Uuid,
    row_count: i64,
    content_sha256: &str,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE report_executions
        SET status = $2, row_count = $3, content_sha256 = $4, completed_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(ExecutionStatus::Completed.as_str())
    .bind(row_count)
    .bind(content_sha256)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn fail_execution(pool: &PgPool, id: Uuid, error_message: &str) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE report_executions
        SET status = $2, error_message = $3, completed_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(ExecutionStatus::Failed.as_str())
    .bind(error_message)
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recent executions of a report, newest first
#[instrument(skip(pool))]
pub async fn list_executions(
    pool: &PgPool,
    tenant_id: Uuid,
    report_id: Uuid,
    limit: i64,
) -> Result<Vec<ReportExecution>, DatabaseError> {
    let sql = format!(
        r#"
        SELECT {} FROM report_executions
        WHERE tenant_id = $1 AND report_id = $2
        ORDER BY started_at DESC
        LIMIT $3
        "#,
        EXECUTION_COLUMNS
    );
    let executions = sqlx::query_as::<_, ReportExecution>(&sql)
        .bind(tenant_id)
        .bind(report_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(executions)
}
