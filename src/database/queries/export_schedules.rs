use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::database::models::{BulkScheduleAction, CreateExportSchedule, ExportSchedule, UpdateExportSchedule};
use crate::database::DatabaseError;

use super::tenants;

const SCHEDULE_COLUMNS: &str = "id, tenant_id, created_by, name, frequency, format, recipients, day_of_week, \
                                day_of_month, time, email_subject, email_body, filter_preset_id, is_active, \
                                last_run_at, next_run_at, created_at, updated_at";

/// Result of an insert guarded by the per-tenant schedule limit
#[derive(Debug)]
pub enum ScheduleInsert {
    Created(ExportSchedule),
    LimitReached { existing: i64 },
}

#[instrument(skip(pool))]
pub async fn list(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<ExportSchedule>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM export_schedules WHERE tenant_id = $1 ORDER BY created_at DESC",
        SCHEDULE_COLUMNS
    );
    let schedules = sqlx::query_as::<_, ExportSchedule>(&sql)
        .bind(tenant_id)
        .fetch_all(pool)
        .await?;
    Ok(schedules)
}

#[instrument(skip(pool))]
pub async fn find(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<Option<ExportSchedule>, DatabaseError> {
    let sql = format!("SELECT {} FROM export_schedules WHERE tenant_id = $1 AND id = $2", SCHEDULE_COLUMNS);
    let schedule = sqlx::query_as::<_, ExportSchedule>(&sql)
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(schedule)
}

/// Count and insert under the tenant row lock so concurrent creates
/// cannot overshoot `max_per_tenant`
#[instrument(skip(pool, input))]
pub async fn create_within_limit(
    pool: &PgPool,
    tenant_id: Uuid,
    created_by: Uuid,
    input: &CreateExportSchedule,
    next_run_at: DateTime<Utc>,
    max_per_tenant: i64,
) -> Result<ScheduleInsert, DatabaseError> {
    let mut tx = pool.begin().await?;
    tenants::lock(&mut tx, tenant_id).await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM export_schedules WHERE tenant_id = $1")
        .bind(tenant_id)
        .fetch_one(&mut *tx)
        .await?;

    if existing >= max_per_tenant {
        tx.rollback().await?;
        return Ok(ScheduleInsert::LimitReached { existing });
    }

    let sql = format!(
        r#"
        INSERT INTO export_schedules (
            id, tenant_id, created_by, name, frequency, format, recipients, day_of_week,
            day_of_month, time, email_subject, email_body, filter_preset_id, is_active, next_run_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING {}
        "#,
        SCHEDULE_COLUMNS
    );
    let schedule = sqlx::query_as::<_, ExportSchedule>(&sql)
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(created_by)
        .bind(&input.name)
        .bind(input.frequency.as_str())
        .bind(input.format.as_str())
        .bind(&input.recipients)
        .bind(input.day_of_week)
        .bind(input.day_of_month)
        .bind(input.time.format("%H:%M").to_string())
        .bind(&input.email_subject)
        .bind(&input.email_body)
        .bind(input.filter_preset_id)
        .bind(input.is_active)
        .bind(next_run_at)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(ScheduleInsert::Created(schedule))
}

/// Overwrite every editable column with already-merged values
#[instrument(skip(pool, input))]
pub async fn update(
    pool: &PgPool,
    tenant_id: Uuid,
    id: Uuid,
    input: &UpdateExportSchedule,
) -> Result<Option<ExportSchedule>, DatabaseError> {
    let sql = format!(
        r#"
        UPDATE export_schedules SET
            name = $3, frequency = $4, format = $5, recipients = $6, day_of_week = $7,
            day_of_month = $8, time = $9, email_subject = $10, email_body = $11,
            filter_preset_id = $12, is_active = $13, next_run_at = $14, updated_at = NOW()
        WHERE tenant_id = $1 AND id = $2
        RETURNING {}
        "#,
        SCHEDULE_COLUMNS
    );
    let schedule = sqlx::query_as::<_, ExportSchedule>(&sql)
        .bind(tenant_id)
        .bind(id)
        .bind(&input.name)
        .bind(input.frequency.as_str())
        .bind(input.format.as_str())
        .bind(&input.recipients)
        .bind(input.day_of_week)
        .bind(input.day_of_month)
        .bind(input.time.format("%H:%M").to_string())
        .bind(&input.email_subject)
        .bind(&input.email_body)
        .bind(input.filter_preset_id)
        .bind(input.is_active)
        .bind(input.next_run_at)
        .fetch_optional(pool)
        .await?;
    Ok(schedule)
}

/// Apply a bulk action to the tenant's rows among `ids`. Toggling flips
/// each row's own flag.
#[instrument(skip(pool, ids))]
pub async fn apply_bulk_action(
    pool: &PgPool,
    tenant_id: Uuid,
    ids: &[Uuid],
    action: BulkScheduleAction,
) -> Result<Vec<ExportSchedule>, DatabaseError> {
    let assignment = match action {
        BulkScheduleAction::Activate => "is_active = true",
        BulkScheduleAction::Deactivate => "is_active = false",
        BulkScheduleAction::ToggleActive => "is_active = NOT is_active",
    };
    let sql = format!(
        r#"
        UPDATE export_schedules SET {}, updated_at = NOW()
        WHERE tenant_id = $1 AND id = ANY($2)
        RETURNING {}
        "#,
        assignment, SCHEDULE_COLUMNS
    );
    let schedules = sqlx::query_as::<_, ExportSchedule>(&sql)
        .bind(tenant_id)
        .bind(ids)
        .fetch_all(pool)
        .await?;
    Ok(schedules)
}

/// Delete the tenant's rows among `ids`, returning how many went
#[instrument(skip(pool, ids))]
pub async fn delete_many(pool: &PgPool, tenant_id: Uuid, ids: &[Uuid]) -> Result<u64, DatabaseError> {
    let result = sqlx::query("DELETE FROM export_schedules WHERE tenant_id = $1 AND id = ANY($2)")
        .bind(tenant_id)
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
