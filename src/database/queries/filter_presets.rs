use sqlx::{types::Json, PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use crate::database::models::{CreateFilterPreset, FilterPreset, UpdateFilterPreset};
use crate::database::DatabaseError;

const PRESET_COLUMNS: &str = "id, tenant_id, created_by, name, description, filters, is_public, is_default, \
                              created_at, updated_at";

/// Presets owned by `user_id` plus the tenant's public presets
#[instrument(skip(pool))]
pub async fn list_visible(pool: &PgPool, tenant_id: Uuid, user_id: Uuid) -> Result<Vec<FilterPreset>, DatabaseError> {
    let sql = format!(
        r#"
        SELECT {} FROM filter_presets
        WHERE tenant_id = $1 AND (created_by = $2 OR is_public = true)
        ORDER BY is_default DESC, name
        "#,
        PRESET_COLUMNS
    );
    let presets = sqlx::query_as::<_, FilterPreset>(&sql)
        .bind(tenant_id)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(presets)
}

/// Lookup within the tenant regardless of owner; visibility is the caller's call
#[instrument(skip(pool))]
pub async fn find(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<Option<FilterPreset>, DatabaseError> {
    let sql = format!("SELECT {} FROM filter_presets WHERE tenant_id = $1 AND id = $2", PRESET_COLUMNS);
    let preset = sqlx::query_as::<_, FilterPreset>(&sql)
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(preset)
}

async fn clear_defaults(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    owner: Uuid,
    keep: Option<Uuid>,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE filter_presets SET is_default = false, updated_at = NOW()
        WHERE tenant_id = $1 AND created_by = $2 AND is_default = true
          AND ($3::uuid IS NULL OR id <> $3)
        "#,
    )
    .bind(tenant_id)
    .bind(owner)
    .bind(keep)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Insert a preset; a new default replaces the owner's previous default
#[instrument(skip(pool, input))]
pub async fn create(
    pool: &PgPool,
    tenant_id: Uuid,
    owner: Uuid,
    input: &CreateFilterPreset,
) -> Result<FilterPreset, DatabaseError> {
    let mut tx = pool.begin().await?;

    if input.is_default {
        clear_defaults(&mut tx, tenant_id, owner, None).await?;
    }

    let sql = format!(
        r#"
        INSERT INTO filter_presets (id, tenant_id, created_by, name, description, filters, is_public, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        PRESET_COLUMNS
    );
    let preset = sqlx::query_as::<_, FilterPreset>(&sql)
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(owner)
        .bind(&input.name)
        .bind(&input.description)
        .bind(Json(&input.filters))
        .bind(input.is_public)
        .bind(input.is_default)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(preset)
}

/// Update a preset owned by `owner`
#[instrument(skip(pool, input))]
pub async fn update(
    pool: &PgPool,
    tenant_id: Uuid,
    owner: Uuid,
    id: Uuid,
    input: &UpdateFilterPreset,
) -> Result<Option<FilterPreset>, DatabaseError> {
    let mut tx = pool.begin().await?;

    if input.is_default == Some(true) {
        clear_defaults(&mut tx, tenant_id, owner, Some(id)).await?;
    }

    let sql = format!(
        r#"
        UPDATE filter_presets SET
            name = COALESCE($4, name),
            description = COALESCE($5, description),
            filters = COALESCE($6, filters),
            is_public = COALESCE($7, is_public),
            is_default = COALESCE($8, is_default),
            updated_at = NOW()
        WHERE tenant_id = $1 AND created_by = $2 AND id = $3
        RETURNING {}
        "#,
        PRESET_COLUMNS
    );
    let preset = sqlx::query_as::<_, FilterPreset>(&sql)
        .bind(tenant_id)
        .bind(owner)
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.filters.as_ref().map(Json))
        .bind(input.is_public)
        .bind(input.is_default)
        .fetch_optional(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(preset)
}

#[instrument(skip(pool))]
pub async fn delete(pool: &PgPool, tenant_id: Uuid, owner: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM filter_presets WHERE tenant_id = $1 AND created_by = $2 AND id = $3")
        .bind(tenant_id)
        .bind(owner)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
