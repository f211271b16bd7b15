use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use crate::database::models::Tenant;
use crate::database::DatabaseError;

/// Active tenant by id
#[instrument(skip(pool))]
pub async fn find_active(pool: &PgPool, id: Uuid) -> Result<Option<Tenant>, DatabaseError> {
    let tenant = sqlx::query_as::<_, Tenant>(
        r#"
        SELECT id, name, slug, is_active, created_at, updated_at
        FROM tenants
        WHERE id = $1 AND is_active = true
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(tenant)
}

/// Take the tenant row lock so per-tenant limits can be checked and
/// enforced within one transaction
pub async fn lock(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<(), DatabaseError> {
    sqlx::query("SELECT id FROM tenants WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Tenant {} not found", id)))?;
    Ok(())
}
