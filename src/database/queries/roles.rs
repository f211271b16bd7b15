use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::database::models::{CreateRole, Role, UpdateRole};
use crate::database::DatabaseError;

const ROLE_COLUMNS: &str = "id, tenant_id, name, description, permissions, is_system, created_at, updated_at";

#[instrument(skip(pool))]
pub async fn list(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Role>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM roles WHERE tenant_id = $1 ORDER BY is_system DESC, name",
        ROLE_COLUMNS
    );
    let roles = sqlx::query_as::<_, Role>(&sql)
        .bind(tenant_id)
        .fetch_all(pool)
        .await?;
    Ok(roles)
}

#[instrument(skip(pool))]
pub async fn find(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<Option<Role>, DatabaseError> {
    let sql = format!("SELECT {} FROM roles WHERE tenant_id = $1 AND id = $2", ROLE_COLUMNS);
    let role = sqlx::query_as::<_, Role>(&sql)
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(role)
}

/// Case-insensitive lookup used to expand custom role claims
#[instrument(skip(pool))]
pub async fn find_by_name(pool: &PgPool, tenant_id: Uuid, name: &str) -> Result<Option<Role>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM roles WHERE tenant_id = $1 AND lower(name) = lower($2)",
        ROLE_COLUMNS
    );
    let role = sqlx::query_as::<_, Role>(&sql)
        .bind(tenant_id)
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(role)
}

#[instrument(skip(pool, input))]
pub async fn create(pool: &PgPool, tenant_id: Uuid, input: &CreateRole) -> Result<Role, DatabaseError> {
    let sql = format!(
        r#"
        INSERT INTO roles (id, tenant_id, name, description, permissions, is_system)
        VALUES ($1, $2, $3, $4, $5, false)
        RETURNING {}
        "#,
        ROLE_COLUMNS
    );
    let role = sqlx::query_as::<_, Role>(&sql)
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.permissions)
        .fetch_one(pool)
        .await?;
    Ok(role)
}

/// Updates a non-system role; system roles are never matched
#[instrument(skip(pool, input))]
pub async fn update(
    pool: &PgPool,
    tenant_id: Uuid,
    id: Uuid,
    input: &UpdateRole,
) -> Result<Option<Role>, DatabaseError> {
    let sql = format!(
        r#"
        UPDATE roles SET
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            permissions = COALESCE($5, permissions),
            updated_at = NOW()
        WHERE tenant_id = $1 AND id = $2 AND is_system = false
        RETURNING {}
        "#,
        ROLE_COLUMNS
    );
    let role = sqlx::query_as::<_, Role>(&sql)
        .bind(tenant_id)
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.permissions)
        .fetch_optional(pool)
        .await?;
    Ok(role)
}

#[instrument(skip(pool))]
pub async fn delete(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM roles WHERE tenant_id = $1 AND id = $2 AND is_system = false")
        .bind(tenant_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
