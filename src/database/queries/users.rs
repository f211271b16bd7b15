use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::database::models::{CreateUser, UpdateUser, User};
use crate::database::DatabaseError;

const USER_COLUMNS: &str = "id, tenant_id, email, name, role, status, department, phone, \
                            last_login_at, created_at, updated_at";

/// All users of a tenant, ordered by name
#[instrument(skip(pool))]
pub async fn list(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<User>, DatabaseError> {
    let sql = format!("SELECT {} FROM users WHERE tenant_id = $1 ORDER BY name, email", USER_COLUMNS);
    let users = sqlx::query_as::<_, User>(&sql)
        .bind(tenant_id)
        .fetch_all(pool)
        .await?;
    Ok(users)
}

/// Up to `limit` users, used as report rows
#[instrument(skip(pool))]
pub async fn list_limited(pool: &PgPool, tenant_id: Uuid, limit: i64) -> Result<Vec<User>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM users WHERE tenant_id = $1 ORDER BY name, email LIMIT $2",
        USER_COLUMNS
    );
    let users = sqlx::query_as::<_, User>(&sql)
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(users)
}

#[instrument(skip(pool))]
pub async fn find(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {} FROM users WHERE tenant_id = $1 AND id = $2", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

#[instrument(skip(pool, input))]
pub async fn create(pool: &PgPool, tenant_id: Uuid, input: &CreateUser) -> Result<User, DatabaseError> {
    let sql = format!(
        r#"
        INSERT INTO users (id, tenant_id, email, name, role, status, department, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(&input.email)
        .bind(&input.name)
        .bind(input.role.as_str())
        .bind(input.status.as_str())
        .bind(&input.department)
        .bind(&input.phone)
        .fetch_one(pool)
        .await?;
    Ok(user)
}

/// Apply the provided fields; `None` leaves a column unchanged
#[instrument(skip(pool, input))]
pub async fn update(
    pool: &PgPool,
    tenant_id: Uuid,
    id: Uuid,
    input: &UpdateUser,
) -> Result<Option<User>, DatabaseError> {
    if !input.has_changes() {
        return find(pool, tenant_id, id).await;
    }

    let sql = format!(
        r#"
        UPDATE users SET
            email = COALESCE($3, email),
            name = COALESCE($4, name),
            role = COALESCE($5, role),
            status = COALESCE($6, status),
            department = COALESCE($7, department),
            phone = COALESCE($8, phone),
            updated_at = NOW()
        WHERE tenant_id = $1 AND id = $2
        RETURNING {}
        "#,
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(tenant_id)
        .bind(id)
        .bind(&input.email)
        .bind(&input.name)
        .bind(input.role.map(|r| r.as_str()))
        .bind(input.status.map(|s| s.as_str()))
        .bind(&input.department)
        .bind(&input.phone)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Returns whether a row was removed
#[instrument(skip(pool))]
pub async fn delete(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM users WHERE tenant_id = $1 AND id = $2")
        .bind(tenant_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
