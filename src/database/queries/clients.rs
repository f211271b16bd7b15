use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::database::models::{Client, ClientStatus, CreateClient, UpdateClient};
use crate::database::DatabaseError;

const CLIENT_COLUMNS: &str = "id, tenant_id, name, contact_name, contact_email, phone, status, notes, \
                              created_by, created_at, updated_at";

/// Clients of a tenant, optionally narrowed by a name/contact substring and status
#[instrument(skip(pool))]
pub async fn list(
    pool: &PgPool,
    tenant_id: Uuid,
    query: Option<&str>,
    status: Option<ClientStatus>,
) -> Result<Vec<Client>, DatabaseError> {
    let sql = format!(
        r#"
        SELECT {} FROM clients
        WHERE tenant_id = $1
          AND ($2::text IS NULL
               OR strpos(lower(name), lower($2)) > 0
               OR strpos(lower(coalesce(contact_name, '')), lower($2)) > 0
               OR strpos(lower(coalesce(contact_email, '')), lower($2)) > 0)
          AND ($3::text IS NULL OR status = $3)
        ORDER BY name
        "#,
        CLIENT_COLUMNS
    );
    let clients = sqlx::query_as::<_, Client>(&sql)
        .bind(tenant_id)
        .bind(query)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(pool)
        .await?;
    Ok(clients)
}

/// Up to `limit` clients, used as report rows
#[instrument(skip(pool))]
pub async fn list_limited(pool: &PgPool, tenant_id: Uuid, limit: i64) -> Result<Vec<Client>, DatabaseError> {
    let sql = format!("SELECT {} FROM clients WHERE tenant_id = $1 ORDER BY name LIMIT $2", CLIENT_COLUMNS);
    let clients = sqlx::query_as::<_, Client>(&sql)
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(clients)
}

#[instrument(skip(pool))]
pub async fn find(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<Option<Client>, DatabaseError> {
    let sql = format!("SELECT {} FROM clients WHERE tenant_id = $1 AND id = $2", CLIENT_COLUMNS);
    let client = sqlx::query_as::<_, Client>(&sql)
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(client)
}

#[instrument(skip(pool, input))]
pub async fn create(
    pool: &PgPool,
    tenant_id: Uuid,
    created_by: Uuid,
    input: &CreateClient,
) -> Result<Client, DatabaseError> {
    let sql = format!(
        r#"
        INSERT INTO clients (id, tenant_id, name, contact_name, contact_email, phone, status, notes, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {}
        "#,
        CLIENT_COLUMNS
    );
    let client = sqlx::query_as::<_, Client>(&sql)
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(&input.name)
        .bind(&input.contact_name)
        .bind(&input.contact_email)
        .bind(&input.phone)
        .bind(input.status.as_str())
        .bind(&input.notes)
        .bind(created_by)
        .fetch_one(pool)
        .await?;
    Ok(client)
}

#[instrument(skip(pool, input))]
pub async fn update(
    pool: &PgPool,
    tenant_id: Uuid,
    id: Uuid,
    input: &UpdateClient,
) -> Result<Option<Client>, DatabaseError> {
    if !input.has_changes() {
        return find(pool, tenant_id, id).await;
    }

    let sql = format!(
        r#"
        UPDATE clients SET
            name = COALESCE($3, name),
            contact_name = COALESCE($4, contact_name),
            contact_email = COALESCE($5, contact_email),
            phone = COALESCE($6, phone),
            status = COALESCE($7, status),
            notes = COALESCE($8, notes),
            updated_at = NOW()
        WHERE tenant_id = $1 AND id = $2
        RETURNING {}
        "#,
        CLIENT_COLUMNS
    );
    let client = sqlx::query_as::<_, Client>(&sql)
        .bind(tenant_id)
        .bind(id)
        .bind(&input.name)
        .bind(&input.contact_name)
        .bind(&input.contact_email)
        .bind(&input.phone)
        .bind(input.status.map(|s| s.as_str()))
        .bind(&input.notes)
        .fetch_optional(pool)
        .await?;
    Ok(client)
}

#[instrument(skip(pool))]
pub async fn delete(pool: &PgPool, tenant_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM clients WHERE tenant_id = $1 AND id = $2")
        .bind(tenant_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
