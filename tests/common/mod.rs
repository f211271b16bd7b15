#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use sqlx::PgPool;
use uuid::Uuid;

use tenant_admin_api::auth::{generate_jwt, Claims};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tenant-admin-api"));
        cmd.env("ADMIN_API_PORT", port.to_string())
            .arg("--bind")
            .arg("127.0.0.1")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Schema has to exist before database-backed tests run
        if database_url().is_some() {
            cmd.arg("--migrate");
        }

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    // Same .env the server loads, so both sides agree on JWT_SECRET
    let _ = dotenvy::dotenv();
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(30)).await?;
    Ok(server)
}

pub fn database_url() -> Option<String> {
    let _ = dotenvy::dotenv();
    std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty())
}

/// Signed bearer token for a session in `tenant_id`
pub fn token(tenant_id: Uuid, user_id: Uuid, role: &str, permissions: &[&str]) -> Result<String> {
    let claims = Claims::new(
        tenant_id,
        user_id,
        format!("{}@example.com", user_id.simple()),
        role.to_string(),
        permissions.iter().map(|p| p.to_string()).collect(),
    );
    Ok(generate_jwt(&claims)?)
}

/// Database-backed test context: a running server plus a fresh tenant
pub struct TenantFixture {
    pub server: &'static TestServer,
    pub pool: PgPool,
    pub tenant_id: Uuid,
    pub client: reqwest::Client,
}

impl TenantFixture {
    /// Returns None (and the test should pass trivially) without DATABASE_URL
    pub async fn setup() -> Result<Option<Self>> {
        let Some(url) = database_url() else {
            eprintln!("DATABASE_URL not set; skipping database-backed test");
            return Ok(None);
        };

        let server = ensure_server().await?;
        let pool = PgPool::connect(&url).await.context("failed to connect test pool")?;

        let tenant_id = Uuid::new_v4();
        sqlx::query("INSERT INTO tenants (id, name, slug) VALUES ($1, $2, $3)")
            .bind(tenant_id)
            .bind("Test Tenant")
            .bind(format!("test-{}", tenant_id.simple()))
            .execute(&pool)
            .await
            .context("failed to seed tenant")?;

        Ok(Some(Self {
            server,
            pool,
            tenant_id,
            client: reqwest::Client::new(),
        }))
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.base_url, path)
    }

    pub fn admin_token(&self, user_id: Uuid) -> Result<String> {
        token(self.tenant_id, user_id, "ADMIN", &[])
    }

    pub async fn count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE tenant_id = $1", table);
        let (count,): (i64,) = sqlx::query_as(&sql).bind(self.tenant_id).fetch_one(&self.pool).await?;
        Ok(count)
    }
}
