// Public handlers: no authentication required

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseManager;

/// GET / - Service descriptor
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Tenant Admin API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant admin dashboard backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "users": "/api/admin/users[/:id], /api/admin/users/views (protected)",
                "exports": "/api/admin/users/exports/schedule (protected)",
                "clients": "/api/admin/clients[/:id] (protected)",
                "roles": "/api/admin/roles[/:id], /api/admin/permissions (protected)",
                "presets": "/api/admin/filter-presets[/:id] (protected)",
                "reports": "/api/admin/reports[/:id][/generate|/executions] (protected)",
                "settings": "/api/admin/settings/user-management (protected)",
            }
        }
    }))
}

/// GET /health - Database connectivity probe
pub async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
