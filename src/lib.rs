pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod permissions;
pub mod report;

#[cfg(test)]
pub mod testing;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::config;
use crate::middleware::{
    jwt_auth_middleware, rate_limit, rate_limit_middleware, validate_tenant_middleware, SharedRateLimiter,
};

/// Full application router with the configured rate limiter
pub fn app() -> Router {
    app_with_limiter(rate_limit::from_config(&config().api))
}

pub fn app_with_limiter(limiter: SharedRateLimiter) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        // Protected API
        .merge(protected_routes(limiter))
        // Global middleware
        .layer(DefaultBodyLimit::max(config().api.max_request_size_bytes))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn protected_routes(limiter: SharedRateLimiter) -> Router {
    Router::new()
        .merge(user_routes())
        .merge(client_routes())
        .merge(role_routes())
        .merge(preset_routes())
        .merge(report_routes())
        .route(
            "/api/admin/settings/user-management",
            get(handlers::protected::settings::get).put(handlers::protected::settings::put),
        )
        // Layers run bottom-up: JWT first, then rate limit, then tenant
        .layer(from_fn(validate_tenant_middleware))
        .layer(from_fn_with_state(limiter, rate_limit_middleware))
        .layer(from_fn(jwt_auth_middleware))
}

fn user_routes() -> Router {
    use handlers::protected::users;

    Router::new()
        .route("/api/admin/users", get(users::users_get).post(users::users_post))
        .route("/api/admin/users/views", get(users::views_get))
        .route(
            "/api/admin/users/exports/schedule",
            get(users::export_schedule::get)
                .post(users::export_schedule::post)
                .patch(users::export_schedule::patch)
                .delete(users::export_schedule::delete),
        )
        .route(
            "/api/admin/users/:id",
            get(users::user_get).patch(users::user_patch).delete(users::user_delete),
        )
}

fn client_routes() -> Router {
    use handlers::protected::clients;

    Router::new()
        .route("/api/admin/clients", get(clients::list).post(clients::create))
        .route(
            "/api/admin/clients/:id",
            get(clients::get).patch(clients::patch).delete(clients::delete),
        )
}

fn role_routes() -> Router {
    use handlers::protected::{permissions, roles};

    Router::new()
        .route("/api/admin/roles", get(roles::list).post(roles::create))
        .route(
            "/api/admin/roles/:id",
            get(roles::get).patch(roles::patch).delete(roles::delete),
        )
        .route("/api/admin/permissions", get(permissions::list))
}

fn preset_routes() -> Router {
    use handlers::protected::filter_presets;

    Router::new()
        .route(
            "/api/admin/filter-presets",
            get(filter_presets::list).post(filter_presets::create),
        )
        .route(
            "/api/admin/filter-presets/:id",
            get(filter_presets::get)
                .patch(filter_presets::patch)
                .delete(filter_presets::delete),
        )
}

fn report_routes() -> Router {
    use axum::routing::post;
    use handlers::protected::reports;

    Router::new()
        .route("/api/admin/reports", get(reports::list).post(reports::create))
        .route(
            "/api/admin/reports/:id",
            get(reports::get).patch(reports::patch).delete(reports::delete),
        )
        .route("/api/admin/reports/:id/generate", post(reports::generate))
        .route("/api/admin/reports/:id/executions", get(reports::executions))
}

fn cors_layer() -> CorsLayer {
    let origins = &config().security.cors_origins;
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}
