// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/admin/*
// Middleware: JWT validation → rate limit → tenant validation.
// Each handler then checks its own permission with `require_permission`.

pub mod clients;
pub mod filter_presets;
pub mod permissions;
pub mod reports;
pub mod roles;
pub mod settings;
pub mod users;
pub mod utils;
