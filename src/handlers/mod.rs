// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (JWT auth, rate limit, tenant, permission)

pub mod public;    // `/`, `/health`
pub mod protected; // `/api/admin/*`
