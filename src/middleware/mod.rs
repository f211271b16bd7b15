pub mod auth;
pub mod json;
pub mod rate_limit;
pub mod response;
pub mod validate_tenant;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use json::ApiJson;
pub use rate_limit::{rate_limit_middleware, FixedWindowLimiter, RateLimitDecision, RateLimiter, SharedRateLimiter, Unlimited};
pub use response::{ApiResponse, ApiResult};
pub use validate_tenant::{validate_tenant_middleware, DbPool, TenantContext};
