//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (new hub per request, HTTP context)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, `PostgreSQL` store in production)
//! 5. Rate limiting on order placement (governor)
//!
//! Identity is resolved per handler through the extractors in [`identity`].

pub mod identity;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use identity::{
    ACCOUNT_HEADER, CartOwnerExt, RequireAccount, RequireAdmin, clear_current_user, set_current_user,
};
pub use rate_limit::order_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
