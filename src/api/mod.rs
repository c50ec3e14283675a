//! API Layer
//!
//! HTTP API endpoints and request handling for the hospital service.

pub mod handlers;
pub mod middleware;
pub mod routes;

// Re-export commonly used types
pub use handlers::{AppState, JsonBody};
pub use middleware::{admin_middleware, auth_middleware, recovery_layer, AccessError, AuthUser};
pub use routes::{create_routes, RouterBuilder};
