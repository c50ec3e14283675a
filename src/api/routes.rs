//! API Route Definitions
//!
//! This module defines all HTTP routes and their corresponding handlers using a
//! builder pattern. The RouterBuilder enables route groups selectively, so a
//! deployment can expose only the parts of the API it needs.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use super::handlers::*;
use super::middleware::{admin_middleware, auth_middleware};

/// Builder for creating API routes with configurable route groups
#[derive(Default)]
pub struct RouterBuilder {
    /// GET /health
    health_check: bool,
    /// Public staff authentication under /auth
    auth: bool,
    /// Admin-only account management under /admin
    admin: bool,
    /// Authenticated patient registration and OPD records under /patients
    patients: bool,
}

impl RouterBuilder {
    /// Creates a new router builder with all routes disabled by default
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router builder with every route group enabled
    pub fn with_all_routes() -> Self {
        Self {
            health_check: true,
            auth: true,
            admin: true,
            patients: true,
        }
    }

    /// Staff authentication and account administration without patient
    /// routes
    pub fn with_auth_routes() -> Self {
        Self {
            health_check: true,
            auth: true,
            admin: true,
            patients: false,
        }
    }

    /// Creates a router with only the health check, for monitoring
    pub fn with_minimal_routes() -> Self {
        Self {
            health_check: true,
            ..Self::default()
        }
    }

    /// Enables or disables the health check endpoint (GET /health)
    pub fn health_check(mut self, enabled: bool) -> Self {
        self.health_check = enabled;
        self
    }

    /// Enables or disables registration, OTP, login, password reset and
    /// token refresh endpoints
    pub fn auth(mut self, enabled: bool) -> Self {
        self.auth = enabled;
        self
    }

    /// Enables or disables admin registration and staff approval
    pub fn admin(mut self, enabled: bool) -> Self {
        self.admin = enabled;
        self
    }

    /// Enables or disables patient lookup, registration and OPD records
    pub fn patients(mut self, enabled: bool) -> Self {
        self.patients = enabled;
        self
    }

    /// Builds the router with the configured routes and the given state
    pub fn build(self, state: AppState) -> Router {
        let mut router = Router::new();

        if self.health_check {
            router = router.route("/health", get(health_check));
        }

        if self.auth {
            router = router
                .route("/auth/register", post(register))
                .route("/auth/verify-otp", post(verify_otp))
                .route("/auth/resend-otp", post(resend_otp))
                .route("/auth/login", post(login))
                .route("/auth/login/otp/request", post(request_login_otp))
                .route("/auth/login/otp", post(login_with_otp))
                .route("/auth/forgot-password", post(forgot_password))
                .route("/auth/reset-password", post(reset_password))
                .route("/auth/refresh-token", post(refresh_token));
        }

        if self.admin {
            let admin = Router::new()
                .route("/admin/register", post(register_admin))
                .route("/admin/users/{id}/approve", post(approve_user))
                .route_layer(from_fn_with_state(state.clone(), admin_middleware))
                .route_layer(from_fn_with_state(state.clone(), auth_middleware));
            router = router.merge(admin);
        }

        if self.patients {
            let patients = Router::new()
                .route("/patients/lookup/{mobile}", get(lookup_patient))
                .route("/patients/register", post(register_patient))
                .route(
                    "/patients/{opd_id}/opd-records",
                    get(list_opd_records).post(create_opd_record),
                )
                .route_layer(from_fn_with_state(state.clone(), auth_middleware));
            router = router.merge(patients);
        }

        router.with_state(state)
    }
}

/// Creates all API routes
pub fn create_routes(state: AppState) -> Router {
    RouterBuilder::with_all_routes().build(state)
}
