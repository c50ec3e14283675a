//! Authentication Middleware
//!
//! Bearer token authentication, the admin gate, and the panic boundary that
//! turns a crashed handler into a registry error response.

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};

use super::handlers::AppState;
use crate::app::keys;
use crate::models::UserContext;
use crate::service::TokenError;
use crate::utils::error::{codes, ApiError, CodedError};
use crate::utils::ErrorRegistry;

/// Extension type for storing authenticated user context in request extensions
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserContext);

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Missing or malformed Authorization header")]
    MissingToken,

    #[error(transparent)]
    InvalidToken(#[from] TokenError),

    #[error("Administrator privileges required")]
    AdminRequired,
}

impl CodedError for AccessError {
    fn code(&self) -> &'static str {
        match self {
            AccessError::MissingToken => codes::UNAUTHORIZED,
            AccessError::InvalidToken(err) => err.code(),
            AccessError::AdminRequired => codes::ADMIN_REQUIRED,
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Validate the bearer access token and attach its `AuthUser`.
///
/// Refresh tokens are refused here, as are expired or foreign tokens.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers).ok_or_else(|| state.fail(&AccessError::MissingToken))?;

    let tokens = state.resolve(keys::TOKEN_SERVICE)?;
    let claims = tokens
        .validate_access(token)
        .map_err(|e| state.fail(&AccessError::from(e)))?;

    request
        .extensions_mut()
        .insert(AuthUser(UserContext::from(&claims)));

    Ok(next.run(request).await)
}

/// Admit only admins. Must run after `auth_middleware`.
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| state.fail(&AccessError::MissingToken))?;

    if !user.0.is_admin {
        return Err(state.fail(&AccessError::AdminRequired));
    }

    Ok(next.run(request).await)
}

#[derive(Error, Debug)]
#[error("Handler panicked: {0}")]
struct HandlerPanic(String);

impl CodedError for HandlerPanic {
    fn code(&self) -> &'static str {
        codes::INTERNAL
    }
}

/// Renders a panicking request as the generic internal error
#[derive(Clone)]
pub struct PanicResponder {
    errors: Arc<ErrorRegistry>,
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(
        &mut self,
        err: Box<dyn Any + Send + 'static>,
    ) -> axum::http::Response<Self::ResponseBody> {
        let detail = if let Some(s) = err.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = err.downcast_ref::<&str>() {
            s.to_string()
        } else {
            "unknown panic payload".to_string()
        };

        self.errors.render(&HandlerPanic(detail)).into_response()
    }
}

/// Layer that isolates handler panics to the failing request
pub fn recovery_layer(errors: Arc<ErrorRegistry>) -> CatchPanicLayer<PanicResponder> {
    CatchPanicLayer::custom(PanicResponder { errors })
}
