//! HTTP Request Handlers
//!
//! Axum handlers for processing HTTP requests and responses. Each handler
//! resolves the service it needs from the container and renders failures
//! through the error registry.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::de::DeserializeOwned;

use super::middleware::AuthUser;
use crate::{
    app::keys,
    di::{Container, Key},
    models::*,
    utils::error::{ApiError, ApiResult, AppError, CodedError},
    utils::ErrorRegistry,
    VERSION,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub container: Arc<Container>,
    pub errors: Arc<ErrorRegistry>,
}

impl AppState {
    pub fn new(container: Arc<Container>, errors: Arc<ErrorRegistry>) -> Self {
        Self { container, errors }
    }

    /// Resolve a service, rendering container failures as API errors
    pub fn resolve<T>(&self, key: Key<T>) -> ApiResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.container.resolve(key).map_err(|e| self.fail(&e))
    }

    /// Render a coded error for the caller
    pub fn fail<E: CodedError + ?Sized>(&self, err: &E) -> ApiError {
        self.errors.render(err)
    }
}

/// JSON request body whose rejections use the standard error body
pub struct JsonBody<T>(pub T);

impl<T> FromRequest<AppState> for JsonBody<T>
where
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(state.fail(&AppError::Validation(rejection.body_text()))),
        }
    }
}

type Success<T> = Json<SuccessResponse<T>>;

fn success<T>(data: T) -> Success<T> {
    Json(SuccessResponse::new(data))
}

// =============================================================================
// Auth
// =============================================================================

/// Register a staff account
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> ApiResult<(StatusCode, Success<RegisterResponse>)> {
    let auth = state.resolve(keys::AUTH_SERVICE)?;
    let response = auth
        .register(request, Role::Staff)
        .await
        .map_err(|e| state.fail(&e))?;

    Ok((StatusCode::CREATED, success(response)))
}

/// Verify a registration or login OTP
pub async fn verify_otp(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<VerifyOtpRequest>,
) -> ApiResult<Success<VerifyOtpResponse>> {
    let auth = state.resolve(keys::AUTH_SERVICE)?;
    let response = auth.verify_otp(request).await.map_err(|e| state.fail(&e))?;
    Ok(success(response))
}

pub async fn resend_otp(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ResendOtpRequest>,
) -> ApiResult<Success<MessageResponse>> {
    let auth = state.resolve(keys::AUTH_SERVICE)?;
    let response = auth.resend_otp(request).await.map_err(|e| state.fail(&e))?;
    Ok(success(response))
}

/// Password login with mobile number or email
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> ApiResult<Success<LoginResponse>> {
    let auth = state.resolve(keys::AUTH_SERVICE)?;
    let response = auth.login(request).await.map_err(|e| state.fail(&e))?;
    Ok(success(response))
}

pub async fn request_login_otp(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<IdentifierRequest>,
) -> ApiResult<Success<MessageResponse>> {
    let auth = state.resolve(keys::AUTH_SERVICE)?;
    let response = auth
        .request_login_otp(request)
        .await
        .map_err(|e| state.fail(&e))?;
    Ok(success(response))
}

pub async fn login_with_otp(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginOtpRequest>,
) -> ApiResult<Success<LoginResponse>> {
    let auth = state.resolve(keys::AUTH_SERVICE)?;
    let response = auth
        .login_with_otp(request)
        .await
        .map_err(|e| state.fail(&e))?;
    Ok(success(response))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<IdentifierRequest>,
) -> ApiResult<Success<MessageResponse>> {
    let auth = state.resolve(keys::AUTH_SERVICE)?;
    let response = auth
        .forgot_password(request)
        .await
        .map_err(|e| state.fail(&e))?;
    Ok(success(response))
}

pub async fn reset_password(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ResetPasswordRequest>,
) -> ApiResult<Success<MessageResponse>> {
    let auth = state.resolve(keys::AUTH_SERVICE)?;
    let response = auth
        .reset_password(request)
        .await
        .map_err(|e| state.fail(&e))?;
    Ok(success(response))
}

/// Exchange a refresh token for a new token pair
pub async fn refresh_token(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RefreshTokenRequest>,
) -> ApiResult<Success<TokenPair>> {
    let auth = state.resolve(keys::AUTH_SERVICE)?;
    let tokens = auth
        .refresh_token(request)
        .await
        .map_err(|e| state.fail(&e))?;
    Ok(success(tokens))
}

// =============================================================================
// Admin
// =============================================================================

/// Register another admin. Requires an admin token.
pub async fn register_admin(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> ApiResult<(StatusCode, Success<RegisterResponse>)> {
    let auth = state.resolve(keys::AUTH_SERVICE)?;
    let response = auth
        .register(request, Role::Admin)
        .await
        .map_err(|e| state.fail(&e))?;

    Ok((StatusCode::CREATED, success(response)))
}

/// Approve a staff account
pub async fn approve_user(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(user_id): Path<i64>,
) -> ApiResult<Success<User>> {
    let auth = state.resolve(keys::AUTH_SERVICE)?;
    let user = auth
        .approve_user(admin.user_id, user_id)
        .await
        .map_err(|e| state.fail(&e))?;
    Ok(success(user))
}

// =============================================================================
// Patients
// =============================================================================

pub async fn lookup_patient(
    State(state): State<AppState>,
    Path(mobile): Path<String>,
) -> ApiResult<Success<PatientLookup>> {
    let patients = state.resolve(keys::PATIENT_SERVICE)?;
    let lookup = patients.lookup(&mobile).await.map_err(|e| state.fail(&e))?;
    Ok(success(lookup))
}

/// Register a first visit or a revisit
pub async fn register_patient(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PatientRegisterRequest>,
) -> ApiResult<(StatusCode, Success<PatientRegistration>)> {
    let patients = state.resolve(keys::PATIENT_SERVICE)?;
    let registration = patients
        .register(request)
        .await
        .map_err(|e| state.fail(&e))?;

    Ok((StatusCode::CREATED, success(registration)))
}

/// Record a consultation on the latest visit; the caller is the doctor
pub async fn create_opd_record(
    State(state): State<AppState>,
    Extension(AuthUser(doctor)): Extension<AuthUser>,
    Path(opd_id): Path<String>,
    JsonBody(request): JsonBody<CreateOpdRecordRequest>,
) -> ApiResult<(StatusCode, Success<OpdRecord>)> {
    let patients = state.resolve(keys::PATIENT_SERVICE)?;
    let record = patients
        .record_consultation(doctor.user_id, &opd_id, request)
        .await
        .map_err(|e| state.fail(&e))?;

    Ok((StatusCode::CREATED, success(record)))
}

pub async fn list_opd_records(
    State(state): State<AppState>,
    Path(opd_id): Path<String>,
) -> ApiResult<Success<Vec<OpdRecord>>> {
    let patients = state.resolve(keys::PATIENT_SERVICE)?;
    let records = patients
        .consultation_history(&opd_id)
        .await
        .map_err(|e| state.fail(&e))?;
    Ok(success(records))
}

// =============================================================================
// Health
// =============================================================================

/// Health check endpoint
pub async fn health_check(
    State(state): State<AppState>,
) -> ApiResult<Success<HealthCheckResponse>> {
    // Check database connectivity
    let users = state.resolve(keys::USER_REPOSITORY)?;
    users.ping().await.map_err(|e| state.fail(&e))?;

    let response = HealthCheckResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: VERSION.to_string(),
    };

    Ok(success(response))
}
