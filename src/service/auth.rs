//! Auth Service
//!
//! Staff and admin account lifecycle: registration, OTP verification,
//! password and OTP login, password reset, token refresh and approval.
//!
//! An account can sign in once it passes three gates, checked in order:
//! approved (admins are approved at registration), active, and verified
//! through the registration OTP.

use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;
use thiserror::Error;
use validator::Validate;

use crate::models::{
    IdentifierRequest, LoginOtpRequest, LoginRequest, LoginResponse, MessageResponse, NewUser,
    OtpType, OtpVerification, RefreshTokenRequest, RegisterRequest, RegisterResponse,
    ResendOtpRequest, ResetPasswordRequest, Role, TokenPair, User, UserStatus, UserWithPassword,
    VerifyOtpRequest, VerifyOtpResponse,
};
use crate::repository::{retry_read, RepositoryError, UserRepository};
use crate::service::credential::{CredentialError, CredentialService, PasswordCheck};
use crate::service::email_service::{MailError, Mailer};
use crate::service::email_templates::{EmailTemplates, RenderedEmail};
use crate::service::otp::{OtpError, OtpRecipient, OtpService};
use crate::service::token::{TokenError, TokenService};
use crate::utils::error::{codes, CodedError};
use crate::utils::validation::{describe_errors, normalize_email, validate_mobile};

const MSG_REGISTERED: &str =
    "Registration successful. Enter the OTP sent to your email to verify your account.";
const MSG_VERIFIED: &str = "Account verified successfully.";
const MSG_AWAITING_APPROVAL: &str =
    "Account verified. You can sign in once an administrator approves it.";
const MSG_LOGIN_OTP_SENT: &str = "If an account exists for this identifier, an OTP has been sent.";
const MSG_RESET_OTP_SENT: &str =
    "If an account exists for this identifier, a password reset code has been sent.";
const MSG_OTP_RESENT: &str = "If an account exists for this email, a new code has been sent.";
const MSG_PASSWORD_RESET: &str = "Password has been reset successfully.";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid mobile number")]
    InvalidMobile,

    #[error("Password must be between 8 and 72 characters")]
    InvalidPassword,

    /// Unknown account, unset password and wrong password all end here
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("OTP has expired")]
    OtpExpired,

    #[error("Maximum OTP attempts exceeded")]
    OtpAttemptsExceeded,

    #[error("Account is pending approval")]
    PendingApproval,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Account is not verified")]
    AccountNotVerified,

    #[error("Administrator privileges required")]
    AdminRequired,

    #[error(transparent)]
    Token(#[from] TokenError),

    /// The account was created but its registration OTP could not be sent
    #[error("User {user_id} created but OTP delivery failed: {source}")]
    OtpDelivery { user_id: i64, source: OtpError },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

impl From<OtpError> for AuthError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::Repository(err) => AuthError::Repository(err),
            OtpError::Delivery(err) => AuthError::Mail(err),
        }
    }
}

impl CodedError for AuthError {
    fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => codes::BAD_REQUEST,
            AuthError::InvalidMobile => codes::INVALID_MOBILE,
            AuthError::InvalidPassword => codes::INVALID_PASSWORD,
            AuthError::InvalidCredentials => codes::INVALID_CREDENTIALS,
            AuthError::UserAlreadyExists => codes::USER_ALREADY_EXISTS,
            AuthError::UserNotFound => codes::USER_NOT_FOUND,
            AuthError::InvalidOtp => codes::INVALID_OTP,
            AuthError::OtpExpired => codes::OTP_EXPIRED,
            AuthError::OtpAttemptsExceeded => codes::MAX_OTP_ATTEMPTS,
            AuthError::PendingApproval => codes::PENDING_APPROVAL,
            AuthError::AccountInactive => codes::ACCOUNT_INACTIVE,
            AuthError::AccountNotVerified => codes::ACCOUNT_NOT_VERIFIED,
            AuthError::AdminRequired => codes::ADMIN_REQUIRED,
            AuthError::Token(err) => err.code(),
            AuthError::OtpDelivery { .. } => codes::OTP_DELIVERY_FAILED,
            AuthError::Credential(err) => err.code(),
            AuthError::Repository(_) | AuthError::Mail(_) => codes::SERVICE_UNAVAILABLE,
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Validate a request, reporting mobile and password problems with their
/// dedicated codes
fn validate_request<T: Validate>(request: &T) -> AuthResult<()> {
    request.validate().map_err(|errors| {
        let fields = errors.field_errors();
        if fields.contains_key("mobile") {
            AuthError::InvalidMobile
        } else if fields.contains_key("password") || fields.contains_key("new_password") {
            AuthError::InvalidPassword
        } else {
            AuthError::Validation(describe_errors(&errors))
        }
    })
}

/// Approval, status and verification gates, in that order
fn ensure_can_sign_in(user: &UserWithPassword) -> AuthResult<()> {
    if !user.is_admin && !user.is_approved {
        return Err(AuthError::PendingApproval);
    }

    if user.status != UserStatus::Active {
        return Err(AuthError::AccountInactive);
    }

    if !user.is_verified {
        return Err(AuthError::AccountNotVerified);
    }

    Ok(())
}

fn recipient(user: &UserWithPassword) -> OtpRecipient<'_> {
    OtpRecipient {
        email: &user.email,
        name: &user.name,
        mobile: Some(&user.mobile),
    }
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    otp: Arc<OtpService>,
    tokens: Arc<TokenService>,
    credentials: Arc<CredentialService>,
    mailer: Arc<dyn Mailer>,
    templates: Arc<EmailTemplates>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        otp: Arc<OtpService>,
        tokens: Arc<TokenService>,
        credentials: Arc<CredentialService>,
        mailer: Arc<dyn Mailer>,
        templates: Arc<EmailTemplates>,
    ) -> Self {
        Self {
            users,
            otp,
            tokens,
            credentials,
            mailer,
            templates,
        }
    }

    /// Create an account and send its registration OTP.
    ///
    /// Admins are approved immediately; staff wait for an admin. Both must
    /// verify the OTP before they can sign in. When the OTP cannot be sent
    /// the account is kept and `OtpDelivery` is returned.
    pub async fn register(&self, request: RegisterRequest, role: Role) -> AuthResult<RegisterResponse> {
        let user = self.insert_account(request, role, false).await?;

        info!("Registered {} account {} ({})", role, user.id, user.email);

        if let Err(err) = self.otp.generate_and_send(recipient(&user), OtpType::Registration).await {
            error!("Registration OTP for user {} was not delivered: {}", user.id, err);
            return Err(AuthError::OtpDelivery {
                user_id: user.id,
                source: err,
            });
        }

        Ok(RegisterResponse {
            message: MSG_REGISTERED.to_string(),
            user: user.into(),
        })
    }

    /// Verify a registration or login OTP.
    ///
    /// Registration codes mark the account verified and return tokens only
    /// when the account may already sign in. Password reset codes are
    /// refused here; they are consumed by `reset_password`.
    pub async fn verify_otp(&self, request: VerifyOtpRequest) -> AuthResult<VerifyOtpResponse> {
        validate_request(&request)?;

        if request.otp_type == OtpType::ForgotPassword {
            return Err(AuthError::Validation(
                "Password reset codes are verified by resetting the password".to_string(),
            ));
        }

        let email = normalize_email(&request.email);
        self.check_otp(&email, &request.otp, request.otp_type).await?;

        let mut user = self
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if request.otp_type == OtpType::Registration && !user.is_verified {
            self.users.mark_verified(user.id).await?;
            user.is_verified = true;
            info!("User {} verified their account", user.id);

            let awaiting_approval = !user.is_admin && !user.is_approved;
            self.send_best_effort(&user.email, self.templates.welcome(&user.name, awaiting_approval))
                .await;
        }

        match ensure_can_sign_in(&user) {
            Ok(()) => {
                let login = self.sign_in(user).await?;
                Ok(VerifyOtpResponse {
                    message: MSG_VERIFIED.to_string(),
                    user: login.user,
                    tokens: Some(login.tokens),
                })
            }
            Err(AuthError::PendingApproval) if request.otp_type == OtpType::Registration => {
                Ok(VerifyOtpResponse {
                    message: MSG_AWAITING_APPROVAL.to_string(),
                    user: user.into(),
                    tokens: None,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Re-send the active code of the given type, or a new one
    pub async fn resend_otp(&self, request: ResendOtpRequest) -> AuthResult<MessageResponse> {
        validate_request(&request)?;

        let email = normalize_email(&request.email);
        if let Some(user) = self.find_by_email(&email).await? {
            self.otp.resend(recipient(&user), request.otp_type).await?;
        }

        Ok(MessageResponse::new(MSG_OTP_RESENT))
    }

    /// Password login by mobile number or email.
    ///
    /// Unknown accounts, accounts without a password and wrong passwords
    /// all fail with the same `InvalidCredentials`.
    pub async fn login(&self, request: LoginRequest) -> AuthResult<LoginResponse> {
        validate_request(&request)?;

        let user = self
            .find_by_identifier(&request.identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let password_hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        if self.credentials.verify(password_hash, &request.password)? == PasswordCheck::Mismatch {
            return Err(AuthError::InvalidCredentials);
        }

        ensure_can_sign_in(&user)?;
        self.sign_in(user).await
    }

    /// Send a login OTP. The response does not reveal whether the account
    /// exists.
    pub async fn request_login_otp(&self, request: IdentifierRequest) -> AuthResult<MessageResponse> {
        validate_request(&request)?;
        self.send_if_exists(&request.identifier, OtpType::Login).await?;
        Ok(MessageResponse::new(MSG_LOGIN_OTP_SENT))
    }

    /// Login with a code from `request_login_otp`
    pub async fn login_with_otp(&self, request: LoginOtpRequest) -> AuthResult<LoginResponse> {
        validate_request(&request)?;

        // Unknown accounts fail like a wrong code
        let user = self
            .find_by_identifier(&request.identifier)
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        self.check_otp(&user.email, &request.otp, OtpType::Login).await?;

        ensure_can_sign_in(&user)?;
        self.sign_in(user).await
    }

    /// Send a password reset code. The response does not reveal whether
    /// the account exists.
    pub async fn forgot_password(&self, request: IdentifierRequest) -> AuthResult<MessageResponse> {
        validate_request(&request)?;
        self.send_if_exists(&request.identifier, OtpType::ForgotPassword)
            .await?;
        Ok(MessageResponse::new(MSG_RESET_OTP_SENT))
    }

    /// Set a new password with a code from `forgot_password`
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> AuthResult<MessageResponse> {
        validate_request(&request)?;

        let email = normalize_email(&request.email);
        self.check_otp(&email, &request.otp, OtpType::ForgotPassword)
            .await?;

        let user = self
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let password_hash = self.credentials.hash(&request.new_password)?;
        self.users.update_password(user.id, &password_hash).await?;
        info!("Password reset for user {}", user.id);

        self.send_best_effort(
            &user.email,
            self.templates.password_reset_confirmation(&user.name),
        )
        .await;

        Ok(MessageResponse::new(MSG_PASSWORD_RESET))
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The account is re-read so that revoked approval or deactivation take
    /// effect. Old refresh tokens stay valid until they expire.
    pub async fn refresh_token(&self, request: RefreshTokenRequest) -> AuthResult<TokenPair> {
        validate_request(&request)?;

        let claims = self.tokens.validate_refresh(&request.refresh_token)?;

        let user = self
            .find_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        ensure_can_sign_in(&user)?;
        Ok(self.tokens.issue_pair(user.id, &user.email, user.is_admin)?)
    }

    /// Approve a staff account. Approving an approved account is a no-op.
    pub async fn approve_user(&self, approver_id: i64, user_id: i64) -> AuthResult<User> {
        let approver = self.find_by_id(approver_id).await?;
        if !approver.is_some_and(|a| a.is_admin) {
            return Err(AuthError::AdminRequired);
        }

        let user = self
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.is_approved {
            return Ok(user.into());
        }

        let approved = self
            .users
            .approve(user_id, approver_id)
            .await
            .map_err(|err| match err {
                RepositoryError::Missing(_) => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        info!("User {} approved by {}", user_id, approver_id);
        Ok(approved.into())
    }

    /// Create an admin that can sign in immediately, without an OTP round
    /// trip. Used to bootstrap the first administrator.
    pub async fn create_verified_admin(&self, request: RegisterRequest) -> AuthResult<User> {
        let user = self.insert_account(request, Role::Admin, true).await?;
        info!("Bootstrapped admin account {} ({})", user.id, user.email);
        Ok(user.into())
    }

    async fn insert_account(
        &self,
        request: RegisterRequest,
        role: Role,
        verified: bool,
    ) -> AuthResult<UserWithPassword> {
        validate_request(&request)?;

        let email = normalize_email(&request.email);
        let mobile = request.mobile.trim().to_string();

        if self.find_by_mobile(&mobile).await?.is_some()
            || self.find_by_email(&email).await?.is_some()
        {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = self.credentials.hash(&request.password)?;

        self.users
            .create(NewUser {
                name: request.name.trim().to_string(),
                mobile,
                email,
                designation: request.designation,
                is_admin: role.is_admin(),
                is_approved: role.is_admin(),
                is_verified: verified,
                password_hash: Some(password_hash),
            })
            .await
            .map_err(|err| match err {
                RepositoryError::Duplicate(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    async fn sign_in(&self, mut user: UserWithPassword) -> AuthResult<LoginResponse> {
        let now = Utc::now();
        self.users.update_last_login(user.id, now).await?;
        user.last_login = Some(now);

        let tokens = self.tokens.issue_pair(user.id, &user.email, user.is_admin)?;
        info!("User {} signed in", user.id);

        Ok(LoginResponse {
            user: user.into(),
            tokens,
        })
    }

    async fn check_otp(&self, email: &str, code: &str, otp_type: OtpType) -> AuthResult<()> {
        match self.otp.verify(email, code, otp_type).await? {
            OtpVerification::Valid => Ok(()),
            OtpVerification::Invalid | OtpVerification::NotFound => Err(AuthError::InvalidOtp),
            OtpVerification::Expired => Err(AuthError::OtpExpired),
            OtpVerification::Exhausted => Err(AuthError::OtpAttemptsExceeded),
        }
    }

    /// Send a code when the account exists. Delivery failures are logged
    /// only, so the caller's response is the same either way.
    async fn send_if_exists(&self, identifier: &str, otp_type: OtpType) -> AuthResult<()> {
        let Some(user) = self.find_by_identifier(identifier).await? else {
            info!("{} OTP requested for unknown account", otp_type);
            return Ok(());
        };

        match self.otp.generate_and_send(recipient(&user), otp_type).await {
            Ok(()) => Ok(()),
            Err(OtpError::Delivery(err)) => {
                warn!("{} OTP for user {} was not delivered: {}", otp_type, user.id, err);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn send_best_effort(&self, to: &str, email: Result<RenderedEmail, MailError>) {
        let result = match email {
            Ok(email) => self.mailer.send(to, &email.subject, &email.html).await,
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            warn!("Notification email to {} failed: {}", to, err);
        }
    }

    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<UserWithPassword>> {
        let identifier = identifier.trim();
        if validate_mobile(identifier) {
            self.find_by_mobile(identifier).await
        } else {
            self.find_by_email(&normalize_email(identifier)).await
        }
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserWithPassword>> {
        Ok(retry_read("user lookup by email", || self.users.get_by_email(email)).await?)
    }

    async fn find_by_mobile(&self, mobile: &str) -> AuthResult<Option<UserWithPassword>> {
        Ok(retry_read("user lookup by mobile", || self.users.get_by_mobile(mobile)).await?)
    }

    async fn find_by_id(&self, id: i64) -> AuthResult<Option<UserWithPassword>> {
        Ok(retry_read("user lookup by id", || self.users.get_by_id(id)).await?)
    }
}
