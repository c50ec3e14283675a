//! Token Service
//!
//! Issues and validates HS256-signed access and refresh tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::config::JwtConfig;
use crate::models::{TokenClaims, TokenPair, TokenType};
use crate::utils::error::{codes, CodedError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The header names an algorithm other than HS256
    #[error("Unexpected token algorithm")]
    UnexpectedAlgorithm,

    #[error("Expected a {expected} token")]
    WrongType { expected: TokenType },

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidAlgorithm => TokenError::UnexpectedAlgorithm,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

impl CodedError for TokenError {
    fn code(&self) -> &'static str {
        match self {
            TokenError::Expired => codes::SESSION_EXPIRED,
            TokenError::WrongType { .. } => codes::WRONG_TOKEN_TYPE,
            TokenError::Signing(_) => codes::INTERNAL,
            TokenError::InvalidSignature
            | TokenError::Malformed(_)
            | TokenError::UnexpectedAlgorithm => codes::UNAUTHORIZED,
        }
    }
}

/// JWT service for token issuance and validation
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    /// Access token lifetime (default: 1 hour)
    access_token_expires_in: Duration,
    /// Refresh token lifetime (default: 7 days)
    refresh_token_expires_in: Duration,
}

impl TokenService {
    /// Create a new token service with default lifetimes
    pub fn new(secret: &str, issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            access_token_expires_in: Duration::hours(1),
            refresh_token_expires_in: Duration::days(7),
        }
    }

    /// Override the token lifetimes
    pub fn with_expiration(mut self, access_expires_in: Duration, refresh_expires_in: Duration) -> Self {
        self.access_token_expires_in = access_expires_in;
        self.refresh_token_expires_in = refresh_expires_in;
        self
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(&config.secret, config.issuer.clone()).with_expiration(
            Duration::minutes(config.access_token_expires_minutes),
            Duration::days(config.refresh_token_expires_days),
        )
    }

    /// Access token lifetime in seconds
    pub fn access_expires_in(&self) -> i64 {
        self.access_token_expires_in.num_seconds()
    }

    pub fn issue_access(&self, user_id: i64, email: &str, is_admin: bool) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = TokenClaims::access(
            user_id,
            email,
            is_admin,
            &self.issuer,
            now,
            now + self.access_token_expires_in,
        );
        self.encode(&claims)
    }

    pub fn issue_refresh(&self, user_id: i64) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims =
            TokenClaims::refresh(user_id, &self.issuer, now, now + self.refresh_token_expires_in);
        self.encode(&claims)
    }

    /// Issue a fresh access and refresh token for a user
    pub fn issue_pair(&self, user_id: i64, email: &str, is_admin: bool) -> Result<TokenPair, TokenError> {
        Ok(TokenPair::new(
            self.issue_access(user_id, email, is_admin)?,
            self.issue_refresh(user_id)?,
            self.access_expires_in(),
        ))
    }

    /// Verify signature, algorithm, issuer and time claims of a token of
    /// either type. A token is valid only while `now < exp`.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation)?;

        // jsonwebtoken still accepts exp == now
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }

    /// Validate a token that must be an access token
    pub fn validate_access(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.validate_typed(token, TokenType::Access)
    }

    /// Validate a token that must be a refresh token
    pub fn validate_refresh(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.validate_typed(token, TokenType::Refresh)
    }

    fn validate_typed(&self, token: &str, expected: TokenType) -> Result<TokenClaims, TokenError> {
        let claims = self.validate(token)?;
        if claims.token_type != expected {
            return Err(TokenError::WrongType { expected });
        }
        Ok(claims)
    }

    fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}
