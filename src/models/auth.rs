//! Authentication Models
//!
//! Data structures for JWT authentication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a signed token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT token pair containing access and refresh tokens
///
/// This structure is returned when a user successfully authenticates
/// or refreshes their tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access token for API authentication
    pub access_token: String,

    /// Long-lived refresh token for obtaining new access tokens
    pub refresh_token: String,

    /// Token type (always "Bearer" for JWT)
    pub token_type: String,

    /// Access token expiration time in seconds
    pub expires_in: i64,
}

impl TokenPair {
    /// Create a new token pair
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// JWT claims shared by access and refresh tokens
///
/// Refresh tokens carry only the subject; identity claims are re-read from
/// the user record when they are exchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject - user ID as a string
    pub sub: String,

    pub user_id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default)]
    pub is_admin: bool,

    #[serde(rename = "type")]
    pub token_type: TokenType,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// JWT ID - unique token identifier
    pub jti: String,
}

impl TokenClaims {
    /// Claims for an access token
    pub fn access(
        user_id: i64,
        email: &str,
        is_admin: bool,
        issuer: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            email: Some(email.to_string()),
            is_admin,
            ..Self::base(user_id, TokenType::Access, issuer, issued_at, expires_at)
        }
    }

    /// Claims for a refresh token
    pub fn refresh(
        user_id: i64,
        issuer: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self::base(user_id, TokenType::Refresh, issuer, issued_at, expires_at)
    }

    fn base(
        user_id: i64,
        token_type: TokenType,
        issuer: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            user_id,
            email: None,
            is_admin: false,
            token_type,
            iss: issuer.to_string(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// User context extracted from JWT tokens
///
/// Inserted into request extensions by the auth middleware and used for
/// authorization decisions.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: i64,
    pub email: Option<String>,
    pub is_admin: bool,

    /// Token ID for tracking
    pub token_id: String,

    /// Token expiration time
    pub expires_at: DateTime<Utc>,
}

impl From<&TokenClaims> for UserContext {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email.clone(),
            is_admin: claims.is_admin,
            token_id: claims.jti.clone(),
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now),
        }
    }
}
