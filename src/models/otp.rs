//! OTP Models
//!
//! One-time codes used for registration verification, password-less login
//! and password reset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Purpose an OTP was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "otp_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    Registration,
    Login,
    ForgotPassword,
}

impl std::fmt::Display for OtpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OtpType::Registration => write!(f, "registration"),
            OtpType::Login => write!(f, "login"),
            OtpType::ForgotPassword => write!(f, "forgot_password"),
        }
    }
}

/// Database row representation of an OTP record
#[derive(Debug, Clone, FromRow)]
pub struct OtpRecord {
    /// Unique identifier for the OTP record
    pub id: i64,
    /// Mobile number of the account the code was sent for, if known
    pub mobile: Option<String>,
    /// Address the code was delivered to
    pub email: String,
    /// 6-digit numeric OTP code
    pub otp_code: String,
    pub otp_type: OtpType,
    /// When the OTP expires
    pub expires_at: DateTime<Utc>,
    pub is_validated: bool,
    /// Number of failed verification attempts
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OtpRecord {
    /// Check if the OTP has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Values for a new OTP record
#[derive(Debug, Clone)]
pub struct NewOtp {
    pub mobile: Option<String>,
    pub email: String,
    pub otp_code: String,
    pub otp_type: OtpType,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of checking a submitted code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpVerification {
    Valid,
    Invalid,
    Expired,
    NotFound,
    /// Retry limit reached; the code is no longer compared
    Exhausted,
}

impl OtpVerification {
    pub fn is_valid(self) -> bool {
        matches!(self, OtpVerification::Valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_is_expired_at_boundary() {
        let now = Utc::now();
        let record = OtpRecord {
            id: 1,
            mobile: None,
            email: "a@b.in".to_string(),
            otp_code: "012345".to_string(),
            otp_type: OtpType::Login,
            expires_at: now,
            is_validated: false,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        };

        assert!(!record.is_expired_at(now));
        assert!(record.is_expired_at(now + Duration::seconds(1)));
    }

    #[test]
    fn test_otp_type_wire_names() {
        let parsed: OtpType = serde_json::from_str("\"forgot_password\"").unwrap();
        assert_eq!(parsed, OtpType::ForgotPassword);
        assert_eq!(OtpType::ForgotPassword.to_string(), "forgot_password");
    }
}
