//! Request and Response Models
//!
//! Data structures for API request and response payloads with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Address, Designation, Medicine, OtpType, TokenPair, User};
use crate::utils::validation::{
    email_validator, identifier_validator, messages, mobile_validator, name_validator,
    otp_code_validator,
};

/// Request payload for registering a staff or admin account
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "name_validator"))]
    pub name: String,

    /// 10-digit mobile number, unique across accounts
    #[validate(custom(function = "mobile_validator"))]
    pub mobile: String,

    /// Email address, unique across accounts
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    pub designation: Designation,

    /// bcrypt only reads the first 72 bytes
    #[validate(length(min = 8, max = 72, message = "Password must be between 8 and 72 characters"))]
    pub password: String,
}

/// Request payload for OTP verification
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    /// 6-digit OTP code received via email
    #[validate(custom(function = "otp_code_validator"))]
    pub otp: String,

    pub otp_type: OtpType,
}

/// Request payload for re-sending an OTP
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResendOtpRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    pub otp_type: OtpType,
}

/// Request payload for password login
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// Mobile number or email address
    #[validate(custom(function = "identifier_validator"))]
    pub identifier: String,

    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

/// Request payload naming an account by mobile or email
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IdentifierRequest {
    #[validate(custom(function = "identifier_validator"))]
    pub identifier: String,
}

/// Request payload for OTP login
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginOtpRequest {
    #[validate(custom(function = "identifier_validator"))]
    pub identifier: String,

    #[validate(custom(function = "otp_code_validator"))]
    pub otp: String,
}

/// Request payload for resetting a forgotten password
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    #[validate(custom(function = "otp_code_validator"))]
    pub otp: String,

    #[validate(length(min = 8, max = 72, message = "Password must be between 8 and 72 characters"))]
    pub new_password: String,
}

/// Request payload for refreshing access tokens
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    /// Refresh token to exchange for a new token pair
    #[validate(length(min = 1, message = "Refresh token cannot be empty"))]
    pub refresh_token: String,
}

/// Request payload for registering a patient visit.
///
/// Without `opd_id` this is a first visit and every demographic field is
/// required. With `opd_id` it is a revisit: omitted fields are carried over
/// from the latest visit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientRegisterRequest {
    pub mobile: String,
    #[serde(default)]
    pub opd_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub address: Address,
}

/// Request payload for an OPD consultation record
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateOpdRecordRequest {
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub prescription: Vec<String>,
    #[serde(default)]
    #[validate(custom(function = "medicines_validator"))]
    pub medicines: Vec<Medicine>,
    #[serde(default)]
    pub future_suggestions: Vec<String>,
    #[serde(default)]
    pub template_version: Option<i32>,
}

impl CreateOpdRecordRequest {
    /// True when no section carries any content
    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty()
            && self.prescription.is_empty()
            && self.medicines.is_empty()
            && self.future_suggestions.is_empty()
    }
}

fn medicines_validator(medicines: &[Medicine]) -> Result<(), validator::ValidationError> {
    if medicines.iter().any(|m| m.name.trim().is_empty()) {
        return Err(validator::ValidationError::new("medicine_name")
            .with_message(messages::FIELD_REQUIRED.into()));
    }
    Ok(())
}

/// Response for account registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: User,
}

/// Response for OTP verification
///
/// `tokens` is absent when the account still awaits approval.
#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub message: String,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenPair>,
}

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub tokens: TokenPair,
}

/// Response carrying only a message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response for health check
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Standard success response wrapper
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            name: "Nurse Priya".to_string(),
            mobile: "9876543211".to_string(),
            email: "priya@lael.in".to_string(),
            designation: Designation::Nurse,
            password: "correct-horse".to_string(),
        }
    }

    #[test]
    fn test_register_request_validation() {
        assert!(register_request().validate().is_ok());

        let invalid = RegisterRequest {
            mobile: "98765".to_string(),
            ..register_request()
        };
        let errors = invalid.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("mobile"));

        let short_password = RegisterRequest {
            password: "short".to_string(),
            ..register_request()
        };
        assert!(short_password.validate().is_err());
    }

    #[test]
    fn test_verify_otp_request_validation() {
        let request = VerifyOtpRequest {
            email: "priya@lael.in".to_string(),
            otp: "012345".to_string(),
            otp_type: OtpType::Registration,
        };
        assert!(request.validate().is_ok());

        let invalid = VerifyOtpRequest {
            otp: "12345".to_string(),
            ..request
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_login_request_accepts_mobile_or_email() {
        for identifier in ["9876543211", "priya@lael.in"] {
            let request = LoginRequest {
                identifier: identifier.to_string(),
                password: "x".to_string(),
            };
            assert!(request.validate().is_ok(), "{identifier}");
        }

        let invalid = LoginRequest {
            identifier: "priya".to_string(),
            password: "x".to_string(),
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_patient_request_defaults() {
        let request: PatientRegisterRequest =
            serde_json::from_str(r#"{"mobile": "9999999999", "opd_id": "LAELabc", "age": 31}"#)
                .unwrap();

        assert_eq!(request.age, Some(31));
        assert_eq!(request.name, None);
        assert_eq!(request.address, Address::default());
    }

    #[test]
    fn test_opd_record_request_validation() {
        let request = CreateOpdRecordRequest {
            medicines: vec![Medicine {
                name: " ".to_string(),
                dose: None,
                morning: true,
                afternoon: false,
                night: false,
            }],
            ..Default::default()
        };
        assert!(request.validate().is_err());
        assert!(CreateOpdRecordRequest::default().is_empty());
    }

    #[test]
    fn test_success_response_wrapper() {
        let json = serde_json::to_value(SuccessResponse::new(MessageResponse::new("ok"))).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["message"], "ok");
    }
}
