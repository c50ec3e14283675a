//! Service Layer
//!
//! Business logic for staff authentication and patient registration.

pub mod auth;
pub mod credential;
pub mod email_service;
pub mod email_templates;
pub mod otp;
pub mod patient;
pub mod token;

// Re-export services
pub use auth::{AuthError, AuthService};
pub use credential::{CredentialError, CredentialService, PasswordCheck};
pub use email_service::{LogMailer, MailError, Mailer, SmtpMailer};
pub use email_templates::{EmailTemplates, RenderedEmail};
pub use otp::{OtpError, OtpPolicy, OtpRecipient, OtpService};
pub use patient::{PatientError, PatientService};
pub use token::{TokenError, TokenService};
