//! Data Models Module
//!
//! This module contains all data structures used throughout the hospital
//! service: staff accounts, OTP records, tokens, patients and the
//! request/response payloads of the HTTP API.

pub mod auth;
pub mod otp;
pub mod patient;
pub mod requests;
pub mod user;

// Re-export commonly used types
pub use auth::*;
pub use otp::*;
pub use patient::*;
pub use requests::*;
pub use user::*;
