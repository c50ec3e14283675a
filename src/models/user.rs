//! User Models
//!
//! Staff and administrator accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Job designation of a staff member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_designation", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Designation {
    Doctor,
    Nurse,
    Staff,
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    TemporarilyInactive,
}

/// Role an account is registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Staff => write!(f, "staff"),
        }
    }
}

/// Public user representation (excludes sensitive data like password hash)
///
/// This is the user model returned by API endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub mobile: String,
    pub email: String,
    pub designation: Designation,
    pub status: UserStatus,
    pub is_admin: bool,
    pub is_approved: bool,
    pub is_verified: bool,
    pub approved_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Full account row including the password hash.
///
/// Only the authentication flow and the repositories see this type.
#[derive(Debug, Clone, FromRow)]
pub struct UserWithPassword {
    pub id: i64,
    pub name: String,
    pub mobile: String,
    pub email: String,
    pub designation: Designation,
    pub status: UserStatus,
    pub is_admin: bool,
    pub is_approved: bool,
    pub is_verified: bool,
    pub approved_by: Option<i64>,
    /// `None` until a password has been set
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<UserWithPassword> for User {
    fn from(user: UserWithPassword) -> Self {
        Self {
            id: user.id,
            name: user.name,
            mobile: user.mobile,
            email: user.email,
            designation: user.designation,
            status: user.status,
            is_admin: user.is_admin,
            is_approved: user.is_approved,
            is_verified: user.is_verified,
            approved_by: user.approved_by,
            created_at: user.created_at,
            updated_at: user.updated_at,
            last_login: user.last_login,
        }
    }
}

/// Values for a new account row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub mobile: String,
    pub email: String,
    pub designation: Designation,
    pub is_admin: bool,
    pub is_approved: bool,
    pub is_verified: bool,
    pub password_hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_excludes_password_hash() {
        let now = Utc::now();
        let row = UserWithPassword {
            id: 7,
            name: "Nurse Priya".to_string(),
            mobile: "9876543211".to_string(),
            email: "priya@lael.in".to_string(),
            designation: Designation::Nurse,
            status: UserStatus::Active,
            is_admin: false,
            is_approved: false,
            is_verified: false,
            approved_by: None,
            password_hash: Some("$2b$04$hash".to_string()),
            created_at: now,
            updated_at: now,
            last_login: None,
        };

        let json = serde_json::to_value(User::from(row)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["designation"], "nurse");
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&UserStatus::TemporarilyInactive).unwrap(),
            "\"temporarily_inactive\""
        );
        let designation: Designation = serde_json::from_str("\"doctor\"").unwrap();
        assert_eq!(designation, Designation::Doctor);
        assert!(serde_json::from_str::<Designation>("\"surgeon\"").is_err());
    }
}
