//! Security Utilities
//!
//! Random code generation, identifier generation and timing-safe comparison.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bcrypt::DEFAULT_COST;
use rand::{rngs::OsRng, Rng};
use uuid::Uuid;

/// Default bcrypt cost for password hashing
pub const DEFAULT_BCRYPT_COST: u32 = DEFAULT_COST;

/// Number of digits in an OTP code
pub const OTP_LENGTH: usize = 6;

/// Generate a 6-digit numeric OTP from the operating system's CSPRNG.
/// Leading zeros are kept, so the result is always six characters.
pub fn generate_otp_code() -> String {
    format!("{:06}", OsRng.gen_range(0..1_000_000u32))
}

/// Generate a patient OPD id: the hospital tag followed by a time-ordered
/// UUIDv7 encoded as unpadded base64url (22 characters).
pub fn generate_opd_id(hospital_tag: &str) -> String {
    format!(
        "{}{}",
        hospital_tag,
        URL_SAFE_NO_PAD.encode(Uuid::now_v7().as_bytes())
    )
}

/// Timing-safe string comparison to prevent timing attacks
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_otp_code_format() {
        for _ in 0..2_000 {
            let otp = generate_otp_code();
            assert_eq!(otp.len(), OTP_LENGTH);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_otp_codes_keep_leading_zeros() {
        // Roughly one code in ten starts with a zero
        let saw_leading_zero = (0..5_000).any(|_| generate_otp_code().starts_with('0'));
        assert!(saw_leading_zero);
    }

    #[test]
    fn test_generate_opd_id_shape() {
        let opd_id = generate_opd_id("LAEL");
        assert!(opd_id.starts_with("LAEL"));
        assert_eq!(opd_id.len(), 4 + 22);
        assert!(opd_id[4..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_generate_opd_id_unique() {
        let ids: HashSet<String> = (0..1_000).map(|_| generate_opd_id("LAEL")).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("123456", "123456"));
        assert!(!constant_time_compare("123456", "123457"));
        assert!(!constant_time_compare("123456", "1234567"));
    }
}
