/// One-time passwords for e-mail verification and password reset
///
/// Codes are 6 decimal digits drawn uniformly from `000000..=999999` with a
/// cryptographically secure RNG, valid for 10 minutes. Only the SHA-256 hex
/// digest is persisted; verification compares digests in constant time.
///
/// # Example
///
/// ```
/// use dsamate_shared::auth::otp::{generate_otp, check_otp};
/// use chrono::Utc;
///
/// let otp = generate_otp();
/// assert_eq!(otp.code.len(), 6);
/// assert!(check_otp(&otp.code, Some(&otp.digest), Some(otp.expires_at), Utc::now()).is_ok());
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// OTP validity window in minutes
pub const OTP_TTL_MINUTES: i64 = 10;

/// Error type for OTP verification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    /// No OTP pending or the code does not match
    #[error("Invalid OTP.")]
    Invalid,

    /// The pending OTP is past its expiry
    #[error("OTP has expired.")]
    Expired,
}

/// A freshly issued OTP
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    /// Plain code, only ever sent by mail
    pub code: String,

    /// SHA-256 hex digest of the code, stored on the user row
    pub digest: String,

    /// Expiry instant
    pub expires_at: DateTime<Utc>,
}

/// Generates a new 6-digit OTP valid for [`OTP_TTL_MINUTES`]
pub fn generate_otp() -> IssuedOtp {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    let code = format!("{:06}", n);
    let digest = digest_otp(&code);

    IssuedOtp {
        code,
        digest,
        expires_at: Utc::now() + Duration::minutes(OTP_TTL_MINUTES),
    }
}

/// SHA-256 hex digest of an OTP
pub fn digest_otp(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

/// Checks a submitted code against the stored digest and expiry
///
/// A mismatch is reported before expiry, so a wrong code on an expired OTP
/// still yields [`OtpError::Invalid`].
pub fn check_otp(
    submitted: &str,
    stored_digest: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), OtpError> {
    let stored = stored_digest.ok_or(OtpError::Invalid)?;
    let candidate = digest_otp(submitted);

    if !constant_time_eq(candidate.as_bytes(), stored.as_bytes()) {
        return Err(OtpError::Invalid);
    }

    match expires_at {
        Some(expiry) if expiry > now => Ok(()),
        _ => Err(OtpError::Expired),
    }
}

/// Byte comparison whose running time does not depend on where inputs differ
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_otp_format() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.code.len(), 6);
            assert!(otp.code.chars().all(|c| c.is_ascii_digit()));
            assert_eq!(otp.digest, digest_otp(&otp.code));
        }
    }

    #[test]
    fn test_generate_otp_expiry() {
        let before = Utc::now();
        let otp = generate_otp();
        let ttl = otp.expires_at - before;
        assert!(ttl <= Duration::minutes(10));
        assert!(ttl > Duration::minutes(9));
    }

    #[test]
    fn test_digest_is_sha256_hex() {
        assert_eq!(
            digest_otp("123456"),
            "8d969eef6ecad3c29a3a629280e686cf0c3f5d5a86aff3ca12020c923adc6c92"
        );
    }

    #[test]
    fn test_check_otp_valid() {
        let now = Utc::now();
        let digest = digest_otp("042042");
        assert_eq!(
            check_otp("042042", Some(&digest), Some(now + Duration::minutes(5)), now),
            Ok(())
        );
    }

    #[test]
    fn test_check_otp_mismatch() {
        let now = Utc::now();
        let digest = digest_otp("042042");
        assert_eq!(
            check_otp("042043", Some(&digest), Some(now + Duration::minutes(5)), now),
            Err(OtpError::Invalid)
        );
    }

    #[test]
    fn test_check_otp_none_pending() {
        assert_eq!(check_otp("000000", None, None, Utc::now()), Err(OtpError::Invalid));
    }

    #[test]
    fn test_check_otp_expired() {
        let now = Utc::now();
        let digest = digest_otp("111111");
        assert_eq!(
            check_otp("111111", Some(&digest), Some(now - Duration::seconds(1)), now),
            Err(OtpError::Expired)
        );
        assert_eq!(
            check_otp("111111", Some(&digest), None, now),
            Err(OtpError::Expired)
        );
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
