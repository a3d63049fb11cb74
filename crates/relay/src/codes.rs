//! Access code generation and expiry arithmetic.

use chrono::Utc;
use rand::Rng;

use rgate_core::types::Timestamp;

/// Generate a 6-digit access code.
///
/// Codes are short-lived and paired with the request that produced them;
/// uniqueness is not required.
pub fn generate_access_code() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

/// Compute the expiry timestamp for a code issued now.
pub fn code_expiry(ttl_minutes: i64) -> Timestamp {
    Utc::now() + chrono::Duration::minutes(ttl_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_access_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn expiry_is_in_the_future() {
        let expiry = code_expiry(30);
        assert!(expiry > Utc::now());
        assert!(expiry <= Utc::now() + chrono::Duration::minutes(31));
    }
}
