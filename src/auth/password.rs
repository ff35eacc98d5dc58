use bcrypt::{hash, verify};
use log::warn;

/// bcrypt only reads this many bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password must be at most 72 bytes, got {0}")]
    TooLong(usize),
    #[error(transparent)]
    Bcrypt(#[from] bcrypt::BcryptError),
}

/// One-way credential hashing backed by bcrypt.
///
/// Every call to [`PasswordHasher::hash`] draws a fresh salt, so hashing the same
/// plaintext twice yields two different strings that both verify.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// `cost` must lie within bcrypt's `MIN_COST..=MAX_COST`; `Config` checks this at startup.
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Refuses input longer than [`MAX_PASSWORD_BYTES`] instead of letting
    /// bcrypt truncate it.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong(password.len()));
        }
        Ok(hash(password, self.cost)?)
    }

    /// Returns `true` iff `password` produced `hashed_password`.
    ///
    /// A malformed stored hash is treated as a mismatch, and so is an over-long
    /// password, since no stored hash can have come from one. bcrypt compares
    /// the digests in constant time.
    pub fn verify(&self, password: &str, hashed_password: &str) -> bool {
        if password.len() > MAX_PASSWORD_BYTES {
            return false;
        }
        match verify(password, hashed_password) {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Stored credential hash could not be parsed: {}", e);
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4 /* bcrypt's (private) MIN_COST */)
    }

    #[test]
    fn test_password_hashing_and_verification() {
        let password = "test_password123";
        let hashed = hasher().hash(password).unwrap();

        assert!(hasher().verify(password, &hashed));
        assert!(!hasher().verify("wrong_password", &hashed));
    }

    #[test]
    fn test_hash_is_salted_and_opaque() {
        let password = "secret1";
        let first = hasher().hash(password).unwrap();
        let second = hasher().hash(password).unwrap();

        assert_ne!(first, password);
        assert_ne!(first, second);
        assert!(hasher().verify(password, &first));
        assert!(hasher().verify(password, &second));
    }

    #[test]
    fn test_verify_with_invalid_hash() {
        assert!(!hasher().verify("test_password123", "invalidhashformat"));
        assert!(!hasher().verify("test_password123", ""));
    }

    #[test]
    fn test_hash_respects_cost() {
        let hasher = hasher();
        let hashed = hasher.hash("cost_check").unwrap();
        assert!(hashed.starts_with(&format!("$2b${:02}$", hasher.cost())));
    }

    #[test]
    fn test_long_passwords_are_not_truncated() {
        let at_limit = "a".repeat(MAX_PASSWORD_BYTES);
        let hashed = hasher().hash(&at_limit).unwrap();
        assert!(hasher().verify(&at_limit, &hashed));

        let registered = format!("{}X", at_limit);
        assert!(matches!(
            hasher().hash(&registered),
            Err(PasswordError::TooLong(73))
        ));
        // Shares the first 72 bytes with a stored hash but must not match it.
        assert!(!hasher().verify(&format!("{}Y", at_limit), &hashed));

        // 36 two-byte characters fill the limit exactly; one more goes over.
        let multibyte = "é".repeat(36);
        assert!(hasher().hash(&multibyte).is_ok());
        assert!(hasher().hash(&format!("{}é", multibyte)).is_err());
    }
}
