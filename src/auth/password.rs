//! Password hashing via bcrypt.

use crate::error::AuthError;

/// bcrypt cost factor. Keeps a verify in the tens of milliseconds.
pub const BCRYPT_COST: u32 = 10;

/// bcrypt reads at most this many bytes of input; anything past it would be
/// ignored, so longer passwords are refused instead.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password with a fresh random salt.
///
/// CPU bound; async callers should run it on a blocking thread and must not
/// hold a lock across the call.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::PasswordTooLong(MAX_PASSWORD_BYTES));
    }
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check a password against a stored hash.
///
/// A malformed or foreign hash is a mismatch, not an error. So is a
/// password too long to ever have been hashed.
pub fn verify_password(password: &str, hash: &str) -> bool {
    if password.len() > MAX_PASSWORD_BYTES {
        return false;
    }
    bcrypt::verify(password, hash).unwrap_or(false)
}
