//! Field checks for register and login payloads.
//!
//! Fields are checked in the order email, password, username and the first
//! failure is reported.

use crate::auth::password::MAX_PASSWORD_BYTES;
use crate::error::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=30;

pub fn validate_register(email: &str, password: &str, username: &str) -> Result<(), ValidationError> {
    validate_email(email)?;
    validate_password(password)?;
    validate_username(username)
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    validate_email(email)?;
    validate_password(password)
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }

    let (local, domain) = email.split_once('@').ok_or(ValidationError::InvalidEmail)?;
    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty());

    if local.is_empty() || !domain_ok {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::InvalidCredentials);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::PasswordTooLong);
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';

    if !USERNAME_LEN.contains(&username.len()) || !username.chars().all(allowed) {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(())
}
