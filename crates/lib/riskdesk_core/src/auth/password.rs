//! Password hashing and credential verification via bcrypt.

use super::AuthError;
use crate::models::auth::AdminAccount;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// Check a submitted password against the account found for an identifier.
///
/// An unknown identifier and a wrong password yield the same
/// [`AuthError::InvalidCredentials`].
pub fn verify_credentials(
    account: Option<AdminAccount>,
    password: &str,
) -> Result<AdminAccount, AuthError> {
    let account = account.ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(password, &account.password_hash)? {
        return Err(AuthError::InvalidCredentials);
    }
    Ok(account)
}
