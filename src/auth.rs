use argon2::{
    password_hash::{
        rand_core::OsRng,
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString
    },
    Argon2
};
use anyhow::{Result, Context};
use log::{error, info};

use crate::directory::UserDirectory;
use crate::error::AuthError;
use crate::models::Identity;

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let algo = Argon2::default();
    let password_hash = algo
        .hash_password(password.as_bytes(), &salt)
        .context("Failed to hash password")?;
    Ok(password_hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash).context("Failed to parse password hash")?;
    let algo = Argon2::default();
    match algo.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false), // Incorrect password
        Err(e) => Err(e).context("Failed to verify password"),
    }
}

/// Argon2id hash (default cost) checked when the email is unknown, so both
/// rejection paths pay for one password verification.
const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$yiJI1f8jy7gOLY8GTOf71A$h3COxCnQuDizRx3rQ9/5cuHdFIJSyNDnBh94YzUCl/M";

/// Checks an email/password pair against the directory.
///
/// Every kind of mismatch collapses into `AuthError::AuthFailure` so callers
/// cannot tell an unknown email from a wrong password.
pub fn verify_credentials(
    directory: &dyn UserDirectory,
    email: &str,
    password: &str,
) -> Result<Identity, AuthError> {
    check_credentials(directory, email, password, verify_password)
}

fn check_credentials<F>(
    directory: &dyn UserDirectory,
    email: &str,
    password: &str,
    verify: F,
) -> Result<Identity, AuthError>
where
    F: Fn(&str, &str) -> Result<bool>,
{
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::AuthFailure);
    }

    let user = match directory.find_by_email(email) {
        Some(user) => user,
        None => {
            let _ = verify(UNKNOWN_USER_HASH, password);
            info!("Login rejected");
            return Err(AuthError::AuthFailure);
        }
    };

    match verify(&user.password_hash, password) {
        Ok(true) => Ok(Identity::from(&user)),
        Ok(false) => {
            info!("Login rejected");
            Err(AuthError::AuthFailure)
        }
        Err(err) => {
            error!("Stored password hash for a user is unusable: {:#}", err);
            Err(AuthError::AuthFailure)
        }
    }
}
