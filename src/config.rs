use std::{env, path::PathBuf, sync::Arc};

use crate::error::AuthError;
use crate::token::{HmacSigner, JsonWebTokenSigner, TokenSigner};

const DEFAULT_TTL: &str = "1h";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerKind {
    Hmac,
    JsonWebToken,
}

impl SignerKind {
    fn parse(value: &str) -> Result<Self, AuthError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hmac" => Ok(SignerKind::Hmac),
            "jsonwebtoken" | "jwt" => Ok(SignerKind::JsonWebToken),
            other => Err(AuthError::Configuration(format!(
                "unknown TOKEN_SIGNER {other:?}"
            ))),
        }
    }
}

pub struct Config {
    pub jwt_secret: String,
    pub token_ttl: i64,
    pub signer: SignerKind,
    pub users_file: Option<PathBuf>,
    pub bind_addr: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("signer", &self.signer)
            .field("users_file", &self.users_file)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::Configuration("JWT_SECRET must be set".into()))?;

        let token_ttl = parse_ttl(&lookup("JWT_EXPIRES").unwrap_or_else(|| DEFAULT_TTL.into()))?;

        let signer = match lookup("TOKEN_SIGNER") {
            Some(value) => SignerKind::parse(&value)?,
            None => SignerKind::Hmac,
        };

        Ok(Config {
            jwt_secret,
            token_ttl,
            signer,
            users_file: lookup("USERS_FILE").filter(|s| !s.is_empty()).map(PathBuf::from),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
        })
    }

    pub fn build_signer(&self) -> Result<Arc<dyn TokenSigner>, AuthError> {
        let secret = self.jwt_secret.as_bytes();
        let signer: Arc<dyn TokenSigner> = match self.signer {
            SignerKind::Hmac => Arc::new(HmacSigner::new(secret)?),
            SignerKind::JsonWebToken => Arc::new(JsonWebTokenSigner::new(secret)?),
        };
        Ok(signer)
    }
}

/// Parses `3600`, `90s`, `15m`, `1h` or `7d` into seconds.
pub fn parse_ttl(value: &str) -> Result<i64, AuthError> {
    let value = value.trim();
    let invalid = || AuthError::Validation(format!("invalid JWT_EXPIRES {value:?}"));

    let (digits, unit) = match value.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&value[..i], c.to_ascii_lowercase()),
        Some(_) => (value, 's'),
        None => return Err(invalid()),
    };
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return Err(invalid()),
    };

    let amount: i64 = digits.trim().parse().map_err(|_| invalid())?;
    let seconds = amount.checked_mul(multiplier).ok_or_else(invalid)?;
    if seconds <= 0 {
        return Err(AuthError::Validation(format!(
            "JWT_EXPIRES must be positive, got {value:?}"
        )));
    }
    Ok(seconds)
}
