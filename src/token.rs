use std::sync::Arc;

use base64::{
    engine::general_purpose::{GeneralPurpose, STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use log::debug;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;

use crate::error::AuthError;
use crate::models::Identity;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_TYPE: &str = "JWT";

/// Computes and checks the signature part of a token.
pub trait TokenSigner: Send + Sync {
    /// Value written to the header's `alg` field.
    fn algorithm(&self) -> &'static str;

    /// Returns the encoded signature over `message`.
    fn sign(&self, message: &[u8]) -> Result<String, AuthError>;

    fn verify(&self, message: &[u8], signature: &str) -> bool;

    /// Base64 flavour for the header and payload parts.
    fn part_engine(&self) -> &'static GeneralPurpose {
        &STANDARD
    }
}

/// HMAC-SHA256 computed directly; the signature is standard base64.
pub struct HmacSigner {
    secret: Vec<u8>,
}

impl HmacSigner {
    pub fn new(secret: &[u8]) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Configuration("signing secret is empty".into()));
        }
        Ok(Self { secret: secret.to_vec() })
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError::Configuration(format!("unusable HMAC key: {e}")))
    }
}

impl TokenSigner for HmacSigner {
    fn algorithm(&self) -> &'static str {
        "HS256"
    }

    fn sign(&self, message: &[u8]) -> Result<String, AuthError> {
        let mut mac = self.mac()?;
        mac.update(message);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    fn verify(&self, message: &[u8], signature: &str) -> bool {
        let Ok(expected) = STANDARD.decode(signature) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(message);
        mac.verify_slice(&expected).is_ok()
    }
}

/// HS256 signing delegated to the `jsonwebtoken` crate. Tokens use unpadded
/// URL-safe parts, so they are standard JWTs.
pub struct JsonWebTokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JsonWebTokenSigner {
    pub fn new(secret: &[u8]) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Configuration("signing secret is empty".into()));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }
}

impl TokenSigner for JsonWebTokenSigner {
    fn algorithm(&self) -> &'static str {
        "HS256"
    }

    fn sign(&self, message: &[u8]) -> Result<String, AuthError> {
        jsonwebtoken::crypto::sign(message, &self.encoding_key, Algorithm::HS256)
            .map_err(|e| AuthError::Configuration(format!("failed to sign token: {e}")))
    }

    fn verify(&self, message: &[u8], signature: &str) -> bool {
        jsonwebtoken::crypto::verify(signature, message, &self.decoding_key, Algorithm::HS256)
            .unwrap_or(false)
    }

    fn part_engine(&self) -> &'static GeneralPurpose {
        &URL_SAFE_NO_PAD
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

/// Token payload. Field order is the serialized key order and is covered by
/// the signature.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub email: String,
    pub name: String,
    pub exp: i64,
}

/// Issues and verifies `header.payload.signature` tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    signer: Arc<dyn TokenSigner>,
    ttl_seconds: i64,
}

impl TokenIssuer {
    pub fn new(signer: Arc<dyn TokenSigner>, ttl_seconds: i64) -> Result<Self, AuthError> {
        if ttl_seconds <= 0 {
            return Err(AuthError::Validation(format!(
                "token ttl must be positive, got {ttl_seconds}"
            )));
        }
        Ok(Self { signer, ttl_seconds })
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, AuthError> {
        self.issue_at(identity, Utc::now())
    }

    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, AuthError> {
        let exp = now
            .timestamp()
            .checked_add(self.ttl_seconds)
            .ok_or_else(|| AuthError::Validation("token expiry overflows".into()))?;

        let header = TokenHeader {
            alg: self.signer.algorithm().to_owned(),
            typ: TOKEN_TYPE.to_owned(),
        };
        let claims = Claims {
            email: identity.email.clone(),
            name: identity.name.clone(),
            exp,
        };

        let engine = self.signer.part_engine();
        let signing_input = format!(
            "{}.{}",
            encode_part(engine, &header)?,
            encode_part(engine, &claims)?
        );
        let signature = self.signer.sign(signing_input.as_bytes())?;
        Ok(format!("{signing_input}.{signature}"))
    }

    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        let claims = self.decode_claims(token, now).map_err(|reason| {
            debug!("Token rejected: {}", reason);
            AuthError::TokenInvalid(reason)
        })?;
        Ok(Identity {
            email: claims.email,
            name: claims.name,
        })
    }

    fn decode_claims(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, String> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header, payload, signature] = parts.as_slice() else {
            return Err(format!("expected 3 parts, got {}", parts.len()));
        };

        let engine = self.signer.part_engine();
        let header: TokenHeader = decode_part(engine, header)?;
        if header.alg != self.signer.algorithm() {
            return Err(format!("unexpected algorithm {}", header.alg));
        }

        let signing_input = &token[..token.len() - signature.len() - 1];
        if !self.signer.verify(signing_input.as_bytes(), signature) {
            return Err("signature mismatch".into());
        }

        let claims: Claims = decode_part(engine, payload)?;
        if now.timestamp() > claims.exp {
            return Err(format!("expired at {}", claims.exp));
        }
        Ok(claims)
    }
}

fn encode_part<T: Serialize>(engine: &GeneralPurpose, value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| AuthError::Validation(format!("failed to serialize token part: {e}")))?;
    Ok(engine.encode(json))
}

fn decode_part<T: DeserializeOwned>(engine: &GeneralPurpose, part: &str) -> Result<T, String> {
    let bytes = engine
        .decode(part)
        .map_err(|e| format!("bad base64: {e}"))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("bad json: {e}"))
}
