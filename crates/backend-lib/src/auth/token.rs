// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
//! Signed bearer tokens.
//!
//! Tokens are HS256 JWTs carrying the principal id as `sub` and an `exp`
//! instant. Nothing is persisted: validity depends only on the signature
//! and the expiry at verification time.

use crate::store::PrincipalId;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Fixed token lifetime: 30 days
pub const TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

pub fn token_ttl() -> Duration {
    Duration::seconds(TOKEN_TTL_SECS)
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// The only verification outcome besides success.
///
/// Bad signature, expiry and malformed subject are deliberately
/// indistinguishable to callers.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid token")]
pub struct InvalidToken;

/// Issues and verifies bearer tokens with the process signing secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked against the caller-supplied clock
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `principal` valid for `TOKEN_TTL_SECS` from `now`
    pub fn issue(&self, principal: PrincipalId, now: DateTime<Utc>) -> anyhow::Result<String> {
        let claims = Claims {
            sub: principal.to_string(),
            exp: (now + token_ttl()).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verify signature, then expiry, then subject
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<PrincipalId, InvalidToken> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!("token rejected: {e}");
            InvalidToken
        })?;

        if data.claims.exp <= now.timestamp() {
            debug!("token rejected: expired");
            return Err(InvalidToken);
        }

        match data.claims.sub.parse::<i64>() {
            Ok(id) if id > 0 => Ok(PrincipalId(id)),
            _ => {
                debug!("token rejected: malformed subject");
                Err(InvalidToken)
            },
        }
    }
}
