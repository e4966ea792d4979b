use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Decoded contents of a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: u64,
    pub expires_at: DateTime<Utc>,
}

/// Bearer token handed to clients after register/login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Issues and verifies `<user id>.<expiry>.<hmac>` bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>, ttl_minutes: i64) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, user_id: u64, now: DateTime<Utc>) -> Result<AccessToken, AuthError> {
        let expires = (now + self.ttl).timestamp();
        let payload = format!("{user_id}.{expires}");
        let signature = hex::encode(self.mac(&payload)?.finalize().into_bytes());

        Ok(AccessToken {
            access_token: format!("{payload}.{signature}"),
            token_type: "bearer",
        })
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, AuthError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(AuthError::MalformedToken)?;
        let (user_id, expires) = payload.split_once('.').ok_or(AuthError::MalformedToken)?;

        let signature = hex::decode(signature).map_err(|_| AuthError::MalformedToken)?;
        self.mac(payload)?
            .verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;

        let user_id = user_id
            .parse::<u64>()
            .map_err(|_| AuthError::MalformedToken)?;
        let expires_at = expires
            .parse::<i64>()
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .ok_or(AuthError::MalformedToken)?;

        if expires_at <= now {
            return Err(AuthError::Expired);
        }

        Ok(TokenClaims {
            user_id,
            expires_at,
        })
    }

    fn mac(&self, payload: &str) -> Result<HmacSha256, AuthError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|e| AuthError::Key(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}
