/// Session token issuing and verification
use crate::error::{Result, ServerError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tape_core::{Clock, UserId};
use uuid::Uuid;

/// Signs and checks HS256 session tokens
///
/// Expiry is judged against the injected clock rather than the library's
/// wall-clock check, so a token issued at `t` is accepted strictly before
/// `t + ttl` and rejected from then on.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub email: String,
    pub iat: i64, // Issued at
    pub exp: i64, // Expiration time
    /// `exp` at full precision; the value expiry is judged by
    pub expires_at: DateTime<Utc>,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> UserId {
        UserId::new(self.sub.clone())
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a token for `user_id` that expires `ttl` from now
    pub fn issue(&self, email: &str, user_id: &UserId) -> Result<String> {
        let now = self.clock.now();
        let exp = now + self.ttl;

        let claims = Claims {
            sub: user_id.as_str().to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            expires_at: exp,
            jti: Uuid::new_v4().simple().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServerError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Check signature and expiry, returning the embedded claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            ServerError::InvalidToken
        })?;

        if self.clock.now() >= token_data.claims.expires_at {
            return Err(ServerError::ExpiredToken);
        }

        Ok(token_data.claims)
    }
}
