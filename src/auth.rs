use bcrypt::{hash, verify};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::context::Principal;
use crate::models::{AuthPayload, UserView};

/// bcrypt work factor used when none is configured.
pub const DEFAULT_PASSWORD_COST: u32 = 10;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}

/// Signs HS256 tokens for logged-in users.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn create_jwt(&self, user: &UserView) -> Result<String, jsonwebtoken::errors::Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let claims = AuthPayload {
            sub: user.id.to_string(),
            username: user.username.clone(),
            is_admin: user.is_admin,
            exp: (now + self.ttl_secs) as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
    }

    pub fn validate_jwt(&self, token: &str) -> Result<AuthPayload, jsonwebtoken::errors::Error> {
        let token_data = decode::<AuthPayload>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        Ok(token_data.claims)
    }

    /// Validates a token and turns its claims into a request principal.
    pub fn principal(&self, token: &str) -> Option<Principal> {
        let claims = self.validate_jwt(token).ok()?;
        let id = claims.sub.parse().ok()?;
        Some(Principal::new(id, claims.username, claims.is_admin))
    }
}
