use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::database::models::{User, UserRole};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// Short-lived access token claims.
    pub fn access(user: &User) -> Self {
        let now = Utc::now();
        let expiry_mins = config::config().security.access_token_expiry_mins;
        Self {
            user_id: user.id,
            role: user.role,
            exp: (now + Duration::minutes(expiry_mins)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Refresh token claims. Validity is also tracked server-side, so these
    /// can be revoked before `exp`.
    pub fn refresh(user: &User) -> (Self, DateTime<Utc>) {
        let now = Utc::now();
        let expiry_hours = config::config().security.refresh_token_expiry_hours;
        let expires_at = now + Duration::hours(expiry_hours);
        let claims = Self {
            user_id: user.id,
            role: user.role,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };
        (claims, expires_at)
    }
}

pub fn generate_token(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|_| AuthError::InvalidToken)?;
    Ok(data.claims)
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "test-secret";

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            username: "alice".into(),
            password: "hash".into(),
            email: "alice@example.com".into(),
            role: UserRole::Manager,
            team_id: None,
        }
    }

    #[test]
    fn access_token_round_trips_claims() {
        let user = user();
        let token = generate_token(&Claims::access(&user), SECRET).unwrap();
        let claims = decode_token(&token, SECRET).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.role, UserRole::Manager);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_token(&Claims::access(&user()), SECRET).unwrap();
        assert!(matches!(decode_token(&token, "other-secret"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(
            generate_token(&Claims::access(&user()), ""),
            Err(AuthError::MissingSecret)
        ));
    }

    #[test]
    fn password_hash_verifies() {
        // Minimum cost keeps the test fast.
        let hash = hash_password("hunter2", 4).unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }
}
