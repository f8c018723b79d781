use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Account, Role},
};

/// Hashes a password into an argon2 PHC string
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored hash; malformed hashes never verify
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Gate for every admin-only operation
pub fn require_admin(account: &Account) -> AppResult<()> {
    if !account.is_admin() {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: i64,
    pub role: Role,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Access/refresh pair handed out at registration and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// Signs and validates HS256 tokens with the configured secret
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    fn issue(&self, account_id: i64, role: Role, token_type: TokenType) -> AppResult<String> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: account_id,
            role,
            token_type,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn access_token(&self, account: &Account) -> AppResult<String> {
        self.issue(account.id, account.role, TokenType::Access)
    }

    pub fn token_pair(&self, account: &Account) -> AppResult<TokenPair> {
        Ok(TokenPair {
            refresh: self.issue(account.id, account.role, TokenType::Refresh)?,
            access: self.access_token(account)?,
        })
    }

    /// Decodes a token and checks it is of the expected kind
    pub fn validate(&self, token: &str, expected: TokenType) -> AppResult<Claims> {
        let claims = decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )?
        .claims;

        if claims.token_type != expected {
            return Err(AppError::Unauthorized("Token has wrong type".to_string()));
        }

        Ok(claims)
    }
}
