//! Credential handling: signed tokens and password hashing.
//!
//! Tokens are stateless JWTs. Three kinds exist, each with its own
//! secret and lifetime, so compromising one does not compromise the
//! others: short-lived access tokens for ordinary requests, long-lived
//! refresh tokens used only to mint new access tokens, and admin
//! console tokens that additionally carry email and role claims.

pub mod google;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::db::{Role, User};

/// Credential and permission failures. Translated to HTTP at the API
/// boundary: everything except `Upstream` maps to 401/403/409.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    MissingCredential(&'static str),
    #[error("{0}")]
    InvalidCredential(&'static str),
    #[error("Token expired")]
    ExpiredCredential,
    #[error("Malformed token")]
    MalformedCredential,
    #[error("Account is deactivated")]
    AccountInactive,
    #[error("User not found or account deactivated")]
    AccountNotFound,
    #[error("Insufficient permissions")]
    PermissionDenied,
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Upstream(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Upstream(format!("database error: {err}"))
    }
}

/// Which secret/lifetime pair a token is signed and verified with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
    Admin,
}

/// JWT payload. Serialized field names match the wire format the
/// mobile clients already expect: `{userId, iat, exp}`, with `email`
/// and `role` added on admin tokens.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub iat: i64,
    pub exp: i64,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Keys {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Issues and verifies signed tokens. Pure function over the configured
/// secrets; nothing is persisted, so a token stays valid until its
/// natural expiry (there is no revocation list).
pub struct TokenService {
    access: Keys,
    refresh: Keys,
    admin: Keys,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: Keys::new(&config.access_secret, Duration::days(config.access_ttl_days)),
            refresh: Keys::new(&config.refresh_secret, Duration::days(config.refresh_ttl_days)),
            admin: Keys::new(&config.admin_secret, Duration::hours(config.admin_ttl_hours)),
        }
    }

    fn keys(&self, kind: TokenKind) -> &Keys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
            TokenKind::Admin => &self.admin,
        }
    }

    fn sign(&self, kind: TokenKind, claims: &Claims) -> Result<String, AuthError> {
        encode(&jsonwebtoken::Header::default(), claims, &self.keys(kind).encoding)
            .map_err(|e| AuthError::Upstream(format!("token signing failed: {e}")))
    }

    fn claims_for(&self, kind: TokenKind, user_id: &str) -> Claims {
        let now = Utc::now();
        Claims {
            user_id: user_id.to_string(),
            email: None,
            role: None,
            iat: now.timestamp(),
            exp: (now + self.keys(kind).ttl).timestamp(),
        }
    }

    pub fn issue_access(&self, user_id: &str) -> Result<String, AuthError> {
        let claims = self.claims_for(TokenKind::Access, user_id);
        self.sign(TokenKind::Access, &claims)
    }

    pub fn issue_refresh(&self, user_id: &str) -> Result<String, AuthError> {
        let claims = self.claims_for(TokenKind::Refresh, user_id);
        self.sign(TokenKind::Refresh, &claims)
    }

    /// Admin console token: carries email and role so the console can
    /// render without a follow-up lookup.
    pub fn issue_admin(&self, user: &User) -> Result<String, AuthError> {
        let mut claims = self.claims_for(TokenKind::Admin, &user.id);
        claims.email = Some(user.email.clone());
        claims.role = Some(user.role);
        self.sign(TokenKind::Admin, &claims)
    }

    /// Verify a token against the secret for `kind`. Never panics:
    /// expiry, bad signatures, and garbage input all come back as typed
    /// errors.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        decode::<Claims>(token, &self.keys(kind).decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredCredential,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidToken
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::ImmatureSignature => AuthError::InvalidCredential("Invalid token"),
                _ => AuthError::MalformedCredential,
            })
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Random placeholder credential for accounts created through federated
/// sign-in. The account can never log in with it; it only satisfies the
/// password column.
pub fn unusable_password() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 24] = rng.random();
    format!("google-auth-{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::now_rfc3339;

    fn service() -> TokenService {
        TokenService::new(&AuthConfig::default())
    }

    fn sample_user() -> User {
        User {
            id: "u-1".to_string(),
            email: "pastor@example.com".to_string(),
            password_hash: String::new(),
            name: "Pastor".to_string(),
            phone_number: None,
            role: Role::Admin,
            is_active: true,
            google_id: None,
            profile_picture: None,
            last_seen: None,
            created_at: now_rfc3339(),
            updated_at: now_rfc3339(),
        }
    }

    #[test]
    fn access_token_round_trips() {
        let tokens = service();
        let token = tokens.issue_access("u-42").unwrap();
        let claims = tokens.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.user_id, "u-42");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_invalid_not_expired() {
        let tokens = service();
        let other = TokenService::new(&AuthConfig {
            access_secret: "a completely different secret".to_string(),
            ..AuthConfig::default()
        });

        let token = other.issue_access("u-1").unwrap();
        match tokens.verify(&token, TokenKind::Access) {
            Err(AuthError::InvalidCredential(_)) => {}
            other => panic!("expected InvalidCredential, got {other:?}"),
        }
    }

    #[test]
    fn refresh_token_does_not_verify_as_access() {
        let tokens = service();
        let refresh = tokens.issue_refresh("u-1").unwrap();
        assert!(tokens.verify(&refresh, TokenKind::Access).is_err());
        assert!(tokens.verify(&refresh, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let tokens = TokenService::new(&AuthConfig {
            access_ttl_days: -1,
            ..AuthConfig::default()
        });
        let token = tokens.issue_access("u-1").unwrap();
        match tokens.verify(&token, TokenKind::Access) {
            Err(AuthError::ExpiredCredential) => {}
            other => panic!("expected ExpiredCredential, got {other:?}"),
        }
    }

    #[test]
    fn garbage_token_is_malformed() {
        let tokens = service();
        match tokens.verify("not-a-jwt", TokenKind::Access) {
            Err(AuthError::MalformedCredential) | Err(AuthError::InvalidCredential(_)) => {}
            other => panic!("expected a parse failure, got {other:?}"),
        }
    }

    #[test]
    fn admin_token_carries_email_and_role() {
        let tokens = service();
        let token = tokens.issue_admin(&sample_user()).unwrap();
        let claims = tokens.verify(&token, TokenKind::Admin).unwrap();
        assert_eq!(claims.email.as_deref(), Some("pastor@example.com"));
        assert_eq!(claims.role, Some(Role::Admin));
        // Signed with the admin secret, not the access secret.
        assert!(tokens.verify(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("it is well with my soul").unwrap();
        assert!(verify_password("it is well with my soul", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
