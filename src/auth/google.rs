//! Google sign-in: verify a Google-issued ID token and map it onto a
//! local account, creating one on first sign-in.

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::auth::{hash_password, unusable_password, AuthError, TokenService};
use crate::db::{DbPool, NewUser, Role, User, UserResponse};

/// The claims we require from a verified federated assertion.
#[derive(Debug, Clone)]
pub struct FederatedClaims {
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

/// Verifies third-party identity assertions. A trait so the sign-in
/// flow can be exercised without talking to Google.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<FederatedClaims, AuthError>;
}

const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct GoogleIdClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Verifies Google ID tokens against Google's published signing keys,
/// with the configured OAuth client id as the expected audience.
pub struct GoogleVerifier {
    http: reqwest::Client,
    client_id: String,
}

impl GoogleVerifier {
    pub fn new(client_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
        }
    }

    async fn fetch_keys(&self) -> Result<Jwks, AuthError> {
        let response = self
            .http
            .get(GOOGLE_CERTS_URL)
            .send()
            .await
            .map_err(|e| AuthError::Upstream(format!("failed to fetch Google certs: {e}")))?;
        response
            .json::<Jwks>()
            .await
            .map_err(|e| AuthError::Upstream(format!("failed to parse Google certs: {e}")))
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, id_token: &str) -> Result<FederatedClaims, AuthError> {
        let header = decode_header(id_token)
            .map_err(|_| AuthError::InvalidCredential("Invalid Google token"))?;
        let kid = header
            .kid
            .ok_or(AuthError::InvalidCredential("Invalid Google token"))?;

        let jwks = self.fetch_keys().await?;
        let jwk = jwks
            .keys
            .iter()
            .find(|key| key.kid == kid)
            .ok_or(AuthError::InvalidCredential("Invalid Google token"))?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| AuthError::Upstream(format!("bad Google signing key: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.client_id]);
        validation.set_issuer(&GOOGLE_ISSUERS);

        let claims = decode::<GoogleIdClaims>(id_token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredCredential,
                _ => AuthError::InvalidCredential("Invalid Google token"),
            })?;

        match (claims.email, claims.name) {
            (Some(email), Some(name)) => Ok(FederatedClaims {
                subject: claims.sub,
                email,
                name,
                picture: claims.picture,
            }),
            _ => Err(AuthError::InvalidCredential(
                "Required user information not available from Google",
            )),
        }
    }
}

pub struct GoogleSignIn {
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
    pub is_new_account: bool,
}

/// Verify the assertion, then link it to an existing account or create
/// a new one.
///
/// Existing accounts keep their current federated link: a matching
/// email whose account is already linked to a different Google subject
/// is signed in without overwriting the link. Deactivated accounts are
/// rejected before anything is written.
pub async fn sign_in_with_google(
    pool: &DbPool,
    verifier: &dyn IdentityVerifier,
    tokens: &TokenService,
    id_token: &str,
) -> Result<GoogleSignIn, AuthError> {
    let identity = verifier.verify(id_token).await?;

    let existing = User::find_by_email(pool, &identity.email).await?;
    let (user_id, is_new_account) = match existing {
        Some(user) => {
            if !user.is_active {
                return Err(AuthError::AccountInactive);
            }
            if user.google_id.is_none() {
                User::link_google(pool, &user.id, &identity.subject, identity.picture.as_deref())
                    .await?;
            }
            (user.id, false)
        }
        None => {
            let password_hash = hash_password(&unusable_password())
                .map_err(|e| AuthError::Upstream(format!("password hashing failed: {e}")))?;
            let user = User::insert(
                pool,
                NewUser {
                    email: identity.email.clone(),
                    password_hash,
                    name: identity.name.clone(),
                    phone_number: None,
                    role: Role::Member,
                    google_id: Some(identity.subject.clone()),
                    profile_picture: identity.picture.clone(),
                },
            )
            .await?;
            (user.id, true)
        }
    };

    User::touch_last_seen(pool, &user_id).await?;

    let user = User::find_by_id(pool, &user_id)
        .await?
        .ok_or(AuthError::AccountNotFound)?;
    let token = tokens.issue_access(&user.id)?;
    let refresh_token = tokens.issue_refresh(&user.id)?;

    Ok(GoogleSignIn {
        user: user.into(),
        token,
        refresh_token,
        is_new_account,
    })
}
