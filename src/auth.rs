use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, error::ApiError};

/// Role granting read access to the catalogue.
pub const ROLE_READER: &str = "Reader";
/// Role granting write access (implies read on reader-gated routes).
pub const ROLE_WRITER: &str = "Writer";

/// Issued tokens are valid for this long; there is no revocation short of
/// key rotation, so the window is kept short.
pub const TOKEN_VALIDITY_MINUTES: i64 = 15;

/// Claims
///
/// The payload structure signed into every issued JWT and expected back on
/// every authenticated request. Validity is entirely self-contained: the
/// server holds no session state, so signature + issuer + audience + expiry
/// are the whole story.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the username.
    pub sub: String,
    /// Email claim. The username doubles as the email address.
    pub email: String,
    /// One entry per assigned role, in role-list order, not de-duplicated.
    pub roles: Vec<String>,
    /// Issuer, from configuration.
    pub iss: String,
    /// Audience, from configuration.
    pub aud: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiration timestamp (seconds since epoch), strictly later than `iat`.
    pub exp: usize,
}

/// create_jwt_token
///
/// Mints the signed bearer token for a successfully authenticated user:
/// fills the claim set (email, username, one claim per role), signs it with
/// the configured symmetric key (HS256), and stamps issuer, audience and a
/// 15-minute expiry. Pure computation over inputs plus the configured secret.
pub fn create_jwt_token(
    username: &str,
    roles: &[String],
    config: &AppConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: username.to_string(),
        email: username.to_string(),
        roles: roles.to_vec(),
        iss: config.jwt_issuer.clone(),
        aud: config.jwt_audience.clone(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::minutes(TOKEN_VALIDITY_MINUTES)).timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// token_validation
///
/// The validation rules applied to every inbound token: HS256 only, expiry
/// enforced, issuer and audience pinned to the configured values.
pub fn token_validation(config: &AppConfig) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_audience(&[&config.jwt_audience]);
    validation
}

/// hash_password
///
/// Hashes a password with Argon2id under a fresh random salt. Only the
/// resulting PHC string is ever persisted.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::PasswordHash(e.to_string()))
}

/// verify_password
///
/// Verifies a password against a stored PHC hash string. Deliberately
/// expensive; this is the only blocking step in the login path besides the
/// identity lookup itself.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| ApiError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// AuthUser
///
/// The resolved identity of an authenticated request: the outcome of the
/// bearer-token extractor below. Handlers and the role middleware use it to
/// check permissions; no database round trip is involved, because the token
/// is self-contained by design.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub email: String,
    /// Role claims as carried in the token, original order preserved.
    pub roles: Vec<String>,
}

impl AuthUser {
    /// True when any of the user's role claims matches any required role.
    pub fn has_any_role(&self, required: &[&str]) -> bool {
        self.roles
            .iter()
            .any(|role| required.iter().any(|r| role == r))
    }
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a
/// function argument in any authenticated handler and in the role middleware.
/// This cleanly separates authentication (extractor) from authorization
/// (middleware) and business logic (handlers).
///
/// The process:
/// 1. Dependency Resolution: AppConfig from the application state.
/// 2. Token Extraction: standard "Bearer " Authorization header.
/// 3. Validation: signature, issuer, audience and expiry in one decode call.
///
/// Rejection: 401 on any failure, with no detail on whether the token was
/// absent, malformed, forged or expired.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let validation = token_validation(&config);

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(AuthUser {
            username: token_data.claims.sub,
            email: token_data.claims.email,
            roles: token_data.claims.roles,
        })
    }
}
