//! Bearer-token authentication.
//!
//! Access tokens are HS256 JWTs signed with the shared secret in [`AuthConfig`]. The claims carry the user id in
//! `sub`; every handler that acts on behalf of a user takes an [`AuthenticatedUser`] extractor and passes the id to
//! the settlement API, which performs the per-contract role check. The server never trusts a user id from a request
//! body.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The authenticated user id.
    pub sub: String,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// The user a request acts on behalf of, taken from a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, ServerError> {
    let config = req
        .app_data::<web::Data<AuthConfig>>()
        .ok_or_else(|| ServerError::InitializeError("No authentication configuration in app data".to_string()))?;
    let header = req.headers().get(header::AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a Bearer token".to_string()))?;
    let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
    let data = decode::<JwtClaims>(token, &key, &Validation::new(Algorithm::HS256)).map_err(|e| {
        debug!("🔑️ Access token rejected: {e}");
        AuthError::ValidationError(e.to_string())
    })?;
    Ok(AuthenticatedUser { user_id: data.claims.sub })
}

/// Issues access tokens for authenticated marketplace users. The identity layer that establishes *who* the user is
/// lives upstream; this only signs the claim.
pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes()) }
    }

    pub fn issue_token(&self, user_id: &str, expiry: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = JwtClaims { sub: user_id.to_string(), exp: expiry.timestamp() };
        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}
