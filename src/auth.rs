use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    models::Identity,
};

/// Header accepted as the session identity in `Env::Local` only.
pub const DEV_IDENTITY_HEADER: &str = "x-user-id";

/// Claims
///
/// The subset of the Supabase session JWT payload we rely on.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the `auth.users.id` of the signed-in user, used as the Identity.
    pub sub: String,
    /// Expiration Time (exp): always validated.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// Session
///
/// The current request's identity, or `None` when nobody is signed in.
///
/// Unlike a hard authentication extractor, this one never rejects: a missing, malformed,
/// expired or badly signed token simply yields an absent identity, which the gate turns
/// into `Denied`.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub identity: Option<Identity>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn signed_in(identity: impl Into<Identity>) -> Self {
        Self {
            identity: Some(identity.into()),
        }
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        // Local development bypass: take the identity straight from the header.
        if config.env == Env::Local {
            if let Some(identity) = dev_identity(parts) {
                return Ok(Session::signed_in(identity));
            }
        }

        Ok(Session {
            identity: bearer_identity(parts, &config.jwt_secret),
        })
    }
}

fn dev_identity(parts: &Parts) -> Option<Identity> {
    parts
        .headers
        .get(DEV_IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(Identity::from)
}

/// Validates `Authorization: Bearer <jwt>` and returns its subject.
fn bearer_identity(parts: &Parts, secret: &str) -> Option<Identity> {
    let token = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?
        .strip_prefix("Bearer ")?;

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // Supabase tokens carry an `aud` claim we do not pin.
    validation.validate_aud = false;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) if !data.claims.sub.is_empty() => Some(Identity::from(data.claims.sub)),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting session token");
            None
        }
    }
}
