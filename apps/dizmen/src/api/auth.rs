//! # Authentication Module
//!
//! HS256 JWT bearer tokens issued by the server (`dizmen token`).
//!
//! Every privileged handler takes a [`Principal`] argument; extracting it
//! validates the `Authorization: Bearer <token>` header (signature, expiry,
//! issuer, audience). Public routes simply do not ask for one:
//! - `GET /health`
//! - `GET /menu/{restaurant_id}`
//!
//! `GET /items/{id}/reviews` takes an `Option<Principal>`: no header means an
//! anonymous caller, but a header that fails verification is still a 401.

use super::{AppState, error::ApiError};
use crate::config::Config;
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use dizmen_core::{DizmenError, FieldErrors, Restaurant, UserId};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ROLES & CLAIMS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Reviews and moderates restaurants.
    Admin,
    /// Runs onboarding and manages one restaurant's catalog.
    Owner,
    /// Leaves reviews.
    Customer,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Owner => "owner",
            Self::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DizmenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            "customer" => Ok(Self::Customer),
            other => Err(DizmenError::Validation(FieldErrors::single(
                "role",
                format!("unknown role '{other}' (expected admin, owner or customer)"),
            ))),
        }
    }
}

/// Claims carried by a Dizmen token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

// =============================================================================
// PRINCIPAL
// =============================================================================

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: UserId::new(claims.sub),
            role: claims.role,
        }
    }
}

impl Principal {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("administrator role required"))
        }
    }

    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!("{role} role required")))
        }
    }

    /// The caller is `user` or an administrator.
    pub fn require_user(&self, user: &UserId) -> Result<(), ApiError> {
        if self.is_admin() || &self.user_id == user {
            Ok(())
        } else {
            Err(ApiError::forbidden("cannot act on another user's onboarding"))
        }
    }

    /// The caller owns `restaurant` or is an administrator.
    pub fn require_owner_of(&self, restaurant: &Restaurant) -> Result<(), ApiError> {
        if self.is_admin() || (self.role == Role::Owner && self.user_id == restaurant.owner_id) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "restaurant {} belongs to another owner",
                restaurant.id
            )))
        }
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(principal.clone());
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

        let principal = state.tokens.verify(token)?;
        parts.extensions.insert(principal.clone());
        Ok(principal)
    }
}

impl OptionalFromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key(header::AUTHORIZATION) {
            return Ok(None);
        }
        <Self as FromRequestParts<AppState>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

// =============================================================================
// TOKEN SERVICE
// =============================================================================

/// Issues and validates tokens with one shared secret.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    ttl_secs: i64,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl TokenService {
    #[must_use]
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, DizmenError> {
        Ok(Self::new(
            config.jwt_secret()?.as_bytes(),
            config.auth.issuer.clone(),
            config.auth.audience.clone(),
            config.auth.token_ttl_secs,
        ))
    }

    /// A token for `user` valid from now.
    pub fn issue(&self, user: &UserId, role: Role) -> Result<String, DizmenError> {
        self.issue_at(user, role, Utc::now().timestamp())
    }

    /// A token for `user` issued at the given unix time.
    pub fn issue_at(
        &self,
        user: &UserId,
        role: Role,
        issued_at: i64,
    ) -> Result<String, DizmenError> {
        let claims = Claims {
            sub: user.to_string(),
            role,
            exp: issued_at.saturating_add(self.ttl_secs),
            iat: issued_at,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| DizmenError::SerializationError(format!("token encoding: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Principal, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token expired",
                ErrorKind::InvalidSignature => "invalid signature",
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => "token not for this server",
                _ => "invalid token",
            };
            ApiError::Unauthorized(reason.to_string())
        })?;
        Ok(Principal::from(data.claims))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"an-unguessable-secret-for-the-tests!";

    fn service() -> TokenService {
        TokenService::new(SECRET, "dizmen", "dizmen-clients", 3600)
    }

    #[test]
    fn issued_token_round_trips_to_principal() {
        let tokens = service();
        let token = tokens.issue(&UserId::new("owner-1"), Role::Owner).unwrap();
        let principal = tokens.verify(&token).unwrap();
        assert_eq!(principal.user_id, UserId::new("owner-1"));
        assert_eq!(principal.role, Role::Owner);
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let long_ago = Utc::now().timestamp() - 100_000;
        let token = tokens
            .issue_at(&UserId::new("owner-1"), Role::Owner, long_ago)
            .unwrap();
        match tokens.verify(&token) {
            Err(ApiError::Unauthorized(reason)) => assert_eq!(reason, "token expired"),
            other => panic!("expected expiry, got {other:?}"),
        }
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let other = TokenService::new(b"some-other-secret-of-enough-length!!", "dizmen", "dizmen-clients", 3600);
        let token = other.issue(&UserId::new("admin"), Role::Admin).unwrap();
        assert!(matches!(service().verify(&token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let other = TokenService::new(SECRET, "dizmen", "someone-else", 3600);
        let token = other.issue(&UserId::new("admin"), Role::Admin).unwrap();
        assert!(service().verify(&token).is_err());
    }

    #[test]
    fn ownership_rules() {
        let owner = Principal {
            user_id: UserId::new("owner-1"),
            role: Role::Owner,
        };
        let admin = Principal {
            user_id: UserId::new("admin"),
            role: Role::Admin,
        };
        assert!(owner.require_user(&UserId::new("owner-1")).is_ok());
        assert!(owner.require_user(&UserId::new("owner-2")).is_err());
        assert!(admin.require_user(&UserId::new("owner-2")).is_ok());
        assert!(owner.require_admin().is_err());
    }

    #[test]
    fn role_parsing() {
        assert_eq!("customer".parse::<Role>().unwrap(), Role::Customer);
        assert!("root".parse::<Role>().is_err());
    }
}
