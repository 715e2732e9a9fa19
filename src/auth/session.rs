use std::convert::Infallible;
use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::{
    config::{SessionConfig, MAX_SESSION_TTL_MINUTES},
    error::AppError,
    state::AppState,
};

/// Payload of the session token carried in the cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // user id
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Signing keys and cookie settings for sessions.
#[derive(Clone)]
pub struct SessionKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.session)
    }
}

impl SessionKeys {
    pub fn new(config: &SessionConfig) -> Self {
        let SessionConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
            cookie_name,
            cookie_secure,
        } = config.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::from_secs(ttl_minutes.clamp(0, MAX_SESSION_TTL_MINUTES) as u64 * 60),
            cookie_name,
            cookie_secure,
        }
    }

    pub fn sign(&self, user_id: i64) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = SessionClaims {
            sub: user_id.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id, "session signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<SessionClaims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// Cookie establishing a session for `user_id`.
    pub fn issue(&self, user_id: i64) -> anyhow::Result<Cookie<'static>> {
        let token = self.sign(user_id)?;
        Ok(Cookie::build((self.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure)
            .max_age(TimeDuration::seconds(self.ttl.as_secs() as i64))
            .build())
    }

    /// Cookie matching the session cookie, for removal from the jar.
    pub fn removal(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), "")).path("/").build()
    }

    /// Resolve the session cookie to a user id, if present and valid.
    pub fn user_id(&self, jar: &CookieJar) -> Option<i64> {
        let cookie = jar.get(&self.cookie_name)?;
        match self.verify(cookie.value()) {
            Ok(claims) => claims.sub.parse().ok(),
            Err(e) => {
                warn!(error = %e, "invalid or expired session");
                None
            }
        }
    }
}

/// Authenticated caller. Rejects with 401 when there is no valid session.
pub struct CurrentUser(pub i64);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        SessionKeys::from_ref(state)
            .user_id(&jar)
            .map(CurrentUser)
            .ok_or(AppError::Unauthenticated)
    }
}

/// Caller that may or may not hold a session.
pub struct MaybeUser(pub Option<i64>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(MaybeUser(SessionKeys::from_ref(state).user_id(&jar)))
    }
}
